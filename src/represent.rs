//! The encode-side bridge: values and node trees lowered to event streams.

use base64::Engine;

use crate::error::{Error, Result};
use crate::event::{CollectionStyle, Event, EventData};
use crate::node::{Document, Node, NodeId, NodeKind, Style};
use crate::resolve::{self, BINARY_TAG, MAP_TAG, SEQ_TAG, STR_TAG};
use crate::token::ScalarStyle;
use crate::value::Value;

/// Lower one value to the events of a single document body (no document
/// markers; the encoder brackets them).
pub(crate) fn value_events(value: &Value, out: &mut Vec<Event>) {
    match value {
        Value::Null => out.push(plain_scalar("null")),
        Value::Bool(true) => out.push(plain_scalar("true")),
        Value::Bool(false) => out.push(plain_scalar("false")),
        Value::Int(number) => out.push(plain_scalar(&number.to_string())),
        Value::Uint(number) => out.push(plain_scalar(&number.to_string())),
        Value::Float(number) => out.push(plain_scalar(&format_float(*number))),
        Value::String(text) => out.push(string_scalar(text)),
        Value::Bytes(bytes) => {
            let (encoded, style) = encode_base64(bytes);
            out.push(Event::bare(EventData::Scalar {
                anchor: None,
                tag: Some(BINARY_TAG.to_string()),
                value: encoded,
                plain_implicit: false,
                quoted_implicit: false,
                style,
            }));
        }
        Value::Timestamp(timestamp) => out.push(plain_scalar(&timestamp.to_string())),
        Value::Sequence(items) => {
            out.push(Event::bare(EventData::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: CollectionStyle::Any,
            }));
            for item in items {
                value_events(item, out);
            }
            out.push(Event::bare(EventData::SequenceEnd));
        }
        Value::Mapping(entries) => {
            out.push(Event::bare(EventData::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: CollectionStyle::Any,
            }));
            for (key, item) in entries {
                value_events(key, out);
                value_events(item, out);
            }
            out.push(Event::bare(EventData::MappingEnd));
        }
    }
}

/// Base64 for `!!binary`: short payloads stay on the line, long ones become
/// a block scalar wrapped at 76 columns.
fn encode_base64(bytes: &[u8]) -> (String, ScalarStyle) {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    if encoded.len() <= 76 {
        return (encoded, ScalarStyle::Any);
    }
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / 76 + 1);
    for (i, ch) in encoded.chars().enumerate() {
        if i > 0 && i % 76 == 0 {
            wrapped.push('\n');
        }
        wrapped.push(ch);
    }
    wrapped.push('\n');
    (wrapped, ScalarStyle::Literal)
}

fn plain_scalar(text: &str) -> Event {
    Event::bare(EventData::Scalar {
        anchor: None,
        tag: None,
        value: text.to_string(),
        plain_implicit: true,
        quoted_implicit: false,
        style: ScalarStyle::Plain,
    })
}

/// Strings that would re-resolve as another type are force-quoted; empty
/// strings quote so they do not read back as null.
fn string_scalar(text: &str) -> Event {
    let style = if text.is_empty() {
        ScalarStyle::DoubleQuoted
    } else if resolve::resolve_tag(text) != STR_TAG {
        ScalarStyle::DoubleQuoted
    } else {
        ScalarStyle::Any
    };
    Event::bare(EventData::Scalar {
        anchor: None,
        tag: None,
        value: text.to_string(),
        plain_implicit: style != ScalarStyle::DoubleQuoted,
        quoted_implicit: true,
        style,
    })
}

fn format_float(number: f64) -> String {
    if number.is_nan() {
        return String::from(".nan");
    }
    if number.is_infinite() {
        return if number > 0.0 {
            String::from(".inf")
        } else {
            String::from("-.inf")
        };
    }
    let text = format!("{}", number);
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Lower a composed document body back to events, preserving anchors,
/// styles, and comments.
pub(crate) fn node_events(doc: &Document, out: &mut Vec<Event>) -> Result<()> {
    let Some(root) = doc.root_id() else {
        return Ok(());
    };
    let doc_node = doc.get(root);
    match doc_node.kind {
        NodeKind::Document => {
            let Some(&content) = doc_node.children.first() else {
                return Err(Error::emitter("document node has no content"));
            };
            walk(doc, content, out);
            Ok(())
        }
        _ => {
            walk(doc, root, out);
            Ok(())
        }
    }
}

fn walk(doc: &Document, id: NodeId, out: &mut Vec<Event>) {
    let node = doc.get(id);
    match node.kind {
        NodeKind::Alias => {
            let mut event = Event::bare(EventData::Alias {
                anchor: node.value.clone(),
            });
            copy_comments(node, &mut event);
            out.push(event);
        }
        NodeKind::Scalar => {
            let resolved = resolve::resolve_tag(&node.value);
            let plain_implicit = node.tag == resolved || node.tag.is_empty();
            let quoted_implicit = node.tag == STR_TAG || node.tag.is_empty();
            let mut event = Event::bare(EventData::Scalar {
                anchor: anchor_of(node),
                tag: if node.tag.is_empty() {
                    None
                } else {
                    Some(node.tag.clone())
                },
                value: node.value.clone(),
                plain_implicit,
                quoted_implicit,
                style: scalar_style(node.style),
            });
            copy_comments(node, &mut event);
            out.push(event);
        }
        NodeKind::Sequence => {
            let implicit = node.tag == SEQ_TAG || node.tag.is_empty();
            let mut event = Event::bare(EventData::SequenceStart {
                anchor: anchor_of(node),
                tag: Some(node.tag.clone()).filter(|tag| !tag.is_empty()),
                implicit,
                style: collection_style(node.style),
            });
            copy_comments(node, &mut event);
            out.push(event);
            for &child in &node.children {
                walk(doc, child, out);
            }
            out.push(Event::bare(EventData::SequenceEnd));
        }
        NodeKind::Mapping => {
            let implicit = node.tag == MAP_TAG || node.tag.is_empty();
            let mut event = Event::bare(EventData::MappingStart {
                anchor: anchor_of(node),
                tag: Some(node.tag.clone()).filter(|tag| !tag.is_empty()),
                implicit,
                style: collection_style(node.style),
            });
            copy_comments(node, &mut event);
            out.push(event);
            for &child in &node.children {
                walk(doc, child, out);
            }
            out.push(Event::bare(EventData::MappingEnd));
        }
        NodeKind::Document => {
            for &child in &node.children {
                walk(doc, child, out);
            }
        }
    }
}

fn anchor_of(node: &Node) -> Option<String> {
    if node.anchor.is_empty() {
        None
    } else {
        Some(node.anchor.clone())
    }
}

fn copy_comments(node: &Node, event: &mut Event) {
    event.head_comment.clone_from(&node.head_comment);
    event.line_comment.clone_from(&node.line_comment);
    event.foot_comment.clone_from(&node.foot_comment);
}

fn scalar_style(style: Style) -> ScalarStyle {
    match style {
        Style::SingleQuoted => ScalarStyle::SingleQuoted,
        Style::DoubleQuoted => ScalarStyle::DoubleQuoted,
        Style::Literal => ScalarStyle::Literal,
        Style::Folded => ScalarStyle::Folded,
        Style::Plain => ScalarStyle::Plain,
        _ => ScalarStyle::Any,
    }
}

fn collection_style(style: Style) -> CollectionStyle {
    match style {
        Style::Flow => CollectionStyle::Flow,
        Style::Block => CollectionStyle::Block,
        _ => CollectionStyle::Any,
    }
}

/// Build a node tree for a value, the inverse of decoding into `Value`.
pub(crate) fn value_to_document(value: &Value) -> Document {
    let mut doc = Document::default();
    let mut doc_node = Node::new(NodeKind::Document);
    doc_node.tag = String::new();
    let doc_id = doc.push(doc_node);
    doc.root = Some(doc_id);
    let root = value_to_node(value, &mut doc);
    doc.get_mut(doc_id).children.push(root);
    doc
}

fn value_to_node(value: &Value, doc: &mut Document) -> NodeId {
    let node = match value {
        Value::Sequence(items) => {
            let mut node = Node::new(NodeKind::Sequence);
            node.tag = SEQ_TAG.to_string();
            node.style = Style::Block;
            let id = doc.push(node);
            for item in items {
                let child = value_to_node(item, doc);
                doc.get_mut(id).children.push(child);
            }
            return id;
        }
        Value::Mapping(entries) => {
            let mut node = Node::new(NodeKind::Mapping);
            node.tag = MAP_TAG.to_string();
            node.style = Style::Block;
            let id = doc.push(node);
            for (key, item) in entries {
                let key_id = value_to_node(key, doc);
                let value_id = value_to_node(item, doc);
                let entry = doc.get_mut(id);
                entry.children.push(key_id);
                entry.children.push(value_id);
            }
            return id;
        }
        Value::Bytes(bytes) => {
            let mut node = Node::new(NodeKind::Scalar);
            node.tag = BINARY_TAG.to_string();
            let (encoded, style) = encode_base64(bytes);
            node.value = encoded;
            node.style = if style == ScalarStyle::Literal {
                Style::Literal
            } else {
                Style::Plain
            };
            node
        }
        Value::String(text) => {
            let mut node = Node::new(NodeKind::Scalar);
            node.tag = STR_TAG.to_string();
            node.value = text.clone();
            node.style = if text.is_empty() || resolve::resolve_tag(text) != STR_TAG {
                Style::DoubleQuoted
            } else {
                Style::Plain
            };
            node
        }
        other => {
            let mut node = Node::new(NodeKind::Scalar);
            node.value = match other {
                Value::Null => String::from("null"),
                Value::Bool(true) => String::from("true"),
                Value::Bool(false) => String::from("false"),
                Value::Int(number) => number.to_string(),
                Value::Uint(number) => number.to_string(),
                Value::Float(number) => format_float(*number),
                Value::Timestamp(timestamp) => timestamp.to_string(),
                _ => unreachable!(),
            };
            node.tag = resolve::resolve_tag(&node.value).to_string();
            node.style = Style::Plain;
            node
        }
    };
    doc.push(node)
}
