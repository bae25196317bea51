//! The composer: events in, node trees out.
//!
//! Anchors register before their node's children compose, so an alias may
//! legally point at the collection being built (`&a [*a]`); the unfolding
//! cycle such a document implies is rejected later, during decode traversal.
//! After a document's events are drained, the comments captured by the
//! scanner are attached to nodes by position.

use std::collections::HashMap;
use std::io::Read;

use crate::error::{Error, Result};
use crate::event::{CollectionStyle, Event, EventData};
use crate::node::{Document, Node, NodeId, NodeKind, Style};
use crate::parser::Parser;
use crate::resolve::{self, MAP_TAG, SEQ_TAG, STR_TAG};
use crate::token::{Comment, ScalarStyle};

pub(crate) struct Composer<R> {
    parser: Parser<R>,
    stream_started: bool,
    stream_ended: bool,
    pending_comments: Vec<Comment>,
}

impl<R: Read> Composer<R> {
    pub fn new(input: R) -> Composer<R> {
        Composer {
            parser: Parser::new(input),
            stream_started: false,
            stream_ended: false,
            pending_comments: Vec::new(),
        }
    }

    /// Compose the next document from the stream, or `None` after the last.
    pub fn compose(&mut self) -> Result<Option<Document>> {
        if self.stream_ended {
            return Ok(None);
        }
        if !self.stream_started {
            let event = self.parser.parse()?;
            if !matches!(event.data, EventData::StreamStart { .. }) {
                return Err(Error::composer(
                    "did not find expected stream start",
                    event.start_mark,
                ));
            }
            self.stream_started = true;
        }

        let event = self.parser.parse()?;
        match event.data {
            EventData::StreamEnd => {
                self.stream_ended = true;
                Ok(None)
            }
            EventData::DocumentStart {
                version_directive, ..
            } => {
                let mut doc = Document {
                    version: version_directive,
                    ..Document::default()
                };
                let mut doc_node = Node::new(NodeKind::Document);
                doc_node.start_mark = event.start_mark;
                let doc_id = doc.push(doc_node);
                doc.root = Some(doc_id);

                let event = self.parser.parse()?;
                let root = self.compose_node(&mut doc, event)?;
                doc.get_mut(doc_id).children.push(root);

                let end = self.parser.parse()?;
                if !matches!(end.data, EventData::DocumentEnd { .. }) {
                    return Err(Error::composer(
                        "did not find expected document end",
                        end.start_mark,
                    ));
                }
                doc.get_mut(doc_id).end_mark = end.end_mark;

                self.attach_comments(&mut doc);
                Ok(Some(doc))
            }
            _ => Err(Error::composer(
                "did not find expected document start",
                event.start_mark,
            )),
        }
    }

    fn compose_node(&mut self, doc: &mut Document, event: Event) -> Result<NodeId> {
        match event.data {
            EventData::Alias { anchor } => {
                let target = doc.anchor_id(&anchor).ok_or_else(|| {
                    Error::composer(
                        format!("unknown anchor '{}' referenced", anchor),
                        event.start_mark,
                    )
                })?;
                let mut node = Node::new(NodeKind::Alias);
                node.value = anchor;
                node.alias = Some(target);
                node.start_mark = event.start_mark;
                node.end_mark = event.end_mark;
                Ok(doc.push(node))
            }
            EventData::Scalar {
                anchor,
                tag,
                value,
                plain_implicit,
                style,
                ..
            } => {
                let mut node = Node::new(NodeKind::Scalar);
                node.style = match style {
                    ScalarStyle::Plain | ScalarStyle::Any => Style::Plain,
                    ScalarStyle::SingleQuoted => Style::SingleQuoted,
                    ScalarStyle::DoubleQuoted => Style::DoubleQuoted,
                    ScalarStyle::Literal => Style::Literal,
                    ScalarStyle::Folded => Style::Folded,
                };
                node.tag = match tag {
                    Some(tag) if tag != "!" => tag,
                    _ => {
                        if style == ScalarStyle::Plain && plain_implicit {
                            resolve::resolve_tag(&value).to_string()
                        } else {
                            STR_TAG.to_string()
                        }
                    }
                };
                node.value = value;
                node.start_mark = event.start_mark;
                node.end_mark = event.end_mark;
                let id = doc.push(node);
                self.register_anchor(doc, anchor, id);
                Ok(id)
            }
            EventData::SequenceStart {
                anchor, tag, style, ..
            } => {
                let mut node = Node::new(NodeKind::Sequence);
                node.style = collection_style(style);
                node.tag = tag
                    .filter(|tag| tag != "!")
                    .unwrap_or_else(|| SEQ_TAG.to_string());
                node.start_mark = event.start_mark;
                let id = doc.push(node);
                self.register_anchor(doc, anchor, id);
                loop {
                    let event = self.parser.parse()?;
                    if let EventData::SequenceEnd = event.data {
                        doc.get_mut(id).end_mark = event.end_mark;
                        break;
                    }
                    let child = self.compose_node(doc, event)?;
                    doc.get_mut(id).children.push(child);
                }
                Ok(id)
            }
            EventData::MappingStart {
                anchor, tag, style, ..
            } => {
                let mut node = Node::new(NodeKind::Mapping);
                node.style = collection_style(style);
                node.tag = tag
                    .filter(|tag| tag != "!")
                    .unwrap_or_else(|| MAP_TAG.to_string());
                node.start_mark = event.start_mark;
                let id = doc.push(node);
                self.register_anchor(doc, anchor, id);
                loop {
                    let event = self.parser.parse()?;
                    if let EventData::MappingEnd = event.data {
                        doc.get_mut(id).end_mark = event.end_mark;
                        break;
                    }
                    let key = self.compose_node(doc, event)?;
                    let event = self.parser.parse()?;
                    let value = self.compose_node(doc, event)?;
                    let entry = doc.get_mut(id);
                    entry.children.push(key);
                    entry.children.push(value);
                }
                Ok(id)
            }
            _ => Err(Error::composer(
                "did not find expected node content",
                event.start_mark,
            )),
        }
    }

    fn register_anchor(&mut self, doc: &mut Document, anchor: Option<String>, id: NodeId) {
        if let Some(name) = anchor {
            doc.get_mut(id).anchor = name.clone();
            doc.anchors.insert(name, id);
        }
    }

    // ------------------------------------------------------------------
    // Comment attachment
    // ------------------------------------------------------------------

    fn attach_comments(&mut self, doc: &mut Document) {
        let mut comments = std::mem::take(&mut self.pending_comments);
        comments.extend(self.parser.take_comments());
        if comments.is_empty() {
            return;
        }

        // Comments scanned past this document's end belong to the next one.
        let doc_id = match doc.root_id() {
            Some(id) => id,
            None => return,
        };
        let doc_end = doc.get(doc_id).end_mark.index;
        let mut mine = Vec::new();
        for comment in comments {
            if self.parser.stream_ended() || comment.start_mark.index < doc_end {
                mine.push(comment);
            } else {
                self.pending_comments.push(comment);
            }
        }

        let parents = parent_table(doc);
        for comment in mine {
            if comment.inline {
                self.attach_line_comment(doc, doc_id, &comment);
            } else if comment.blank_after {
                self.attach_foot_comment(doc, doc_id, &parents, &comment);
            } else {
                self.attach_head_comment(doc, doc_id, &parents, &comment);
            }
        }
    }

    fn attach_line_comment(&self, doc: &mut Document, doc_id: NodeId, comment: &Comment) {
        let mut best: Option<NodeId> = None;
        for id in doc.ids() {
            if id == doc_id {
                continue;
            }
            let node = doc.get(id);
            if node.end_mark.line == comment.start_mark.line
                && node.end_mark.index <= comment.start_mark.index
                && best.map_or(true, |b| node.end_mark.index >= doc.get(b).end_mark.index)
            {
                best = Some(id);
            }
        }
        if let Some(id) = best {
            append_comment(&mut doc.get_mut(id).line_comment, &comment.value);
        }
    }

    fn attach_head_comment(
        &self,
        doc: &mut Document,
        doc_id: NodeId,
        parents: &HashMap<usize, (usize, usize)>,
        comment: &Comment,
    ) {
        let mut best: Option<NodeId> = None;
        for id in doc.ids() {
            if id == doc_id {
                continue;
            }
            let node = doc.get(id);
            // Ties go to the innermost node, so an entry comment lands on
            // the key rather than the mapping that starts at the same spot.
            if node.start_mark.index >= comment.end_mark.index
                && best.map_or(true, |b| node.start_mark.index <= doc.get(b).start_mark.index)
            {
                best = Some(id);
            }
        }
        match best {
            Some(id) => append_comment(&mut doc.get_mut(id).head_comment, &comment.value),
            // Nothing follows within the document: a trailing comment.
            None => self.attach_foot_comment(doc, doc_id, parents, comment),
        }
    }

    fn attach_foot_comment(
        &self,
        doc: &mut Document,
        doc_id: NodeId,
        parents: &HashMap<usize, (usize, usize)>,
        comment: &Comment,
    ) {
        let mut best: Option<NodeId> = None;
        for id in doc.ids() {
            if id == doc_id {
                continue;
            }
            let node = doc.get(id);
            if node.end_mark.index <= comment.start_mark.index
                && best.map_or(true, |b| node.end_mark.index > doc.get(b).end_mark.index)
            {
                best = Some(id);
            }
        }
        let Some(mut chosen) = best else {
            // A leading comment set off by a blank line: document head.
            append_comment(&mut doc.get_mut(doc_id).head_comment, &comment.value);
            return;
        };

        // A foot comment that lands on a mapping value moves back to its
        // key, climbing to the entry whose key column matches the comment.
        let mut target = chosen;
        loop {
            let Some(&(parent, position)) = parents.get(&chosen.0) else {
                break;
            };
            let parent_id = NodeId(parent);
            if doc.get(parent_id).kind == NodeKind::Mapping && position % 2 == 1 {
                let key = doc.get(parent_id).children[position - 1];
                target = key;
                if doc.get(key).start_mark.column <= comment.start_mark.column {
                    break;
                }
            }
            chosen = parent_id;
        }
        append_comment(&mut doc.get_mut(target).foot_comment, &comment.value);
    }
}

fn collection_style(style: CollectionStyle) -> Style {
    match style {
        CollectionStyle::Flow => Style::Flow,
        _ => Style::Block,
    }
}

fn append_comment(slot: &mut String, text: &str) {
    if !slot.is_empty() {
        slot.push('\n');
    }
    slot.push_str(text);
}

/// Child index -> (parent index, position within parent).
fn parent_table(doc: &Document) -> HashMap<usize, (usize, usize)> {
    let mut table = HashMap::new();
    for id in doc.ids() {
        for (position, child) in doc.get(id).children.iter().enumerate() {
            table.insert(child.0, (id.0, position));
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose_one(input: &str) -> Document {
        Composer::new(input.as_bytes())
            .compose()
            .unwrap()
            .expect("document")
    }

    fn content_root(doc: &Document) -> &Node {
        let doc_node = doc.root().unwrap();
        doc.get(doc_node.children[0])
    }

    #[test]
    fn test_mapping_children_even() {
        let doc = compose_one("a: 1\nb: 2\n");
        let root = content_root(&doc);
        assert_eq!(root.kind, NodeKind::Mapping);
        assert_eq!(root.children.len(), 4);
    }

    #[test]
    fn test_aliases_link_to_anchored_nodes() {
        let doc = compose_one("a: &x 1\nb: &y 2\nc: *x\nd: *y\n");
        let root = content_root(&doc);
        let c_value = doc.get(root.children[5]);
        let d_value = doc.get(root.children[7]);
        assert_eq!(c_value.kind, NodeKind::Alias);
        assert_eq!(d_value.kind, NodeKind::Alias);
        assert_eq!(c_value.alias, Some(root.children[1]));
        assert_eq!(d_value.alias, Some(root.children[3]));
        assert_eq!(doc.get(doc.deref(root.children[5])).value, "1");
    }

    #[test]
    fn test_unknown_anchor_fails() {
        let result = Composer::new("a: *missing\n".as_bytes()).compose();
        assert!(matches!(result, Err(Error::Composer { .. })));
    }

    #[test]
    fn test_scalar_tags_resolved() {
        let doc = compose_one("- 1\n- true\n- text\n- 1.5\n- ~\n");
        let root = content_root(&doc);
        let tags: Vec<String> = root
            .children
            .iter()
            .map(|&id| doc.get(id).short_tag())
            .collect();
        assert_eq!(tags, ["!!int", "!!bool", "!!str", "!!float", "!!null"]);
    }

    #[test]
    fn test_quoted_scalars_are_strings() {
        let doc = compose_one("- '123'\n- \"true\"\n");
        let root = content_root(&doc);
        assert_eq!(doc.get(root.children[0]).short_tag(), "!!str");
        assert_eq!(doc.get(root.children[1]).short_tag(), "!!str");
    }

    #[test]
    fn test_comment_attachment() {
        let doc = compose_one("# head\na: 1 # line\n# foot\n\nb: 2\n");
        let root = content_root(&doc);
        let key_a = doc.get(root.children[0]);
        let value_1 = doc.get(root.children[1]);
        assert!(key_a.head_comment.contains("head") || root.head_comment.contains("head"));
        assert_eq!(value_1.line_comment, "line");
        assert_eq!(key_a.foot_comment, "foot");
    }

    #[test]
    fn test_document_kind_and_version() {
        let doc = compose_one("%YAML 1.2\n---\nx\n");
        assert_eq!(doc.root().unwrap().kind, NodeKind::Document);
        assert_eq!(doc.version.map(|v| (v.major, v.minor)), Some((1, 2)));
    }

    #[test]
    fn test_multi_document_stream() {
        let mut composer = Composer::new("a: 1\n---\nb: 2\n".as_bytes());
        assert!(composer.compose().unwrap().is_some());
        assert!(composer.compose().unwrap().is_some());
        assert!(composer.compose().unwrap().is_none());
    }

    #[test]
    fn test_flow_styles_recorded() {
        let doc = compose_one("- a\n- [b, c]\n");
        let root = content_root(&doc);
        assert_eq!(root.style, Style::Block);
        assert_eq!(doc.get(root.children[1]).style, Style::Flow);
    }
}
