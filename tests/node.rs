//! Node surface: tree shape, styles, anchors, comments, node-level decode.

use yamlet::{Document, Node, NodeKind, Style, Value};

fn content<'a>(doc: &'a Document) -> &'a Node {
    let root = doc.root().expect("document node");
    assert_eq!(root.kind, NodeKind::Document);
    doc.get(root.children[0])
}

#[test]
fn test_tree_shape_and_positions() {
    let doc = Document::from_str("a: 1\nb:\n    - x\n").unwrap();
    let mapping = content(&doc);
    assert_eq!(mapping.kind, NodeKind::Mapping);
    assert_eq!(mapping.children.len(), 4);

    let key_a = doc.get(mapping.children[0]);
    assert_eq!(key_a.value, "a");
    assert_eq!(key_a.line(), 1);
    assert_eq!(key_a.column(), 1);

    let seq = doc.get(mapping.children[3]);
    assert_eq!(seq.kind, NodeKind::Sequence);
    assert_eq!(seq.children.len(), 1);
    assert_eq!(doc.get(seq.children[0]).line(), 3);
}

#[test]
fn test_scalar_styles_recorded() {
    let doc = Document::from_str("- plain\n- 'single'\n- \"double\"\n- |\n    lit\n- >\n    fold\n")
        .unwrap();
    let seq = content(&doc);
    let styles: Vec<Style> = seq
        .children
        .iter()
        .map(|&id| doc.get(id).style)
        .collect();
    assert_eq!(
        styles,
        [
            Style::Plain,
            Style::SingleQuoted,
            Style::DoubleQuoted,
            Style::Literal,
            Style::Folded,
        ]
    );
}

#[test]
fn test_flow_style_preserved_through_node_round_trip() {
    let doc = Document::from_str("- a\n- [b, c]\n").unwrap();
    assert_eq!(doc.to_string().unwrap(), "- a\n- [b, c]\n");
}

#[test]
fn test_anchor_table_and_alias_nodes() {
    let doc = Document::from_str("a: &x 1\nb: &y 2\nc: *x\nd: *y\n").unwrap();
    let mapping = content(&doc);

    let c_value = doc.get(mapping.children[5]);
    let d_value = doc.get(mapping.children[7]);
    assert_eq!(c_value.kind, NodeKind::Alias);
    assert_eq!(d_value.kind, NodeKind::Alias);
    assert_eq!(c_value.alias, Some(mapping.children[1]));
    assert_eq!(d_value.alias, Some(mapping.children[3]));

    assert_eq!(doc.anchor("x").unwrap().value, "1");
    assert_eq!(doc.anchor("y").unwrap().value, "2");
}

#[test]
fn test_anchor_round_trip() {
    let input = "a: &x 1\nb: *x\n";
    let doc = Document::from_str(input).unwrap();
    assert_eq!(doc.to_string().unwrap(), input);
}

#[test]
fn test_comments_attach_and_survive() {
    let input = "# head comment\na: 1 # trailing\n";
    let doc = Document::from_str(input).unwrap();
    let mapping = content(&doc);
    let value_node = doc.get(mapping.children[1]);
    assert_eq!(value_node.line_comment, "trailing");

    let out = doc.to_string().unwrap();
    assert!(out.contains("# head comment"), "{}", out);
    assert!(out.contains("a: 1 # trailing"), "{}", out);
}

#[test]
fn test_foot_comment_moves_to_key() {
    let input = "a:\n    b: 1\n# foot\n\nc: 2\n";
    let doc = Document::from_str(input).unwrap();
    let mapping = content(&doc);
    let key_a = doc.get(mapping.children[0]);
    assert_eq!(key_a.foot_comment, "foot");
}

#[test]
fn test_node_level_decode() {
    let doc = Document::from_str("server:\n    port: 8080\n").unwrap();
    let mapping = content(&doc);
    let server_id = mapping.children[1];

    #[derive(serde::Deserialize)]
    struct Server {
        port: u16,
    }
    let server: Server = doc.decode_node(server_id).unwrap();
    assert_eq!(server.port, 8080);
}

#[test]
fn test_document_from_value() {
    let mut map = yamlet::Mapping::new();
    map.insert(Value::from("k"), Value::from(1i64));
    let doc = Document::from_value(&Value::Mapping(map)).unwrap();
    assert_eq!(doc.to_string().unwrap(), "k: 1\n");
    let back: Value = doc.decode().unwrap();
    assert_eq!(back.get("k"), Some(&Value::Int(1)));
}

#[test]
fn test_version_directive_survives() {
    let doc = Document::from_str("%YAML 1.2\n---\na: 1\n").unwrap();
    let version = doc.version.expect("version directive");
    assert_eq!((version.major, version.minor), (1, 2));
    let out = doc.to_string().unwrap();
    assert!(out.starts_with("%YAML 1.2\n---\n"), "{}", out);
}

#[test]
fn test_short_tags() {
    let doc = Document::from_str("- 1\n- text\n- !!binary aGk=\n").unwrap();
    let seq = content(&doc);
    assert_eq!(doc.get(seq.children[0]).short_tag(), "!!int");
    assert_eq!(doc.get(seq.children[1]).short_tag(), "!!str");
    assert_eq!(doc.get(seq.children[2]).short_tag(), "!!binary");
}

#[test]
fn test_event_level_idempotence() {
    let inputs = [
        "a: 1\nb:\n    - x\n    - y\n",
        "- a\n- [b, c]\n- {d: e}\n",
        "text: |\n    body\n",
        "a: &x 1\nb: *x\n",
    ];
    for input in inputs {
        let doc = Document::from_str(input).unwrap();
        let once = doc.to_string().unwrap();
        let doc2 = Document::from_str(&once).unwrap();
        let twice = doc2.to_string().unwrap();
        assert_eq!(once, twice, "input {:?}", input);
    }
}
