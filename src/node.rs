//! The composed node tree.
//!
//! Nodes live in an arena owned by their [`Document`]; aliases and the anchor
//! table refer to nodes by [`NodeId`], which stays valid for the document's
//! lifetime. Mapping nodes store their children as alternating key/value
//! pairs, so a well-formed mapping always has an even child count.

use std::collections::HashMap;

use crate::error::Mark;
use crate::event::VersionDirective;

/// Stable identifier of a node within its document.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) usize);

/// What a node represents.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    /// The document itself; has exactly one child, the root.
    Document,
    /// A scalar value.
    Scalar,
    /// A sequence of nodes.
    Sequence,
    /// A mapping with alternating key/value children.
    Mapping,
    /// A reference to an anchored node in the same document.
    Alias,
}

/// The presentation style recorded for a node.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum Style {
    /// No preference; the emitter chooses.
    #[default]
    Any,
    /// Plain scalar.
    Plain,
    /// Single-quoted scalar.
    SingleQuoted,
    /// Double-quoted scalar.
    DoubleQuoted,
    /// Literal block scalar.
    Literal,
    /// Folded block scalar.
    Folded,
    /// Block collection.
    Block,
    /// Flow collection.
    Flow,
}

/// One node of a composed document.
#[derive(Clone, Debug)]
pub struct Node {
    /// The node variant.
    pub kind: NodeKind,
    /// How the node was (or should be) presented.
    pub style: Style,
    /// The resolved tag, e.g. `tag:yaml.org,2002:str`.
    pub tag: String,
    /// The scalar text; empty for collections.
    pub value: String,
    /// The anchor name, if the node carries `&name`.
    pub anchor: String,
    /// The alias target, for [`NodeKind::Alias`] nodes.
    pub alias: Option<NodeId>,
    /// Sequence items, or alternating mapping keys and values.
    pub children: Vec<NodeId>,
    /// Where the node started in the source.
    pub start_mark: Mark,
    /// Where the node ended in the source.
    pub end_mark: Mark,
    /// Comment block above the node.
    pub head_comment: String,
    /// Comment trailing the node on its last line.
    pub line_comment: String,
    /// Comment block below the node.
    pub foot_comment: String,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Node {
        Node {
            kind,
            style: Style::Any,
            tag: String::new(),
            value: String::new(),
            anchor: String::new(),
            alias: None,
            children: Vec::new(),
            start_mark: Mark::default(),
            end_mark: Mark::default(),
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
        }
    }

    /// One-based line of the node start, as surfaced to users.
    pub fn line(&self) -> u64 {
        self.start_mark.line + 1
    }

    /// One-based column of the node start.
    pub fn column(&self) -> u64 {
        self.start_mark.column + 1
    }

    /// The tag in its `!!short` form when it is a core-schema tag.
    pub fn short_tag(&self) -> String {
        match self.tag.strip_prefix("tag:yaml.org,2002:") {
            Some(suffix) => format!("!!{}", suffix),
            None => self.tag.clone(),
        }
    }
}

/// A composed document: arena, root, and anchor table.
#[derive(Clone, Debug, Default)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: Option<NodeId>,
    pub(crate) anchors: HashMap<String, NodeId>,
    /// The `%YAML` directive the document carried, if any.
    pub version: Option<VersionDirective>,
}

impl Document {
    /// The node behind an identifier.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// The document's root node, if the document is not empty.
    pub fn root(&self) -> Option<&Node> {
        self.root.map(|id| self.get(id))
    }

    pub(crate) fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    /// Look up an anchored node by name.
    pub fn anchor(&self, name: &str) -> Option<&Node> {
        self.anchors.get(name).map(|&id| self.get(id))
    }

    pub(crate) fn anchor_id(&self, name: &str) -> Option<NodeId> {
        self.anchors.get(name).copied()
    }

    /// Follow an alias to its target; other nodes resolve to themselves.
    pub fn deref(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut hops = 0;
        while let (NodeKind::Alias, Some(target)) =
            (self.get(current).kind, self.get(current).alias)
        {
            current = target;
            hops += 1;
            if hops > self.nodes.len() {
                break;
            }
        }
        current
    }

    /// All node identifiers in composition order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}
