//! The binder, decode direction: a serde `Deserializer` over composed nodes.
//!
//! Aliases dereference transparently (cycles are rejected up front), merge
//! keys expand with local keys winning, null clears targets to their zero
//! values, and mismatches carry the node's line in the canonical message
//! shape. Type mismatches fail soft: the message goes into an accumulator
//! shared across the traversal, the target takes its zero value, and the
//! walk continues; the aggregate comes back as one error once the decode
//! finishes. With environment expansion enabled, `${NAME}` and
//! `${NAME:default}` substitute textually and the result re-resolves, so
//! `${N:1}` lands as the integer `1` while `${N:"1"}` stays a string.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer as _, EnumAccess, IntoDeserializer,
    MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::compose::Composer;
use crate::env;
use crate::error::{Error, Result};
use crate::node::{Document, NodeId, NodeKind};
use crate::resolve::{self, Scalar, MERGE_TAG};
use crate::timestamp::Timestamp;
use crate::value::{Mapping, Value};

/// Map key marking a timestamp travelling through `deserialize_any`.
pub(crate) const TIMESTAMP_MARKER: &str = "$__yamlet::timestamp";

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Type(vec![msg.to_string()])
    }
}

/// Reject documents whose aliases would unfold forever.
pub(crate) fn check_cycles(doc: &Document) -> Result<()> {
    fn visit(
        doc: &Document,
        id: NodeId,
        on_stack: &mut HashSet<usize>,
        done: &mut HashSet<usize>,
    ) -> Result<()> {
        if done.contains(&id.0) {
            return Ok(());
        }
        if !on_stack.insert(id.0) {
            let node = doc.get(id);
            return Err(Error::composer(
                format!("anchor '{}' value contains itself", node.anchor),
                node.start_mark,
            ));
        }
        let node = doc.get(id);
        if let Some(target) = node.alias {
            visit(doc, target, on_stack, done)?;
        }
        for &child in &node.children {
            visit(doc, child, on_stack, done)?;
        }
        on_stack.remove(&id.0);
        done.insert(id.0);
        Ok(())
    }
    if let Some(root) = doc.root_id() {
        visit(doc, root, &mut HashSet::new(), &mut HashSet::new())?;
    }
    Ok(())
}

/// Run a full decode and return the type errors it accumulated as one
/// aggregate, after the traversal has finished.
pub(crate) fn deserialize_node<T: DeserializeOwned>(
    doc: &Document,
    id: NodeId,
    env: bool,
) -> Result<T> {
    let deserializer = NodeDeserializer::new(doc, id, env);
    let errors = Rc::clone(&deserializer.errors);
    let result = T::deserialize(deserializer);
    let mut errors = std::mem::take(&mut *errors.borrow_mut());
    match result {
        Ok(value) if errors.is_empty() => Ok(value),
        Ok(_) => Err(Error::Type(errors)),
        Err(Error::Type(messages)) => {
            for message in messages {
                if !errors.contains(&message) {
                    errors.push(message);
                }
            }
            Err(Error::Type(errors))
        }
        Err(other) => Err(other),
    }
}

pub(crate) struct NodeDeserializer<'a> {
    doc: &'a Document,
    id: NodeId,
    env: bool,
    errors: Rc<RefCell<Vec<String>>>,
}

enum Resolved<'a> {
    Node(&'a crate::node::Node),
    Substituted(Value),
}

impl<'a> NodeDeserializer<'a> {
    pub fn new(doc: &'a Document, id: NodeId, env: bool) -> NodeDeserializer<'a> {
        NodeDeserializer {
            doc,
            id,
            env,
            errors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn at(&self, id: NodeId) -> NodeDeserializer<'a> {
        NodeDeserializer {
            doc: self.doc,
            id,
            env: self.env,
            errors: Rc::clone(&self.errors),
        }
    }

    fn node(&self) -> &'a crate::node::Node {
        self.doc.get(self.doc.deref(self.id))
    }

    fn line(&self) -> u64 {
        self.node().start_mark.line
    }

    /// The node, with environment substitution applied to scalars when
    /// enabled. A substituted lexeme re-enters the pipeline as a fresh
    /// one-node document so flow fragments from the environment compose.
    fn resolved(&self) -> Result<Resolved<'a>> {
        let node = self.node();
        if self.env && node.kind == NodeKind::Scalar && node.value.contains("${") {
            let (expanded, forced_str) =
                env::expand(&node.value, |name| std::env::var(name).ok());
            if forced_str {
                return Ok(Resolved::Substituted(Value::String(expanded)));
            }
            if expanded != node.value {
                let value = parse_fragment(&expanded)?;
                return Ok(Resolved::Substituted(value));
            }
        }
        Ok(Resolved::Node(node))
    }

    fn scalar(&self) -> Result<(String, Scalar)> {
        let node = self.node();
        if node.kind != NodeKind::Scalar {
            return Err(Error::Type(vec![Error::mismatch(
                self.line(),
                &node.tag,
                "",
                "a scalar",
            )]));
        }
        match resolve::decode_tagged(&node.tag, &node.value) {
            Ok(scalar) => Ok((node.tag.clone(), scalar)),
            Err(problem) => Err(Error::Type(vec![format!(
                "line {}: {}",
                self.line() + 1,
                problem
            )])),
        }
    }

    fn mismatch(&self, target: &str) -> Error {
        let node = self.node();
        Error::Type(vec![Error::mismatch(
            self.line(),
            &node.tag,
            &node.value,
            target,
        )])
    }

    /// Record a mismatch without aborting; the caller hands the target its
    /// zero value and the traversal carries on.
    fn record(&self, target: &str) {
        let node = self.node();
        self.errors.borrow_mut().push(Error::mismatch(
            self.line(),
            &node.tag,
            &node.value,
            target,
        ));
    }

    fn integer(&self) -> Result<Option<i128>> {
        if self.node().kind != NodeKind::Scalar {
            return Ok(None);
        }
        match self.scalar()?.1 {
            Scalar::Int(value) => Ok(Some(i128::from(value))),
            Scalar::Uint(value) => Ok(Some(i128::from(value))),
            Scalar::Null => Ok(Some(0)),
            _ => Ok(None),
        }
    }

    /// Mapping entries with merge keys expanded. A repeated local key
    /// overwrites the earlier one; merged keys never override local keys,
    /// and among merge sources the earlier source takes precedence.
    fn mapping_entries(&self, id: NodeId) -> Result<Vec<(NodeId, NodeId)>> {
        let mut entries = Vec::new();
        let mut index: std::collections::HashMap<(String, String), usize> =
            std::collections::HashMap::new();
        self.collect_entries(id, &mut entries, &mut index, false)?;
        Ok(entries)
    }

    fn collect_entries(
        &self,
        id: NodeId,
        entries: &mut Vec<(NodeId, NodeId)>,
        index: &mut std::collections::HashMap<(String, String), usize>,
        merged: bool,
    ) -> Result<()> {
        let node = self.doc.get(self.doc.deref(id));
        let mut merges = Vec::new();
        for pair in node.children.chunks(2) {
            let (key_id, value_id) = (pair[0], pair[1]);
            let key = self.doc.get(self.doc.deref(key_id));
            if key.kind == NodeKind::Scalar && key.tag == MERGE_TAG {
                merges.push(value_id);
                continue;
            }
            if key.kind != NodeKind::Scalar {
                entries.push((key_id, value_id));
                continue;
            }
            let fingerprint = (key.tag.clone(), key.value.clone());
            match index.get(&fingerprint) {
                Some(&at) => {
                    if !merged {
                        entries[at].1 = value_id;
                    }
                }
                None => {
                    index.insert(fingerprint, entries.len());
                    entries.push((key_id, value_id));
                }
            }
        }
        for merge in merges {
            let source = self.doc.get(self.doc.deref(merge));
            match source.kind {
                NodeKind::Mapping => {
                    self.collect_entries(merge, entries, index, true)?;
                }
                NodeKind::Sequence => {
                    for &item in &source.children {
                        let target = self.doc.get(self.doc.deref(item));
                        if target.kind != NodeKind::Mapping {
                            return Err(Error::Type(vec![format!(
                                "line {}: map merge requires map or sequence of maps",
                                target.start_mark.line + 1
                            )]));
                        }
                        self.collect_entries(item, entries, index, true)?;
                    }
                }
                _ => {
                    return Err(Error::Type(vec![format!(
                        "line {}: map merge requires map or sequence of maps",
                        source.start_mark.line + 1
                    )]));
                }
            }
        }
        Ok(())
    }
}

fn parse_fragment(text: &str) -> Result<Value> {
    let mut composer = Composer::new(text.as_bytes());
    match composer.compose()? {
        Some(doc) => {
            check_cycles(&doc)?;
            let root = doc.root_id().and_then(|id| doc.get(id).children.first().copied());
            match root {
                Some(id) => deserialize_node(&doc, id, false),
                None => Ok(Value::Null),
            }
        }
        None => Ok(Value::Null),
    }
}

macro_rules! deserialize_int {
    ($method:ident, $visit:ident, $ty:ty, $name:expr) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
            if let Resolved::Substituted(value) = self.resolved()? {
                return value.into_deserializer().$method(visitor);
            }
            match self.integer()? {
                Some(wide) => match <$ty>::try_from(wide) {
                    Ok(value) => visitor.$visit(value),
                    Err(_) => {
                        // Overflow fails soft: record and keep the zero.
                        self.record($name);
                        visitor.$visit(0)
                    }
                },
                None => {
                    self.record($name);
                    visitor.$visit(0)
                }
            }
        }
    };
}

impl<'de, 'a> de::Deserializer<'de> for NodeDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let node = match self.resolved()? {
            Resolved::Substituted(value) => return value.into_deserializer().deserialize_any(visitor),
            Resolved::Node(node) => node,
        };
        match node.kind {
            NodeKind::Scalar => match self.scalar()?.1 {
                Scalar::Null => visitor.visit_unit(),
                Scalar::Bool(value) => visitor.visit_bool(value),
                Scalar::Int(value) => visitor.visit_i64(value),
                Scalar::Uint(value) => visitor.visit_u64(value),
                Scalar::Float(value) => visitor.visit_f64(value),
                Scalar::Str(value) => visitor.visit_string(value),
                Scalar::Bytes(value) => visitor.visit_byte_buf(value),
                Scalar::Timestamp(timestamp) => visitor.visit_map(TimestampAccess {
                    timestamp,
                    stage: 0,
                }),
                Scalar::Merge => visitor.visit_string(node.value.clone()),
            },
            NodeKind::Sequence => visitor.visit_seq(NodeSeqAccess {
                de: &self,
                items: node.children.clone(),
                index: 0,
            }),
            NodeKind::Mapping => {
                let entries = self.mapping_entries(self.doc.deref(self.id))?;
                visitor.visit_map(NodeMapAccess {
                    de: &self,
                    entries,
                    index: 0,
                    value: None,
                })
            }
            NodeKind::Document | NodeKind::Alias => Err(self.mismatch("a value")),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if let Resolved::Substituted(value) = self.resolved()? {
            return value.into_deserializer().deserialize_bool(visitor);
        }
        if self.node().kind != NodeKind::Scalar {
            self.record("bool");
            return visitor.visit_bool(false);
        }
        match self.scalar()?.1 {
            Scalar::Bool(value) => visitor.visit_bool(value),
            Scalar::Null => visitor.visit_bool(false),
            _ => {
                self.record("bool");
                visitor.visit_bool(false)
            }
        }
    }

    deserialize_int!(deserialize_i8, visit_i8, i8, "i8");
    deserialize_int!(deserialize_i16, visit_i16, i16, "i16");
    deserialize_int!(deserialize_i32, visit_i32, i32, "i32");
    deserialize_int!(deserialize_i64, visit_i64, i64, "i64");
    deserialize_int!(deserialize_u8, visit_u8, u8, "u8");
    deserialize_int!(deserialize_u16, visit_u16, u16, "u16");
    deserialize_int!(deserialize_u32, visit_u32, u32, "u32");

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if let Resolved::Substituted(value) = self.resolved()? {
            return value.into_deserializer().deserialize_u64(visitor);
        }
        if self.node().kind != NodeKind::Scalar {
            self.record("u64");
            return visitor.visit_u64(0);
        }
        match self.scalar()?.1 {
            Scalar::Int(value) if value >= 0 => visitor.visit_u64(value as u64),
            Scalar::Uint(value) => visitor.visit_u64(value),
            Scalar::Null => visitor.visit_u64(0),
            _ => {
                self.record("u64");
                visitor.visit_u64(0)
            }
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if let Resolved::Substituted(value) = self.resolved()? {
            return value.into_deserializer().deserialize_f64(visitor);
        }
        if self.node().kind != NodeKind::Scalar {
            self.record("f64");
            return visitor.visit_f64(0.0);
        }
        match self.scalar()?.1 {
            Scalar::Float(value) => visitor.visit_f64(value),
            Scalar::Int(value) => visitor.visit_f64(value as f64),
            Scalar::Uint(value) => visitor.visit_f64(value as f64),
            Scalar::Null => visitor.visit_f64(0.0),
            _ => {
                self.record("f64");
                visitor.visit_f64(0.0)
            }
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let node = self.node();
        let mut chars = node.value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => visitor.visit_char(ch),
            _ => {
                self.record("char");
                visitor.visit_char('\0')
            }
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let node = match self.resolved()? {
            Resolved::Substituted(value) => {
                return value.into_deserializer().deserialize_str(visitor);
            }
            Resolved::Node(node) => node,
        };
        if node.kind != NodeKind::Scalar {
            self.record("string");
            return visitor.visit_str("");
        }
        // A string target accepts any scalar's text form; binary data
        // arrives decoded.
        match self.scalar()?.1 {
            Scalar::Bytes(bytes) => visitor.visit_string(String::from_utf8_lossy(&bytes).into_owned()),
            Scalar::Null => visitor.visit_str(""),
            _ => visitor.visit_str(&node.value),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.node().kind != NodeKind::Scalar {
            self.record("bytes");
            return visitor.visit_byte_buf(Vec::new());
        }
        match self.scalar()?.1 {
            Scalar::Bytes(bytes) => visitor.visit_byte_buf(bytes),
            Scalar::Str(text) => visitor.visit_byte_buf(text.into_bytes()),
            _ => {
                self.record("bytes");
                visitor.visit_byte_buf(Vec::new())
            }
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let node = self.node();
        let is_null = node.kind == NodeKind::Scalar
            && matches!(resolve::decode_tagged(&node.tag, &node.value), Ok(Scalar::Null));
        if is_null {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let node = match self.resolved()? {
            Resolved::Substituted(value) => {
                return value.into_deserializer().deserialize_seq(visitor);
            }
            Resolved::Node(node) => node,
        };
        match node.kind {
            NodeKind::Sequence => visitor.visit_seq(NodeSeqAccess {
                de: &self,
                items: node.children.clone(),
                index: 0,
            }),
            NodeKind::Scalar if matches!(self.scalar(), Ok((_, Scalar::Null))) => {
                visitor.visit_seq(NodeSeqAccess {
                    de: &self,
                    items: Vec::new(),
                    index: 0,
                })
            }
            _ => {
                self.record("a sequence");
                visitor.visit_seq(NodeSeqAccess {
                    de: &self,
                    items: Vec::new(),
                    index: 0,
                })
            }
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let node = match self.resolved()? {
            Resolved::Substituted(value) => {
                return value.into_deserializer().deserialize_map(visitor);
            }
            Resolved::Node(node) => node,
        };
        match node.kind {
            NodeKind::Mapping => {
                let entries = self.mapping_entries(self.doc.deref(self.id))?;
                visitor.visit_map(NodeMapAccess {
                    de: &self,
                    entries,
                    index: 0,
                    value: None,
                })
            }
            NodeKind::Scalar if matches!(self.scalar(), Ok((_, Scalar::Null))) => {
                visitor.visit_map(NodeMapAccess {
                    de: &self,
                    entries: Vec::new(),
                    index: 0,
                    value: None,
                })
            }
            _ => {
                self.record("a mapping");
                visitor.visit_map(NodeMapAccess {
                    de: &self,
                    entries: Vec::new(),
                    index: 0,
                    value: None,
                })
            }
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let node = self.node();
        match node.kind {
            NodeKind::Scalar => visitor.visit_enum(NodeEnumAccess {
                de: self,
                value: None,
            }),
            NodeKind::Mapping if node.children.len() == 2 => {
                let key = node.children[0];
                let value = node.children[1];
                visitor.visit_enum(NodeEnumAccess {
                    de: self.at(key),
                    value: Some(value),
                })
            }
            _ => Err(self.mismatch("an enum variant")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

struct NodeSeqAccess<'b, 'a> {
    de: &'b NodeDeserializer<'a>,
    items: Vec<NodeId>,
    index: usize,
}

impl<'de, 'b, 'a> SeqAccess<'de> for NodeSeqAccess<'b, 'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.index >= self.items.len() {
            return Ok(None);
        }
        let id = self.items[self.index];
        self.index += 1;
        match seed.deserialize(self.de.at(id)) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Type(messages)) => {
                // The seed is spent, so the bad element cannot be retried;
                // record it and keep the elements that already took. The
                // aggregate surfaces when the decode finishes.
                self.de.errors.borrow_mut().extend(messages);
                self.index = self.items.len();
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len() - self.index)
    }
}

struct NodeMapAccess<'b, 'a> {
    de: &'b NodeDeserializer<'a>,
    entries: Vec<(NodeId, NodeId)>,
    index: usize,
    value: Option<NodeId>,
}

impl<'de, 'b, 'a> MapAccess<'de> for NodeMapAccess<'b, 'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.index >= self.entries.len() {
            return Ok(None);
        }
        let (key, value) = self.entries[self.index];
        self.index += 1;
        self.value = Some(value);
        match seed.deserialize(self.de.at(key)) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Type(messages)) => {
                self.de.errors.borrow_mut().extend(messages);
                self.value = None;
                self.index = self.entries.len();
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let id = self
            .value
            .take()
            .ok_or_else(|| Error::Type(vec![String::from("value requested before key")]))?;
        match seed.deserialize(self.de.at(id)) {
            Ok(value) => Ok(value),
            Err(Error::Type(messages)) => {
                // Recorded here; an empty aggregate bubbles up so the
                // enclosing containers keep their surviving entries.
                self.de.errors.borrow_mut().extend(messages);
                Err(Error::Type(Vec::new()))
            }
            Err(other) => Err(other),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len() - self.index)
    }
}

struct NodeEnumAccess<'a> {
    de: NodeDeserializer<'a>,
    value: Option<NodeId>,
}

impl<'de, 'a> EnumAccess<'de> for NodeEnumAccess<'a> {
    type Error = Error;
    type Variant = NodeVariantAccess<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, NodeVariantAccess<'a>)> {
        // The variant payload shares the traversal's accumulator.
        let payload = self.value.map(|id| self.de.at(id));
        let variant = seed.deserialize(self.de)?;
        Ok((variant, NodeVariantAccess { payload }))
    }
}

struct NodeVariantAccess<'a> {
    payload: Option<NodeDeserializer<'a>>,
}

impl<'de, 'a> VariantAccess<'de> for NodeVariantAccess<'a> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        match self.payload {
            Some(deserializer) => seed.deserialize(deserializer),
            None => Err(Error::Type(vec![String::from(
                "expected a value for the enum variant",
            )])),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.payload {
            Some(deserializer) => deserializer.deserialize_seq(visitor),
            None => Err(Error::Type(vec![String::from(
                "expected a sequence for the enum variant",
            )])),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.payload {
            Some(deserializer) => deserializer.deserialize_map(visitor),
            None => Err(Error::Type(vec![String::from(
                "expected a mapping for the enum variant",
            )])),
        }
    }
}

struct TimestampAccess {
    timestamp: Timestamp,
    stage: u8,
}

impl<'de> MapAccess<'de> for TimestampAccess {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.stage > 0 {
            return Ok(None);
        }
        self.stage = 1;
        seed.deserialize(TIMESTAMP_MARKER.into_deserializer()).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(self.timestamp.to_string().into_deserializer())
    }
}

// ----------------------------------------------------------------------
// Owned Value deserialization, used for environment-substituted fragments
// and for nesting `Value` inside typed targets.
// ----------------------------------------------------------------------

pub struct ValueDeserializer {
    value: Value,
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer { value: self }
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(value) => visitor.visit_bool(value),
            Value::Int(value) => visitor.visit_i64(value),
            Value::Uint(value) => visitor.visit_u64(value),
            Value::Float(value) => visitor.visit_f64(value),
            Value::String(value) => visitor.visit_string(value),
            Value::Bytes(value) => visitor.visit_byte_buf(value),
            Value::Timestamp(timestamp) => visitor.visit_map(TimestampAccess {
                timestamp,
                stage: 0,
            }),
            Value::Sequence(items) => {
                visitor.visit_seq(de::value::SeqDeserializer::new(items.into_iter()))
            }
            Value::Mapping(entries) => {
                visitor.visit_map(de::value::MapDeserializer::new(entries.into_iter()))
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            Value::String(variant) => {
                visitor.visit_enum(variant.into_deserializer())
            }
            other => other.into_deserializer().deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> std::result::Result<Value, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("any YAML value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D: de::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error> {
                deserializer.deserialize_any(self)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::String(value))
            }

            fn visit_bytes<E: de::Error>(self, value: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Sequence(items))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut entries = Mapping::new();
                let mut first = true;
                while let Some(key) = map.next_key::<Value>()? {
                    if first {
                        first = false;
                        if key.as_str() == Some(TIMESTAMP_MARKER) {
                            let lexeme: String = map.next_value()?;
                            if let Some(timestamp) = Timestamp::parse(&lexeme) {
                                return Ok(Value::Timestamp(timestamp));
                            }
                            entries.insert(key, Value::String(lexeme));
                            continue;
                        }
                    }
                    let value = map.next_value()?;
                    entries.insert(key, value);
                }
                Ok(Value::Mapping(entries))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
