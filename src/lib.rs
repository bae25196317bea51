//! YAML 1.1/1.2 processing for Rust.
//!
//! # Processing pipeline
//!
//! Decoding runs in five phases, each pulling from the one before it:
//!
//! 1. **Reader**: detects the encoding (UTF-8, UTF-16LE/BE by BOM) and
//!    validates the byte stream into Unicode characters.
//! 2. **Scanner**: tokenizes characters, tracking indentation, flow
//!    nesting, and simple-key candidates.
//! 3. **Parser**: runs the grammar state machine over tokens, producing a
//!    flat event stream.
//! 4. **Composer**: builds a [`Document`] of [`Node`]s from events,
//!    resolving anchors and attaching comments.
//! 5. **Binder**: maps nodes onto Rust values through serde, resolving
//!    plain scalars against the core schema on the way.
//!
//! Encoding runs the same pipeline backwards: serde values become the
//! dynamic [`Value`], values become events, and the emitter renders events
//! through the encoding writer.
//!
//! # Examples
//!
//! ```
//! let value: yamlet::Value = yamlet::from_str("hello: world").unwrap();
//! assert_eq!(value.get("hello").and_then(|v| v.as_str()), Some("world"));
//!
//! let text = yamlet::to_string(&value).unwrap();
//! assert_eq!(text, "hello: world\n");
//! ```
//!
//! Multi-document streams go through [`Decoder`] and [`Encoder`], which
//! separate documents with `---`.

mod compose;
mod de;
mod emitter;
mod env;
mod error;
mod event;
mod node;
mod parser;
mod reader;
mod represent;
mod resolve;
mod scanner;
mod ser;
mod sorter;
mod timestamp;
mod token;
mod value;
mod writer;

use std::io::{Read, Write};

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::Serialize;

use crate::compose::Composer;
use crate::emitter::Emitter;
use crate::event::{Event, EventData};

pub use crate::error::{Error, Mark, Result};
pub use crate::event::{CollectionStyle, TagDirective, VersionDirective};
pub use crate::node::{Document, Node, NodeId, NodeKind, Style};
pub use crate::reader::Encoding;
pub use crate::resolve::{
    BINARY_TAG, BOOL_TAG, FLOAT_TAG, INT_TAG, MAP_TAG, MERGE_TAG, NULL_TAG, SEQ_TAG, STR_TAG,
    TIMESTAMP_TAG,
};
pub use crate::timestamp::Timestamp;
pub use crate::token::ScalarStyle;
pub use crate::value::{Mapping, Value};

/// Decode the first document in `input` into `T`.
///
/// Empty input decodes as if the document were `null`; targets that cannot
/// absorb null (a bare struct, say) report a type error.
pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T> {
    from_slice(input.as_bytes())
}

/// Decode the first document in `input` into `T`.
pub fn from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T> {
    from_reader(input)
}

/// Decode the first document from a reader into `T`.
pub fn from_reader<T: DeserializeOwned, R: Read>(input: R) -> Result<T> {
    let mut decoder = Decoder::new(input);
    match decoder.decode()? {
        Some(value) => Ok(value),
        None => T::deserialize(Value::Null.into_deserializer()),
    }
}

/// Encode `value` as a single YAML document.
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = to_vec(value)?;
    String::from_utf8(bytes).map_err(|_| Error::emitter("output is not valid UTF-8"))
}

/// Encode `value` as a single YAML document in bytes.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(value)?;
    encoder.close()?;
    Ok(encoder.into_inner())
}

/// Encode `value` as a single YAML document to a writer.
pub fn to_writer<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    let mut encoder = Encoder::new(writer);
    encoder.encode(value)?;
    encoder.close()
}

/// A streaming decoder for multi-document inputs.
///
/// Each [`Decoder::decode`] call consumes one document; `Ok(None)` marks the
/// end of the stream.
pub struct Decoder<R> {
    composer: Composer<R>,
    env_expansion: bool,
}

impl<R: Read> Decoder<R> {
    /// Wrap a reader in a decoder.
    pub fn new(input: R) -> Decoder<R> {
        Decoder {
            composer: Composer::new(input),
            env_expansion: false,
        }
    }

    /// Substitute `${NAME}` and `${NAME:default}` from the process
    /// environment inside scalar values before they resolve.
    pub fn set_env_expansion(&mut self, enabled: bool) {
        self.env_expansion = enabled;
    }

    /// Decode the next document, or `None` after the last one.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.compose_document()? {
            Some(doc) => doc.decode_with_env::<T>(self.env_expansion).map(Some),
            None => Ok(None),
        }
    }

    /// Compose the next document as a node tree, or `None` after the last.
    pub fn decode_document(&mut self) -> Result<Option<Document>> {
        self.compose_document()
    }

    fn compose_document(&mut self) -> Result<Option<Document>> {
        self.composer.compose()
    }
}

/// A streaming encoder: each [`Encoder::encode`] call writes one document,
/// with `---` separating documents from the second on.
pub struct Encoder<W: Write> {
    emitter: Emitter<W>,
    started: bool,
    closed: bool,
    documents: usize,
}

impl<W: Write> Encoder<W> {
    /// Wrap a writer in an encoder producing UTF-8.
    pub fn new(writer: W) -> Encoder<W> {
        Encoder::with_encoding(writer, Encoding::Utf8)
    }

    /// Wrap a writer in an encoder with an explicit output encoding.
    pub fn with_encoding(writer: W, encoding: Encoding) -> Encoder<W> {
        Encoder {
            emitter: Emitter::new(writer, encoding),
            started: false,
            closed: false,
            documents: 0,
        }
    }

    /// Set the indentation step, clamped to 2..=9.
    pub fn set_indent(&mut self, indent: usize) {
        self.emitter.set_indent(indent);
    }

    /// Emit canonical form: double-quoted scalars, flow collections, and
    /// explicit document markers.
    pub fn set_canonical(&mut self, canonical: bool) {
        self.emitter.set_canonical(canonical);
    }

    /// Set the soft line width (default 80); 0 disables wrapping.
    pub fn set_width(&mut self, width: usize) {
        self.emitter.set_width(width);
    }

    /// Align block sequence dashes with the containing key's column instead
    /// of indenting them one step.
    pub fn set_compact_sequences(&mut self, compact: bool) {
        self.emitter.set_compact_sequences(compact);
    }

    /// Encode one document.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if self.closed {
            return Err(Error::emitter("encode called after close"));
        }
        let value = ser::to_value(value)?;
        self.begin()?;
        self.emitter.emit(Event::bare(EventData::DocumentStart {
            version_directive: None,
            tag_directives: Vec::new(),
            implicit: self.documents == 0,
        }))?;
        let mut events = Vec::new();
        represent::value_events(&value, &mut events);
        for event in events {
            self.emitter.emit(event)?;
        }
        self.emitter
            .emit(Event::bare(EventData::DocumentEnd { implicit: true }))?;
        self.documents += 1;
        Ok(())
    }

    /// Terminate the stream and flush the writer.
    pub fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.begin()?;
            self.emitter.emit(Event::bare(EventData::StreamEnd))?;
            self.closed = true;
        }
        self.emitter.flush()
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.emitter.into_inner()
    }

    fn begin(&mut self) -> Result<()> {
        if !self.started {
            self.emitter.emit(Event::bare(EventData::StreamStart {
                encoding: Encoding::Utf8,
            }))?;
            self.started = true;
        }
        Ok(())
    }
}

impl Document {
    /// Compose the first document of `input` into a node tree. Empty input
    /// yields an empty document.
    pub fn from_str(input: &str) -> Result<Document> {
        let mut composer = Composer::new(input.as_bytes());
        Ok(composer.compose()?.unwrap_or_default())
    }

    /// Build a document from any serializable value.
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Document> {
        let value = ser::to_value(value)?;
        Ok(represent::value_to_document(&value))
    }

    /// Decode the whole document into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode_with_env(false)
    }

    /// Decode the node behind `id` into `T`.
    pub fn decode_node<T: DeserializeOwned>(&self, id: NodeId) -> Result<T> {
        de::check_cycles(self)?;
        de::deserialize_node(self, id, false)
    }

    fn decode_with_env<T: DeserializeOwned>(&self, env: bool) -> Result<T> {
        de::check_cycles(self)?;
        let content = self
            .root_id()
            .and_then(|id| match self.get(id).kind {
                NodeKind::Document => self.get(id).children.first().copied(),
                _ => Some(id),
            });
        match content {
            Some(id) => de::deserialize_node(self, id, env),
            None => T::deserialize(Value::Null.into_deserializer()),
        }
    }

    /// Render the document back to YAML, preserving styles, anchors, and
    /// comments.
    pub fn to_string(&self) -> Result<String> {
        let mut emitter = Emitter::new(Vec::new(), Encoding::Utf8);
        emitter.emit(Event::bare(EventData::StreamStart {
            encoding: Encoding::Utf8,
        }))?;
        emitter.emit(Event::bare(EventData::DocumentStart {
            version_directive: self.version,
            tag_directives: Vec::new(),
            implicit: true,
        }))?;
        let mut events = Vec::new();
        represent::node_events(self, &mut events)?;
        if events.is_empty() {
            events.push(Event::bare(EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            }));
        }
        for event in events {
            emitter.emit(event)?;
        }
        emitter.emit(Event::bare(EventData::DocumentEnd { implicit: true }))?;
        emitter.emit(Event::bare(EventData::StreamEnd))?;
        String::from_utf8(emitter.into_inner()).map_err(|_| Error::emitter("output is not valid UTF-8"))
    }
}
