//! The token alphabet produced by the scanner.

use crate::error::Mark;
use crate::reader::Encoding;

/// How a scalar was written in the source, or should be written on output.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub enum ScalarStyle {
    /// Let the emitter choose.
    #[default]
    Any,
    /// An unquoted scalar.
    Plain,
    /// `'...'` with `''` as the only escape.
    SingleQuoted,
    /// `"..."` with C-style escapes.
    DoubleQuoted,
    /// `|` block scalar, line breaks preserved.
    Literal,
    /// `>` block scalar, line breaks folded.
    Folded,
}

/// A single token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub data: TokenData,
    pub start_mark: Mark,
    pub end_mark: Mark,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenData {
    StreamStart {
        encoding: Encoding,
    },
    StreamEnd,
    VersionDirective {
        major: u32,
        minor: u32,
    },
    TagDirective {
        handle: String,
        prefix: String,
    },
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias {
        value: String,
    },
    Anchor {
        value: String,
    },
    Tag {
        handle: String,
        suffix: String,
    },
    Scalar {
        value: String,
        style: ScalarStyle,
    },
}

/// A comment captured by the scanner, classified later by the composer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Comment {
    /// Text without the `#` markers, one line per source line.
    pub value: String,
    pub start_mark: Mark,
    pub end_mark: Mark,
    /// Whether the comment trails other content on its line.
    pub inline: bool,
    /// Whether a blank line separates the comment from what follows.
    pub blank_after: bool,
}
