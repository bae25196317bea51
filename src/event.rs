//! The event alphabet shared by the parser and the emitter.

use crate::error::Mark;
use crate::reader::Encoding;
use crate::token::ScalarStyle;

/// Block or flow rendering of a collection.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub enum CollectionStyle {
    /// Let the emitter choose.
    #[default]
    Any,
    /// Line-and-indent structure.
    Block,
    /// JSON-like inline structure.
    Flow,
}

/// A `%YAML` directive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VersionDirective {
    pub major: u32,
    pub minor: u32,
}

/// A `%TAG` directive binding a handle to a prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

/// One parsing or emitting event, with its source span and any comments
/// attached to the node it introduces.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Event {
    pub data: EventData,
    pub start_mark: Mark,
    pub end_mark: Mark,
    pub head_comment: String,
    pub line_comment: String,
    pub foot_comment: String,
}

impl Event {
    pub fn new(data: EventData, start_mark: Mark, end_mark: Mark) -> Event {
        Event {
            data,
            start_mark,
            end_mark,
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
        }
    }

    pub fn bare(data: EventData) -> Event {
        Event::new(data, Mark::default(), Mark::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum EventData {
    StreamStart {
        encoding: Encoding,
    },
    #[default]
    StreamEnd,
    DocumentStart {
        version_directive: Option<VersionDirective>,
        tag_directives: Vec<TagDirective>,
        implicit: bool,
    },
    DocumentEnd {
        implicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        value: String,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
}
