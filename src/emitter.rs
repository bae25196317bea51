//! The emitter: events in, rendered YAML out.
//!
//! A state machine mirroring the parser's, with the inverse stacks. Events
//! queue until enough lookahead exists to make layout decisions (an empty
//! collection renders as `[]`/`{}`, a short scalar may stay a simple key),
//! then each state writes its piece through the writer and pushes the
//! continuation state.

use std::collections::VecDeque;
use std::io::Write;

use crate::error::{Error, Result};
use crate::event::{Event, EventData, TagDirective};
use crate::reader::Encoding;
use crate::token::ScalarStyle;
use crate::writer::Writer;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    BlockSequenceFirstItem,
    BlockSequenceItem,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    End,
}

#[derive(Default, Clone, Copy)]
struct ScalarAnalysis {
    multiline: bool,
    flow_plain_allowed: bool,
    block_plain_allowed: bool,
    single_quoted_allowed: bool,
    block_allowed: bool,
}

pub(crate) struct Emitter<W: Write> {
    writer: Writer<W>,
    states: Vec<State>,
    state: State,
    events: VecDeque<Event>,
    indents: Vec<i64>,
    indent: i64,
    flow_level: usize,

    mapping_context: bool,
    simple_key_context: bool,

    column: usize,
    whitespace: bool,
    indention: bool,

    canonical: bool,
    best_indent: usize,
    best_width: usize,
    compact_sequences: bool,

    tag_directives: Vec<TagDirective>,
    pending_line_comment: String,
    foot_comments: Vec<String>,
}

impl<W: Write> Emitter<W> {
    pub fn new(sink: W, encoding: Encoding) -> Emitter<W> {
        Emitter {
            writer: Writer::new(sink, encoding),
            states: Vec::new(),
            state: State::StreamStart,
            events: VecDeque::new(),
            indents: Vec::new(),
            indent: -1,
            flow_level: 0,
            mapping_context: false,
            simple_key_context: false,
            column: 0,
            whitespace: true,
            indention: true,
            canonical: false,
            best_indent: 4,
            best_width: 80,
            compact_sequences: false,
            tag_directives: Vec::new(),
            pending_line_comment: String::new(),
            foot_comments: Vec::new(),
        }
    }

    /// Always write double-quoted scalars, flow collections, and explicit
    /// document markers.
    pub fn set_canonical(&mut self, canonical: bool) {
        self.canonical = canonical;
    }

    /// Indentation step, clamped to 2..=9.
    pub fn set_indent(&mut self, indent: usize) {
        if (2..=9).contains(&indent) {
            self.best_indent = indent;
        }
    }

    /// Soft line width; 0 disables wrapping.
    pub fn set_width(&mut self, width: usize) {
        self.best_width = if width == 0 { usize::MAX } else { width };
    }

    /// Align block sequence dashes with the containing key instead of
    /// indenting them one step.
    pub fn set_compact_sequences(&mut self, compact: bool) {
        self.compact_sequences = compact;
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Queue one event, emitting as far as the lookahead allows.
    pub fn emit(&mut self, event: Event) -> Result<()> {
        self.events.push_back(event);
        while !self.need_more_events() {
            let event = self.events.pop_front().expect("event queue");
            self.state_machine(event)?;
        }
        Ok(())
    }

    fn need_more_events(&self) -> bool {
        let Some(head) = self.events.front() else {
            return true;
        };
        let accumulate = match head.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return false,
        };
        if self.events.len() > accumulate {
            return false;
        }
        let mut level = 0i32;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                _ => {}
            }
            if level <= 0 {
                return false;
            }
        }
        true
    }

    fn state_machine(&mut self, event: Event) -> Result<()> {
        match self.state {
            State::StreamStart => self.emit_stream_start(event),
            State::FirstDocumentStart => self.emit_document_start(event, true),
            State::DocumentStart => self.emit_document_start(event, false),
            State::DocumentContent => self.emit_document_content(event),
            State::DocumentEnd => self.emit_document_end(event),
            State::FlowSequenceFirstItem => self.emit_flow_sequence_item(event, true),
            State::FlowSequenceItem => self.emit_flow_sequence_item(event, false),
            State::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true),
            State::FlowMappingKey => self.emit_flow_mapping_key(event, false),
            State::FlowMappingSimpleValue => self.emit_flow_mapping_value(event, true),
            State::FlowMappingValue => self.emit_flow_mapping_value(event, false),
            State::BlockSequenceFirstItem => self.emit_block_sequence_item(event, true),
            State::BlockSequenceItem => self.emit_block_sequence_item(event, false),
            State::BlockMappingFirstKey => self.emit_block_mapping_key(event, true),
            State::BlockMappingKey => self.emit_block_mapping_key(event, false),
            State::BlockMappingSimpleValue => self.emit_block_mapping_value(event, true),
            State::BlockMappingValue => self.emit_block_mapping_value(event, false),
            State::End => Err(Error::emitter("expected nothing after stream end")),
        }
    }

    fn pop_state(&mut self) -> Result<State> {
        self.states
            .pop()
            .ok_or_else(|| Error::emitter("corrupt emitter state stack"))
    }

    fn emit_stream_start(&mut self, event: Event) -> Result<()> {
        if !matches!(event.data, EventData::StreamStart { .. }) {
            return Err(Error::emitter("expected STREAM-START"));
        }
        self.indent = -1;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        self.state = State::FirstDocumentStart;
        Ok(())
    }

    fn emit_document_start(&mut self, event: Event, first: bool) -> Result<()> {
        match event.data {
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit,
            } => {
                let mut implicit = implicit && first && !self.canonical;
                if let Some(version) = version_directive {
                    implicit = false;
                    self.write_indicator(
                        &format!("%YAML {}.{}", version.major, version.minor),
                        true,
                        false,
                        false,
                    )?;
                    self.write_indent()?;
                }
                for directive in &tag_directives {
                    implicit = false;
                    self.write_indicator(
                        &format!("%TAG {} {}", directive.handle, directive.prefix),
                        true,
                        false,
                        false,
                    )?;
                    self.write_indent()?;
                }
                self.tag_directives = tag_directives;
                if !implicit {
                    self.write_indent()?;
                    self.write_indicator("---", true, false, false)?;
                    if self.canonical {
                        self.write_indent()?;
                    }
                }
                self.state = State::DocumentContent;
                Ok(())
            }
            EventData::StreamEnd => {
                self.flush()?;
                self.state = State::End;
                Ok(())
            }
            _ => Err(Error::emitter("expected DOCUMENT-START or STREAM-END")),
        }
    }

    fn emit_document_content(&mut self, event: Event) -> Result<()> {
        self.states.push(State::DocumentEnd);
        if !event.head_comment.is_empty() {
            let comment = event.head_comment.clone();
            self.write_comment_lines(&comment)?;
        }
        self.emit_node(event, true, false, false, false)
    }

    fn emit_document_end(&mut self, event: Event) -> Result<()> {
        if let EventData::DocumentEnd { implicit } = event.data {
            if !event.foot_comment.is_empty() {
                let comment = event.foot_comment.clone();
                self.write_comment_lines(&comment)?;
            }
            self.write_indent()?;
            if !implicit {
                self.write_indicator("...", true, false, false)?;
                self.write_indent()?;
            }
            self.flush()?;
            self.state = State::DocumentStart;
            self.tag_directives.clear();
            Ok(())
        } else {
            Err(Error::emitter("expected DOCUMENT-END"))
        }
    }

    fn emit_node(
        &mut self,
        event: Event,
        _root: bool,
        _sequence: bool,
        mapping: bool,
        simple_key: bool,
    ) -> Result<()> {
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;
        match &event.data {
            EventData::Alias { .. } => self.emit_alias(event),
            EventData::Scalar { .. } => self.emit_scalar(event),
            EventData::SequenceStart { .. } => self.emit_sequence_start(event),
            EventData::MappingStart { .. } => self.emit_mapping_start(event),
            _ => Err(Error::emitter(
                "expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS",
            )),
        }
    }

    fn emit_alias(&mut self, event: Event) -> Result<()> {
        let EventData::Alias { anchor } = &event.data else {
            return Err(Error::emitter("expected ALIAS"));
        };
        self.write_indicator(&format!("*{}", anchor), true, false, false)?;
        self.state = self.pop_state()?;
        Ok(())
    }

    fn emit_scalar(&mut self, event: Event) -> Result<()> {
        let EventData::Scalar {
            anchor,
            tag,
            value,
            plain_implicit,
            quoted_implicit,
            style,
        } = &event.data
        else {
            return Err(Error::emitter("expected SCALAR"));
        };
        let analysis = analyze_scalar(value);
        let style = self.select_scalar_style(
            *style,
            value,
            &analysis,
            tag.as_deref(),
            *plain_implicit,
            *quoted_implicit,
        )?;
        self.process_anchor(anchor.as_deref(), "&")?;
        self.process_tag(tag.as_deref(), style, *plain_implicit, *quoted_implicit)?;
        self.increase_indent(true, false);
        match style {
            ScalarStyle::Plain | ScalarStyle::Any => {
                self.write_plain_scalar(value, !self.simple_key_context)?;
            }
            ScalarStyle::SingleQuoted => {
                self.write_single_quoted_scalar(value, !self.simple_key_context)?;
            }
            ScalarStyle::DoubleQuoted => {
                self.write_double_quoted_scalar(value, !self.simple_key_context)?;
            }
            ScalarStyle::Literal => self.write_literal_scalar(value)?,
            ScalarStyle::Folded => self.write_folded_scalar(value)?,
        }
        self.indent = self.indents.pop().unwrap_or(-1);

        if !event.line_comment.is_empty() && self.flow_level == 0 {
            if self.simple_key_context {
                // Must come after the ':' indicator; stash it.
                self.pending_line_comment = event.line_comment.clone();
            } else {
                self.write_line_comment(&event.line_comment)?;
            }
        }
        self.state = self.pop_state()?;
        Ok(())
    }

    fn emit_sequence_start(&mut self, event: Event) -> Result<()> {
        let EventData::SequenceStart {
            anchor,
            tag,
            implicit,
            style,
        } = &event.data
        else {
            return Err(Error::emitter("expected SEQUENCE-START"));
        };
        self.process_anchor(anchor.as_deref(), "&")?;
        self.process_collection_tag(tag.as_deref(), *implicit)?;
        let flow = self.flow_level > 0
            || self.canonical
            || *style == crate::event::CollectionStyle::Flow
            || self.next_is(|data| matches!(data, EventData::SequenceEnd));
        self.state = if flow {
            State::FlowSequenceFirstItem
        } else {
            State::BlockSequenceFirstItem
        };
        Ok(())
    }

    fn emit_mapping_start(&mut self, event: Event) -> Result<()> {
        let EventData::MappingStart {
            anchor,
            tag,
            implicit,
            style,
        } = &event.data
        else {
            return Err(Error::emitter("expected MAPPING-START"));
        };
        self.process_anchor(anchor.as_deref(), "&")?;
        self.process_collection_tag(tag.as_deref(), *implicit)?;
        let flow = self.flow_level > 0
            || self.canonical
            || *style == crate::event::CollectionStyle::Flow
            || self.next_is(|data| matches!(data, EventData::MappingEnd));
        self.state = if flow {
            State::FlowMappingFirstKey
        } else {
            State::BlockMappingFirstKey
        };
        Ok(())
    }

    fn next_is(&self, check: impl Fn(&EventData) -> bool) -> bool {
        self.events.front().map(|e| check(&e.data)).unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Flow collections
    // ------------------------------------------------------------------

    fn emit_flow_sequence_item(&mut self, event: Event, first: bool) -> Result<()> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::SequenceEnd = event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().unwrap_or(-1);
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.state = self.pop_state()?;
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        self.states.push(State::FlowSequenceItem);
        self.emit_node(event, false, true, false, false)
    }

    fn emit_flow_mapping_key(&mut self, event: Event, first: bool) -> Result<()> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::MappingEnd = event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().unwrap_or(-1);
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.state = self.pop_state()?;
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        if !self.canonical && self.check_simple_key(&event) {
            self.states.push(State::FlowMappingSimpleValue);
            self.emit_node(event, false, false, true, true)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(State::FlowMappingValue);
            self.emit_node(event, false, false, true, false)
        }
    }

    fn emit_flow_mapping_value(&mut self, event: Event, simple: bool) -> Result<()> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.canonical || self.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(State::FlowMappingKey);
        self.emit_node(event, false, false, true, false)
    }

    // ------------------------------------------------------------------
    // Block collections
    // ------------------------------------------------------------------

    fn emit_block_sequence_item(&mut self, event: Event, first: bool) -> Result<()> {
        if first {
            let indentless =
                self.compact_sequences && self.mapping_context && !self.indention;
            self.increase_indent(false, indentless);
            self.foot_comments.push(String::new());
        }
        if let EventData::SequenceEnd = event.data {
            self.flush_foot_comment()?;
            self.foot_comments.pop();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.state = self.pop_state()?;
            return Ok(());
        }
        self.flush_foot_comment()?;
        if !event.head_comment.is_empty() {
            let comment = event.head_comment.clone();
            self.write_comment_lines(&comment)?;
        }
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        if let Some(slot) = self.foot_comments.last_mut() {
            slot.clone_from(&event.foot_comment);
        }
        self.states.push(State::BlockSequenceItem);
        self.emit_node(event, false, true, false, false)
    }

    fn emit_block_mapping_key(&mut self, event: Event, first: bool) -> Result<()> {
        if first {
            self.increase_indent(false, false);
            self.foot_comments.push(String::new());
        }
        if let EventData::MappingEnd = event.data {
            self.flush_foot_comment()?;
            self.foot_comments.pop();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.state = self.pop_state()?;
            return Ok(());
        }
        self.flush_foot_comment()?;
        if !event.head_comment.is_empty() {
            let comment = event.head_comment.clone();
            self.write_comment_lines(&comment)?;
        }
        self.write_indent()?;
        if let Some(slot) = self.foot_comments.last_mut() {
            slot.clone_from(&event.foot_comment);
        }
        if self.check_simple_key(&event) {
            self.states.push(State::BlockMappingSimpleValue);
            self.emit_node(event, false, false, true, true)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(State::BlockMappingValue);
            self.emit_node(event, false, false, true, false)
        }
    }

    fn emit_block_mapping_value(&mut self, event: Event, simple: bool) -> Result<()> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        if !self.pending_line_comment.is_empty() {
            let comment = std::mem::take(&mut self.pending_line_comment);
            self.write_line_comment(&comment)?;
        }
        let block_collection = matches!(
            event.data,
            EventData::SequenceStart { .. } | EventData::MappingStart { .. }
        );
        if block_collection && !event.head_comment.is_empty() && self.flow_level == 0 {
            let comment = event.head_comment.clone();
            self.write_comment_lines(&comment)?;
        }
        self.states.push(State::BlockMappingKey);
        self.emit_node(event, false, false, true, false)
    }

    // ------------------------------------------------------------------
    // Simple key and style checks
    // ------------------------------------------------------------------

    fn check_simple_key(&self, event: &Event) -> bool {
        match &event.data {
            EventData::Alias { anchor } => anchor.len() <= 128,
            EventData::Scalar {
                anchor, tag, value, ..
            } => {
                let length = anchor.as_deref().map_or(0, str::len)
                    + tag.as_deref().map_or(0, str::len)
                    + value.len();
                length <= 128 && !analyze_scalar(value).multiline
            }
            EventData::SequenceStart { .. } => {
                self.next_is(|data| matches!(data, EventData::SequenceEnd))
            }
            EventData::MappingStart { .. } => {
                self.next_is(|data| matches!(data, EventData::MappingEnd))
            }
            _ => false,
        }
    }

    fn select_scalar_style(
        &self,
        requested: ScalarStyle,
        value: &str,
        analysis: &ScalarAnalysis,
        tag: Option<&str>,
        plain_implicit: bool,
        quoted_implicit: bool,
    ) -> Result<ScalarStyle> {
        let no_tag = tag.map_or(true, |tag| tag.is_empty() || tag == "!");
        if no_tag && !plain_implicit && !quoted_implicit {
            return Err(Error::emitter(
                "neither tag nor implicit flags are specified",
            ));
        }

        let mut style = if requested == ScalarStyle::Any {
            if analysis.multiline && !self.simple_key_context && self.flow_level == 0 {
                ScalarStyle::Literal
            } else {
                ScalarStyle::Plain
            }
        } else {
            requested
        };
        if self.canonical {
            style = ScalarStyle::DoubleQuoted;
        }
        if self.simple_key_context && analysis.multiline {
            style = ScalarStyle::DoubleQuoted;
        }

        if style == ScalarStyle::Plain {
            if (self.flow_level > 0 && !analysis.flow_plain_allowed)
                || (self.flow_level == 0 && !analysis.block_plain_allowed)
            {
                style = ScalarStyle::SingleQuoted;
            }
            if value.is_empty() && (self.flow_level > 0 || self.simple_key_context) {
                style = ScalarStyle::SingleQuoted;
            }
            if no_tag && !plain_implicit {
                style = ScalarStyle::SingleQuoted;
            }
        }
        if style == ScalarStyle::SingleQuoted && !analysis.single_quoted_allowed {
            style = ScalarStyle::DoubleQuoted;
        }
        if (style == ScalarStyle::Literal || style == ScalarStyle::Folded)
            && (!analysis.block_allowed || self.flow_level > 0 || self.simple_key_context)
        {
            style = ScalarStyle::DoubleQuoted;
        }
        Ok(style)
    }

    fn process_anchor(&mut self, anchor: Option<&str>, indicator: &str) -> Result<()> {
        if let Some(anchor) = anchor {
            if !anchor.is_empty() {
                self.write_indicator(&format!("{}{}", indicator, anchor), true, false, false)?;
            }
        }
        Ok(())
    }

    fn process_collection_tag(&mut self, tag: Option<&str>, implicit: bool) -> Result<()> {
        match tag {
            Some(tag) if !tag.is_empty() && tag != "!" && !implicit => self.write_tag(tag),
            _ => Ok(()),
        }
    }

    fn process_tag(
        &mut self,
        tag: Option<&str>,
        style: ScalarStyle,
        plain_implicit: bool,
        quoted_implicit: bool,
    ) -> Result<()> {
        match tag {
            Some(tag) if !tag.is_empty() && tag != "!" => {
                let implicit = if style == ScalarStyle::Plain {
                    plain_implicit
                } else {
                    quoted_implicit
                };
                if implicit {
                    Ok(())
                } else {
                    self.write_tag(tag)
                }
            }
            Some(_) => self.write_indicator("!", true, false, false),
            None => {
                if style != ScalarStyle::Plain && !quoted_implicit && !plain_implicit {
                    self.write_indicator("!", true, false, false)?;
                }
                Ok(())
            }
        }
    }

    fn write_tag(&mut self, tag: &str) -> Result<()> {
        // Prefer a shorthand through the document's tag directives; the
        // defaults for '!' and '!!' always apply.
        let mut shorthand: Option<String> = None;
        for directive in self.tag_directives.iter().chain(
            [
                TagDirective {
                    handle: String::from("!!"),
                    prefix: String::from("tag:yaml.org,2002:"),
                },
                TagDirective {
                    handle: String::from("!"),
                    prefix: String::from("!"),
                },
            ]
            .iter(),
        ) {
            if let Some(suffix) = tag.strip_prefix(directive.prefix.as_str()) {
                if !suffix.is_empty() {
                    shorthand = Some(format!("{}{}", directive.handle, escape_tag(suffix)));
                    break;
                }
            }
        }
        let rendered = shorthand.unwrap_or_else(|| format!("!<{}>", escape_tag(tag)));
        self.write_indicator(&rendered, true, false, false)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    fn write_comment_lines(&mut self, comment: &str) -> Result<()> {
        for line in comment.lines() {
            self.write_indent()?;
            if line.is_empty() {
                self.write_str("#")?;
            } else {
                self.write_str("# ")?;
                self.write_str(line)?;
            }
            self.whitespace = false;
            self.indention = false;
        }
        Ok(())
    }

    fn write_line_comment(&mut self, comment: &str) -> Result<()> {
        let mut lines = comment.lines();
        if let Some(first) = lines.next() {
            self.write_str(" # ")?;
            self.write_str(first)?;
            self.whitespace = false;
            self.indention = false;
        }
        // Continuation lines of a line comment become their own rows.
        for line in lines {
            self.write_indent()?;
            self.write_str("# ")?;
            self.write_str(line)?;
        }
        Ok(())
    }

    fn flush_foot_comment(&mut self) -> Result<()> {
        let Some(slot) = self.foot_comments.last_mut() else {
            return Ok(());
        };
        if slot.is_empty() {
            return Ok(());
        }
        let comment = std::mem::take(slot);
        self.write_comment_lines(&comment)
    }

    // ------------------------------------------------------------------
    // Low-level writing
    // ------------------------------------------------------------------

    fn write_str(&mut self, text: &str) -> Result<()> {
        self.writer.write_str(text)?;
        self.column += text.chars().count();
        Ok(())
    }

    fn write_break(&mut self) -> Result<()> {
        self.writer.write_str("\n")?;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indent(&mut self) -> Result<()> {
        let indent = self.indent.max(0) as usize;
        if !self.indention || self.column > indent || (self.column == indent && !self.whitespace) {
            self.write_break()?;
        }
        if self.column < indent {
            let spaces = " ".repeat(indent - self.column);
            self.write_str(&spaces)?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<()> {
        if need_whitespace && !self.whitespace {
            self.write_str(" ")?;
        }
        self.write_str(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent as i64 } else { 0 };
        } else if !indentless {
            if matches!(self.states.last(), Some(State::BlockSequenceItem)) {
                // The first indent inside a sequence just clears the "- ".
                self.indent += 2;
            } else {
                // Everything else aligns to the chosen indentation step.
                let step = self.best_indent as i64;
                self.indent = step * ((self.indent + step) / step);
            }
        }
    }

    // ------------------------------------------------------------------
    // Scalar writers
    // ------------------------------------------------------------------

    fn write_plain_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<()> {
        if !self.whitespace && !value.is_empty() {
            self.write_str(" ")?;
        }
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch == ' ' {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && i > 0
                    && i + 1 < chars.len()
                    && chars[i + 1] != ' '
                {
                    self.write_indent()?;
                } else {
                    self.write_str(" ")?;
                }
                spaces = true;
            } else if ch == '\n' {
                if !breaks {
                    self.write_break()?;
                }
                self.write_break()?;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_str(&ch.to_string())?;
                spaces = false;
                breaks = false;
            }
            i += 1;
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_single_quoted_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<()> {
        self.write_indicator("'", true, false, false)?;
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch == ' ' {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && i > 0
                    && i + 1 < chars.len()
                    && chars[i + 1] != ' '
                {
                    self.write_indent()?;
                } else {
                    self.write_str(" ")?;
                }
                spaces = true;
            } else if ch == '\n' {
                if !breaks {
                    self.write_break()?;
                }
                self.write_break()?;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.write_str("''")?;
                } else {
                    self.write_str(&ch.to_string())?;
                }
                spaces = false;
                breaks = false;
            }
            i += 1;
        }
        self.write_indicator("'", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_double_quoted_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<()> {
        self.write_indicator("\"", true, false, false)?;
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if !is_printable(ch) || ch == '"' || ch == '\\' {
                self.write_str(&escape_char(ch))?;
                spaces = false;
            } else if ch == ' ' {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && i > 0
                    && i + 1 < chars.len()
                {
                    self.write_indent()?;
                    if chars[i + 1] == ' ' {
                        self.write_str("\\")?;
                    }
                } else {
                    self.write_str(" ")?;
                }
                spaces = true;
            } else {
                self.write_str(&ch.to_string())?;
                spaces = false;
            }
            i += 1;
        }
        self.write_indicator("\"", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_block_scalar_hints(&mut self, value: &str) -> Result<()> {
        let mut hints = String::new();
        if value.starts_with(' ') || value.starts_with('\n') {
            hints.push_str(&self.best_indent.to_string());
        }
        if !value.ends_with('\n') {
            hints.push('-');
        } else if value.len() == 1 || value.ends_with("\n\n") {
            hints.push('+');
        }
        if !hints.is_empty() {
            self.write_str(&hints)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<()> {
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.write_break()?;
        let mut breaks = true;
        for ch in value.chars() {
            if ch == '\n' {
                self.write_break()?;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    breaks = false;
                }
                self.write_str(&ch.to_string())?;
            }
        }
        self.indention = true;
        self.whitespace = true;
        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<()> {
        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.write_break()?;
        let chars: Vec<char> = value.chars().collect();
        let mut breaks = true;
        let mut leading_spaces = true;
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch == '\n' {
                if !breaks && !leading_spaces {
                    // A single fold point becomes two breaks so reparsing
                    // folds it back to one.
                    let mut k = i;
                    while k < chars.len() && chars[k] == '\n' {
                        k += 1;
                    }
                    if k < chars.len() && chars[k] != ' ' {
                        self.write_break()?;
                    }
                }
                self.write_break()?;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = ch == ' ';
                    breaks = false;
                }
                if ch == ' '
                    && !breaks
                    && self.column > self.best_width
                    && i + 1 < chars.len()
                    && chars[i + 1] != ' '
                {
                    self.write_indent()?;
                } else {
                    self.write_str(&ch.to_string())?;
                }
            }
            i += 1;
        }
        self.indention = true;
        self.whitespace = true;
        Ok(())
    }
}

/// Characters that may appear unescaped in the output.
fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\u{20}'..='\u{7E}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}

fn escape_char(ch: char) -> String {
    match ch {
        '\0' => String::from("\\0"),
        '\x07' => String::from("\\a"),
        '\x08' => String::from("\\b"),
        '\t' => String::from("\\t"),
        '\n' => String::from("\\n"),
        '\x0B' => String::from("\\v"),
        '\x0C' => String::from("\\f"),
        '\r' => String::from("\\r"),
        '\x1B' => String::from("\\e"),
        '"' => String::from("\\\""),
        '\\' => String::from("\\\\"),
        '\u{85}' => String::from("\\N"),
        '\u{A0}' => String::from("\\_"),
        '\u{2028}' => String::from("\\L"),
        '\u{2029}' => String::from("\\P"),
        _ => {
            let code = ch as u32;
            if code <= 0xFF {
                format!("\\x{:02x}", code)
            } else if code <= 0xFFFF {
                format!("\\u{:04x}", code)
            } else {
                format!("\\U{:08x}", code)
            }
        }
    }
}

fn escape_tag(tag: &str) -> String {
    let mut out = String::new();
    for byte in tag.bytes() {
        let ch = byte as char;
        if ch.is_ascii_alphanumeric()
            || matches!(
                ch,
                ';' | '/'
                    | '?'
                    | ':'
                    | '@'
                    | '&'
                    | '='
                    | '+'
                    | '$'
                    | ','
                    | '_'
                    | '.'
                    | '~'
                    | '*'
                    | '\''
                    | '('
                    | ')'
                    | '-'
                    | '!'
            )
        {
            out.push(ch);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn analyze_scalar(value: &str) -> ScalarAnalysis {
    if value.is_empty() {
        return ScalarAnalysis {
            multiline: false,
            flow_plain_allowed: false,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: false,
        };
    }

    let chars: Vec<char> = value.chars().collect();
    let mut block_indicators = false;
    let mut flow_indicators = false;
    let mut line_breaks = false;
    let mut special_characters = false;
    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;

    if value.starts_with("---") || value.starts_with("...") {
        block_indicators = true;
        flow_indicators = true;
    }

    let mut preceded_by_whitespace = true;
    let mut previous_space = false;
    let mut previous_break = false;

    for (i, &ch) in chars.iter().enumerate() {
        let followed_by_whitespace = chars
            .get(i + 1)
            .map_or(true, |&next| next == ' ' || next == '\t' || next == '\n');
        if i == 0 {
            match ch {
                '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                | '%' | '@' | '`' => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                '?' | ':' => {
                    flow_indicators = true;
                    if followed_by_whitespace {
                        block_indicators = true;
                    }
                }
                '-' if followed_by_whitespace => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                _ => {}
            }
        } else {
            match ch {
                ',' | '?' | '[' | ']' | '{' | '}' => flow_indicators = true,
                ':' => {
                    flow_indicators = true;
                    if followed_by_whitespace {
                        block_indicators = true;
                    }
                }
                '#' if preceded_by_whitespace => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                _ => {}
            }
        }

        if ch != '\t' && ch != '\n' && !is_printable(ch) {
            special_characters = true;
        }
        if ch == '\n' {
            line_breaks = true;
        }

        if ch == ' ' {
            if i == 0 {
                leading_space = true;
            }
            if i == chars.len() - 1 {
                trailing_space = true;
            }
            if previous_break {
                break_space = true;
            }
            previous_space = true;
            previous_break = false;
        } else if ch == '\n' {
            if i == 0 {
                leading_break = true;
            }
            if i == chars.len() - 1 {
                trailing_break = true;
            }
            if previous_space {
                space_break = true;
            }
            previous_space = false;
            previous_break = true;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = ch == ' ' || ch == '\t' || ch == '\n';
    }

    let mut analysis = ScalarAnalysis {
        multiline: line_breaks,
        flow_plain_allowed: true,
        block_plain_allowed: true,
        single_quoted_allowed: true,
        block_allowed: true,
    };
    if leading_space || leading_break || trailing_space || trailing_break {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if trailing_space {
        analysis.block_allowed = false;
    }
    if break_space {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
        analysis.single_quoted_allowed = false;
    }
    if space_break || special_characters {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
        analysis.single_quoted_allowed = false;
        analysis.block_allowed = false;
    }
    if value.contains('\t') {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if line_breaks {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if flow_indicators {
        analysis.flow_plain_allowed = false;
    }
    if block_indicators {
        analysis.block_plain_allowed = false;
    }
    analysis
}
