//! Character-level tokenizer.
//!
//! The scanner turns the reader's character stream into tokens. It tracks
//! block indentation with a stack (sentinel -1), flow nesting with a counter,
//! and potential simple keys with a stack parallel to the flow levels. When a
//! `:` confirms a simple key, the `Key` token (and in block context a
//! `BlockMappingStart`) is inserted retroactively at the recorded position in
//! the token queue.
//!
//! Comments are captured on the side with enough positional information for
//! the composer to classify them as head, line, or foot comments.

use std::collections::VecDeque;
use std::io::Read;

use crate::error::{Error, Mark, Result};
use crate::reader::{is_blank, is_blankz, is_break, is_breakz, Reader};
use crate::token::{Comment, ScalarStyle, Token, TokenData};

/// A potential simple key, one per flow level.
#[derive(Debug, Clone, Copy, Default)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Mark,
}

pub(crate) struct Scanner<R> {
    reader: Reader<R>,
    tokens: VecDeque<Token>,
    tokens_parsed: usize,
    token_available: bool,
    stream_start_produced: bool,
    pub(crate) stream_end_produced: bool,
    indent: i64,
    indents: Vec<i64>,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
    flow_level: usize,
    comments: VecDeque<Comment>,
    pending_comment: Option<Comment>,
    breaks_since_comment: u32,
    token_seen_on_line: bool,
}

impl<R: Read> Scanner<R> {
    pub fn new(input: R) -> Scanner<R> {
        Scanner {
            reader: Reader::new(input),
            tokens: VecDeque::new(),
            tokens_parsed: 0,
            token_available: false,
            stream_start_produced: false,
            stream_end_produced: false,
            indent: -1,
            indents: Vec::new(),
            simple_key_allowed: true,
            simple_keys: Vec::new(),
            flow_level: 0,
            comments: VecDeque::new(),
            pending_comment: None,
            breaks_since_comment: 0,
            token_seen_on_line: false,
        }
    }

    /// The next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token> {
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        self.tokens
            .front()
            .ok_or_else(|| Error::scanner("no more tokens", self.reader.mark))
    }

    /// Mutable access to the next token, for moving its payload out.
    pub fn peek_token_mut(&mut self) -> Result<&mut Token> {
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let mark = self.reader.mark;
        self.tokens
            .front_mut()
            .ok_or_else(|| Error::scanner("no more tokens", mark))
    }

    /// Consume the token previously returned by `peek_token`.
    pub fn skip_token(&mut self) {
        self.token_available = false;
        self.tokens_parsed += 1;
        if let Some(token) = self.tokens.pop_front() {
            if matches!(token.data, TokenData::StreamEnd) {
                self.stream_end_produced = true;
            }
        }
    }

    /// Drain the comments captured so far, in source order.
    pub fn take_comments(&mut self) -> Vec<Comment> {
        self.comments.drain(..).collect()
    }

    fn fetch_more_tokens(&mut self) -> Result<()> {
        loop {
            let mut need_more = self.tokens.is_empty();
            if !need_more {
                self.stale_simple_keys()?;
                for key in &self.simple_keys {
                    if key.possible && key.token_number == self.tokens_parsed {
                        need_more = true;
                        break;
                    }
                }
            }
            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<()> {
        self.reader.ensure(1)?;

        if !self.stream_start_produced {
            return self.fetch_stream_start();
        }

        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.reader.mark.column as i64);
        self.reader.ensure(4)?;

        if self.reader.peek() == '\0' {
            return self.fetch_stream_end();
        }

        let ch = self.reader.peek();
        let at_column_zero = self.reader.mark.column == 0;
        self.token_seen_on_line = true;

        if at_column_zero && ch == '%' {
            return self.fetch_directive();
        }
        if at_column_zero && self.check_document_indicator('-') {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if at_column_zero && self.check_document_indicator('.') {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }

        match ch {
            '[' => self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blankz(self.reader.peek_at(1)) => self.fetch_block_entry(),
            '?' if self.flow_level > 0 || is_blankz(self.reader.peek_at(1)) => self.fetch_key(),
            ':' if self.flow_level > 0 || is_blankz(self.reader.peek_at(1)) => self.fetch_value(),
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            _ => {
                let next = self.reader.peek_at(1);
                let cannot_start = is_blankz(ch)
                    || matches!(
                        ch,
                        '-' | '?'
                            | ':'
                            | ','
                            | '['
                            | ']'
                            | '{'
                            | '}'
                            | '#'
                            | '&'
                            | '*'
                            | '!'
                            | '|'
                            | '>'
                            | '\''
                            | '"'
                            | '%'
                            | '@'
                            | '`'
                    );
                let plain = !cannot_start
                    || (ch == '-' && !is_blank(next))
                    || (self.flow_level == 0 && (ch == '?' || ch == ':') && !is_blankz(next));
                if plain {
                    self.fetch_plain_scalar()
                } else {
                    Err(Error::scanner_at(
                        "while scanning for the next token",
                        self.reader.mark,
                        "found character that cannot start any token",
                        self.reader.mark,
                    ))
                }
            }
        }
    }

    fn check_document_indicator(&self, marker: char) -> bool {
        self.reader.peek() == marker
            && self.reader.peek_at(1) == marker
            && self.reader.peek_at(2) == marker
            && is_blankz(self.reader.peek_at(3))
    }

    // ------------------------------------------------------------------
    // Whitespace, line breaks, comments
    // ------------------------------------------------------------------

    fn scan_to_next_token(&mut self) -> Result<()> {
        loop {
            self.reader.ensure(1)?;
            let skip_tabs = self.flow_level > 0 || !self.simple_key_allowed;
            while self.reader.peek() == ' ' || (skip_tabs && self.reader.peek() == '\t') {
                self.reader.skip();
                self.reader.ensure(1)?;
            }
            if self.reader.peek() == '#' {
                self.scan_comment()?;
            }
            if is_break(self.reader.peek()) {
                self.reader.ensure(2)?;
                self.reader.skip_line();
                self.token_seen_on_line = false;
                self.breaks_since_comment = self.breaks_since_comment.saturating_add(1);
                if self.pending_comment.is_some() && self.breaks_since_comment >= 2 {
                    self.flush_comment(true);
                }
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
            } else {
                break;
            }
        }
        self.flush_comment(false);
        Ok(())
    }

    fn scan_comment(&mut self) -> Result<()> {
        let inline = self.token_seen_on_line;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.reader.ensure(1)?;
        if self.reader.peek() == ' ' {
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        let mut text = String::new();
        while !is_breakz(self.reader.peek()) {
            self.reader.read(&mut text);
            self.reader.ensure(1)?;
        }
        let end_mark = self.reader.mark;

        let adjacent = self.breaks_since_comment <= 1;
        if inline {
            self.flush_comment(false);
            self.comments.push_back(Comment {
                value: text,
                start_mark,
                end_mark,
                inline: true,
                blank_after: false,
            });
        } else if let Some(pending) = self.pending_comment.as_mut().filter(|_| adjacent) {
            pending.value.push('\n');
            pending.value.push_str(&text);
            pending.end_mark = end_mark;
        } else {
            self.flush_comment(false);
            self.pending_comment = Some(Comment {
                value: text,
                start_mark,
                end_mark,
                inline: false,
                blank_after: false,
            });
        }
        self.breaks_since_comment = 0;
        Ok(())
    }

    fn flush_comment(&mut self, blank_after: bool) {
        if let Some(mut comment) = self.pending_comment.take() {
            comment.blank_after = blank_after;
            self.comments.push_back(comment);
        }
    }

    // ------------------------------------------------------------------
    // Indentation
    // ------------------------------------------------------------------

    fn roll_indent(&mut self, column: i64, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token {
                data,
                start_mark: mark,
                end_mark: mark,
            };
            match number {
                Some(n) => self.tokens.insert(n - self.tokens_parsed, token),
                None => self.tokens.push_back(token),
            }
        }
    }

    fn unroll_indent(&mut self, column: i64) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark;
            self.tokens.push_back(Token {
                data: TokenData::BlockEnd,
                start_mark: mark,
                end_mark: mark,
            });
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    // ------------------------------------------------------------------
    // Simple keys
    // ------------------------------------------------------------------

    fn stale_simple_keys(&mut self) -> Result<()> {
        let mark = self.reader.mark;
        for key in &mut self.simple_keys {
            if key.possible && (key.mark.line < mark.line || key.mark.index + 1024 < mark.index) {
                if key.required {
                    return Err(Error::scanner_at(
                        "while scanning a simple key",
                        key.mark,
                        "could not find expected ':'",
                        mark,
                    ));
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<()> {
        let required = self.flow_level == 0 && self.indent == self.reader.mark.column as i64;
        if self.simple_key_allowed {
            let key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark: self.reader.mark,
            };
            self.remove_simple_key()?;
            *self.simple_keys.last_mut().expect("simple key stack") = key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<()> {
        let mark = self.reader.mark;
        let key = self.simple_keys.last_mut().expect("simple key stack");
        if key.possible && key.required {
            return Err(Error::scanner_at(
                "while scanning a simple key",
                key.mark,
                "could not find expected ':'",
                mark,
            ));
        }
        key.possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    // ------------------------------------------------------------------
    // Token fetchers
    // ------------------------------------------------------------------

    fn push(&mut self, data: TokenData, start_mark: Mark, end_mark: Mark) {
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
    }

    fn fetch_stream_start(&mut self) -> Result<()> {
        let mark = self.reader.mark;
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        self.push(
            TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            mark,
            mark,
        );
        Ok(())
    }

    fn fetch_stream_end(&mut self) -> Result<()> {
        if self.reader.mark.column != 0 {
            self.reader.mark.column = 0;
            self.reader.mark.line += 1;
        }
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.flush_comment(false);
        let mark = self.reader.mark;
        self.push(TokenData::StreamEnd, mark, mark);
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<()> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.reader.skip();
        self.reader.skip();
        self.push(data, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<()> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.push(data, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<()> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.push(data, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.push(TokenData::FlowEntry, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(Error::scanner(
                    "block sequence entries are not allowed in this context",
                    self.reader.mark,
                ));
            }
            let mark = self.reader.mark;
            self.roll_indent(
                mark.column as i64,
                None,
                TokenData::BlockSequenceStart,
                mark,
            );
        } else {
            return Err(Error::scanner(
                "block sequence entries are not allowed in flow context",
                self.reader.mark,
            ));
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.push(TokenData::BlockEntry, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(Error::scanner(
                    "mapping keys are not allowed in this context",
                    self.reader.mark,
                ));
            }
            let mark = self.reader.mark;
            self.roll_indent(mark.column as i64, None, TokenData::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.push(TokenData::Key, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<()> {
        let key = *self.simple_keys.last().expect("simple key stack");
        if key.possible {
            let token = Token {
                data: TokenData::Key,
                start_mark: key.mark,
                end_mark: key.mark,
            };
            self.tokens
                .insert(key.token_number - self.tokens_parsed, token);
            self.roll_indent(
                key.mark.column as i64,
                Some(key.token_number),
                TokenData::BlockMappingStart,
                key.mark,
            );
            self.simple_keys.last_mut().expect("simple key stack").possible = false;
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(Error::scanner(
                        "mapping values are not allowed in this context",
                        self.reader.mark,
                    ));
                }
                let mark = self.reader.mark;
                self.roll_indent(mark.column as i64, None, TokenData::BlockMappingStart, mark);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start_mark = self.reader.mark;
        self.reader.skip();
        self.push(TokenData::Value, start_mark, self.reader.mark);
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<()> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------

    fn scan_directive(&mut self) -> Result<Token> {
        let start_mark = self.reader.mark;
        self.reader.skip();
        let name = self.scan_directive_name(start_mark)?;
        let data = if name == "YAML" {
            let (major, minor) = self.scan_version_directive_value(start_mark)?;
            TokenData::VersionDirective { major, minor }
        } else if name == "TAG" {
            let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
            TokenData::TagDirective { handle, prefix }
        } else {
            return Err(Error::scanner_at(
                "while scanning a directive",
                start_mark,
                "found unknown directive name",
                self.reader.mark,
            ));
        };
        let end_mark = self.reader.mark;

        self.reader.ensure(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        if self.reader.peek() == '#' {
            self.scan_comment()?;
        }
        if !is_breakz(self.reader.peek()) {
            return Err(Error::scanner_at(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
                self.reader.mark,
            ));
        }
        if is_break(self.reader.peek()) {
            self.reader.ensure(2)?;
            self.reader.skip_line();
        }
        Ok(Token {
            data,
            start_mark,
            end_mark,
        })
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String> {
        let mut name = String::new();
        self.reader.ensure(1)?;
        while is_word_char(self.reader.peek()) {
            self.reader.read(&mut name);
            self.reader.ensure(1)?;
        }
        if name.is_empty() {
            return Err(Error::scanner_at(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
                self.reader.mark,
            ));
        }
        if !is_blankz(self.reader.peek()) {
            return Err(Error::scanner_at(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
                self.reader.mark,
            ));
        }
        Ok(name)
    }

    fn scan_version_directive_value(&mut self, start_mark: Mark) -> Result<(u32, u32)> {
        self.reader.ensure(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        let major = self.scan_version_directive_number(start_mark)?;
        if self.reader.peek() != '.' {
            return Err(Error::scanner_at(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
                self.reader.mark,
            ));
        }
        self.reader.skip();
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Mark) -> Result<u32> {
        let mut value: u32 = 0;
        let mut length = 0;
        self.reader.ensure(1)?;
        while self.reader.peek().is_ascii_digit() {
            length += 1;
            if length > 9 {
                return Err(Error::scanner_at(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                    self.reader.mark,
                ));
            }
            value = value * 10 + self.reader.peek().to_digit(10).unwrap_or(0);
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        if length == 0 {
            return Err(Error::scanner_at(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
                self.reader.mark,
            ));
        }
        Ok(value)
    }

    fn scan_tag_directive_value(&mut self, start_mark: Mark) -> Result<(String, String)> {
        self.reader.ensure(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.reader.ensure(1)?;
        if !is_blank(self.reader.peek()) {
            return Err(Error::scanner_at(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
                self.reader.mark,
            ));
        }
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        let prefix = self.scan_tag_uri(true, None, start_mark)?;
        self.reader.ensure(1)?;
        if !is_blankz(self.reader.peek()) {
            return Err(Error::scanner_at(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
                self.reader.mark,
            ));
        }
        Ok((handle, prefix))
    }

    // ------------------------------------------------------------------
    // Anchors, aliases, tags
    // ------------------------------------------------------------------

    fn scan_anchor(&mut self, alias: bool) -> Result<Token> {
        let start_mark = self.reader.mark;
        self.reader.skip();
        let mut value = String::new();
        self.reader.ensure(1)?;
        while is_anchor_char(self.reader.peek()) {
            self.reader.read(&mut value);
            self.reader.ensure(1)?;
        }
        let terminator_ok = is_blankz(self.reader.peek())
            || matches!(
                self.reader.peek(),
                '?' | ':' | ',' | ']' | '}' | '%' | '@' | '`'
            );
        if value.is_empty() || !terminator_ok {
            return Err(Error::scanner_at(
                if alias {
                    "while scanning an alias"
                } else {
                    "while scanning an anchor"
                },
                start_mark,
                "did not find expected alphabetic or numeric character",
                self.reader.mark,
            ));
        }
        let end_mark = self.reader.mark;
        let data = if alias {
            TokenData::Alias { value }
        } else {
            TokenData::Anchor { value }
        };
        Ok(Token {
            data,
            start_mark,
            end_mark,
        })
    }

    fn scan_tag(&mut self) -> Result<Token> {
        let start_mark = self.reader.mark;
        self.reader.ensure(2)?;

        let (handle, suffix);
        if self.reader.peek_at(1) == '<' {
            // Verbatim tag: !<uri>
            handle = String::new();
            self.reader.skip();
            self.reader.skip();
            suffix = self.scan_tag_uri(false, None, start_mark)?;
            if self.reader.peek() != '>' {
                return Err(Error::scanner_at(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                    self.reader.mark,
                ));
            }
            self.reader.skip();
        } else {
            let first = self.scan_tag_handle(false, start_mark)?;
            if first.len() > 1 && first.starts_with('!') && first.ends_with('!') {
                handle = first;
                suffix = self.scan_tag_uri(false, None, start_mark)?;
            } else {
                suffix = self.scan_tag_uri(false, Some(&first), start_mark)?;
                handle = String::from("!");
            }
        }
        let (handle, suffix) = if suffix.is_empty() {
            // The '!' tag on its own: a non-specific tag.
            (String::new(), String::from("!"))
        } else {
            (handle, suffix)
        };

        self.reader.ensure(1)?;
        let ok = is_blankz(self.reader.peek())
            || (self.flow_level > 0 && matches!(self.reader.peek(), ',' | ']' | '}'));
        if !ok {
            return Err(Error::scanner_at(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
                self.reader.mark,
            ));
        }
        Ok(Token {
            data: TokenData::Tag { handle, suffix },
            start_mark,
            end_mark: self.reader.mark,
        })
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: Mark) -> Result<String> {
        self.reader.ensure(1)?;
        if self.reader.peek() != '!' {
            return Err(Error::scanner_at(
                if directive {
                    "while scanning a tag directive"
                } else {
                    "while scanning a tag"
                },
                start_mark,
                "did not find expected '!'",
                self.reader.mark,
            ));
        }
        let mut handle = String::new();
        self.reader.read(&mut handle);
        self.reader.ensure(1)?;
        while is_word_char(self.reader.peek()) {
            self.reader.read(&mut handle);
            self.reader.ensure(1)?;
        }
        if self.reader.peek() == '!' {
            self.reader.read(&mut handle);
        } else if directive && handle != "!" {
            // A %TAG handle must be '!', '!!', or '!name!'.
            return Err(Error::scanner_at(
                "while scanning a tag directive",
                start_mark,
                "did not find expected '!'",
                self.reader.mark,
            ));
        }
        Ok(handle)
    }

    fn scan_tag_uri(
        &mut self,
        directive: bool,
        head: Option<&str>,
        start_mark: Mark,
    ) -> Result<String> {
        let mut string = String::new();
        if let Some(head) = head {
            // Everything after the leading '!' has already been consumed.
            string.push_str(head.get(1..).unwrap_or(""));
        }
        self.reader.ensure(1)?;
        while is_uri_char(self.reader.peek()) {
            if self.reader.peek() == '%' {
                self.scan_uri_escapes(directive, start_mark, &mut string)?;
            } else {
                self.reader.read(&mut string);
            }
            self.reader.ensure(1)?;
        }
        Ok(string)
    }

    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<()> {
        let context = if directive {
            "while parsing a %TAG directive"
        } else {
            "while parsing a tag"
        };
        let mut bytes = Vec::new();
        while self.reader.peek() == '%' {
            self.reader.ensure(3)?;
            let hi = self.reader.peek_at(1).to_digit(16);
            let lo = self.reader.peek_at(2).to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => bytes.push((hi * 16 + lo) as u8),
                _ => {
                    return Err(Error::scanner_at(
                        context,
                        start_mark,
                        "did not find URI escaped octet",
                        self.reader.mark,
                    ));
                }
            }
            self.reader.skip();
            self.reader.skip();
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        match String::from_utf8(bytes) {
            Ok(decoded) => {
                string.push_str(&decoded);
                Ok(())
            }
            Err(_) => Err(Error::scanner_at(
                context,
                start_mark,
                "found an incorrect UTF-8 byte sequence in URI escapes",
                self.reader.mark,
            )),
        }
    }

    // ------------------------------------------------------------------
    // Block scalars
    // ------------------------------------------------------------------

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token> {
        let start_mark = self.reader.mark;
        let context = if literal {
            "while scanning a literal block scalar"
        } else {
            "while scanning a folded block scalar"
        };
        self.reader.skip();

        // Header: chomping and explicit indentation, in either order.
        let mut chomping: i32 = 0;
        let mut increment: i64 = 0;
        self.reader.ensure(1)?;
        if self.reader.peek() == '+' || self.reader.peek() == '-' {
            chomping = if self.reader.peek() == '+' { 1 } else { -1 };
            self.reader.skip();
            self.reader.ensure(1)?;
            if self.reader.peek().is_ascii_digit() {
                if self.reader.peek() == '0' {
                    return Err(Error::scanner_at(
                        context,
                        start_mark,
                        "found an indentation indicator equal to 0",
                        self.reader.mark,
                    ));
                }
                increment = i64::from(self.reader.peek().to_digit(10).unwrap_or(0));
                self.reader.skip();
            }
        } else if self.reader.peek().is_ascii_digit() {
            if self.reader.peek() == '0' {
                return Err(Error::scanner_at(
                    context,
                    start_mark,
                    "found an indentation indicator equal to 0",
                    self.reader.mark,
                ));
            }
            increment = i64::from(self.reader.peek().to_digit(10).unwrap_or(0));
            self.reader.skip();
            self.reader.ensure(1)?;
            if self.reader.peek() == '+' || self.reader.peek() == '-' {
                chomping = if self.reader.peek() == '+' { 1 } else { -1 };
                self.reader.skip();
            }
        }

        self.reader.ensure(1)?;
        while is_blank(self.reader.peek()) {
            self.reader.skip();
            self.reader.ensure(1)?;
        }
        if self.reader.peek() == '#' {
            self.scan_comment()?;
        }
        if !is_breakz(self.reader.peek()) {
            return Err(Error::scanner_at(
                context,
                start_mark,
                "did not find expected comment or line break",
                self.reader.mark,
            ));
        }
        if is_break(self.reader.peek()) {
            self.reader.ensure(2)?;
            self.reader.skip_line();
        }
        let mut end_mark = self.reader.mark;

        let mut indent: i64 = 0;
        if increment > 0 {
            indent = if self.indent >= 0 {
                self.indent + increment
            } else {
                increment
            };
        }

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark, &mut end_mark)?;

        self.reader.ensure(1)?;
        let mut leading_blank = false;
        while self.reader.mark.column as i64 == indent && self.reader.peek() != '\0' {
            // Fold a single break between non-blank lines into a space.
            let trailing_blank = is_blank(self.reader.peek());
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
                leading_break.clear();
            } else {
                string.push_str(&leading_break);
                leading_break.clear();
            }
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = is_blank(self.reader.peek());
            while !is_breakz(self.reader.peek()) {
                self.reader.read(&mut string);
                self.reader.ensure(1)?;
            }
            if self.reader.peek() == '\0' {
                break;
            }
            self.reader.ensure(2)?;
            self.reader.read_line(&mut leading_break);
            self.scan_block_scalar_breaks(
                &mut indent,
                &mut trailing_breaks,
                start_mark,
                &mut end_mark,
            )?;
            self.reader.ensure(1)?;
        }

        if chomping != -1 {
            string.push_str(&leading_break);
        }
        if chomping == 1 {
            string.push_str(&trailing_breaks);
        }
        Ok(Token {
            data: TokenData::Scalar {
                value: string,
                style: if literal {
                    ScalarStyle::Literal
                } else {
                    ScalarStyle::Folded
                },
            },
            start_mark,
            end_mark,
        })
    }

    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut i64,
        breaks: &mut String,
        start_mark: Mark,
        end_mark: &mut Mark,
    ) -> Result<()> {
        let mut max_indent: i64 = 0;
        loop {
            self.reader.ensure(1)?;
            while (*indent == 0 || (self.reader.mark.column as i64) < *indent)
                && self.reader.peek() == ' '
            {
                self.reader.skip();
                self.reader.ensure(1)?;
            }
            if self.reader.mark.column as i64 > max_indent {
                max_indent = self.reader.mark.column as i64;
            }
            if (*indent == 0 || (self.reader.mark.column as i64) < *indent)
                && self.reader.peek() == '\t'
            {
                return Err(Error::scanner_at(
                    "while scanning a block scalar",
                    start_mark,
                    "found a tab character where an indentation space is expected",
                    self.reader.mark,
                ));
            }
            if !is_break(self.reader.peek()) {
                break;
            }
            self.reader.ensure(2)?;
            self.reader.read_line(breaks);
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        *end_mark = self.reader.mark;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flow scalars
    // ------------------------------------------------------------------

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token> {
        let start_mark = self.reader.mark;
        let context = if single {
            "while scanning a single-quoted scalar"
        } else {
            "while scanning a double-quoted scalar"
        };
        let quote = if single { '\'' } else { '"' };
        self.reader.skip();

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        loop {
            self.reader.ensure(4)?;
            if self.reader.mark.column == 0
                && (self.check_document_indicator('-') || self.check_document_indicator('.'))
            {
                return Err(Error::scanner_at(
                    context,
                    start_mark,
                    "found unexpected document indicator",
                    self.reader.mark,
                ));
            }
            if self.reader.peek() == '\0' {
                return Err(Error::scanner_at(
                    context,
                    start_mark,
                    "found unexpected end of stream",
                    self.reader.mark,
                ));
            }

            let mut leading_blanks = false;
            while !is_blankz(self.reader.peek()) {
                let ch = self.reader.peek();
                if single && ch == '\'' && self.reader.peek_at(1) == '\'' {
                    string.push('\'');
                    self.reader.skip();
                    self.reader.skip();
                } else if ch == quote {
                    break;
                } else if !single && ch == '\\' && is_break(self.reader.peek_at(1)) {
                    // An escaped line break is removed along with the break.
                    self.reader.ensure(3)?;
                    self.reader.skip();
                    self.reader.skip_line();
                    leading_blanks = true;
                    break;
                } else if !single && ch == '\\' {
                    self.scan_flow_scalar_escape(start_mark, &mut string)?;
                } else {
                    self.reader.read(&mut string);
                }
                self.reader.ensure(2)?;
            }

            self.reader.ensure(1)?;
            if self.reader.peek() == quote {
                break;
            }

            while is_blank(self.reader.peek()) || is_break(self.reader.peek()) {
                if is_blank(self.reader.peek()) {
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read(&mut whitespaces);
                    }
                } else {
                    self.reader.ensure(2)?;
                    if leading_blanks {
                        self.reader.read_line(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_line(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.ensure(1)?;
            }

            if leading_blanks {
                if leading_break.starts_with('\n') {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                } else {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    trailing_breaks.clear();
                }
                leading_break.clear();
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        self.reader.skip();
        Ok(Token {
            data: TokenData::Scalar {
                value: string,
                style: if single {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::DoubleQuoted
                },
            },
            start_mark,
            end_mark: self.reader.mark,
        })
    }

    fn scan_flow_scalar_escape(&mut self, start_mark: Mark, string: &mut String) -> Result<()> {
        let context = "while parsing a quoted scalar";
        self.reader.ensure(2)?;
        let code_length = match self.reader.peek_at(1) {
            '0' => {
                string.push('\0');
                0
            }
            'a' => {
                string.push('\x07');
                0
            }
            'b' => {
                string.push('\x08');
                0
            }
            't' | '\t' => {
                string.push('\t');
                0
            }
            'n' => {
                string.push('\n');
                0
            }
            'v' => {
                string.push('\x0B');
                0
            }
            'f' => {
                string.push('\x0C');
                0
            }
            'r' => {
                string.push('\r');
                0
            }
            'e' => {
                string.push('\x1B');
                0
            }
            ' ' => {
                string.push(' ');
                0
            }
            '"' => {
                string.push('"');
                0
            }
            '\'' => {
                string.push('\'');
                0
            }
            '\\' => {
                string.push('\\');
                0
            }
            '/' => {
                string.push('/');
                0
            }
            'N' => {
                string.push('\u{85}');
                0
            }
            '_' => {
                string.push('\u{A0}');
                0
            }
            'L' => {
                string.push('\u{2028}');
                0
            }
            'P' => {
                string.push('\u{2029}');
                0
            }
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => {
                return Err(Error::scanner_at(
                    context,
                    start_mark,
                    "found unknown escape character",
                    self.reader.mark,
                ));
            }
        };
        self.reader.skip();
        self.reader.skip();

        if code_length > 0 {
            self.reader.ensure(code_length)?;
            let mut value: u32 = 0;
            for k in 0..code_length {
                match self.reader.peek_at(k).to_digit(16) {
                    Some(digit) => value = (value << 4) + digit,
                    None => {
                        return Err(Error::scanner_at(
                            context,
                            start_mark,
                            "did not find expected hexadecimal number",
                            self.reader.mark,
                        ));
                    }
                }
            }
            if (0xD800..=0xDFFF).contains(&value) || value > 0x10FFFF {
                return Err(Error::scanner_at(
                    context,
                    start_mark,
                    "found invalid Unicode character escape code",
                    self.reader.mark,
                ));
            }
            string.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
            for _ in 0..code_length {
                self.reader.skip();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Plain scalars
    // ------------------------------------------------------------------

    fn scan_plain_scalar(&mut self) -> Result<Token> {
        let start_mark = self.reader.mark;
        let mut end_mark = start_mark;
        let indent = self.indent + 1;

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;

        loop {
            self.reader.ensure(4)?;
            if self.reader.mark.column == 0
                && (self.check_document_indicator('-') || self.check_document_indicator('.'))
            {
                break;
            }
            if self.reader.peek() == '#' {
                break;
            }

            while !is_blankz(self.reader.peek()) {
                let ch = self.reader.peek();
                if ch == ':'
                    && (is_blankz(self.reader.peek_at(1))
                        || (self.flow_level > 0 && is_flow_indicator(self.reader.peek_at(1))))
                {
                    break;
                }
                if self.flow_level > 0 && is_flow_indicator(ch) {
                    break;
                }

                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break.starts_with('\n') {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                        } else {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            trailing_breaks.clear();
                        }
                        leading_break.clear();
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }

                self.reader.read(&mut string);
                end_mark = self.reader.mark;
                self.reader.ensure(2)?;
            }

            if !(is_blank(self.reader.peek()) || is_break(self.reader.peek())) {
                break;
            }

            while is_blank(self.reader.peek()) || is_break(self.reader.peek()) {
                if is_blank(self.reader.peek()) {
                    if leading_blanks
                        && (self.reader.mark.column as i64) < indent
                        && self.reader.peek() == '\t'
                    {
                        return Err(Error::scanner_at(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                            self.reader.mark,
                        ));
                    }
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read(&mut whitespaces);
                    }
                } else {
                    self.reader.ensure(2)?;
                    if leading_blanks {
                        self.reader.read_line(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_line(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.ensure(1)?;
            }

            if self.flow_level == 0 && (self.reader.mark.column as i64) < indent {
                break;
            }
        }

        if leading_blanks {
            self.simple_key_allowed = true;
        }
        Ok(Token {
            data: TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        })
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_anchor_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_flow_indicator(ch: char) -> bool {
    matches!(ch, ',' | '[' | ']' | '{' | '}')
}

fn is_uri_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
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
                | '.'
                | '!'
                | '~'
                | '*'
                | '\''
                | '('
                | ')'
                | '['
                | ']'
                | '%'
                | '-'
                | '_'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Vec<TokenData> {
        let mut scanner = Scanner::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            let token = scanner.peek_token().unwrap().clone();
            let done = matches!(token.data, TokenData::StreamEnd);
            out.push(token.data);
            scanner.skip_token();
            if done {
                return out;
            }
        }
    }

    #[test]
    fn test_simple_mapping_tokens() {
        let tokens = scan_all("hello: world\n");
        assert_eq!(
            tokens[1..],
            [
                TokenData::BlockMappingStart,
                TokenData::Key,
                TokenData::Scalar {
                    value: "hello".into(),
                    style: ScalarStyle::Plain,
                },
                TokenData::Value,
                TokenData::Scalar {
                    value: "world".into(),
                    style: ScalarStyle::Plain,
                },
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_sequence_tokens() {
        let tokens = scan_all("- a\n- b\n");
        assert_eq!(
            tokens[1..],
            [
                TokenData::BlockSequenceStart,
                TokenData::BlockEntry,
                TokenData::Scalar {
                    value: "a".into(),
                    style: ScalarStyle::Plain,
                },
                TokenData::BlockEntry,
                TokenData::Scalar {
                    value: "b".into(),
                    style: ScalarStyle::Plain,
                },
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_flow_sequence_tokens() {
        let tokens = scan_all("[a, b]");
        assert_eq!(
            tokens[1..],
            [
                TokenData::FlowSequenceStart,
                TokenData::Scalar {
                    value: "a".into(),
                    style: ScalarStyle::Plain,
                },
                TokenData::FlowEntry,
                TokenData::Scalar {
                    value: "b".into(),
                    style: ScalarStyle::Plain,
                },
                TokenData::FlowSequenceEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_token_marks_non_decreasing() {
        let mut scanner = Scanner::new("a: 1\nb:\n  - x\n  - 'y'\n".as_bytes());
        let mut last: u64 = 0;
        loop {
            let token = scanner.peek_token().unwrap();
            assert!(token.start_mark.index >= last);
            last = token.start_mark.index;
            let done = matches!(token.data, TokenData::StreamEnd);
            scanner.skip_token();
            if done {
                break;
            }
        }
    }

    #[test]
    fn test_single_quoted_escape() {
        let tokens = scan_all("'it''s'\n");
        assert_eq!(
            tokens[1],
            TokenData::Scalar {
                value: "it's".into(),
                style: ScalarStyle::SingleQuoted,
            }
        );
    }

    #[test]
    fn test_double_quoted_escapes() {
        let tokens = scan_all(r#""a\tb☺\x41""#);
        assert_eq!(
            tokens[1],
            TokenData::Scalar {
                value: "a\tb\u{263A}A".into(),
                style: ScalarStyle::DoubleQuoted,
            }
        );
    }

    #[test]
    fn test_literal_block_scalar_clip() {
        let tokens = scan_all("|\n  line one\n  line two\n\n");
        assert_eq!(
            tokens[1],
            TokenData::Scalar {
                value: "line one\nline two\n".into(),
                style: ScalarStyle::Literal,
            }
        );
    }

    #[test]
    fn test_literal_block_scalar_strip_and_keep() {
        let stripped = scan_all("|-\n  text\n\n");
        assert_eq!(
            stripped[1],
            TokenData::Scalar {
                value: "text".into(),
                style: ScalarStyle::Literal,
            }
        );
        let kept = scan_all("|+\n  text\n\n");
        assert_eq!(
            kept[1],
            TokenData::Scalar {
                value: "text\n\n".into(),
                style: ScalarStyle::Literal,
            }
        );
    }

    #[test]
    fn test_folded_block_scalar() {
        let tokens = scan_all(">\n  one\n  two\n\n  three\n");
        assert_eq!(
            tokens[1],
            TokenData::Scalar {
                value: "one two\nthree\n".into(),
                style: ScalarStyle::Folded,
            }
        );
    }

    #[test]
    fn test_directives() {
        let tokens = scan_all("%YAML 1.2\n%TAG !e! tag:example.com,2000:\n---\nx\n");
        assert_eq!(
            tokens[1],
            TokenData::VersionDirective { major: 1, minor: 2 }
        );
        assert_eq!(
            tokens[2],
            TokenData::TagDirective {
                handle: "!e!".into(),
                prefix: "tag:example.com,2000:".into(),
            }
        );
        assert_eq!(tokens[3], TokenData::DocumentStart);
    }

    #[test]
    fn test_anchor_and_alias() {
        let tokens = scan_all("a: &x 1\nb: *x\n");
        assert!(tokens.contains(&TokenData::Anchor { value: "x".into() }));
        assert!(tokens.contains(&TokenData::Alias { value: "x".into() }));
    }

    #[test]
    fn test_comment_capture() {
        let mut scanner = Scanner::new("# head\na: 1 # line\n".as_bytes());
        loop {
            let done = matches!(scanner.peek_token().unwrap().data, TokenData::StreamEnd);
            scanner.skip_token();
            if done {
                break;
            }
        }
        let comments = scanner.take_comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].value, "head");
        assert!(!comments[0].inline);
        assert_eq!(comments[1].value, "line");
        assert!(comments[1].inline);
    }

    #[test]
    fn test_plain_scalar_multiline_folds() {
        let tokens = scan_all("key: word one\n  word two\n");
        assert!(tokens.contains(&TokenData::Scalar {
            value: "word one word two".into(),
            style: ScalarStyle::Plain,
        }));
    }

    #[test]
    fn test_nested_value_on_same_line_is_error() {
        let mut scanner = Scanner::new("a: b: c\n".as_bytes());
        let mut result = Ok(());
        loop {
            match scanner.peek_token() {
                Ok(token) => {
                    let done = matches!(token.data, TokenData::StreamEnd);
                    scanner.skip_token();
                    if done {
                        break;
                    }
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        let err = result.unwrap_err();
        assert!(err
            .to_string()
            .contains("mapping values are not allowed in this context"));
    }
}
