//! Error types and source positions.

use std::fmt;

use thiserror::Error;

/// Result type for all yamlet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A position in the input or output stream.
///
/// `index` counts bytes of the UTF-8 form, `line` and `column` count from
/// zero internally and are rendered one-origin in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    /// Byte offset from the start of the stream.
    pub index: u64,
    /// Zero-based line number.
    pub line: u64,
    /// Zero-based column number.
    pub column: u64,
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

/// Error type for yamlet operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed bytes, bad BOM, or an encoding mismatch in the input.
    #[error("yaml: reader: {problem} at byte {offset}")]
    Reader {
        /// What went wrong.
        problem: String,
        /// Byte offset of the offending sequence.
        offset: u64,
    },

    /// Tokenization failure: indentation violation, unterminated scalar,
    /// illegal directive.
    #[error("yaml: {}", fmt_located(.context, .context_mark, .problem, .problem_mark))]
    Scanner {
        /// What the scanner was in the middle of, if helpful.
        context: Option<&'static str>,
        /// Where the surrounding construct started.
        context_mark: Option<Mark>,
        /// What went wrong.
        problem: String,
        /// Where it went wrong.
        problem_mark: Mark,
    },

    /// A grammar state with no legal transition.
    #[error("yaml: {}", fmt_located(.context, .context_mark, .problem, .problem_mark))]
    Parser {
        /// What the parser was in the middle of, if helpful.
        context: Option<&'static str>,
        /// Where the surrounding construct started.
        context_mark: Option<Mark>,
        /// What went wrong.
        problem: String,
        /// Where it went wrong.
        problem_mark: Mark,
    },

    /// Unknown anchor or alias cycle while building the node tree.
    #[error("yaml: line {}: {problem}", .problem_mark.line + 1)]
    Composer {
        /// What went wrong.
        problem: String,
        /// Where it went wrong.
        problem_mark: Mark,
    },

    /// Malformed event sequence, unsupported encoding, or a write failure.
    #[error("yaml: emitter: {problem}")]
    Emitter {
        /// What went wrong.
        problem: String,
    },

    /// One or more binder mismatches, aggregated over a whole decode.
    #[error("yaml: unmarshal errors:\n  {}", .0.join("\n  "))]
    Type(Vec<String>),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn fmt_located(
    context: &Option<&'static str>,
    context_mark: &Option<Mark>,
    problem: &str,
    problem_mark: &Mark,
) -> String {
    match (context, context_mark) {
        (Some(context), Some(mark)) => format!(
            "line {}: {}: line {}: {}",
            mark.line + 1,
            context,
            problem_mark.line + 1,
            problem
        ),
        _ => format!("line {}: {}", problem_mark.line + 1, problem),
    }
}

impl Error {
    pub(crate) fn reader(problem: impl Into<String>, offset: u64) -> Error {
        Error::Reader {
            problem: problem.into(),
            offset,
        }
    }

    pub(crate) fn scanner(problem: impl Into<String>, problem_mark: Mark) -> Error {
        Error::Scanner {
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn scanner_at(
        context: &'static str,
        context_mark: Mark,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> Error {
        Error::Scanner {
            context: Some(context),
            context_mark: Some(context_mark),
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn parser(problem: impl Into<String>, problem_mark: Mark) -> Error {
        Error::Parser {
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn parser_at(
        context: &'static str,
        context_mark: Mark,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> Error {
        Error::Parser {
            context: Some(context),
            context_mark: Some(context_mark),
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn composer(problem: impl Into<String>, problem_mark: Mark) -> Error {
        Error::Composer {
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn emitter(problem: impl Into<String>) -> Error {
        Error::Emitter {
            problem: problem.into(),
        }
    }

    /// Format a binder mismatch in the canonical message shape.
    pub(crate) fn mismatch(line: u64, tag: &str, value: &str, target: &str) -> String {
        let tag = tag.strip_prefix("tag:yaml.org,2002:").unwrap_or(tag);
        format!(
            "line {}: cannot unmarshal !!{} `{}` into {}",
            line + 1,
            tag,
            truncate(value, 32),
            target
        )
    }
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_display() {
        let mark = Mark {
            index: 5,
            line: 2,
            column: 7,
        };
        assert_eq!(mark.to_string(), "line 3, column 8");
    }

    #[test]
    fn test_scanner_error_message() {
        let err = Error::scanner("found character that cannot start any token", Mark::default());
        assert_eq!(
            err.to_string(),
            "yaml: line 1: found character that cannot start any token"
        );
    }

    #[test]
    fn test_type_error_aggregates() {
        let err = Error::Type(vec![
            Error::mismatch(0, "tag:yaml.org,2002:str", "x", "i64"),
            Error::mismatch(2, "tag:yaml.org,2002:int", "3", "bool"),
        ]);
        assert_eq!(
            err.to_string(),
            "yaml: unmarshal errors:\n  line 1: cannot unmarshal !!str `x` into i64\n  line 3: cannot unmarshal !!int `3` into bool"
        );
    }
}
