//! `${NAME}` and `${NAME:default}` substitution inside scalar values.
//!
//! Substitution is textual: the result re-enters scalar resolution, so an
//! unquoted default like `${N:1}` decodes as the integer 1. A default
//! wrapped in quotes pins the result to a string.

/// Expand every `${...}` reference in `input` through `lookup`.
///
/// Returns the expanded text and whether a quoted default forced the result
/// to stay a string. An unset variable with no default expands to nothing.
pub(crate) fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> (String, bool) {
    let mut out = String::with_capacity(input.len());
    let mut forced_str = false;
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            // No closing brace: keep the text as written.
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let reference = &body[..end];
        let (name, default) = match reference.find(':') {
            Some(colon) => (&reference[..colon], Some(&reference[colon + 1..])),
            None => (reference, None),
        };
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => {
                if let Some(default) = default {
                    let trimmed = strip_quotes(default);
                    if trimmed.len() != default.len() {
                        forced_str = true;
                    }
                    out.push_str(trimmed);
                }
            }
        }
        rest = &body[end + 1..];
    }
    out.push_str(rest);
    (out, forced_str)
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fixed(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_without_default_is_empty() {
        let vars = fixed(&[]);
        assert_eq!(expand("${BAR}", |n| vars.get(n).cloned()), (String::new(), false));
    }

    #[test]
    fn test_default_applies_when_unset() {
        let vars = fixed(&[]);
        assert_eq!(
            expand("${BAR:foo}", |n| vars.get(n).cloned()),
            (String::from("foo"), false)
        );
    }

    #[test]
    fn test_env_wins_over_default() {
        let vars = fixed(&[("BAR", "bar")]);
        assert_eq!(
            expand("${BAR:foo}", |n| vars.get(n).cloned()),
            (String::from("bar"), false)
        );
    }

    #[test]
    fn test_multiple_substitutions() {
        let vars = fixed(&[("BAR", "bar"), ("FOO", "foo")]);
        assert_eq!(
            expand("http://${BAR:x}/${FOO:y}", |n| vars.get(n).cloned()),
            (String::from("http://bar/foo"), false)
        );
    }

    #[test]
    fn test_quoted_default_forces_string() {
        let vars = fixed(&[]);
        assert_eq!(
            expand("${INT:\"1\"}", |n| vars.get(n).cloned()),
            (String::from("1"), true)
        );
    }

    #[test]
    fn test_unclosed_reference_kept_verbatim() {
        let vars = fixed(&[]);
        assert_eq!(
            expand("${BAR", |n| vars.get(n).cloned()),
            (String::from("${BAR"), false)
        );
    }
}
