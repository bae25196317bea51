//! The core-schema resolver: plain scalar lexemes to tags and typed values.
//!
//! Resolution is a first-byte dispatch followed by a keyword lookup, with the
//! numeric and timestamp grammars handled by hand. The recognized forms are
//! the YAML 1.1 set (so `yes`, `on`, `0o14`, `0x1F`, `0b101`, and leading-zero
//! octals all resolve) while staying within the 1.2 core tags.

use base64::Engine;

use crate::timestamp::Timestamp;

/// The tag `!!null`.
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
/// The tag `!!bool`.
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
/// The tag `!!str`.
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag `!!int`.
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
/// The tag `!!float`.
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
/// The tag `!!timestamp`.
pub const TIMESTAMP_TAG: &str = "tag:yaml.org,2002:timestamp";
/// The tag `!!binary`.
pub const BINARY_TAG: &str = "tag:yaml.org,2002:binary";
/// The tag `!!seq`.
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag `!!map`.
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";
/// The tag `!!merge`, resolved for the `<<` key.
pub const MERGE_TAG: &str = "tag:yaml.org,2002:merge";

/// A resolved scalar in its host-neutral unboxed form.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Timestamp(Timestamp),
    /// The `<<` merge marker.
    Merge,
}

/// Resolve a plain scalar with no explicit tag.
pub(crate) fn resolve(value: &str) -> (&'static str, Scalar) {
    if value.is_empty() {
        return (NULL_TAG, Scalar::Null);
    }
    match dispatch_class(value.as_bytes()[0]) {
        Class::Map => {
            if let Some(resolved) = lookup_keyword(value) {
                return resolved;
            }
            (STR_TAG, Scalar::Str(value.to_string()))
        }
        Class::Dot => {
            if let Some(resolved) = lookup_keyword(value) {
                return resolved;
            }
            match parse_float(value) {
                Some(float) => (FLOAT_TAG, Scalar::Float(float)),
                None => (STR_TAG, Scalar::Str(value.to_string())),
            }
        }
        Class::Sign | Class::Digit => {
            if let Some(resolved) = lookup_keyword(value) {
                return resolved;
            }
            if let Some(scalar) = parse_int(value) {
                return (INT_TAG, scalar);
            }
            if let Some(float) = parse_float(value) {
                return (FLOAT_TAG, Scalar::Float(float));
            }
            if let Some(timestamp) = Timestamp::parse(value) {
                return (TIMESTAMP_TAG, Scalar::Timestamp(timestamp));
            }
            (STR_TAG, Scalar::Str(value.to_string()))
        }
        Class::Merge => {
            if value == "<<" {
                (MERGE_TAG, Scalar::Merge)
            } else {
                (STR_TAG, Scalar::Str(value.to_string()))
            }
        }
        Class::Other => (STR_TAG, Scalar::Str(value.to_string())),
    }
}

/// Resolve the tag alone; used when composing nodes.
pub(crate) fn resolve_tag(value: &str) -> &'static str {
    resolve(value).0
}

/// Decode a scalar under an explicit tag. Returns a problem description when
/// the lexeme does not inhabit the tagged type.
pub(crate) fn decode_tagged(tag: &str, value: &str) -> Result<Scalar, String> {
    match tag {
        NULL_TAG => Ok(Scalar::Null),
        STR_TAG => Ok(Scalar::Str(value.to_string())),
        BOOL_TAG => match lookup_keyword(value) {
            Some((BOOL_TAG, scalar)) => Ok(scalar),
            _ => Err(format!("cannot decode `{}` as a bool", value)),
        },
        INT_TAG => {
            parse_int(value).ok_or_else(|| format!("cannot decode `{}` as an int", value))
        }
        FLOAT_TAG => match lookup_keyword(value) {
            Some((FLOAT_TAG, scalar)) => Ok(scalar),
            _ => parse_float(value)
                .map(Scalar::Float)
                .ok_or_else(|| format!("cannot decode `{}` as a float", value)),
        },
        BINARY_TAG => {
            let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map(Scalar::Bytes)
                .map_err(|_| format!("cannot decode `{}` as base64 data", value))
        }
        TIMESTAMP_TAG => Timestamp::parse(value)
            .map(Scalar::Timestamp)
            .ok_or_else(|| format!("cannot decode `{}` as a timestamp", value)),
        MERGE_TAG => Ok(Scalar::Merge),
        _ => Ok(Scalar::Str(value.to_string())),
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Class {
    /// Possibly a keyword: bools, nulls, and friends.
    Map,
    /// `.`: float or `.inf`-family keyword.
    Dot,
    /// `+` or `-`.
    Sign,
    /// ASCII digit.
    Digit,
    /// `<`: possibly the merge marker.
    Merge,
    /// Definitely a string.
    Other,
}

fn dispatch_class(byte: u8) -> Class {
    match byte {
        b'+' | b'-' => Class::Sign,
        b'0'..=b'9' => Class::Digit,
        b'.' => Class::Dot,
        b'<' => Class::Merge,
        b'y' | b'Y' | b'n' | b'N' | b't' | b'T' | b'f' | b'F' | b'o' | b'O' | b'~' => Class::Map,
        _ => Class::Other,
    }
}

fn lookup_keyword(value: &str) -> Option<(&'static str, Scalar)> {
    let scalar = match value {
        "~" | "null" | "Null" | "NULL" => (NULL_TAG, Scalar::Null),
        "y" | "Y" | "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => {
            (BOOL_TAG, Scalar::Bool(true))
        }
        "n" | "N" | "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => {
            (BOOL_TAG, Scalar::Bool(false))
        }
        ".nan" | ".NaN" | ".NAN" => (FLOAT_TAG, Scalar::Float(f64::NAN)),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            (FLOAT_TAG, Scalar::Float(f64::INFINITY))
        }
        "-.inf" | "-.Inf" | "-.INF" => (FLOAT_TAG, Scalar::Float(f64::NEG_INFINITY)),
        _ => return None,
    };
    Some(scalar)
}

/// Integer forms: decimal, `0x` hex, `0o` and leading-zero octal, `0b`
/// binary, all with an optional sign and with `_` separators stripped.
fn parse_int(value: &str) -> Option<Scalar> {
    let cleaned: String;
    let mut text = value;
    if text.contains('_') {
        cleaned = text.replace('_', "");
        text = &cleaned;
    }

    let (negative, digits) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }

    let (radix, digits) = if let Some(rest) = digits.strip_prefix("0x").or(digits.strip_prefix("0X"))
    {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0b").or(digits.strip_prefix("0B")) {
        (2, rest)
    } else if let Some(rest) = digits.strip_prefix("0o").or(digits.strip_prefix("0O")) {
        (8, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        // i64::MIN has no positive counterpart; check the magnitude directly.
        if magnitude > i64::MAX as u64 + 1 {
            return None;
        }
        Some(Scalar::Int((magnitude as i64).wrapping_neg()))
    } else if magnitude <= i64::MAX as u64 {
        Some(Scalar::Int(magnitude as i64))
    } else {
        Some(Scalar::Uint(magnitude))
    }
}

/// Float forms: `[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?`.
fn parse_float(value: &str) -> Option<f64> {
    let body = value.strip_prefix(['+', '-']).unwrap_or(value);
    if body.is_empty() || !body.as_bytes()[0].is_ascii_digit() && !body.starts_with('.') {
        return None;
    }
    let mut saw_digit = false;
    let mut saw_dot = false;
    let mut saw_exponent = false;
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '0'..='9' => saw_digit = true,
            '_' if !saw_exponent => {}
            '.' if !saw_dot && !saw_exponent => saw_dot = true,
            'e' | 'E' if saw_digit && !saw_exponent => {
                saw_exponent = true;
                if let Some(&sign) = chars.peek() {
                    if sign == '+' || sign == '-' {
                        chars.next();
                    }
                }
                // The exponent needs at least one digit.
                if chars.peek().is_none() {
                    return None;
                }
            }
            _ => return None,
        }
    }
    if !saw_digit || !(saw_dot || saw_exponent) {
        // A dotless, exponentless run is an integer, not a float.
        return None;
    }
    let cleaned: String = value.chars().filter(|&c| c != '_').collect();
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_of(value: &str) -> &'static str {
        resolve(value).0
    }

    #[test]
    fn test_null_forms() {
        for input in ["", "~", "null", "Null", "NULL"] {
            assert_eq!(resolve(input), (NULL_TAG, Scalar::Null));
        }
    }

    #[test]
    fn test_bool_forms() {
        for input in ["y", "yes", "True", "on", "ON"] {
            assert_eq!(resolve(input), (BOOL_TAG, Scalar::Bool(true)));
        }
        for input in ["n", "NO", "false", "Off"] {
            assert_eq!(resolve(input), (BOOL_TAG, Scalar::Bool(false)));
        }
        // Near-misses stay strings.
        assert_eq!(tag_of("yess"), STR_TAG);
        assert_eq!(tag_of("onn"), STR_TAG);
    }

    #[test]
    fn test_int_bases() {
        assert_eq!(resolve("685230"), (INT_TAG, Scalar::Int(685230)));
        assert_eq!(resolve("+685_230"), (INT_TAG, Scalar::Int(685230)));
        assert_eq!(resolve("02472256"), (INT_TAG, Scalar::Int(685230)));
        assert_eq!(resolve("0o2472256"), (INT_TAG, Scalar::Int(685230)));
        assert_eq!(resolve("0x_0A_74_AE"), (INT_TAG, Scalar::Int(685230)));
        assert_eq!(
            resolve("0b1010_0111_0100_1010_1110"),
            (INT_TAG, Scalar::Int(685230))
        );
        assert_eq!(resolve("-0b101010"), (INT_TAG, Scalar::Int(-42)));
    }

    #[test]
    fn test_int_extremes() {
        assert_eq!(
            resolve("9223372036854775807"),
            (INT_TAG, Scalar::Int(i64::MAX))
        );
        assert_eq!(
            resolve("-9223372036854775808"),
            (INT_TAG, Scalar::Int(i64::MIN))
        );
        assert_eq!(
            resolve("-0b1000000000000000000000000000000000000000000000000000000000000000"),
            (INT_TAG, Scalar::Int(i64::MIN))
        );
        // One past i64 range overflows into u64.
        assert_eq!(
            resolve("9223372036854775808"),
            (INT_TAG, Scalar::Uint(9223372036854775808))
        );
        assert_eq!(tag_of("-9223372036854775809"), STR_TAG);
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(resolve("0.1"), (FLOAT_TAG, Scalar::Float(0.1)));
        assert_eq!(resolve(".1"), (FLOAT_TAG, Scalar::Float(0.1)));
        assert_eq!(resolve("-.1"), (FLOAT_TAG, Scalar::Float(-0.1)));
        assert_eq!(resolve("6.8523e+5"), (FLOAT_TAG, Scalar::Float(6.8523e+5)));
        assert_eq!(
            resolve("685.230_15e+03"),
            (FLOAT_TAG, Scalar::Float(685.23015e+03))
        );
        assert_eq!(
            resolve("685_230.15"),
            (FLOAT_TAG, Scalar::Float(685230.15))
        );
        assert_eq!(resolve(".Inf"), (FLOAT_TAG, Scalar::Float(f64::INFINITY)));
        assert_eq!(
            resolve("-.inf"),
            (FLOAT_TAG, Scalar::Float(f64::NEG_INFINITY))
        );
        assert!(matches!(resolve(".nan"), (FLOAT_TAG, Scalar::Float(f)) if f.is_nan()));
    }

    #[test]
    fn test_strings_stay_strings() {
        for input in ["hello", "12 monkeys", "1.2.3", "0x", "1e", "-", "+", "a1"] {
            assert_eq!(tag_of(input), STR_TAG, "input {:?}", input);
        }
    }

    #[test]
    fn test_merge_marker() {
        assert_eq!(resolve("<<"), (MERGE_TAG, Scalar::Merge));
        assert_eq!(tag_of("<<<"), STR_TAG);
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(tag_of("2002-12-14"), TIMESTAMP_TAG);
        assert_eq!(tag_of("2001-12-14 21:59:43.10 -5"), TIMESTAMP_TAG);
        assert_eq!(tag_of("2001-12-15T02:59:43.1Z"), TIMESTAMP_TAG);
    }

    #[test]
    fn test_binary_decoding() {
        assert_eq!(
            decode_tagged(BINARY_TAG, "gIGC"),
            Ok(Scalar::Bytes(vec![0x80, 0x81, 0x82]))
        );
        assert!(decode_tagged(BINARY_TAG, "not base64!").is_err());
    }
}
