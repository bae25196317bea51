//! The dynamic value representation.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::timestamp::Timestamp;

/// An ordered mapping of values to values, preserving document order.
pub type Mapping = IndexMap<Value, Value>;

/// A YAML value decoded without type hints.
#[derive(Clone, Default)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer, used when a positive value overflows `i64`.
    Uint(u64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Byte array, from `!!binary`.
    Bytes(Vec<u8>),
    /// Date or date-time, from `!!timestamp`.
    Timestamp(Timestamp),
    /// Sequence of values.
    Sequence(Vec<Value>),
    /// Mapping in document order.
    Mapping(Mapping),
}

impl Value {
    /// Returns `true` if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Uint(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Returns the value as a `u64` if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(value) => u64::try_from(*value).ok(),
            Value::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is any numeric type.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Uint(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the bytes if this is a `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the sequence if this is a `Sequence`.
    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Sequence(value) => Some(value),
            _ => None,
        }
    }

    /// Returns a reference to the mapping if this is a `Mapping`.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(value) => Some(value),
            _ => None,
        }
    }

    /// Index into a mapping by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(&Value::String(key.to_string())),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Int(a), Value::Uint(b)) | (Value::Uint(b), Value::Int(a)) => {
                u64::try_from(*a).map(|a| a == *b).unwrap_or(false)
            }
            // Bitwise, so NaN equals itself and maps can key on floats.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).map_or(false, |other| value == other))
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(value) => {
                1u8.hash(state);
                value.hash(state);
            }
            Value::Int(value) => {
                2u8.hash(state);
                value.hash(state);
            }
            Value::Uint(value) => {
                // Small unsigned values hash like their signed counterparts
                // so cross-variant equality holds.
                if let Ok(signed) = i64::try_from(*value) {
                    2u8.hash(state);
                    signed.hash(state);
                } else {
                    3u8.hash(state);
                    value.hash(state);
                }
            }
            Value::Float(value) => {
                4u8.hash(state);
                value.to_bits().hash(state);
            }
            Value::String(value) => {
                5u8.hash(state);
                value.hash(state);
            }
            Value::Bytes(value) => {
                6u8.hash(state);
                value.hash(state);
            }
            Value::Timestamp(value) => {
                7u8.hash(state);
                value.hash(state);
            }
            Value::Sequence(value) => {
                8u8.hash(state);
                for item in value {
                    item.hash(state);
                }
            }
            Value::Mapping(value) => {
                9u8.hash(state);
                value.len().hash(state);
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Uint(value) => write!(f, "{}", value),
            Value::Float(value) => {
                if value.is_nan() {
                    write!(f, ".nan")
                } else if value.is_infinite() {
                    write!(f, "{}.inf", if *value > 0.0 { "" } else { "-" })
                } else {
                    write!(f, "{}", value)
                }
            }
            Value::String(value) => write!(f, "{:?}", value),
            Value::Bytes(value) => {
                write!(f, "<")?;
                for byte in value {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, ">")
            }
            Value::Timestamp(value) => write!(f, "{}", value),
            Value::Sequence(value) => f.debug_list().entries(value).finish(),
            Value::Mapping(value) => f.debug_map().entries(value).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(i64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        match i64::try_from(value) {
            Ok(signed) => Value::Int(signed),
            Err(_) => Value::Uint(value),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Value {
        Value::Timestamp(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Value {
        Value::Sequence(value)
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Value {
        Value::Mapping(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_equals_itself() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(f64::NAN), Value::Float(0.0));
    }

    #[test]
    fn test_cross_variant_int_equality() {
        assert_eq!(Value::Int(7), Value::Uint(7));
        assert_ne!(Value::Int(-7), Value::Uint(7));
    }

    #[test]
    fn test_mapping_string_index() {
        let mut map = Mapping::new();
        map.insert(Value::from("k"), Value::from(1i64));
        let value = Value::Mapping(map);
        assert_eq!(value.get("k"), Some(&Value::Int(1)));
        assert_eq!(value.get("missing"), None);
    }
}
