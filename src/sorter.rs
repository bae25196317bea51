//! The total order used for mapping keys with no declared order.
//!
//! Numbers (and bools, as 0/1) compare numerically before anything else.
//! Strings compare with an alphanumeric-aware order: embedded digit runs
//! compare as integers, letters win over digits at a tie point after a
//! non-digit prefix, and everything else falls back to scalar order. The
//! relation is a strict total order; the transitivity tests below pin the
//! corner cases the numeric-run rules create.

use std::cmp::Ordering;

use crate::value::Value;

/// Compare two keys in the canonical output order.
pub(crate) fn cmp_keys(a: &Value, b: &Value) -> Ordering {
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Uint(_) => 3,
        Value::Float(_) => 4,
        Value::Timestamp(_) => 5,
        Value::String(_) => 6,
        Value::Bytes(_) => 7,
        Value::Sequence(_) => 8,
        Value::Mapping(_) => 9,
    }
}

/// A numeric interpretation for keys that have one; bools count as 0/1.
fn key_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(true) => Some(1.0),
        Value::Bool(false) => Some(0.0),
        Value::Int(number) => Some(*number as f64),
        Value::Uint(number) => Some(*number as f64),
        Value::Float(number) => Some(*number),
        _ => None,
    }
}

fn less(a: &Value, b: &Value) -> bool {
    if let (Some(a_number), Some(b_number)) = (key_number(a), key_number(b)) {
        if a_number != b_number {
            return a_number < b_number;
        }
        let (a_rank, b_rank) = (kind_rank(a), kind_rank(b));
        if a_rank != b_rank {
            return a_rank < b_rank;
        }
        return exact_less(a, b);
    }

    match (a, b) {
        (Value::String(a), Value::String(b)) => string_less(a, b),
        _ => kind_rank(a) < kind_rank(b),
    }
}

/// Same-kind numeric comparison without the float round trip.
fn exact_less(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => !*a && *b,
        (Value::Int(a), Value::Int(b)) => a < b,
        (Value::Uint(a), Value::Uint(b)) => a < b,
        (Value::Float(a), Value::Float(b)) => a < b,
        _ => false,
    }
}

fn string_less(a: &str, b: &str) -> bool {
    let ar: Vec<char> = a.chars().collect();
    let br: Vec<char> = b.chars().collect();
    let mut digits = false;
    let mut i = 0;
    while i < ar.len() && i < br.len() {
        if ar[i] == br[i] {
            digits = ar[i].is_ascii_digit();
            i += 1;
            continue;
        }
        let a_letter = ar[i].is_alphabetic();
        let b_letter = br[i].is_alphabetic();
        if a_letter && b_letter {
            return ar[i] < br[i];
        }
        if a_letter || b_letter {
            // Coming off a digit run, the letter continues the shorter
            // number; otherwise the digit sorts as a bigger "word".
            return if digits { a_letter } else { b_letter };
        }

        // Compare the numeric runs starting here as integers. A shared
        // run of leading zeros already consumed means the runs only tie
        // on value, so seed both sides equally.
        let mut a_number: i64 = 0;
        let mut b_number: i64 = 0;
        if ar[i] == '0' || br[i] == '0' {
            for j in (0..i).rev() {
                if !ar[j].is_ascii_digit() {
                    break;
                }
                if ar[j] != '0' {
                    a_number = 1;
                    b_number = 1;
                    break;
                }
            }
        }
        let mut ai = i;
        while ai < ar.len() && ar[ai].is_ascii_digit() {
            a_number = a_number * 10 + i64::from(ar[ai] as u8 - b'0');
            ai += 1;
        }
        let mut bi = i;
        while bi < br.len() && br[bi].is_ascii_digit() {
            b_number = b_number * 10 + i64::from(br[bi] as u8 - b'0');
            bi += 1;
        }
        if a_number != b_number {
            return a_number < b_number;
        }
        if ai != bi {
            return ai < bi;
        }
        return ar[i] < br[i];
    }
    ar.len() < br.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(keys: &[&str]) -> Vec<String> {
        let mut values: Vec<Value> = keys.iter().map(|&k| Value::from(k)).collect();
        values.sort_by(cmp_keys);
        values
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_numbers_before_strings() {
        let mut keys = vec![Value::from("a"), Value::from(10i64), Value::from(2i64)];
        keys.sort_by(cmp_keys);
        assert_eq!(
            keys,
            vec![Value::from(2i64), Value::from(10i64), Value::from("a")]
        );
    }

    #[test]
    fn test_bools_compare_as_numbers() {
        let mut keys = vec![Value::from(true), Value::from(0i64), Value::from(false)];
        keys.sort_by(cmp_keys);
        assert_eq!(
            keys,
            vec![Value::from(false), Value::from(0i64), Value::from(true)]
        );
    }

    #[test]
    fn test_numeric_runs_compare_as_integers() {
        assert_eq!(
            sorted(&["a10b", "a2b", "a1b"]),
            vec!["a1b", "a2b", "a10b"]
        );
    }

    // Runs with equal numeric value order by run length: the shorter run
    // of digits (fewer leading zeros) sorts first.
    #[test]
    fn test_leading_zeros() {
        assert_eq!(sorted(&["a01", "a1", "a001"]), vec!["a1", "a01", "a001"]);
    }

    #[test]
    fn test_letters_beat_digits_after_digit_run() {
        assert_eq!(sorted(&["12a", "12"]), vec!["12", "12a"]);
        assert_eq!(sorted(&["ab", "a1"]), vec!["a1", "ab"]);
    }

    // The numeric-run rules make transitivity easy to break by accident;
    // these sets cover the risky triples.
    #[test]
    fn test_transitivity_on_mixed_runs() {
        let cases: &[&[&str]] = &[
            &["0b", "1a", "2"],
            &["a1", "a12", "a2"],
            &["x", "x1", "x10", "x2"],
            &["b1", "b01", "b001"],
        ];
        for case in cases {
            let mut keys: Vec<Value> = case.iter().map(|&k| Value::from(k)).collect();
            keys.sort_by(cmp_keys);
            for i in 0..keys.len() {
                for j in 0..keys.len() {
                    for k in 0..keys.len() {
                        let ij = cmp_keys(&keys[i], &keys[j]);
                        let jk = cmp_keys(&keys[j], &keys[k]);
                        let ik = cmp_keys(&keys[i], &keys[k]);
                        if ij == Ordering::Less && jk == Ordering::Less {
                            assert_eq!(ik, Ordering::Less, "{:?} {:?} {:?}", i, j, k);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_total_order_is_antisymmetric() {
        let keys = [
            Value::Null,
            Value::from(false),
            Value::from(1i64),
            Value::Float(1.5),
            Value::from("a"),
            Value::from("a1"),
        ];
        for a in &keys {
            for b in &keys {
                let forward = cmp_keys(a, b);
                let backward = cmp_keys(b, a);
                assert_eq!(forward, backward.reverse());
            }
        }
    }
}
