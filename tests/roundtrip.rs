//! End-to-end round trips through decode and encode.

use yamlet::{from_str, to_string, Mapping, Value};

fn mapping(entries: Vec<(Value, Value)>) -> Value {
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(key, value);
    }
    Value::Mapping(map)
}

#[test]
fn test_single_entry_mapping_round_trips() {
    let value: Value = from_str("hello: world\n").unwrap();
    assert_eq!(
        value,
        mapping(vec![(Value::from("hello"), Value::from("world"))])
    );
    assert_eq!(to_string(&value).unwrap(), "hello: world\n");
}

#[test]
fn test_aliases_resolve_to_anchored_values() {
    let value: Value = from_str("a: &x 1\nb: &y 2\nc: *x\nd: *y\n").unwrap();
    assert_eq!(
        value,
        mapping(vec![
            (Value::from("a"), Value::from(1i64)),
            (Value::from("b"), Value::from(2i64)),
            (Value::from("c"), Value::from(1i64)),
            (Value::from("d"), Value::from(2i64)),
        ])
    );
}

#[test]
fn test_merge_key_local_wins() {
    let input = "base: &base\n    k: w\n    j: j\nmerged:\n    <<: *base\n    k: v\n";
    let value: Value = from_str(input).unwrap();
    let merged = value.get("merged").unwrap();
    assert_eq!(merged.get("k"), Some(&Value::from("v")));
    assert_eq!(merged.get("j"), Some(&Value::from("j")));
}

#[test]
fn test_merge_sequence_earlier_wins() {
    let input = "\
one: &one\n    a: 1\n    b: from one\ntwo: &two\n    b: from two\n    c: 3\nmerged:\n    <<: [*one, *two]\n    d: 4\n";
    let value: Value = from_str(input).unwrap();
    let merged = value.get("merged").unwrap();
    assert_eq!(merged.get("a"), Some(&Value::from(1i64)));
    assert_eq!(merged.get("b"), Some(&Value::from("from one")));
    assert_eq!(merged.get("c"), Some(&Value::from(3i64)));
    assert_eq!(merged.get("d"), Some(&Value::from(4i64)));
}

#[test]
fn test_binary_round_trips() {
    let value: Value = from_str("a: !!binary gIGC\n").unwrap();
    assert_eq!(
        value.get("a"),
        Some(&Value::Bytes(vec![0x80, 0x81, 0x82]))
    );
    let out = to_string(&value).unwrap();
    assert_eq!(out, "a: !!binary gIGC\n");
}

#[test]
fn test_nested_flow_sequence_shape() {
    let value: Value = from_str("- a\n- [b, c]\n").unwrap();
    let items = value.as_sequence().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[1],
        Value::Sequence(vec![Value::from("b"), Value::from("c")])
    );
}

#[test]
fn test_int64_extremes_round_trip() {
    let max: i64 = from_str("9223372036854775807").unwrap();
    assert_eq!(max, i64::MAX);
    let min: i64 = from_str("-9223372036854775808").unwrap();
    assert_eq!(min, i64::MIN);
    assert_eq!(to_string(&i64::MAX).unwrap(), "9223372036854775807\n");
    assert_eq!(to_string(&i64::MIN).unwrap(), "-9223372036854775808\n");
}

#[test]
fn test_u64_overflow_becomes_uint() {
    let value: Value = from_str("18446744073709551615").unwrap();
    assert_eq!(value, Value::Uint(u64::MAX));
    assert_eq!(to_string(&value).unwrap(), "18446744073709551615\n");
}

#[test]
fn test_nan_and_infinities() {
    let value: Value = from_str(".nan").unwrap();
    assert!(matches!(value, Value::Float(f) if f.is_nan()));
    assert_eq!(value, value.clone());
    assert_eq!(to_string(&value).unwrap(), ".nan\n");

    let value: Value = from_str("-.inf").unwrap();
    assert_eq!(value, Value::Float(f64::NEG_INFINITY));
    assert_eq!(to_string(&value).unwrap(), "-.inf\n");
}

#[test]
fn test_utf16_input_with_surrogate_pair() {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in "pick: \u{1F7D4}".encode_utf16() {
        bytes.extend(unit.to_be_bytes());
    }
    let value: Value = yamlet::from_slice(&bytes).unwrap();
    let pick = value.get("pick").and_then(|v| v.as_str()).unwrap();
    assert_eq!(pick.chars().count(), 1);
    assert_eq!(pick, "\u{1F7D4}");
}

#[test]
fn test_empty_input_decodes_to_nothing() {
    let value: Value = from_str("").unwrap();
    assert!(value.is_null());
}

#[test]
fn test_strings_that_look_like_other_types_stay_strings() {
    let input = "a: '123'\nb: 'true'\nc: 'null'\nd: '2002-12-14'\n";
    let value: Value = from_str(input).unwrap();
    for key in ["a", "b", "c", "d"] {
        assert!(value.get(key).unwrap().as_str().is_some(), "key {}", key);
    }
    let out = to_string(&value).unwrap();
    let back: Value = from_str(&out).unwrap();
    assert_eq!(value, back);
}

#[test]
fn test_timestamp_round_trip() {
    let value: Value = from_str("at: 2001-12-15T02:59:43.1Z\n").unwrap();
    assert!(matches!(value.get("at"), Some(Value::Timestamp(_))));
    let out = to_string(&value).unwrap();
    assert_eq!(out, "at: 2001-12-15T02:59:43.1Z\n");
}

#[test]
fn test_block_literal_round_trip() {
    let value: Value = from_str("text: |\n    line one\n    line two\n").unwrap();
    assert_eq!(
        value.get("text"),
        Some(&Value::from("line one\nline two\n"))
    );
    let out = to_string(&value).unwrap();
    assert_eq!(out, "text: |\n    line one\n    line two\n");
}

#[test]
fn test_deep_nesting_round_trip() {
    let input = "root:\n    items:\n        - name: first\n          count: 1\n        - name: second\n          count: 2\n";
    let value: Value = from_str(input).unwrap();
    let out = to_string(&value).unwrap();
    let back: Value = from_str(&out).unwrap();
    assert_eq!(value, back);
}

#[test]
fn test_alias_cycle_is_fatal() {
    let err = from_str::<Value>("a: &x [1, *x]\n").unwrap_err();
    assert!(err.to_string().contains("contains itself"));
}

#[test]
fn test_unknown_anchor_is_fatal() {
    let err = from_str::<Value>("a: *nope\n").unwrap_err();
    assert!(err.to_string().contains("unknown anchor"));
}
