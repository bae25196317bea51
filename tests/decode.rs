//! Binder tests, decode direction: typed targets, hooks, and error shapes.

use serde::Deserialize;
use yamlet::{from_str, Value};

#[derive(Deserialize, Debug, PartialEq, Default)]
struct Server {
    host: String,
    port: u16,
    #[serde(default)]
    tags: Vec<String>,
}

#[test]
fn test_struct_fields_match_keys() {
    let server: Server = from_str("host: example.com\nport: 8080\ntags: [a, b]\n").unwrap();
    assert_eq!(
        server,
        Server {
            host: "example.com".into(),
            port: 8080,
            tags: vec!["a".into(), "b".into()],
        }
    );
}

#[test]
fn test_unknown_keys_are_ignored() {
    let server: Server = from_str("host: h\nport: 1\nextra: whatever\n").unwrap();
    assert_eq!(server.host, "h");
    assert_eq!(server.port, 1);
}

#[derive(Deserialize, Debug, PartialEq)]
struct Renamed {
    #[serde(rename = "a")]
    field: i32,
    #[serde(default)]
    b: i32,
}

#[test]
fn test_field_rename() {
    let value: Renamed = from_str("a: 1\nb: 2\n").unwrap();
    assert_eq!(value, Renamed { field: 1, b: 2 });
}

#[derive(Deserialize, Debug, PartialEq)]
struct Inner {
    x: i32,
    y: i32,
}

#[derive(Deserialize, Debug, PartialEq)]
struct Outer {
    name: String,
    #[serde(flatten)]
    inner: Inner,
}

#[test]
fn test_inlined_struct_fields() {
    let value: Outer = from_str("name: p\nx: 1\ny: 2\n").unwrap();
    assert_eq!(
        value,
        Outer {
            name: "p".into(),
            inner: Inner { x: 1, y: 2 },
        }
    );
}

#[test]
fn test_option_and_null() {
    let value: Option<i32> = from_str("~").unwrap();
    assert_eq!(value, None);
    let value: Option<i32> = from_str("3").unwrap();
    assert_eq!(value, Some(3));
    // Null clears a plain target to its zero value.
    let text: String = from_str("null").unwrap();
    assert_eq!(text, "");
    let number: i64 = from_str("null").unwrap();
    assert_eq!(number, 0);
}

#[test]
fn test_numeric_targets_with_overflow_check() {
    let small: u8 = from_str("255").unwrap();
    assert_eq!(small, 255);
    let err = from_str::<u8>("256").unwrap_err();
    assert!(err.to_string().contains("cannot unmarshal"));
    let err = from_str::<u64>("-3").unwrap_err();
    assert!(err.to_string().contains("cannot unmarshal"));
}

#[test]
fn test_type_error_message_shape() {
    let err = from_str::<i64>("not a number").unwrap_err();
    assert_eq!(
        err.to_string(),
        "yaml: unmarshal errors:\n  line 1: cannot unmarshal !!str `not a number` into i64"
    );
}

#[test]
fn test_type_errors_accumulate_across_fields() {
    #[derive(Deserialize, Debug)]
    #[allow(dead_code)]
    struct Triple {
        a: i32,
        b: i32,
        c: i32,
    }
    let err = from_str::<Triple>("a: x\nb: 2\nc: y\n").unwrap_err();
    let text = err.to_string();
    assert!(
        text.contains("line 1: cannot unmarshal !!str `x` into i32"),
        "{}",
        text
    );
    assert!(
        text.contains("line 3: cannot unmarshal !!str `y` into i32"),
        "{}",
        text
    );
}

#[test]
fn test_mismatched_elements_do_not_abort_traversal() {
    // The bad element and the bad entry are both reported in one aggregate,
    // so neither stops the walk early.
    #[derive(Deserialize, Debug)]
    #[allow(dead_code)]
    struct Doc {
        items: Vec<i32>,
        count: i32,
    }
    let err = from_str::<Doc>("items:\n    - 1\n    - nope\n    - 3\ncount: bad\n").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("`nope`"), "{}", text);
    assert!(text.contains("`bad`"), "{}", text);
}

#[test]
fn test_overflow_fails_soft_and_aggregates() {
    #[derive(Deserialize, Debug)]
    #[allow(dead_code)]
    struct Small {
        a: u8,
        b: u8,
    }
    let err = from_str::<Small>("a: 300\nb: 400\n").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("`300`"), "{}", text);
    assert!(text.contains("`400`"), "{}", text);
}

#[test]
fn test_type_error_carries_line() {
    #[derive(Deserialize, Debug)]
    #[allow(dead_code)]
    struct Late {
        a: i32,
        b: i32,
    }
    let err = from_str::<Late>("a: 1\nb: oops\n").unwrap_err();
    assert!(err.to_string().contains("line 2:"), "{}", err);
}

#[test]
fn test_string_target_accepts_scalar_text() {
    let text: String = from_str("123").unwrap();
    assert_eq!(text, "123");
    let text: String = from_str("true").unwrap();
    assert_eq!(text, "true");
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Fast,
    Slow { limit: i32 },
}

#[test]
fn test_enum_variants() {
    let mode: Mode = from_str("fast").unwrap();
    assert_eq!(mode, Mode::Fast);
    let mode: Mode = from_str("slow:\n    limit: 3\n").unwrap();
    assert_eq!(mode, Mode::Slow { limit: 3 });
}

#[test]
fn test_merge_into_struct() {
    #[derive(Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
        label: String,
    }
    #[derive(Deserialize, Debug)]
    struct Doc {
        point: Point,
    }
    let input = "base: &base\n    x: 1\n    y: 2\n    label: base\npoint:\n    <<: *base\n    label: local\n";
    let doc: Doc = from_str(input).unwrap();
    assert_eq!(
        doc.point,
        Point {
            x: 1,
            y: 2,
            label: "local".into(),
        }
    );
}

#[test]
fn test_aliases_deref_in_typed_targets() {
    #[derive(Deserialize, Debug, PartialEq)]
    struct Pair {
        first: Vec<i32>,
        second: Vec<i32>,
    }
    let pair: Pair = from_str("first: &nums [1, 2]\nsecond: *nums\n").unwrap();
    assert_eq!(pair.first, pair.second);
}

#[test]
fn test_yaml11_bool_and_octal_forms() {
    let value: Value = from_str("a: yes\nb: off\nc: 0o14\nd: 012\n").unwrap();
    assert_eq!(value.get("a"), Some(&Value::Bool(true)));
    assert_eq!(value.get("b"), Some(&Value::Bool(false)));
    assert_eq!(value.get("c"), Some(&Value::Int(12)));
    assert_eq!(value.get("d"), Some(&Value::Int(10)));
}

#[test]
fn test_duplicate_keys_last_wins() {
    let value: Value = from_str("a: 1\na: 2\n").unwrap();
    let map = value.as_mapping().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(value.get("a"), Some(&Value::Int(2)));
}

#[test]
fn test_keys_preserve_document_order() {
    let value: Value = from_str("zebra: 1\napple: 2\nmango: 3\n").unwrap();
    let keys: Vec<&str> = value
        .as_mapping()
        .unwrap()
        .keys()
        .map(|k| k.as_str().unwrap())
        .collect();
    assert_eq!(keys, ["zebra", "apple", "mango"]);
}

#[test]
fn test_bytes_into_string_target() {
    let text: String = from_str("!!binary aGVsbG8=").unwrap();
    assert_eq!(text, "hello");
}

#[test]
fn test_nested_generic_containers() {
    use std::collections::BTreeMap;
    let value: BTreeMap<String, Vec<i64>> = from_str("a: [1, 2]\nb: [3]\n").unwrap();
    assert_eq!(value["a"], vec![1, 2]);
    assert_eq!(value["b"], vec![3]);
}
