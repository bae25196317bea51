//! Binder tests, encode direction: field handling, ordering, quoting.

use serde::Serialize;
use yamlet::{to_string, Mapping, Value};

#[derive(Serialize)]
struct Server {
    host: String,
    port: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[test]
fn test_struct_declaration_order() {
    let server = Server {
        host: "h".into(),
        port: 80,
        tags: vec!["x".into()],
    };
    assert_eq!(
        to_string(&server).unwrap(),
        "host: h\nport: 80\ntags:\n    - x\n"
    );
}

#[test]
fn test_skip_if_empty_fields_are_omitted() {
    let server = Server {
        host: "h".into(),
        port: 80,
        tags: Vec::new(),
    };
    assert_eq!(to_string(&server).unwrap(), "host: h\nport: 80\n");
}

#[derive(Serialize)]
struct Inner {
    x: i32,
    y: i32,
}

#[derive(Serialize)]
struct Outer {
    name: String,
    #[serde(flatten)]
    inner: Inner,
}

#[test]
fn test_inlined_fields_join_the_outer_mapping() {
    let outer = Outer {
        name: "p".into(),
        inner: Inner { x: 1, y: 2 },
    };
    let out = to_string(&outer).unwrap();
    let value: Value = yamlet::from_str(&out).unwrap();
    assert_eq!(value.get("name"), Some(&Value::from("p")));
    assert_eq!(value.get("x"), Some(&Value::Int(1)));
    assert_eq!(value.get("y"), Some(&Value::Int(2)));
}

#[test]
fn test_inline_field_conflict_fails_at_encode_time() {
    #[derive(Serialize)]
    struct Conflicting {
        x: i32,
        #[serde(flatten)]
        inner: Inner,
    }
    let conflicting = Conflicting {
        x: 10,
        inner: Inner { x: 1, y: 2 },
    };
    let err = to_string(&conflicting).unwrap_err();
    assert!(err.to_string().contains("duplicate key 'x'"), "{}", err);
}

#[test]
fn test_two_inlined_structs_sharing_a_field_fail() {
    #[derive(Serialize)]
    struct Left {
        shared: i32,
        a: i32,
    }
    #[derive(Serialize)]
    struct Right {
        shared: i32,
        b: i32,
    }
    #[derive(Serialize)]
    struct Both {
        #[serde(flatten)]
        left: Left,
        #[serde(flatten)]
        right: Right,
    }
    let both = Both {
        left: Left { shared: 1, a: 2 },
        right: Right { shared: 3, b: 4 },
    };
    let err = to_string(&both).unwrap_err();
    assert!(err.to_string().contains("duplicate key 'shared'"), "{}", err);
}

#[test]
fn test_map_keys_sorted_canonically() {
    use std::collections::HashMap;
    let mut map: HashMap<String, i32> = HashMap::new();
    for key in ["x10", "x2", "banana", "apple"] {
        map.insert(key.to_string(), 1);
    }
    let out = to_string(&map).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, ["apple: 1", "banana: 1", "x2: 1", "x10: 1"]);
}

#[test]
fn test_numeric_keys_sort_numerically() {
    use std::collections::HashMap;
    let mut map: HashMap<i64, &str> = HashMap::new();
    map.insert(10, "ten");
    map.insert(2, "two");
    map.insert(-1, "neg");
    let out = to_string(&map).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, ["-1: neg", "2: two", "10: ten"]);
}

#[test]
fn test_nil_option_emits_null() {
    #[derive(Serialize)]
    struct Holder {
        value: Option<i32>,
    }
    assert_eq!(to_string(&Holder { value: None }).unwrap(), "value: null\n");
}

#[test]
fn test_misparsable_strings_are_quoted() {
    let cases = [
        ("123", "\"123\"\n"),
        ("true", "\"true\"\n"),
        ("null", "\"null\"\n"),
        ("0x1F", "\"0x1F\"\n"),
        ("2002-12-14", "\"2002-12-14\"\n"),
        ("", "\"\"\n"),
    ];
    for (input, expected) in cases {
        assert_eq!(to_string(&input).unwrap(), expected, "input {:?}", input);
    }
}

#[test]
fn test_indicator_strings_are_quoted() {
    let out = to_string(&"- starts like a list").unwrap();
    assert_eq!(out, "'- starts like a list'\n");
    let out = to_string(&"contains # a comment").unwrap();
    assert_eq!(out, "'contains # a comment'\n");
}

#[test]
fn test_bytes_emit_binary_tag() {
    let value = Value::Bytes(vec![0x80, 0x81, 0x82]);
    assert_eq!(to_string(&value).unwrap(), "!!binary gIGC\n");
}

#[test]
fn test_long_binary_wraps_as_block_scalar() {
    let bytes: Vec<u8> = (0u8..=255).collect();
    let value = Value::Bytes(bytes);
    let out = to_string(&value).unwrap();
    assert!(out.starts_with("!!binary |"), "{}", out);
    let longest = out.lines().map(str::len).max().unwrap();
    assert!(longest <= 80, "{}", out);
    let back: Value = yamlet::from_str(&out).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_floats_keep_a_fraction() {
    assert_eq!(to_string(&1.0f64).unwrap(), "1.0\n");
    assert_eq!(to_string(&1.5f64).unwrap(), "1.5\n");
    assert_eq!(to_string(&f64::NAN).unwrap(), ".nan\n");
    assert_eq!(to_string(&f64::INFINITY).unwrap(), ".inf\n");
}

#[test]
fn test_enum_encoding() {
    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Fast,
        Slow { limit: i32 },
    }
    assert_eq!(to_string(&Mode::Fast).unwrap(), "fast\n");
    assert_eq!(
        to_string(&Mode::Slow { limit: 3 }).unwrap(),
        "slow:\n    limit: 3\n"
    );
}

#[test]
fn test_nested_sequence_indentation() {
    #[derive(Serialize)]
    struct Doc {
        items: Vec<Item>,
    }
    #[derive(Serialize)]
    struct Item {
        name: String,
        count: i32,
    }
    let doc = Doc {
        items: vec![
            Item {
                name: "first".into(),
                count: 1,
            },
            Item {
                name: "second".into(),
                count: 2,
            },
        ],
    };
    assert_eq!(
        to_string(&doc).unwrap(),
        "items:\n    - name: first\n      count: 1\n    - name: second\n      count: 2\n"
    );
}

#[test]
fn test_deterministic_output() {
    let mut map = Mapping::new();
    map.insert(Value::from("z"), Value::from(1i64));
    map.insert(Value::from("a"), Value::from(2i64));
    let value = Value::Mapping(map);
    let first = to_string(&value).unwrap();
    for _ in 0..10 {
        assert_eq!(to_string(&value).unwrap(), first);
    }
}

#[test]
fn test_multiline_string_uses_literal_block() {
    #[derive(Serialize)]
    struct Doc {
        text: String,
    }
    let doc = Doc {
        text: "line one\nline two\n".into(),
    };
    assert_eq!(
        to_string(&doc).unwrap(),
        "text: |\n    line one\n    line two\n"
    );
}
