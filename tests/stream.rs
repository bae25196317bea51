//! Multi-document streams and the environment-substitution layer.

use yamlet::{Decoder, Encoder, Value};

#[test]
fn test_two_documents_then_end_of_stream() {
    let mut decoder = Decoder::new("a: 1\n---\nb: 2\n".as_bytes());
    let first: Value = decoder.decode().unwrap().expect("first document");
    assert_eq!(first.get("a"), Some(&Value::Int(1)));
    let second: Value = decoder.decode().unwrap().expect("second document");
    assert_eq!(second.get("b"), Some(&Value::Int(2)));
    assert!(decoder.decode::<Value>().unwrap().is_none());
}

#[test]
fn test_explicit_document_markers() {
    let input = "---\na: 1\n...\n---\nb: 2\n";
    let mut decoder = Decoder::new(input.as_bytes());
    let mut count = 0;
    while decoder.decode::<Value>().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 2);
}

#[test]
fn test_empty_stream() {
    let mut decoder = Decoder::new("".as_bytes());
    assert!(decoder.decode::<Value>().unwrap().is_none());
}

#[test]
fn test_encoder_separates_documents() {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(&Value::from("one")).unwrap();
    encoder.encode(&Value::from("two")).unwrap();
    encoder.close().unwrap();
    let out = String::from_utf8(encoder.into_inner()).unwrap();
    // A root scalar shares the marker line, as block collections cannot.
    assert_eq!(out, "one\n--- two\n");
}

#[test]
fn test_encoder_round_trips_through_decoder() {
    let docs = [
        Value::from(1i64),
        Value::Sequence(vec![Value::from("a"), Value::from("b")]),
    ];
    let mut encoder = Encoder::new(Vec::new());
    for doc in &docs {
        encoder.encode(doc).unwrap();
    }
    encoder.close().unwrap();
    let bytes = encoder.into_inner();

    let mut decoder = Decoder::new(bytes.as_slice());
    let mut decoded = Vec::new();
    while let Some(value) = decoder.decode::<Value>().unwrap() {
        decoded.push(value);
    }
    assert_eq!(decoded.as_slice(), &docs);
}

#[test]
fn test_encoder_indent_setting() {
    let mut map = yamlet::Mapping::new();
    map.insert(
        Value::from("a"),
        Value::Sequence(vec![Value::from(1i64)]),
    );
    let mut encoder = Encoder::new(Vec::new());
    encoder.set_indent(2);
    encoder.encode(&Value::Mapping(map)).unwrap();
    encoder.close().unwrap();
    let out = String::from_utf8(encoder.into_inner()).unwrap();
    assert_eq!(out, "a:\n  - 1\n");
}

#[test]
fn test_decode_document_stream() {
    let mut decoder = Decoder::new("a: 1\n---\nb: 2\n".as_bytes());
    let first = decoder.decode_document().unwrap().expect("first");
    assert!(first.root().is_some());
    let second = decoder.decode_document().unwrap().expect("second");
    assert!(second.root().is_some());
    assert!(decoder.decode_document().unwrap().is_none());
}

// Environment substitution. Each test uses its own variable names so the
// process environment does not leak between tests.

#[test]
fn test_env_default_used_when_unset() {
    let mut decoder = Decoder::new("FOO: ${YAMLET_TEST_UNSET:foo}\n".as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(value.get("FOO"), Some(&Value::from("foo")));
}

#[test]
fn test_env_value_wins_over_default() {
    std::env::set_var("YAMLET_TEST_BAR", "bar");
    let mut decoder = Decoder::new("FOO: ${YAMLET_TEST_BAR:foo}\n".as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(value.get("FOO"), Some(&Value::from("bar")));
    std::env::remove_var("YAMLET_TEST_BAR");
}

#[test]
fn test_env_missing_without_default_is_null() {
    let mut decoder = Decoder::new("FOO: ${YAMLET_TEST_ABSENT}\n".as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(value.get("FOO"), Some(&Value::Null));
}

#[test]
fn test_env_defaults_retype() {
    let input = "ints: ${YAMLET_TEST_I:1}\nfloats: ${YAMLET_TEST_F:1.1}\nbools: ${YAMLET_TEST_B:True}\n";
    let mut decoder = Decoder::new(input.as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(value.get("ints"), Some(&Value::Int(1)));
    assert_eq!(value.get("floats"), Some(&Value::Float(1.1)));
    assert_eq!(value.get("bools"), Some(&Value::Bool(true)));
}

#[test]
fn test_env_quoted_default_stays_string() {
    let input = "a: ${YAMLET_TEST_Q1:\"1\"}\nb: ${YAMLET_TEST_Q2:\"True\"}\n";
    let mut decoder = Decoder::new(input.as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(value.get("a"), Some(&Value::from("1")));
    assert_eq!(value.get("b"), Some(&Value::from("True")));
}

#[test]
fn test_env_multiple_substitutions() {
    std::env::set_var("YAMLET_TEST_HOST", "example.com");
    std::env::set_var("YAMLET_TEST_PORT", "8080");
    let mut decoder =
        Decoder::new("url: http://${YAMLET_TEST_HOST}:${YAMLET_TEST_PORT}/\n".as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(
        value.get("url"),
        Some(&Value::from("http://example.com:8080/"))
    );
    std::env::remove_var("YAMLET_TEST_HOST");
    std::env::remove_var("YAMLET_TEST_PORT");
}

#[test]
fn test_env_inline_collection_value() {
    std::env::set_var("YAMLET_TEST_LIST", "[1, 2, 3]");
    let mut decoder = Decoder::new("nums: ${YAMLET_TEST_LIST}\n".as_bytes());
    decoder.set_env_expansion(true);
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(
        value.get("nums"),
        Some(&Value::Sequence(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ]))
    );
    std::env::remove_var("YAMLET_TEST_LIST");
}

#[test]
fn test_env_disabled_by_default() {
    let mut decoder = Decoder::new("FOO: ${NOT_EXPANDED}\n".as_bytes());
    let value: Value = decoder.decode().unwrap().unwrap();
    assert_eq!(value.get("FOO"), Some(&Value::from("${NOT_EXPANDED}")));
}
