//! Purpose: Lock decode expectations on plain JSON with corpus + differential coverage.
//! Exports: Integration tests only (no runtime exports).
//! Role: Catch drift between the tagged decoder and a plain serde_json baseline.
//! Invariants: Untagged JSON decodes to the same shape serde_json reports.
//! Invariants: Inputs serde_json rejects are rejected by the codec too.
//! Notes: Duplicate keys follow serde_json: the last value wins, first position kept.

use picklebox::api::{
    DecodeOptions, EncodeOptions, EnumMember, ErrorKind, Node, decode, encode, from_json,
    to_json,
};
use serde_json::Value;

fn parse_codec(input: &str) -> Result<Value, ErrorKind> {
    let node = decode(input).map_err(|err| err.kind())?;
    to_json(&node, &EncodeOptions::new()).map_err(|err| err.kind())
}

fn parse_serde_json(input: &str) -> Result<Value, String> {
    serde_json::from_str::<Value>(input).map_err(|err| err.to_string())
}

fn assert_differential_parity(input: &str) {
    let codec = parse_codec(input);
    let serde = parse_serde_json(input);
    match (codec, serde) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "decoder value mismatch for {input}"),
        (Err(_), Err(_)) => {}
        (left, right) => panic!("decoder outcome mismatch: codec={left:?}, serde={right:?}"),
    }
}

#[test]
fn corpus_plain_payloads_match_serde() {
    let corpus = [
        r#"{"a":1,"b":"ok"}"#,
        r#"[1,2,3,{"x":true}]"#,
        r#"{"nested":{"arr":[{"k":"v"}]}}"#,
        r#"{"unicode":"☃"}"#,
        r#"{"z":null,"a":-0.5,"m":[]}"#,
        r#""just a string""#,
        "null",
        "  42  ",
    ];

    for case in corpus {
        assert_differential_parity(case);
    }
}

#[test]
fn corpus_invalid_payloads_fail_in_both() {
    let corpus = [
        "",
        "{",
        r#"{"a":}"#,
        "[1,]",
        "01",
        r#"{"a":1} trailing"#,
        "1e309",
    ];

    for case in corpus {
        assert_differential_parity(case);
    }
}

#[test]
fn malformed_json_is_corrupt_with_hint() {
    let err = decode(r#"{"a":}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    let hint = err.hint().expect("hint");
    assert!(hint.contains("parse category: syntax"));
    assert!(hint.contains("context: codec.decode"));
}

#[test]
fn duplicate_keys_keep_the_last_value() {
    let input = r#"{"a":1,"b":2,"a":3}"#;
    assert_differential_parity(input);
    let node = decode(input).expect("decode");
    assert_eq!(node.get_item("a"), Some(Node::from(3)));
    assert_eq!(encode(&node).expect("encode"), r#"{"a":3,"b":2}"#);
}

#[test]
fn deep_nesting_fails_in_both() {
    let deep = format!("{}{}", "[".repeat(256), "]".repeat(256));
    assert!(parse_serde_json(&deep).is_err());
    let err = decode(&deep).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert!(err.hint().is_some_and(|hint| hint.contains("depth-limit")));
}

#[test]
fn integers_beyond_i64_are_unsupported() {
    let input = u64::MAX.to_string();
    assert!(parse_serde_json(&input).is_ok());
    assert_eq!(decode(&input).unwrap_err().kind(), ErrorKind::Unsupported);
    assert_eq!(decode(&i64::MIN.to_string()).expect("min"), Node::from(i64::MIN));
}

#[test]
fn non_finite_floats_cannot_be_encoded() {
    assert_eq!(
        encode(&Node::from(f64::NAN)).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        encode(&Node::from(f64::INFINITY)).unwrap_err().kind(),
        ErrorKind::Unsupported
    );
}

#[test]
fn malformed_tags_are_corrupt() {
    let corpus = [
        r#"{"pb/enum":"NoMember"}"#,
        r#"{"pb/enum":"a.B","extra":1}"#,
        r#"{"pb/tuple":"not an array"}"#,
        r#"{"pb/type":7}"#,
        r#"{"pb/object":"t.X","pb/type":"t.Y"}"#,
        r#"{"pb/function":"f","extra":true}"#,
    ];
    for case in corpus {
        let err = decode(case).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt, "{case}");
    }
}

#[test]
fn reserved_keys_in_plain_dicts_are_rejected_on_encode() {
    let node = Node::dict([("pb/object", Node::from("sneaky"))]);
    assert_eq!(encode(&node).unwrap_err().kind(), ErrorKind::Usage);
}

#[test]
fn from_json_agrees_with_decode() {
    let value: Value = serde_json::from_str(r#"{"pb/tuple":[1,{"pb/enum":"t.Type.ONE"}]}"#)
        .expect("value");
    let node = from_json(&value, &DecodeOptions::new()).expect("from_json");
    assert_eq!(node, decode(&value.to_string()).expect("decode"));
    assert_eq!(node.to_string(), "(1, Type.ONE)");
}

#[test]
fn encoder_rejects_values_the_decoder_could_not_read_back() {
    let untagged_enum = Node::from(EnumMember::new("", "ONE"));
    assert_eq!(encode(&untagged_enum).unwrap_err().kind(), ErrorKind::Usage);

    let shared = Node::shared(Node::dict::<String>([]));
    let mut handle = shared.clone();
    handle.set_item("me", shared.clone()).expect("set");
    assert_eq!(encode(&shared).unwrap_err().kind(), ErrorKind::Unsupported);
    if let Node::Shared(cell) = &shared {
        cell.borrow_mut().set_item("me", Node::Null).expect("break cycle");
    }
}
