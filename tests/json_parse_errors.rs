//! Purpose: Regression coverage for parse-failure category mapping.
//! Exports: Integration tests only.
//! Role: Verify stable category labels used by payload and fixture diagnostics.
//! Invariants: Category mapping remains deterministic for representative errors.
//! Invariants: Tests avoid payload leakage; assertions target category/hint text only.
//! Notes: Uses source include to exercise internal helper logic without widening API surface.

#[path = "../src/json/parse.rs"]
#[allow(dead_code)]
mod parse;

use parse::ParseFailureCategory;
use serde_json::Value;

#[test]
fn category_mapping_handles_syntax_and_numeric_errors() {
    let syntax_err = parse::from_str::<Value>(r#"{"a":}"#).unwrap_err();
    assert_eq!(
        parse::categorize_error(&syntax_err),
        ParseFailureCategory::Syntax
    );

    let number_err = parse::from_slice::<Value>(br#"{"n":1e400}"#).unwrap_err();
    assert_eq!(
        parse::categorize_error(&number_err),
        ParseFailureCategory::NumericRange
    );
}

#[test]
fn category_mapping_handles_depth_and_eof() {
    let deep = format!("{}{}", "[".repeat(256), "]".repeat(256));
    let depth_err = parse::from_str::<Value>(&deep).unwrap_err();
    assert_eq!(
        parse::categorize_error(&depth_err),
        ParseFailureCategory::DepthLimit
    );

    let eof_err = parse::from_str::<Value>("[1,").unwrap_err();
    assert_eq!(parse::categorize_error(&eof_err), ParseFailureCategory::Eof);
}

#[test]
fn typed_decode_mismatch_is_data() {
    let err = parse::from_str::<u8>("300").unwrap_err();
    assert_eq!(parse::categorize_error(&err), ParseFailureCategory::Data);
}

#[test]
fn category_mapping_handles_utf8_messages() {
    assert_eq!(
        parse::categorize_message("invalid UTF-8 in string"),
        ParseFailureCategory::Utf8
    );
    assert_eq!(
        parse::categorize_message("invalid unicode code point"),
        ParseFailureCategory::Utf8
    );
    assert_eq!(
        parse::categorize_message("recursion limit exceeded while parsing"),
        ParseFailureCategory::DepthLimit
    );
}

#[test]
fn hint_contains_category_and_context() {
    let err = parse::from_slice::<Value>(br#"{"n":1e400}"#).unwrap_err();
    let hint = parse::hint_for_error(&err, "test.context");
    assert!(hint.contains("parse category: numeric-range"));
    assert!(hint.contains("context: test.context"));
    assert!(hint.contains("line 1"));
    assert!(!hint.contains("1e400"));
}

#[test]
fn unknown_category_fallback_is_stable() {
    assert_eq!(
        parse::categorize_message("opaque parser issue"),
        ParseFailureCategory::Unknown
    );
    assert_eq!(ParseFailureCategory::Unknown.label(), "unknown");
}
