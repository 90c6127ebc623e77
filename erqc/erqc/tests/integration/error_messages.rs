//! Test error messages: kinds, locations and their rendered displays.
use erqc::ErrorKind;
use insta::assert_snapshot;

use super::sql::compile;

#[test]
fn test_semantic_error_display() {
    assert_snapshot!(compile(r"T{e'\q'}").unwrap_err(), @r"
    Error:
       ╭─[ :1:3 ]
       │
     1 │ T{e'\q'}
       │   ──┬──
       │     ╰──── unsupported escape `\q`
       │
       │ Help: use `\\` for a literal backslash
    ───╯
    ");
}

#[test]
fn test_semantic_error_location() {
    let err = compile("T{a};;\nU -:k:> V{b} -:k:> W").unwrap_err();
    let message = &err.inner[0];
    assert_eq!(message.kind, ErrorKind::Semantic);
    assert_eq!(
        message.hints,
        vec!["add `as <name>` to the left table expression".to_string()]
    );
    let location = message.location.clone().unwrap();
    assert_eq!(location.start.0, 1);
}

#[test]
fn test_syntax_error() {
    let err = compile("T{a +}").unwrap_err();
    let message = &err.inner[0];
    assert_eq!(message.kind, ErrorKind::Syntax);
    assert!(message.reason.contains("but found"), "{}", message.reason);

    let location = message.location.clone().unwrap();
    assert_eq!(location.start, (0, 5));
    assert_eq!(location.start_offset, 5);
}

#[test]
fn test_unexpected_end() {
    let err = compile("T{a").unwrap_err();
    assert!(!err.is_incomplete());
    assert!(
        err.inner[0].reason.contains("before the end"),
        "{}",
        err.inner[0].reason
    );
}

#[test]
fn test_byte_offsets() {
    // a four byte character before the error
    let err = compile("{'𩸽'} [e'\\q']").unwrap_err();
    let location = err.inner[0].location.clone().unwrap();
    assert_eq!(location.start, (0, 7));
    assert_eq!(location.start_offset, 10);
}

#[test]
fn test_json() {
    let err = compile(r"{e'\q'}").unwrap_err();
    let json: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();
    assert_eq!(json["inner"][0]["kind"], "Semantic");
    assert_eq!(json["inner"][0]["reason"], "unsupported escape `\\q`");
}
