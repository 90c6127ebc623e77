use chumsky::Parser;
use insta::assert_debug_snapshot;
use rstest::rstest;

use crate::lexer::lr::{EscapePart, Literal, TokenKind, Tokens};
use crate::lexer::{lex_source, lexer};
use crate::span::Span;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex_source(source)
        .unwrap()
        .0
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn filter_and_projection() {
    assert_debug_snapshot!(Tokens(lexer().parse("T[a >= 1]{b}").unwrap()), @r#"
    Tokens(
        [
            0..1: Ident("T"),
            1..2: Control('['),
            2..3: Ident("a"),
            4..6: Gte,
            7..8: Literal(Number("1")),
            8..9: Control(']'),
            9..10: Control('{'),
            10..11: Ident("b"),
            11..12: Control('}'),
        ],
    )
    "#);
}

#[test]
fn join_arrows() {
    assert_debug_snapshot!(Tokens(lexer().parse("t -:x:> u -:a:`b c`:> v").unwrap()), @r#"
    Tokens(
        [
            0..1: Ident("t"),
            2..7: JoinArrow { left: "x", right: None },
            8..9: Ident("u"),
            10..21: JoinArrow { left: "a", right: Some("`b c`") },
            22..23: Ident("v"),
        ],
    )
    "#);
}

#[test]
fn keywords_are_case_insensitive() {
    assert_eq!(
        kinds("SELECT Foo Over"),
        vec![
            TokenKind::Keyword("select".to_string()),
            TokenKind::Ident("Foo".to_string()),
            TokenKind::Ident("Over".to_string()),
        ]
    );
}

#[test]
fn meta_commands_start_a_line() {
    assert_debug_snapshot!(Tokens(lexer().parse(".format raw\nT").unwrap()), @r#"
    Tokens(
        [
            0..11: Meta { name: "format", args: "raw" },
            12..13: Ident("T"),
        ],
    )
    "#);

    // not at the start of a line, the dot is an ordinary control character
    assert_eq!(
        kinds("a .b"),
        vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::Control('.'),
            TokenKind::Ident("b".to_string()),
        ]
    );
}

#[rstest]
#[case::directly_after("T;;\n.load ext")]
#[case::blank_line("T;;\n\n.load ext")]
#[case::trailing_spaces("T;;  \n.load ext")]
#[case::crlf("T;;\r\n.load ext\r\n")]
#[case::indented_after_comment("T;; -- done\r\n\n   .load ext")]
#[case::after_block_comment("T;; /* one\ntwo */\n.load ext")]
fn meta_commands_after_any_line_end(#[case] source: &str) {
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Ident("T".to_string()),
            TokenKind::Terminator,
            TokenKind::Meta {
                name: "load".to_string(),
                args: "ext".to_string(),
            },
        ]
    );
}

#[test]
fn literals() {
    assert_eq!(
        kinds(r#"1.5e-3 0x1F .5 x'ab' 'it''s' "\"a\"" null"#),
        vec![
            TokenKind::Literal(Literal::Number("1.5e-3".to_string())),
            TokenKind::Literal(Literal::Number("0x1F".to_string())),
            TokenKind::Literal(Literal::Number(".5".to_string())),
            TokenKind::Literal(Literal::Blob("x'ab'".to_string())),
            TokenKind::Literal(Literal::String("'it''s'".to_string())),
            TokenKind::Literal(Literal::Json(r#""\"a\"""#.to_string())),
            TokenKind::Keyword("null".to_string()),
        ]
    );
}

#[test]
fn quoted_names_keep_backticks() {
    assert_eq!(
        kinds("`my ``odd`` name`"),
        vec![TokenKind::Ident("`my ``odd`` name`".to_string())]
    );
}

#[test]
fn escaped_string_parts() {
    let kinds = kinds(r"e'a''%\u{29e3d}\%02X(15)\q'");
    let [TokenKind::Escaped(parts)] = kinds.as_slice() else {
        panic!("expected one escaped string, got {kinds:?}");
    };

    assert_eq!(parts.len(), 6);
    assert_eq!(parts[0], EscapePart::Text("a".to_string()));
    assert_eq!(parts[1], EscapePart::Apostrophe);
    assert_eq!(parts[2], EscapePart::Percent);
    assert_eq!(parts[3], EscapePart::Unicode("29e3d".to_string()));
    let EscapePart::Format { spec, tokens } = &parts[4] else {
        panic!("expected a format part");
    };
    assert_eq!(spec, "02X");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].span, 21..23);
    assert_eq!(parts[5], EscapePart::Unknown('q'));
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("T -- trailing\n/* block\n */ U"),
        vec![
            TokenKind::Ident("T".to_string()),
            TokenKind::Ident("U".to_string()),
        ]
    );
}

#[test]
fn unknown_character() {
    let errors = lex_source("T ?").unwrap_err();
    assert_eq!(errors[0].span, Some(Span { start: 2, end: 3 }));
}
