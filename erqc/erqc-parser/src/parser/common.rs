use chumsky::prelude::*;

use super::pr::{Ident, Stmt, StmtKind};
use super::PError;
use crate::lexer::lr::TokenKind;
use crate::span::Span;

pub(crate) fn ident_part() -> impl Parser<TokenKind, String, Error = PError> + Clone {
    select! { TokenKind::Ident(ident) => ident }.map_err(|e: PError| {
        PError::expected_input_found(
            e.span(),
            [Some(TokenKind::Ident("".to_string()))],
            e.found().cloned(),
        )
    })
}

/// A possibly qualified name: `a`, `a.b`, `a::b`.
pub(crate) fn ident() -> impl Parser<TokenKind, Ident, Error = PError> + Clone {
    let separator = ctrl('.').or(just(TokenKind::DoubleColon).ignored());

    ident_part()
        .then(separator.ignore_then(ident_part()).repeated())
        .map(|(first, rest)| {
            let mut path = vec![first];
            path.extend(rest);
            Ident::from_path(path)
        })
        .labelled("name")
}

pub(crate) fn keyword(kw: &'static str) -> impl Parser<TokenKind, (), Error = PError> + Clone {
    just(TokenKind::Keyword(kw.to_string())).ignored()
}

/// A word that is only special in some positions. It lexes as a name and
/// matches case-insensitively.
pub(crate) fn word(w: &'static str) -> impl Parser<TokenKind, (), Error = PError> + Clone {
    filter(move |t: &TokenKind| matches!(t, TokenKind::Ident(s) if s.eq_ignore_ascii_case(w)))
        .ignored()
        .map_err(move |e: PError| {
            PError::expected_input_found(
                e.span(),
                [Some(TokenKind::Ident(w.to_string()))],
                e.found().cloned(),
            )
        })
}

pub(crate) fn ctrl(char: char) -> impl Parser<TokenKind, (), Error = PError> + Clone {
    just(TokenKind::Control(char)).ignored()
}

pub(crate) fn terminator() -> impl Parser<TokenKind, (), Error = PError> + Clone {
    just(TokenKind::Terminator).ignored()
}

pub(crate) fn into_stmt(kind: StmtKind, span: Span) -> Stmt {
    Stmt {
        kind,
        span: Some(span),
    }
}

/// Parse a comma separated sequence, allowing a trailing comma. Doesn't
/// include the surrounding delimiters.
pub(crate) fn sequence<P, O>(parser: P) -> impl Parser<TokenKind, Vec<O>, Error = PError> + Clone
where
    P: Parser<TokenKind, O, Error = PError> + Clone,
{
    parser.separated_by(ctrl(',')).allow_trailing()
}

/// `(a, b, c)`, a parenthesized list of plain names.
pub(crate) fn name_list() -> impl Parser<TokenKind, Vec<String>, Error = PError> + Clone {
    ident_part()
        .separated_by(ctrl(','))
        .at_least(1)
        .delimited_by(ctrl('('), ctrl(')'))
        .labelled("column list")
}
