use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::Stream;
use serde::{Deserialize, Serialize};

use self::pr::{Expr, Stmt, TableExpr};
use crate::error::{Error, ErrorKind, Reason, WithErrorInfo};
use crate::lexer::lr::{Token, TokenKind};
use crate::lexer::{convert_lexer_error, lex_source_raw};
use crate::span::Span;

pub(crate) mod common;
mod expr;
pub mod pr;
pub(crate) mod stmt;
mod table;

pub(crate) type PError = Simple<TokenKind, Span>;

pub(crate) type Rec<O> = Recursive<'static, TokenKind, O, PError>;

/// The start symbol to parse with.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Rule {
    /// Any number of statements, separated by `;;`. The last one may omit it.
    #[default]
    Script,
    /// Exactly one statement.
    Statement,
    /// A line typed into a REPL: every statement must be terminated, and
    /// input that stops early is reported as incomplete.
    ReplLine,
}

/// Lex and parse Erq source.
///
/// Under [Rule::ReplLine], input that ends before a statement does returns a
/// single error of kind [ErrorKind::Incomplete], without a span.
pub fn parse_source(source: &str, rule: Rule) -> Result<Vec<Stmt>, Vec<Error>> {
    let tokens = match lex_source_raw(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            if rule == Rule::ReplLine && errors.first().is_some_and(|e| e.found().is_none()) {
                return Err(vec![incomplete()]);
            }
            return Err(errors
                .into_iter()
                .map(|e| convert_lexer_error(source, e))
                .collect());
        }
    };

    if rule == Rule::ReplLine && tokens.is_empty() {
        return Ok(Vec::new());
    }

    let eoi = source.chars().count();
    parse_tokens(tokens, rule, eoi).map_err(|errors| {
        if rule == Rule::ReplLine && errors.first().is_some_and(|e| e.found().is_none()) {
            return vec![incomplete()];
        }
        errors.into_iter().map(convert_parser_error).collect()
    })
}

/// Parse already lexed tokens.
pub fn parse_lr_to_pr(tokens: Vec<Token>, rule: Rule) -> Result<Vec<Stmt>, Vec<Error>> {
    let eoi = tokens.last().map(|t| t.span.end).unwrap_or_default();
    parse_tokens(tokens, rule, eoi)
        .map_err(|errors| errors.into_iter().map(convert_parser_error).collect())
}

fn parse_tokens(tokens: Vec<Token>, rule: Rule, eoi: usize) -> Result<Vec<Stmt>, Vec<PError>> {
    let stream = Stream::from_iter(
        Span {
            start: eoi,
            end: eoi + 1,
        },
        tokens.into_iter().map(|t| (t.kind, Span::from(t.span))),
    );

    let res = stmt::source(rule).parse(stream);
    match &res {
        Ok(stmts) => log::debug!("parsed {} statements with rule {rule}", stmts.len()),
        Err(errors) => log::debug!("parse errors: {errors:?}"),
    }
    res
}

fn incomplete() -> Error {
    Error::new_simple("incomplete input").with_kind(ErrorKind::Incomplete)
}

/// Both halves of the grammar, each able to refer to the other: scalar
/// subqueries hold table expressions and table expressions hold scalars.
pub(crate) fn expr_and_table() -> (Rec<Expr>, Rec<TableExpr>) {
    let mut expr = Recursive::declare();
    let mut table = Recursive::declare();

    expr.define(expr::expr(expr.clone(), table.clone()));
    table.define(table::table_expr(expr.clone(), table.clone()));

    (expr, table)
}

/// Parse a token group embedded in an escaped string as one expression.
pub(crate) fn parse_embedded(expr: &Rec<Expr>, tokens: Vec<Token>, span: Span) -> Result<Expr, PError> {
    let eoi = tokens
        .last()
        .map(|t| Span {
            start: t.span.end,
            end: t.span.end + 1,
        })
        .unwrap_or(span);
    let stream = Stream::from_iter(
        eoi,
        tokens.into_iter().map(|t| (t.kind, Span::from(t.span))),
    );

    expr.clone()
        .then_ignore(end())
        .parse(stream)
        .map_err(|errors| {
            errors
                .into_iter()
                .next()
                .unwrap_or_else(|| PError::custom(span, "invalid embedded expression"))
        })
}

fn convert_parser_error(e: PError) -> Error {
    let mut span = e.span();

    if e.found().is_none() {
        // found end of file
        // fix for span outside of source
        if span.start > 0 && span.end > 0 {
            span.start -= 1;
            span.end -= 1;
        }
    }
    let span = Some(span);

    if let SimpleReason::Custom(message) = e.reason() {
        return Error::new_simple(message).with_span(span);
    }

    fn token_to_string(t: Option<TokenKind>) -> String {
        t.map(|t| t.to_string())
            .unwrap_or_else(|| "end of input".to_string())
    }

    let while_parsing = e
        .label()
        .map(|l| format!(" while parsing {l}"))
        .unwrap_or_default();

    let mut expected = e
        .expected()
        .filter(|t| t.is_some())
        .cloned()
        .map(token_to_string)
        .collect::<Vec<_>>();

    if expected.is_empty() || expected.len() > 10 {
        let label = token_to_string(e.found().cloned());
        return Error::new_simple(format!("unexpected {label}{while_parsing}")).with_span(span);
    }

    expected.sort();
    expected.dedup();

    let expected = match expected.len() {
        1 => expected.remove(0),
        2 => expected.join(" or "),
        _ => {
            let last = expected.pop().unwrap_or_default();
            format!("one of {} or {last}", expected.join(", "))
        }
    };

    match e.found() {
        Some(found) => Error::new(Reason::Expected {
            who: e.label().map(|x| x.to_string()),
            expected,
            found: found.to_string(),
        }),
        // We want a friendlier message than "found end of input"...
        None => Error::new(Reason::Simple(format!(
            "Expected {expected}, but didn't find anything before the end."
        ))),
    }
    .with_span(span)
}
