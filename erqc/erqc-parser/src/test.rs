#![cfg(test)]

use chumsky::prelude::*;
use chumsky::Stream;
use itertools::Itertools;

use crate::lexer::lex_source;
use crate::parser::pr::*;
use crate::parser::{expr_and_table, parse_source, PError, Rule};
use crate::span::Span;
use crate::lexer::lr::TokenKind;

/// Lex `source` and run a single parser over the whole token stream.
pub(crate) fn parse_with_parser<O>(
    source: &str,
    parser: impl Parser<TokenKind, O, Error = PError>,
) -> Result<O, Vec<PError>> {
    let tokens = lex_source(source).unwrap().0;
    let eoi = source.chars().count();
    let stream = Stream::from_iter(
        Span {
            start: eoi,
            end: eoi + 1,
        },
        tokens.into_iter().map(|t| (t.kind, Span::from(t.span))),
    );

    parser.then_ignore(end()).parse(stream)
}

pub(crate) fn parse_expr(source: &str) -> Result<Expr, Vec<PError>> {
    parse_with_parser(source, expr_and_table().0)
}

pub(crate) fn parse_table(source: &str) -> Result<TableExpr, Vec<PError>> {
    parse_with_parser(source, expr_and_table().1)
}

pub(crate) fn parse_script(source: &str) -> Result<Vec<Stmt>, Vec<crate::error::Error>> {
    parse_source(source, Rule::Script)
}

/// Render an expression with every operator application parenthesized, so
/// tests can check how the grammar grouped it.
pub(crate) fn sql_shape(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(ident) => ident.to_string(),
        ExprKind::All(None) => "*".to_string(),
        ExprKind::All(Some(table)) => format!("{table}.*"),
        ExprKind::Literal(lit) => match lit {
            Literal::Null => "null".to_string(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Number(s)
            | Literal::String(s)
            | Literal::Json(s)
            | Literal::Blob(s) => s.clone(),
        },
        ExprKind::Variable(name) => format!("@{name}"),
        ExprKind::Unary(UnaryExpr { op: UnOp::Not, expr }) => format!("(not {})", sql_shape(expr)),
        ExprKind::Unary(UnaryExpr { op, expr }) => format!("({op}{})", sql_shape(expr)),
        ExprKind::Binary(BinaryExpr { left, op, right }) => {
            format!("({} {op} {})", sql_shape(left), sql_shape(right))
        }
        ExprKind::Between(b) => format!(
            "({} {}between {} and {})",
            sql_shape(&b.expr),
            if b.negated { "not " } else { "" },
            sql_shape(&b.low),
            sql_shape(&b.high)
        ),
        ExprKind::InList(i) => format!(
            "({} {}in ({}))",
            sql_shape(&i.expr),
            if i.negated { "not " } else { "" },
            i.list.iter().map(sql_shape).join(", ")
        ),
        ExprKind::Collate(c) => format!("({} collate {})", sql_shape(&c.expr), c.collation),
        ExprKind::Case(case) => {
            let mut res = "case".to_string();
            if let Some(base) = &case.base {
                res += &format!(" {}", sql_shape(base));
            }
            for SwitchCase { condition, value } in &case.cases {
                res += &format!(" when {} then {}", sql_shape(condition), sql_shape(value));
            }
            if let Some(default) = &case.default {
                res += &format!(" else {}", sql_shape(default));
            }
            res + " end"
        }
        ExprKind::Cast(c) => format!("cast({} as {})", sql_shape(&c.expr), c.ty),
        ExprKind::Tuple(items) => format!("({})", items.iter().map(sql_shape).join(", ")),
        other => other.as_ref().to_lowercase(),
    }
}
