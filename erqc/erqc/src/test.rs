#![cfg(test)]
//! Helpers for unit tests: parse a fragment and hand back the node under test.

use erqc_parser::{parse_source, Rule};

use crate::pr::{Expr, Stmt, TableExpr};

pub(crate) fn parse_script(source: &str) -> Vec<Stmt> {
    parse_source(source, Rule::Script).unwrap()
}

/// Parses `source` as the table expression of a single query statement.
pub(crate) fn parse_table(source: &str) -> TableExpr {
    let mut stmts = parse_source(source, Rule::Statement).unwrap();
    stmts.remove(0).kind.into_query().unwrap().table
}

/// Parses `source` as the only item of an unbound projection.
pub(crate) fn parse_expr(source: &str) -> Expr {
    let table = parse_table(&format!("{{{source}}}"));
    let pipeline = table.kind.into_pipeline().unwrap();
    let projection = pipeline.ops.into_iter().next().unwrap().kind.into_project().unwrap();
    projection.items.into_iter().next().unwrap().expr
}
