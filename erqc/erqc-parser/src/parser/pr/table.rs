use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::parser::pr::ops::{SetOp, SortDirection};
use crate::parser::pr::{Expr, FuncCall, Ident, SortItem, WindowSpec};
use crate::span::Span;

/// A table-valued expression: a source followed by postfix operations,
/// combined with set operators and optionally prefixed by CTEs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExpr {
    #[serde(flatten)]
    pub kind: TableExprKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl TableExpr {
    pub fn new<K: Into<TableExprKind>>(kind: K) -> Self {
        TableExpr {
            kind: kind.into(),
            span: None,
        }
    }
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum TableExprKind {
    Source(Source),
    Pipeline(Pipeline),
    SetOp(SetOpExpr),
    With(WithExpr),
}

impl TableExprKind {
    pub fn into_table_expr(self, span: Span) -> TableExpr {
        TableExpr {
            kind: self,
            span: Some(span),
        }
    }
}

impl From<Source> for TableExprKind {
    fn from(value: Source) -> Self {
        TableExprKind::Source(value)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum SourceKind {
    /// `name`, `schema.name`
    Table(Ident),
    /// `@name`, `schema.@name`
    Variable { schema: Option<Ident>, name: String },
    /// `@(expr)`, a table whose name is computed when executed.
    Dynamic(Box<Expr>),
    /// A table-valued function call.
    Function(FuncCall),
    /// `values [[..], ..]`
    Values(Vec<Vec<Expr>>),
    /// `(table_expr)`
    Nested(Box<TableExpr>),
    /// No source at all, as in `{1 as one}`.
    Unbound,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub source: Box<TableExpr>,
    pub ops: Vec<TableOp>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TableOp {
    #[serde(flatten)]
    pub kind: TableOpKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr)]
pub enum TableOpKind {
    /// `[cond]`
    Filter(Expr),
    /// `{items}` or `{groups => items}`
    Project(Projection),
    Join(Join),
    /// `window name as (spec), ...`
    Window(Vec<NamedWindow>),
    OrderBy(Vec<SortItem>),
    Limit {
        limit: Expr,
        offset: Option<Expr>,
    },
    Offset(Expr),
    Distinct,
    /// `as name`, turning everything so far into a named subquery.
    Alias(String),
}

impl TableOpKind {
    pub fn into_op(self, span: Span) -> TableOp {
        TableOp {
            kind: self,
            span: Some(span),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Projection {
    /// Set for the grouped form `{groups => items}`.
    pub groups: Option<Vec<SelectItem>>,
    pub items: Vec<SelectItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NamedWindow {
    pub name: String,
    pub spec: WindowSpec,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Join {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub natural: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<JoinKind>,
    pub target: Box<TableExpr>,
    pub constraint: JoinConstraint,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum JoinConstraint {
    None,
    On(Expr),
    Using(Vec<String>),
    /// Join sugar `-:left:right:>`; `right` defaults to `left`.
    Keys { left: String, right: Option<String> },
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SetOpExpr {
    pub op: SetOp,
    pub left: Box<TableExpr>,
    pub right: Box<TableExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WithExpr {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
    pub ctes: Vec<Cte>,
    pub body: Box<TableExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Cte {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    pub table: TableExpr,
}
