use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::parser::pr::ops::{BinOp, LikeOp, NullsOrder, SortDirection, UnOp};
use crate::parser::pr::{Ident, TableExpr};
use crate::span::Span;

/// A scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Expr {
    pub fn new<K: Into<ExprKind>>(kind: K) -> Self {
        Expr {
            kind: kind.into(),
            span: None,
        }
    }
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr)]
pub enum ExprKind {
    Ident(Ident),
    /// `*`, or `t.*` when qualified.
    All(Option<Ident>),
    Literal(Literal),
    /// `e'...'`
    Escaped(Vec<EscapeItem>),
    /// `@name`, bound at execution time.
    Variable(String),

    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Like(LikeExpr),
    Between(BetweenExpr),
    InList(InListExpr),
    InTable(InTableExpr),
    Exists(Box<TableExpr>),
    /// A parenthesized table expression used as a value.
    Subquery(Box<TableExpr>),
    Case(CaseExpr),
    Cast(CastExpr),
    Collate(CollateExpr),
    FuncCall(FuncCall),

    /// A parenthesized list. One element is a plain parenthesized expression;
    /// more make a row value.
    Tuple(Vec<Expr>),
}

impl ExprKind {
    pub fn into_expr(self, span: Span) -> Expr {
        Expr {
            span: Some(span),
            kind: self,
        }
    }
}

impl From<Literal> for ExprKind {
    fn from(value: Literal) -> Self {
        ExprKind::Literal(value)
    }
}

impl From<Ident> for ExprKind {
    fn from(value: Ident) -> Self {
        ExprKind::Ident(value)
    }
}

/// Literals as written in the source. Text variants keep their quotes.
#[derive(Debug, EnumAsInner, PartialEq, Eq, Clone, Serialize, Deserialize, strum::AsRefStr)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(String),
    String(String),
    Json(String),
    Blob(String),
}

/// One component of an escaped string.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum EscapeItem {
    Text(String),
    Apostrophe,
    Percent,
    Backslash,
    Control(u32),
    Unicode(String),
    Format { spec: String, expr: Box<Expr> },
    Interpolate(Box<Expr>),
    Unknown(char),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub right: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub expr: Box<Expr>,
}

/// `expr [not] like pattern [escape e]`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LikeExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub op: LikeOp,
    pub pattern: Box<Expr>,
    pub escape: Option<Box<Expr>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BetweenExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub low: Box<Expr>,
    pub high: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InListExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub list: Vec<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InTableExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub table: Box<TableExpr>,
}

/// `case [base] when .. then .. [else ..] end`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CaseExpr {
    pub base: Option<Box<Expr>>,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Box<Expr>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub condition: Expr,
    pub value: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CastExpr {
    pub expr: Box<Expr>,
    /// Type name words, joined by single spaces.
    pub ty: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CollateExpr {
    pub expr: Box<Expr>,
    pub collation: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FuncCall {
    pub name: Ident,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub distinct: bool,
    pub args: FuncArgs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Expr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over: Option<Over>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum FuncArgs {
    /// `count(*)`
    Star,
    List(Vec<Expr>),
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum Over {
    Named(String),
    Spec(WindowSpec),
}

/// The part of a window definition between the parentheses.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct WindowSpec {
    pub base: Option<String>,
    pub partition: Vec<Expr>,
    pub order: Vec<SortItem>,
    pub frame: Option<Frame>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub units: FrameUnits,
    pub start: FrameBound,
    /// Set for `between start and end`.
    pub end: Option<FrameBound>,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum FrameUnits {
    Rows,
    Range,
    Groups,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(Box<Expr>),
    CurrentRow,
    Following(Box<Expr>),
    UnboundedFollowing,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SortItem {
    pub expr: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nulls: Option<NullsOrder>,
}
