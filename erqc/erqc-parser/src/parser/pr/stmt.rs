use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::parser::pr::{Expr, Ident, SortItem, TableExpr};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Stmt {
        Stmt { kind, span: None }
    }
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr)]
pub enum StmtKind {
    Query(Query),
    Explain(Explain),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Pragma(Pragma),
    CreateTable(CreateTable),
    CreateView(CreateView),
    CreateIndex(CreateIndex),
    Drop(DropItem),
    /// A `.name args` line.
    Meta { name: String, args: String },
    Load(Load),
    TableFromJson(TableFromJson),
    FunctionDef(FunctionDef),
    If(IfStmt),
    For(ForStmt),
}

/// A table expression producing rows, with an optional output directive.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Query {
    pub table: TableExpr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Explain {
    pub query_plan: bool,
    pub query: Query,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Insert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictResolution>,
    pub table: Ident,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    pub source: TableExpr,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ConflictResolution {
    Replace,
    Ignore,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Update {
    pub table: Ident,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expr>,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Delete {
    pub table: Ident,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Pragma {
    pub name: Ident,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<PragmaValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum PragmaValue {
    /// `pragma name = value`
    Assign(Expr),
    /// `pragma name(value)`
    Call(Expr),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CreateTable {
    pub temp: bool,
    pub if_not_exists: bool,
    pub name: Ident,
    pub definition: TableDefinition,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum TableDefinition {
    As(TableExpr),
    Columns(Vec<ColumnDef>),
}

/// A column name followed by its type and constraints, kept as SQL text.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CreateView {
    pub temp: bool,
    pub if_not_exists: bool,
    pub name: Ident,
    pub query: TableExpr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CreateIndex {
    pub unique: bool,
    pub if_not_exists: bool,
    pub name: Ident,
    pub table: Ident,
    pub columns: Vec<SortItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DropItem {
    pub kind: DropKind,
    pub if_exists: bool,
    pub name: Ident,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum DropKind {
    Table,
    View,
    Index,
}

/// `load T[(cols)] from expr [as format]`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Load {
    pub table: Ident,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    pub source: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LoadFormat>,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum LoadFormat {
    Csv,
    Ndjson,
    Json,
}

/// `table T from json expr`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TableFromJson {
    pub table: Ident,
    pub source: Expr,
}

/// `function name(params) = expr`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_stmts: Vec<Stmt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub else_stmts: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    pub assignments: Vec<ForAssignment>,
    pub source: TableExpr,
    pub body: Vec<Stmt>,
}

/// A loop variable: `name`, or `name = expr`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ForAssignment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<Expr>,
}

/// `output [format] [to dest]`
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<Dest>,
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Dense,
    Sparse,
    Raw,
    Eqp,
    Vega {
        view: VegaView,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum VegaView {
    /// A mark name such as `bar`.
    Mark(String),
    /// A quoted JSON view specification, quotes included.
    Json(String),
}

#[derive(Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize)]
pub enum Dest {
    Stdout,
    Stderr,
    /// A quoted string literal, quotes included.
    Path(String),
    Variable(String),
    Query(Box<TableExpr>),
}
