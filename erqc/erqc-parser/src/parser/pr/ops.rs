use serde::{Deserialize, Serialize};

/// Binary operators, displayed the way SQLite spells them.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum BinOp {
    #[strum(to_string = "or")]
    Or,
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "=")]
    Eq,
    #[strum(to_string = "<>")]
    Ne,
    #[strum(to_string = "is")]
    Is,
    #[strum(to_string = "is not")]
    IsNot,
    #[strum(to_string = "is distinct from")]
    IsDistinctFrom,
    #[strum(to_string = "is not distinct from")]
    IsNotDistinctFrom,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = "<=")]
    Lte,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = ">=")]
    Gte,
    #[strum(to_string = "&")]
    BitAnd,
    #[strum(to_string = "|")]
    BitOr,
    #[strum(to_string = "<<")]
    ShiftLeft,
    #[strum(to_string = ">>")]
    ShiftRight,
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Sub,
    #[strum(to_string = "*")]
    Mul,
    #[strum(to_string = "/")]
    Div,
    #[strum(to_string = "%")]
    Mod,
    #[strum(to_string = "||")]
    Concat,
    #[strum(to_string = "->")]
    Extract,
    #[strum(to_string = "->>")]
    ExtractText,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum UnOp {
    #[strum(to_string = "-")]
    Neg,
    #[strum(to_string = "+")]
    Plus,
    #[strum(to_string = "~")]
    BitNot,
    #[strum(to_string = "not")]
    Not,
}

/// Pattern matching operators of the `x [not] like y` family.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum LikeOp {
    Like,
    Glob,
    Regexp,
    Match,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum SetOp {
    #[strum(to_string = "union all")]
    UnionAll,
    #[strum(to_string = "union")]
    Union,
    #[strum(to_string = "except")]
    Except,
    #[strum(to_string = "intersect")]
    Intersect,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum NullsOrder {
    #[strum(to_string = "nulls first")]
    First,
    #[strum(to_string = "nulls last")]
    Last,
}
