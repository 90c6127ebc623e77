//! PR, or "Parser Representation" is the AST of parsed Erq. Statements hold
//! table expressions, which hold scalar expressions. Nothing here knows
//! about SQL; lowering happens in `erqc`.

pub use expr::*;
pub use ident::*;
pub use ops::*;
pub use stmt::*;
pub use table::*;

pub use crate::span::Span;

mod expr;
mod ident;
mod ops;
mod stmt;
mod table;
