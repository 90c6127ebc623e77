//! Lexer and parser for Erq, a terse relational query language that
//! compiles to SQLite SQL.
//!
//! The entry point is [parser::parse_source], which turns source text into
//! a list of [parser::pr::Stmt]. Lowering to SQL lives in the `erqc` crate.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
mod test;

pub use crate::parser::{parse_source, Rule};
