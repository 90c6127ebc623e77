//! Semantic analysis: lowering parsed statements into [Statement]
//! descriptors, and the constant folding they need along the way.

pub(crate) mod escape;
mod stmt;
mod value;

use crate::pr::Stmt;
use crate::{Result, Statement};

/// Lowers a whole script. The first failing statement aborts.
pub fn compile_stmts(stmts: &[Stmt]) -> Result<Vec<Statement>> {
    stmt::compile_stmts(stmts)
}
