//! # erqc
//!
//! Compiler for Erq, a terse relational query language. Targets SQLite SQL,
//! wrapped in statement descriptors that tell an execution engine how to run
//! each piece and where its rows go.
//!
//! You probably want to start with the [compile] wrapper function.
//!
//! For more granular access, refer to this diagram:
//! ```ascii
//!            Erq
//!
//!            │  erq_to_tokens
//!            ▼
//!           LR tokens
//!            │
//!            │  erq_to_pr
//!            ▼
//!           PR AST
//!            │
//!            │  pr_to_statements
//!            ▼
//!
//!       Statement descriptors (SQL text + output/control data)
//! ```
//!
//! ## Common use-cases
//!
//! - Compile a script into descriptors at run time.
//!
//!   ```
//!   # fn main() -> Result<(), erqc::ErrorMessages> {
//!   let statements = erqc::compile("users[age > 20]{name}", &erqc::Options::default())?;
//!   assert_eq!(statements[0].queries(), ["select name from users where (age > 20)"]);
//!   # Ok(())
//!   # }
//!   ```
//!
//! - Compile, inspect and debug Erq from the command line.
//!
//!   ```sh
//!   $ erqc compile script.erq
//!   ```
//!
//! ## Values known only at execution time
//!
//! Variables (`@name`), dynamically named tables and `@(expr)` sources can't
//! be SQL bind parameters, since some of them stand for identifiers. They
//! are emitted as placeholders inside the SQL text instead; see the
//! [placeholder] module for the format and for [Environment], which
//! substitutes them.
//!
//! ## Feature flags
//!
//! * `cli`: enables the `erqc` CLI binary. This is enabled by default. When
//!   consuming this crate from another rust library, it can be disabled.

#![forbid(unsafe_code)]
// Our error type carries several strings, which trips the default size
// warning. Not worth a clippy config file for a single setting.
#![allow(clippy::result_large_err)]

use std::sync::OnceLock;

use semver::Version;
use serde::{Deserialize, Serialize};

pub use erqc_parser::error::{Error, ErrorKind, Errors, Reason, WithErrorInfo};
pub use erqc_parser::lexer::lr;
pub use erqc_parser::parser::pr;
pub use erqc_parser::span::Span;
pub use erqc_parser::Rule;
pub use error_message::{ErrorMessage, ErrorMessages, SourceLocation};
pub use placeholder::{scan_placeholders, Environment, Placeholder, PlaceholderKind};
pub use statement::{ChartFormat, Dest, Format, Statement, TextFormat};

#[cfg(feature = "cli")]
pub mod cli;
pub mod debug;
mod error_message;
pub mod placeholder;
pub mod semantic;
pub mod sql;
mod statement;
mod test;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Get the version of the compiler. This is determined by, in order:
/// - An optional environment variable `ERQC_VERSION_OVERRIDE`. Note that this
///   needs to be set the first time this function is called, since it's
///   stored in a static.
/// - The version in the cargo manifest
pub fn compiler_version() -> &'static Version {
    static COMPILER_VERSION: OnceLock<Version> = OnceLock::new();
    COMPILER_VERSION.get_or_init(|| {
        if let Ok(version_override) = std::env::var("ERQC_VERSION_OVERRIDE") {
            match Version::parse(&version_override) {
                Ok(version) => return version,
                Err(e) => log::warn!("Could not parse version override {version_override}: {e}"),
            }
        }
        let cargo_version = env!("CARGO_PKG_VERSION");
        Version::parse(cargo_version).unwrap_or_else(|e| {
            log::warn!("Could not parse erqc version number {cargo_version}: {e}");
            Version::new(0, 0, 0)
        })
    })
}

/// Compile Erq source into statement descriptors.
///
/// This is a wrapper for:
/// - [erq_to_pr]: Build the PR AST from source text, under `options.rule`.
/// - [pr_to_statements]: Lower each statement into SQL text and its
///   descriptor.
///
/// # Example
///
/// ```
/// use erqc::{compile, Options, Statement};
///
/// let statements = compile("delete from T[a < 0]", &Options::default()).unwrap();
/// assert_eq!(
///     statements,
///     vec![Statement::Delete { query: "delete from T where a < 0".to_string() }]
/// );
/// ```
pub fn compile(source: &str, options: &Options) -> Result<Vec<Statement>, ErrorMessages> {
    debug::log_entry(|| debug::DebugEntryKind::ReprErq(source.to_string()));

    if debug::log_is_enabled() {
        debug::log_stage(debug::Stage::Parsing(debug::StageParsing::Lexer));
        if let Ok(tokens) = erqc_parser::lexer::lex_source(source) {
            debug::log_entry(|| debug::DebugEntryKind::ReprTokens(tokens));
        }
    }

    debug::log_stage(debug::Stage::Parsing(debug::StageParsing::Parser));
    erqc_parser::parse_source(source, options.rule)
        .map_err(ErrorMessages::from)
        .and_then(|stmts| {
            debug::log_entry(|| debug::DebugEntryKind::ReprPr(stmts.clone()));
            debug::log_stage(debug::Stage::Semantic);
            semantic::compile_stmts(&stmts).map_err(ErrorMessages::from)
        })
        .map(|statements| {
            debug::log_stage(debug::Stage::Statements);
            let statements = if options.format {
                statements
                    .into_iter()
                    .map(|s| s.map_queries(&sql::format_sql))
                    .collect()
            } else {
                statements
            };
            debug::log_entry(|| debug::DebugEntryKind::ReprStatements(statements.clone()));
            statements
        })
        .map_err(|e| options.display.apply(e.composed(source)))
}

/// Compile Erq source into a JSON array of statement descriptors.
pub fn compile_to_json(source: &str, options: &Options) -> Result<String, ErrorMessages> {
    let statements = compile(source, options)?;
    json::from_statements(&statements)
}

/// Compilation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Which grammar rule the whole input must match.
    ///
    /// Defaults to [Rule::Script].
    pub rule: Rule,

    /// Pass every generated SQL string through a formatter that splits it
    /// into multiple lines and prettifies indentation and spacing.
    ///
    /// Defaults to false.
    pub format: bool,

    /// Whether to use ANSI colors in error messages.
    ///
    /// Colors are best handled at the edge of an application, for example
    /// with `anstream`, rather than threaded through as an option.
    pub display: DisplayOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            rule: Rule::Script,
            format: false,
            display: DisplayOptions::Plain,
        }
    }
}

impl Options {
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    pub fn no_format(self) -> Self {
        self.with_format(false)
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum DisplayOptions {
    /// Plain text
    Plain,
    /// With ANSI colors
    AnsiColor,
}

impl DisplayOptions {
    fn apply(&self, messages: ErrorMessages) -> ErrorMessages {
        match self {
            DisplayOptions::AnsiColor => messages,
            DisplayOptions::Plain => messages.without_colors(),
        }
    }
}

/// Lex Erq source into Lexer Representation.
pub fn erq_to_tokens(source: &str) -> Result<lr::Tokens, ErrorMessages> {
    erqc_parser::lexer::lex_source(source).map_err(|e| ErrorMessages::from(e).composed(source))
}

/// Parse Erq source into a PR AST.
pub fn erq_to_pr(source: &str, rule: Rule) -> Result<Vec<pr::Stmt>, ErrorMessages> {
    erqc_parser::parse_source(source, rule).map_err(|e| ErrorMessages::from(e).composed(source))
}

/// Lower a PR AST into statement descriptors.
///
/// Error messages aren't composed here, since there is no source text to
/// point into.
pub fn pr_to_statements(stmts: &[pr::Stmt]) -> Result<Vec<Statement>, ErrorMessages> {
    semantic::compile_stmts(stmts).map_err(ErrorMessages::from)
}

/// JSON serialization and deserialization functions
pub mod json {
    use super::*;

    /// JSON serialization
    pub fn from_pr(stmts: &[pr::Stmt]) -> Result<String, ErrorMessages> {
        serde_json::to_string(stmts).map_err(convert_json_err)
    }

    /// JSON deserialization
    pub fn to_pr(json: &str) -> Result<Vec<pr::Stmt>, ErrorMessages> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    /// JSON serialization
    pub fn from_statements(statements: &[Statement]) -> Result<String, ErrorMessages> {
        serde_json::to_string(statements).map_err(convert_json_err)
    }

    /// JSON deserialization
    pub fn to_statements(json: &str) -> Result<Vec<Statement>, ErrorMessages> {
        serde_json::from_str(json).map_err(convert_json_err)
    }

    fn convert_json_err(err: serde_json::Error) -> ErrorMessages {
        ErrorMessages::from(Error::new_simple(err.to_string()))
    }
}
