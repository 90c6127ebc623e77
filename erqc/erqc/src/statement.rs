//! Statement descriptors, the compiler's output.
//!
//! Each descriptor is plain data: SQL text for the execution engine to run,
//! plus how to present its rows. Control nodes (`if`, `for`) carry their
//! probe query and nested statement lists; the engine evaluates them.

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::placeholder::{scan_placeholders, Placeholder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Statement {
    /// A query producing rows.
    Select {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<Format>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest: Option<Dest>,
    },
    Pragma {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<Format>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest: Option<Dest>,
    },
    Insert {
        query: String,
    },
    Update {
        query: String,
    },
    Delete {
        query: String,
    },
    /// Schema changes: `create` and `drop`.
    Ddl {
        query: String,
    },
    /// A meta operation handled by the engine rather than by SQLite.
    Command {
        command: String,
        args: Vec<Value>,
    },
    /// `condition` selects 1 when the `then` branch should run.
    If {
        condition: String,
        then_statements: Vec<Statement>,
        else_statements: Vec<Statement>,
    },
    /// Runs the body once per row of `source_table`, with each assignment
    /// bound to the column of the same name.
    For {
        assignments: Vec<String>,
        source_table: String,
        body_statements: Vec<Statement>,
    },
}

/// How the rows of a query are rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Format {
    Text(TextFormat),
    Chart(ChartFormat),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TextFormat {
    /// JSON array rows
    Dense,
    /// JSON object rows
    Sparse,
    /// Values written as they are, without separators
    Raw,
    /// `explain query plan` rows rendered as an indented tree
    Eqp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartFormat {
    Vega {
        view: Value,
        /// `spec`, `svg` or `png`; the engine picks when unset.
        format: Option<String>,
    },
}

/// Where rows go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dest {
    Stdout,
    Stderr,
    File { path: String },
    Url { url: String },
    /// The path is the value of a variable.
    Variable { name: String },
    /// The path is the result of a query, run just before writing.
    Deferred { query: String },
}

impl From<TextFormat> for Format {
    fn from(format: TextFormat) -> Self {
        Format::Text(format)
    }
}

impl Statement {
    /// The SQL texts of this statement, nested statements excluded.
    pub fn queries(&self) -> Vec<&str> {
        match self {
            Statement::Select { query, dest, .. } | Statement::Pragma { query, dest, .. } => {
                let mut res = vec![query.as_str()];
                if let Some(Dest::Deferred { query }) = dest {
                    res.push(query);
                }
                res
            }
            Statement::Insert { query }
            | Statement::Update { query }
            | Statement::Delete { query }
            | Statement::Ddl { query } => vec![query.as_str()],
            Statement::Command { .. } => Vec::new(),
            Statement::If { condition, .. } => vec![condition.as_str()],
            Statement::For { source_table, .. } => vec![source_table.as_str()],
        }
    }

    /// Placeholders in this statement's SQL texts, in order of appearance.
    /// Ranges are byte offsets into the text that [Statement::queries]
    /// returns at the same position.
    pub fn placeholders(&self) -> Vec<Vec<Placeholder>> {
        self.queries().into_iter().map(scan_placeholders).collect()
    }

    /// Apply `f` to every SQL text, nested statements included.
    pub(crate) fn map_queries(self, f: &impl Fn(String) -> String) -> Statement {
        let map_all = |stmts: Vec<Statement>| -> Vec<Statement> {
            stmts.into_iter().map(|s| s.map_queries(f)).collect()
        };
        let map_dest = |dest: Option<Dest>| match dest {
            Some(Dest::Deferred { query }) => Some(Dest::Deferred { query: f(query) }),
            other => other,
        };

        match self {
            Statement::Select { query, format, dest } => Statement::Select {
                query: f(query),
                format,
                dest: map_dest(dest),
            },
            Statement::Pragma { query, format, dest } => Statement::Pragma {
                query: f(query),
                format,
                dest: map_dest(dest),
            },
            Statement::Insert { query } => Statement::Insert { query: f(query) },
            Statement::Update { query } => Statement::Update { query: f(query) },
            Statement::Delete { query } => Statement::Delete { query: f(query) },
            Statement::Ddl { query } => Statement::Ddl { query: f(query) },
            Statement::Command { command, args } => Statement::Command { command, args },
            Statement::If {
                condition,
                then_statements,
                else_statements,
            } => Statement::If {
                condition: f(condition),
                then_statements: map_all(then_statements),
                else_statements: map_all(else_statements),
            },
            Statement::For {
                assignments,
                source_table,
                body_statements,
            } => Statement::For {
                assignments,
                source_table: f(source_table),
                body_statements: map_all(body_statements),
            },
        }
    }
}
