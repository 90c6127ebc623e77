//! Placeholders for values known only when a statement runs.
//!
//! A placeholder is embedded in SQL text as `\0<kind><payload>\0`, where the
//! kind is `v` (a variable, substituted as a literal), `t` (a table named by
//! a variable, substituted as an identifier) or `e` (SQL whose result names
//! a table). Identifiers can't be bound parameters, so the text itself has
//! to carry them.

use std::ops::Range;

use serde::Serialize;
use serde_json::Value;

use crate::{Error, ErrorKind, Reason, Result, WithErrorInfo};

const SENTINEL: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    Variable,
    Table,
    Expression,
}

impl PlaceholderKind {
    fn tag(self) -> char {
        match self {
            PlaceholderKind::Variable => 'v',
            PlaceholderKind::Table => 't',
            PlaceholderKind::Expression => 'e',
        }
    }

    fn from_tag(tag: char) -> Option<Self> {
        Some(match tag {
            'v' => PlaceholderKind::Variable,
            't' => PlaceholderKind::Table,
            'e' => PlaceholderKind::Expression,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub payload: String,
    /// Byte range of the whole placeholder, sentinels included.
    pub range: Range<usize>,
}

/// Build the placeholder text for a payload.
pub(crate) fn placeholder(kind: PlaceholderKind, payload: &str) -> Result<String> {
    if payload.contains(SENTINEL) {
        return Err(Error::new_semantic(format!(
            "placeholder payload cannot contain a NUL character: `{}`",
            payload.replace(SENTINEL, "\\0")
        ))
        .push_hint("variables can't be nested inside `@(...)`"));
    }
    Ok(format!("{SENTINEL}{}{payload}{SENTINEL}", kind.tag()))
}

/// Find every placeholder in `sql`, in order of appearance.
pub fn scan_placeholders(sql: &str) -> Vec<Placeholder> {
    let mut res = Vec::new();
    let mut rest = sql.char_indices();

    while let Some((start, c)) = rest.next() {
        if c != SENTINEL {
            continue;
        }
        let Some((_, tag)) = rest.next() else {
            break;
        };
        let mut payload = String::new();
        let mut end = None;
        for (i, c) in rest.by_ref() {
            if c == SENTINEL {
                end = Some(i + 1);
                break;
            }
            payload.push(c);
        }
        let (Some(kind), Some(end)) = (PlaceholderKind::from_tag(tag), end) else {
            break;
        };
        res.push(Placeholder {
            kind,
            payload,
            range: start..end,
        });
    }
    res
}

/// Values of variables, in the order they were bound.
///
/// Environments are never changed in place: [Environment::extend] and
/// [Environment::bind_row] return a new one, so sibling scopes can't see
/// each other's bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Environment {
    vars: Vec<(String, Value)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// A copy of this environment with `name` bound, shadowing any earlier
    /// binding.
    pub fn extend<S: ToString>(&self, name: S, value: Value) -> Environment {
        let mut vars = self.vars.clone();
        vars.push((name.to_string(), value));
        Environment { vars }
    }

    /// The environment for one iteration of a `for` statement: each
    /// assignment bound to the value in the same position of `row`.
    pub fn bind_row(&self, assignments: &[String], row: &[Value]) -> Result<Environment> {
        if assignments.len() != row.len() {
            return Err(Error::new_simple(format!(
                "expected {} values per row, but found {}",
                assignments.len(),
                row.len()
            ))
            .with_kind(ErrorKind::Placeholder));
        }

        let mut vars = self.vars.clone();
        vars.extend(assignments.iter().cloned().zip(row.iter().cloned()));
        Ok(Environment { vars })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(n, _)| n.as_str())
    }

    /// Replace every placeholder in `sql`. Variables become SQL literals and
    /// tables quoted identifiers. `evaluate` runs the SQL of an expression
    /// placeholder and returns the table name it produced.
    pub fn resolve<F>(&self, sql: &str, mut evaluate: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut res = String::with_capacity(sql.len());
        let mut last = 0;

        for p in scan_placeholders(sql) {
            res += &sql[last..p.range.start];
            last = p.range.end;

            let text = match p.kind {
                PlaceholderKind::Variable => sql_literal(self.lookup(&p.payload)?),
                PlaceholderKind::Table => quote_ident(&value_text(self.lookup(&p.payload)?)),
                PlaceholderKind::Expression => quote_ident(&evaluate(&p.payload)?),
            };
            res += &text;
        }
        res += &sql[last..];

        log::trace!("resolved placeholders: {res}");
        Ok(res)
    }

    fn lookup(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| {
            Error::new(Reason::NotFound {
                name: name.to_string(),
                namespace: "variable".to_string(),
            })
            .with_kind(ErrorKind::Placeholder)
        })
    }
}

impl FromIterator<(String, Value)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Environment {
            vars: iter.into_iter().collect(),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a JSON value as an SQLite literal. Arrays and objects become
/// their JSON text.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        other => quote_string(&other.to_string()),
    }
}

pub(crate) fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
