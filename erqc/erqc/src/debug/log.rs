//! Internal machinery for collecting debug logs.
#![doc(hidden)]

use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use std::time::SystemTime;

use chrono::prelude::*;
use serde::Serialize;
use strum_macros::AsRefStr;

use erqc_parser::lexer::lr;
use erqc_parser::parser::pr;

use crate::Statement;

/// Stores debug info about current compilation.
/// Is reset by [log_start] and [log_finish].
static CURRENT_LOG: RwLock<Option<DebugLog>> = RwLock::new(None);

fn current_log() -> RwLockWriteGuard<'static, Option<DebugLog>> {
    CURRENT_LOG.write().unwrap_or_else(PoisonError::into_inner)
}

pub fn log_start() {
    let version = crate::compiler_version().to_string();
    let started_at: DateTime<Utc> = SystemTime::now().into();
    let started_at = format!("{}", started_at.format("%+"));

    let mut lock = current_log();
    *lock = Some(DebugLog {
        started_at,
        version,
        entries: Vec::new(),

        current_stage: Stage::Parsing(StageParsing::Lexer),
    });
}

pub fn log_finish() -> Option<DebugLog> {
    current_log().take()
}

pub fn log_is_enabled() -> bool {
    CURRENT_LOG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

pub fn log_stage(stage: Stage) {
    if let Some(log) = current_log().as_mut() {
        log.current_stage = stage;
    }
}

pub fn log_entry(entry: impl FnOnce() -> DebugEntryKind) {
    if let Some(log) = current_log().as_mut() {
        let entry = DebugEntry {
            stage: log.current_stage,
            kind: entry(),
        };
        log.entries.push(entry);
    }
}

#[derive(Serialize)]
pub struct DebugLog {
    pub(super) started_at: String,
    pub(super) version: String,
    pub(super) entries: Vec<DebugEntry>,

    #[serde(skip)]
    current_stage: Stage,
}

impl DebugLog {
    pub fn entries(&self) -> impl Iterator<Item = (Stage, &DebugEntryKind)> {
        self.entries.iter().map(|e| (e.stage, &e.kind))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[derive(Serialize)]
pub(super) struct DebugEntry {
    pub(crate) stage: Stage,
    pub(crate) kind: DebugEntryKind,
}

#[derive(Serialize, AsRefStr)]
pub enum DebugEntryKind {
    ReprErq(String),
    ReprTokens(lr::Tokens),
    ReprPr(Vec<pr::Stmt>),
    ReprStatements(Vec<Statement>),
    Message(Message),
}

#[derive(Serialize)]
pub struct Message {
    pub level: String,
    pub module_path: Option<String>,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, AsRefStr)]
pub enum Stage {
    Parsing(StageParsing),
    Semantic,
    Statements,
}

impl Stage {
    pub fn sub_stage(&self) -> Option<&'_ str> {
        match self {
            Stage::Parsing(s) => Some(s.as_ref()),
            Stage::Semantic | Stage::Statements => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, AsRefStr)]
pub enum StageParsing {
    Lexer,
    Parser,
}
