use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::ops::Range;

use anstream::adapter::strip_str;
use ariadne::{Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use crate::{Error, ErrorKind, Errors, Span};

const SOURCE_ID: &str = "";

#[derive(Clone, Serialize)]
pub struct ErrorMessage {
    pub kind: ErrorKind,
    /// Machine-readable identifier of the error
    pub code: Option<String>,
    /// Plain text of the error
    pub reason: String,
    /// A list of suggestions of how to fix the error
    pub hints: Vec<String>,
    /// Character offset of error origin within the source
    pub span: Option<Span>,
    /// Annotated code, containing cause and hints.
    pub display: Option<String>,
    /// Line and column number of error origin within the source
    pub location: Option<SourceLocation>,
}

/// Location within the source.
/// Tuples contain:
/// - line number (0-based),
/// - column number within that line (0-based),
///
/// Offsets are in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub start: (usize, usize),

    pub end: (usize, usize),

    pub start_offset: usize,

    pub end_offset: usize,
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // https://github.com/zesterer/ariadne/issues/52
        if let Some(display) = &self.display {
            let message_without_trailing_spaces = display
                .split('\n')
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n");
            f.write_str(&message_without_trailing_spaces)?;
        } else {
            let code = (self.code.as_ref())
                .map(|c| format!("[{c}] "))
                .unwrap_or_default();

            writeln!(f, "{}Error: {}", code, &self.reason)?;
            for hint in &self.hints {
                writeln!(f, "↳ Hint: {}", hint)?;
            }
        }
        Ok(())
    }
}

impl Debug for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self, f)
    }
}

impl From<Error> for ErrorMessage {
    fn from(e: Error) -> Self {
        log::debug!("{:#?}", e);
        ErrorMessage {
            code: e.code.map(str::to_string),
            kind: e.kind,
            reason: e.reason.to_string(),
            hints: e.hints,
            span: e.span,
            display: None,
            location: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessages {
    pub inner: Vec<ErrorMessage>,
}
impl StdError for ErrorMessages {}

impl From<Vec<ErrorMessage>> for ErrorMessages {
    fn from(errors: Vec<ErrorMessage>) -> Self {
        ErrorMessages { inner: errors }
    }
}

impl From<ErrorMessage> for ErrorMessages {
    fn from(e: ErrorMessage) -> Self {
        ErrorMessages { inner: vec![e] }
    }
}

impl From<Error> for ErrorMessages {
    fn from(e: Error) -> Self {
        ErrorMessages {
            inner: vec![ErrorMessage::from(e)],
        }
    }
}

impl From<Vec<Error>> for ErrorMessages {
    fn from(errs: Vec<Error>) -> Self {
        ErrorMessages {
            inner: errs.into_iter().map(ErrorMessage::from).collect(),
        }
    }
}

impl From<Errors> for ErrorMessages {
    fn from(errs: Errors) -> Self {
        ErrorMessages::from(errs.0)
    }
}

impl Display for ErrorMessages {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for e in &self.inner {
            Display::fmt(&e, f)?;
        }
        Ok(())
    }
}

impl ErrorMessages {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Whether the input stopped short of a complete statement, so a REPL
    /// should ask for another line instead of reporting an error.
    pub fn is_incomplete(&self) -> bool {
        self.inner.iter().any(|e| e.kind == ErrorKind::Incomplete)
    }

    /// Computes message location and builds the pretty display.
    pub fn composed(mut self, source: &str) -> Self {
        let cache = Source::from(source.to_string());

        for e in &mut self.inner {
            if e.span.is_none() {
                continue;
            }
            e.location = e.compose_location(source, &cache);
            e.display = e.compose_display(&cache);
        }
        self
    }

    /// Drops ANSI escapes from every display.
    pub fn without_colors(self) -> Self {
        ErrorMessages {
            inner: self
                .inner
                .into_iter()
                .map(|e| ErrorMessage {
                    display: e.display.map(|s| strip_str(&s).to_string()),
                    ..e
                })
                .collect(),
        }
    }
}

impl ErrorMessage {
    fn compose_display(&self, source: &Source) -> Option<String> {
        // We always pass color to ariadne as true, and strip later.
        let config = Config::default().with_color(true);

        let span = Range::from(self.span?);

        let mut report = Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
            .with_config(config)
            .with_label(Label::new((SOURCE_ID, span)).with_message(&self.reason));

        if let Some(code) = &self.code {
            report = report.with_code(code);
        }

        if !self.hints.is_empty() {
            report.set_help(&self.hints[0]);
        }
        if self.hints.len() > 1 {
            report.set_note(&self.hints[1]);
        }

        let mut out = Vec::new();
        report
            .finish()
            .write((SOURCE_ID, source.clone()), &mut out)
            .ok()?;
        String::from_utf8(out).ok()
    }

    fn compose_location(&self, text: &str, source: &Source) -> Option<SourceLocation> {
        let span = self.span?;

        let start = source.get_offset_line(span.start)?;
        let end = source.get_offset_line(span.end)?;
        Some(SourceLocation {
            start: (start.1, start.2),
            end: (end.1, end.2),
            start_offset: byte_offset(text, span.start),
            end_offset: byte_offset(text, span.end),
        })
    }
}

/// Converts a character offset into a byte offset.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
