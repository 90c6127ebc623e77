use std::fmt::Debug;

use serde::Serialize;

use crate::span::Span;

/// An erqc error. Used internally, exposed as erqc::ErrorMessage.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub reason: Reason,
    pub hints: Vec<String>,
    /// Machine readable identifier error code eg, "E0001"
    pub code: Option<&'static str>,
}

/// Multiple erqc errors. Used internally, exposed as erqc::ErrorMessages.
#[derive(Debug, Clone)]
pub struct Errors(pub Vec<Error>);

/// What went wrong, from the point of view of the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::AsRefStr)]
pub enum ErrorKind {
    /// The input is a valid prefix that needs more text. Only produced under
    /// the REPL-line rule.
    Incomplete,
    Syntax,
    Semantic,
    /// A placeholder referenced a name missing from the environment.
    Placeholder,
}

#[derive(Debug, Clone)]
pub enum Reason {
    Simple(String),
    Expected {
        who: Option<String>,
        expected: String,
        found: String,
    },
    Unexpected {
        found: String,
    },
    NotFound {
        name: String,
        namespace: String,
    },
    Bug {
        details: Option<String>,
    },
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            kind: ErrorKind::Syntax,
            span: None,
            reason,
            hints: Vec::new(),
            code: None,
        }
    }

    pub fn new_simple<S: ToString>(reason: S) -> Self {
        Error::new(Reason::Simple(reason.to_string()))
    }

    /// A well-formed parse that cannot be lowered.
    pub fn new_semantic<S: ToString>(reason: S) -> Self {
        Error::new_simple(reason).with_kind(ErrorKind::Semantic)
    }

    /// Used for things that you *think* should never happen, but are not sure.
    pub fn new_assert<S: ToString>(details: S) -> Self {
        Error::new(Reason::Bug {
            details: Some(details.to_string()),
        })
        .with_kind(ErrorKind::Semantic)
    }

    pub fn is_incomplete(&self) -> bool {
        self.kind == ErrorKind::Incomplete
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::Simple(text) => f.write_str(text),
            Reason::Expected {
                who,
                expected,
                found,
            } => {
                if let Some(who) = who {
                    write!(f, "{who} ")?;
                }
                write!(f, "expected {expected}, but found {found}")
            }
            Reason::Unexpected { found } => write!(f, "unexpected {found}"),
            Reason::NotFound { name, namespace } => write!(f, "{namespace} `{name}` not found"),
            Reason::Bug { details } => {
                write!(f, "internal compiler error")?;
                if let Some(details) = details {
                    write!(f, "; {details}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Errors(vec![error])
    }
}

impl From<Vec<Error>> for Errors {
    fn from(errors: Vec<Error>) -> Self {
        Errors(errors)
    }
}

// Needed for anyhow
impl std::error::Error for Error {}

// Needed for anyhow
impl std::error::Error for Errors {}

// Needed for StdError
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self, f)
    }
}

// Needed for StdError
impl std::fmt::Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self, f)
    }
}

pub trait WithErrorInfo: Sized {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self;

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self;

    fn with_span(self, span: Option<Span>) -> Self;

    fn with_span_fallback(self, span: Option<Span>) -> Self;

    fn with_code(self, code: &'static str) -> Self;

    fn with_kind(self, kind: ErrorKind) -> Self;
}

impl WithErrorInfo for Error {
    fn push_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.hints.push(hint.into());
        self
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(mut self, hints: I) -> Self {
        self.hints = hints.into_iter().map(|x| x.into()).collect();
        self
    }

    fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    fn with_span_fallback(mut self, span: Option<Span>) -> Self {
        self.span = self.span.or(span);
        self
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<T, E: WithErrorInfo> WithErrorInfo for Result<T, E> {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self {
        self.map_err(|e| e.push_hint(hint))
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self {
        self.map_err(|e| e.with_hints(hints))
    }

    fn with_span(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span(span))
    }

    fn with_span_fallback(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span_fallback(span))
    }

    fn with_code(self, code: &'static str) -> Self {
        self.map_err(|e| e.with_code(code))
    }

    fn with_kind(self, kind: ErrorKind) -> Self {
        self.map_err(|e| e.with_kind(kind))
    }
}

#[cfg(test)]
mod test {
    use insta::assert_debug_snapshot;

    use super::*;

    #[test]
    fn test_error_builders() {
        let err = Error::new_semantic("unsupported escape `\\q`")
            .with_span(Some(Span { start: 2, end: 4 }))
            .push_hint("use `\\\\` for a literal backslash")
            .with_code("E0002");

        assert_debug_snapshot!(err, @r#"
        Error {
            kind: Semantic,
            span: Some(
                2-4,
            ),
            reason: Simple(
                "unsupported escape `\\q`",
            ),
            hints: [
                "use `\\\\` for a literal backslash",
            ],
            code: Some(
                "E0002",
            ),
        }
        "#);
    }

    #[test]
    fn test_span_fallback_keeps_existing() {
        let res: Result<(), Error> = Err(Error::new_simple("boom").with_span(Some(Span {
            start: 1,
            end: 2,
        })));
        let err = res
            .with_span_fallback(Some(Span { start: 7, end: 9 }))
            .unwrap_err();
        assert_eq!(err.span, Some(Span { start: 1, end: 2 }));
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_reason_display() {
        let reason = Reason::Expected {
            who: None,
            expected: "`;;`".to_string(),
            found: "`]`".to_string(),
        };
        assert_eq!(reason.to_string(), "expected `;;`, but found `]`");
    }
}
