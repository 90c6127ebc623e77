use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tokens(pub Vec<Token>);

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: std::ops::Range<usize>,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, EnumAsInner)]
pub enum TokenKind {
    /// A name as written; backtick-quoted names keep their backticks.
    Ident(String),
    /// A reserved word, lowercased.
    Keyword(String),
    Literal(Literal),
    /// `@name`
    Variable(String),
    /// `e'...'`
    Escaped(Vec<EscapePart>),
    /// `-:left:>` or `-:left:right:>`
    JoinArrow {
        left: String,
        right: Option<String>,
    },
    /// A `.name rest of line` meta command.
    Meta {
        name: String,
        args: String,
    },

    /// single-char control tokens
    Control(char),

    Terminator,  // ;;
    ArrowFat,    // =>
    DoubleColon, // ::
    ArrowThin,   // ->
    ArrowDouble, // ->>
    Concat,      // ||
    Eq,          // ==
    Ne,          // != or <>
    Gte,         // >=
    Lte,         // <=
    ShiftLeft,   // <<
    ShiftRight,  // >>
}

/// Literals keep the text they were written with.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, EnumAsInner, strum::AsRefStr)]
pub enum Literal {
    Number(String),
    /// A single-quoted SQL string, including its quotes.
    String(String),
    /// A double-quoted JSON string, including its quotes.
    Json(String),
    /// `x'..'`
    Blob(String),
}

/// One component of an escaped string.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EscapePart {
    Text(String),
    /// `''` or `\'`
    Apostrophe,
    /// A bare `%`
    Percent,
    /// `\\`
    Backslash,
    /// `\n`, `\t` or `\r`, holding the code point.
    Control(u32),
    /// `\u{H+}`, `\uHHHH` or `\xHH`, holding the hex digits as written.
    Unicode(String),
    /// `\%FMT(EXPR)`
    Format { spec: String, tokens: Vec<Token> },
    /// `\(EXPR)`
    Interpolate { tokens: Vec<Token> },
    /// Any other backslash escape; rejected when lowered.
    Unknown(char),
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Ident(s) => {
                if s.is_empty() {
                    // FYI this shows up in errors
                    write!(f, "an identifier")
                } else {
                    write!(f, "{s}")
                }
            }
            TokenKind::Keyword(s) => write!(f, "keyword {s}"),
            TokenKind::Literal(lit) => write!(f, "{lit}"),
            TokenKind::Variable(name) => write!(f, "@{name}"),
            TokenKind::Escaped(_) => write!(f, "escaped string"),
            TokenKind::JoinArrow { left, right } => match right {
                Some(right) => write!(f, "-:{left}:{right}:>"),
                None => write!(f, "-:{left}:>"),
            },
            TokenKind::Meta { name, .. } => write!(f, ".{name}"),
            TokenKind::Control(c) => write!(f, "{c}"),

            TokenKind::Terminator => f.write_str(";;"),
            TokenKind::ArrowFat => f.write_str("=>"),
            TokenKind::DoubleColon => f.write_str("::"),
            TokenKind::ArrowThin => f.write_str("->"),
            TokenKind::ArrowDouble => f.write_str("->>"),
            TokenKind::Concat => f.write_str("||"),
            TokenKind::Eq => f.write_str("=="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Gte => f.write_str(">="),
            TokenKind::Lte => f.write_str("<="),
            TokenKind::ShiftLeft => f.write_str("<<"),
            TokenKind::ShiftRight => f.write_str(">>"),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(s) | Literal::String(s) | Literal::Json(s) | Literal::Blob(s) => {
                f.write_str(s)
            }
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}: {:?}", self.span.start, self.span.end, self.kind)
    }
}
