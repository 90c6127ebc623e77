use std::ops::Range;

use chumsky::prelude::*;

use self::lr::{EscapePart, Literal, Token, TokenKind, Tokens};
use crate::error::{Error, Reason, WithErrorInfo};
use crate::span::Span;

pub mod lr;
#[cfg(test)]
mod test;

pub(crate) type LError = Simple<char>;

/// Reserved words. Anything else that looks like a word is a name, so
/// contextual words such as `over`, `window` or `output` stay usable as
/// column names.
pub const KEYWORDS: &[&str] = &[
    "and", "as", "asc", "between", "by", "case", "collate", "cross", "desc", "distinct", "do",
    "else", "end", "escape", "except", "false", "for", "from", "full", "glob", "if", "in",
    "inner", "intersect", "is", "join", "left", "like", "limit", "match", "natural", "not",
    "null", "offset", "on", "or", "order", "regexp", "right", "select", "set", "then", "true",
    "union", "using", "values", "when", "where", "with",
];

/// Lex Erq into tokens.
pub fn lex_source(source: &str) -> Result<Tokens, Vec<Error>> {
    lex_source_raw(source)
        .map(Tokens)
        .map_err(|errors| {
            errors
                .into_iter()
                .map(|e| convert_lexer_error(source, e))
                .collect()
        })
}

/// Lex, keeping chumsky's errors so callers can tell apart an error at the
/// end of input.
pub(crate) fn lex_source_raw(source: &str) -> Result<Vec<Token>, Vec<LError>> {
    let res = lexer().parse(source);
    if let Ok(tokens) = &res {
        log::trace!("lexed {} tokens", tokens.len());
    }
    res
}

pub(crate) fn convert_lexer_error(source: &str, e: LError) -> Error {
    let while_parsing = e
        .label()
        .map(|l| format!(" while parsing {l}"))
        .unwrap_or_default();

    let reason = match e.found() {
        Some(found) => Reason::Unexpected {
            found: format!("{found}{while_parsing}"),
        },
        None => Reason::Simple(format!("unexpected end of input{while_parsing}")),
    };

    // spans past the end of the source point at its last character
    let len = source.chars().count();
    let mut span = Span::from(e.span());
    if span.start >= len && len > 0 {
        span = Span {
            start: len - 1,
            end: len,
        };
    }

    Error::new(reason).with_span(Some(span))
}

pub(crate) fn lexer() -> impl Parser<char, Vec<Token>, Error = LError> {
    let token = token();

    let meta = meta_command().map_with_span(into_token);

    // meta commands only start a line, so new lines are lexed one at a time
    // and never swallowed by a longer whitespace run
    let leading_meta = inline_whitespace().or_not().ignore_then(meta.clone());
    let line_meta = just('\n')
        .ignore_then(inline_whitespace().or_not())
        .ignore_then(meta);

    let item = choice((
        line_meta.map(Some),
        just('\n').to(None),
        inline_whitespace_or_comment().to(None),
        token.map(Some),
    ));

    leading_meta
        .or_not()
        .chain::<Token, Vec<_>, _>(item.repeated().flatten())
        .then_ignore(end())
}

fn into_token(kind: TokenKind, span: Range<usize>) -> Token {
    Token { kind, span }
}

fn token() -> impl Parser<char, Token, Error = LError> + Clone {
    recursive(|token| {
        let control_multi = choice((
            just(";;").to(TokenKind::Terminator),
            just("=>").to(TokenKind::ArrowFat),
            just("::").to(TokenKind::DoubleColon),
            just("->>").to(TokenKind::ArrowDouble),
            just("->").to(TokenKind::ArrowThin),
            just("||").to(TokenKind::Concat),
            just("==").to(TokenKind::Eq),
            just("!=").to(TokenKind::Ne),
            just("<>").to(TokenKind::Ne),
            just(">=").to(TokenKind::Gte),
            just("<=").to(TokenKind::Lte),
            just("<<").to(TokenKind::ShiftLeft),
            just(">>").to(TokenKind::ShiftRight),
        ));

        let control = one_of("+-*/%&|~<>=(),.[]{}:;@").map(TokenKind::Control);

        let variable = just('@')
            .ignore_then(plain_ident())
            .map(TokenKind::Variable);

        let word = plain_ident()
            .map(|word| {
                let lower = word.to_lowercase();
                if KEYWORDS.contains(&lower.as_str()) {
                    TokenKind::Keyword(lower)
                } else {
                    TokenKind::Ident(word)
                }
            })
            .or(quoted_ident().map(TokenKind::Ident));

        choice((
            join_arrow(),
            control_multi,
            escaped_string(token),
            literal().map(TokenKind::Literal),
            variable,
            control,
            word,
        ))
        .map_with_span(into_token)
        .boxed()
    })
}

/// Whitespace (new lines included) and comments.
fn whitespace_or_comment() -> impl Parser<char, (), Error = LError> + Clone {
    just('\n').ignored().or(inline_whitespace_or_comment())
}

/// Whitespace up to the end of the line and comments. `\r` counts as inline,
/// so CRLF line ends still leave a `\n` for meta commands to follow.
fn inline_whitespace_or_comment() -> impl Parser<char, (), Error = LError> + Clone {
    let line_comment = just("--").then(none_of('\n').repeated()).ignored();
    let block_comment = just("/*").then(take_until(just("*/"))).ignored();

    choice((inline_whitespace(), line_comment, block_comment))
}

fn inline_whitespace() -> impl Parser<char, (), Error = LError> + Clone {
    filter(|c: &char| c.is_whitespace() && *c != '\n')
        .repeated()
        .at_least(1)
        .ignored()
}

pub(crate) fn plain_ident() -> impl Parser<char, String, Error = LError> + Clone {
    filter(|c: &char| c.is_alphabetic() || *c == '_')
        .chain::<char, Vec<_>, _>(
            filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '$').repeated(),
        )
        .collect()
}

/// A backtick-quoted name, kept with its quotes.
fn quoted_ident() -> impl Parser<char, String, Error = LError> + Clone {
    none_of('`')
        .repeated()
        .collect::<String>()
        .delimited_by(just('`'), just('`'))
        .repeated()
        .at_least(1)
        .map(|segments| format!("`{}`", segments.join("``")))
        .labelled("quoted name")
}

fn ident_part() -> impl Parser<char, String, Error = LError> + Clone {
    plain_ident().or(quoted_ident())
}

fn join_arrow() -> impl Parser<char, TokenKind, Error = LError> + Clone {
    just("-:")
        .ignore_then(ident_part())
        .then(just(':').ignore_then(ident_part()).or_not())
        .then_ignore(just(":>"))
        .map(|(left, right)| TokenKind::JoinArrow { left, right })
}

fn meta_command() -> impl Parser<char, TokenKind, Error = LError> + Clone {
    just('.')
        .ignore_then(plain_ident())
        .then(none_of('\n').repeated().collect::<String>())
        .map(|(name, args)| TokenKind::Meta {
            name,
            args: args.trim().to_string(),
        })
}

fn hex_digit() -> impl Parser<char, char, Error = LError> + Clone {
    filter(|c: &char| c.is_ascii_hexdigit())
}

fn digit() -> impl Parser<char, char, Error = LError> + Clone {
    filter(|c: &char| c.is_ascii_digit())
}

fn literal() -> impl Parser<char, Literal, Error = LError> + Clone {
    let hex_number = just('0')
        .chain(one_of("xX"))
        .chain::<char, _, _>(hex_digit().repeated().at_least(1));

    let exp = one_of("eE")
        .chain(one_of("+-").or_not())
        .chain::<char, _, _>(digit().repeated().at_least(1));

    let frac = just('.').chain::<char, _, _>(digit().repeated());

    let decimal = digit()
        .repeated()
        .at_least(1)
        .chain::<char, _, _>(frac.or_not().flatten())
        .or(just('.').chain::<char, _, _>(digit().repeated().at_least(1)))
        .chain::<char, _, _>(exp.or_not().flatten());

    let number = hex_number
        .or(decimal)
        .collect::<String>()
        .map(Literal::Number)
        .labelled("number");

    let blob = one_of("xX")
        .chain(just('\''))
        .chain::<char, _, _>(hex_digit().repeated())
        .chain::<char, _, _>(just('\''))
        .collect::<String>()
        .map(Literal::Blob)
        .labelled("blob");

    let string = none_of('\'')
        .repeated()
        .collect::<String>()
        .delimited_by(just('\''), just('\''))
        .repeated()
        .at_least(1)
        .map(|segments| Literal::String(format!("'{}'", segments.join("''"))))
        .labelled("string");

    let json = just('"')
        .chain::<char, _, _>(
            choice((
                just('\\').chain(any()),
                none_of("\"\\").map(|c| vec![c]),
            ))
            .repeated()
            .flatten(),
        )
        .chain::<char, _, _>(just('"'))
        .collect::<String>()
        .map(Literal::Json)
        .labelled("JSON string");

    choice((blob, string, json, number))
}

fn escaped_string<T>(token: T) -> impl Parser<char, TokenKind, Error = LError> + Clone
where
    T: Parser<char, Token, Error = LError> + Clone + 'static,
{
    let group = embedded_group(token);

    let unicode = just('u')
        .ignore_then(
            hex_digit()
                .repeated()
                .at_least(1)
                .delimited_by(just('{'), just('}'))
                .or(hex_digit().repeated().exactly(4)),
        )
        .or(just('x').ignore_then(hex_digit().repeated().exactly(2)))
        .collect::<String>()
        .map(EscapePart::Unicode);

    // printf conversion: flags, width, precision, then the conversion letter
    let spec = one_of("-+ 0#,!")
        .repeated()
        .chain::<char, _, _>(digit().repeated())
        .chain::<char, _, _>(
            just('.')
                .chain::<char, _, _>(digit().repeated())
                .or_not()
                .flatten(),
        )
        .chain::<char, _, _>(filter(|c: &char| c.is_ascii_alphabetic()))
        .collect::<String>();

    let escape = just('\\').ignore_then(choice((
        just('\'').to(EscapePart::Apostrophe),
        just('\\').to(EscapePart::Backslash),
        just('n').to(EscapePart::Control(10)),
        just('t').to(EscapePart::Control(9)),
        just('r').to(EscapePart::Control(13)),
        unicode,
        just('%')
            .ignore_then(spec)
            .then(group.clone())
            .map(|(spec, tokens)| EscapePart::Format { spec, tokens }),
        group.map(|tokens| EscapePart::Interpolate { tokens }),
        any().map(EscapePart::Unknown),
    )));

    let text = none_of("'\\%")
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(EscapePart::Text);

    let part = choice((
        just("''").to(EscapePart::Apostrophe),
        just('%').to(EscapePart::Percent),
        escape,
        text,
    ));

    one_of("eE")
        .ignore_then(just('\''))
        .ignore_then(part.repeated())
        .then_ignore(just('\''))
        .map(TokenKind::Escaped)
        .labelled("escaped string")
}

/// Tokens between a pair of parentheses, nested pairs included.
fn embedded_group<T>(token: T) -> impl Parser<char, Vec<Token>, Error = LError> + Clone
where
    T: Parser<char, Token, Error = LError> + Clone + 'static,
{
    let paren = |c: char| {
        just(c).map_with_span(move |_, span| Token {
            kind: TokenKind::Control(c),
            span,
        })
    };

    recursive(move |inner| {
        let nested = paren('(').chain(inner).chain(paren(')'));

        let single = token.clone().try_map(|token: Token, span| match token.kind {
            TokenKind::Control('(') | TokenKind::Control(')') => {
                Err(Simple::custom(span, "unbalanced parenthesis"))
            }
            _ => Ok(vec![token]),
        });

        nested
            .or(single)
            .padded_by(whitespace_or_comment().repeated())
            .repeated()
            .flatten()
    })
    .delimited_by(just('('), just(')'))
}
