use chumsky::prelude::*;

use super::common::{ctrl, ident, ident_part, keyword, sequence, word};
use super::pr::*;
use super::{parse_embedded, PError, Rec};
use crate::lexer::lr::{self, EscapePart, TokenKind};
use crate::span::Span;

type BoxedExpr = BoxedParser<'static, TokenKind, Expr, PError>;

pub(crate) fn expr(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedExpr {
    let relational = relational(expr.clone(), table.clone());

    let equality = equality(relational, table);

    let not = keyword("not")
        .map_with_span(|_, span: Span| span)
        .repeated()
        .then(equality)
        .foldr(|op_span, expr| {
            let span = merge_spans(Some(op_span), expr.span);
            into_expr(
                ExprKind::Unary(UnaryExpr {
                    op: UnOp::Not,
                    expr: Box::new(expr),
                }),
                span,
            )
        })
        .boxed();

    let and = binary_op_parser(not, keyword("and").to(BinOp::And));

    binary_op_parser(and, keyword("or").to(BinOp::Or))
        .labelled("expression")
        .boxed()
}

/// Everything binding tighter than the equality operators. Used where an
/// operand must not swallow a following `and` or `in`.
pub(crate) fn relational(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedExpr {
    let term = term(expr, table);

    let unary = choice((
        ctrl('-').to(UnOp::Neg),
        ctrl('+').to(UnOp::Plus),
        ctrl('~').to(UnOp::BitNot),
    ))
    .map_with_span(|op, span: Span| (op, span))
    .repeated()
    .then(term)
    .foldr(|(op, op_span), expr| {
        let span = merge_spans(Some(op_span), expr.span);
        into_expr(
            ExprKind::Unary(UnaryExpr {
                op,
                expr: Box::new(expr),
            }),
            span,
        )
    })
    .boxed();

    let collate = unary
        .then(
            keyword("collate")
                .ignore_then(ident_part())
                .map_with_span(|c, span: Span| (c, span))
                .repeated(),
        )
        .foldl(|expr, (collation, span)| {
            let span = merge_spans(expr.span, Some(span));
            into_expr(
                ExprKind::Collate(CollateExpr {
                    expr: Box::new(expr),
                    collation,
                }),
                span,
            )
        })
        .boxed();

    let concat = binary_op_parser(
        collate,
        choice((
            just(TokenKind::Concat).to(BinOp::Concat),
            just(TokenKind::ArrowDouble).to(BinOp::ExtractText),
            just(TokenKind::ArrowThin).to(BinOp::Extract),
        )),
    );

    let factor = binary_op_parser(
        concat,
        choice((
            ctrl('*').to(BinOp::Mul),
            ctrl('/').to(BinOp::Div),
            ctrl('%').to(BinOp::Mod),
        )),
    );

    let sum = binary_op_parser(
        factor,
        choice((ctrl('+').to(BinOp::Add), ctrl('-').to(BinOp::Sub))),
    );

    let bitwise = binary_op_parser(
        sum,
        choice((
            ctrl('&').to(BinOp::BitAnd),
            ctrl('|').to(BinOp::BitOr),
            just(TokenKind::ShiftLeft).to(BinOp::ShiftLeft),
            just(TokenKind::ShiftRight).to(BinOp::ShiftRight),
        )),
    );

    binary_op_parser(
        bitwise,
        choice((
            just(TokenKind::Lte).to(BinOp::Lte),
            just(TokenKind::Gte).to(BinOp::Gte),
            ctrl('<').to(BinOp::Lt),
            ctrl('>').to(BinOp::Gt),
        )),
    )
}

/// Suffixes of the equality level, each applied to the expression before it.
#[derive(Clone)]
enum EqualitySuffix {
    Binary(BinOp, Expr),
    Like {
        negated: bool,
        op: LikeOp,
        pattern: Expr,
        escape: Option<Expr>,
    },
    Between {
        negated: bool,
        low: Expr,
        high: Expr,
    },
    InList {
        negated: bool,
        list: Vec<Expr>,
    },
    InTable {
        negated: bool,
        table: TableExpr,
    },
}

fn equality(relational: BoxedExpr, table: Rec<TableExpr>) -> BoxedExpr {
    let negated = keyword("not").or_not().map(|n| n.is_some());

    let op = choice((
        ctrl('=').to(BinOp::Eq),
        just(TokenKind::Eq).to(BinOp::Eq),
        just(TokenKind::Ne).to(BinOp::Ne),
        keyword("is")
            .ignore_then(keyword("not"))
            .ignore_then(keyword("distinct"))
            .ignore_then(keyword("from"))
            .to(BinOp::IsNotDistinctFrom),
        keyword("is")
            .ignore_then(keyword("distinct"))
            .ignore_then(keyword("from"))
            .to(BinOp::IsDistinctFrom),
        keyword("is")
            .ignore_then(keyword("not"))
            .to(BinOp::IsNot),
        keyword("is").to(BinOp::Is),
    ));
    let binary = op
        .then(relational.clone())
        .map(|(op, right)| EqualitySuffix::Binary(op, right));

    let like_op = choice((
        keyword("like").to(LikeOp::Like),
        keyword("glob").to(LikeOp::Glob),
        keyword("regexp").to(LikeOp::Regexp),
        keyword("match").to(LikeOp::Match),
    ));
    let like = negated
        .clone()
        .then(like_op)
        .then(relational.clone())
        .then(keyword("escape").ignore_then(relational.clone()).or_not())
        .map(|(((negated, op), pattern), escape)| EqualitySuffix::Like {
            negated,
            op,
            pattern,
            escape,
        });

    let between = negated
        .clone()
        .then_ignore(keyword("between"))
        .then(relational.clone())
        .then_ignore(keyword("and"))
        .then(relational.clone())
        .map(|((negated, low), high)| EqualitySuffix::Between { negated, low, high });

    // a list of values is tried first, so `x in (y)` stays scalar
    let in_list = negated
        .clone()
        .then_ignore(keyword("in"))
        .then(sequence(relational.clone()).delimited_by(ctrl('('), ctrl(')')))
        .map(|(negated, list)| EqualitySuffix::InList { negated, list });

    let in_table = negated
        .then_ignore(keyword("in"))
        .then(table)
        .map(|(negated, table)| EqualitySuffix::InTable { negated, table });

    relational
        .then(
            choice((binary, like, between, in_list, in_table))
                .map_with_span(|suffix, span: Span| (suffix, span))
                .repeated(),
        )
        .foldl(|left, (suffix, span)| {
            let span = merge_spans(left.span, Some(span));
            let left = Box::new(left);
            let kind = match suffix {
                EqualitySuffix::Binary(op, right) => ExprKind::Binary(BinaryExpr {
                    left,
                    op,
                    right: Box::new(right),
                }),
                EqualitySuffix::Like {
                    negated,
                    op,
                    pattern,
                    escape,
                } => ExprKind::Like(LikeExpr {
                    expr: left,
                    negated,
                    op,
                    pattern: Box::new(pattern),
                    escape: escape.map(Box::new),
                }),
                EqualitySuffix::Between { negated, low, high } => {
                    ExprKind::Between(BetweenExpr {
                        expr: left,
                        negated,
                        low: Box::new(low),
                        high: Box::new(high),
                    })
                }
                EqualitySuffix::InList { negated, list } => ExprKind::InList(InListExpr {
                    expr: left,
                    negated,
                    list,
                }),
                EqualitySuffix::InTable { negated, table } => ExprKind::InTable(InTableExpr {
                    expr: left,
                    negated,
                    table: Box::new(table),
                }),
            };
            into_expr(kind, span)
        })
        .boxed()
}

fn term(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedExpr {
    let literal = literal().map(ExprKind::Literal);

    let escaped = {
        let expr = expr.clone();
        select! { TokenKind::Escaped(parts) => parts }
            .try_map(move |parts, span| escape_items(&expr, parts, span))
            .map(ExprKind::Escaped)
            .labelled("escaped string")
    };

    let variable = select! { TokenKind::Variable(name) => name }.map(ExprKind::Variable);

    let case = keyword("case")
        .ignore_then(expr.clone().or_not())
        .then(
            keyword("when")
                .ignore_then(expr.clone())
                .then_ignore(keyword("then"))
                .then(expr.clone())
                .map(|(condition, value)| SwitchCase { condition, value })
                .repeated()
                .at_least(1),
        )
        .then(keyword("else").ignore_then(expr.clone()).or_not())
        .then_ignore(keyword("end"))
        .map(|((base, cases), default)| {
            ExprKind::Case(CaseExpr {
                base: base.map(Box::new),
                cases,
                default: default.map(Box::new),
            })
        })
        .labelled("case");

    let cast = word("cast")
        .ignore_then(
            expr.clone()
                .then_ignore(keyword("as"))
                .then(type_name())
                .delimited_by(ctrl('('), ctrl(')')),
        )
        .map(|(expr, ty)| {
            ExprKind::Cast(CastExpr {
                expr: Box::new(expr),
                ty,
            })
        })
        .labelled("cast");

    let exists = word("exists")
        .ignore_then(table.clone().delimited_by(ctrl('('), ctrl(')')))
        .map(|t| ExprKind::Exists(Box::new(t)));

    let func_call = func_call(expr.clone()).map(ExprKind::FuncCall);

    let qualified_star = ident()
        .then_ignore(ctrl('.'))
        .then_ignore(ctrl('*'))
        .map(|i| ExprKind::All(Some(i)));

    let name = ident().map(ExprKind::Ident);

    let tuple = sequence(expr.clone())
        .delimited_by(ctrl('('), ctrl(')'))
        .try_map(|items, span| {
            if items.is_empty() {
                Err(PError::custom(span, "expected an expression"))
            } else {
                Ok(ExprKind::Tuple(items))
            }
        });

    let subquery = table
        .delimited_by(ctrl('('), ctrl(')'))
        .map(|t| ExprKind::Subquery(Box::new(t)));

    choice((
        literal,
        escaped,
        variable,
        case,
        cast,
        exists,
        func_call,
        qualified_star,
        name,
        tuple,
        subquery,
    ))
    .map_with_span(into_expr)
    .boxed()
}

pub(crate) fn literal() -> impl Parser<TokenKind, Literal, Error = PError> + Clone {
    select! {
        TokenKind::Literal(lr::Literal::Number(n)) => Literal::Number(n),
        TokenKind::Literal(lr::Literal::String(s)) => Literal::String(s),
        TokenKind::Literal(lr::Literal::Json(s)) => Literal::Json(s),
        TokenKind::Literal(lr::Literal::Blob(s)) => Literal::Blob(s),
        TokenKind::Keyword(k) if k == "null" => Literal::Null,
        TokenKind::Keyword(k) if k == "true" => Literal::Boolean(true),
        TokenKind::Keyword(k) if k == "false" => Literal::Boolean(false),
    }
    .labelled("literal")
}

/// `varchar`, `unsigned big int`, `decimal(10, 2)`
fn type_name() -> impl Parser<TokenKind, String, Error = PError> + Clone {
    let number = select! { TokenKind::Literal(lr::Literal::Number(n)) => n };

    ident_part()
        .repeated()
        .at_least(1)
        .then(
            number
                .separated_by(ctrl(','))
                .at_least(1)
                .delimited_by(ctrl('('), ctrl(')'))
                .or_not(),
        )
        .map(|(words, size)| {
            let mut ty = words.join(" ");
            if let Some(size) = size {
                ty += &format!("({})", size.join(", "));
            }
            ty
        })
        .labelled("type name")
}

pub(crate) fn func_call(expr: Rec<Expr>) -> impl Parser<TokenKind, FuncCall, Error = PError> + Clone {
    let args = keyword("distinct")
        .or_not()
        .then(choice((
            ctrl('*').to(FuncArgs::Star),
            sequence(expr.clone()).map(FuncArgs::List),
        )))
        .delimited_by(ctrl('('), ctrl(')'));

    let filter = word("filter").ignore_then(
        keyword("where")
            .ignore_then(expr.clone())
            .delimited_by(ctrl('('), ctrl(')')),
    );

    let over = word("over").ignore_then(choice((
        window_spec(expr.clone())
            .delimited_by(ctrl('('), ctrl(')'))
            .map(Over::Spec),
        ident_part().map(Over::Named),
    )));

    ident()
        .then(args)
        .then(filter.or_not())
        .then(over.or_not())
        .map(|(((name, (distinct, args)), filter), over)| FuncCall {
            name,
            distinct: distinct.is_some(),
            args,
            filter: filter.map(Box::new),
            over,
        })
        .labelled("function call")
}

pub(crate) fn window_spec(
    expr: Rec<Expr>,
) -> impl Parser<TokenKind, WindowSpec, Error = PError> + Clone {
    let base = ident_part().try_map(|name, span| {
        if ["partition", "rows", "range", "groups"].contains(&name.to_lowercase().as_str()) {
            Err(PError::custom(span, "expected a window name"))
        } else {
            Ok(name)
        }
    });

    let partition = word("partition")
        .ignore_then(keyword("by"))
        .ignore_then(expr.clone().separated_by(ctrl(',')).at_least(1));

    let order = keyword("order")
        .ignore_then(keyword("by"))
        .ignore_then(sort_item(expr.clone()).separated_by(ctrl(',')).at_least(1));

    let units = choice((
        word("rows").to(FrameUnits::Rows),
        word("range").to(FrameUnits::Range),
        word("groups").to(FrameUnits::Groups),
    ));

    let bound = choice((
        word("unbounded")
            .ignore_then(word("preceding"))
            .to(FrameBound::UnboundedPreceding),
        word("unbounded")
            .ignore_then(word("following"))
            .to(FrameBound::UnboundedFollowing),
        word("current")
            .ignore_then(word("row"))
            .to(FrameBound::CurrentRow),
        expr.clone()
            .then_ignore(word("preceding"))
            .map(|e| FrameBound::Preceding(Box::new(e))),
        expr.then_ignore(word("following"))
            .map(|e| FrameBound::Following(Box::new(e))),
    ));

    let frame = units
        .then(choice((
            keyword("between")
                .ignore_then(bound.clone())
                .then_ignore(keyword("and"))
                .then(bound.clone())
                .map(|(start, end)| (start, Some(end))),
            bound.map(|start| (start, None)),
        )))
        .map(|(units, (start, end))| Frame { units, start, end });

    base.or_not()
        .then(partition.or_not())
        .then(order.or_not())
        .then(frame.or_not())
        .map(|(((base, partition), order), frame)| WindowSpec {
            base,
            partition: partition.unwrap_or_default(),
            order: order.unwrap_or_default(),
            frame,
        })
        .labelled("window")
}

pub(crate) fn sort_item(expr: Rec<Expr>) -> impl Parser<TokenKind, SortItem, Error = PError> + Clone {
    let nulls = word("nulls").ignore_then(choice((
        word("first").to(NullsOrder::First),
        word("last").to(NullsOrder::Last),
    )));

    expr.then(sort_direction().or_not())
        .then(nulls.or_not())
        .map(|((expr, direction), nulls)| SortItem {
            expr,
            direction,
            nulls,
        })
}

pub(crate) fn sort_direction() -> impl Parser<TokenKind, SortDirection, Error = PError> + Clone {
    keyword("asc")
        .to(SortDirection::Asc)
        .or(keyword("desc").to(SortDirection::Desc))
}

fn escape_items(expr: &Rec<Expr>, parts: Vec<EscapePart>, span: Span) -> Result<Vec<EscapeItem>, PError> {
    parts
        .into_iter()
        .map(|part| {
            Ok(match part {
                EscapePart::Text(text) => EscapeItem::Text(text),
                EscapePart::Apostrophe => EscapeItem::Apostrophe,
                EscapePart::Percent => EscapeItem::Percent,
                EscapePart::Backslash => EscapeItem::Backslash,
                EscapePart::Control(code) => EscapeItem::Control(code),
                EscapePart::Unicode(hex) => EscapeItem::Unicode(hex),
                EscapePart::Format { spec, tokens } => EscapeItem::Format {
                    spec,
                    expr: Box::new(parse_embedded(expr, tokens, span)?),
                },
                EscapePart::Interpolate { tokens } => {
                    EscapeItem::Interpolate(Box::new(parse_embedded(expr, tokens, span)?))
                }
                EscapePart::Unknown(c) => EscapeItem::Unknown(c),
            })
        })
        .collect()
}

fn binary_op_parser<Op>(term: BoxedExpr, op: Op) -> BoxedExpr
where
    Op: Parser<TokenKind, BinOp, Error = PError> + Clone + 'static,
{
    term.clone()
        .then(op.then(term).repeated())
        .foldl(|left, (op, right)| {
            let span = merge_spans(left.span, right.span);
            into_expr(
                ExprKind::Binary(BinaryExpr {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                }),
                span,
            )
        })
        .boxed()
}

fn into_expr(kind: ExprKind, span: Span) -> Expr {
    Expr {
        kind,
        span: Some(span),
    }
}

fn merge_spans(a: Option<Span>, b: Option<Span>) -> Span {
    Span::merge_opt(a, b).unwrap_or_default()
}
