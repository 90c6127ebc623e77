use chumsky::prelude::*;

use super::common::{ctrl, ident, ident_part, keyword, name_list, sequence, word};
use super::expr::{func_call, sort_direction, sort_item, window_spec};
use super::pr::*;
use super::{PError, Rec};
use crate::lexer::lr::TokenKind;
use crate::span::Span;

type BoxedTable = BoxedParser<'static, TokenKind, TableExpr, PError>;

pub(crate) fn table_expr(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedTable {
    let cte = ident_part()
        .then(name_list().or_not())
        .then_ignore(keyword("as"))
        .then(table.clone().delimited_by(ctrl('('), ctrl(')')))
        .map(|((name, columns), table)| Cte {
            name,
            columns: columns.unwrap_or_default(),
            table,
        })
        .labelled("common table expression");

    let with = keyword("with")
        .ignore_then(word("recursive").or_not())
        .then(cte.separated_by(ctrl(',')).at_least(1))
        .then(table.clone())
        .map(|((recursive, ctes), body)| {
            TableExprKind::With(WithExpr {
                recursive: recursive.is_some(),
                ctes,
                body: Box::new(body),
            })
        })
        .map_with_span(TableExprKind::into_table_expr);

    let set_op = choice((
        ctrl(';').to(SetOp::UnionAll),
        keyword("union")
            .ignore_then(keyword("all"))
            .to(SetOp::UnionAll),
        keyword("union").to(SetOp::Union),
        keyword("except").to(SetOp::Except),
        keyword("intersect").to(SetOp::Intersect),
    ));

    let pipeline = pipeline(expr, table);
    let set_expr = pipeline
        .clone()
        .then(set_op.then(pipeline).repeated())
        .foldl(|left, (op, right)| {
            let span = Span::merge_opt(left.span, right.span);
            TableExpr {
                kind: TableExprKind::SetOp(SetOpExpr {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }),
                span,
            }
        });

    with.or(set_expr).labelled("table expression").boxed()
}

/// A source followed by postfix operations.
fn pipeline(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedTable {
    let source = source(expr.clone(), table.clone());
    let op = table_op(expr.clone(), table.clone());

    // `select items [from source]`, with filters and joins in the `from`
    // part applying before the projection
    let from_part = source
        .clone()
        .then(choice((filter(expr.clone()), join(expr.clone(), table))).repeated());
    let select = keyword("select")
        .ignore_then(keyword("distinct").or_not())
        .then(select_items(expr.clone()).map_with_span(|items, span: Span| (items, span)))
        .then(keyword("from").ignore_then(from_part).or_not())
        .map(|((distinct, (items, items_span)), from)| {
            let (source, mut ops) = from.unwrap_or_else(|| (unbound(), Vec::new()));
            ops.push(TableOpKind::Project(Projection { groups: None, items }).into_op(items_span));
            if distinct.is_some() {
                ops.push(TableOpKind::Distinct.into_op(items_span));
            }
            (source, ops)
        })
        .labelled("select");

    let unbound_projection = projection(expr)
        .map_with_span(|p, span: Span| (unbound(), vec![TableOpKind::Project(p).into_op(span)]));

    choice((
        select,
        unbound_projection,
        source.map(|source| (source, Vec::new())),
    ))
    .then(op.repeated())
    .map_with_span(|((source, mut ops), more), span: Span| {
        ops.extend(more);
        if ops.is_empty() {
            source
        } else {
            TableExprKind::Pipeline(Pipeline {
                source: Box::new(source),
                ops,
            })
            .into_table_expr(span)
        }
    })
    .boxed()
}

fn unbound() -> TableExpr {
    TableExpr::new(Source {
        kind: SourceKind::Unbound,
        alias: None,
    })
}

pub(crate) fn source(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedTable {
    let nested = table
        .delimited_by(ctrl('('), ctrl(')'))
        .map(|t| SourceKind::Nested(Box::new(t)));

    let values = keyword("values")
        .ignore_then(
            sequence(expr.clone())
                .delimited_by(ctrl('['), ctrl(']'))
                .separated_by(ctrl(','))
                .at_least(1)
                .allow_trailing()
                .delimited_by(ctrl('['), ctrl(']')),
        )
        .map(SourceKind::Values)
        .labelled("values");

    let dynamic = ctrl('@')
        .ignore_then(expr.clone().delimited_by(ctrl('('), ctrl(')')))
        .map(|e| SourceKind::Dynamic(Box::new(e)));

    let variable = ident()
        .then_ignore(ctrl('.'))
        .or_not()
        .then(select! { TokenKind::Variable(name) => name })
        .map(|(schema, name)| SourceKind::Variable { schema, name });

    let function = func_call(expr).map(SourceKind::Function);

    let named = ident().map(SourceKind::Table);

    let alias = keyword("as").ignore_then(ident_part());

    choice((nested, values, dynamic, variable, function, named))
        .then(alias.or_not())
        .map_with_span(|(kind, alias), span: Span| {
            TableExprKind::Source(Source { kind, alias }).into_table_expr(span)
        })
        .labelled("table")
        .boxed()
}

fn table_op(expr: Rec<Expr>, table: Rec<TableExpr>) -> BoxedParser<'static, TokenKind, TableOp, PError> {
    let project = projection(expr.clone()).map(TableOpKind::Project);

    let window = word("window")
        .ignore_then(
            ident_part()
                .then_ignore(keyword("as"))
                .then(window_spec(expr.clone()).delimited_by(ctrl('('), ctrl(')')))
                .map(|(name, spec)| NamedWindow { name, spec })
                .separated_by(ctrl(','))
                .at_least(1),
        )
        .map(TableOpKind::Window);

    let order_by = keyword("order")
        .ignore_then(keyword("by"))
        .ignore_then(sort_item(expr.clone()).separated_by(ctrl(',')).at_least(1))
        .map(TableOpKind::OrderBy);

    let limit = keyword("limit")
        .ignore_then(expr.clone())
        .then(keyword("offset").ignore_then(expr.clone()).or_not())
        .map(|(limit, offset)| TableOpKind::Limit { limit, offset });

    let offset = keyword("offset")
        .ignore_then(expr.clone())
        .map(TableOpKind::Offset);

    let distinct = keyword("distinct").to(TableOpKind::Distinct);

    let alias = keyword("as")
        .ignore_then(ident_part())
        .map(TableOpKind::Alias);

    choice((
        filter(expr.clone()),
        join(expr, table),
        project.map_with_span(TableOpKind::into_op),
        window.map_with_span(TableOpKind::into_op),
        order_by.map_with_span(TableOpKind::into_op),
        limit.map_with_span(TableOpKind::into_op),
        offset.map_with_span(TableOpKind::into_op),
        distinct.map_with_span(TableOpKind::into_op),
        alias.map_with_span(TableOpKind::into_op),
    ))
    .boxed()
}

fn filter(expr: Rec<Expr>) -> impl Parser<TokenKind, TableOp, Error = PError> + Clone {
    expr.delimited_by(ctrl('['), ctrl(']'))
        .map(TableOpKind::Filter)
        .map_with_span(TableOpKind::into_op)
        .labelled("filter")
}

fn join(expr: Rec<Expr>, table: Rec<TableExpr>) -> impl Parser<TokenKind, TableOp, Error = PError> + Clone {
    let direction = choice((
        keyword("left").to(JoinKind::Left),
        keyword("right").to(JoinKind::Right),
        keyword("full").to(JoinKind::Full),
    ));

    let sugar = direction
        .clone()
        .or_not()
        .then(select! { TokenKind::JoinArrow { left, right } => (left, right) })
        .then(source(expr.clone(), table.clone()))
        .map(|((kind, (left, right)), target)| Join {
            natural: false,
            kind,
            target: Box::new(target),
            constraint: JoinConstraint::Keys { left, right },
        });

    let kind = choice((
        direction.then_ignore(word("outer").or_not()),
        keyword("inner").to(JoinKind::Inner),
        keyword("cross").to(JoinKind::Cross),
    ));

    let constraint = choice((
        keyword("on").ignore_then(expr.clone()).map(JoinConstraint::On),
        keyword("using")
            .ignore_then(name_list())
            .map(JoinConstraint::Using),
    ));

    let explicit = keyword("natural")
        .or_not()
        .then(kind.or_not())
        .then_ignore(keyword("join"))
        .then(source(expr, table))
        .then(constraint.or_not())
        .map(|(((natural, kind), target), constraint)| Join {
            natural: natural.is_some(),
            kind,
            target: Box::new(target),
            constraint: constraint.unwrap_or(JoinConstraint::None),
        });

    sugar
        .or(explicit)
        .map(TableOpKind::Join)
        .map_with_span(TableOpKind::into_op)
        .labelled("join")
}

fn projection(expr: Rec<Expr>) -> impl Parser<TokenKind, Projection, Error = PError> + Clone {
    select_items(expr.clone())
        .then(
            just(TokenKind::ArrowFat)
                .ignore_then(select_items(expr))
                .or_not(),
        )
        .delimited_by(ctrl('{'), ctrl('}'))
        .map(|(first, rest)| match rest {
            Some(items) => Projection {
                groups: Some(first),
                items,
            },
            None => Projection {
                groups: None,
                items: first,
            },
        })
        .labelled("projection")
}

pub(crate) fn select_items(
    expr: Rec<Expr>,
) -> impl Parser<TokenKind, Vec<SelectItem>, Error = PError> + Clone {
    let star = ctrl('*')
        .map_with_span(|_, span: Span| Expr {
            kind: ExprKind::All(None),
            span: Some(span),
        })
        .map(|expr| SelectItem {
            expr,
            alias: None,
            sort: None,
        });

    let prefixed_alias = ident_part()
        .then_ignore(ctrl(':'))
        .then(expr.clone())
        .then(sort_direction().or_not())
        .map(|((alias, expr), sort)| SelectItem {
            expr,
            alias: Some(alias),
            sort,
        });

    let aliased = expr
        .then(keyword("as").ignore_then(ident_part()).or_not())
        .then(sort_direction().or_not())
        .map(|((expr, alias), sort)| SelectItem { expr, alias, sort });

    sequence(choice((star, prefixed_alias, aliased)))
}
