//! Compiles [crate::pr::Expr] nodes into SQL text.
//!
//! Parentheses are only emitted where the source had them (kept as
//! [ExprKind::Tuple]) or where SQL requires them, since the parser already
//! follows SQLite's precedence.

use itertools::Itertools;

use super::gen_table::translate_table;
use super::operators::{translate_binary, translate_unary};
use crate::placeholder::{placeholder, PlaceholderKind};
use crate::pr::*;
use crate::semantic::escape::translate_escaped;
use crate::{Result, WithErrorInfo};

pub(crate) fn translate_expr(expr: &Expr) -> Result<String> {
    translate_expr_kind(&expr.kind).with_span_fallback(expr.span)
}

fn translate_expr_kind(kind: &ExprKind) -> Result<String> {
    Ok(match kind {
        ExprKind::Ident(ident) => ident.to_string(),
        ExprKind::All(None) => "*".to_string(),
        ExprKind::All(Some(table)) => format!("{table}.*"),
        ExprKind::Literal(literal) => translate_literal(literal),
        ExprKind::Escaped(items) => translate_escaped(items)?,
        ExprKind::Variable(name) => placeholder(PlaceholderKind::Variable, name)?,

        ExprKind::Unary(UnaryExpr { op, expr }) => translate_unary(*op, translate_expr(expr)?),
        ExprKind::Binary(BinaryExpr { left, op, right }) => {
            translate_binary(translate_expr(left)?, *op, translate_expr(right)?)
        }
        ExprKind::Like(LikeExpr {
            expr,
            negated,
            op,
            pattern,
            escape,
        }) => {
            let mut sql = format!(
                "{} {}{op} {}",
                translate_expr(expr)?,
                not(*negated),
                translate_expr(pattern)?
            );
            if let Some(escape) = escape {
                sql += &format!(" escape {}", translate_expr(escape)?);
            }
            sql
        }
        ExprKind::Between(BetweenExpr {
            expr,
            negated,
            low,
            high,
        }) => format!(
            "{} {}between {} and {}",
            translate_expr(expr)?,
            not(*negated),
            translate_expr(low)?,
            translate_expr(high)?
        ),
        ExprKind::InList(InListExpr {
            expr,
            negated,
            list,
        }) => format!(
            "{} {}in ({})",
            translate_expr(expr)?,
            not(*negated),
            translate_list(list)?
        ),
        ExprKind::InTable(InTableExpr {
            expr,
            negated,
            table,
        }) => format!(
            "{} {}in ({})",
            translate_expr(expr)?,
            not(*negated),
            translate_table(table)?.to_sql(true)
        ),
        ExprKind::Exists(table) => format!("exists ({})", translate_table(table)?.to_sql(true)),
        ExprKind::Subquery(table) => format!("({})", translate_table(table)?.to_sql(true)),

        ExprKind::Case(CaseExpr {
            base,
            cases,
            default,
        }) => {
            let mut sql = "case ".to_string();
            if let Some(base) = base {
                sql += &translate_expr(base)?;
                sql += " ";
            }
            for case in cases {
                sql += &format!(
                    "when {} then {} ",
                    translate_expr(&case.condition)?,
                    translate_expr(&case.value)?
                );
            }
            if let Some(default) = default {
                sql += &format!("else {} ", translate_expr(default)?);
            }
            sql + "end"
        }
        ExprKind::Cast(CastExpr { expr, ty }) => format!("cast({} as {ty})", translate_expr(expr)?),
        ExprKind::Collate(CollateExpr { expr, collation }) => {
            format!("{} collate {collation}", translate_expr(expr)?)
        }
        ExprKind::FuncCall(call) => translate_func_call(call)?,
        ExprKind::Tuple(items) => format!("({})", translate_list(items)?),
    })
}

fn not(negated: bool) -> &'static str {
    if negated {
        "not "
    } else {
        ""
    }
}

pub(crate) fn translate_list(exprs: &[Expr]) -> Result<String> {
    Ok(exprs.iter().map(translate_expr).try_collect::<_, Vec<_>, _>()?.join(", "))
}

pub(crate) fn translate_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Boolean(true) => "true".to_string(),
        Literal::Boolean(false) => "false".to_string(),
        Literal::Number(text) | Literal::String(text) | Literal::Blob(text) => text.clone(),
        // decoded by SQLite's JSON functions, so JSON escapes apply
        Literal::Json(text) => format!("('{}'->>'$')", text.replace('\'', "''")),
    }
}

pub(crate) fn translate_func_call(call: &FuncCall) -> Result<String> {
    let FuncCall {
        name,
        distinct,
        args,
        filter,
        over,
    } = call;

    let args = match args {
        FuncArgs::Star => "*".to_string(),
        FuncArgs::List(args) => translate_list(args)?,
    };
    let distinct = if *distinct { "distinct " } else { "" };
    let mut sql = format!("{name}({distinct}{args})");

    if let Some(filter) = filter {
        sql += &format!(" filter (where {})", translate_expr(filter)?);
    }
    match over {
        Some(Over::Named(window)) => sql += &format!(" over {window}"),
        Some(Over::Spec(spec)) => sql += &format!(" over ({})", translate_window_spec(spec)?),
        None => {}
    }
    Ok(sql)
}

/// The text between the parentheses of a window definition.
pub(crate) fn translate_window_spec(spec: &WindowSpec) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(base) = &spec.base {
        parts.push(base.clone());
    }
    if !spec.partition.is_empty() {
        parts.push(format!("partition by {}", translate_list(&spec.partition)?));
    }
    if !spec.order.is_empty() {
        parts.push(format!("order by {}", translate_sort_items(&spec.order)?));
    }
    if let Some(frame) = &spec.frame {
        parts.push(translate_frame(frame)?);
    }
    Ok(parts.join(" "))
}

fn translate_frame(frame: &Frame) -> Result<String> {
    let start = translate_frame_bound(&frame.start)?;
    Ok(match &frame.end {
        Some(end) => format!(
            "{} between {start} and {}",
            frame.units,
            translate_frame_bound(end)?
        ),
        None => format!("{} {start}", frame.units),
    })
}

fn translate_frame_bound(bound: &FrameBound) -> Result<String> {
    Ok(match bound {
        FrameBound::UnboundedPreceding => "unbounded preceding".to_string(),
        FrameBound::Preceding(expr) => format!("{} preceding", translate_expr(expr)?),
        FrameBound::CurrentRow => "current row".to_string(),
        FrameBound::Following(expr) => format!("{} following", translate_expr(expr)?),
        FrameBound::UnboundedFollowing => "unbounded following".to_string(),
    })
}

pub(crate) fn translate_sort_item(item: &SortItem) -> Result<String> {
    let mut sql = translate_expr(&item.expr)?;
    if let Some(direction) = item.direction {
        sql += &format!(" {direction}");
    }
    if let Some(nulls) = item.nulls {
        sql += &format!(" {nulls}");
    }
    Ok(sql)
}

pub(crate) fn translate_sort_items(items: &[SortItem]) -> Result<String> {
    Ok(items
        .iter()
        .map(translate_sort_item)
        .try_collect::<_, Vec<_>, _>()?
        .join(", "))
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;
    use crate::test::parse_expr;

    fn sql(source: &str) -> String {
        translate_expr(&parse_expr(source)).unwrap()
    }

    #[rstest]
    #[case::equality("a == 1 and b != 2", "a = 1 and b <> 2")]
    #[case::parens_kept("(a + b) * c", "(a + b) * c")]
    #[case::not("not a is not null", "not a is not null")]
    #[case::like("name not like 'a%' escape '\\'", "name not like 'a%' escape '\\'")]
    #[case::between("x between 1 and 10", "x between 1 and 10")]
    #[case::in_list("x not in (1, 2)", "x not in (1, 2)")]
    #[case::row_value("(a, b) = (1, 2)", "(a, b) = (1, 2)")]
    #[case::json_extract("j -> '$.a' ->> 'b'", "j -> '$.a' ->> 'b'")]
    #[case::compound_name("main::t.a", "main.t.a")]
    #[case::qualified_star("t.*", "t.*")]
    #[case::cast("cast(a as decimal(10, 2))", "cast(a as decimal(10, 2))")]
    #[case::collate("a collate nocase", "a collate nocase")]
    fn test_operators(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(sql(source), expected);
    }

    #[test]
    fn test_literals() {
        assert_snapshot!(sql(r#""𩸽""#), @r#"('"𩸽"'->>'$')"#);
        assert_snapshot!(sql(r#""it's""#), @r#"('"it''s"'->>'$')"#);
        assert_snapshot!(sql("x'00ff' || 1.5e3 || 'a''b'"), @"x'00ff' || 1.5e3 || 'a''b'");
        assert_snapshot!(sql("true or null"), @"true or null");
    }

    #[test]
    fn test_variable_placeholder() {
        assert_eq!(sql("@n + 1"), "\0vn\0 + 1");
    }

    #[test]
    fn test_case() {
        assert_snapshot!(
            sql("case when a > 1 then 'x' when a > 0 then 'y' else 'z' end"),
            @"case when a > 1 then 'x' when a > 0 then 'y' else 'z' end"
        );
        assert_snapshot!(sql("case a when 1 then 2 end"), @"case a when 1 then 2 end");
    }

    #[test]
    fn test_func_calls() {
        assert_snapshot!(sql("count(*)"), @"count(*)");
        assert_snapshot!(
            sql("count(distinct a) filter (where b > 0)"),
            @"count(distinct a) filter (where b > 0)"
        );
        assert_snapshot!(
            sql("sum(a) over (partition by b order by c desc nulls last rows between unbounded preceding and current row)"),
            @"sum(a) over (partition by b order by c desc nulls last rows between unbounded preceding and current row)"
        );
        assert_snapshot!(sql("row_number() over w"), @"row_number() over w");
    }

    #[test]
    fn test_subqueries() {
        assert_snapshot!(sql("(T{max(a)})"), @"(select max(a) from T)");
        assert_snapshot!(sql("exists(T[a = 1])"), @"exists (select * from T where (a = 1))");
        assert_snapshot!(sql("x in (T{a})"), @"x in (select a from T)");
    }
}
