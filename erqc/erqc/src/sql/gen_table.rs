//! Compiles [crate::pr::TableExpr] nodes into a [TableBuilder].

use itertools::Itertools;

use super::gen_expr::{
    translate_expr, translate_func_call, translate_list, translate_sort_item, translate_window_spec,
};
use super::table::{Column, JoinOn, JoinSpec, TableBuilder};
use crate::placeholder::{placeholder, PlaceholderKind};
use crate::pr::*;
use crate::{Result, WithErrorInfo};

pub(crate) fn translate_table(table: &TableExpr) -> Result<TableBuilder> {
    translate_table_kind(&table.kind).with_span_fallback(table.span)
}

fn translate_table_kind(kind: &TableExprKind) -> Result<TableBuilder> {
    Ok(match kind {
        TableExprKind::Source(source) => translate_source(source)?,
        TableExprKind::Pipeline(Pipeline { source, ops }) => {
            let mut table = translate_table(source)?;
            for op in ops {
                table = translate_op(table, op).with_span_fallback(op.span)?;
            }
            table
        }
        TableExprKind::SetOp(SetOpExpr { op, left, right }) => {
            let left = translate_table(left)?.to_sql(false);

            // a compound on the right must keep its own grouping
            let right = translate_table(right)?;
            let right = if right.is_raw() {
                format!("select * from ({})", right.to_sql(true))
            } else {
                right.to_sql(false)
            };

            TableBuilder::from_raw(format!("{left} {op} {right}"), true)
        }
        TableExprKind::With(WithExpr {
            recursive,
            ctes,
            body,
        }) => {
            let ctes: Vec<_> = ctes.iter().map(translate_cte).try_collect()?;
            let recursive = if *recursive { "recursive " } else { "" };
            let body = translate_table(body)?.to_sql(true);

            TableBuilder::from_raw(format!("with {recursive}{} {body}", ctes.join(", ")), false)
        }
    })
}

fn translate_cte(cte: &Cte) -> Result<String> {
    let mut sql = cte.name.clone();
    if !cte.columns.is_empty() {
        sql += &format!("({})", cte.columns.join(", "));
    }
    let table = translate_table(&cte.table)?;
    Ok(format!("{sql} as ({})", table.to_sql(true)))
}

fn translate_source(source: &Source) -> Result<TableBuilder> {
    let alias = source.alias.clone();

    Ok(match &source.kind {
        SourceKind::Table(ident) => {
            TableBuilder::from_source(ident.to_string(), alias, Some(ident.name.clone()))
        }
        SourceKind::Variable { schema, name } => {
            let mut sql = placeholder(PlaceholderKind::Table, name)?;
            if let Some(schema) = schema {
                sql = format!("{schema}.{sql}");
            }
            TableBuilder::from_source(sql, alias, None)
        }
        SourceKind::Dynamic(expr) => {
            let query = format!("select {}", translate_expr(expr)?);
            let sql = placeholder(PlaceholderKind::Expression, &query).with_span(expr.span)?;
            TableBuilder::from_source(sql, alias, None)
        }
        SourceKind::Function(call) => {
            let name = call.name.name.clone();
            TableBuilder::from_source(translate_func_call(call)?, alias, Some(name))
        }
        SourceKind::Values(rows) => {
            TableBuilder::from_source(format!("({})", translate_values(rows)?), alias, None)
        }
        SourceKind::Nested(table) => {
            let table = translate_table(table)?;
            match alias {
                Some(alias) => table.alias(alias),
                None => table,
            }
        }
        SourceKind::Unbound => TableBuilder::unbound(),
    })
}

/// `values (1, 2), (3, 4)`
pub(crate) fn translate_values(rows: &[Vec<Expr>]) -> Result<String> {
    let rows: Vec<_> = rows
        .iter()
        .map(|row| translate_list(row).map(|row| format!("({row})")))
        .try_collect()?;
    Ok(format!("values {}", rows.join(", ")))
}

fn translate_op(table: TableBuilder, op: &TableOp) -> Result<TableBuilder> {
    Ok(match &op.kind {
        TableOpKind::Filter(condition) => table.with_where(translate_expr(condition)?),
        TableOpKind::Project(Projection { groups, items }) => {
            let items = translate_columns(items)?;
            match groups {
                Some(groups) => table.with_group_select(translate_columns(groups)?, items),
                None => table.with_select(items),
            }
        }
        TableOpKind::Join(join) => table.with_join(translate_join(join)?)?,
        TableOpKind::Window(windows) => {
            let mut table = table;
            for window in windows {
                table = table.with_window(window.name.clone(), translate_window_spec(&window.spec)?);
            }
            table
        }
        TableOpKind::OrderBy(items) => {
            table.with_order(items.iter().map(translate_sort_item).try_collect()?)
        }
        TableOpKind::Limit { limit, offset } => {
            let offset = offset.as_ref().map(translate_expr).transpose()?;
            table.with_limit(Some(translate_expr(limit)?), offset)
        }
        TableOpKind::Offset(offset) => table.with_limit(None, Some(translate_expr(offset)?)),
        TableOpKind::Distinct => table.with_distinct(),
        TableOpKind::Alias(name) => table.alias(name.clone()),
    })
}

fn translate_columns(items: &[SelectItem]) -> Result<Vec<Column>> {
    items
        .iter()
        .map(|item| {
            Ok(Column {
                expr: translate_expr(&item.expr)?,
                alias: item.alias.clone(),
                sort: item.sort,
            })
        })
        .try_collect()
}

fn translate_join(join: &Join) -> Result<JoinSpec> {
    let constraint = match &join.constraint {
        JoinConstraint::None => JoinOn::None,
        JoinConstraint::On(condition) => JoinOn::On(translate_expr(condition)?),
        JoinConstraint::Using(columns) => JoinOn::Using(columns.clone()),
        JoinConstraint::Keys { left, right } => JoinOn::Keys {
            left: left.clone(),
            right: right.clone(),
        },
    };

    Ok(JoinSpec {
        natural: join.natural,
        kind: join.kind,
        target: translate_table(&join.target)?,
        constraint,
    })
}
