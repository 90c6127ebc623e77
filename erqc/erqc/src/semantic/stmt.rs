//! Assembles top-level statements into [Statement] descriptors.

use std::str::FromStr;

use itertools::Itertools;
use serde_json::{json, Value};

use super::value::{eval_value, unquote_string};
use crate::pr::{self, Expr, Stmt, StmtKind, TableDefinition, TableExprKind};
use crate::sql::gen_expr::{translate_expr, translate_sort_items};
use crate::sql::gen_table::{translate_table, translate_values};
use crate::sql::Column;
use crate::statement::{ChartFormat, Dest, Format, Statement, TextFormat};
use crate::{Error, Result, WithErrorInfo};

const URL_SCHEMES: &[&str] = &["http://", "https://", "s3://"];

pub(crate) fn compile_stmts(stmts: &[Stmt]) -> Result<Vec<Statement>> {
    stmts.iter().map(compile_stmt).collect()
}

fn compile_stmt(stmt: &Stmt) -> Result<Statement> {
    compile_stmt_kind(&stmt.kind).with_span_fallback(stmt.span)
}

fn compile_stmt_kind(kind: &StmtKind) -> Result<Statement> {
    Ok(match kind {
        StmtKind::Query(pr::Query { table, output }) => {
            let query = translate_table(table)?.to_sql(true);
            let (format, dest) = compile_output(output.as_ref())?;
            Statement::Select {
                query,
                format,
                dest,
            }
        }
        StmtKind::Explain(pr::Explain { query_plan, query }) => {
            let sql = translate_table(&query.table)?.to_sql(true);
            let (format, dest) = compile_output(query.output.as_ref())?;
            let (query, format) = if *query_plan {
                let format = format.or(Some(TextFormat::Eqp.into()));
                (format!("explain query plan {sql}"), format)
            } else {
                (format!("explain {sql}"), format)
            };
            Statement::Select {
                query,
                format,
                dest,
            }
        }
        StmtKind::Insert(insert) => Statement::Insert {
            query: compile_insert(insert)?,
        },
        StmtKind::Update(pr::Update {
            table,
            filter,
            assignments,
        }) => {
            let assignments: Vec<_> = assignments
                .iter()
                .map(|a| Ok::<_, Error>(format!("{} = {}", a.column, translate_expr(&a.value)?)))
                .try_collect()?;
            let mut query = format!("update {table} set {}", assignments.join(", "));
            query += &compile_where(filter.as_ref())?;
            Statement::Update { query }
        }
        StmtKind::Delete(pr::Delete { table, filter }) => Statement::Delete {
            query: format!("delete from {table}{}", compile_where(filter.as_ref())?),
        },
        StmtKind::Pragma(pr::Pragma {
            name,
            value,
            output,
        }) => {
            let mut query = format!("pragma {name}");
            match value {
                Some(pr::PragmaValue::Assign(value)) => {
                    query += &format!(" = {}", translate_expr(value)?)
                }
                Some(pr::PragmaValue::Call(value)) => {
                    query += &format!("({})", translate_expr(value)?)
                }
                None => {}
            }
            let (format, dest) = compile_output(output.as_ref())?;
            Statement::Pragma {
                query,
                format,
                dest,
            }
        }
        StmtKind::CreateTable(create) => Statement::Ddl {
            query: compile_create_table(create)?,
        },
        StmtKind::CreateView(pr::CreateView {
            temp,
            if_not_exists,
            name,
            query,
        }) => Statement::Ddl {
            query: format!(
                "create {}view {}{name} as {}",
                temp_prefix(*temp),
                if_not_exists_prefix(*if_not_exists),
                translate_table(query)?.to_sql(true)
            ),
        },
        StmtKind::CreateIndex(pr::CreateIndex {
            unique,
            if_not_exists,
            name,
            table,
            columns,
        }) => Statement::Ddl {
            query: format!(
                "create {}index {}{name} on {table} ({})",
                if *unique { "unique " } else { "" },
                if_not_exists_prefix(*if_not_exists),
                translate_sort_items(columns)?
            ),
        },
        StmtKind::Drop(pr::DropItem {
            kind,
            if_exists,
            name,
        }) => Statement::Ddl {
            query: format!(
                "drop {kind} {}{name}",
                if *if_exists { "if exists " } else { "" }
            ),
        },
        StmtKind::Meta { name, args } => compile_meta(name, args)?,
        StmtKind::Load(pr::Load {
            table,
            columns,
            source,
            format,
        }) => Statement::Command {
            command: "load".to_string(),
            args: vec![
                json!(table.to_string()),
                json!(columns),
                compile_argument(source)?,
                json!(format.unwrap_or(pr::LoadFormat::Csv).to_string()),
            ],
        },
        StmtKind::TableFromJson(pr::TableFromJson { table, source }) => Statement::Command {
            command: "table_from_json".to_string(),
            args: vec![json!(table.to_string()), compile_argument(source)?],
        },
        StmtKind::FunctionDef(pr::FunctionDef { name, params, body }) => Statement::Command {
            command: "function".to_string(),
            args: vec![json!(name), json!(params), json!(translate_expr(body)?)],
        },
        StmtKind::If(pr::IfStmt {
            condition,
            then_stmts,
            else_stmts,
        }) => Statement::If {
            condition: format!(
                "select case when {} then 1 else 0 end",
                translate_expr(condition)?
            ),
            then_statements: compile_stmts(then_stmts)?,
            else_statements: compile_stmts(else_stmts)?,
        },
        StmtKind::For(pr::ForStmt {
            assignments,
            source,
            body,
        }) => {
            let columns: Vec<_> = assignments
                .iter()
                .map(|a| -> Result<_> {
                    Ok(match &a.expr {
                        Some(expr) => Column {
                            alias: Some(a.name.clone()),
                            ..Column::new(translate_expr(expr)?)
                        },
                        None => Column::new(a.name.clone()),
                    })
                })
                .try_collect()?;

            Statement::For {
                assignments: assignments.iter().map(|a| a.name.clone()).collect(),
                source_table: translate_table(source)?.with_select(columns).to_sql(true),
                body_statements: compile_stmts(body)?,
            }
        }
    })
}

fn compile_where(filter: Option<&Expr>) -> Result<String> {
    Ok(match filter {
        Some(filter) => format!(" where {}", translate_expr(filter)?),
        None => String::new(),
    })
}

fn temp_prefix(temp: bool) -> &'static str {
    if temp {
        "temp "
    } else {
        ""
    }
}

fn if_not_exists_prefix(if_not_exists: bool) -> &'static str {
    if if_not_exists {
        "if not exists "
    } else {
        ""
    }
}

fn compile_insert(insert: &pr::Insert) -> Result<String> {
    let mut sql = "insert ".to_string();
    if let Some(conflict) = insert.conflict {
        sql += &format!("or {conflict} ");
    }
    sql += &format!("into {}", insert.table);
    if !insert.columns.is_empty() {
        sql += &format!(" ({})", insert.columns.join(", "));
    }

    // bare `values` need no select around them
    let source = match &insert.source.kind {
        TableExprKind::Source(pr::Source {
            kind: pr::SourceKind::Values(rows),
            alias: None,
        }) => translate_values(rows)?,
        _ => translate_table(&insert.source)?.to_sql(true),
    };
    Ok(format!("{sql} {source}"))
}

fn compile_create_table(create: &pr::CreateTable) -> Result<String> {
    let prefix = format!(
        "create {}table {}{}",
        temp_prefix(create.temp),
        if_not_exists_prefix(create.if_not_exists),
        create.name
    );
    Ok(match &create.definition {
        TableDefinition::As(table) => format!("{prefix} as {}", translate_table(table)?.to_sql(true)),
        TableDefinition::Columns(columns) => {
            let columns = columns
                .iter()
                .map(|c| {
                    if c.definition.is_empty() {
                        c.name.clone()
                    } else {
                        format!("{} {}", c.name, c.definition)
                    }
                })
                .join(", ");
            format!("{prefix} ({columns})")
        }
    })
}

fn compile_meta(name: &str, args: &str) -> Result<Statement> {
    let split_args = || args.split_whitespace().map(|a| json!(a)).collect_vec();

    Ok(match name {
        "load" => Statement::Command {
            command: "load_extension".to_string(),
            args: split_args(),
        },
        "format" => {
            let format = TextFormat::from_str(args.trim()).map_err(|_| {
                Error::new_semantic(format!("unknown format `{}`", args.trim()))
                    .push_hint("expected one of dense, sparse, raw or eqp")
            })?;
            Statement::Command {
                command: "format".to_string(),
                args: vec![json!(format.to_string())],
            }
        }
        _ => Statement::Command {
            command: name.to_string(),
            args: split_args(),
        },
    })
}

/// A constant is passed as is; anything else is handed over as a query for
/// the engine to evaluate.
fn compile_argument(expr: &Expr) -> Result<Value> {
    Ok(match eval_value(expr)? {
        Some(value) => value,
        None => json!({ "sql": format!("select {}", translate_expr(expr)?) }),
    })
}

fn compile_output(output: Option<&pr::Output>) -> Result<(Option<Format>, Option<Dest>)> {
    let Some(output) = output else {
        return Ok((None, None));
    };

    let format = match &output.format {
        None => None,
        Some(pr::OutputFormat::Dense) => Some(TextFormat::Dense.into()),
        Some(pr::OutputFormat::Sparse) => Some(TextFormat::Sparse.into()),
        Some(pr::OutputFormat::Raw) => Some(TextFormat::Raw.into()),
        Some(pr::OutputFormat::Eqp) => Some(TextFormat::Eqp.into()),
        Some(pr::OutputFormat::Vega { view, format }) => {
            let view = match view {
                pr::VegaView::Mark(mark) => json!({ "mark": mark }),
                pr::VegaView::Json(text) => {
                    let text = unquote_string(text);
                    serde_json::from_str(&text).map_err(|e| {
                        Error::new_semantic(format!("invalid vega view `{text}`: {e}"))
                    })?
                }
            };
            Some(Format::Chart(ChartFormat::Vega {
                view,
                format: format.clone(),
            }))
        }
    };

    let dest = match &output.dest {
        None => None,
        Some(pr::Dest::Stdout) => Some(Dest::Stdout),
        Some(pr::Dest::Stderr) => Some(Dest::Stderr),
        Some(pr::Dest::Path(text)) => {
            let path = unquote_string(text);
            if URL_SCHEMES.iter().any(|s| path.starts_with(s)) {
                Some(Dest::Url { url: path })
            } else {
                Some(Dest::File { path })
            }
        }
        Some(pr::Dest::Variable(name)) => Some(Dest::Variable { name: name.clone() }),
        Some(pr::Dest::Query(table)) => Some(Dest::Deferred {
            query: translate_table(table)?.to_sql(true),
        }),
    };

    Ok((format, dest))
}

#[cfg(test)]
mod test {
    use insta::{assert_snapshot, assert_yaml_snapshot};

    use super::*;
    use crate::test::parse_script;

    fn compile(source: &str) -> Vec<Statement> {
        compile_stmts(&parse_script(source)).unwrap()
    }

    fn queries(source: &str) -> String {
        compile(source)
            .iter()
            .flat_map(|s| s.queries().into_iter().map(str::to_string).collect_vec())
            .join("\n")
    }

    #[test]
    fn test_mutations() {
        assert_snapshot!(queries(r#"
            insert or replace into T(a, b) values [[1, 2], [3, 4]];;
            insert into T U{a, b};;
            update T[id = 1] set a = a + 1, b = null;;
            delete from T[a < 0];;
            delete from T
        "#), @r"
        insert or replace into T (a, b) values (1, 2), (3, 4)
        insert into T select a, b from U
        update T set a = a + 1, b = null where id = 1
        delete from T where a < 0
        delete from T
        ");
    }

    #[test]
    fn test_ddl() {
        assert_snapshot!(queries(r#"
            table temp if not exists t = T[a]{b};;
            table u(id integer primary key, name text not null);;
            view v = T{a};;
            index unique if not exists ix = T(a, b desc);;
            drop table if exists t
        "#), @r"
        create temp table if not exists t as select b from T where (a)
        create table u (id integer primary key, name text not null)
        create view v as select a from T
        create unique index if not exists ix on T (a, b desc)
        drop table if exists t
        ");
    }

    #[test]
    fn test_pragma_and_explain() {
        let stmts = compile("pragma table_info(T);; explain query plan T[a];; explain T output raw");
        assert_yaml_snapshot!(stmts, @r#"
        - type: pragma
          query: pragma table_info(T)
        - type: select
          query: explain query plan select * from T where (a)
          format: eqp
        - type: select
          query: explain select * from T
          format: raw
        "#);
    }

    #[test]
    fn test_output() {
        let stmts = compile(
            r#"
            T output vega bar as svg to 'out.svg';;
            T output vega '{"mark": {"type": "line"}}' to 'https://example.com/x';;
            T output sparse to @path;;
            T output to (P{name})
            "#,
        );
        assert_yaml_snapshot!(stmts, @r#"
        - type: select
          query: select * from T
          format:
            type: vega
            view:
              mark: bar
            format: svg
          dest:
            type: file
            path: out.svg
        - type: select
          query: select * from T
          format:
            type: vega
            view:
              mark:
                type: line
            format: ~
          dest:
            type: url
            url: "https://example.com/x"
        - type: select
          query: select * from T
          format: sparse
          dest:
            type: variable
            name: path
        - type: select
          query: select * from T
          dest:
            type: deferred
            query: select name from P
        "#);
    }

    #[test]
    fn test_invalid_vega_view() {
        let err = compile_stmts(&parse_script("T output vega '{mark'")).unwrap_err();
        assert!(err.reason.to_string().starts_with("invalid vega view"));
        assert!(err.span.is_some());
    }

    #[test]
    fn test_commands() {
        let stmts = compile(
            r#"
.load ext entry
.format sparse
.headers on
load T(a, b) from 'data.csv';;
load U from 'data' || '.json' as ndjson;;
table V from json '[1, 2]';;
function add(a, b) = a + b
            "#,
        );
        assert_yaml_snapshot!(stmts, @r#"
        - type: command
          command: load_extension
          args:
            - ext
            - entry
        - type: command
          command: format
          args:
            - sparse
        - type: command
          command: headers
          args:
            - "on"
        - type: command
          command: load
          args:
            - T
            - - a
              - b
            - data.csv
            - csv
        - type: command
          command: load
          args:
            - U
            - []
            - sql: "select 'data' || '.json'"
            - ndjson
        - type: command
          command: table_from_json
          args:
            - V
            - "[1, 2]"
        - type: command
          command: function
          args:
            - add
            - - a
              - b
            - a + b
        "#);
    }

    #[test]
    fn test_unknown_format() {
        let err = compile_stmts(&parse_script(".format fancy\n")).unwrap_err();
        assert_eq!(err.reason.to_string(), "unknown format `fancy`");
    }

    #[test]
    fn test_control() {
        let stmts = compile(
            r#"
            for a, b = x * 2 in T[x > 0] do
                U[id = @a]{@b as v};;
                if @b > 1 then delete from U[id = @a] else V end;;
            end
            "#,
        );
        assert_eq!(stmts.len(), 1);
        let Statement::For {
            assignments,
            source_table,
            body_statements,
        } = &stmts[0]
        else {
            panic!("expected a for statement")
        };
        assert_eq!(assignments, &["a", "b"]);
        assert_eq!(source_table, "select a, x * 2 as b from T where (x > 0)");
        assert_eq!(body_statements.len(), 2);
        let Statement::If {
            condition,
            then_statements,
            else_statements,
        } = &body_statements[1]
        else {
            panic!("expected an if statement")
        };
        assert_eq!(condition, "select case when \0vb\0 > 1 then 1 else 0 end");
        assert!(then_statements[0].is_delete());
        assert!(else_statements[0].is_select());
    }
}
