use chumsky::prelude::*;

use super::common::{ctrl, ident, ident_part, into_stmt, keyword, name_list, terminator, word};
use super::expr::{relational, sort_item};
use super::pr::*;
use super::{expr_and_table, PError, Rec, Rule};
use crate::lexer::lr::{self, TokenKind};

type BoxedStmts = BoxedParser<'static, TokenKind, Vec<Stmt>, PError>;

/// The parser for a whole input under the given start rule.
pub(crate) fn source(rule: Rule) -> BoxedStmts {
    let stmt = stmt();
    let item = item(stmt.clone());

    match rule {
        Rule::Script => item
            .repeated()
            .then(stmt.or_not())
            .map(|(items, last)| items.into_iter().flatten().chain(last).collect())
            .then_ignore(end())
            .boxed(),
        Rule::Statement => meta()
            .map_with_span(into_stmt)
            .or(stmt.then_ignore(terminator().or_not()))
            .map(|stmt| vec![stmt])
            .then_ignore(end())
            .boxed(),
        Rule::ReplLine => item
            .repeated()
            .map(|items| items.into_iter().flatten().collect())
            .then_ignore(end())
            .boxed(),
    }
}

/// A meta command, an empty statement, or a terminated statement.
fn item<S>(stmt: S) -> impl Parser<TokenKind, Option<Stmt>, Error = PError> + Clone
where
    S: Parser<TokenKind, Stmt, Error = PError> + Clone,
{
    choice((
        meta().map_with_span(into_stmt).map(Some),
        terminator().to(None),
        stmt.then_ignore(terminator()).map(Some),
    ))
}

fn meta() -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    select! { TokenKind::Meta { name, args } => StmtKind::Meta { name, args } }
}

fn stmt() -> Rec<Stmt> {
    let (expr, table) = expr_and_table();

    recursive(move |stmt| {
        // blocks take the same statement list as a script
        let block = item(stmt.clone())
            .repeated()
            .then(stmt.or_not())
            .map(|(items, last)| items.into_iter().flatten().chain(last).collect::<Vec<_>>());

        choice((
            if_stmt(expr.clone(), block.clone()),
            for_stmt(expr.clone(), table.clone(), block),
            explain(table.clone()),
            insert(table.clone()),
            update(expr.clone()),
            delete(expr.clone()),
            pragma(expr.clone(), table.clone()),
            create_table(table.clone()),
            table_from_json(expr.clone()),
            create_view(table.clone()),
            create_index(expr.clone()),
            drop_stmt(),
            load(expr.clone()),
            function_def(expr.clone()),
            query(table.clone()).map(StmtKind::Query),
        ))
        .map_with_span(into_stmt)
        .labelled("statement")
        .boxed()
    })
}

fn if_stmt<B>(expr: Rec<Expr>, block: B) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone
where
    B: Parser<TokenKind, Vec<Stmt>, Error = PError> + Clone,
{
    keyword("if")
        .ignore_then(expr)
        .then_ignore(keyword("then"))
        .then(block.clone())
        .then(keyword("else").ignore_then(block).or_not())
        .then_ignore(keyword("end"))
        .map(|((condition, then_stmts), else_stmts)| {
            StmtKind::If(IfStmt {
                condition,
                then_stmts,
                else_stmts: else_stmts.unwrap_or_default(),
            })
        })
        .labelled("if")
}

fn for_stmt<B>(
    expr: Rec<Expr>,
    table: Rec<TableExpr>,
    block: B,
) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone
where
    B: Parser<TokenKind, Vec<Stmt>, Error = PError> + Clone,
{
    // values stop short of `in`, which introduces the source
    let assignment = ident_part()
        .then(
            ctrl('=')
                .ignore_then(relational(expr, table.clone()))
                .or_not(),
        )
        .map(|(name, expr)| ForAssignment { name, expr });

    keyword("for")
        .ignore_then(assignment.separated_by(ctrl(',')).at_least(1))
        .then_ignore(keyword("in"))
        .then(table)
        .then_ignore(keyword("do"))
        .then(block)
        .then_ignore(keyword("end"))
        .map(|((assignments, source), body)| {
            StmtKind::For(ForStmt {
                assignments,
                source,
                body,
            })
        })
        .labelled("for")
}

fn query(table: Rec<TableExpr>) -> impl Parser<TokenKind, Query, Error = PError> + Clone {
    table
        .clone()
        .then(output(table).or_not())
        .map(|(table, output)| Query { table, output })
}

fn explain(table: Rec<TableExpr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    word("explain")
        .ignore_then(word("query").then(word("plan")).or_not())
        .then(query(table))
        .map(|(plan, query)| {
            StmtKind::Explain(Explain {
                query_plan: plan.is_some(),
                query,
            })
        })
        .labelled("explain")
}

fn insert(table: Rec<TableExpr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let conflict = keyword("or").ignore_then(choice((
        word("replace").to(ConflictResolution::Replace),
        word("ignore").to(ConflictResolution::Ignore),
    )));

    // `T (a, b) source` is tried before `T source`, where the source itself
    // may start with a parenthesis
    let target = choice((
        ident().then(name_list()).then(table.clone()),
        ident()
            .then(table)
            .map(|(name, source)| ((name, Vec::new()), source)),
    ));

    word("insert")
        .ignore_then(conflict.or_not())
        .then_ignore(word("into"))
        .then(target)
        .map(|(conflict, ((table, columns), source))| {
            StmtKind::Insert(Insert {
                conflict,
                table,
                columns,
                source,
            })
        })
        .labelled("insert")
}

fn row_filter(expr: Rec<Expr>) -> impl Parser<TokenKind, Expr, Error = PError> + Clone {
    expr.delimited_by(ctrl('['), ctrl(']'))
}

fn update(expr: Rec<Expr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let assignment = ident_part()
        .then_ignore(ctrl('='))
        .then(expr.clone())
        .map(|(column, value)| Assignment { column, value });

    word("update")
        .ignore_then(ident())
        .then(row_filter(expr).or_not())
        .then_ignore(keyword("set"))
        .then(assignment.separated_by(ctrl(',')).at_least(1))
        .map(|((table, filter), assignments)| {
            StmtKind::Update(Update {
                table,
                filter,
                assignments,
            })
        })
        .labelled("update")
}

fn delete(expr: Rec<Expr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    word("delete")
        .ignore_then(keyword("from"))
        .ignore_then(ident())
        .then(row_filter(expr).or_not())
        .map(|(table, filter)| StmtKind::Delete(Delete { table, filter }))
        .labelled("delete")
}

fn pragma(expr: Rec<Expr>, table: Rec<TableExpr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let value = choice((
        ctrl('=').ignore_then(expr.clone()).map(PragmaValue::Assign),
        expr.delimited_by(ctrl('('), ctrl(')'))
            .map(PragmaValue::Call),
    ));

    word("pragma")
        .ignore_then(ident())
        .then(value.or_not())
        .then(output(table).or_not())
        .map(|((name, value), output)| StmtKind::Pragma(Pragma { name, value, output }))
        .labelled("pragma")
}

fn if_not_exists() -> impl Parser<TokenKind, bool, Error = PError> + Clone {
    keyword("if")
        .ignore_then(keyword("not"))
        .ignore_then(word("exists"))
        .or_not()
        .map(|x| x.is_some())
}

fn create_table(table: Rec<TableExpr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let definition = choice((
        ctrl('=').ignore_then(table).map(TableDefinition::As),
        column_def()
            .separated_by(ctrl(','))
            .at_least(1)
            .delimited_by(ctrl('('), ctrl(')'))
            .map(TableDefinition::Columns),
    ));

    word("table")
        .ignore_then(word("temp").or_not())
        .then(if_not_exists())
        .then(ident())
        .then(definition)
        .map(|(((temp, if_not_exists), name), definition)| {
            StmtKind::CreateTable(CreateTable {
                temp: temp.is_some(),
                if_not_exists,
                name,
                definition,
            })
        })
        .labelled("table definition")
}

/// A column name, then its type and constraints as raw tokens up to the next
/// top level comma.
fn column_def() -> impl Parser<TokenKind, ColumnDef, Error = PError> + Clone {
    let group = recursive(|group| {
        let plain = filter(|t: &TokenKind| {
            !matches!(t, TokenKind::Control('(') | TokenKind::Control(')'))
        })
        .map(|t| vec![t]);

        just(TokenKind::Control('('))
            .chain(group.or(plain).repeated().flatten())
            .chain(just(TokenKind::Control(')')))
    });

    let top = filter(|t: &TokenKind| {
        !matches!(
            t,
            TokenKind::Control('(') | TokenKind::Control(')') | TokenKind::Control(',')
        )
    })
    .map(|t| vec![t]);

    ident_part()
        .then(group.or(top).repeated().flatten())
        .map(|(name, tokens)| ColumnDef {
            name,
            definition: render_tokens(&tokens),
        })
        .labelled("column definition")
}

/// Render tokens back into SQL text, spaced the way SQL is usually written.
fn render_tokens(tokens: &[TokenKind]) -> String {
    let mut res = String::new();
    let mut prev: Option<&TokenKind> = None;
    for token in tokens {
        let text = match token {
            TokenKind::Eq => "=".to_string(),
            TokenKind::Ne => "<>".to_string(),
            TokenKind::Keyword(k) => k.clone(),
            TokenKind::Literal(lit) => lit.to_string(),
            TokenKind::Variable(name) => format!("@{name}"),
            other => other.to_string(),
        };
        let glued = matches!(token, TokenKind::Control(')' | ','))
            || matches!(prev, Some(TokenKind::Control('(')))
            || (matches!(token, TokenKind::Control('('))
                && matches!(prev, Some(TokenKind::Ident(_))));
        if prev.is_some() && !glued {
            res.push(' ');
        }
        res += &text;
        prev = Some(token);
    }
    res
}

fn table_from_json(expr: Rec<Expr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    word("table")
        .ignore_then(ident())
        .then_ignore(keyword("from"))
        .then_ignore(word("json"))
        .then(expr)
        .map(|(table, source)| StmtKind::TableFromJson(TableFromJson { table, source }))
}

fn create_view(table: Rec<TableExpr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    word("view")
        .ignore_then(word("temp").or_not())
        .then(if_not_exists())
        .then(ident())
        .then_ignore(ctrl('='))
        .then(table)
        .map(|(((temp, if_not_exists), name), query)| {
            StmtKind::CreateView(CreateView {
                temp: temp.is_some(),
                if_not_exists,
                name,
                query,
            })
        })
        .labelled("view definition")
}

fn create_index(expr: Rec<Expr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    word("index")
        .ignore_then(word("unique").or_not())
        .then(if_not_exists())
        .then(ident())
        .then_ignore(ctrl('='))
        .then(ident())
        .then(
            sort_item(expr)
                .separated_by(ctrl(','))
                .at_least(1)
                .delimited_by(ctrl('('), ctrl(')')),
        )
        .map(|((((unique, if_not_exists), name), table), columns)| {
            StmtKind::CreateIndex(CreateIndex {
                unique: unique.is_some(),
                if_not_exists,
                name,
                table,
                columns,
            })
        })
        .labelled("index definition")
}

fn drop_stmt() -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let kind = choice((
        word("table").to(DropKind::Table),
        word("view").to(DropKind::View),
        word("index").to(DropKind::Index),
    ));

    word("drop")
        .ignore_then(kind)
        .then(keyword("if").ignore_then(word("exists")).or_not())
        .then(ident())
        .map(|((kind, if_exists), name)| {
            StmtKind::Drop(DropItem {
                kind,
                if_exists: if_exists.is_some(),
                name,
            })
        })
        .labelled("drop")
}

fn load(expr: Rec<Expr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let format = keyword("as").ignore_then(choice((
        word("csv").to(LoadFormat::Csv),
        word("ndjson").to(LoadFormat::Ndjson),
        word("json").to(LoadFormat::Json),
    )));

    word("load")
        .ignore_then(ident())
        .then(name_list().or_not())
        .then_ignore(keyword("from"))
        .then(expr)
        .then(format.or_not())
        .map(|(((table, columns), source), format)| {
            StmtKind::Load(Load {
                table,
                columns: columns.unwrap_or_default(),
                source,
                format,
            })
        })
        .labelled("load")
}

fn function_def(expr: Rec<Expr>) -> impl Parser<TokenKind, StmtKind, Error = PError> + Clone {
    let params = ident_part()
        .separated_by(ctrl(','))
        .delimited_by(ctrl('('), ctrl(')'));

    word("function")
        .ignore_then(ident_part())
        .then(params)
        .then_ignore(ctrl('='))
        .then(expr)
        .map(|((name, params), body)| StmtKind::FunctionDef(FunctionDef { name, params, body }))
        .labelled("function definition")
}

fn output(table: Rec<TableExpr>) -> impl Parser<TokenKind, Output, Error = PError> + Clone {
    let string = select! { TokenKind::Literal(lr::Literal::String(s)) => s };

    let vega = word("vega")
        .ignore_then(choice((
            ident_part().map(VegaView::Mark),
            string.clone().map(VegaView::Json),
        )))
        .then(
            keyword("as")
                .ignore_then(choice((
                    word("spec").to("spec"),
                    word("svg").to("svg"),
                    word("png").to("png"),
                )))
                .or_not(),
        )
        .map(|(view, format)| OutputFormat::Vega {
            view,
            format: format.map(|f| f.to_string()),
        });

    let format = choice((
        word("dense").to(OutputFormat::Dense),
        word("sparse").to(OutputFormat::Sparse),
        word("raw").to(OutputFormat::Raw),
        word("eqp").to(OutputFormat::Eqp),
        vega,
    ));

    let dest = choice((
        word("stdout").to(Dest::Stdout),
        word("stderr").to(Dest::Stderr),
        string.map(Dest::Path),
        select! { TokenKind::Variable(name) => Dest::Variable(name) },
        table
            .delimited_by(ctrl('('), ctrl(')'))
            .map(|t| Dest::Query(Box::new(t))),
    ));

    word("output")
        .ignore_then(format.or_not())
        .then(word("to").ignore_then(dest).or_not())
        .map(|(format, dest)| Output { format, dest })
        .labelled("output")
}

#[cfg(test)]
mod test {
    use insta::assert_debug_snapshot;
    use itertools::Itertools;

    use super::*;
    use crate::test::parse_script;

    fn kinds(source: &str) -> Vec<String> {
        parse_script(source)
            .unwrap()
            .iter()
            .map(|s| s.kind.as_ref().to_string())
            .collect()
    }

    #[test]
    fn test_statement_kinds() {
        assert_debug_snapshot!(kinds(r#"
        .load ./ext.so
        T output sparse to stderr;;
        explain query plan T;;
        insert or replace into T(a, b) values [[1, 2]];;
        update T[a = 1] set b = 2;;
        delete from T[a > 1];;
        pragma table_info(T);;
        table temp if not exists T2 = T{a};;
        table T3(id integer primary key, price decimal(10, 2) not null);;
        table T4 from json @payload;;
        view V = T;;
        index unique I = T(a desc, b);;
        drop view if exists V;;
        load T from 'x.csv' as csv;;
        function twice(x) = x * 2;;
        ;;
        T
        "#), @r#"
        [
            "Meta",
            "Query",
            "Explain",
            "Insert",
            "Update",
            "Delete",
            "Pragma",
            "CreateTable",
            "CreateTable",
            "TableFromJson",
            "CreateView",
            "CreateIndex",
            "Drop",
            "Load",
            "FunctionDef",
            "Query",
        ]
        "#);
    }

    #[test]
    fn test_column_defs() {
        let stmts = parse_script("table T(id integer primary key, price decimal(10, 2) not null default 0)").unwrap();
        let create = stmts.into_iter().exactly_one().unwrap().kind.into_create_table().unwrap();
        let columns = create.definition.into_columns().unwrap();
        assert_eq!(columns[0].definition, "integer primary key");
        assert_eq!(columns[1].name, "price");
        assert_eq!(columns[1].definition, "decimal(10, 2) not null default 0");
    }

    #[test]
    fn test_control_blocks() {
        let stmts = parse_script(
            "if @n > 1 then T;;\n.format raw\nU else V end;;\nfor a, b = a + 1 in T do W;; end",
        )
        .unwrap();
        let [first, second]: [Stmt; 2] = stmts.try_into().unwrap();
        let if_stmt = first.kind.into_if().unwrap();
        assert_eq!(if_stmt.then_stmts.len(), 3);
        assert_eq!(if_stmt.else_stmts.len(), 1);
        let for_stmt = second.kind.into_for().unwrap();
        assert_eq!(for_stmt.assignments.len(), 2);
        assert!(for_stmt.assignments[1].expr.is_some());
        assert_eq!(for_stmt.body.len(), 1);
    }

    #[test]
    fn test_output_directive() {
        let stmts = parse_script("T output vega bar as svg to 'out.svg'").unwrap();
        let query = stmts.into_iter().exactly_one().unwrap().kind.into_query().unwrap();
        let output = query.output.unwrap();
        assert_eq!(
            output.format,
            Some(OutputFormat::Vega {
                view: VegaView::Mark("bar".to_string()),
                format: Some("svg".to_string())
            })
        );
        assert_eq!(output.dest, Some(Dest::Path("'out.svg'".to_string())));
    }

    #[test]
    fn test_render_tokens() {
        let tokens = vec![
            TokenKind::Ident("decimal".to_string()),
            TokenKind::Control('('),
            TokenKind::Literal(lr::Literal::Number("10".to_string())),
            TokenKind::Control(','),
            TokenKind::Literal(lr::Literal::Number("2".to_string())),
            TokenKind::Control(')'),
            TokenKind::Keyword("not".to_string()),
            TokenKind::Keyword("null".to_string()),
        ];
        assert_eq!(render_tokens(&tokens), "decimal(10, 2) not null");
    }
}
