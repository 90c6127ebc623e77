//! Statement descriptors, and the placeholder protocol between them and an
//! execution engine.
use erqc::{Environment, PlaceholderKind, Statement};
use insta::assert_yaml_snapshot;
use rstest::rstest;
use serde_json::json;

use super::sql::compile;

#[test]
fn test_script() {
    let statements = compile(
        r#"
-- a small script
.format dense
table temp t = values [[1, 'a'], [2, 'b']];;
insert into t(a, b) {3, 'c'};;
t{a desc, b} output sparse to stderr;;
explain query plan t[a > 1]
"#,
    )
    .unwrap();

    assert_yaml_snapshot!(statements, @r#"
    - type: command
      command: format
      args:
        - dense
    - type: ddl
      query: "create temp table t as select * from (values (1, 'a'), (2, 'b'))"
    - type: insert
      query: "insert into t (a, b) select 3, 'c'"
    - type: select
      query: "select a, b from t order by a desc"
      format: sparse
      dest:
        type: stderr
    - type: select
      query: explain query plan select * from t where (a > 1)
      format: eqp
    "#);
}

#[test]
fn test_placeholders() {
    let statements = compile("s.@t[id = @id]{name}").unwrap();
    let query = statements[0].queries()[0];
    assert_eq!(
        query,
        "select name from s.\0tt\0 where (id = \0vid\0)"
    );

    let placeholders = &statements[0].placeholders()[0];
    let kinds: Vec<_> = placeholders.iter().map(|p| (p.kind, p.payload.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (PlaceholderKind::Table, "t"),
            (PlaceholderKind::Variable, "id"),
        ]
    );
    for p in placeholders {
        assert_eq!(query.as_bytes()[p.range.start], 0);
        assert_eq!(query.as_bytes()[p.range.end - 1], 0);
    }
}

#[test]
fn test_for_loop_environment() {
    let statements = compile("for id, label = name || '!' in users[active] do delete from log[uid = @id];; end").unwrap();
    let Statement::For {
        assignments,
        source_table,
        body_statements,
    } = &statements[0]
    else {
        panic!("expected a for statement, got {:?}", statements[0]);
    };
    assert_eq!(source_table, "select id, name || '!' as label from users where (active)");

    // what an engine does for one row of the source table
    let env = Environment::new().extend("unused", json!(null));
    let row = env.bind_row(assignments, &[json!(7), json!("ann!")]).unwrap();

    let query = body_statements[0].queries()[0];
    let resolved = row
        .resolve(query, |_| unreachable!("no expressions in this query"))
        .unwrap();
    assert_eq!(resolved, "delete from log where uid = 7");

    // the outer environment is unchanged
    assert!(env.get("id").is_none());
}

#[test]
fn test_if_probe() {
    let statements = compile("if exists(T[a]) then U else\n.headers off\nend").unwrap();
    let Statement::If {
        condition,
        then_statements,
        else_statements,
    } = &statements[0]
    else {
        panic!("expected an if statement, got {:?}", statements[0]);
    };
    assert_eq!(
        condition,
        "select case when exists (select * from T where (a)) then 1 else 0 end"
    );
    assert_eq!(then_statements.len(), 1);
    assert!(else_statements[0].is_command());
}

#[test]
fn test_descriptor_json() {
    let json = erqc::compile_to_json(
        "T output vega '{\"mark\": \"bar\"}' as png to 's3://bucket/chart.png'",
        &erqc::Options::default(),
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        value,
        json!([{
            "type": "select",
            "query": "select * from T",
            "format": {"type": "vega", "view": {"mark": "bar"}, "format": "png"},
            "dest": {"type": "url", "url": "s3://bucket/chart.png"},
        }])
    );
}

#[rstest]
#[case::directly_after("T;;\n.load ext")]
#[case::blank_line("T;;\n\n.load ext")]
#[case::trailing_spaces("T;;  \n.load ext")]
#[case::crlf("T;;\r\n.load ext\r\n")]
fn test_meta_command_line_layouts(#[case] source: &str) {
    let statements = compile(source).unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1],
        Statement::Command {
            command: "load_extension".to_string(),
            args: vec![json!("ext")],
        }
    );
}
