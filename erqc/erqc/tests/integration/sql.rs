//! Simple tests for "this Erq creates this SQL" go here.
use insta::assert_snapshot;
use erqc::{ErrorMessages, Options, Rule, Statement};
use rstest::rstest;

pub(crate) fn compile(source: &str) -> Result<Vec<Statement>, ErrorMessages> {
    erqc::compile(
        source,
        &Options::default().with_display(erqc::DisplayOptions::Plain),
    )
}

/// The SQL of a single query statement.
fn sql(source: &str) -> String {
    let statements = compile(source).unwrap();
    assert_eq!(statements.len(), 1, "expected one statement: {statements:?}");
    statements[0].queries().join("\n")
}

#[rstest]
#[case::bare("T", "select * from T")]
#[case::projection("T{c1, c2}", "select c1, c2 from T")]
#[case::filter_then_project("T[p]{c}", "select c from T where (p)")]
#[case::project_then_filter("T{c}[p]", "select * from (select c from T) where (p)")]
#[case::join_sugar("t -:x:y:> u", "select * from t join u on t.x = u.y")]
#[case::join_sugar_same_key("t -:x:> u", "select * from t join u on t.x = u.x")]
#[case::json_string(r#"{"𩸽"}"#, r#"select ('"𩸽"'->>'$')"#)]
#[case::json_string_escapes(r#"{"\ud867\ude3d"}"#, r#"select ('"\ud867\ude3d"'->>'$')"#)]
#[case::unicode_escape(r"{e'\u{29e3d}'}", "select printf('%s',char(0x29e3d))")]
#[case::format_escape(r"{e'\u{29e3d}\%02X(15)'}", "select printf('%s%02X',char(0x29e3d),15)")]
fn test_compositions(#[case] source: &str, #[case] expected: &str) {
    similar_asserts::assert_eq!(sql(source), expected);
}

#[test]
fn test_branches_keep_their_order() {
    assert_snapshot!(
        sql("(A{x asc}; B{x desc}){x => sum(y)}"),
        @"select x, sum(y) from (select * from (select x from A order by x asc) union all select * from (select x from B order by x desc)) group by (x)"
    );
}

#[test]
fn test_nested_reification() {
    assert_snapshot!(
        sql("T{a, b}[a > 1]{a}[a < 5]"),
        @"select * from (select a from (select a, b from T) where (a > 1)) where (a < 5)"
    );
}

#[test]
fn test_filter_after_limit() {
    assert_snapshot!(
        sql("T limit 10 [a]"),
        @"select * from (select * from T limit 10) as T where (a)"
    );
}

#[test]
fn test_explicit_order_before_inline_sorts() {
    assert_snapshot!(
        sql("T{a desc, b} order by c"),
        @"select a, b from T order by c, a desc"
    );
}

#[test]
fn test_aggregation() {
    assert_snapshot!(
        sql("sales[year = 2024]{region => sum(amount) as total}[total > 100] order by total desc"),
        @"select region, sum(amount) as total from sales where (year = 2024) group by (region) having (total > 100) order by total desc"
    );
}

#[test]
fn test_scalar_expressions() {
    assert_snapshot!(
        sql("T{a between 1 and 2, b not in (1, 2), c is not null, cast(d as text), case when e then 1 else 0 end}"),
        @"select a between 1 and 2, b not in (1, 2), c is not null, cast(d as text), case when e then 1 else 0 end from T"
    );
    assert_snapshot!(
        sql("T{count(distinct a) filter (where b), row_number() over (partition by c order by d)}"),
        @"select count(distinct a) filter (where b), row_number() over (partition by c order by d) from T"
    );
    assert_snapshot!(sql("T[a != 1 and b == 2]"), @"select * from T where (a <> 1 and b = 2)");
}

#[test]
fn test_unicode_names() {
    assert_snapshot!(sql("表[列 > 1]{名前}"), @"select 名前 from 表 where (列 > 1)");
}

#[test]
fn test_repl_line_rule() {
    let options = Options::default().with_rule(Rule::ReplLine);

    let err = erqc::compile("select 1", &options).unwrap_err();
    assert!(err.is_incomplete());
    assert!(err.inner[0].location.is_none());

    let statements = erqc::compile("select 1;;", &options).unwrap();
    assert_eq!(statements[0].queries(), ["select 1"]);
}

#[test]
fn test_format_option() {
    let statements = erqc::compile("T[a > 1]{a}", &Options::default().with_format(true)).unwrap();
    assert_snapshot!(statements[0].queries()[0], @r"
    select
      a
    from
      T
    where
      (a > 1)
    ");
}
