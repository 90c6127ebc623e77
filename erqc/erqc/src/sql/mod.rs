//! Backend for translating the parse tree into SQLite SQL text.

pub(crate) mod gen_expr;
pub(crate) mod gen_table;
mod operators;
mod table;

pub use table::{Column, JoinOn, JoinSpec, TableBuilder};

use sqlformat::{FormatOptions, QueryParams};

/// Splits SQL into multiple lines and prettifies indentation and spacing.
pub(crate) fn format_sql(sql: String) -> String {
    let options = FormatOptions {
        lines_between_queries: 1,
        ..FormatOptions::default()
    };
    sqlformat::format(&sql, &QueryParams::None, &options)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_sql() {
        let sql = "select a, count(*) as n from T where (b > 1) group by (a)".to_string();
        let formatted = format_sql(sql);
        assert!(formatted.contains('\n'));
        assert_eq!(formatted.lines().next(), Some("select"));
    }
}
