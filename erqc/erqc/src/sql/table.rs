//! Incremental construction of a single `select`.
//!
//! Operations arrive in the order the user wrote them, but SQL clauses have a
//! fixed order. Each transition checks whether applying the operation in
//! place would change its meaning; when it would, the current value is first
//! wrapped as `select * from (...)` into a fresh builder.

use itertools::Itertools;

use crate::pr::{JoinKind, SortDirection};
use crate::{Error, Result, WithErrorInfo};

/// A relational expression under construction.
///
/// Values are immutable: every transition consumes the builder and returns
/// the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableBuilder {
    /// The name this result can be referred to by, used to infer the left
    /// side of join sugar.
    name: Option<String>,
    source: Option<String>,
    source_alias: Option<String>,
    joins: Vec<String>,
    wheres: Vec<String>,
    groups: Vec<Column>,
    windows: Vec<(String, String)>,
    havings: Vec<String>,
    items: Vec<Column>,
    distinct: bool,
    order: Vec<String>,
    limit: Option<String>,
    offset: Option<String>,
    aggregated: bool,
    raw: Option<Raw>,
}

/// One item of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub expr: String,
    pub alias: Option<String>,
    pub sort: Option<SortDirection>,
}

/// SQL that is emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
struct Raw {
    sql: String,
    /// Whether the text can stand as a branch of a compound select without
    /// parentheses.
    nestable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub natural: bool,
    pub kind: Option<JoinKind>,
    pub target: TableBuilder,
    pub constraint: JoinOn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOn {
    None,
    On(String),
    Using(Vec<String>),
    /// `left.key = right.key`, with the right key defaulting to the left.
    Keys { left: String, right: Option<String> },
}

impl Column {
    pub fn new(expr: String) -> Self {
        Column {
            expr,
            alias: None,
            sort: None,
        }
    }

    fn to_sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} as {alias}", self.expr),
            None => self.expr.clone(),
        }
    }
}

impl TableBuilder {
    /// A builder with nothing to select from, as in `select 1`.
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Selects everything from `source`, optionally renamed to `alias`.
    /// The name defaults to the alias.
    pub fn from_source(source: String, alias: Option<String>, name: Option<String>) -> Self {
        TableBuilder {
            name: alias.clone().or(name),
            source: Some(source),
            source_alias: alias,
            ..Self::default()
        }
    }

    /// Wraps a complete query that is not assembled from clauses, such as a
    /// compound select or a `with` query.
    pub fn from_raw(sql: String, nestable: bool) -> Self {
        TableBuilder {
            raw: Some(Raw { sql, nestable }),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }

    /// Whether the select list is fixed. Filters and joins can no longer be
    /// applied in place.
    pub fn is_selected(&self) -> bool {
        self.raw.is_some() || !self.groups.is_empty() || !self.items.is_empty() || self.distinct
    }

    /// Whether the row count is bounded. Ordering and bounding again must
    /// happen in a wrapping query.
    pub fn is_limited(&self) -> bool {
        self.raw.is_some() || self.limit.is_some() || self.offset.is_some()
    }

    fn is_ordered(&self) -> bool {
        !self.order.is_empty() || self.inline_sorts().next().is_some()
    }

    /// A builder that only names a source, so it can be emitted as the source
    /// itself rather than as a subquery.
    fn is_plain(&self) -> bool {
        self.source.is_some() && {
            let TableBuilder {
                name: _,
                source: _,
                source_alias: _,
                joins,
                wheres,
                groups,
                windows,
                havings,
                items,
                distinct,
                order,
                limit,
                offset,
                aggregated,
                raw,
            } = self;
            joins.is_empty()
                && wheres.is_empty()
                && groups.is_empty()
                && windows.is_empty()
                && havings.is_empty()
                && items.is_empty()
                && !distinct
                && order.is_empty()
                && limit.is_none()
                && offset.is_none()
                && !aggregated
                && raw.is_none()
        }
    }

    /// Moves everything so far into a subquery of a fresh builder, which
    /// keeps the current name.
    fn reify(self) -> Self {
        log::debug!("wrapping into a subquery: {:?}", self.name);
        let name = self.name.clone();
        let sql = self.to_sql(true);
        TableBuilder {
            source: Some(format!("({sql})")),
            source_alias: name.clone(),
            name,
            ..Self::default()
        }
    }

    pub fn with_where(mut self, condition: String) -> Self {
        if self.is_limited() {
            return self.reify().with_where(condition);
        }
        if self.aggregated {
            self.havings.push(condition);
            return self;
        }
        if self.is_selected() {
            return self.reify().with_where(condition);
        }
        self.wheres.push(condition);
        self
    }

    pub fn with_select(self, items: Vec<Column>) -> Self {
        if self.is_selected() || self.is_limited() {
            return self.reify().with_select(items);
        }
        TableBuilder {
            name: None,
            items,
            ..self
        }
    }

    pub fn with_group_select(self, groups: Vec<Column>, items: Vec<Column>) -> Self {
        if self.is_selected() || self.is_limited() {
            return self.reify().with_group_select(groups, items);
        }
        TableBuilder {
            name: None,
            groups,
            items,
            aggregated: true,
            ..self
        }
    }

    pub fn with_window(mut self, name: String, definition: String) -> Self {
        if self.is_selected() || self.is_limited() {
            return self.reify().with_window(name, definition);
        }
        self.windows.push((name, definition));
        self
    }

    pub fn with_join(mut self, join: JoinSpec) -> Result<Self> {
        if self.is_selected() || self.is_limited() {
            return self.reify().with_join(join);
        }

        let JoinSpec {
            natural,
            kind,
            target,
            constraint,
        } = join;

        let mut sql = String::new();
        if natural {
            sql += "natural ";
        }
        if let Some(kind) = kind {
            sql += &format!("{kind} ");
        }
        sql += "join ";
        sql += &target.as_source();

        match constraint {
            JoinOn::None => {}
            JoinOn::On(condition) => sql += &format!(" on {condition}"),
            JoinOn::Using(columns) => sql += &format!(" using ({})", columns.join(", ")),
            JoinOn::Keys { left, right } => {
                let Some(left_name) = &self.name else {
                    return Err(Error::new_semantic(format!(
                        "cannot infer the left table of `-:{left}:>`"
                    ))
                    .push_hint("add `as <name>` to the left table expression"));
                };
                let Some(right_name) = &target.name else {
                    return Err(Error::new_semantic(format!(
                        "cannot infer the right table of `-:{left}:>`"
                    ))
                    .push_hint("add `as <name>` to the right table expression"));
                };
                let right = right.as_deref().unwrap_or(left.as_str());
                sql += &format!(" on {left_name}.{left} = {right_name}.{right}");
            }
        }

        self.joins.push(sql);
        self.name = target.name;
        Ok(self)
    }

    pub fn with_distinct(self) -> Self {
        if self.is_limited() {
            return self.reify().with_distinct();
        }
        TableBuilder {
            distinct: true,
            ..self
        }
    }

    /// Order by `items` first, then by whatever order was already there.
    pub fn with_order(self, items: Vec<String>) -> Self {
        if self.is_limited() {
            return self.reify().with_order(items);
        }
        let order = items.into_iter().chain(self.order).collect();
        TableBuilder { order, ..self }
    }

    pub fn with_limit(self, limit: Option<String>, offset: Option<String>) -> Self {
        if self.is_limited() {
            return self.reify().with_limit(limit, offset);
        }
        TableBuilder {
            limit,
            offset,
            ..self
        }
    }

    /// Names the result, always as a subquery.
    pub fn alias(self, name: String) -> Self {
        let sql = self.to_sql(true);
        TableBuilder {
            name: Some(name.clone()),
            source: Some(format!("({sql})")),
            source_alias: Some(name),
            ..Self::default()
        }
    }

    /// Text to use after `from` or `join`.
    pub fn as_source(&self) -> String {
        let (source, alias) = match &self.source {
            Some(source) if self.is_plain() => (source.clone(), &self.source_alias),
            _ => (format!("({})", self.to_sql(true)), &self.name),
        };
        match alias {
            Some(alias) => format!("{source} as {alias}"),
            None => source,
        }
    }

    fn inline_sorts(&self) -> impl Iterator<Item = String> + '_ {
        self.groups
            .iter()
            .chain(&self.items)
            .filter_map(|c| Some(format!("{} {}", c.expr, c.sort?)))
    }

    /// Assembles the query.
    ///
    /// Without `allow_ordered`, a query that orders or bounds its rows is
    /// wrapped, so those clauses can't apply to an enclosing compound select.
    pub fn to_sql(&self, allow_ordered: bool) -> String {
        if let Some(raw) = &self.raw {
            return if allow_ordered || raw.nestable {
                raw.sql.clone()
            } else {
                format!("select * from ({})", raw.sql)
            };
        }

        let mut sql = String::from("select ");
        if self.distinct {
            sql += "distinct ";
        }

        let list = self.groups.iter().chain(&self.items).map(Column::to_sql);
        let list = list.collect_vec();
        if list.is_empty() {
            sql += "*";
        } else {
            sql += &list.join(", ");
        }

        if let Some(source) = &self.source {
            sql += " from ";
            sql += source;
            if let Some(alias) = &self.source_alias {
                sql += &format!(" as {alias}");
            }
        }
        for join in &self.joins {
            sql += " ";
            sql += join;
        }

        if !self.wheres.is_empty() {
            sql += " where ";
            sql += &self.wheres.iter().map(|w| format!("({w})")).join(" and ");
        }
        if !self.groups.is_empty() && !list.is_empty() {
            sql += " group by ";
            sql += &self.groups.iter().map(|g| format!("({})", g.expr)).join(", ");
        }
        if !self.havings.is_empty() {
            sql += " having ";
            sql += &self.havings.iter().map(|h| format!("({h})")).join(" and ");
        }
        if !self.windows.is_empty() {
            sql += " window ";
            sql += &self
                .windows
                .iter()
                .map(|(name, def)| format!("{name} as ({def})"))
                .join(", ");
        }

        let order = self.order.iter().cloned().chain(self.inline_sorts());
        let order = order.collect_vec();
        if !order.is_empty() {
            sql += " order by ";
            sql += &order.join(", ");
        }

        match (&self.limit, &self.offset) {
            (Some(limit), Some(offset)) => sql += &format!(" limit {limit} offset {offset}"),
            (Some(limit), None) => sql += &format!(" limit {limit}"),
            (None, Some(offset)) => sql += &format!(" limit -1 offset {offset}"),
            (None, None) => {}
        }

        if !allow_ordered && (self.is_ordered() || self.is_limited()) {
            return format!("select * from ({sql})");
        }
        sql
    }
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;

    use super::*;

    fn table(name: &str) -> TableBuilder {
        TableBuilder::from_source(name.to_string(), None, Some(name.to_string()))
    }

    fn cols(exprs: &[&str]) -> Vec<Column> {
        exprs.iter().map(|e| Column::new(e.to_string())).collect()
    }

    fn sorted(expr: &str, sort: SortDirection) -> Column {
        Column {
            sort: Some(sort),
            ..Column::new(expr.to_string())
        }
    }

    #[test]
    fn test_bare_table() {
        assert_snapshot!(table("T").to_sql(true), @"select * from T");
    }

    #[test]
    fn test_filter_then_project() {
        let t = table("T")
            .with_where("p".to_string())
            .with_select(cols(&["c"]));
        assert_snapshot!(t.to_sql(true), @"select c from T where (p)");
    }

    #[test]
    fn test_project_then_filter_wraps() {
        let t = table("T")
            .with_select(cols(&["c"]))
            .with_where("c > 1".to_string());
        assert_snapshot!(t.to_sql(true), @"select * from (select c from T) where (c > 1)");
    }

    #[test]
    fn test_filter_after_aggregation_is_having() {
        let t = table("T")
            .with_where("a".to_string())
            .with_group_select(cols(&["x"]), cols(&["count(*) as n"]))
            .with_where("n > 1".to_string())
            .with_where("x <> 0".to_string());
        assert_snapshot!(t.to_sql(true), @"select x, count(*) as n from T where (a) group by (x) having (n > 1) and (x <> 0)");
    }

    #[test]
    fn test_filter_after_limit_wraps_keeping_name() {
        let t = table("T")
            .with_limit(Some("10".to_string()), None)
            .with_where("a".to_string());
        assert_snapshot!(t.to_sql(true), @"select * from (select * from T limit 10) as T where (a)");
    }

    #[test]
    fn test_reification_nests() {
        let t = table("T")
            .with_select(cols(&["a"]))
            .with_where("a > 1".to_string())
            .with_select(cols(&["a"]))
            .with_where("a < 5".to_string());
        assert_snapshot!(t.to_sql(true), @"select * from (select a from (select a from T) where (a > 1)) where (a < 5)");
    }

    #[test]
    fn test_order_is_prepended_before_inline_sorts() {
        let t = table("T")
            .with_select(vec![sorted("b", SortDirection::Desc), Column::new("c".to_string())])
            .with_order(vec!["c".to_string()])
            .with_order(vec!["a".to_string()]);
        assert_snapshot!(t.to_sql(true), @"select b, c from T order by a, c, b desc");
    }

    #[test]
    fn test_limit_twice_wraps() {
        let t = table("T")
            .with_limit(Some("10".to_string()), Some("5".to_string()))
            .with_order(vec!["a".to_string()])
            .with_limit(Some("1".to_string()), None);
        assert_snapshot!(t.to_sql(true), @"select * from (select * from T limit 10 offset 5) as T order by a limit 1");

        let t = table("T").with_limit(None, Some("3".to_string()));
        assert_snapshot!(t.to_sql(true), @"select * from T limit -1 offset 3");
    }

    #[test]
    fn test_distinct() {
        let t = table("T").with_select(cols(&["a"])).with_distinct();
        assert_snapshot!(t.to_sql(true), @"select distinct a from T");

        let t = table("T")
            .with_limit(Some("1".to_string()), None)
            .with_distinct();
        assert_snapshot!(t.to_sql(true), @"select distinct * from (select * from T limit 1) as T");
    }

    #[test]
    fn test_join_sugar() {
        let t = table("t")
            .with_join(JoinSpec {
                natural: false,
                kind: None,
                target: table("u"),
                constraint: JoinOn::Keys {
                    left: "x".to_string(),
                    right: Some("y".to_string()),
                },
            })
            .unwrap()
            .with_join(JoinSpec {
                natural: false,
                kind: Some(JoinKind::Left),
                target: table("v"),
                constraint: JoinOn::Keys {
                    left: "z".to_string(),
                    right: None,
                },
            })
            .unwrap();
        assert_eq!(t.name(), Some("v"));
        assert_snapshot!(t.to_sql(true), @"select * from t join u on t.x = u.y left join v on u.z = v.z");
    }

    #[test]
    fn test_join_sugar_needs_a_name() {
        let err = table("t")
            .with_select(cols(&["x"]))
            .with_join(JoinSpec {
                natural: false,
                kind: None,
                target: table("u"),
                constraint: JoinOn::Keys {
                    left: "x".to_string(),
                    right: None,
                },
            })
            .unwrap_err();
        assert_eq!(err.hints, vec!["add `as <name>` to the left table expression"]);
    }

    #[test]
    fn test_join_after_projection_wraps() {
        let target = table("u").with_where("b".to_string());
        let t = table("t")
            .with_select(cols(&["a"]))
            .alias("s".to_string())
            .with_join(JoinSpec {
                natural: true,
                kind: Some(JoinKind::Inner),
                target,
                constraint: JoinOn::Using(vec!["a".to_string()]),
            })
            .unwrap();
        assert_snapshot!(t.to_sql(true), @"select * from (select a from t) as s natural inner join (select * from u where (b)) as u using (a)");
    }

    #[test]
    fn test_window() {
        let t = table("T")
            .with_window("w".to_string(), "order by a".to_string())
            .with_select(cols(&["sum(b) over w"]));
        assert_snapshot!(t.to_sql(true), @"select sum(b) over w from T window w as (order by a)");
    }

    #[test]
    fn test_branches_keep_their_order() {
        let a = table("A").with_select(vec![sorted("x", SortDirection::Asc)]);
        assert_snapshot!(a.to_sql(false), @"select * from (select x from A order by x asc)");
        assert_snapshot!(table("A").to_sql(false), @"select * from A");

        let compound = TableBuilder::from_raw("select 1 union all select 2".to_string(), true);
        assert_snapshot!(compound.to_sql(false), @"select 1 union all select 2");
        let with = TableBuilder::from_raw("with c as (select 1) select * from c".to_string(), false);
        assert_snapshot!(with.to_sql(false), @"select * from (with c as (select 1) select * from c)");
    }

    #[test]
    fn test_raw_is_wrapped_before_extending() {
        let t = TableBuilder::from_raw("select 1 as x union all select 2".to_string(), true)
            .with_group_select(cols(&["x"]), cols(&["count(*)"]));
        assert_snapshot!(t.to_sql(true), @"select x, count(*) from (select 1 as x union all select 2) group by (x)");
    }

    #[test]
    fn test_unbound() {
        let t = TableBuilder::unbound().with_select(vec![Column {
            alias: Some("one".to_string()),
            ..Column::new("1".to_string())
        }]);
        assert_snapshot!(t.to_sql(true), @"select 1 as one");
    }
}
