use std::fmt;

use sha2::{Digest, Sha256};

use crate::domain::entities::aggregate::SqlExp;
use crate::domain::entities::field::{ColumnRef, JoinKind, TableRef};
use crate::domain::entities::order::{OrderBy, SortDirection};
use crate::domain::entities::predicate::Predicate;
use crate::infra::sql::dialect::Dialect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTable {
    pub table: TableRef,
    pub kind: JoinKind,
    pub on: Vec<(ColumnRef, ColumnRef)>,
    /// Columns selected as `"alias.column"`; empty selects `alias.*`.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub count: Option<u64>,
    pub offset: u64,
}

/// Hex SHA-256 of the rendered tables, predicates and order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    fn digest(canonical: &str) -> Self {
        QuerySignature(format!("{:x}", Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cache_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query state of one grid request: tables, predicates, order and limit.
///
/// Base conditions come from the application and also restrict filter
/// dropdowns; predicates come from grid filters and only restrict the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    main: TableRef,
    joins: Vec<JoinedTable>,
    base_conditions: Vec<Predicate>,
    predicates: Vec<Predicate>,
    order: Vec<(OrderBy, ColumnRef)>,
    limit: Option<Limit>,
}

impl Select {
    pub fn new(main: TableRef) -> Self {
        Self {
            main,
            joins: Vec::new(),
            base_conditions: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn main(&self) -> &TableRef {
        &self.main
    }

    pub fn joins(&self) -> &[JoinedTable] {
        &self.joins
    }

    /// Main table first, then joins in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        std::iter::once(&self.main).chain(self.joins.iter().map(|join| &join.table))
    }

    pub fn base_conditions(&self) -> &[Predicate] {
        &self.base_conditions
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> impl Iterator<Item = &OrderBy> {
        self.order.iter().map(|(entry, _)| entry)
    }

    pub fn limit(&self) -> Option<Limit> {
        self.limit
    }

    pub fn add_join(&mut self, join: JoinedTable) {
        self.joins.push(join);
    }

    pub fn add_base_condition(&mut self, sql: impl Into<String>) {
        self.base_conditions.push(Predicate::Raw(sql.into()));
    }

    pub fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn clear_predicates(&mut self) {
        self.predicates.clear();
    }

    /// Appends an order entry; a column already ordered keeps its position
    /// and takes the new direction.
    pub fn build_order(&mut self, entry: OrderBy, column: ColumnRef, reset: bool) {
        if reset {
            self.order.clear();
        }
        match self.order.iter_mut().find(|(_, existing)| *existing == column) {
            Some(existing) => existing.0 = entry,
            None => self.order.push((entry, column)),
        }
    }

    pub fn reset_order(&mut self) {
        self.order.clear();
    }

    pub fn set_limit(&mut self, count: u64, offset: u64) {
        self.limit = Some(Limit {
            count: Some(count),
            offset,
        });
    }

    pub fn reset_limit(&mut self) {
        self.limit = None;
    }

    pub fn from_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = table_sql(dialect, &self.main);
        for join in &self.joins {
            let on = join
                .on
                .iter()
                .map(|(left, right)| format!("{} = {}", dialect.column(left), dialect.column(right)))
                .collect::<Vec<_>>();
            sql.push_str(&format!(
                " {} {} ON {}",
                join.kind.as_sql(),
                table_sql(dialect, &join.table),
                on.join(" AND ")
            ));
        }
        sql
    }

    fn where_sql(&self, dialect: &dyn Dialect, extra: &[Predicate], with_filters: bool) -> String {
        let filters: &[Predicate] = if with_filters { &self.predicates } else { &[] };
        let clauses = self
            .base_conditions
            .iter()
            .chain(filters)
            .chain(extra)
            .map(|predicate| dialect.render_predicate(predicate))
            .collect::<Vec<_>>();

        if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        }
    }

    fn order_sql(&self, dialect: &dyn Dialect) -> String {
        if self.order.is_empty() {
            return String::new();
        }
        let entries = self
            .order
            .iter()
            .map(|(entry, column)| format!("{} {}", dialect.column(column), entry.direction.as_sql()))
            .collect::<Vec<_>>();
        format!(" ORDER BY {}", entries.join(", "))
    }

    fn limit_sql(&self, dialect: &dyn Dialect) -> String {
        match self.limit {
            Some(limit) => {
                let clause = dialect.limit_clause(limit.count, limit.offset);
                if clause.is_empty() {
                    clause
                } else {
                    format!(" {clause}")
                }
            }
            None => String::new(),
        }
    }

    /// Main table columns keep their names; joined columns are labelled
    /// `alias.column` so they never collide with the main table's.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut columns = vec![format!("{}.*", dialect.quote_identifier(self.main.alias()))];
        for join in &self.joins {
            let alias = join.table.alias();
            if join.columns.is_empty() {
                columns.push(format!("{}.*", dialect.quote_identifier(alias)));
                continue;
            }
            columns.extend(join.columns.iter().map(|column| {
                format!(
                    "{} AS {}",
                    dialect.column(&ColumnRef::new(alias, column.as_str())),
                    dialect.quote_identifier(&format!("{alias}.{column}"))
                )
            }));
        }
        format!(
            "SELECT {} FROM {}{}{}{}",
            columns.join(", "),
            self.from_sql(dialect),
            self.where_sql(dialect, &[], true),
            self.order_sql(dialect),
            self.limit_sql(dialect)
        )
    }

    pub fn count_sql(&self, dialect: &dyn Dialect) -> String {
        format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM {}{}) AS {}",
            self.from_sql(dialect),
            self.where_sql(dialect, &[], true),
            dialect.quote_identifier("counted")
        )
    }

    /// Distinct `(field, value)` pairs for filter dropdowns; grid filters are not applied.
    pub fn distinct_pairs_sql(
        &self,
        dialect: &dyn Dialect,
        field: &ColumnRef,
        value: &ColumnRef,
        order: &ColumnRef,
        direction: SortDirection,
    ) -> String {
        format!(
            "SELECT DISTINCT {}, {} FROM {}{} ORDER BY {} {}",
            dialect.column(field),
            dialect.column(value),
            self.from_sql(dialect),
            self.where_sql(dialect, &[], false),
            dialect.column(order),
            direction.as_sql()
        )
    }

    /// Selects `columns` for every filtered row, ignoring order and limit.
    pub fn columns_sql(&self, dialect: &dyn Dialect, columns: &[ColumnRef]) -> String {
        let columns = columns
            .iter()
            .map(|column| dialect.column(column))
            .collect::<Vec<_>>();
        format!(
            "SELECT {} FROM {}{}",
            columns.join(", "),
            self.from_sql(dialect),
            self.where_sql(dialect, &[], true)
        )
    }

    /// Nested aggregate as chained subqueries, innermost function applied to `column`.
    ///
    /// Returns `None` when `exp` names no function.
    pub fn aggregate_sql(
        &self,
        dialect: &dyn Dialect,
        exp: &SqlExp,
        column: &ColumnRef,
        extra: &[Predicate],
    ) -> Option<String> {
        let (innermost, outer) = exp.functions.split_last()?;
        let value_alias = dialect.quote_identifier("value");

        let mut sql = format!(
            "SELECT {}({}) AS {value_alias} FROM {}{}",
            innermost.as_sql(),
            dialect.column(column),
            self.from_sql(dialect),
            self.where_sql(dialect, extra, true)
        );
        for (depth, function) in outer.iter().rev().enumerate() {
            sql = format!(
                "SELECT {}({value_alias}) AS {value_alias} FROM ({sql}) AS {}",
                function.as_sql(),
                dialect.quote_identifier(&format!("nested_{}", depth + 1))
            );
        }
        Some(sql)
    }

    pub fn signature(&self, dialect: &dyn Dialect) -> QuerySignature {
        self.scoped_signature(dialect, "")
    }

    /// Signature that also names the database the query runs against, so one
    /// cache can serve several databases.
    pub fn scoped_signature(&self, dialect: &dyn Dialect, scope: &str) -> QuerySignature {
        let canonical = format!(
            "{scope}\n{}\n{}\n{}",
            self.from_sql(dialect),
            self.where_sql(dialect, &[], true),
            self.order_sql(dialect)
        );
        QuerySignature::digest(&canonical)
    }
}

fn table_sql(dialect: &dyn Dialect, table: &TableRef) -> String {
    match &table.alias {
        Some(alias) if alias != &table.name => format!(
            "{} AS {}",
            dialect.quote_identifier(&table.name),
            dialect.quote_identifier(alias)
        ),
        _ => dialect.quote_identifier(&table.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::aggregate::AggregateFunction;
    use crate::domain::entities::predicate::CompareOp;
    use crate::infra::sql::dialect::{MySqlDialect, SqliteDialect};

    fn city_select() -> Select {
        let mut select = Select::new(TableRef::new("city").with_alias("ci"));
        select.add_join(JoinedTable {
            table: TableRef::new("country").with_alias("co"),
            kind: JoinKind::Inner,
            on: vec![(
                ColumnRef::new("ci", "country_code"),
                ColumnRef::new("co", "code"),
            )],
            columns: vec!["code".to_string(), "name".to_string()],
        });
        select
    }

    fn name_is(value: &str) -> Predicate {
        Predicate::Compare {
            column: ColumnRef::new("ci", "name"),
            op: CompareOp::Eq,
            value: value.to_string(),
        }
    }

    #[test]
    fn to_sql_composes_every_clause() {
        let mut select = city_select();
        select.add_base_condition("ci.deleted = 0");
        select.add_predicate(name_is("Porto"));
        select.build_order(
            OrderBy::desc("population"),
            ColumnRef::new("ci", "population"),
            false,
        );
        select.set_limit(10, 20);

        assert_eq!(
            select.to_sql(&SqliteDialect),
            "SELECT \"ci\".*, \"co\".\"code\" AS \"co.code\", \"co\".\"name\" AS \"co.name\" FROM \"city\" AS \"ci\" INNER JOIN \"country\" AS \"co\" \
             ON \"ci\".\"country_code\" = \"co\".\"code\" \
             WHERE (ci.deleted = 0) AND \"ci\".\"name\" = 'Porto' \
             ORDER BY \"ci\".\"population\" DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn build_order_reset_and_duplicates() {
        let mut select = city_select();
        let name = ColumnRef::new("ci", "name");

        select.build_order(OrderBy::asc("name"), name.clone(), true);
        select.build_order(
            OrderBy::asc("population"),
            ColumnRef::new("ci", "population"),
            false,
        );
        select.build_order(OrderBy::desc("ci.name"), name.clone(), false);

        assert_eq!(
            select.order().cloned().collect::<Vec<_>>(),
            vec![OrderBy::desc("ci.name"), OrderBy::asc("population")]
        );

        select.build_order(OrderBy::asc("name"), name, true);
        assert_eq!(select.order().count(), 1);

        select.reset_order();
        select.reset_order();
        assert_eq!(select.order().count(), 0);
    }

    #[test]
    fn signature_ignores_limit_but_tracks_predicates() {
        let mut select = city_select();
        let unfiltered = select.signature(&SqliteDialect);

        select.set_limit(5, 0);
        assert_eq!(select.signature(&SqliteDialect), unfiltered);

        select.add_predicate(name_is("Porto"));
        let filtered = select.signature(&SqliteDialect);
        assert_ne!(filtered, unfiltered);
        assert_eq!(filtered.as_str().len(), 64);

        let mut cleared = select.clone();
        cleared.clear_predicates();
        assert_eq!(cleared.signature(&SqliteDialect), unfiltered);

        let mut same = city_select();
        same.add_predicate(name_is("Porto"));
        assert_eq!(same.signature(&SqliteDialect), filtered);
        assert_ne!(same.scoped_signature(&SqliteDialect, "/data/other.sqlite"), filtered);
        assert_eq!(
            same.scoped_signature(&SqliteDialect, "/data/other.sqlite"),
            select.scoped_signature(&SqliteDialect, "/data/other.sqlite")
        );
    }

    #[test]
    fn aggregate_sql_nests_subqueries_outermost_first() {
        let select = Select::new(TableRef::new("country"));
        let exp = SqlExp::new(
            [AggregateFunction::Sum, AggregateFunction::Avg],
            "Population",
        );
        let sql = select
            .aggregate_sql(
                &SqliteDialect,
                &exp,
                &ColumnRef::new("country", "Population"),
                &[],
            )
            .expect("aggregate should render");

        assert_eq!(
            sql,
            "SELECT SUM(\"value\") AS \"value\" FROM (SELECT AVG(\"country\".\"Population\") \
             AS \"value\" FROM \"country\") AS \"nested_1\""
        );
        assert_eq!(
            select.aggregate_sql(
                &SqliteDialect,
                &SqlExp::new(Vec::new(), "Population"),
                &ColumnRef::new("country", "Population"),
                &[]
            ),
            None
        );
    }

    #[test]
    fn distinct_pairs_skip_grid_filters() {
        let mut select = Select::new(TableRef::new("city"));
        select.add_base_condition("active = 1");
        select.add_predicate(name_is("Porto"));

        let id = ColumnRef::new("city", "id");
        let name = ColumnRef::new("city", "name");
        assert_eq!(
            select.distinct_pairs_sql(&MySqlDialect, &id, &name, &name, SortDirection::Asc),
            "SELECT DISTINCT `city`.`id`, `city`.`name` FROM `city` WHERE (active = 1) \
             ORDER BY `city`.`name` ASC"
        );
    }
}
