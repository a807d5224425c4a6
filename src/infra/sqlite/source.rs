use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::GridConfig;
use crate::domain::entities::aggregate::SqlExp;
use crate::domain::entities::field::{split_field, ColumnInfo, ColumnRef, TableInfo, TableRef, TypeKind};
use crate::domain::entities::filter::{FilterOption, FilterSpec, FilterValue, FullTextSearch};
use crate::domain::entities::order::{OrderBy, SortDirection};
use crate::domain::entities::predicate::Predicate;
use crate::domain::entities::value::{Row, Value};
use crate::infra::sql::conditions::{full_text_condition, scalar_condition};
use crate::infra::sql::dialect::{Dialect, SqliteDialect};
use crate::infra::sql::select::{JoinedTable, QuerySignature, Select};
use crate::infra::sqlite::queries::{
    count_rows, fetch_joined, fetch_pairs, fetch_rows, fetch_scalar, insert_row,
};
use crate::infra::sqlite::schema::{identifier_columns, load_table_info, open_connection};
use crate::usecase::ports::cache::CountCache;
use crate::usecase::ports::source::{DataSource, SourceError};

type ListedTable = (String, TableInfo);

fn find_table<'a>(tables: &'a [ListedTable], name: &str) -> Option<&'a ListedTable> {
    tables
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .or_else(|| {
            tables
                .iter()
                .find(|(_, info)| info.name.eq_ignore_ascii_case(name))
        })
}

/// Resolves `column` or `alias.column`; bare names search the main table first.
fn resolve_field<'a>(tables: &'a [ListedTable], field: &str) -> Option<(ColumnRef, &'a ColumnInfo)> {
    let (alias, column) = split_field(field);
    match alias {
        Some(alias) => {
            let (alias, info) = find_table(tables, alias)?;
            let info = info.column(column)?;
            Some((ColumnRef::new(alias.clone(), info.name.clone()), info))
        }
        None => tables.iter().find_map(|(alias, info)| {
            info.column(column)
                .map(|info| (ColumnRef::new(alias.clone(), info.name.clone()), info))
        }),
    }
}

fn require_field<'a>(
    tables: &'a [ListedTable],
    field: &str,
) -> Result<(ColumnRef, &'a ColumnInfo), SourceError> {
    resolve_field(tables, field).ok_or_else(|| SourceError::UnknownField(field.to_string()))
}

fn require_table_info(conn: &Connection, table: &str) -> Result<TableInfo, SourceError> {
    load_table_info(conn, table)
        .map_err(SourceError::execution)?
        .ok_or_else(|| SourceError::UnknownTable(table.to_string()))
}

pub struct SqliteSourceBuilder {
    db_path: PathBuf,
    main: TableRef,
    joins: Vec<TableRef>,
    conditions: Vec<String>,
    cache: Option<Arc<dyn CountCache>>,
    config: GridConfig,
}

impl SqliteSourceBuilder {
    /// Adds a joined table; it must carry a join built with
    /// [`TableRef::inner_join`] or [`TableRef::left_join`].
    pub fn join(mut self, table: TableRef) -> Self {
        self.joins.push(table);
        self
    }

    /// Trusted SQL condition that restricts rows and filter dropdowns alike.
    pub fn condition(mut self, sql: impl Into<String>) -> Self {
        self.conditions.push(sql.into());
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CountCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads metadata for every listed table; unknown tables or join columns fail here.
    pub fn build(self) -> Result<SqliteSource, SourceError> {
        let conn = open_connection(&self.db_path).map_err(SourceError::execution)?;

        let mut tables = Vec::with_capacity(self.joins.len() + 1);
        for table in std::iter::once(&self.main).chain(&self.joins) {
            let info = require_table_info(&conn, &table.name)?;
            tables.push((table.alias().to_string(), info));
        }

        let mut select = Select::new(self.main);
        for table in self.joins {
            let Some(join) = table.join.clone() else {
                return Err(SourceError::Execution(format!(
                    "joined table {} has no join condition",
                    table.name
                )));
            };
            let mut on = Vec::with_capacity(join.on.len());
            for (left, right) in &join.on {
                let (left, _) = require_field(&tables, left)?;
                let (right, _) = require_field(&tables, right)?;
                on.push((left, right));
            }
            let columns: Vec<String> = find_table(&tables, table.alias())
                .map(|(_, info)| info.columns.iter().map(|column| column.name.clone()).collect())
                .unwrap_or_default();
            select.add_join(JoinedTable {
                table,
                kind: join.kind,
                on,
                columns,
            });
        }

        for condition in self.conditions {
            select.add_base_condition(condition);
        }
        if let Some(page_size) = self.config.page_size {
            select.set_limit(page_size, 0);
        }

        let scope = std::fs::canonicalize(&self.db_path)
            .unwrap_or_else(|_| self.db_path.clone())
            .display()
            .to_string();

        Ok(SqliteSource {
            db_path: self.db_path,
            scope,
            dialect: SqliteDialect,
            tables,
            select,
            cache: self.cache,
            config: self.config,
            num_results: None,
        })
    }
}

/// Data source over a SQLite database file.
///
/// A connection is opened per operation, so the value can be handed to any
/// thread; the count cache is the only state shared between requests.
pub struct SqliteSource {
    db_path: PathBuf,
    /// Canonical database path, part of every cache key.
    scope: String,
    dialect: SqliteDialect,
    tables: Vec<ListedTable>,
    select: Select,
    cache: Option<Arc<dyn CountCache>>,
    config: GridConfig,
    num_results: Option<u64>,
}

impl SqliteSource {
    pub fn builder(db_path: impl Into<PathBuf>, main: TableRef) -> SqliteSourceBuilder {
        SqliteSourceBuilder {
            db_path: db_path.into(),
            main,
            joins: Vec::new(),
            conditions: Vec::new(),
            cache: None,
            config: GridConfig::default(),
        }
    }

    pub fn new(db_path: impl Into<PathBuf>, main_table: &str) -> Result<Self, SourceError> {
        Self::builder(db_path, TableRef::new(main_table)).build()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    pub fn select(&self) -> &Select {
        &self.select
    }

    /// Direct access for trusted composition; drops the memoized count.
    pub fn select_mut(&mut self) -> &mut Select {
        self.num_results = None;
        &mut self.select
    }

    pub fn signature(&self) -> QuerySignature {
        self.select.scoped_signature(&self.dialect, &self.scope)
    }

    fn connect(&self) -> Result<Connection, SourceError> {
        open_connection(&self.db_path).map_err(SourceError::execution)
    }

    fn cache_key(&self) -> String {
        self.signature().cache_key(&self.config.cache_key_prefix)
    }

    fn cached_count(&self, key: &str) -> Option<u64> {
        let cache = self.cache.as_ref()?;
        match cache.load(key) {
            Ok(total) => total,
            Err(err) => {
                warn!(%err, key, "count cache lookup failed, recomputing");
                None
            }
        }
    }

    fn remember_count(&self, key: &str, total: u64) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(key, total) {
                warn!(%err, key, "count cache store failed");
            }
        }
    }

    fn filter_predicate(&self, field: &str, value: &FilterValue) -> Option<Predicate> {
        if value.is_empty() {
            return None;
        }

        let predicate = match value {
            FilterValue::Empty => None,
            FilterValue::Scalar(raw) => {
                let Some((column, info)) = resolve_field(&self.tables, field) else {
                    debug!(field, "dropping filter on field outside the table list");
                    return None;
                };
                scalar_condition(&column, info, raw)
            }
            FilterValue::FullText(search) => self.full_text_predicate(field, search),
        };

        if predicate.is_none() {
            debug!(field, ?value, "dropping filter value that does not validate");
        }
        predicate
    }

    fn full_text_predicate(&self, field: &str, search: &FullTextSearch) -> Option<Predicate> {
        let indexes = if search.indexes.is_empty() {
            vec![field.to_string()]
        } else {
            search.indexes.clone()
        };

        let mut columns = Vec::with_capacity(indexes.len());
        for index in &indexes {
            let Some((column, _)) = resolve_field(&self.tables, index) else {
                debug!(field, index = index.as_str(), "full-text index outside the table list");
                return None;
            };
            columns.push(column);
        }
        full_text_condition(columns, search)
    }

    fn push_predicate(&mut self, predicate: Predicate) {
        self.select.add_predicate(predicate);
        self.num_results = None;
    }

    fn distinct_options(
        &self,
        select: &Select,
        tables: &[ListedTable],
        field: &str,
        value_field: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<FilterOption>, SourceError> {
        let (field_column, _) = require_field(tables, field)?;
        let (value_column, _) = require_field(tables, value_field)?;
        let (order_column, direction) = match order {
            Some(order) => (require_field(tables, &order.field)?.0, order.direction),
            None => (value_column.clone(), SortDirection::Asc),
        };

        let sql = select.distinct_pairs_sql(
            &self.dialect,
            &field_column,
            &value_column,
            &order_column,
            direction,
        );
        debug!(%sql, "loading filter values");

        let conn = self.connect()?;
        fetch_pairs(&conn, &sql).map_err(SourceError::execution)
    }
}

impl DataSource for SqliteSource {
    fn execute(&mut self) -> Result<Vec<Row>, SourceError> {
        let sql = self.select.to_sql(&self.dialect);
        debug!(%sql, "executing grid query");

        let conn = self.connect()?;
        fetch_rows(&conn, &sql).map_err(SourceError::execution)
    }

    fn num_results(&mut self) -> Result<u64, SourceError> {
        if let Some(total) = self.num_results {
            return Ok(total);
        }

        let key = self.cache_key();
        if let Some(total) = self.cached_count(&key) {
            debug!(key, total, "row count served from cache");
            self.num_results = Some(total);
            return Ok(total);
        }

        let sql = self.select.count_sql(&self.dialect);
        debug!(%sql, "counting grid rows");
        let conn = self.connect()?;
        let total = count_rows(&conn, &sql).map_err(SourceError::execution)?;

        self.remember_count(&key, total);
        self.num_results = Some(total);
        Ok(total)
    }

    fn set_num_results(&mut self, total: u64) {
        let key = self.cache_key();
        self.remember_count(&key, total);
        self.num_results = Some(total);
    }

    fn table_list(&self) -> BTreeMap<String, String> {
        self.tables
            .iter()
            .map(|(alias, info)| (alias.clone(), info.name.clone()))
            .collect()
    }

    fn filter_values_for_field(&self, field: &str) -> Result<Vec<FilterOption>, SourceError> {
        let (_, info) = require_field(&self.tables, field)?;
        if !info.kind.is_enumerable() {
            return Ok(Vec::new());
        }
        Ok(info
            .allowed_values
            .iter()
            .map(|value| FilterOption::same(value.clone()))
            .collect())
    }

    fn field_type(&self, field: &str) -> Result<TypeKind, SourceError> {
        let (_, info) = require_field(&self.tables, field)?;
        Ok(info.kind.clone())
    }

    fn main_table(&self) -> &str {
        &self.select.main().name
    }

    fn build_query_order(
        &mut self,
        field: &str,
        direction: SortDirection,
        reset: bool,
    ) -> Result<(), SourceError> {
        let (column, _) = require_field(&self.tables, field)?;
        self.select
            .build_order(OrderBy::new(field.trim(), direction), column, reset);
        self.num_results = None;
        Ok(())
    }

    fn select_object(&self) -> &dyn Any {
        &self.select
    }

    fn select_order(&self) -> Option<OrderBy> {
        self.select.order().next().cloned()
    }

    fn distinct_values_for_filters(
        &self,
        field: &str,
        value_field: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<FilterOption>, SourceError> {
        self.distinct_options(&self.select, &self.tables, field, value_field, order)
    }

    fn sql_exp(&self, exp: &SqlExp, filters: &FilterSpec) -> Result<Value, SourceError> {
        let (column, _) = require_field(&self.tables, &exp.value)?;
        let extra = filters
            .iter()
            .filter_map(|(field, value)| self.filter_predicate(field, value))
            .collect::<Vec<_>>();

        let sql = self
            .select
            .aggregate_sql(&self.dialect, exp, &column, &extra)
            .ok_or_else(|| SourceError::InvalidAggregate("no aggregate function given".to_string()))?;
        debug!(%sql, expression = %exp.expression(), "evaluating aggregate");

        let conn = self.connect()?;
        fetch_scalar(&conn, &sql).map_err(SourceError::execution)
    }

    fn add_filter(&mut self, field: &str, value: &FilterValue) -> bool {
        match self.filter_predicate(field, value) {
            Some(predicate) => {
                self.push_predicate(predicate);
                true
            }
            None => false,
        }
    }

    fn add_full_text_search(&mut self, field: &str, search: &FullTextSearch) -> bool {
        self.add_filter(field, &FilterValue::FullText(search.clone()))
    }

    fn clear_filters(&mut self) {
        self.select.clear_predicates();
        self.num_results = None;
    }

    fn insert(&mut self, table: &str, values: &[(String, Value)]) -> Result<i64, SourceError> {
        let conn = self.connect()?;
        let info = require_table_info(&conn, table)?;

        let mut columns = Vec::with_capacity(values.len());
        for (column, _) in values {
            let column = info
                .column(column)
                .ok_or_else(|| SourceError::UnknownField(format!("{}.{column}", info.name)))?;
            columns.push(self.dialect.quote_identifier(&column.name));
        }
        let row_values = values
            .iter()
            .map(|(_, value)| value.clone())
            .collect::<Vec<_>>();

        let id = insert_row(
            &conn,
            &self.dialect.quote_identifier(&info.name),
            &columns,
            &row_values,
        )
        .map_err(SourceError::execution)?;
        debug!(table = info.name.as_str(), id, "inserted grid record");

        self.num_results = None;
        Ok(id)
    }

    fn reset_order(&mut self) {
        self.select.reset_order();
        self.num_results = None;
    }

    fn set_limit(&mut self, count: u64, offset: u64) {
        self.select.set_limit(count, offset);
    }

    fn reset_limit(&mut self) {
        self.select.reset_limit();
    }

    fn set_cache(&mut self, cache: Arc<dyn CountCache>) {
        self.cache = Some(cache);
    }

    fn mass_action_ids(
        &self,
        table: &str,
        fields: &[String],
        separator: &str,
    ) -> Result<Vec<String>, SourceError> {
        let (alias, info) =
            find_table(&self.tables, table).ok_or_else(|| SourceError::UnknownTable(table.to_string()))?;
        let conn = self.connect()?;

        let names = if fields.is_empty() {
            let names = identifier_columns(&conn, info).map_err(SourceError::execution)?;
            if names.is_empty() {
                return Err(SourceError::MissingIdentifier(info.name.clone()));
            }
            names
        } else {
            fields.to_vec()
        };

        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            let column = info
                .column(name)
                .ok_or_else(|| SourceError::UnknownField(format!("{alias}.{name}")))?;
            columns.push(ColumnRef::new(alias.clone(), column.name.clone()));
        }

        let sql = self.select.columns_sql(&self.dialect, &columns);
        debug!(%sql, "collecting mass action ids");
        fetch_joined(&conn, &sql, separator).map_err(SourceError::execution)
    }

    fn quote_value(&self, value: &str) -> String {
        self.dialect.quote_value(value)
    }

    fn values_for_filters_from_table(
        &self,
        table: &str,
        field: &str,
        value_field: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<FilterOption>, SourceError> {
        let conn = self.connect()?;
        let info = require_table_info(&conn, table)?;
        drop(conn);

        let listed = vec![(info.name.clone(), info)];
        let select = Select::new(TableRef::new(listed[0].0.clone()));
        self.distinct_options(&select, &listed, field, value_field, order)
    }

    fn identifier_columns(&self, table: &str) -> Result<Vec<String>, SourceError> {
        let conn = self.connect()?;
        let info = require_table_info(&conn, table)?;
        let columns = identifier_columns(&conn, &info).map_err(SourceError::execution)?;
        if columns.is_empty() {
            return Err(SourceError::MissingIdentifier(info.name));
        }
        Ok(columns)
    }
}
