use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::entities::aggregate::SqlExp;
use crate::domain::entities::field::TypeKind;
use crate::domain::entities::filter::{FilterOption, FilterSpec, FilterValue, FullTextSearch};
use crate::domain::entities::order::{OrderBy, SortDirection};
use crate::domain::entities::value::{Row, Value};
use crate::usecase::ports::cache::CountCache;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("table {0} has no primary key or unique index")]
    MissingIdentifier(String),
    #[error("invalid aggregate function: {0}")]
    InvalidAggregate(String),
    #[error("{0}")]
    Execution(String),
}

impl SourceError {
    /// Keeps the whole `anyhow` context chain in the message.
    pub fn execution(err: anyhow::Error) -> Self {
        SourceError::Execution(format!("{err:#}"))
    }
}

/// Backend contract behind a data grid.
///
/// One value holds the filter, order and pagination state of a single grid
/// request. Filter problems never fail a call: an invalid filter is dropped
/// and the method reports `false`. Metadata lookups on unknown tables or
/// fields, and backend failures, are returned as errors.
pub trait DataSource: Send + Sync {
    /// Runs the assembled query and returns the current page of rows.
    fn execute(&mut self) -> Result<Vec<Row>, SourceError>;

    /// Total rows matching the current filters, ignoring pagination.
    fn num_results(&mut self) -> Result<u64, SourceError>;

    fn set_num_results(&mut self, total: u64);

    /// Alias to table name for the main table and every join.
    fn table_list(&self) -> BTreeMap<String, String>;

    /// Legal values of an enum or set field, each labelled with itself.
    ///
    /// Other fields yield an empty list; callers fall back to
    /// [`DataSource::distinct_values_for_filters`].
    fn filter_values_for_field(&self, field: &str) -> Result<Vec<FilterOption>, SourceError>;

    fn field_type(&self, field: &str) -> Result<TypeKind, SourceError>;

    fn main_table(&self) -> &str;

    fn build_query_order(
        &mut self,
        field: &str,
        direction: SortDirection,
        reset: bool,
    ) -> Result<(), SourceError>;

    /// Opaque query handle for trusted callers that know the backend type.
    fn select_object(&self) -> &dyn Any;

    /// The highest-priority order entry, if any.
    fn select_order(&self) -> Option<OrderBy>;

    fn distinct_values_for_filters(
        &self,
        field: &str,
        value_field: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<FilterOption>, SourceError>;

    /// Evaluates a nested aggregate over the current query plus `filters`.
    fn sql_exp(&self, exp: &SqlExp, filters: &FilterSpec) -> Result<Value, SourceError>;

    /// Adds a filter predicate; returns whether it was applied.
    fn add_filter(&mut self, field: &str, value: &FilterValue) -> bool;

    fn add_full_text_search(&mut self, field: &str, search: &FullTextSearch) -> bool;

    /// Drops every filter and full-text predicate; base conditions stay.
    fn clear_filters(&mut self);

    /// Inserts one record and returns its row id.
    fn insert(&mut self, table: &str, values: &[(String, Value)]) -> Result<i64, SourceError>;

    fn reset_order(&mut self);

    fn set_limit(&mut self, count: u64, offset: u64);

    fn reset_limit(&mut self);

    fn set_cache(&mut self, cache: Arc<dyn CountCache>);

    /// One opaque id per row of the current query, identifier values joined by `separator`.
    fn mass_action_ids(
        &self,
        table: &str,
        fields: &[String],
        separator: &str,
    ) -> Result<Vec<String>, SourceError>;

    fn quote_value(&self, value: &str) -> String;

    fn values_for_filters_from_table(
        &self,
        table: &str,
        field: &str,
        value_field: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<FilterOption>, SourceError>;

    fn identifier_columns(&self, table: &str) -> Result<Vec<String>, SourceError>;

    /// Applies every entry of `filters`; returns how many produced a predicate.
    fn apply_filters(&mut self, filters: &FilterSpec) -> usize {
        filters
            .iter()
            .filter(|(field, value)| self.add_filter(field, value))
            .count()
    }
}
