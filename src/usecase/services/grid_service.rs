use crate::config::GridConfig;
use crate::domain::entities::filter::{FilterOption, FilterSpec};
use crate::domain::entities::order::OrderBy;
use crate::domain::entities::value::Row;
use crate::usecase::ports::source::{DataSource, SourceError};

/// What a grid asks for in one request. `page` is zero-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRequest {
    pub filters: FilterSpec,
    pub order: Vec<OrderBy>,
    pub page: u64,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridPage {
    pub rows: Vec<Row>,
    pub total: u64,
    pub page: u64,
    pub page_count: u64,
}

/// Drives one data source through one grid request.
pub struct GridService {
    source: Box<dyn DataSource>,
    config: GridConfig,
}

impl GridService {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self::with_config(source, GridConfig::default())
    }

    pub fn with_config(source: Box<dyn DataSource>, config: GridConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn DataSource {
        self.source.as_mut()
    }

    pub fn into_source(self) -> Box<dyn DataSource> {
        self.source
    }

    /// Applies filters and order, then fetches the requested page and the total.
    ///
    /// Filters and order of the previous request are dropped first, so one
    /// service can serve any number of requests. A request without a page
    /// size falls back to the configured one.
    pub fn load_page(&mut self, request: &GridRequest) -> Result<GridPage, SourceError> {
        let page_size = request.page_size.or(self.config.page_size);
        self.source.clear_filters();
        self.source.reset_order();
        self.source.apply_filters(&request.filters);

        for (idx, entry) in request.order.iter().enumerate() {
            self.source
                .build_query_order(&entry.field, entry.direction, idx == 0)?;
        }

        match page_size {
            Some(page_size) if page_size > 0 => {
                self.source
                    .set_limit(page_size, request.page.saturating_mul(page_size));
            }
            _ => self.source.reset_limit(),
        }

        let rows = self.source.execute()?;
        let total = self.source.num_results()?;
        let page_count = match page_size {
            Some(page_size) if page_size > 0 => total.div_ceil(page_size),
            _ => u64::from(total > 0),
        };

        Ok(GridPage {
            rows,
            total,
            page: request.page,
            page_count,
        })
    }

    /// Dropdown options for `field`: declared enum members when the column has
    /// them, otherwise distinct `(field, value_field)` pairs from the data.
    pub fn filter_options(
        &self,
        field: &str,
        value_field: &str,
    ) -> Result<Vec<FilterOption>, SourceError> {
        let declared = self.source.filter_values_for_field(field)?;
        if !declared.is_empty() {
            return Ok(declared);
        }
        self.source.distinct_values_for_filters(field, value_field, None)
    }

    /// Identifiers of every filtered row of `table`, composite keys joined
    /// with the configured separator.
    pub fn mass_action_ids(&self, table: &str, fields: &[String]) -> Result<Vec<String>, SourceError> {
        self.source
            .mass_action_ids(table, fields, &self.config.mass_action_separator)
    }
}
