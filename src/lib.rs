pub mod config;
pub mod domain;
pub mod infra;
pub mod usecase;

pub use config::GridConfig;
pub use domain::entities::aggregate::{AggregateFunction, SqlExp};
pub use domain::entities::field::{ColumnRef, TableRef, TypeKind};
pub use domain::entities::filter::{FilterOption, FilterSpec, FilterValue, FullTextMode, FullTextSearch};
pub use domain::entities::order::{OrderBy, SortDirection};
pub use domain::entities::value::{Row, Value};
pub use infra::cache::{InMemoryCountCache, SqliteCountCache};
pub use infra::sql::dialect::{Dialect, MySqlDialect, SqliteDialect};
pub use infra::sql::select::{QuerySignature, Select};
pub use infra::sqlite::source::{SqliteSource, SqliteSourceBuilder};
pub use usecase::ports::cache::{CacheError, CountCache};
pub use usecase::ports::source::{DataSource, SourceError};
pub use usecase::services::grid_service::{GridPage, GridRequest, GridService};
