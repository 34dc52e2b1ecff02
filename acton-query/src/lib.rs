//! # acton-query
//!
//! Declarative filtered, sorted and paginated queries over SQL data sources.
//!
//! A caller describes what it wants (which page, which filters, which order)
//! as a [`QueryDescriptor`] for a target type. The executor wraps the type's
//! base query, applies the filters through a registry of named operators,
//! runs a data statement and a count statement, and maps every row back into
//! the target type.
//!
//! ## Features
//!
//! - **Pluggable operators**: `equals`, `lt`, `lte`, `gt`, `gte`, `contains`, `in`, plus your own
//! - **Metadata-driven mapping**: logical property names, source aliases, case-insensitive columns
//! - **Consistent totals**: the count statement reuses the filtered statement before paging
//! - **Parameter binding**: every value is bound, never spliced into SQL
//! - **Backends**: PostgreSQL and SQLite through sqlx
//! - **Configuration**: Figment with TOML files and `ACTON_QUERY_` environment overrides
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use acton_query::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! #[serde(default, rename_all = "camelCase")]
//! struct Sales {
//!     item_name: String,
//!     store_name: String,
//!     quantity: i32,
//! }
//!
//! impl DataTable for Sales {
//!     fn metadata() -> TableMetadata {
//!         TableMetadata::new()
//!             .with_data_table("SELECT * FROM sales")
//!             .with_property(Property::text("itemName").with_column("item_name"))
//!             .with_property(Property::text("storeName").with_column("store_name"))
//!             .with_property(Property::integer("quantity").with_column("qty"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let resolver = PropertyResolver::builder()
//!         .with_queries_dir(&config.query.queries_dir)
//!         .register::<Sales>()
//!         .build()?;
//!
//!     let executor = QueryExecutor::new(
//!         PgDataSource::connect(&config.database).await?,
//!         Arc::new(FilterRegistry::builtin().clone()),
//!         Arc::new(resolver),
//!     )
//!     .with_config(config.query.clone());
//!
//!     let descriptor = QueryDescriptor::<Sales>::new()
//!         .with_page(0)
//!         .with_size(20)
//!         .with_filter(PropertyFilter::new("itemName", "item_name", "contains", "SHIRT"))
//!         .with_order("qty", SortOrder::Desc);
//!
//!     let page = executor.fetch(&descriptor).await?;
//!     tracing::info!(rows = page.data.len(), total = page.total, "Fetched sales");
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod filter;
pub mod mapper;
pub mod metadata;
pub mod observability;
pub mod params;
pub mod source;
pub mod value;

#[cfg(all(test, feature = "sqlite"))]
mod test_support;

pub use builder::{QueryBuilder, QueryPlan};
pub use config::{Config, DatabaseConfig, LoggingConfig, QueryConfig};
pub use descriptor::{PageWindow, PropertyFilter, QueryDescriptor, SortOrder};
pub use dialect::{BoundStatement, Dialect};
pub use error::{
    ConfigurationError, ConfigurationErrorKind, DataSourceError, DataSourceErrorKind, Error,
    MappingError, Result,
};
pub use executor::{QueryExecutor, QueryResult};
pub use filter::{FilterOperator, FilterRegistry, FilterRegistryBuilder};
pub use mapper::RowMapper;
pub use metadata::{DataTable, Property, PropertyResolver, PropertyResolverBuilder, TableMetadata};
pub use observability::init_tracing;
pub use source::{DataSource, RawRow};
pub use value::{Parameters, SqlValue, ValueKind};

#[cfg(feature = "postgres")]
pub use source::PgDataSource;
#[cfg(feature = "sqlite")]
pub use source::SqliteDataSource;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, QueryConfig};
    pub use crate::descriptor::{PropertyFilter, QueryDescriptor, SortOrder};
    pub use crate::error::{ConfigurationError, DataSourceError, Error, MappingError, Result};
    pub use crate::executor::{QueryExecutor, QueryResult};
    pub use crate::filter::{FilterOperator, FilterRegistry};
    pub use crate::metadata::{DataTable, Property, PropertyResolver, TableMetadata};
    pub use crate::observability::init_tracing;
    pub use crate::source::{DataSource, RawRow};
    pub use crate::value::{Parameters, SqlValue, ValueKind};

    #[cfg(feature = "postgres")]
    pub use crate::source::PgDataSource;

    #[cfg(feature = "sqlite")]
    pub use crate::source::SqliteDataSource;

    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
