//! Query execution
//!
//! [`QueryExecutor`] ties the pieces together for one request:
//!
//! 1. every filter operator is resolved against the registry
//! 2. the target's base query is looked up
//! 3. a [`QueryPlan`](crate::QueryPlan) is derived and bound for the source's dialect
//! 4. the data statement's rows are streamed and mapped into `T`
//! 5. the count statement supplies the total
//!
//! Configuration problems surface before the data source is touched.
//!
//! # Example
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
//!     store_name: String,
//!     quantity: i32,
//! }
//!
//! impl DataTable for Sales {
//!     fn metadata() -> TableMetadata {
//!         TableMetadata::new()
//!             .with_data_table("sales.sql")
//!             .with_property(Property::text("storeName").with_column("store_name"))
//!             .with_property(Property::integer("quantity").with_column("qty"))
//!     }
//! }
//!
//! # async fn run() -> acton_query::Result<()> {
//! let config = Config::load()?;
//! let resolver = PropertyResolver::builder()
//!     .with_queries_dir(&config.query.queries_dir)
//!     .register::<Sales>()
//!     .build()?;
//! let source = SqliteDataSource::connect(&config.database).await?;
//!
//! let executor = QueryExecutor::new(
//!     source,
//!     Arc::new(FilterRegistry::builtin().clone()),
//!     Arc::new(resolver),
//! )
//! .with_config(config.query.clone());
//!
//! let descriptor = QueryDescriptor::<Sales>::from_params(
//!     [("page", "0"), ("size", "20"), ("quantity", "2"), ("filter", "quantity,lt")],
//!     executor.resolver(),
//! )?;
//! let page = executor.fetch(&descriptor).await?;
//! println!("{} of {}", page.data.len(), page.total);
//! # Ok(())
//! # }
//! ```

use std::any::type_name;
use std::sync::Arc;

use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::builder::QueryBuilder;
use crate::config::QueryConfig;
use crate::descriptor::QueryDescriptor;
use crate::dialect::BoundStatement;
use crate::error::{DataSourceError, Error, Result};
use crate::filter::FilterRegistry;
use crate::mapper::convert_row;
use crate::metadata::PropertyResolver;
use crate::source::DataSource;
use crate::value::Parameters;

/// One page of results with the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<T> {
    /// Rows of the requested page, in statement order
    pub data: Vec<T>,
    /// Rows matching the filters, ignoring LIMIT/OFFSET
    pub total: u64,
}

impl<T> QueryResult<T> {
    /// Create a result
    pub fn new(data: Vec<T>, total: u64) -> Self {
        Self { data, total }
    }

    /// Rows in this page
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if this page holds no rows
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Transform every row, keeping the total
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResult<U> {
        QueryResult {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Runs descriptors against a data source
#[derive(Debug, Clone)]
pub struct QueryExecutor<S> {
    source: S,
    registry: Arc<FilterRegistry>,
    resolver: Arc<PropertyResolver>,
    config: QueryConfig,
}

impl<S: DataSource> QueryExecutor<S> {
    /// Create an executor with default query settings
    pub fn new(source: S, registry: Arc<FilterRegistry>, resolver: Arc<PropertyResolver>) -> Self {
        Self {
            source,
            registry,
            resolver,
            config: QueryConfig::default(),
        }
    }

    /// Replace the query settings
    #[must_use]
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Data source in use
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Filter registry in use
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Property resolver in use
    pub fn resolver(&self) -> &PropertyResolver {
        &self.resolver
    }

    /// Run a descriptor without extra parameters
    pub async fn fetch<T>(&self, descriptor: &QueryDescriptor<T>) -> Result<QueryResult<T>>
    where
        T: DeserializeOwned + 'static,
    {
        self.execute(descriptor, &Parameters::new()).await
    }

    /// Run a descriptor, binding `extra` parameters into the base query
    #[tracing::instrument(level = "debug", skip_all, fields(target_type = type_name::<T>()))]
    pub async fn execute<T>(
        &self,
        descriptor: &QueryDescriptor<T>,
        extra: &Parameters,
    ) -> Result<QueryResult<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let result = self.run(descriptor, extra).await;
        if let Err(ref err) = result {
            report_failure::<T>(err);
        }
        result
    }

    async fn run<T>(&self, descriptor: &QueryDescriptor<T>, extra: &Parameters) -> Result<QueryResult<T>>
    where
        T: DeserializeOwned + 'static,
    {
        for filter in descriptor.filters() {
            self.registry.lookup(&filter.operation)?;
        }

        let table = self.resolver.table::<T>()?;
        let plan = QueryBuilder::new(&self.registry)
            .with_max_page_size(self.config.page_cap())
            .build(descriptor, table.base_query()?, extra)?;

        let dialect = self.source.dialect();
        let data_statement = dialect.bind(plan.data_statement(), plan.parameters())?;
        let count_statement = dialect.bind(plan.count_statement(), plan.parameters())?;
        self.log_statement("data", &data_statement);
        self.log_statement("count", &count_statement);

        let mut rows = self.source.fetch(&data_statement);
        let mut data = Vec::new();
        while let Some(row) = rows.try_next().await? {
            data.push(convert_row::<T>(table, row)?);
        }
        drop(rows);

        let total = self.source.count(&count_statement).await?;
        let total = u64::try_from(total).map_err(|_| {
            DataSourceError::decode(format!("count statement returned {}", total))
        })?;

        tracing::debug!(rows = data.len(), total, "Query executed");
        Ok(QueryResult::new(data, total))
    }

    fn log_statement(&self, kind: &str, statement: &BoundStatement) {
        if self.config.log_statements {
            tracing::debug!(
                kind,
                sql = %statement.sql,
                params = ?statement.values,
                "Executing statement"
            );
        } else {
            tracing::trace!(kind, sql = %statement.sql, "Executing statement");
        }
    }
}

fn report_failure<T>(err: &Error) {
    let target_type = type_name::<T>();
    match err {
        Error::Configuration(e) => {
            tracing::error!(target_type, kind = %e.kind, error = %e, "Query rejected");
        }
        Error::DataSource(e) => {
            tracing::warn!(
                target_type,
                kind = %e.kind,
                retriable = e.is_retriable(),
                error = %e,
                "Data source failed"
            );
        }
        other => {
            tracing::warn!(target_type, error = %other, "Query failed");
        }
    }
}
