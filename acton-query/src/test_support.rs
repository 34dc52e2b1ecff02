//! Shared fixtures for tests that run against an in-memory SQLite database

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::{DatabaseConfig, QueryConfig};
use crate::executor::QueryExecutor;
use crate::filter::FilterRegistry;
use crate::metadata::{DataTable, Property, PropertyResolver, TableMetadata};
use crate::source::SqliteDataSource;

const SALES_FIXTURE: &str = include_str!("../fixtures/sales.sql");

pub(crate) fn queries_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("queries")
}

fn sales_properties(metadata: TableMetadata) -> TableMetadata {
    metadata
        .with_property(Property::integer("itemId").with_column("item_id"))
        .with_property(Property::text("itemName").with_column("item_name"))
        .with_property(Property::integer("storeId").with_column("store_id"))
        .with_property(Property::text("storeName").with_column("store_name"))
        .with_property(Property::integer("quantity").with_column("qty"))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Sales {
    pub item_id: i64,
    pub item_name: String,
    pub store_id: i64,
    pub store_name: String,
    pub quantity: i32,
}

impl DataTable for Sales {
    fn metadata() -> TableMetadata {
        sales_properties(TableMetadata::new().with_data_table("sales.sql"))
    }
}

/// Sales of one store, chosen through the `storeName` extra parameter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub(crate) struct StoreSales(pub Sales);

impl DataTable for StoreSales {
    fn metadata() -> TableMetadata {
        sales_properties(
            TableMetadata::new()
                .with_data_table("SELECT * FROM sales WHERE store_name = :storeName"),
        )
    }
}

pub(crate) fn resolver() -> PropertyResolver {
    PropertyResolver::builder()
        .with_queries_dir(queries_dir())
        .register::<Sales>()
        .register::<StoreSales>()
        .build()
        .expect("fixture metadata is valid")
}

pub(crate) async fn sqlite_source() -> SqliteDataSource {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let source = SqliteDataSource::connect(&config)
        .await
        .expect("in-memory database opens");
    sqlx::raw_sql(SALES_FIXTURE)
        .execute(source.pool())
        .await
        .expect("fixture loads");
    source
}

pub(crate) async fn executor_with(config: QueryConfig) -> QueryExecutor<SqliteDataSource> {
    QueryExecutor::new(
        sqlite_source().await,
        Arc::new(FilterRegistry::builtin().clone()),
        Arc::new(resolver()),
    )
    .with_config(config)
}

pub(crate) async fn executor() -> QueryExecutor<SqliteDataSource> {
    executor_with(QueryConfig::default()).await
}
