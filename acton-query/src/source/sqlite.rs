//! SQLite data source
//!
//! Columns are decoded by the storage class of each value rather than the
//! declared column type, so expression columns of a wrapped base query decode
//! the same way as table columns.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value as JsonValue;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use super::{DataSource, RawRow};
use crate::config::DatabaseConfig;
use crate::dialect::{BoundStatement, Dialect};
use crate::error::DataSourceError;
use crate::value::SqlValue;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Data source over an SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteDataSource {
    pool: SqlitePool,
}

impl SqliteDataSource {
    /// Wrap an existing pool
    ///
    /// `contains` relies on case-sensitive `LIKE`; pools not opened through
    /// [`SqliteDataSource::connect`] should set `PRAGMA case_sensitive_like = ON`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool from database settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataSourceError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .pragma("case_sensitive_like", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(url = %config.sanitized_url(), error = %e, "Failed to open SQLite database");
                DataSourceError::from(e)
            })?;

        tracing::info!(
            "SQLite pool created: max={}, min={}",
            config.max_connections,
            config.min_connections
        );
        Ok(Self { pool })
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DataSource for SqliteDataSource {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn fetch<'a>(
        &'a self,
        statement: &'a BoundStatement,
    ) -> BoxStream<'a, Result<RawRow, DataSourceError>> {
        let query = statement
            .values
            .iter()
            .fold(sqlx::query(&statement.sql), bind_value);

        query
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(DataSourceError::from)
                    .and_then(|row| decode_row(&row))
            })
            .boxed()
    }

    async fn count(&self, statement: &BoundStatement) -> Result<i64, DataSourceError> {
        let query = statement
            .values
            .iter()
            .fold(sqlx::query(&statement.sql), bind_value);

        let row = query.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null | SqlValue::List(_) => query.bind(None::<String>),
        SqlValue::Boolean(b) => query.bind(*b),
        SqlValue::Integer(n) => query.bind(*n),
        SqlValue::Float(n) => query.bind(*n),
        SqlValue::Text(s) => query.bind(s.as_str()),
    }
}

fn decode_row(row: &SqliteRow) -> Result<RawRow, DataSourceError> {
    let mut raw = RawRow::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        raw.push(column.name(), decode_column(row, index)?);
    }
    Ok(raw)
}

fn decode_column(row: &SqliteRow, index: usize) -> Result<JsonValue, DataSourceError> {
    let storage = {
        let value = row.try_get_raw(index)?;
        if value.is_null() {
            return Ok(JsonValue::Null);
        }
        value.type_info().name().to_string()
    };

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => JsonValue::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
            .map_or(JsonValue::Null, JsonValue::Number),
        "TEXT" | "DATE" | "TIME" | "DATETIME" => {
            JsonValue::String(row.try_get_unchecked::<String, _>(index)?)
        }
        other => {
            return Err(DataSourceError::decode(format!(
                "unsupported SQLite value type {} at index {}",
                other, index
            )))
        }
    };
    Ok(value)
}
