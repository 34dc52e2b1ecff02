//! PostgreSQL data source

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use super::{DataSource, RawRow};
use crate::config::DatabaseConfig;
use crate::dialect::{BoundStatement, Dialect};
use crate::error::DataSourceError;
use crate::value::SqlValue;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Data source over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgDataSource {
    pool: PgPool,
}

impl PgDataSource {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from database settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataSourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                tracing::error!(
                    url = %config.sanitized_url(),
                    error = %e,
                    "Failed to connect to PostgreSQL"
                );
                DataSourceError::from(e)
            })?;

        tracing::info!(
            "PostgreSQL pool created: max={}, min={}",
            config.max_connections,
            config.min_connections
        );
        Ok(Self { pool })
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DataSource for PgDataSource {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
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

fn bind_value<'q>(query: PgQuery<'q>, value: &'q SqlValue) -> PgQuery<'q> {
    match value {
        SqlValue::Null | SqlValue::List(_) => query.bind(None::<String>),
        SqlValue::Boolean(b) => query.bind(*b),
        SqlValue::Integer(n) => query.bind(*n),
        SqlValue::Float(n) => query.bind(*n),
        SqlValue::Text(s) => query.bind(s.as_str()),
    }
}

fn decode_row(row: &PgRow) -> Result<RawRow, DataSourceError> {
    let mut raw = RawRow::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, index, column.type_info().name())?;
        raw.push(column.name(), value);
    }
    Ok(raw)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<JsonValue, DataSourceError> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(JsonValue::Null);
    }

    let value = match type_name {
        "BOOL" => JsonValue::Bool(row.try_get::<bool, _>(index)?),
        "INT2" => JsonValue::from(row.try_get::<i16, _>(index)?),
        "INT4" => JsonValue::from(row.try_get::<i32, _>(index)?),
        "INT8" => JsonValue::from(row.try_get::<i64, _>(index)?),
        "FLOAT4" => float(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => float(row.try_get::<f64, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            JsonValue::String(row.try_get::<String, _>(index)?)
        }
        "UUID" => JsonValue::String(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "DATE" => JsonValue::String(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
        "TIMESTAMP" => JsonValue::String(
            row.try_get::<chrono::NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMPTZ" => JsonValue::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                .to_rfc3339(),
        ),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index)?,
        other => {
            return Err(DataSourceError::decode(format!(
                "unsupported PostgreSQL column type {} at index {}",
                other, index
            )))
        }
    };
    Ok(value)
}

/// Non-finite floats have no JSON form
fn float(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}
