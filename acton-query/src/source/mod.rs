//! Data sources
//!
//! A [`DataSource`] runs bound statements: it streams the rows of a data
//! statement and returns the single integer of a count statement. Rows come
//! back as [`RawRow`]s, an ordered list of column labels and JSON values,
//! which the [`RowMapper`](crate::RowMapper) turns into target objects.

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::PgDataSource;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDataSource;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;

use crate::dialect::{BoundStatement, Dialect};
use crate::error::DataSourceError;

/// One result row: column labels with their values, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    columns: Vec<(String, JsonValue)>,
}

impl RawRow {
    /// Empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty row with room for `capacity` columns
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Append a column
    pub fn push(&mut self, label: impl Into<String>, value: JsonValue) {
        self.columns.push((label.into(), value));
    }

    /// Value of the first column with exactly this label
    pub fn get(&self, label: &str) -> Option<&JsonValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over columns in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for RawRow {
    type Item = (String, JsonValue);
    type IntoIter = std::vec::IntoIter<(String, JsonValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, JsonValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Backend that runs bound statements
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Placeholder flavour statements must be bound with
    fn dialect(&self) -> Dialect;

    /// Stream the rows of a data statement
    fn fetch<'a>(
        &'a self,
        statement: &'a BoundStatement,
    ) -> BoxStream<'a, Result<RawRow, DataSourceError>>;

    /// Run a count statement and return its single integer
    async fn count(&self, statement: &BoundStatement) -> Result<i64, DataSourceError>;
}
