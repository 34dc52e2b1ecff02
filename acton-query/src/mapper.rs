//! Row mapping
//!
//! [`RowMapper`] converts a [`RawRow`] into a target object. Each column label
//! is matched case-insensitively against the target's source aliases; matched
//! values are coerced to the property's [`ValueKind`](crate::ValueKind) and
//! stored under the logical name, unmatched columns are dropped. NULL values
//! are left out as well. The resulting JSON object is then deserialized with
//! serde, so properties missing from the row (or NULL in it) take their
//! `#[serde(default)]` values, and `Option` properties become `None`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::{MappingError, Result};
use crate::metadata::{PropertyResolver, ResolvedTable};
use crate::source::RawRow;

/// Converts raw rows into target objects
#[derive(Debug, Clone, Copy)]
pub struct RowMapper<'a> {
    resolver: &'a PropertyResolver,
}

impl<'a> RowMapper<'a> {
    /// Create a mapper over `resolver`
    pub fn new(resolver: &'a PropertyResolver) -> Self {
        Self { resolver }
    }

    /// Convert one row into a `T`
    ///
    /// Fails with a configuration error if `T` is not registered and with a
    /// mapping error if a value does not fit its property.
    pub fn convert<T: DeserializeOwned + 'static>(&self, row: RawRow) -> Result<T> {
        let table = self.resolver.table::<T>()?;
        Ok(convert_row(table, row)?)
    }

    /// Convert every row, stopping at the first failure
    pub fn convert_all<T: DeserializeOwned + 'static>(
        &self,
        rows: impl IntoIterator<Item = RawRow>,
    ) -> Result<Vec<T>> {
        let table = self.resolver.table::<T>()?;
        rows.into_iter()
            .map(|row| convert_row(table, row).map_err(Into::into))
            .collect()
    }
}

pub(crate) fn convert_row<T: DeserializeOwned>(
    table: &ResolvedTable,
    row: RawRow,
) -> std::result::Result<T, MappingError> {
    let mut object = Map::with_capacity(row.len());
    for (label, value) in row {
        let Some(property) = table.property_for_column(&label) else {
            continue;
        };
        let value = property
            .kind()
            .coerce(value)
            .map_err(|message| MappingError::for_field(table.type_name(), property.name(), message))?;
        if !value.is_null() {
            object.insert(property.name().to_string(), value);
        }
    }

    serde_path_to_error::deserialize(JsonValue::Object(object)).map_err(|e| {
        let path = e.path().to_string();
        let message = e.into_inner().to_string();
        if path == "." {
            MappingError::new(table.type_name(), message)
        } else {
            MappingError::for_field(table.type_name(), path, message)
        }
    })
}
