//! Building descriptors from request parameters
//!
//! Web layers usually receive a query as flat key/value pairs. This module
//! turns them into a [`QueryDescriptor`] using the target type's metadata:
//!
//! | Parameter | Meaning |
//! |-----------|---------|
//! | `page=N` | zero-based page index |
//! | `size=N` | page size |
//! | `sort=prop[,asc\|desc]` | order by a property; repeatable |
//! | `filter=prop,op` | operator for a property's filter; defaults to `equals` |
//! | `prop=value` | filter value for a declared property |
//!
//! Values are parsed with the property's [`ValueKind`](crate::ValueKind). For
//! the `in` operator the value is split on commas. A repeated `prop=value`
//! joins its values with commas. A `filter=` declaration without a value is
//! ignored, and so are keys that match no declared property. Operator ids are
//! not checked here; the executor rejects unknown ones before querying.
//!
//! # Example
//!
//! ```rust
//! use acton_query::{DataTable, Property, PropertyResolver, QueryDescriptor, SortOrder, TableMetadata};
//!
//! struct Sales;
//!
//! impl DataTable for Sales {
//!     fn metadata() -> TableMetadata {
//!         TableMetadata::new()
//!             .with_data_table("SELECT * FROM sales")
//!             .with_property(Property::integer("storeId").with_column("store_id"))
//!             .with_property(Property::integer("quantity").with_column("qty"))
//!     }
//! }
//!
//! let resolver = PropertyResolver::builder().register::<Sales>().build().unwrap();
//! let params = [
//!     ("page", "0"),
//!     ("size", "2"),
//!     ("sort", "storeId,desc"),
//!     ("quantity", "2"),
//!     ("filter", "quantity,lt"),
//! ];
//!
//! let descriptor = QueryDescriptor::<Sales>::from_params(params, &resolver).unwrap();
//! assert_eq!(descriptor.orders(), &[("store_id".to_string(), SortOrder::Desc)]);
//! assert_eq!(descriptor.filters()[0].data_source_property, "qty");
//! assert_eq!(descriptor.filters()[0].operation, "lt");
//! ```

use std::collections::HashMap;

use crate::descriptor::{PropertyFilter, QueryDescriptor, SortOrder};
use crate::error::{Error, Result};
use crate::metadata::{Property, PropertyResolver, ResolvedTable};
use crate::value::SqlValue;

/// Zero-based page index parameter
pub const PAGE_PARAM: &str = "page";
/// Page size parameter
pub const SIZE_PARAM: &str = "size";
/// Sort parameter
pub const SORT_PARAM: &str = "sort";
/// Filter operator declaration parameter
pub const FILTER_PARAM: &str = "filter";
/// Operator used when a property has a value but no declaration
pub const DEFAULT_OPERATOR: &str = "equals";

const IN_OPERATOR: &str = "in";

impl<T: 'static> QueryDescriptor<T> {
    /// Build a descriptor from request key/value pairs
    pub fn from_params<I, K, V>(params: I, resolver: &PropertyResolver) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let table = resolver.table::<T>()?;
        let mut descriptor = Self::new();
        let mut operators: HashMap<String, String> = HashMap::new();
        let mut values: Vec<(String, String)> = Vec::new();

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                PAGE_PARAM => descriptor = descriptor.with_page(parse_count(key, value)?),
                SIZE_PARAM => descriptor = descriptor.with_size(parse_count(key, value)?),
                SORT_PARAM => {
                    if let Some((property, order)) = parse_sort(table, value)? {
                        descriptor = descriptor.with_order(property.column(), order);
                    }
                }
                FILTER_PARAM => {
                    let (property, operation) = parse_filter_declaration(table, value)?;
                    operators.insert(property.name().to_string(), operation);
                }
                _ => match table.property(key) {
                    Some(property) => {
                        match values.iter_mut().find(|(name, _)| name == property.name()) {
                            Some((_, raw)) => {
                                raw.push(',');
                                raw.push_str(value);
                            }
                            None => values.push((property.name().to_string(), value.to_string())),
                        }
                    }
                    None => tracing::trace!(param = key, "Ignoring unknown query parameter"),
                },
            }
        }

        for (name, raw) in values {
            let Some(property) = table.property(&name) else {
                continue;
            };
            let operation = operators
                .remove(&name)
                .unwrap_or_else(|| DEFAULT_OPERATOR.to_string());
            if raw.trim().is_empty() {
                tracing::debug!(property = %name, "Ignoring filter with empty value");
                continue;
            }

            let value = if operation == IN_OPERATOR {
                let items = raw
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(|part| parse_value(property, part))
                    .collect::<Result<Vec<_>>>()?;
                SqlValue::List(items)
            } else {
                parse_value(property, &raw)?
            };

            descriptor = descriptor.with_filter(PropertyFilter::new(
                property.name(),
                property.column(),
                operation,
                value,
            ));
        }

        for name in operators.keys() {
            tracing::debug!(property = %name, "Ignoring filter declared without a value");
        }

        Ok(descriptor)
    }
}

fn parse_count(key: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        Error::InvalidQuery(format!(
            "`{}` must be a non-negative integer, got `{}`",
            key, raw
        ))
    })
}

fn parse_sort<'t>(table: &'t ResolvedTable, raw: &str) -> Result<Option<(&'t Property, SortOrder)>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let (name, order) = match raw.split_once(',') {
        Some((name, direction)) => {
            let order = SortOrder::from_param(direction).ok_or_else(|| {
                Error::InvalidQuery(format!("unknown sort direction `{}`", direction.trim()))
            })?;
            (name.trim(), order)
        }
        None => (raw, SortOrder::default()),
    };

    let property = table
        .property(name)
        .ok_or_else(|| Error::InvalidQuery(format!("cannot sort by unknown property `{}`", name)))?;
    Ok(Some((property, order)))
}

fn parse_filter_declaration<'t>(table: &'t ResolvedTable, raw: &str) -> Result<(&'t Property, String)> {
    let (name, operation) = raw.split_once(',').ok_or_else(|| {
        Error::InvalidQuery(format!("filter `{}` must look like `property,operator`", raw))
    })?;

    let name = name.trim();
    let operation = operation.trim();
    if operation.is_empty() {
        return Err(Error::InvalidQuery(format!("filter `{}` names no operator", raw)));
    }

    let property = table
        .property(name)
        .ok_or_else(|| Error::InvalidQuery(format!("cannot filter by unknown property `{}`", name)))?;
    Ok((property, operation.to_string()))
}

fn parse_value(property: &Property, raw: &str) -> Result<SqlValue> {
    property
        .kind()
        .parse(raw)
        .map_err(|message| Error::InvalidQuery(format!("`{}`: {}", property.name(), message)))
}
