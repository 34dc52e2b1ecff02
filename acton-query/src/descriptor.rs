//! Query descriptors
//!
//! A [`QueryDescriptor`] is the declarative, backend-independent request for
//! one page of a target type: optional page/size, filters and ordering.
//! It is built once with the `with_*` methods and read-only afterwards.
//!
//! # Example
//!
//! ```rust
//! use acton_query::{PropertyFilter, QueryDescriptor, SortOrder};
//!
//! struct Sales;
//!
//! let descriptor = QueryDescriptor::<Sales>::new()
//!     .with_page(1)
//!     .with_size(2)
//!     .with_filter(PropertyFilter::new("quantity", "qty", "lt", 2_i64))
//!     .with_order("store_id", SortOrder::Desc);
//!
//! let window = descriptor.window().unwrap();
//! assert_eq!(window.limit, 2);
//! assert_eq!(window.offset, 2);
//! ```

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::value::SqlValue;

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order
    #[default]
    Asc,
    /// Descending order
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl SortOrder {
    /// Convert to an SQL ORDER BY direction
    ///
    /// ```rust
    /// use acton_query::SortOrder;
    ///
    /// assert_eq!(SortOrder::Asc.as_sql(), "ASC");
    /// assert_eq!(SortOrder::Desc.as_sql(), "DESC");
    /// ```
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse a request direction, case-insensitively
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// One filter condition of a query
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    /// Logical property name on the target type
    pub property: String,
    /// Alias of the property in the source query; also the parameter key
    pub data_source_property: String,
    /// Operator id looked up in the filter registry
    pub operation: String,
    /// Value compared against
    pub value: SqlValue,
}

impl PropertyFilter {
    /// Create a filter
    pub fn new(
        property: impl Into<String>,
        data_source_property: impl Into<String>,
        operation: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> Self {
        Self {
            property: property.into(),
            data_source_property: data_source_property.into(),
            operation: operation.into(),
            value: value.into(),
        }
    }

    /// Create a filter on a property whose source alias equals its name
    pub fn on(
        property: impl Into<String>,
        operation: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> Self {
        let property = property.into();
        Self {
            data_source_property: property.clone(),
            property,
            operation: operation.into(),
            value: value.into(),
        }
    }
}

const MAX_WINDOW_VALUE: u64 = i64::MAX as u64;

/// Effective LIMIT/OFFSET of a paged query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Maximum number of rows
    pub limit: u64,
    /// Number of rows skipped
    pub offset: u64,
}

/// Declarative query for one page of `T`
///
/// `T` is a marker for the target type; the descriptor never holds a `T`.
pub struct QueryDescriptor<T> {
    page: Option<u64>,
    size: Option<u64>,
    filters: Vec<PropertyFilter>,
    orders: Vec<(String, SortOrder)>,
    target: PhantomData<fn() -> T>,
}

impl<T> QueryDescriptor<T> {
    /// Create an unpaged, unfiltered, unordered descriptor
    pub fn new() -> Self {
        Self {
            page: None,
            size: None,
            filters: Vec::new(),
            orders: Vec::new(),
            target: PhantomData,
        }
    }

    /// Set the zero-based page index
    #[must_use]
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Append a filter; filters are AND-ed in insertion order
    #[must_use]
    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order by a source alias
    ///
    /// Keys keep their first insertion position; ordering the same key again
    /// replaces its direction.
    #[must_use]
    pub fn with_order(mut self, property: impl Into<String>, order: SortOrder) -> Self {
        let property = property.into();
        match self.orders.iter_mut().find(|(key, _)| *key == property) {
            Some(entry) => entry.1 = order,
            None => self.orders.push((property, order)),
        }
        self
    }

    /// Zero-based page index, if set
    pub fn page(&self) -> Option<u64> {
        self.page
    }

    /// Page size, if set
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Filters in insertion order
    pub fn filters(&self) -> &[PropertyFilter] {
        &self.filters
    }

    /// Order keys and directions in insertion order
    pub fn orders(&self) -> &[(String, SortOrder)] {
        &self.orders
    }

    /// Name of the target type
    pub fn target_name(&self) -> &'static str {
        type_name::<T>()
    }

    /// LIMIT/OFFSET for this descriptor
    ///
    /// Returns `None` unless both page and size are set and size is positive.
    pub fn window(&self) -> Option<PageWindow> {
        self.window_capped(None)
    }

    /// LIMIT/OFFSET with the page size clamped to `max_size`
    ///
    /// Both values are clamped to `i64::MAX`, the largest literal SQL engines accept.
    pub fn window_capped(&self, max_size: Option<u64>) -> Option<PageWindow> {
        let page = self.page?;
        let size = self.size.filter(|size| *size > 0)?;
        let limit = max_size
            .map_or(size, |max| size.min(max.max(1)))
            .min(MAX_WINDOW_VALUE);
        Some(PageWindow {
            limit,
            offset: page.saturating_mul(limit).min(MAX_WINDOW_VALUE),
        })
    }
}

impl<T> Default for QueryDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QueryDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            page: self.page,
            size: self.size,
            filters: self.filters.clone(),
            orders: self.orders.clone(),
            target: PhantomData,
        }
    }
}

impl<T> fmt::Debug for QueryDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("target", &type_name::<T>())
            .field("page", &self.page)
            .field("size", &self.size)
            .field("filters", &self.filters)
            .field("orders", &self.orders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Target;

    #[test]
    fn test_sort_order_from_param() {
        assert_eq!(SortOrder::from_param("DESC"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::from_param(" asc "), Some(SortOrder::Asc));
        assert_eq!(SortOrder::from_param("up"), None);
    }

    #[test]
    fn test_window_requires_page_and_positive_size() {
        let descriptor = QueryDescriptor::<Target>::new();
        assert_eq!(descriptor.window(), None);

        let descriptor = QueryDescriptor::<Target>::new().with_page(0);
        assert_eq!(descriptor.window(), None);

        let descriptor = QueryDescriptor::<Target>::new().with_size(10);
        assert_eq!(descriptor.window(), None);

        let descriptor = QueryDescriptor::<Target>::new().with_page(3).with_size(0);
        assert_eq!(descriptor.window(), None);

        let descriptor = QueryDescriptor::<Target>::new().with_page(3).with_size(10);
        assert_eq!(
            descriptor.window(),
            Some(PageWindow {
                limit: 10,
                offset: 30
            })
        );
    }

    #[test]
    fn test_window_capped_scales_offset_with_effective_limit() {
        let descriptor = QueryDescriptor::<Target>::new().with_page(2).with_size(500);
        assert_eq!(
            descriptor.window_capped(Some(100)),
            Some(PageWindow {
                limit: 100,
                offset: 200
            })
        );
        assert_eq!(descriptor.window_capped(None).map(|w| w.limit), Some(500));
    }

    #[test]
    fn test_window_clamps_huge_values_to_i64() {
        let descriptor = QueryDescriptor::<Target>::new()
            .with_page(u64::MAX / 2)
            .with_size(4);
        assert_eq!(
            descriptor.window(),
            Some(PageWindow {
                limit: 4,
                offset: i64::MAX as u64
            })
        );

        let unbounded = QueryDescriptor::<Target>::new().with_page(0).with_size(u64::MAX);
        assert_eq!(unbounded.window().map(|w| w.limit), Some(i64::MAX as u64));
    }

    #[test]
    fn test_with_order_keeps_position_and_replaces_direction() {
        let descriptor = QueryDescriptor::<Target>::new()
            .with_order("store_id", SortOrder::Asc)
            .with_order("item_id", SortOrder::Asc)
            .with_order("store_id", SortOrder::Desc);

        assert_eq!(
            descriptor.orders(),
            &[
                ("store_id".to_string(), SortOrder::Desc),
                ("item_id".to_string(), SortOrder::Asc)
            ]
        );
    }

    #[test]
    fn test_filters_keep_insertion_order() {
        let descriptor = QueryDescriptor::<Target>::new()
            .with_filter(PropertyFilter::on("qty", "gt", 1_i64))
            .with_filter(PropertyFilter::new("itemName", "item_name", "contains", "IR"));

        let ops: Vec<&str> = descriptor
            .filters()
            .iter()
            .map(|f| f.operation.as_str())
            .collect();
        assert_eq!(ops, vec!["gt", "contains"]);
        assert_eq!(descriptor.filters()[0].data_source_property, "qty");
    }

    #[test]
    fn test_debug_names_target() {
        let descriptor = QueryDescriptor::<Target>::new();
        assert!(format!("{:?}", descriptor).contains("Target"));
        assert!(descriptor.target_name().ends_with("Target"));
    }
}
