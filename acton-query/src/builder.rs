//! Statement derivation
//!
//! [`QueryBuilder`] turns a descriptor and a base query into a [`QueryPlan`]:
//! the data statement, the count statement and the named parameters both
//! share. Derivation is a pure function of its inputs; the count statement
//! wraps the filtered, ordered statement before any LIMIT/OFFSET is applied.
//!
//! Statements use named `:name` placeholders. A [`Dialect`](crate::Dialect)
//! rewrites them for a concrete backend.
//!
//! # Example
//!
//! ```rust
//! use acton_query::{FilterRegistry, Parameters, PropertyFilter, QueryBuilder, QueryDescriptor};
//!
//! struct Sales;
//!
//! let descriptor = QueryDescriptor::<Sales>::new()
//!     .with_page(0)
//!     .with_size(2)
//!     .with_filter(PropertyFilter::new("quantity", "qty", "lt", 2_i64));
//!
//! let plan = QueryBuilder::new(FilterRegistry::builtin())
//!     .build(&descriptor, "SELECT * FROM sales", &Parameters::new())
//!     .unwrap();
//!
//! assert_eq!(
//!     plan.data_statement(),
//!     "SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1 AND qty < :qty LIMIT 2 OFFSET 0"
//! );
//! assert_eq!(
//!     plan.count_statement(),
//!     "SELECT COUNT(1) FROM (SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1 AND qty < :qty) AS c"
//! );
//! ```

use crate::descriptor::QueryDescriptor;
use crate::error::ConfigurationError;
use crate::filter::FilterRegistry;
use crate::metadata::validate_identifier;
use crate::value::Parameters;

/// Alias of the wrapped base query
pub const SCOPE_ALIAS: &str = "scope";

/// Alias of the wrapped statement in the count query
pub const COUNT_ALIAS: &str = "c";

/// Statements and parameters derived from one descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    data: String,
    count: String,
    parameters: Parameters,
}

impl QueryPlan {
    /// Statement returning the requested page
    pub fn data_statement(&self) -> &str {
        &self.data
    }

    /// Statement returning the number of rows matching the filters
    pub fn count_statement(&self) -> &str {
        &self.count
    }

    /// Named parameters shared by both statements
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Split into data statement, count statement and parameters
    pub fn into_parts(self) -> (String, String, Parameters) {
        (self.data, self.count, self.parameters)
    }
}

/// Derives [`QueryPlan`]s against a filter registry
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    registry: &'a FilterRegistry,
    max_page_size: Option<u64>,
}

impl<'a> QueryBuilder<'a> {
    /// Create a builder resolving operators from `registry`
    pub fn new(registry: &'a FilterRegistry) -> Self {
        Self {
            registry,
            max_page_size: None,
        }
    }

    /// Clamp requested page sizes to `max`
    #[must_use]
    pub fn with_max_page_size(mut self, max: Option<u64>) -> Self {
        self.max_page_size = max;
        self
    }

    /// Derive the data and count statements for `descriptor`
    ///
    /// Every filter contributes ` AND <fragment>` in insertion order and binds
    /// its value under its source alias. `extra` parameters are merged in
    /// afterwards; any key bound twice is a configuration error.
    pub fn build<T>(
        &self,
        descriptor: &QueryDescriptor<T>,
        base_query: &str,
        extra: &Parameters,
    ) -> Result<QueryPlan, ConfigurationError> {
        let base_query = base_query.trim().trim_end_matches(';').trim_end();
        let mut statement = format!("SELECT * FROM ({base_query}) AS {SCOPE_ALIAS} WHERE 1 = 1");
        let mut parameters = Parameters::new();

        for filter in descriptor.filters() {
            let operator = self.registry.lookup(&filter.operation)?;
            let alias = filter.data_source_property.as_str();
            validate_identifier(alias)?;

            statement.push_str(" AND ");
            statement.push_str(&operator.fragment(alias));
            if parameters
                .insert(alias, operator.parameter(&filter.value))
                .is_some()
            {
                return Err(ConfigurationError::parameter_collision(alias));
            }
        }

        for (key, value) in extra.iter() {
            if parameters.insert(key, value.clone()).is_some() {
                return Err(ConfigurationError::parameter_collision(key));
            }
        }

        if !descriptor.orders().is_empty() {
            let mut clauses = Vec::with_capacity(descriptor.orders().len());
            for (property, order) in descriptor.orders() {
                validate_identifier(property)?;
                clauses.push(format!("{} {}", property, order.as_sql()));
            }
            statement.push_str(" ORDER BY ");
            statement.push_str(&clauses.join(", "));
        }

        let count = format!("SELECT COUNT(1) FROM ({statement}) AS {COUNT_ALIAS}");

        if let Some(window) = descriptor.window_capped(self.max_page_size) {
            statement.push_str(&format!(
                " LIMIT {} OFFSET {}",
                window.limit, window.offset
            ));
        }

        Ok(QueryPlan {
            data: statement,
            count,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PropertyFilter, SortOrder};
    use crate::error::ConfigurationErrorKind;
    use crate::value::SqlValue;

    struct Sales;

    const BASE: &str = "SELECT * FROM sales";

    fn build(descriptor: &QueryDescriptor<Sales>) -> Result<QueryPlan, ConfigurationError> {
        QueryBuilder::new(FilterRegistry::builtin()).build(descriptor, BASE, &Parameters::new())
    }

    #[test]
    fn test_unfiltered_unpaged() {
        let plan = build(&QueryDescriptor::new()).unwrap();
        assert_eq!(
            plan.data_statement(),
            "SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1"
        );
        assert_eq!(
            plan.count_statement(),
            "SELECT COUNT(1) FROM (SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1) AS c"
        );
        assert!(plan.parameters().is_empty());
    }

    #[test]
    fn test_filters_are_anded_in_order() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::new("quantity", "qty", "gte", 1_i64))
            .with_filter(PropertyFilter::new("itemName", "item_name", "contains", "IR"));

        let plan = build(&descriptor).unwrap();
        assert_eq!(
            plan.data_statement(),
            "SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1 \
             AND qty >= :qty AND item_name LIKE '%' || :item_name || '%'"
        );
        assert_eq!(plan.parameters().get("qty"), Some(&SqlValue::Integer(1)));
        assert_eq!(
            plan.parameters().get("item_name"),
            Some(&SqlValue::Text("IR".into()))
        );
    }

    #[test]
    fn test_order_and_window_only_on_data_statement() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_page(1)
            .with_size(2)
            .with_order("store_id", SortOrder::Desc)
            .with_order("item_id", SortOrder::Asc);

        let plan = build(&descriptor).unwrap();
        assert_eq!(
            plan.data_statement(),
            "SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1 \
             ORDER BY store_id DESC, item_id ASC LIMIT 2 OFFSET 2"
        );
        assert!(!plan.count_statement().contains("LIMIT"));
        assert!(plan.count_statement().starts_with("SELECT COUNT(1) FROM (SELECT * FROM"));
    }

    #[test]
    fn test_page_without_size_is_unlimited() {
        let descriptor = QueryDescriptor::<Sales>::new().with_page(4);
        let plan = build(&descriptor).unwrap();
        assert!(!plan.data_statement().contains("LIMIT"));
    }

    #[test]
    fn test_max_page_size_clamps_limit() {
        let descriptor = QueryDescriptor::<Sales>::new().with_page(1).with_size(5000);
        let plan = QueryBuilder::new(FilterRegistry::builtin())
            .with_max_page_size(Some(1000))
            .build(&descriptor, BASE, &Parameters::new())
            .unwrap();
        assert!(plan.data_statement().ends_with("LIMIT 1000 OFFSET 1000"));
    }

    #[test]
    fn test_base_query_trailing_semicolon_stripped() {
        let plan = QueryBuilder::new(FilterRegistry::builtin())
            .build(&QueryDescriptor::<Sales>::new(), "SELECT * FROM sales;\n", &Parameters::new())
            .unwrap();
        assert_eq!(
            plan.data_statement(),
            "SELECT * FROM (SELECT * FROM sales) AS scope WHERE 1 = 1"
        );
    }

    #[test]
    fn test_extra_parameters_merged() {
        let extra = Parameters::new().with("storeName", "SEOUL");
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::new("quantity", "qty", "equals", 1_i64));

        let plan = QueryBuilder::new(FilterRegistry::builtin())
            .build(&descriptor, "SELECT * FROM sales WHERE store_name = :storeName", &extra)
            .unwrap();

        assert_eq!(plan.parameters().len(), 2);
        assert_eq!(
            plan.parameters().get("storeName"),
            Some(&SqlValue::Text("SEOUL".into()))
        );
    }

    #[test]
    fn test_extra_parameter_collision() {
        let extra = Parameters::new().with("qty", 3_i64);
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::new("quantity", "qty", "equals", 1_i64));

        let err = QueryBuilder::new(FilterRegistry::builtin())
            .build(&descriptor, BASE, &extra)
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::ParameterCollision);
    }

    #[test]
    fn test_duplicate_filter_alias_collision() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::new("quantity", "qty", "gt", 1_i64))
            .with_filter(PropertyFilter::new("quantity", "qty", "lt", 5_i64));

        let err = build(&descriptor).unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::ParameterCollision);
    }

    #[test]
    fn test_unknown_operator() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::new("quantity", "qty", "between", 1_i64));

        let err = build(&descriptor).unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::UnknownOperator);
    }

    #[test]
    fn test_injection_through_alias_rejected() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::on("qty = 1 OR 1", "equals", 1_i64));
        let err = build(&descriptor).unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::InvalidIdentifier);

        let descriptor =
            QueryDescriptor::<Sales>::new().with_order("qty; DROP TABLE sales", SortOrder::Asc);
        let err = build(&descriptor).unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::InvalidIdentifier);
    }

    #[test]
    fn test_in_operator_binds_list() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_filter(PropertyFilter::new("itemId", "item_id", "in", vec![1_i64, 2]));

        let plan = build(&descriptor).unwrap();
        assert!(plan.data_statement().ends_with("AND item_id IN (:item_id)"));
        assert!(plan.parameters().get("item_id").unwrap().is_list());
    }

    #[test]
    fn test_build_is_deterministic() {
        let descriptor = QueryDescriptor::<Sales>::new()
            .with_page(0)
            .with_size(3)
            .with_filter(PropertyFilter::on("qty", "lte", 1_i64));
        assert_eq!(build(&descriptor).unwrap(), build(&descriptor).unwrap());
    }
}
