//! Built-in filter operators
//!
//! Each operator renders a fragment over the source alias and binds its value
//! under the placeholder `:alias`.

use super::FilterOperator;
use crate::value::SqlValue;

/// Binary comparison against a single value (`=`, `<`, `<=`, `>`, `>=`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    id: &'static str,
    symbol: &'static str,
}

impl Comparison {
    /// `equals`: strict equality
    pub const EQUALS: Self = Self::new("equals", "=");
    /// `lt`: strictly less than
    pub const LESS_THAN: Self = Self::new("lt", "<");
    /// `lte`: less than or equal
    pub const LESS_THAN_OR_EQUAL: Self = Self::new("lte", "<=");
    /// `gt`: strictly greater than
    pub const GREATER_THAN: Self = Self::new("gt", ">");
    /// `gte`: greater than or equal
    pub const GREATER_THAN_OR_EQUAL: Self = Self::new("gte", ">=");

    /// Create a comparison operator with a custom id
    pub const fn new(id: &'static str, symbol: &'static str) -> Self {
        Self { id, symbol }
    }
}

impl FilterOperator for Comparison {
    fn id(&self) -> &str {
        self.id
    }

    fn fragment(&self, alias: &str) -> String {
        format!("{alias} {} :{alias}", self.symbol)
    }
}

/// `contains`: case-sensitive substring match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contains;

impl FilterOperator for Contains {
    fn id(&self) -> &str {
        "contains"
    }

    fn fragment(&self, alias: &str) -> String {
        format!("{alias} LIKE '%' || :{alias} || '%'")
    }
}

/// `in`: membership in a list of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct In;

impl FilterOperator for In {
    fn id(&self) -> &str {
        "in"
    }

    fn fragment(&self, alias: &str) -> String {
        format!("{alias} IN (:{alias})")
    }

    fn parameter(&self, value: &SqlValue) -> SqlValue {
        match value {
            SqlValue::List(_) => value.clone(),
            scalar => SqlValue::List(vec![scalar.clone()]),
        }
    }
}
