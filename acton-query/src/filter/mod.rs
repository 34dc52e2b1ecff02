//! Filter operators and the registry that resolves them by id
//!
//! An operator turns the source alias of a filtered property into a boolean
//! SQL fragment. Fragments reference their value through the named
//! placeholder `:alias`, which the dialect later rewrites into positional
//! parameters.
//!
//! # Example
//!
//! ```rust
//! use acton_query::filter::{FilterOperator, FilterRegistry};
//!
//! #[derive(Debug)]
//! struct NotEquals;
//!
//! impl FilterOperator for NotEquals {
//!     fn id(&self) -> &str {
//!         "ne"
//!     }
//!
//!     fn fragment(&self, alias: &str) -> String {
//!         format!("{alias} <> :{alias}")
//!     }
//! }
//!
//! let registry = FilterRegistry::builder()
//!     .with_builtin_operators()
//!     .unwrap()
//!     .register(NotEquals)
//!     .unwrap()
//!     .build();
//!
//! assert!(registry.contains("ne"));
//! assert!(registry.contains("equals"));
//! ```

mod operators;

pub use operators::{Comparison, Contains, In};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::ConfigurationError;
use crate::value::SqlValue;

/// A named filter strategy
pub trait FilterOperator: fmt::Debug + Send + Sync {
    /// Unique operator id used in query descriptors
    fn id(&self) -> &str;

    /// Boolean fragment over `alias`, referencing `:alias` for its value
    fn fragment(&self, alias: &str) -> String;

    /// Value bound under `:alias`
    fn parameter(&self, value: &SqlValue) -> SqlValue {
        value.clone()
    }
}

/// Operators every registry built with [`FilterRegistryBuilder::with_builtin_operators`] knows
pub fn builtin_operators() -> Vec<Arc<dyn FilterOperator>> {
    vec![
        Arc::new(Comparison::EQUALS),
        Arc::new(Comparison::LESS_THAN),
        Arc::new(Comparison::LESS_THAN_OR_EQUAL),
        Arc::new(Comparison::GREATER_THAN),
        Arc::new(Comparison::GREATER_THAN_OR_EQUAL),
        Arc::new(Contains),
        Arc::new(In),
    ]
}

static BUILTIN_REGISTRY: LazyLock<FilterRegistry> = LazyLock::new(|| {
    let operators = builtin_operators()
        .into_iter()
        .map(|op| (op.id().to_string(), op))
        .collect();
    FilterRegistry { operators }
});

/// Immutable mapping from operator id to operator
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    operators: HashMap<String, Arc<dyn FilterOperator>>,
}

impl FilterRegistry {
    /// Start building a registry
    pub fn builder() -> FilterRegistryBuilder {
        FilterRegistryBuilder::default()
    }

    /// Process-wide registry holding only the built-in operators
    pub fn builtin() -> &'static FilterRegistry {
        &BUILTIN_REGISTRY
    }

    /// Resolve an operator by id
    pub fn lookup(&self, id: &str) -> Result<&dyn FilterOperator, ConfigurationError> {
        self.operators
            .get(id)
            .map(|op| &**op)
            .ok_or_else(|| ConfigurationError::unknown_operator(id))
    }

    /// Returns true if an operator is registered under `id`
    pub fn contains(&self, id: &str) -> bool {
        self.operators.contains_key(id)
    }

    /// Registered operator ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered operators
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Returns true if no operators are registered
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// Collects operators before freezing them into a [`FilterRegistry`]
#[derive(Debug, Default)]
pub struct FilterRegistryBuilder {
    operators: HashMap<String, Arc<dyn FilterOperator>>,
}

impl FilterRegistryBuilder {
    /// Register every built-in operator
    pub fn with_builtin_operators(self) -> Result<Self, ConfigurationError> {
        builtin_operators()
            .into_iter()
            .try_fold(self, |builder, op| builder.register_arc(op))
    }

    /// Register an operator; ids must be unique
    pub fn register<O: FilterOperator + 'static>(self, operator: O) -> Result<Self, ConfigurationError> {
        self.register_arc(Arc::new(operator))
    }

    /// Register a shared operator; ids must be unique
    pub fn register_arc(
        mut self,
        operator: Arc<dyn FilterOperator>,
    ) -> Result<Self, ConfigurationError> {
        let id = operator.id().to_string();
        if self.operators.contains_key(&id) {
            return Err(ConfigurationError::duplicate_operator(&id));
        }
        tracing::trace!(operator = %id, "Registered filter operator");
        self.operators.insert(id, operator);
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> FilterRegistry {
        FilterRegistry {
            operators: self.operators,
        }
    }
}
