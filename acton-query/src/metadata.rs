//! Target type metadata and property resolution
//!
//! A target type describes itself through [`DataTable`]: the base query it
//! reads from and its logical properties, each with an optional source alias
//! and a [`ValueKind`]. [`PropertyResolver`] indexes that metadata once at
//! startup and answers three questions during a query:
//!
//! - which base query serves a type ([`PropertyResolver::base_query`])
//! - which source alias a logical property maps to ([`PropertyResolver::resolve_alias`])
//! - which logical property a result column maps back to ([`PropertyResolver::property_for_column`])
//!
//! # Example
//!
//! ```rust
//! use acton_query::{DataTable, Property, PropertyResolver, TableMetadata};
//!
//! struct Sales;
//!
//! impl DataTable for Sales {
//!     fn metadata() -> TableMetadata {
//!         TableMetadata::new()
//!             .with_data_table("SELECT * FROM sales")
//!             .with_property(Property::integer("quantity").with_column("qty"))
//!             .with_property(Property::text("storeName").with_column("store_name"))
//!     }
//! }
//!
//! let resolver = PropertyResolver::builder().register::<Sales>().build().unwrap();
//!
//! assert_eq!(resolver.base_query::<Sales>().unwrap(), "SELECT * FROM sales");
//! assert_eq!(resolver.resolve_alias::<Sales>("quantity"), Some("qty"));
//! assert_eq!(
//!     resolver.property_for_column::<Sales>("STORE_NAME").map(|p| p.name()),
//!     Some("storeName")
//! );
//! ```

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ConfigurationError, ConfigurationErrorKind};
use crate::value::ValueKind;

/// Plain SQL identifier: no quoting, no qualification
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
});

/// Returns true if `value` is a plain SQL identifier
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_REGEX.is_match(value)
}

/// Reject anything that is not a plain SQL identifier
pub fn validate_identifier(value: &str) -> Result<(), ConfigurationError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_identifier(value))
    }
}

/// One logical property of a target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    column: String,
    kind: ValueKind,
}

impl Property {
    /// Create a property whose source alias equals its name
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            kind,
        }
    }

    /// Text property
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Text)
    }

    /// Integer property
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Integer)
    }

    /// Float property
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Float)
    }

    /// Boolean property
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Boolean)
    }

    /// JSON property
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Json)
    }

    /// Map the property to a different source alias
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Logical name on the target type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias in the source query
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Declared value kind
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

/// Declared metadata of a target type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMetadata {
    data_table: Option<String>,
    properties: Vec<Property>,
}

impl TableMetadata {
    /// Empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base query: literal SQL, or the name of a `.sql` file in the queries directory
    #[must_use]
    pub fn with_data_table(mut self, reference: impl Into<String>) -> Self {
        self.data_table = Some(reference.into());
        self
    }

    /// Declare a property
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Base query reference, if declared
    pub fn data_table(&self) -> Option<&str> {
        self.data_table.as_deref()
    }

    /// Declared properties
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }
}

/// A type that can be the target of a query
pub trait DataTable: 'static {
    /// Base query and properties of the type
    fn metadata() -> TableMetadata;
}

/// Indexed metadata of one registered type
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    type_name: &'static str,
    base_query: Option<String>,
    properties: Vec<Property>,
    by_name: HashMap<String, usize>,
    by_column: HashMap<String, usize>,
}

impl ResolvedTable {
    fn index(
        type_name: &'static str,
        metadata: TableMetadata,
        queries_dir: &Path,
    ) -> Result<Self, ConfigurationError> {
        let base_query = metadata
            .data_table
            .map(|reference| load_base_query(&reference, queries_dir))
            .transpose()?;

        let mut by_name = HashMap::with_capacity(metadata.properties.len());
        let mut by_column = HashMap::with_capacity(metadata.properties.len());
        for (index, property) in metadata.properties.iter().enumerate() {
            validate_identifier(&property.name)?;
            validate_identifier(&property.column)?;
            if by_name.insert(property.name.clone(), index).is_some() {
                return Err(ConfigurationError::duplicate_property(type_name, &property.name));
            }
            if by_column
                .insert(property.column.to_ascii_lowercase(), index)
                .is_some()
            {
                return Err(ConfigurationError::new(
                    ConfigurationErrorKind::DuplicateProperty,
                    format!("`{}` maps column `{}` twice", type_name, property.column),
                ));
            }
        }

        Ok(Self {
            type_name,
            base_query,
            properties: metadata.properties,
            by_name,
            by_column,
        })
    }

    /// Name of the registered type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolved base query text
    pub fn base_query(&self) -> Result<&str, ConfigurationError> {
        self.base_query
            .as_deref()
            .ok_or_else(|| ConfigurationError::missing_data_table(self.type_name))
    }

    /// Look up a property by logical name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.by_name.get(name).map(|i| &self.properties[*i])
    }

    /// Look up a property by result column label, case-insensitively
    pub fn property_for_column(&self, label: &str) -> Option<&Property> {
        self.by_column
            .get(&label.to_ascii_lowercase())
            .map(|i| &self.properties[*i])
    }

    /// Declared properties
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }
}

/// Read-only index of every registered target type
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver {
    tables: HashMap<TypeId, ResolvedTable>,
}

impl PropertyResolver {
    /// Start building a resolver
    pub fn builder() -> PropertyResolverBuilder {
        PropertyResolverBuilder::default()
    }

    /// Indexed metadata for `T`
    pub fn table<T: 'static>(&self) -> Result<&ResolvedTable, ConfigurationError> {
        self.tables
            .get(&TypeId::of::<T>())
            .ok_or_else(|| ConfigurationError::unregistered_type(type_name::<T>()))
    }

    /// Returns true if `T` is registered
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.tables.contains_key(&TypeId::of::<T>())
    }

    /// Base query text for `T`
    pub fn base_query<T: 'static>(&self) -> Result<&str, ConfigurationError> {
        self.table::<T>()?.base_query()
    }

    /// Source alias of a logical property of `T`
    pub fn resolve_alias<T: 'static>(&self, property: &str) -> Option<&str> {
        self.table::<T>()
            .ok()?
            .property(property)
            .map(Property::column)
    }

    /// Logical property of `T` for a result column label
    pub fn property_for_column<T: 'static>(&self, label: &str) -> Option<&Property> {
        self.table::<T>().ok()?.property_for_column(label)
    }
}

/// Collects type registrations before indexing them
#[derive(Debug)]
pub struct PropertyResolverBuilder {
    queries_dir: PathBuf,
    pending: Vec<(TypeId, &'static str, TableMetadata)>,
}

impl Default for PropertyResolverBuilder {
    fn default() -> Self {
        Self {
            queries_dir: PathBuf::from("queries"),
            pending: Vec::new(),
        }
    }
}

impl PropertyResolverBuilder {
    /// Directory `.sql` data table references are read from
    #[must_use]
    pub fn with_queries_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.queries_dir = dir.into();
        self
    }

    /// Register a type that describes itself
    #[must_use]
    pub fn register<T: DataTable>(self) -> Self {
        self.register_with::<T>(T::metadata())
    }

    /// Register a type with explicitly supplied metadata
    #[must_use]
    pub fn register_with<T: 'static>(mut self, metadata: TableMetadata) -> Self {
        self.pending
            .push((TypeId::of::<T>(), type_name::<T>(), metadata));
        self
    }

    /// Validate and index every registration, reading query files
    pub fn build(self) -> Result<PropertyResolver, ConfigurationError> {
        let mut tables = HashMap::with_capacity(self.pending.len());
        for (type_id, type_name, metadata) in self.pending {
            if tables.contains_key(&type_id) {
                return Err(ConfigurationError::duplicate_table(type_name));
            }
            let table = ResolvedTable::index(type_name, metadata, &self.queries_dir)?;
            tracing::debug!(
                target_type = type_name,
                properties = table.properties.len(),
                "Registered data table"
            );
            tables.insert(type_id, table);
        }
        Ok(PropertyResolver { tables })
    }
}

/// Resolve a data table reference into SQL text
///
/// References ending in `.sql` are read from `queries_dir`. Lines are trimmed,
/// blank lines and `--` comment lines dropped, and the rest joined with spaces.
/// Anything else is literal SQL.
fn load_base_query(reference: &str, queries_dir: &Path) -> Result<String, ConfigurationError> {
    let reference = reference.trim();
    if !reference.to_ascii_lowercase().ends_with(".sql") {
        return Ok(reference.to_string());
    }

    let path = queries_dir.join(reference);
    let contents = std::fs::read_to_string(&path)
        .map_err(|err| ConfigurationError::unreadable_query_file(&path, &err))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Sales;

    impl DataTable for Sales {
        fn metadata() -> TableMetadata {
            TableMetadata::new()
                .with_data_table("SELECT * FROM sales")
                .with_property(Property::integer("itemId").with_column("item_id"))
                .with_property(Property::text("storeName").with_column("store_name"))
                .with_property(Property::integer("quantity").with_column("qty"))
                .with_property(Property::text("note"))
        }
    }

    struct Untabled;

    impl DataTable for Untabled {
        fn metadata() -> TableMetadata {
            TableMetadata::new().with_property(Property::text("name"))
        }
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("store_name"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("qty; DROP TABLE sales"));
        assert!(!is_identifier("s.qty"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_resolve_alias_and_default_column() {
        let resolver = PropertyResolver::builder().register::<Sales>().build().unwrap();
        assert_eq!(resolver.resolve_alias::<Sales>("quantity"), Some("qty"));
        assert_eq!(resolver.resolve_alias::<Sales>("note"), Some("note"));
        assert_eq!(resolver.resolve_alias::<Sales>("missing"), None);
    }

    #[test]
    fn test_property_for_column_is_case_insensitive() {
        let resolver = PropertyResolver::builder().register::<Sales>().build().unwrap();
        let property = resolver.property_for_column::<Sales>("QTY").unwrap();
        assert_eq!(property.name(), "quantity");
        assert_eq!(property.kind(), ValueKind::Integer);
        assert!(resolver.property_for_column::<Sales>("id").is_none());
    }

    #[test]
    fn test_unregistered_type() {
        let resolver = PropertyResolver::builder().register::<Sales>().build().unwrap();
        let err = resolver.base_query::<Untabled>().unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::UnregisteredType);
        assert!(!resolver.is_registered::<Untabled>());
    }

    #[test]
    fn test_missing_data_table() {
        let resolver = PropertyResolver::builder()
            .register::<Untabled>()
            .build()
            .unwrap();
        let err = resolver.base_query::<Untabled>().unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::MissingDataTable);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let err = PropertyResolver::builder()
            .register::<Sales>()
            .register::<Sales>()
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::DuplicateTable);
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let metadata = TableMetadata::new()
            .with_data_table("SELECT 1")
            .with_property(Property::text("name"))
            .with_property(Property::integer("name").with_column("other"));
        let err = PropertyResolver::builder()
            .register_with::<Untabled>(metadata)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::DuplicateProperty);

        let metadata = TableMetadata::new()
            .with_property(Property::text("a").with_column("col"))
            .with_property(Property::text("b").with_column("COL"));
        let err = PropertyResolver::builder()
            .register_with::<Untabled>(metadata)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::DuplicateProperty);
    }

    #[test]
    fn test_invalid_column_rejected() {
        let metadata = TableMetadata::new().with_property(Property::text("name").with_column("s.name"));
        let err = PropertyResolver::builder()
            .register_with::<Untabled>(metadata)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::InvalidIdentifier);
    }

    #[test]
    fn test_sql_file_reference_is_read_and_joined() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("sales.sql")).unwrap();
        writeln!(file, "-- all sales").unwrap();
        writeln!(file, "SELECT item_id, qty").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  FROM sales").unwrap();

        let metadata = TableMetadata::new().with_data_table("sales.sql");
        let resolver = PropertyResolver::builder()
            .with_queries_dir(dir.path())
            .register_with::<Untabled>(metadata)
            .build()
            .unwrap();

        assert_eq!(
            resolver.base_query::<Untabled>().unwrap(),
            "SELECT item_id, qty FROM sales"
        );
    }

    #[test]
    fn test_missing_sql_file_fails_at_build() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = TableMetadata::new().with_data_table("absent.sql");
        let err = PropertyResolver::builder()
            .with_queries_dir(dir.path())
            .register_with::<Untabled>(metadata)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::UnreadableQueryFile);
        assert!(err.message.contains("absent.sql"));
    }
}
