//! Error types for query translation, execution and row mapping

use std::fmt;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Category of configuration error
///
/// Configuration errors describe a query that can never succeed against the
/// current setup: an operator nobody registered, a target type with no data
/// table, or parameters that clash with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationErrorKind {
    /// A filter names an operator id missing from the registry
    UnknownOperator,
    /// Two operators were registered under the same id
    DuplicateOperator,
    /// The target type declares no data table reference
    MissingDataTable,
    /// The target type was never registered with the resolver
    UnregisteredType,
    /// The same target type was registered twice
    DuplicateTable,
    /// The same logical property was declared twice on one type
    DuplicateProperty,
    /// Two parameters share a key
    ParameterCollision,
    /// A statement references a named parameter with no value
    UnboundParameter,
    /// A property, column or alias is not a plain SQL identifier
    InvalidIdentifier,
    /// A query file referenced by a data table could not be read
    UnreadableQueryFile,
}

impl fmt::Display for ConfigurationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperator => write!(f, "unknown_operator"),
            Self::DuplicateOperator => write!(f, "duplicate_operator"),
            Self::MissingDataTable => write!(f, "missing_data_table"),
            Self::UnregisteredType => write!(f, "unregistered_type"),
            Self::DuplicateTable => write!(f, "duplicate_table"),
            Self::DuplicateProperty => write!(f, "duplicate_property"),
            Self::ParameterCollision => write!(f, "parameter_collision"),
            Self::UnboundParameter => write!(f, "unbound_parameter"),
            Self::InvalidIdentifier => write!(f, "invalid_identifier"),
            Self::UnreadableQueryFile => write!(f, "unreadable_query_file"),
        }
    }
}

/// Structured configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    /// The category of error
    pub kind: ConfigurationErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl ConfigurationError {
    /// Create a new configuration error
    pub fn new(kind: ConfigurationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A filter referenced an operator id that is not registered
    pub fn unknown_operator(operator: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::UnknownOperator,
            format!("no filter operator registered for `{}`", operator),
        )
    }

    /// An operator id was registered twice
    pub fn duplicate_operator(operator: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::DuplicateOperator,
            format!("filter operator `{}` is already registered", operator),
        )
    }

    /// The target type has no data table reference
    pub fn missing_data_table(type_name: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::MissingDataTable,
            format!("`{}` declares no data table", type_name),
        )
    }

    /// The target type is not known to the resolver
    pub fn unregistered_type(type_name: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::UnregisteredType,
            format!("`{}` is not registered with the property resolver", type_name),
        )
    }

    /// The target type was registered twice
    pub fn duplicate_table(type_name: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::DuplicateTable,
            format!("`{}` is already registered", type_name),
        )
    }

    /// A logical property was declared twice on one type
    pub fn duplicate_property(type_name: &str, property: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::DuplicateProperty,
            format!("`{}` declares property `{}` twice", type_name, property),
        )
    }

    /// Two parameters share a key
    pub fn parameter_collision(key: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::ParameterCollision,
            format!("parameter `{}` is bound more than once", key),
        )
    }

    /// A statement names a parameter that has no value
    pub fn unbound_parameter(name: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::UnboundParameter,
            format!("no value bound for parameter `:{}`", name),
        )
    }

    /// An identifier is not a plain SQL identifier
    pub fn invalid_identifier(identifier: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::InvalidIdentifier,
            format!("`{}` is not a valid SQL identifier", identifier),
        )
    }

    /// A referenced query file could not be read
    pub fn unreadable_query_file(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::new(
            ConfigurationErrorKind::UnreadableQueryFile,
            format!("failed to read query file {}: {}", path.display(), err),
        )
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration {} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for ConfigurationError {}

// ============================================================================
// Mapping Errors
// ============================================================================

/// A fetched row could not be converted into the target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingError {
    /// Name of the target type
    pub type_name: String,
    /// Logical property that failed, when known
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl MappingError {
    /// Create a mapping error for the whole row
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: None,
            message: message.into(),
        }
    }

    /// Create a mapping error for a single property
    pub fn for_field(
        type_name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to map row into `{}`", self.type_name)?;
        if let Some(ref field) = self.field {
            write!(f, " at `{}`", field)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for MappingError {}

// ============================================================================
// Data Source Errors
// ============================================================================

/// Category of data source error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSourceErrorKind {
    /// Connection could not be established or was lost
    ConnectionFailed,
    /// Operation or pool acquisition timed out
    Timeout,
    /// The statement was rejected or failed while running
    QueryFailed,
    /// A column value could not be decoded
    Decode,
    /// Anything else
    Other,
}

impl fmt::Display for DataSourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::Decode => write!(f, "decode"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Error raised by a data source while running a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceError {
    /// The category of error
    pub kind: DataSourceErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl DataSourceError {
    /// Create a new data source error
    pub fn new(kind: DataSourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(DataSourceErrorKind::ConnectionFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(DataSourceErrorKind::Timeout, message)
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(DataSourceErrorKind::QueryFailed, message)
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(DataSourceErrorKind::Decode, message)
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            DataSourceErrorKind::ConnectionFailed | DataSourceErrorKind::Timeout
        )
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data source {} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for DataSourceError {}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
impl From<sqlx::Error> for DataSourceError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::PoolTimedOut => Self::timeout("Connection pool timed out"),
            E::PoolClosed => Self::connection_failed("Connection pool is closed"),
            E::WorkerCrashed => Self::connection_failed("Database worker crashed"),
            E::Io(e) => Self::connection_failed(e.to_string()),
            E::Tls(e) => Self::connection_failed(format!("TLS error: {}", e)),
            E::Protocol(msg) => Self::query_failed(msg),
            E::Database(db_err) => Self::query_failed(db_err.to_string()),
            E::ColumnNotFound(col) => Self::query_failed(format!("Column not found: {}", col)),
            E::ColumnIndexOutOfBounds { index, len } => Self::query_failed(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            E::ColumnDecode { index, source } => {
                Self::decode(format!("Failed to decode column {}: {}", index, source))
            }
            E::Decode(e) => Self::decode(e.to_string()),
            E::TypeNotFound { type_name } => {
                Self::decode(format!("Type not found: {}", type_name))
            }
            _ => Self::new(DataSourceErrorKind::Other, err.to_string()),
        }
    }
}

// ============================================================================
// Crate Error
// ============================================================================

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// The query can never succeed against the current setup
    #[error("{0}")]
    Configuration(ConfigurationError),

    /// A fetched row did not fit the target type
    #[error("{0}")]
    Mapping(MappingError),

    /// The data source failed while running a statement
    #[error("{0}")]
    DataSource(DataSourceError),

    /// Request parameters could not be parsed into a query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),
}

impl Error {
    /// Check if retrying the same query may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::DataSource(err) => err.is_retriable(),
            _ => false,
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Error::Configuration(err)
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<DataSourceError> for Error {
    fn from(err: DataSourceError) -> Self {
        Error::DataSource(err)
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::DataSource(DataSourceError::from(err))
    }
}

/// Result type alias using the crate's error type
pub type Result<T> = std::result::Result<T, Error>;
