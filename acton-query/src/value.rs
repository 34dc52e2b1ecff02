//! Values bound into statements and the kinds used to coerce them
//!
//! [`SqlValue`] is what filters and extra parameters carry into a statement.
//! [`ValueKind`] is the declared kind of a logical property; it turns request
//! strings into bound values and raw column values into the JSON shape the
//! target type deserializes from.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// A value bound to a named statement parameter
///
/// # Example
///
/// ```rust
/// use acton_query::SqlValue;
///
/// let name: SqlValue = "SEOUL".into();
/// let quantity: SqlValue = 2_i64.into();
/// let ids: SqlValue = vec![1_i64, 2].into();
/// assert!(ids.is_list());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit float value
    Float(f64),
    /// Text value
    Text(String),
    /// List of values, expanded to one placeholder per element
    List(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns true for [`SqlValue::List`]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns true for [`SqlValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for SqlValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Named parameters bound to a statement
///
/// Keys are the names used by `:name` placeholders. Iteration is in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(BTreeMap<String, SqlValue>);

impl Parameters {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under the same key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a parameter, returning the value it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a parameter by key
    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.0.get(key)
    }

    /// Returns true if a parameter is bound under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Declared kind of a logical property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Text
    #[default]
    Text,
    /// Signed integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean
    Boolean,
    /// Arbitrary JSON, passed through unchanged
    Json,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl ValueKind {
    /// Parse a request parameter into a bound value of this kind
    pub fn parse(&self, raw: &str) -> Result<SqlValue, String> {
        let trimmed = raw.trim();
        match self {
            Self::Text | Self::Json => Ok(SqlValue::Text(raw.to_string())),
            Self::Integer => trimmed
                .parse::<i64>()
                .map(SqlValue::Integer)
                .map_err(|_| format!("`{}` is not an integer", raw)),
            Self::Float => trimmed
                .parse::<f64>()
                .map(SqlValue::Float)
                .map_err(|_| format!("`{}` is not a number", raw)),
            Self::Boolean => parse_bool(trimmed)
                .map(SqlValue::Boolean)
                .ok_or_else(|| format!("`{}` is not a boolean", raw)),
        }
    }

    /// Coerce a raw column value into the JSON shape of this kind
    ///
    /// NULL passes through for every kind.
    pub fn coerce(&self, value: JsonValue) -> Result<JsonValue, String> {
        match (self, value) {
            (_, JsonValue::Null) => Ok(JsonValue::Null),
            (Self::Json, value) => Ok(value),
            (Self::Text, JsonValue::String(s)) => Ok(JsonValue::String(s)),
            (Self::Text, JsonValue::Number(n)) => Ok(JsonValue::String(n.to_string())),
            (Self::Text, JsonValue::Bool(b)) => Ok(JsonValue::String(b.to_string())),
            (Self::Integer, JsonValue::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Ok(JsonValue::from(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(JsonValue::from(f as i64))
                        }
                        _ => Err(format!("expected integer, found {}", n)),
                    }
                }
            }
            (Self::Integer, JsonValue::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(JsonValue::from)
                .map_err(|_| format!("expected integer, found `{}`", s)),
            (Self::Integer, JsonValue::Bool(b)) => Ok(JsonValue::from(i64::from(b))),
            (Self::Float, JsonValue::Number(n)) => n
                .as_f64()
                .map(JsonValue::from)
                .ok_or_else(|| format!("expected number, found {}", n)),
            (Self::Float, JsonValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(JsonValue::from)
                .map_err(|_| format!("expected number, found `{}`", s)),
            (Self::Boolean, JsonValue::Bool(b)) => Ok(JsonValue::Bool(b)),
            (Self::Boolean, JsonValue::Number(n)) => match n.as_i64() {
                Some(0) => Ok(JsonValue::Bool(false)),
                Some(1) => Ok(JsonValue::Bool(true)),
                _ => Err(format!("expected boolean, found {}", n)),
            },
            (Self::Boolean, JsonValue::String(s)) => parse_bool(s.trim())
                .map(JsonValue::Bool)
                .ok_or_else(|| format!("expected boolean, found `{}`", s)),
            (kind, other) => Err(format!("expected {}, found {}", kind, other)),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_value_conversions() {
        assert_eq!(SqlValue::from("PARIS"), SqlValue::Text("PARIS".into()));
        assert_eq!(SqlValue::from(2_i32), SqlValue::Integer(2));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(vec![1_i64, 2]),
            SqlValue::List(vec![SqlValue::Integer(1), SqlValue::Integer(2)])
        );
    }

    #[test]
    fn test_sql_value_display() {
        let list = SqlValue::from(vec!["a", "b"]);
        assert_eq!(list.to_string(), "[a, b]");
        assert_eq!(SqlValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_parameters_builder_and_iteration_order() {
        let params = Parameters::new()
            .with("storeName", "SEOUL")
            .with("itemId", 1_i64);

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("storeName"), Some(&SqlValue::Text("SEOUL".into())));
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["itemId", "storeName"]);
    }

    #[test]
    fn test_parameters_insert_reports_replacement() {
        let mut params = Parameters::new();
        assert!(params.insert("qty", 1_i64).is_none());
        assert_eq!(params.insert("qty", 2_i64), Some(SqlValue::Integer(1)));
    }

    #[test]
    fn test_value_kind_parse() {
        assert_eq!(ValueKind::Integer.parse(" 2 "), Ok(SqlValue::Integer(2)));
        assert_eq!(ValueKind::Float.parse("1.5"), Ok(SqlValue::Float(1.5)));
        assert_eq!(ValueKind::Boolean.parse("TRUE"), Ok(SqlValue::Boolean(true)));
        assert_eq!(ValueKind::Text.parse(" IR"), Ok(SqlValue::Text(" IR".into())));
        assert!(ValueKind::Integer.parse("two").is_err());
        assert!(ValueKind::Boolean.parse("yes").is_err());
    }

    #[test]
    fn test_value_kind_coerce() {
        assert_eq!(ValueKind::Integer.coerce(json!("7")), Ok(json!(7)));
        assert_eq!(ValueKind::Integer.coerce(json!(7.0)), Ok(json!(7)));
        assert_eq!(ValueKind::Float.coerce(json!(2)), Ok(json!(2.0)));
        assert_eq!(ValueKind::Boolean.coerce(json!(1)), Ok(json!(true)));
        assert_eq!(ValueKind::Text.coerce(json!(3)), Ok(json!("3")));
        assert_eq!(ValueKind::Json.coerce(json!({"a": 1})), Ok(json!({"a": 1})));
        assert_eq!(ValueKind::Integer.coerce(JsonValue::Null), Ok(JsonValue::Null));
    }

    #[test]
    fn test_value_kind_coerce_rejects_mismatch() {
        assert!(ValueKind::Integer.coerce(json!(1.5)).is_err());
        assert!(ValueKind::Integer.coerce(json!("abc")).is_err());
        assert!(ValueKind::Boolean.coerce(json!(2)).is_err());
        assert!(ValueKind::Text.coerce(json!([1, 2])).is_err());
    }
}
