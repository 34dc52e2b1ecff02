//! Placeholder rewriting for concrete backends
//!
//! Statements carry named `:name` placeholders. [`Dialect::bind`] rewrites them
//! into the backend's positional form and collects the values in bind order.
//! List values expand to one placeholder per element, so `IN (:ids)` with
//! `[1, 2]` becomes `IN ($1, $2)`; an empty list renders as `NULL`, which
//! matches nothing.
//!
//! Quoted literals, quoted identifiers, comments and `::` casts are copied
//! through untouched.

use std::fmt;

use crate::error::ConfigurationError;
use crate::value::{Parameters, SqlValue};

/// SQL flavour of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `$1, $2, ...`
    Postgres,
    /// `?1, ?2, ...`
    Sqlite,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Statement with positional placeholders and its values in bind order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    /// SQL text
    pub sql: String,
    /// Scalar values, one per placeholder
    pub values: Vec<SqlValue>,
}

impl Dialect {
    fn placeholder(&self, position: usize) -> String {
        match self {
            Self::Postgres => format!("${}", position),
            Self::Sqlite => format!("?{}", position),
        }
    }

    /// Rewrite `:name` placeholders in `sql` using `parameters`
    ///
    /// Parameters that the statement never references are ignored.
    pub fn bind(&self, sql: &str, parameters: &Parameters) -> Result<BoundStatement, ConfigurationError> {
        let bytes = sql.as_bytes();
        let mut out = String::with_capacity(sql.len() + 16);
        let mut values = Vec::new();
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i, quote),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = bytes[i..]
                        .iter()
                        .position(|b| *b == b'\n')
                        .map_or(bytes.len(), |p| i + p + 1);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = sql[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                }
                b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
                b':' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                    let start = i + 1;
                    let end = bytes[start..]
                        .iter()
                        .position(|b| !is_ident_continue(*b))
                        .map_or(bytes.len(), |p| start + p);
                    let name = &sql[start..end];
                    let value = parameters
                        .get(name)
                        .ok_or_else(|| ConfigurationError::unbound_parameter(name))?;

                    out.push_str(&sql[copied..i]);
                    self.push_value(&mut out, &mut values, value);
                    copied = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&sql[copied..]);

        Ok(BoundStatement { sql: out, values })
    }

    fn push_value(&self, out: &mut String, values: &mut Vec<SqlValue>, value: &SqlValue) {
        match value {
            SqlValue::List(items) if items.is_empty() => out.push_str("NULL"),
            SqlValue::List(items) => {
                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        out.push_str(", ");
                    }
                    values.push(item.clone());
                    out.push_str(&self.placeholder(values.len()));
                }
            }
            scalar => {
                values.push(scalar.clone());
                out.push_str(&self.placeholder(values.len()));
            }
        }
    }
}

/// Index just past the literal opened at `start`; doubled quotes are escapes
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationErrorKind;

    #[test]
    fn test_postgres_positional_placeholders() {
        let params = Parameters::new().with("qty", 1_i64).with("store_name", "SEOUL");
        let bound = Dialect::Postgres
            .bind("qty < :qty AND store_name = :store_name", &params)
            .unwrap();
        assert_eq!(bound.sql, "qty < $1 AND store_name = $2");
        assert_eq!(
            bound.values,
            vec![SqlValue::Integer(1), SqlValue::Text("SEOUL".into())]
        );
    }

    #[test]
    fn test_sqlite_positional_placeholders() {
        let params = Parameters::new().with("qty", 2_i64);
        let bound = Dialect::Sqlite.bind("qty = :qty", &params).unwrap();
        assert_eq!(bound.sql, "qty = ?1");
        assert_eq!(bound.values, vec![SqlValue::Integer(2)]);
    }

    #[test]
    fn test_repeated_name_binds_each_occurrence() {
        let params = Parameters::new().with("n", 5_i64);
        let bound = Dialect::Sqlite.bind("a = :n OR b = :n", &params).unwrap();
        assert_eq!(bound.sql, "a = ?1 OR b = ?2");
        assert_eq!(bound.values.len(), 2);
    }

    #[test]
    fn test_list_expansion() {
        let params = Parameters::new().with("item_id", vec![1_i64, 2, 3]);
        let bound = Dialect::Postgres.bind("item_id IN (:item_id)", &params).unwrap();
        assert_eq!(bound.sql, "item_id IN ($1, $2, $3)");
        assert_eq!(bound.values.len(), 3);
    }

    #[test]
    fn test_empty_list_renders_null() {
        let params = Parameters::new().with("item_id", SqlValue::List(Vec::new()));
        let bound = Dialect::Sqlite.bind("item_id IN (:item_id)", &params).unwrap();
        assert_eq!(bound.sql, "item_id IN (NULL)");
        assert!(bound.values.is_empty());
    }

    #[test]
    fn test_literals_casts_and_comments_untouched() {
        let params = Parameters::new().with("name", "IR");
        let sql = "SELECT ':skip', \":col\", created::date, '%' || :name || '%' -- :gone\n/* :also */ FROM t";
        let bound = Dialect::Postgres.bind(sql, &params).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT ':skip', \":col\", created::date, '%' || $1 || '%' -- :gone\n/* :also */ FROM t"
        );
        assert_eq!(bound.values, vec![SqlValue::Text("IR".into())]);
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let params = Parameters::new().with("x", 1_i64);
        let bound = Dialect::Sqlite.bind("'it''s :x' = :x", &params).unwrap();
        assert_eq!(bound.sql, "'it''s :x' = ?1");
    }

    #[test]
    fn test_unbound_parameter() {
        let err = Dialect::Sqlite
            .bind("store_name = :storeName", &Parameters::new())
            .unwrap_err();
        assert_eq!(err.kind, ConfigurationErrorKind::UnboundParameter);
        assert!(err.message.contains("storeName"));
    }

    #[test]
    fn test_unreferenced_parameters_ignored() {
        let params = Parameters::new().with("unused", 1_i64);
        let bound = Dialect::Postgres.bind("SELECT 1", &params).unwrap();
        assert_eq!(bound.sql, "SELECT 1");
        assert!(bound.values.is_empty());
    }
}
