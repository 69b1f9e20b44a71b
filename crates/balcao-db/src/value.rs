//! # Dynamic Row Values
//!
//! The generic repository core works on dynamic rows: an ordered map from
//! column name to a loosely-typed [`SqlValue`]. Entity repositories convert
//! between these rows and the typed structs from `balcao-core`.
//!
//! ## Value Normalization
//! Blank strings are persisted as SQL `NULL`, never as `''`. [`Row::set`]
//! applies this on the way in, so "clear this optional field" and "this
//! field is absent" look identical in the store.

use std::collections::BTreeMap;
use std::fmt;

use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _};

use crate::error::{DbError, DbResult};

// =============================================================================
// SqlValue
// =============================================================================

/// A loosely-typed SQL value, mirroring what the Any driver can bind.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl SqlValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Blank text collapses to `Null`; everything else is unchanged.
    pub fn normalized(self) -> Self {
        match self {
            SqlValue::Text(s) if s.trim().is_empty() => SqlValue::Null,
            other => other,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as `f64`. Integers widen, since SQLite is free to hand
    /// back `20` for a column we wrote `20.0` into.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            SqlValue::Real(f) => Some(*f),
            SqlValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::Real(r) => write!(f, "{r}"),
            SqlValue::Null => f.write_str("NULL"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

// =============================================================================
// Row
// =============================================================================

/// A dynamic row: column name → value, ordered by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, SqlValue>);

impl Row {
    pub fn new() -> Self {
        Row(BTreeMap::new())
    }

    /// Sets a column, normalizing blank text to `Null`.
    pub fn set(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.0.insert(column.to_string(), value.into().normalized());
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Required text column.
    pub fn get_text(&self, column: &str) -> DbResult<String> {
        match self.get(column) {
            Some(SqlValue::Text(s)) => Ok(s.clone()),
            other => Err(decode_error(column, "text", other)),
        }
    }

    /// Optional text column; `Null` and absent both read as `None`.
    pub fn get_opt_text(&self, column: &str) -> DbResult<Option<String>> {
        match self.get(column) {
            Some(SqlValue::Text(s)) => Ok(Some(s.clone())),
            Some(SqlValue::Null) | None => Ok(None),
            other => Err(decode_error(column, "text", other)),
        }
    }

    /// Required integer column.
    pub fn get_integer(&self, column: &str) -> DbResult<i64> {
        match self.get(column) {
            Some(SqlValue::Integer(i)) => Ok(*i),
            other => Err(decode_error(column, "integer", other)),
        }
    }

    /// Required numeric column; integers widen to `f64`.
    pub fn get_real(&self, column: &str) -> DbResult<f64> {
        match self.get(column).and_then(SqlValue::as_real) {
            Some(f) => Ok(f),
            None => Err(decode_error(column, "real", self.get(column))),
        }
    }

    /// Optional integer column.
    pub fn get_opt_integer(&self, column: &str) -> DbResult<Option<i64>> {
        match self.get(column) {
            Some(SqlValue::Integer(i)) => Ok(Some(*i)),
            Some(SqlValue::Null) | None => Ok(None),
            other => Err(decode_error(column, "integer", other)),
        }
    }

    /// Optional numeric column; integers widen to `f64`.
    pub fn get_opt_real(&self, column: &str) -> DbResult<Option<f64>> {
        match self.get(column) {
            Some(SqlValue::Null) | None => Ok(None),
            Some(v) => v
                .as_real()
                .map(Some)
                .ok_or_else(|| decode_error(column, "real", Some(v))),
        }
    }

    /// Removes a column, if present.
    pub fn remove(&mut self, column: &str) -> Option<SqlValue> {
        self.0.remove(column)
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k, v.normalized()))
            .collect())
    }
}

fn decode_error(column: &str, expected: &str, got: Option<&SqlValue>) -> DbError {
    let got = match got {
        Some(v) => format!("{v:?}"),
        None => "<missing>".to_string(),
    };
    DbError::Decode(format!("column {column}: expected {expected}, got {got}"))
}

// =============================================================================
// Driver Bridging
// =============================================================================

/// Decodes an [`AnyRow`] into a dynamic [`Row`].
///
/// The Any driver erases column type info across engines, so each column is
/// probed as integer, then real, then text. The probe order matters:
/// SQLite happily decodes the integer `3` as text `"3"`.
pub(crate) fn decode_row(row: &AnyRow) -> DbResult<Row> {
    let mut out = Row::new();

    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name();

        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            v.map_or(SqlValue::Null, SqlValue::Integer)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            v.map_or(SqlValue::Null, SqlValue::Real)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            v.map_or(SqlValue::Null, SqlValue::Text)
        } else {
            return Err(DbError::Decode(format!(
                "column {name}: not integer, real, or text"
            )));
        };

        out.0.insert(name.to_string(), value);
    }

    Ok(out)
}

/// Binds one [`SqlValue`] onto a query, in placeholder order.
pub(crate) fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Null => query.bind(None::<String>),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_normalizes_to_null() {
        let row = Row::new().with("ENDERECO", "   ").with("CLIENTE", "Ana");
        assert_eq!(row.get("ENDERECO"), Some(&SqlValue::Null));
        assert_eq!(row.get_opt_text("ENDERECO").unwrap(), None);
        assert_eq!(row.get_text("CLIENTE").unwrap(), "Ana");
    }

    #[test]
    fn test_option_converts_to_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("x".to_string())),
            SqlValue::Text("x".to_string())
        );
    }

    #[test]
    fn test_integer_widens_to_real() {
        let row = Row::new().with("VALOR", 20i64);
        assert!((row.get_real("VALOR").unwrap() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_typed_getters_reject_wrong_types() {
        let row = Row::new().with("ESTOQUE", "dez");
        assert!(row.get_integer("ESTOQUE").is_err());
        assert!(row.get_real("ESTOQUE").is_err());
        assert!(row.get_integer("MISSING").is_err());
    }
}
