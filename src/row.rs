//! Row abstraction consumed by the decoder
//!
//! A result row is anything that can enumerate its columns, report nulls and
//! hand back a typed [`SqlValue`] for a named column. Database drivers adapt
//! their native row type to [`SqlRow`]; [`ValueRow`] is an owned row useful for
//! executors that materialize results themselves.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::decoder::DecodeError;

/// Column types understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Uuid,
    Timestamp,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Bool => "bool",
            SqlType::Int => "int",
            SqlType::Float => "float",
            SqlType::Text => "text",
            SqlType::Bytes => "bytes",
            SqlType::Uuid => "uuid",
            SqlType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A single column value, either read from a row or bound as a statement parameter
///
/// Nulls carry their type so that drivers with strict parameter typing
/// (Postgres) can bind them.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(SqlType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Type of this value
    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Null(ty) => *ty,
            SqlValue::Bool(_) => SqlType::Bool,
            SqlValue::Int(_) => SqlType::Int,
            SqlValue::Float(_) => SqlType::Float,
            SqlValue::Text(_) => SqlType::Text,
            SqlValue::Bytes(_) => SqlType::Bytes,
            SqlValue::Uuid(_) => SqlType::Uuid,
            SqlValue::Timestamp(_) => SqlType::Timestamp,
        }
    }

    /// Whether this is SQL `NULL` of any type
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Convert to the requested type if a lossless conversion exists
    ///
    /// Integers widen to floats, text parses into uuids and RFC 3339
    /// timestamps. Anything else must already have the requested type.
    pub fn convert(self, ty: SqlType) -> Option<SqlValue> {
        if self.sql_type() == ty {
            return Some(self);
        }
        match (self, ty) {
            (SqlValue::Int(i), SqlType::Float) => Some(SqlValue::Float(i as f64)),
            (SqlValue::Text(s), SqlType::Uuid) => Uuid::parse_str(&s).ok().map(SqlValue::Uuid),
            (SqlValue::Text(s), SqlType::Timestamp) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| SqlValue::Timestamp(dt.with_timezone(&Utc))),
            _ => None,
        }
    }
}

/// Rust types that can be extracted from a [`SqlValue`]
pub trait FromSqlValue: Sized {
    /// The column type this Rust type is read as
    const SQL_TYPE: SqlType;

    /// Returns `None` if the value is null or of another type
    fn from_sql_value(value: SqlValue) -> Option<Self>;
}

macro_rules! sql_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromSqlValue for $ty {
                const SQL_TYPE: SqlType = SqlType::$variant;

                fn from_sql_value(value: SqlValue) -> Option<Self> {
                    match value {
                        SqlValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value)
                }
            }
        )*
    };
}

sql_value_conversions! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: FromSqlValue + Into<SqlValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null(T::SQL_TYPE),
        }
    }
}

/// One tabular result row
pub trait SqlRow {
    /// Column names in result order
    fn column_names(&self) -> Vec<&str>;

    fn contains_column(&self, column: &str) -> bool {
        self.column_names().contains(&column)
    }

    /// Whether the named column holds SQL `NULL`
    fn is_null(&self, column: &str) -> Result<bool, DecodeError>;

    /// Extract the named column as the requested type
    fn value(&self, column: &str, ty: SqlType) -> Result<SqlValue, DecodeError>;

    /// Typed extraction of a single non-null column
    fn get<T: FromSqlValue>(&self, column: &str) -> Result<T, DecodeError>
    where
        Self: Sized,
    {
        let value = self.value(column, T::SQL_TYPE)?;
        let found = value.sql_type();
        if value.is_null() {
            return Err(DecodeError::UnexpectedNull(column.to_string()));
        }
        T::from_sql_value(value).ok_or_else(|| DecodeError::TypeMismatch {
            column: column.to_string(),
            expected: T::SQL_TYPE,
            found: found.to_string(),
        })
    }
}

/// An owned row of named values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueRow {
    columns: Vec<(String, SqlValue)>,
}

impl ValueRow {
    /// An empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder style
    pub fn with<S: Into<String>, V: Into<SqlValue>>(mut self, column: S, value: V) -> Self {
        self.push(column, value);
        self
    }

    /// Append a column; a repeated name replaces the earlier value
    pub fn push<S: Into<String>, V: Into<SqlValue>>(&mut self, column: S, value: V) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    fn lookup(&self, column: &str) -> Result<&SqlValue, DecodeError> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| DecodeError::MissingColumn(column.to_string()))
    }
}

impl SqlRow for ValueRow {
    fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn contains_column(&self, column: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == column)
    }

    fn is_null(&self, column: &str) -> Result<bool, DecodeError> {
        Ok(self.lookup(column)?.is_null())
    }

    fn value(&self, column: &str, ty: SqlType) -> Result<SqlValue, DecodeError> {
        let value = self.lookup(column)?.clone();
        if value.is_null() {
            return Err(DecodeError::UnexpectedNull(column.to_string()));
        }
        let found = value.sql_type();
        value.convert(ty).ok_or_else(|| DecodeError::TypeMismatch {
            column: column.to_string(),
            expected: ty,
            found: found.to_string(),
        })
    }
}
