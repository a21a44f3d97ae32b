//! Schema-driven row decoding
//!
//! A record type declares its layout once as a static [`Shape`]: a flat list of
//! [`Field`]s, each naming the column it reads from and the type it expects.
//! [`RowDecoder`] walks that list against any [`SqlRow`] and hands the
//! collected values to [`RowRecord::from_fields`].
//!
//! Only flat records are supported. Rows have no notion of nesting, so
//! nested or list fields, as well as scalar and sequence shapes, are
//! rejected with [`DecodeError::UnsupportedShape`].
//!
//! ```rust
//! use db_session::decoder::{decode_row, DecodeError, DecodedFields, Field, RowRecord, Shape};
//! use db_session::row::{SqlType, ValueRow};
//!
//! struct Planet {
//!     name: String,
//!     moons: Option<i64>,
//! }
//!
//! impl RowRecord for Planet {
//!     const SHAPE: Shape = Shape::Keyed(&[
//!         Field::required("name", "name", SqlType::Text),
//!         Field::optional("moons", "moon_count", SqlType::Int),
//!     ]);
//!
//!     fn from_fields(mut fields: DecodedFields) -> Result<Self, DecodeError> {
//!         Ok(Self {
//!             name: fields.take("name")?,
//!             moons: fields.take_optional("moons")?,
//!         })
//!     }
//! }
//!
//! let row = ValueRow::new().with("name", "Mars").with("moon_count", 2i64);
//! let planet: Planet = decode_row(&row).unwrap();
//! assert_eq!(planet.name, "Mars");
//! assert_eq!(planet.moons, Some(2));
//! ```

use std::fmt;

use crate::row::{FromSqlValue, SqlRow, SqlType, SqlValue};

/// Errors produced while decoding a row
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The row has no column with this name
    MissingColumn(String),
    /// The column could not be converted to the field's type
    TypeMismatch {
        column: String,
        expected: SqlType,
        found: String,
    },
    /// A required field's column is null
    UnexpectedNull(String),
    /// The driver could not read the column at all
    Unreadable { column: String, reason: String },
    /// The record layout is nested, a list or a bare scalar
    UnsupportedShape(String),
    /// `from_fields` asked for a field the schema does not declare
    UnknownField(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MissingColumn(column) => write!(f, "missing column \"{}\"", column),
            DecodeError::TypeMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "type mismatch in column \"{}\": expected {}, found {}",
                column, expected, found
            ),
            DecodeError::UnexpectedNull(column) => {
                write!(f, "unexpected null in required column \"{}\"", column)
            }
            DecodeError::Unreadable { column, reason } => {
                write!(f, "cannot read column \"{}\": {}", column, reason)
            }
            DecodeError::UnsupportedShape(what) => write!(f, "unsupported shape: {}", what),
            DecodeError::UnknownField(name) => write!(f, "field \"{}\" is not in the schema", name),
        }
    }
}

impl std::error::Error for DecodeError {}

/// What a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single column of the given type
    Scalar(SqlType),
    /// A nested record; never decodable from a flat row
    Nested,
    /// A list of values; never decodable from a flat row
    List,
}

/// Mapping of one record field to one row column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Name used by [`DecodedFields::take`]
    pub name: &'static str,
    /// Column read from the row
    pub column: &'static str,
    /// Expected shape of the value
    pub kind: FieldKind,
    /// Whether a null column is accepted
    pub optional: bool,
}

impl Field {
    /// Non-null scalar field read from `column`
    pub const fn required(name: &'static str, column: &'static str, ty: SqlType) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::Scalar(ty),
            optional: false,
        }
    }

    /// Scalar field that decodes a null column as `None`
    pub const fn optional(name: &'static str, column: &'static str, ty: SqlType) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::Scalar(ty),
            optional: true,
        }
    }

    /// Nested record field; declaring one makes the type undecodable
    pub const fn nested(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::Nested,
            optional: false,
        }
    }

    /// List field; declaring one makes the type undecodable
    pub const fn list(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::List,
            optional: false,
        }
    }
}

/// Overall layout of a decodable type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Flat record of named fields; the only decodable shape
    Keyed(&'static [Field]),
    /// A single bare value
    Scalar(SqlType),
    /// An unkeyed sequence of values
    Sequence,
}

/// A type that can be built from one row
pub trait RowRecord: Sized {
    /// Field schema, declared once per type
    const SHAPE: Shape;

    /// Build the record from values collected in schema order
    fn from_fields(fields: DecodedFields) -> Result<Self, DecodeError>;
}

/// Values pulled from a row, keyed by field name
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFields {
    values: Vec<(&'static str, SqlValue)>,
}

impl DecodedFields {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    fn position(&self, name: &str) -> Result<usize, DecodeError> {
        self.values
            .iter()
            .position(|(field, _)| *field == name)
            .ok_or_else(|| DecodeError::UnknownField(name.to_string()))
    }

    /// Take a required field's value
    pub fn take<T: FromSqlValue>(&mut self, name: &str) -> Result<T, DecodeError> {
        self.take_optional(name)?
            .ok_or_else(|| DecodeError::UnexpectedNull(name.to_string()))
    }

    /// Take an optional field's value, `None` when the column was null
    pub fn take_optional<T: FromSqlValue>(&mut self, name: &str) -> Result<Option<T>, DecodeError> {
        let index = self.position(name)?;
        let (_, value) = self.values.swap_remove(index);
        if value.is_null() {
            return Ok(None);
        }
        let found = value.sql_type();
        T::from_sql_value(value)
            .map(Some)
            .ok_or_else(|| DecodeError::TypeMismatch {
                column: name.to_string(),
                expected: T::SQL_TYPE,
                found: found.to_string(),
            })
    }

    /// Number of values not yet taken
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether every value has been taken
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decodes rows into [`RowRecord`] types
#[derive(Debug, Clone, Copy, Default)]
pub struct RowDecoder;

impl RowDecoder {
    /// Create a decoder; it holds no state and can be shared freely
    pub fn new() -> Self {
        Self
    }

    /// Decode one row into `T`, failing on the first field that does not fit
    pub fn decode<T, R>(&self, row: &R) -> Result<T, DecodeError>
    where
        T: RowRecord,
        R: SqlRow + ?Sized,
    {
        let fields = match T::SHAPE {
            Shape::Keyed(fields) => fields,
            Shape::Scalar(ty) => {
                return Err(DecodeError::UnsupportedShape(format!(
                    "single {} value is not a keyed record",
                    ty
                )))
            }
            Shape::Sequence => {
                return Err(DecodeError::UnsupportedShape(
                    "unkeyed sequence is not a keyed record".to_string(),
                ))
            }
        };

        let mut decoded = DecodedFields::with_capacity(fields.len());
        for field in fields {
            decoded.values.push((field.name, Self::decode_field(field, row)?));
        }
        T::from_fields(decoded)
    }

    fn decode_field<R: SqlRow + ?Sized>(field: &Field, row: &R) -> Result<SqlValue, DecodeError> {
        let ty = match field.kind {
            FieldKind::Scalar(ty) => ty,
            FieldKind::Nested => {
                return Err(DecodeError::UnsupportedShape(format!(
                    "nested record in field \"{}\"",
                    field.name
                )))
            }
            FieldKind::List => {
                return Err(DecodeError::UnsupportedShape(format!(
                    "list in field \"{}\"",
                    field.name
                )))
            }
        };

        if !row.contains_column(field.column) {
            return Err(DecodeError::MissingColumn(field.column.to_string()));
        }
        if row.is_null(field.column)? {
            if field.optional {
                return Ok(SqlValue::Null(ty));
            }
            return Err(DecodeError::UnexpectedNull(field.column.to_string()));
        }
        row.value(field.column, ty)
    }
}

/// Decode one row with the default decoder
pub fn decode_row<T, R>(row: &R) -> Result<T, DecodeError>
where
    T: RowRecord,
    R: SqlRow + ?Sized,
{
    RowDecoder::new().decode(row)
}

/// Decode the first row of a result set, if there is one
pub fn decode_first<T, R>(rows: &[R]) -> Result<Option<T>, DecodeError>
where
    T: RowRecord,
    R: SqlRow,
{
    rows.first().map(|row| decode_row(row)).transpose()
}

/// Decode every row of a result set
pub fn decode_all<T, R>(rows: &[R]) -> Result<Vec<T>, DecodeError>
where
    T: RowRecord,
    R: SqlRow,
{
    rows.iter().map(|row| decode_row(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ValueRow;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    #[derive(Debug, PartialEq)]
    struct Account {
        id: Uuid,
        email: String,
        nickname: Option<String>,
        created: DateTime<Utc>,
    }

    impl RowRecord for Account {
        const SHAPE: Shape = Shape::Keyed(&[
            Field::required("id", "id", SqlType::Uuid),
            Field::required("email", "email_address", SqlType::Text),
            Field::optional("nickname", "nickname", SqlType::Text),
            Field::required("created", "created_at", SqlType::Timestamp),
        ]);

        fn from_fields(mut fields: DecodedFields) -> Result<Self, DecodeError> {
            Ok(Self {
                id: fields.take("id")?,
                email: fields.take("email")?,
                nickname: fields.take_optional("nickname")?,
                created: fields.take("created")?,
            })
        }
    }

    struct Tree;

    impl RowRecord for Tree {
        const SHAPE: Shape = Shape::Keyed(&[
            Field::required("name", "name", SqlType::Text),
            Field::nested("parent", "parent"),
        ]);

        fn from_fields(_fields: DecodedFields) -> Result<Self, DecodeError> {
            Ok(Tree)
        }
    }

    struct Count;

    impl RowRecord for Count {
        const SHAPE: Shape = Shape::Scalar(SqlType::Int);

        fn from_fields(_fields: DecodedFields) -> Result<Self, DecodeError> {
            Ok(Count)
        }
    }

    fn account_row(id: Uuid, created: DateTime<Utc>) -> ValueRow {
        ValueRow::new()
            .with("id", id)
            .with("email_address", "alice@example.com")
            .with("nickname", None::<String>)
            .with("created_at", created)
    }

    #[test]
    fn test_decode_flat_record() {
        let id = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2024, 6, 26, 12, 0, 0).unwrap();

        let account: Account = decode_row(&account_row(id, created)).unwrap();
        assert_eq!(
            account,
            Account {
                id,
                email: "alice@example.com".to_string(),
                nickname: None,
                created,
            }
        );
    }

    #[test]
    fn test_extra_columns_ignored() {
        let id = Uuid::new_v4();
        let row = account_row(id, Utc::now())
            .with("unmapped", 7i64)
            .with("another", "x");

        let account: Account = decode_row(&row).unwrap();
        assert_eq!(account.id, id);
    }

    #[test]
    fn test_missing_column_fails() {
        let row = ValueRow::new()
            .with("id", Uuid::new_v4())
            .with("nickname", "al")
            .with("created_at", Utc::now());

        let err = decode_row::<Account, _>(&row).unwrap_err();
        assert_eq!(err, DecodeError::MissingColumn("email_address".to_string()));
    }

    #[test]
    fn test_null_in_required_column_fails() {
        let row = account_row(Uuid::new_v4(), Utc::now()).with("email_address", None::<String>);

        let err = decode_row::<Account, _>(&row).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedNull("email_address".to_string()));
    }

    #[test]
    fn test_type_mismatch_fails() {
        let row = account_row(Uuid::new_v4(), Utc::now()).with("created_at", 17i64);

        let err = decode_row::<Account, _>(&row).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch { ref column, expected: SqlType::Timestamp, .. } if column == "created_at"
        ));
    }

    #[test]
    fn test_nested_and_scalar_shapes_refused() {
        let row = ValueRow::new().with("name", "root").with("parent", "x");
        assert!(matches!(
            decode_row::<Tree, _>(&row),
            Err(DecodeError::UnsupportedShape(_))
        ));

        let row = ValueRow::new().with("count", 3i64);
        assert!(matches!(
            decode_row::<Count, _>(&row),
            Err(DecodeError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_unknown_field_in_from_fields() {
        let mut fields = DecodedFields::with_capacity(1);
        fields.values.push(("a", SqlValue::Int(1)));
        assert_eq!(
            fields.take::<i64>("b"),
            Err(DecodeError::UnknownField("b".to_string()))
        );
        assert_eq!(fields.take::<i64>("a"), Ok(1));
        assert!(fields.is_empty());
    }

    #[test]
    fn test_decode_first_and_all() {
        let created = Utc::now();
        let rows = vec![
            account_row(Uuid::new_v4(), created),
            account_row(Uuid::new_v4(), created),
        ];

        let all: Vec<Account> = decode_all(&rows).unwrap();
        assert_eq!(all.len(), 2);

        let first: Option<Account> = decode_first(&rows).unwrap();
        assert_eq!(first.map(|a| a.id), Some(all[0].id));

        let none: Option<Account> = decode_first::<Account, ValueRow>(&[]).unwrap();
        assert!(none.is_none());
    }
}
