//! Postgres executor backed by an sqlx connection pool
//!
//! ```rust,ignore
//! use db_session::{PostgresExecutor, RelationalStore};
//!
//! let pool = sqlx::PgPool::connect("postgres://localhost/app").await?;
//! let store = RelationalStore::new(PostgresExecutor::new(pool));
//! ```
//!
//! Expected table layout (managed by the application's migrations):
//!
//! ```sql
//! CREATE TABLE "_db_sessions" (
//!     "id"      UUID PRIMARY KEY,
//!     "token"   VARCHAR(64) NOT NULL,
//!     "csrf"    VARCHAR(64) NOT NULL,
//!     "data"    BYTEA,
//!     "expires" TIMESTAMPTZ NOT NULL,
//!     "user_id" UUID
//! );
//! CREATE UNIQUE INDEX sess_token_uidx ON "_db_sessions" ("token");
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row, ValueRef};
use uuid::Uuid;

use super::sql::{SqlExecutor, Statement};
use crate::decoder::DecodeError;
use crate::error::SessionError;
use crate::row::{SqlRow, SqlType, SqlValue};

/// [`SqlExecutor`] over a Postgres pool
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool from a connection string
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// The underlying pool, for running migrations or ad hoc queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Bind every parameter in order; nulls are bound with their column type so
/// Postgres can infer parameter types
fn bind_all<'q>(statement: &'q Statement) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(&statement.sql);
    for value in &statement.binds {
        query = match value.clone() {
            SqlValue::Null(SqlType::Bool) => query.bind(None::<bool>),
            SqlValue::Null(SqlType::Int) => query.bind(None::<i64>),
            SqlValue::Null(SqlType::Float) => query.bind(None::<f64>),
            SqlValue::Null(SqlType::Text) => query.bind(None::<String>),
            SqlValue::Null(SqlType::Bytes) => query.bind(None::<Vec<u8>>),
            SqlValue::Null(SqlType::Uuid) => query.bind(None::<Uuid>),
            SqlValue::Null(SqlType::Timestamp) => query.bind(None::<DateTime<Utc>>),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Float(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Bytes(v) => query.bind(v),
            SqlValue::Uuid(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

#[async_trait]
impl SqlExecutor for PostgresExecutor {
    type Row = PgRow;

    async fn execute(&self, statement: &Statement) -> Result<u64, SessionError> {
        let result = bind_all(statement).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_optional(&self, statement: &Statement) -> Result<Option<PgRow>, SessionError> {
        Ok(bind_all(statement).fetch_optional(&self.pool).await?)
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<PgRow>, SessionError> {
        Ok(bind_all(statement).fetch_all(&self.pool).await?)
    }
}

/// Typed extraction failed; anything but a missing column is a mismatch
fn column_error(column: &str, ty: SqlType, err: sqlx::Error) -> DecodeError {
    match err {
        sqlx::Error::ColumnNotFound(name) => DecodeError::MissingColumn(name),
        other => DecodeError::TypeMismatch {
            column: column.to_string(),
            expected: ty,
            found: other.to_string(),
        },
    }
}

/// Raw access failed before any type was involved
fn unreadable_column(column: &str, err: sqlx::Error) -> DecodeError {
    match err {
        sqlx::Error::ColumnNotFound(name) => DecodeError::MissingColumn(name),
        other => DecodeError::Unreadable {
            column: column.to_string(),
            reason: other.to_string(),
        },
    }
}

impl SqlRow for PgRow {
    fn column_names(&self) -> Vec<&str> {
        Row::columns(self).iter().map(|c| c.name()).collect()
    }

    fn contains_column(&self, column: &str) -> bool {
        Row::columns(self).iter().any(|c| c.name() == column)
    }

    fn is_null(&self, column: &str) -> Result<bool, DecodeError> {
        self.try_get_raw(column)
            .map(|value| value.is_null())
            .map_err(|e| unreadable_column(column, e))
    }

    fn value(&self, column: &str, ty: SqlType) -> Result<SqlValue, DecodeError> {
        let value = match ty {
            SqlType::Bool => self.try_get::<bool, _>(column).map(SqlValue::Bool),
            // INT4 and INT2 columns are widened
            SqlType::Int => self
                .try_get::<i64, _>(column)
                .or_else(|_| self.try_get::<i32, _>(column).map(i64::from))
                .or_else(|_| self.try_get::<i16, _>(column).map(i64::from))
                .map(SqlValue::Int),
            SqlType::Float => self
                .try_get::<f64, _>(column)
                .or_else(|_| self.try_get::<f32, _>(column).map(f64::from))
                .map(SqlValue::Float),
            SqlType::Text => self.try_get::<String, _>(column).map(SqlValue::Text),
            SqlType::Bytes => self.try_get::<Vec<u8>, _>(column).map(SqlValue::Bytes),
            SqlType::Uuid => self.try_get::<Uuid, _>(column).map(SqlValue::Uuid),
            SqlType::Timestamp => self
                .try_get::<DateTime<Utc>, _>(column)
                .map(SqlValue::Timestamp),
        };
        value.map_err(|e| column_error(column, ty, e))
    }
}
