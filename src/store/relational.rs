//! Relational session store
//!
//! Every contract operation is exactly one parameterized statement against
//! the fixed [`schema`](crate::session::schema) table. Values are always bound,
//! identifiers always come from the schema constants.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, trace};
use uuid::Uuid;

use super::sql::{ident, SetClause, SqlExecutor, Statement};
use super::SessionStore;
use crate::decoder::RowDecoder;
use crate::error::SessionError;
use crate::row::SqlValue;
use crate::session::{generate_csrf, schema, CsrfRow, NewSession, SessionRecord, SessionUpdate};

/// Session store backed by a SQL database
///
/// # Example
///
/// ```rust,ignore
/// use db_session::{PostgresExecutor, RelationalStore};
///
/// let pool = sqlx::PgPool::connect("postgres://localhost/app").await?;
/// let store = RelationalStore::new(PostgresExecutor::new(pool));
/// ```
pub struct RelationalStore<E: SqlExecutor> {
    executor: E,
    decoder: RowDecoder,
}

impl<E: SqlExecutor> RelationalStore<E> {
    /// Create a store running its statements on `executor`
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            decoder: RowDecoder::new(),
        }
    }

    /// The underlying executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn select_by_token(columns: &str, token: &str) -> Statement {
        Statement::new(
            format!(
                "SELECT {} FROM {} WHERE {} = $1 LIMIT 1;",
                columns,
                ident(schema::TABLE),
                ident(schema::TOKEN)
            ),
            vec![token.into()],
        )
    }

    async fn run(&self, statement: Statement) -> Result<u64, SessionError> {
        trace!(sql = %statement.sql, binds = statement.binds.len(), "executing session statement");
        self.executor.execute(&statement).await
    }
}

#[async_trait]
impl<E: SqlExecutor> SessionStore for RelationalStore<E> {
    async fn create(&self, session: NewSession) -> Result<String, SessionError> {
        let record = SessionRecord::new(session);
        let columns: Vec<String> = schema::COLUMNS.iter().map(|c| ident(c)).collect();
        let statement = Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6);",
                ident(schema::TABLE),
                columns.join(", ")
            ),
            vec![
                record.id.into(),
                record.token.as_str().into(),
                record.csrf.as_str().into(),
                record.data.clone().into(),
                record.expires.into(),
                record.user_id.into(),
            ],
        );
        self.run(statement).await?;
        debug!(id = %record.id, "created session row");
        Ok(record.token)
    }

    async fn read(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let columns: Vec<String> = schema::COLUMNS.iter().map(|c| ident(c)).collect();
        let statement = Self::select_by_token(&columns.join(", "), token);
        match self.executor.fetch_optional(&statement).await? {
            Some(row) => Ok(Some(self.decoder.decode(&row)?)),
            None => Ok(None),
        }
    }

    async fn read_csrf(&self, token: &str) -> Result<Option<String>, SessionError> {
        let statement = Self::select_by_token(&ident(schema::CSRF), token);
        match self.executor.fetch_optional(&statement).await? {
            Some(row) => {
                let row: CsrfRow = self.decoder.decode(&row)?;
                Ok(Some(row.csrf))
            }
            None => Ok(None),
        }
    }

    async fn set_csrf(&self, token: &str) -> Result<Option<String>, SessionError> {
        let csrf = generate_csrf();
        let mut set = SetClause::new();
        set.set(schema::CSRF, csrf.as_str());
        let affected = self
            .run(set.into_update(schema::TABLE, schema::TOKEN, token))
            .await?;
        Ok((affected > 0).then_some(csrf))
    }

    async fn update(&self, token: &str, update: SessionUpdate) -> Result<(), SessionError> {
        let mut set = SetClause::new();
        if let Some(data) = update.data {
            set.set(schema::DATA, data);
        }
        if let Some(expires) = update.expires {
            set.set(schema::EXPIRES, expires);
        }
        if let Some(user_id) = update.user_id {
            set.set(schema::USER_ID, user_id);
        }
        if set.is_empty() {
            return Ok(());
        }
        self.run(set.into_update(schema::TABLE, schema::TOKEN, token))
            .await?;
        Ok(())
    }

    async fn set_user_id(&self, token: &str, user_id: Option<Uuid>) -> Result<(), SessionError> {
        let mut set = SetClause::new();
        set.set(schema::USER_ID, user_id);
        self.run(set.into_update(schema::TABLE, schema::TOKEN, token))
            .await?;
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        let statement = Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = $1;",
                ident(schema::TABLE),
                ident(schema::TOKEN)
            ),
            vec![token.into()],
        );
        self.run(statement).await?;
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, SessionError> {
        let statement = Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = $1;",
                ident(schema::TABLE),
                ident(schema::USER_ID)
            ),
            vec![user_id.into()],
        );
        let removed = self.run(statement).await?;
        debug!(%user_id, removed, "deleted all user session rows");
        Ok(removed)
    }

    async fn delete_other(&self, token: &str, user_id: Uuid) -> Result<u64, SessionError> {
        let statement = Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = $1 AND {} != $2;",
                ident(schema::TABLE),
                ident(schema::USER_ID),
                ident(schema::TOKEN)
            ),
            vec![user_id.into(), token.into()],
        );
        let removed = self.run(statement).await?;
        debug!(%user_id, removed, "deleted other user session rows");
        Ok(removed)
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let statement = Statement::new(
            format!(
                "DELETE FROM {} WHERE {} < $1;",
                ident(schema::TABLE),
                ident(schema::EXPIRES)
            ),
            vec![SqlValue::Timestamp(Utc::now())],
        );
        let removed = self.run(statement).await?;
        debug!(removed, "deleted expired session rows");
        Ok(removed)
    }
}
