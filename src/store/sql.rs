//! Raw statements and the execution capability the relational store runs on

use async_trait::async_trait;
use std::fmt::Write;

use crate::error::SessionError;
use crate::row::{SqlRow, SqlValue};

/// Quote an identifier from the fixed schema
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name)
}

/// SQL text with its positional parameters (`$1`, `$2`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    /// Bound in order: `binds[0]` is `$1`
    pub binds: Vec<SqlValue>,
}

impl Statement {
    /// Pair SQL text with its parameters
    pub fn new<S: Into<String>>(sql: S, binds: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }
}

/// Builds `"col" = $n, ...` lists with the bound values kept in lockstep
///
/// The placeholder number is always derived from the number of values already
/// pushed, so clauses and parameters cannot drift apart.
#[derive(Debug, Default)]
pub(crate) struct SetClause {
    clause: String,
    binds: Vec<SqlValue>,
}

impl SetClause {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append one assignment
    pub(crate) fn set(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.binds.push(value.into());
        if !self.clause.is_empty() {
            self.clause.push_str(", ");
        }
        // Writing to a String cannot fail.
        let _ = write!(self.clause, "{} = ${}", ident(column), self.binds.len());
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Finish as `UPDATE table SET ... WHERE "key" = $n` with the key bound last
    pub(crate) fn into_update(mut self, table: &str, key: &str, key_value: impl Into<SqlValue>) -> Statement {
        self.binds.push(key_value.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${};",
            ident(table),
            self.clause,
            ident(key),
            self.binds.len()
        );
        Statement::new(sql, self.binds)
    }
}

/// Runs statements against a relational backend
///
/// Implementations own connections, pooling and timeouts. A failed or
/// cancelled statement must surface as an error.
#[async_trait]
pub trait SqlExecutor: Send + Sync + 'static {
    type Row: SqlRow + Send;

    /// Run to completion, returning the number of affected rows
    async fn execute(&self, statement: &Statement) -> Result<u64, SessionError>;

    /// First result row, if any
    async fn fetch_optional(&self, statement: &Statement) -> Result<Option<Self::Row>, SessionError>;

    /// Every result row
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Self::Row>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_set_clause_numbering() {
        let user = Uuid::new_v4();
        let mut set = SetClause::new();
        assert!(set.is_empty());
        set.set("data", vec![1u8]).set("user_id", user);

        let statement = set.into_update("_db_sessions", "token", "tok");
        assert_eq!(
            statement.sql,
            "UPDATE \"_db_sessions\" SET \"data\" = $1, \"user_id\" = $2 WHERE \"token\" = $3;"
        );
        assert_eq!(
            statement.binds,
            vec![
                SqlValue::Bytes(vec![1]),
                SqlValue::Uuid(user),
                SqlValue::Text("tok".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_assignment() {
        let mut set = SetClause::new();
        set.set("expires", SqlValue::Null(crate::row::SqlType::Timestamp));
        let statement = set.into_update("t", "k", "v");
        assert_eq!(statement.sql, "UPDATE \"t\" SET \"expires\" = $1 WHERE \"k\" = $2;");
        assert_eq!(statement.binds.len(), 2);
    }
}
