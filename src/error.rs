//! Session error types

use std::fmt;

use crate::decoder::DecodeError;

/// Errors that can occur during session operations
#[derive(Debug)]
pub enum SessionError {
    /// Error from the session store itself (misconfiguration, unsupported operation)
    StoreError(String),
    /// Error during payload serialization/deserialization
    SerializationError(String),
    /// A returned row did not match the target record's field schema
    Decode(DecodeError),
    /// Statement execution failed in a non-sqlx executor
    Execution(String),
    /// Database error (when postgres-store feature is enabled)
    #[cfg(feature = "postgres-store")]
    Database(sqlx::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::StoreError(msg) => write!(f, "Session store error: {}", msg),
            SessionError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::Decode(e) => write!(f, "Row decode error: {}", e),
            SessionError::Execution(msg) => write!(f, "Statement execution error: {}", msg),
            #[cfg(feature = "postgres-store")]
            SessionError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Decode(e) => Some(e),
            #[cfg(feature = "postgres-store")]
            SessionError::Database(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "postgres-store")]
impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        SessionError::Database(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationError(err.to_string())
    }
}

impl From<DecodeError> for SessionError {
    fn from(err: DecodeError) -> Self {
        SessionError::Decode(err)
    }
}
