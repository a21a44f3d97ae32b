//! Session store trait

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::{NewSession, SessionRecord, SessionUpdate};

/// Trait for session storage backends
///
/// Every backend exposes the same observable semantics; only durability and
/// latency differ. A missing token is never an error: reads return `None`
/// and writes become no-ops.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Store a new session and return its freshly generated token
    async fn create(&self, session: NewSession) -> Result<String, SessionError>;

    /// Get a session by token
    ///
    /// Expired sessions are still returned until they are purged; callers
    /// check [`SessionRecord::is_expired`].
    async fn read(&self, token: &str) -> Result<Option<SessionRecord>, SessionError>;

    /// Get only the CSRF token of a session
    async fn read_csrf(&self, token: &str) -> Result<Option<String>, SessionError>;

    /// Replace the CSRF token with a new random one and return it
    async fn set_csrf(&self, token: &str) -> Result<Option<String>, SessionError>;

    /// Apply a partial update
    async fn update(&self, token: &str, update: SessionUpdate) -> Result<(), SessionError>;

    /// Bind the session to a user, or back to anonymous with `None`
    async fn set_user_id(&self, token: &str, user_id: Option<Uuid>) -> Result<(), SessionError>;

    /// Delete one session
    async fn delete(&self, token: &str) -> Result<(), SessionError>;

    /// Delete every session bound to `user_id`, returning how many were removed
    async fn delete_all(&self, user_id: Uuid) -> Result<u64, SessionError>;

    /// Delete every session bound to `user_id` except `token`
    async fn delete_other(&self, token: &str, user_id: Uuid) -> Result<u64, SessionError>;

    /// Delete sessions whose expiry is strictly before now
    async fn delete_expired(&self) -> Result<u64, SessionError>;
}
