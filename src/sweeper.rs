//! Periodic purge of expired sessions
//!
//! Stores never sweep on their own. The application decides whether to run
//! this task, and owns the returned handle.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::store::SessionStore;

/// Spawn a task calling [`SessionStore::delete_expired`] every `period`
///
/// The first sweep runs immediately. Failures are logged and the task keeps
/// going; abort the handle to stop it. Must be called from within a Tokio
/// runtime.
///
/// # Errors
/// - `SessionError::StoreError` if `period` is zero; nothing is spawned
pub fn spawn_expiry_sweeper(
    store: Arc<dyn SessionStore>,
    period: Duration,
) -> Result<JoinHandle<()>, SessionError> {
    if period.is_zero() {
        return Err(SessionError::StoreError(
            "expiry sweep interval must be non-zero".to_string(),
        ));
    }
    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.delete_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "swept expired sessions"),
                Err(e) => warn!(error = %e, "expired session sweep failed"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::NewSession;
    use crate::store::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_sweeper_purges_expired() {
        let memory = MemoryStore::new();
        let expired = memory
            .create(NewSession::expiring_at(Utc::now() - chrono::Duration::seconds(5)))
            .await
            .unwrap();
        let live = memory.create(NewSession::default()).await.unwrap();

        let handle =
            spawn_expiry_sweeper(Arc::new(memory.clone()), Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(memory.read(&expired).await.unwrap().is_none());
        assert!(memory.read(&live).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweeper_rejects_zero_interval() {
        let memory = MemoryStore::new();
        let expired = memory
            .create(NewSession::expiring_at(Utc::now() - chrono::Duration::seconds(5)))
            .await
            .unwrap();

        let config = SessionConfig::default().with_sweep_interval(Duration::ZERO);
        let result = spawn_expiry_sweeper(Arc::new(memory.clone()), config.sweep_interval);
        assert!(matches!(result, Err(SessionError::StoreError(_))));

        // Nothing ran, so nothing was purged
        assert!(memory.read(&expired).await.unwrap().is_some());
    }
}
