//! In-memory session store
//!
//! Fast and volatile: sessions live in a lock-guarded map inside the process.
//! Use [`RelationalStore`](super::RelationalStore) when sessions must survive
//! a restart or be shared between instances.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::cache::SessionCache;
use super::SessionStore;
use crate::error::SessionError;
use crate::session::{generate_csrf, NewSession, SessionRecord, SessionUpdate};

/// In-memory session store
///
/// Reads take a shared lock and never block each other; writes take an
/// exclusive lock. No operation suspends. Cloning shares the same map.
///
/// Warning: sessions are lost on restart and are not shared across
/// multiple server instances.
#[derive(Clone, Default)]
pub struct MemoryStore {
    cache: Arc<SessionCache>,
}

impl MemoryStore {
    /// Create a new, empty memory store
    pub fn new() -> Self {
        Self {
            cache: Arc::new(SessionCache::new()),
        }
    }

    /// Number of stored sessions, expired ones included
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no sessions are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: NewSession) -> Result<String, SessionError> {
        let token = self.cache.insert_new(SessionRecord::new(session));
        debug!(sessions = self.cache.len(), "created in-memory session");
        Ok(token)
    }

    async fn read(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self.cache.load(token))
    }

    async fn read_csrf(&self, token: &str) -> Result<Option<String>, SessionError> {
        Ok(self.cache.load_with(token, |record| record.csrf.clone()))
    }

    async fn set_csrf(&self, token: &str) -> Result<Option<String>, SessionError> {
        let csrf = generate_csrf();
        Ok(self.cache.modify(token, |record| {
            record.csrf = csrf.clone();
            csrf
        }))
    }

    async fn update(&self, token: &str, update: SessionUpdate) -> Result<(), SessionError> {
        if update.is_empty() {
            return Ok(());
        }
        self.cache.modify(token, |record| record.apply(update));
        Ok(())
    }

    async fn set_user_id(&self, token: &str, user_id: Option<Uuid>) -> Result<(), SessionError> {
        self.cache.modify(token, |record| record.user_id = user_id);
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.cache.remove(token);
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, SessionError> {
        let removed = self
            .cache
            .remove_where(|record| record.user_id == Some(user_id));
        debug!(%user_id, removed, "deleted all user sessions");
        Ok(removed)
    }

    async fn delete_other(&self, token: &str, user_id: Uuid) -> Result<u64, SessionError> {
        let removed = self
            .cache
            .remove_where(|record| record.user_id == Some(user_id) && record.token != token);
        debug!(%user_id, removed, "deleted other user sessions");
        Ok(removed)
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let now = Utc::now();
        let removed = self.cache.remove_where(|record| record.is_expired_at(now));
        debug!(removed, "deleted expired in-memory sessions");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let expires = Utc::now() + Duration::days(7);
        let user = Uuid::new_v4();

        let token = store
            .create(
                NewSession::expiring_at(expires)
                    .with_csrf("abc")
                    .with_data(b"{}".to_vec())
                    .with_user_id(user),
            )
            .await
            .unwrap();

        let record = store.read(&token).await.unwrap().unwrap();
        assert_eq!(record.token, token);
        assert_eq!(record.csrf, "abc");
        assert_eq!(record.data.as_deref(), Some(&b"{}"[..]));
        assert_eq!(record.expires, expires);
        assert_eq!(record.user_id, Some(user));

        store.delete(&token).await.unwrap();
        assert!(store.read(&token).await.unwrap().is_none());
        // idempotent
        store.delete(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_expired_kept_until_purged() {
        let store = MemoryStore::new();
        let token = store
            .create(NewSession::expiring_at(Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();

        let record = store.read(&token).await.unwrap().unwrap();
        assert!(record.is_expired());

        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert!(store.read(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_callers_get_copies() {
        let store = MemoryStore::new();
        let token = store.create(NewSession::default()).await.unwrap();

        let mut copy = store.read(&token).await.unwrap().unwrap();
        copy.csrf = "tampered".to_string();

        let stored = store.read_csrf(&token).await.unwrap().unwrap();
        assert_ne!(stored, "tampered");
    }

    #[tokio::test]
    async fn test_missing_token_is_quiet() {
        let store = MemoryStore::new();

        assert!(store.read("nope").await.unwrap().is_none());
        assert!(store.read_csrf("nope").await.unwrap().is_none());
        assert!(store.set_csrf("nope").await.unwrap().is_none());
        store
            .update("nope", SessionUpdate::new().with_user_id(Uuid::new_v4()))
            .await
            .unwrap();
        store.set_user_id("nope", None).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_user_id_back_to_anonymous() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let token = store
            .create(NewSession::default().with_user_id(user))
            .await
            .unwrap();

        store.set_user_id(&token, None).await.unwrap();
        assert_eq!(store.read(&token).await.unwrap().unwrap().user_id, None);

        store.set_user_id(&token, Some(user)).await.unwrap();
        assert_eq!(store.read(&token).await.unwrap().unwrap().user_id, Some(user));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_serialize() {
        let store = MemoryStore::new();
        let token = store.create(NewSession::default()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32u8 {
            let store = store.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(&token, SessionUpdate::new().with_data(vec![i; 64]))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whichever writer came last, its payload is intact, never a mix.
        let data = store.read(&token).await.unwrap().unwrap().data.unwrap();
        assert_eq!(data.len(), 64);
        assert!(data.iter().all(|b| *b == data[0]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_expired_races_creates() {
        let store = MemoryStore::new();
        let past = Utc::now() - Duration::hours(1);
        for _ in 0..100 {
            store.create(NewSession::expiring_at(past)).await.unwrap();
        }

        let creator = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tokens = Vec::new();
                for _ in 0..200 {
                    tokens.push(store.create(NewSession::default()).await.unwrap());
                }
                tokens
            })
        };

        let removed = store.delete_expired().await.unwrap();
        let live = creator.await.unwrap();

        assert_eq!(removed, 100);
        assert_eq!(store.len(), 200);
        for token in live {
            assert!(store.read(&token).await.unwrap().is_some());
        }
    }

    #[test]
    fn test_concurrent_readers_do_not_block() {
        use std::sync::Barrier;

        let store = MemoryStore::new();
        let token = tokio_test::block_on(store.create(NewSession::default())).unwrap();

        // Every reader holds its shared lock while waiting on the barrier;
        // this only completes if the readers overlap.
        let readers = 8;
        let barrier = Arc::new(Barrier::new(readers));
        let threads: Vec<_> = (0..readers)
            .map(|_| {
                let store = store.clone();
                let token = token.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    store
                        .cache
                        .load_with(&token, |record| {
                            barrier.wait();
                            record.csrf.clone()
                        })
                        .unwrap()
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }
    }
}
