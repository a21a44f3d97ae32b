//! Lock-guarded session map
//!
//! The map is private to [`SessionCache`]; every access goes through a method
//! that takes the matching lock mode. `parking_lot` locks need no fallible
//! initialization, so a cache is usable as soon as it is constructed.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::HashMap;

use crate::session::{generate_token, SessionRecord};

#[derive(Default)]
pub(crate) struct SessionCache {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Copy of the record under `token` (shared lock)
    pub(crate) fn load(&self, token: &str) -> Option<SessionRecord> {
        self.sessions.read().get(token).cloned()
    }

    /// Project one field without cloning the whole record (shared lock)
    pub(crate) fn load_with<R>(&self, token: &str, f: impl FnOnce(&SessionRecord) -> R) -> Option<R> {
        self.sessions.read().get(token).map(f)
    }

    /// Insert a new record, re-rolling its token on the off chance it is taken
    /// (exclusive lock). Returns the token the record was stored under.
    pub(crate) fn insert_new(&self, mut record: SessionRecord) -> String {
        let mut sessions = self.sessions.write();
        while sessions.contains_key(&record.token) {
            record.token = generate_token();
        }
        let token = record.token.clone();
        sessions.insert(token.clone(), record);
        token
    }

    /// Mutate the record in place (exclusive lock); `None` if absent
    pub(crate) fn modify<R>(&self, token: &str, f: impl FnOnce(&mut SessionRecord) -> R) -> Option<R> {
        self.sessions.write().get_mut(token).map(f)
    }

    /// Remove one record (exclusive lock)
    pub(crate) fn remove(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    /// Remove every record matching `predicate` in one consistent pass
    ///
    /// The scan holds an upgradable read lock: plain readers proceed, writers
    /// wait. Matches are removed after an atomic upgrade, so nothing can be
    /// inserted or changed between the scan and the removal.
    pub(crate) fn remove_where(&self, predicate: impl Fn(&SessionRecord) -> bool) -> u64 {
        let sessions = self.sessions.upgradable_read();
        let doomed: Vec<String> = sessions
            .iter()
            .filter(|(_, record)| predicate(record))
            .map(|(token, _)| token.clone())
            .collect();

        if doomed.is_empty() {
            return 0;
        }

        let mut sessions = RwLockUpgradableReadGuard::upgrade(sessions);
        for token in &doomed {
            sessions.remove(token);
        }
        doomed.len() as u64
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NewSession;

    #[test]
    fn test_insert_rerolls_taken_token() {
        let cache = SessionCache::new();
        let first = SessionRecord::new(NewSession::default());
        let mut second = SessionRecord::new(NewSession::default());
        second.token = first.token.clone();

        let t1 = cache.insert_new(first);
        let t2 = cache.insert_new(second);
        assert_ne!(t1, t2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.load(&t2).map(|r| r.token), Some(t2));
    }

    #[test]
    fn test_remove_where_counts() {
        let cache = SessionCache::new();
        for _ in 0..5 {
            cache.insert_new(SessionRecord::new(NewSession::default()));
        }
        let keep = cache.insert_new(SessionRecord::new(NewSession::default().with_csrf("keep")));

        assert_eq!(cache.remove_where(|r| r.csrf == "nothing"), 0);
        assert_eq!(cache.remove_where(|r| r.csrf != "keep"), 5);
        assert_eq!(cache.len(), 1);
        assert!(cache.load(&keep).is_some());
    }
}
