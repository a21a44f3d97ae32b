//! Session configuration

use chrono::Utc;
use std::time::Duration;

use crate::session::{NewSession, DEFAULT_LIFETIME_SECS};

/// Which session backend the application runs on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Volatile in-process cache
    #[default]
    Memory,
    /// Durable SQL table
    Relational,
}

/// Configuration for the session stores
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Backend selected at startup (default: memory)
    pub backend: BackendKind,

    /// How long a newly created or renewed session lives (default: 7 days)
    pub lifetime: Duration,

    /// How often the expiry sweeper purges dead sessions (default: 1 day)
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            lifetime: Duration::from_secs(DEFAULT_LIFETIME_SECS as u64),
            sweep_interval: Duration::from_secs(86_400),
        }
    }
}

impl SessionConfig {
    /// Create a configuration for the given backend
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Set the session lifetime (default: 7 days)
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the lifetime in seconds
    pub fn with_lifetime_secs(mut self, secs: u64) -> Self {
        self.lifetime = Duration::from_secs(secs);
        self
    }

    /// Set the sweep interval (default: 1 day)
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Absolute expiry for a session created or renewed now
    pub fn expires_from_now(&self) -> chrono::DateTime<Utc> {
        let lifetime = chrono::Duration::from_std(self.lifetime).unwrap_or(chrono::Duration::MAX);
        Utc::now()
            .checked_add_signed(lifetime)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
    }

    /// Inputs for a fresh anonymous session with this configuration's lifetime
    pub fn new_session(&self) -> NewSession {
        NewSession::expiring_at(self.expires_from_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.lifetime, Duration::from_secs(604_800));
        assert_eq!(config.sweep_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn test_expiry_follows_lifetime() {
        let config = SessionConfig::new(BackendKind::Relational).with_lifetime_secs(60);
        let before = Utc::now();
        let session = config.new_session();

        let delta = session.expires - before;
        assert!(delta >= chrono::Duration::seconds(60));
        assert!(delta < chrono::Duration::seconds(61));
        assert!(session.user_id.is_none());
        assert!(session.data.is_none());
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let config = SessionConfig::default().with_lifetime(Duration::MAX);
        assert_eq!(config.expires_from_now(), chrono::DateTime::<Utc>::MAX_UTC);
    }
}
