//! # db-session
//!
//! Session persistence and schema-driven row decoding for request-serving
//! systems, independent of any web framework.
//!
//! ## Features
//!
//! - **One contract, two backends**: [`MemoryStore`] (volatile, lock-guarded
//!   map) and [`RelationalStore`] (one parameterized statement per operation)
//!   both implement [`SessionStore`]
//! - **Opaque tokens**: 32 random bytes, URL-safe base64
//! - **Row decoding without reflection**: types declare a static field schema
//!   and [`decoder::decode_row`] fills them from any [`row::SqlRow`]
//! - **Postgres support** through sqlx (`postgres-store` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use db_session::{MemoryStore, SessionConfig, SessionStore, SessionUpdate};
//! use uuid::Uuid;
//!
//! # tokio_test::block_on(async {
//! let config = SessionConfig::default();
//! let store = MemoryStore::new();
//!
//! let token = store.create(config.new_session()).await?;
//!
//! let user = Uuid::new_v4();
//! store.update(&token, SessionUpdate::new().with_user_id(user)).await?;
//!
//! let session = store.read(&token).await?.expect("session exists");
//! assert_eq!(session.user_id, Some(user));
//! # Ok::<(), db_session::SessionError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod row;
pub mod session;
pub mod store;
pub mod sweeper;

pub use config::{BackendKind, SessionConfig};
pub use decoder::{DecodeError, RowDecoder, RowRecord};
pub use error::SessionError;
pub use session::{NewSession, SessionRecord, SessionUpdate};
pub use store::{
    open_memory_store, open_store, MemoryStore, RelationalStore, SessionStore, SqlExecutor,
    Statement,
};
pub use sweeper::spawn_expiry_sweeper;

#[cfg(feature = "postgres-store")]
pub use store::PostgresExecutor;
