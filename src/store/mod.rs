//! Session store implementations

mod cache;
mod memory;
mod relational;
mod sql;
mod traits;

pub use memory::MemoryStore;
pub use relational::RelationalStore;
pub use sql::{SqlExecutor, Statement};
pub use traits::SessionStore;

#[cfg(feature = "postgres-store")]
mod postgres;

#[cfg(feature = "postgres-store")]
pub use postgres::PostgresExecutor;

use std::sync::Arc;
use tracing::info;

use crate::config::{BackendKind, SessionConfig};
use crate::error::SessionError;

/// Build an in-memory store behind the shared contract
pub fn open_memory_store() -> Arc<dyn SessionStore> {
    info!("using in-memory session store");
    Arc::new(MemoryStore::new())
}

/// Build the store selected by `config`
///
/// The relational backend needs an executor; asking for it without one is a
/// startup error. The executor is ignored for the memory backend; callers
/// that only ever use memory can call [`open_memory_store`] instead.
pub fn open_store<E: SqlExecutor>(
    config: &SessionConfig,
    executor: Option<E>,
) -> Result<Arc<dyn SessionStore>, SessionError> {
    match config.backend {
        BackendKind::Memory => Ok(open_memory_store()),
        BackendKind::Relational => {
            let executor = executor.ok_or_else(|| {
                SessionError::StoreError("relational backend requires a SQL executor".to_string())
            })?;
            info!("using relational session store");
            Ok(Arc::new(RelationalStore::new(executor)))
        }
    }
}
