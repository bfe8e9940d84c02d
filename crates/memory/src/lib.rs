//! Memory storage implementations for OathLink.
//!
//! Both backends implement `MemoryStore`, `MemorySearch` and
//! `SettingsStore` from `oathlink-core`.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::time::Duration;

/// Limits shared by every backend.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Largest accepted search limit
    pub max_limit: usize,

    /// Upper bound on a single store access
    pub timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_limit: 100,
            timeout: Duration::from_secs(5),
        }
    }
}
