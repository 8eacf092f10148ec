//! Engine Module
//!
//! The storage engine the application holds for its whole lifetime.
//!
//! ## Responsibilities
//! - Select one backend adapter at process start from `Config`
//! - Never fail to start: a backend that cannot be opened is replaced by a
//!   degraded instance of the same adapter, so the host boots and writes fail
//!   with `BackendUnavailable` until the store is provisioned
//! - Hand out the adapter as `&dyn Storage` / `Arc<dyn Storage>`

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use crate::config::{BackendKind, Config};
use crate::storage::{KvStorage, MemoryStorage, SqliteStorage, Storage};

/// The storage engine
///
/// Derefs to [`Storage`], so `engine.get_play_record(..)` works directly.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The adapter chosen at startup
    storage: Arc<dyn Storage>,
}

impl Engine {
    /// Open the backend named by `config`
    ///
    /// On startup:
    /// 1. Match the configured backend kind
    /// 2. Open it (directories, files, connections)
    /// 3. On failure, log and fall back to degraded mode
    pub fn open(config: Config) -> Self {
        let storage: Arc<dyn Storage> = match &config.backend {
            BackendKind::Memory => Arc::new(MemoryStorage::with_history_limit(config.search_history_limit)),
            BackendKind::Sqlite { path } => match SqliteStorage::open(path, &config) {
                Ok(storage) => Arc::new(storage),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to open sqlite database");
                    Arc::new(SqliteStorage::unavailable())
                }
            },
            BackendKind::Kv { data_dir } => match KvStorage::open(data_dir, &config) {
                Ok(storage) => Arc::new(storage),
                Err(e) => {
                    tracing::error!(path = %data_dir.display(), error = %e, "failed to open kv store");
                    Arc::new(KvStorage::unavailable())
                }
            },
            BackendKind::Unconfigured => Arc::new(SqliteStorage::unavailable()),
        };

        tracing::info!(
            backend = config.backend.name(),
            available = storage.is_available(),
            "storage engine ready"
        );

        Self { config, storage }
    }

    /// Open a SQLite database file with default config
    pub fn open_sqlite(path: &Path) -> Self {
        Self::open(Config::builder().sqlite(path).build())
    }

    /// Borrow the adapter
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Shared handle for request handlers on other threads
    pub fn shared(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Deref for Engine {
    type Target = dyn Storage;

    fn deref(&self) -> &Self::Target {
        self.storage.as_ref()
    }
}
