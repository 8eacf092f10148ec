//! Configuration for WatchVault
//!
//! Centralized configuration with sensible defaults. The backend is chosen
//! once, at process start, from `Config::backend`.

use std::env;
use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Environment variable selecting the backend (`memory`, `sqlite`, `kv`)
pub const ENV_STORAGE_TYPE: &str = "WATCHVAULT_STORAGE_TYPE";

/// Environment variable holding the sqlite file or kv data directory
pub const ENV_DATA_PATH: &str = "WATCHVAULT_DATA_PATH";

/// Environment variable overriding the per-user search history bound
pub const ENV_SEARCH_HISTORY_LIMIT: &str = "WATCHVAULT_SEARCH_HISTORY_LIMIT";

/// Default number of search keywords kept per user
pub const DEFAULT_SEARCH_HISTORY_LIMIT: usize = 20;

/// Main configuration for a WatchVault instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Backend Selection
    // -------------------------------------------------------------------------
    /// Which adapter backs the storage engine
    pub backend: BackendKind,

    // -------------------------------------------------------------------------
    // Data Model Limits
    // -------------------------------------------------------------------------
    /// Max distinct keywords kept per user, most recent first
    pub search_history_limit: usize,

    // -------------------------------------------------------------------------
    // Relational Backend
    // -------------------------------------------------------------------------
    /// How long a statement waits on a locked database (milliseconds)
    pub busy_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Key/Value Backend
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size (bytes) past which the log is rewritten as one snapshot batch
    pub compaction_threshold: u64,
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local maps, lost on exit
    Memory,

    /// SQLite database file
    Sqlite { path: PathBuf },

    /// Log-structured key/value store rooted at a directory
    /// Internal structure:
    ///   {data_dir}/
    ///     └── watchvault.wal
    Kv { data_dir: PathBuf },

    /// No backend provisioned; the engine runs in degraded mode
    Unconfigured,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            search_history_limit: DEFAULT_SEARCH_HISTORY_LIMIT,
            busy_timeout_ms: 5000,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            compaction_threshold: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from `WATCHVAULT_*` environment variables
    ///
    /// An unset storage type means [`BackendKind::Unconfigured`]; the host can
    /// still boot and the engine answers in degraded mode.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        let path = lookup(ENV_DATA_PATH).filter(|p| !p.trim().is_empty());
        let backend = match lookup(ENV_STORAGE_TYPE).as_deref().map(str::trim) {
            None | Some("") => BackendKind::Unconfigured,
            Some(kind) => BackendKind::parse(kind, path.map(PathBuf::from))?,
        };
        builder = builder.backend(backend);

        if let Some(raw) = lookup(ENV_SEARCH_HISTORY_LIMIT) {
            let limit: usize = raw.trim().parse().map_err(|_| {
                StoreError::Config(format!("{} must be a positive integer, got {:?}", ENV_SEARCH_HISTORY_LIMIT, raw))
            })?;
            if limit == 0 {
                return Err(StoreError::Config(format!("{} must be at least 1", ENV_SEARCH_HISTORY_LIMIT)));
            }
            builder = builder.search_history_limit(limit);
        }

        Ok(builder.build())
    }
}

impl BackendKind {
    /// Parse a backend name as used by `WATCHVAULT_STORAGE_TYPE` and the CLI
    ///
    /// `sqlite` and `kv` require a path.
    pub fn parse(kind: &str, path: Option<PathBuf>) -> Result<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" => path
                .map(|path| BackendKind::Sqlite { path })
                .ok_or_else(|| StoreError::Config("sqlite backend requires a database path".to_string())),
            "kv" => path
                .map(|data_dir| BackendKind::Kv { data_dir })
                .ok_or_else(|| StoreError::Config("kv backend requires a data directory".to_string())),
            "none" => Ok(BackendKind::Unconfigured),
            other => Err(StoreError::Config(format!("unknown storage type: {}", other))),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite { .. } => "sqlite",
            BackendKind::Kv { .. } => "kv",
            BackendKind::Unconfigured => "unconfigured",
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage backend
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Use a SQLite database file
    pub fn sqlite(self, path: impl Into<PathBuf>) -> Self {
        self.backend(BackendKind::Sqlite { path: path.into() })
    }

    /// Use the log-structured key/value store in `data_dir`
    pub fn kv(self, data_dir: impl Into<PathBuf>) -> Self {
        self.backend(BackendKind::Kv { data_dir: data_dir.into() })
    }

    /// Set the per-user search history bound
    pub fn search_history_limit(mut self, limit: usize) -> Self {
        self.config.search_history_limit = limit;
        self
    }

    /// Set the SQLite busy timeout (in milliseconds)
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL compaction threshold (in bytes)
    pub fn compaction_threshold(mut self, bytes: u64) -> Self {
        self.config.compaction_threshold = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
