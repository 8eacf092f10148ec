//! Storage Module
//!
//! The single persistence contract the rest of the application talks to, and
//! the adapters that implement it.
//!
//! ## Adapters
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Storage (trait)                       │
//! └───────┬─────────────────────┬──────────────────────┬─────┘
//!         │                     │                      │
//!         ▼                     ▼                      ▼
//!  ┌─────────────┐       ┌─────────────┐        ┌─────────────┐
//!  │   Memory    │       │   SQLite    │        │     KV      │
//!  │ (RwLock)    │       │ (6 tables)  │        │ (WAL + Mem) │
//!  └─────────────┘       └─────────────┘        └─────────────┘
//! ```
//!
//! ## Read / Write Contract
//! - Reads never fail. Missing rows, malformed payloads and an unreachable
//!   backend all read as `None`, an empty collection, or `false`.
//! - Writes return `Err` when nothing was stored. They are upserts, so a
//!   retried write leaves the same state behind.
//! - Multi-row operations (`delete_user`, `clear_all_data`,
//!   `add_search_history`) are applied as one batch by each adapter.

mod kv;
mod memory;
mod sqlite;

use std::collections::HashMap;

pub use kv::KvStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::Result;
use crate::model::{AdminConfig, Favorite, PlayRecord, SkipConfig};

/// Delimiter between `source` and `id` in `get_all_skip_configs` keys
pub const SKIP_CONFIG_KEY_DELIMITER: char = '+';

/// Map key used by `get_all_skip_configs` for a (source, id) pair
pub fn skip_config_key(source: &str, id: &str) -> String {
    format!("{}{}{}", source, SKIP_CONFIG_KEY_DELIMITER, id)
}

/// `None` and the empty keyword both mean "every keyword"
pub(crate) fn history_keyword(keyword: Option<&str>) -> Option<&str> {
    keyword.filter(|k| !k.is_empty())
}

/// The storage contract shared by every backend adapter
pub trait Storage: Send + Sync {
    // -------------------------------------------------------------------------
    // Play Records
    // -------------------------------------------------------------------------
    fn get_play_record(&self, user: &str, key: &str) -> Option<PlayRecord>;

    fn set_play_record(&self, user: &str, key: &str, record: &PlayRecord) -> Result<()>;

    fn get_all_play_records(&self, user: &str) -> HashMap<String, PlayRecord>;

    fn delete_play_record(&self, user: &str, key: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------
    fn get_favorite(&self, user: &str, key: &str) -> Option<Favorite>;

    fn set_favorite(&self, user: &str, key: &str, favorite: &Favorite) -> Result<()>;

    fn get_all_favorites(&self, user: &str) -> HashMap<String, Favorite>;

    fn delete_favorite(&self, user: &str, key: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------
    /// Create a user; `UserAlreadyExists` if the name is taken
    fn register_user(&self, user: &str, password: &str) -> Result<()>;

    /// True only if the user exists and the password matches
    fn verify_user(&self, user: &str, password: &str) -> bool;

    fn check_user_exist(&self, user: &str) -> bool;

    /// Replace the password; a missing user is left untouched
    fn change_password(&self, user: &str, new_password: &str) -> Result<()>;

    /// Remove the user and every per-user row as one batch
    fn delete_user(&self, user: &str) -> Result<()>;

    /// All usernames, sorted
    fn get_all_users(&self) -> Vec<String>;

    // -------------------------------------------------------------------------
    // Search History
    // -------------------------------------------------------------------------
    /// Most recent first, at most the configured limit
    fn get_search_history(&self, user: &str) -> Vec<String>;

    /// Insert or refresh `keyword`, then trim to the configured limit
    fn add_search_history(&self, user: &str, keyword: &str) -> Result<()>;

    /// Delete one keyword, or the whole history when `keyword` is `None`
    fn delete_search_history(&self, user: &str, keyword: Option<&str>) -> Result<()>;

    // -------------------------------------------------------------------------
    // Skip Configs
    // -------------------------------------------------------------------------
    fn get_skip_config(&self, user: &str, source: &str, id: &str) -> Option<SkipConfig>;

    fn set_skip_config(&self, user: &str, source: &str, id: &str, config: &SkipConfig) -> Result<()>;

    fn delete_skip_config(&self, user: &str, source: &str, id: &str) -> Result<()>;

    /// Keyed by [`skip_config_key`]
    fn get_all_skip_configs(&self, user: &str) -> HashMap<String, SkipConfig>;

    // -------------------------------------------------------------------------
    // Admin Config
    // -------------------------------------------------------------------------
    fn get_admin_config(&self) -> Option<AdminConfig>;

    fn set_admin_config(&self, config: &AdminConfig) -> Result<()>;

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------
    /// Delete everything, admin config included
    fn clear_all_data(&self) -> Result<()>;

    /// Whether a backend handle is present (false in degraded mode)
    fn is_available(&self) -> bool;

    /// Adapter name for logging
    fn backend_name(&self) -> &'static str;
}
