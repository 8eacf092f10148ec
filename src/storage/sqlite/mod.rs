//! SQLite adapter
//!
//! The relational representative of the storage contract. Each entity lives
//! in its own table keyed as in the data model; payloads are codec JSON in a
//! `data` column.
//!
//! ## Concurrency
//! - `rusqlite::Connection` is not `Sync`, so it sits behind a Mutex. Every
//!   statement and every transaction runs with that lock held.
//! - Schema creation happens on first use, under the same lock, and is
//!   latched only after it succeeds. Concurrent first calls run it once.
//! - `busy_timeout` bounds waits on a database locked by another process.
//!
//! ## Degraded Mode
//! Without a connection every method still works: reads come back empty and
//! writes fail with `BackendUnavailable`.

mod schema;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Params};

use crate::codec;
use crate::config::{Config, DEFAULT_SEARCH_HISTORY_LIMIT};
use crate::error::{Result, StoreError};
use crate::model::{AdminConfig, Favorite, PlayRecord, SkipConfig};

use super::{history_keyword, skip_config_key, Storage};
use schema::{ALL_TABLES, OWNED_TABLES, SCHEMA};

/// Keep the `limit` most recent keywords of one owner, drop the rest
const TRIM_SEARCH_HISTORY: &str = "
    DELETE FROM search_history
    WHERE username = ?1
      AND keyword NOT IN (
        SELECT keyword FROM search_history
        WHERE username = ?1
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?2
      )";

/// Relational storage backed by one SQLite connection
pub struct SqliteStorage {
    /// `None` in degraded mode
    conn: Option<Mutex<Connection>>,

    /// Set once the schema has been created successfully
    initialized: AtomicBool,

    history_limit: usize,
}

impl SqliteStorage {
    /// Wrap an optional connection; `None` yields a degraded instance
    pub fn new(conn: Option<Connection>, history_limit: usize) -> Self {
        if conn.is_none() {
            tracing::warn!("sqlite database not available, storage running in degraded mode");
        }

        Self {
            conn: conn.map(Mutex::new),
            initialized: AtomicBool::new(false),
            history_limit,
        }
    }

    /// Open (or create) a database file
    ///
    /// The schema is not touched until the first storage call.
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::unavailable)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(StoreError::unavailable)?;

        tracing::debug!(path = %path.display(), "sqlite database opened");
        Ok(Self::new(Some(conn), config.search_history_limit))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::unavailable)?;
        Ok(Self::new(Some(conn), DEFAULT_SEARCH_HISTORY_LIMIT))
    }

    /// A degraded instance with no connection
    pub fn unavailable() -> Self {
        Self::new(None, DEFAULT_SEARCH_HISTORY_LIMIT)
    }

    /// Whether the schema has been created on this connection
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    // =========================================================================
    // Connection Plumbing
    // =========================================================================

    /// Run `f` against the connection, creating the schema first if needed
    fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| StoreError::unavailable("sqlite database not configured"))?;

        let mut conn = conn.lock();
        self.ensure_schema(&conn)?;
        f(&mut conn).map_err(map_sqlite_error)
    }

    /// Called with the connection lock held
    fn ensure_schema(&self, conn: &Connection) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        conn.execute_batch(SCHEMA).map_err(|e| {
            tracing::error!(error = %e, "failed to initialize sqlite schema");
            StoreError::unavailable(e)
        })?;

        self.initialized.store(true, Ordering::Release);
        tracing::debug!("sqlite schema initialized");
        Ok(())
    }

    /// Read helper: any failure degrades to `T::default()`
    fn read<T, F>(&self, op: &'static str, f: F) -> T
    where
        T: Default,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        if self.conn.is_none() {
            return T::default();
        }

        match self.with_conn(f) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(op, error = %e, "sqlite read failed");
                T::default()
            }
        }
    }

    /// Write helper: failures are logged and returned
    fn write<F>(&self, op: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<()>,
    {
        self.with_conn(f).map_err(|e| {
            tracing::error!(op, error = %e, "sqlite write failed");
            e
        })
    }

    /// Single-statement write
    fn execute<P: Params>(&self, op: &'static str, sql: &str, params: P) -> Result<()> {
        self.write(op, |conn| conn.execute(sql, params).map(|_| ()))
    }

    /// First column of the first row, if any
    fn query_text<P: Params>(&self, op: &'static str, sql: &str, params: P) -> Option<String> {
        self.read(op, |conn| {
            conn.query_row(sql, params, |row| row.get::<_, String>(0))
                .optional()
        })
    }

    /// First column of every row
    fn query_column<P: Params>(&self, op: &'static str, sql: &str, params: P) -> Vec<String> {
        self.read(op, |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt
                .query_map(params, |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// `(key, data)` pairs
    fn query_pairs<P: Params>(&self, op: &'static str, sql: &str, params: P) -> Vec<(String, String)> {
        self.read(op, |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt
                .query_map(params, |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

/// Map a rusqlite failure onto the storage taxonomy
fn map_sqlite_error(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::ConstraintViolation(e.to_string()),
        _ => StoreError::BackendUnavailable(e.to_string()),
    }
}

/// Unix millis; ordering ties within one millisecond fall back to rowid
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl Storage for SqliteStorage {
    // -------------------------------------------------------------------------
    // Play Records
    // -------------------------------------------------------------------------
    fn get_play_record(&self, user: &str, key: &str) -> Option<PlayRecord> {
        self.query_text(
            "get_play_record",
            "SELECT data FROM play_records WHERE username = ?1 AND key = ?2",
            params![user, key],
        )
        .and_then(|text| codec::decode(&text))
    }

    fn set_play_record(&self, user: &str, key: &str, record: &PlayRecord) -> Result<()> {
        let data = codec::encode(record)?;
        self.execute(
            "set_play_record",
            "INSERT INTO play_records (username, key, data, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username, key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![user, key, data, now_millis()],
        )
    }

    fn get_all_play_records(&self, user: &str) -> HashMap<String, PlayRecord> {
        codec::decode_map(self.query_pairs(
            "get_all_play_records",
            "SELECT key, data FROM play_records WHERE username = ?1",
            params![user],
        ))
    }

    fn delete_play_record(&self, user: &str, key: &str) -> Result<()> {
        self.execute(
            "delete_play_record",
            "DELETE FROM play_records WHERE username = ?1 AND key = ?2",
            params![user, key],
        )
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------
    fn get_favorite(&self, user: &str, key: &str) -> Option<Favorite> {
        self.query_text(
            "get_favorite",
            "SELECT data FROM favorites WHERE username = ?1 AND key = ?2",
            params![user, key],
        )
        .and_then(|text| codec::decode(&text))
    }

    fn set_favorite(&self, user: &str, key: &str, favorite: &Favorite) -> Result<()> {
        let data = codec::encode(favorite)?;
        self.execute(
            "set_favorite",
            "INSERT INTO favorites (username, key, data, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username, key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![user, key, data, now_millis()],
        )
    }

    fn get_all_favorites(&self, user: &str) -> HashMap<String, Favorite> {
        codec::decode_map(self.query_pairs(
            "get_all_favorites",
            "SELECT key, data FROM favorites WHERE username = ?1",
            params![user],
        ))
    }

    fn delete_favorite(&self, user: &str, key: &str) -> Result<()> {
        self.execute(
            "delete_favorite",
            "DELETE FROM favorites WHERE username = ?1 AND key = ?2",
            params![user, key],
        )
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------
    fn register_user(&self, user: &str, password: &str) -> Result<()> {
        let result = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, created_at) VALUES (?1, ?2, ?3)",
                params![user, password, now_millis()],
            )
            .map(|_| ())
        });

        match result {
            Err(StoreError::ConstraintViolation(_)) => Err(StoreError::UserAlreadyExists(user.to_string())),
            Err(e) => {
                tracing::error!(op = "register_user", error = %e, "sqlite write failed");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    fn verify_user(&self, user: &str, password: &str) -> bool {
        self.query_text(
            "verify_user",
            "SELECT password FROM users WHERE username = ?1",
            params![user],
        )
        .is_some_and(|stored| stored == password)
    }

    fn check_user_exist(&self, user: &str) -> bool {
        self.query_text(
            "check_user_exist",
            "SELECT username FROM users WHERE username = ?1",
            params![user],
        )
        .is_some()
    }

    fn change_password(&self, user: &str, new_password: &str) -> Result<()> {
        self.execute(
            "change_password",
            "UPDATE users SET password = ?1 WHERE username = ?2",
            params![new_password, user],
        )
    }

    fn delete_user(&self, user: &str) -> Result<()> {
        self.write("delete_user", |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM users WHERE username = ?1", params![user])?;
            for table in OWNED_TABLES {
                tx.execute(&format!("DELETE FROM {} WHERE username = ?1", table), params![user])?;
            }
            tx.commit()
        })
    }

    fn get_all_users(&self) -> Vec<String> {
        self.query_column(
            "get_all_users",
            "SELECT username FROM users ORDER BY username",
            [],
        )
    }

    // -------------------------------------------------------------------------
    // Search History
    // -------------------------------------------------------------------------
    fn get_search_history(&self, user: &str) -> Vec<String> {
        self.query_column(
            "get_search_history",
            "SELECT keyword FROM search_history
             WHERE username = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
            params![user, self.history_limit as i64],
        )
    }

    fn add_search_history(&self, user: &str, keyword: &str) -> Result<()> {
        let limit = self.history_limit as i64;
        self.write("add_search_history", |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM search_history WHERE username = ?1 AND keyword = ?2",
                params![user, keyword],
            )?;
            tx.execute(
                "INSERT INTO search_history (username, keyword, created_at) VALUES (?1, ?2, ?3)",
                params![user, keyword, now_millis()],
            )?;
            tx.execute(TRIM_SEARCH_HISTORY, params![user, limit])?;
            tx.commit()
        })
    }

    fn delete_search_history(&self, user: &str, keyword: Option<&str>) -> Result<()> {
        match history_keyword(keyword) {
            Some(keyword) => self.execute(
                "delete_search_history",
                "DELETE FROM search_history WHERE username = ?1 AND keyword = ?2",
                params![user, keyword],
            ),
            None => self.execute(
                "delete_search_history",
                "DELETE FROM search_history WHERE username = ?1",
                params![user],
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Skip Configs
    // -------------------------------------------------------------------------
    fn get_skip_config(&self, user: &str, source: &str, id: &str) -> Option<SkipConfig> {
        self.query_text(
            "get_skip_config",
            "SELECT data FROM skip_configs WHERE username = ?1 AND source = ?2 AND id = ?3",
            params![user, source, id],
        )
        .and_then(|text| codec::decode(&text))
    }

    fn set_skip_config(&self, user: &str, source: &str, id: &str, config: &SkipConfig) -> Result<()> {
        let data = codec::encode(config)?;
        self.execute(
            "set_skip_config",
            "INSERT INTO skip_configs (username, source, id, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(username, source, id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![user, source, id, data, now_millis()],
        )
    }

    fn delete_skip_config(&self, user: &str, source: &str, id: &str) -> Result<()> {
        self.execute(
            "delete_skip_config",
            "DELETE FROM skip_configs WHERE username = ?1 AND source = ?2 AND id = ?3",
            params![user, source, id],
        )
    }

    fn get_all_skip_configs(&self, user: &str) -> HashMap<String, SkipConfig> {
        let rows: Vec<(String, String, String)> = self.read("get_all_skip_configs", |conn| {
            let mut stmt = conn.prepare_cached("SELECT source, id, data FROM skip_configs WHERE username = ?1")?;
            let rows = stmt
                .query_map(params![user], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        });

        codec::decode_map(
            rows.into_iter()
                .map(|(source, id, data)| (skip_config_key(&source, &id), data)),
        )
    }

    // -------------------------------------------------------------------------
    // Admin Config
    // -------------------------------------------------------------------------
    fn get_admin_config(&self) -> Option<AdminConfig> {
        self.query_text("get_admin_config", "SELECT data FROM admin_config WHERE id = 1", [])
            .and_then(|text| codec::decode(&text))
    }

    fn set_admin_config(&self, config: &AdminConfig) -> Result<()> {
        let data = codec::encode(config)?;
        self.execute(
            "set_admin_config",
            "INSERT INTO admin_config (id, data, updated_at)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![data, now_millis()],
        )
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------
    fn clear_all_data(&self) -> Result<()> {
        self.write("clear_all_data", |conn| {
            let tx = conn.transaction()?;
            for table in ALL_TABLES {
                tx.execute(&format!("DELETE FROM {}", table), [])?;
            }
            tx.commit()
        })?;

        tracing::info!("sqlite storage cleared");
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
