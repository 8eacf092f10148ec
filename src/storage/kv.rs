//! Key/value adapter
//!
//! Flat string keys over a [`MemTable`], made durable by the WAL.
//!
//! ## Key Layout
//! ```text
//! user\0{username}                       -> {"password":..,"created_at":..}
//! play\0{len}:{owner}\0{key}             -> PlayRecord JSON
//! fav\0{len}:{owner}\0{key}              -> Favorite JSON
//! hist\0{len}:{owner}\0{keyword}         -> {"seq":..,"created_at":..}
//! skip\0{len}:{owner}\0{len}:{source}{id} -> SkipConfig JSON
//! admin\0config                          -> AdminConfig JSON
//! ```
//! Owner and source names are length-prefixed (`{byte length}:{name}`), so a
//! name containing the separator cannot reach into another owner's range and
//! `alice` never matches `alice2`.
//!
//! ## Write Path
//! Every write builds a batch of [`Operation`]s while holding the WAL lock,
//! appends it as one WAL entry, then applies it to the memtable under one
//! write lock. The WAL lock serializes writers, so read-modify-write batches
//! (registration, history trimming) see a stable table.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::{Config, WalSyncStrategy, DEFAULT_SEARCH_HISTORY_LIMIT};
use crate::error::{Result, StoreError};
use crate::memtable::MemTable;
use crate::model::{AdminConfig, Favorite, PlayRecord, SkipConfig};
use crate::wal::{now_millis, Operation, WalRecovery, WalWriter};

use super::{history_keyword, skip_config_key, Storage};

const SEP: char = '\0';

const USERS: &str = "user";
const PLAY_RECORDS: &str = "play";
const FAVORITES: &str = "fav";
const SEARCH_HISTORY: &str = "hist";
const SKIP_CONFIGS: &str = "skip";
const ADMIN_CONFIG_KEY: &str = "admin\0config";

/// Tables holding per-owner rows, cleared by `delete_user`
const OWNED_TABLES: [&str; 4] = [PLAY_RECORDS, FAVORITES, SEARCH_HISTORY, SKIP_CONFIGS];

#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    password: String,
    created_at: u64,
}

/// Recency marker for one search keyword; higher `seq` is more recent
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct HistoryStamp {
    seq: u64,
    created_at: u64,
}

fn user_key(user: &str) -> String {
    format!("{}{}{}", USERS, SEP, user)
}

/// `{byte length}:{s}`, self-delimiting whatever `s` contains
fn segment(s: &str) -> String {
    format!("{}:{}", s.len(), s)
}

/// Split one length-prefixed segment off the front of `rest`
fn split_segment(rest: &str) -> Option<(&str, &str)> {
    let (len, tail) = rest.split_once(':')?;
    let len: usize = len.parse().ok()?;
    Some((tail.get(..len)?, tail.get(len..)?))
}

fn owner_prefix(table: &str, owner: &str) -> String {
    format!("{}{}{}{}", table, SEP, segment(owner), SEP)
}

fn owned_key(table: &str, owner: &str, key: &str) -> String {
    format!("{}{}", owner_prefix(table, owner), key)
}

fn skip_key(owner: &str, source: &str, id: &str) -> String {
    format!("{}{}{}", owner_prefix(SKIP_CONFIGS, owner), segment(source), id)
}

/// Live state of an available store
struct KvInner {
    /// Held for the whole build-append-apply cycle of a write
    wal: Mutex<WalWriter>,

    table: MemTable,

    /// Next search-history sequence number
    next_seq: AtomicU64,

    /// WAL size right after the last compaction, or at the last failed one
    compacted_size: AtomicU64,

    wal_path: PathBuf,
    sync_strategy: WalSyncStrategy,
    compaction_threshold: u64,
}

impl KvInner {
    /// Compact once the log passes the threshold and has at least doubled
    /// since the last compaction attempt
    fn needs_compaction(&self, wal_size: u64) -> bool {
        let floor = self.compacted_size.load(Ordering::Relaxed).saturating_mul(2);
        wal_size >= self.compaction_threshold.max(floor)
    }
}

/// Durable key/value storage
pub struct KvStorage {
    /// `None` in degraded mode
    inner: Option<KvInner>,
    history_limit: usize,
}

impl KvStorage {
    /// WAL file name inside the data directory
    pub const WAL_FILENAME: &'static str = "watchvault.wal";

    /// Open or create a store in `data_dir`
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Recover the WAL, truncating any damaged tail
    /// 3. Replay recovered batches into the memtable
    /// 4. Resume appending after the last recovered LSN
    pub fn open(data_dir: &Path, config: &Config) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let wal_path = data_dir.join(Self::WAL_FILENAME);
        let table = MemTable::new();

        let mut last_lsn = 0;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;
            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    "kv WAL recovery complete"
                );
            }
            for entry in &entries {
                table.apply(&entry.operations);
            }
            last_lsn = recovery.last_lsn;
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy, last_lsn + 1)?;
        let next_seq = Self::max_history_seq(&table) + 1;

        tracing::debug!(path = %wal_path.display(), keys = table.entry_count(), "kv store opened");

        Ok(Self {
            inner: Some(KvInner {
                wal: Mutex::new(wal),
                table,
                next_seq: AtomicU64::new(next_seq),
                compacted_size: AtomicU64::new(0),
                wal_path,
                sync_strategy: config.wal_sync_strategy,
                compaction_threshold: config.compaction_threshold,
            }),
            history_limit: config.search_history_limit,
        })
    }

    /// A degraded instance with no backing store
    pub fn unavailable() -> Self {
        tracing::warn!("kv store not available, storage running in degraded mode");
        Self {
            inner: None,
            history_limit: DEFAULT_SEARCH_HISTORY_LIMIT,
        }
    }

    /// Rewrite the WAL as a single batch holding the current state
    pub fn compact(&self) -> Result<()> {
        let inner = self.inner()?;
        let mut wal = inner.wal.lock();
        Self::compact_locked(inner, &mut wal)
    }

    /// Current WAL size in bytes (0 in degraded mode)
    pub fn wal_size(&self) -> u64 {
        self.inner.as_ref().map(|inner| inner.wal.lock().size()).unwrap_or(0)
    }

    /// Force buffered WAL entries to disk
    pub fn sync(&self) -> Result<()> {
        self.inner()?.wal.lock().sync()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn inner(&self) -> Result<&KvInner> {
        self.inner
            .as_ref()
            .ok_or_else(|| StoreError::unavailable("kv store not configured"))
    }

    fn get_text(&self, key: &str) -> Option<String> {
        self.inner.as_ref()?.table.get(key)
    }

    fn scan(&self, prefix: &str) -> Vec<(String, String)> {
        match &self.inner {
            Some(inner) => inner.table.scan_prefix(prefix),
            None => Vec::new(),
        }
    }

    /// Entries under `prefix` with the prefix stripped from their keys
    fn scan_stripped(&self, prefix: &str) -> Vec<(String, String)> {
        self.scan(prefix)
            .into_iter()
            .map(|(key, value)| (key[prefix.len()..].to_string(), value))
            .collect()
    }

    /// Build a batch against a stable table, log it, then apply it
    fn commit<F>(&self, op: &'static str, build: F) -> Result<()>
    where
        F: FnOnce(&KvInner) -> Result<Vec<Operation>>,
    {
        let inner = self.inner()?;
        let mut wal = inner.wal.lock();

        let operations = build(inner)?;
        if operations.is_empty() {
            return Ok(());
        }

        wal.append(&operations).map_err(|e| {
            tracing::error!(op, error = %e, "kv WAL append failed");
            StoreError::unavailable(e)
        })?;
        inner.table.apply(&operations);

        if inner.needs_compaction(wal.size()) {
            if let Err(e) = Self::compact_locked(inner, &mut wal) {
                // The appended batch is durable either way; retry once the log doubles
                inner.compacted_size.store(wal.size(), Ordering::Relaxed);
                tracing::warn!(error = %e, wal_size = wal.size(), "kv WAL compaction failed");
            }
        }

        Ok(())
    }

    fn put(&self, op: &'static str, key: String, value: String) -> Result<()> {
        self.commit(op, |_| Ok(vec![Operation::Put { key, value }]))
    }

    fn delete(&self, op: &'static str, key: String) -> Result<()> {
        self.commit(op, |_| Ok(vec![Operation::Delete { key }]))
    }

    fn compact_locked(inner: &KvInner, wal: &mut WalWriter) -> Result<()> {
        let before = wal.size();
        let operations: Vec<Operation> = inner
            .table
            .snapshot()
            .into_iter()
            .map(|(key, value)| Operation::Put { key, value })
            .collect();

        *wal = WalWriter::rewrite(&inner.wal_path, inner.sync_strategy, wal.current_lsn() + 1, operations)?;

        inner.compacted_size.store(wal.size(), Ordering::Relaxed);
        tracing::info!(before, after = wal.size(), "kv WAL compacted");
        Ok(())
    }

    /// `(keyword, stamp)` for one owner, most recent first
    fn history_of(table: &MemTable, user: &str) -> Vec<(String, HistoryStamp)> {
        let prefix = owner_prefix(SEARCH_HISTORY, user);
        let mut entries: Vec<(String, HistoryStamp)> = table
            .scan_prefix(&prefix)
            .into_iter()
            .filter_map(|(key, text)| {
                let stamp = codec::decode::<HistoryStamp>(&text)?;
                Some((key[prefix.len()..].to_string(), stamp))
            })
            .collect();
        entries.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));
        entries
    }

    fn max_history_seq(table: &MemTable) -> u64 {
        let prefix = format!("{}{}", SEARCH_HISTORY, SEP);
        table
            .scan_prefix(&prefix)
            .iter()
            .filter_map(|(_, text)| codec::decode::<HistoryStamp>(text))
            .map(|stamp| stamp.seq)
            .max()
            .unwrap_or(0)
    }
}

impl Storage for KvStorage {
    // -------------------------------------------------------------------------
    // Play Records
    // -------------------------------------------------------------------------
    fn get_play_record(&self, user: &str, key: &str) -> Option<PlayRecord> {
        codec::decode(&self.get_text(&owned_key(PLAY_RECORDS, user, key))?)
    }

    fn set_play_record(&self, user: &str, key: &str, record: &PlayRecord) -> Result<()> {
        let value = codec::encode(record)?;
        self.put("set_play_record", owned_key(PLAY_RECORDS, user, key), value)
    }

    fn get_all_play_records(&self, user: &str) -> HashMap<String, PlayRecord> {
        codec::decode_map(self.scan_stripped(&owner_prefix(PLAY_RECORDS, user)))
    }

    fn delete_play_record(&self, user: &str, key: &str) -> Result<()> {
        self.delete("delete_play_record", owned_key(PLAY_RECORDS, user, key))
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------
    fn get_favorite(&self, user: &str, key: &str) -> Option<Favorite> {
        codec::decode(&self.get_text(&owned_key(FAVORITES, user, key))?)
    }

    fn set_favorite(&self, user: &str, key: &str, favorite: &Favorite) -> Result<()> {
        let value = codec::encode(favorite)?;
        self.put("set_favorite", owned_key(FAVORITES, user, key), value)
    }

    fn get_all_favorites(&self, user: &str) -> HashMap<String, Favorite> {
        codec::decode_map(self.scan_stripped(&owner_prefix(FAVORITES, user)))
    }

    fn delete_favorite(&self, user: &str, key: &str) -> Result<()> {
        self.delete("delete_favorite", owned_key(FAVORITES, user, key))
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------
    fn register_user(&self, user: &str, password: &str) -> Result<()> {
        self.commit("register_user", |inner| {
            let key = user_key(user);
            if inner.table.contains(&key) {
                return Err(StoreError::UserAlreadyExists(user.to_string()));
            }
            let value = codec::encode(&StoredUser {
                password: password.to_string(),
                created_at: now_millis(),
            })?;
            Ok(vec![Operation::Put { key, value }])
        })
    }

    fn verify_user(&self, user: &str, password: &str) -> bool {
        self.get_text(&user_key(user))
            .and_then(|text| codec::decode::<StoredUser>(&text))
            .is_some_and(|stored| stored.password == password)
    }

    fn check_user_exist(&self, user: &str) -> bool {
        self.get_text(&user_key(user)).is_some()
    }

    fn change_password(&self, user: &str, new_password: &str) -> Result<()> {
        self.commit("change_password", |inner| {
            let key = user_key(user);
            let Some(mut stored) = inner.table.get(&key).and_then(|t| codec::decode::<StoredUser>(&t)) else {
                return Ok(Vec::new());
            };
            stored.password = new_password.to_string();
            Ok(vec![Operation::Put {
                key,
                value: codec::encode(&stored)?,
            }])
        })
    }

    fn delete_user(&self, user: &str) -> Result<()> {
        self.commit("delete_user", |_| {
            let mut operations = vec![Operation::Delete { key: user_key(user) }];
            operations.extend(OWNED_TABLES.iter().map(|table| Operation::DeletePrefix {
                prefix: owner_prefix(table, user),
            }));
            Ok(operations)
        })
    }

    fn get_all_users(&self) -> Vec<String> {
        // BTreeMap order is username order
        self.scan_stripped(&format!("{}{}", USERS, SEP))
            .into_iter()
            .map(|(user, _)| user)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Search History
    // -------------------------------------------------------------------------
    fn get_search_history(&self, user: &str) -> Vec<String> {
        match &self.inner {
            Some(inner) => Self::history_of(&inner.table, user)
                .into_iter()
                .take(self.history_limit)
                .map(|(keyword, _)| keyword)
                .collect(),
            None => Vec::new(),
        }
    }

    fn add_search_history(&self, user: &str, keyword: &str) -> Result<()> {
        let keep_others = self.history_limit.saturating_sub(1);
        self.commit("add_search_history", |inner| {
            let stamp = HistoryStamp {
                seq: inner.next_seq.fetch_add(1, Ordering::SeqCst),
                created_at: now_millis(),
            };
            let mut operations = vec![Operation::Put {
                key: owned_key(SEARCH_HISTORY, user, keyword),
                value: codec::encode(&stamp)?,
            }];

            operations.extend(
                Self::history_of(&inner.table, user)
                    .into_iter()
                    .filter(|(existing, _)| existing != keyword)
                    .skip(keep_others)
                    .map(|(existing, _)| Operation::Delete {
                        key: owned_key(SEARCH_HISTORY, user, &existing),
                    }),
            );
            Ok(operations)
        })
    }

    fn delete_search_history(&self, user: &str, keyword: Option<&str>) -> Result<()> {
        match history_keyword(keyword) {
            Some(keyword) => self.delete("delete_search_history", owned_key(SEARCH_HISTORY, user, keyword)),
            None => self.commit("delete_search_history", |_| {
                Ok(vec![Operation::DeletePrefix {
                    prefix: owner_prefix(SEARCH_HISTORY, user),
                }])
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Skip Configs
    // -------------------------------------------------------------------------
    fn get_skip_config(&self, user: &str, source: &str, id: &str) -> Option<SkipConfig> {
        codec::decode(&self.get_text(&skip_key(user, source, id))?)
    }

    fn set_skip_config(&self, user: &str, source: &str, id: &str, config: &SkipConfig) -> Result<()> {
        let value = codec::encode(config)?;
        self.put("set_skip_config", skip_key(user, source, id), value)
    }

    fn delete_skip_config(&self, user: &str, source: &str, id: &str) -> Result<()> {
        self.delete("delete_skip_config", skip_key(user, source, id))
    }

    fn get_all_skip_configs(&self, user: &str) -> HashMap<String, SkipConfig> {
        codec::decode_map(
            self.scan_stripped(&owner_prefix(SKIP_CONFIGS, user))
                .into_iter()
                .filter_map(|(rest, value)| {
                    let (source, id) = split_segment(&rest)?;
                    Some((skip_config_key(source, id), value))
                }),
        )
    }

    // -------------------------------------------------------------------------
    // Admin Config
    // -------------------------------------------------------------------------
    fn get_admin_config(&self) -> Option<AdminConfig> {
        codec::decode(&self.get_text(ADMIN_CONFIG_KEY)?)
    }

    fn set_admin_config(&self, config: &AdminConfig) -> Result<()> {
        let value = codec::encode(config)?;
        self.put("set_admin_config", ADMIN_CONFIG_KEY.to_string(), value)
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------
    fn clear_all_data(&self) -> Result<()> {
        self.commit("clear_all_data", |_| {
            Ok(vec![Operation::DeletePrefix { prefix: String::new() }])
        })?;

        tracing::info!("kv storage cleared");
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    fn backend_name(&self) -> &'static str {
        "kv"
    }
}
