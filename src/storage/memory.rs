//! In-memory adapter
//!
//! Typed per-entity maps behind one RwLock. Payloads are still stored as
//! codec text so callers never share state with what is stored.

use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::RwLock;

use crate::codec;
use crate::config::DEFAULT_SEARCH_HISTORY_LIMIT;
use crate::error::{Result, StoreError};
use crate::model::{AdminConfig, Favorite, PlayRecord, SkipConfig};

use super::{history_keyword, skip_config_key, Storage};

/// owner -> natural key -> encoded payload
type OwnedTable = HashMap<String, HashMap<String, String>>;

#[derive(Default)]
struct MemoryState {
    /// username -> password; BTreeMap keeps `get_all_users` sorted
    users: BTreeMap<String, String>,
    play_records: OwnedTable,
    favorites: OwnedTable,
    /// owner -> keywords, most recent at the front
    search_history: HashMap<String, VecDeque<String>>,
    /// owner -> (source, id) -> encoded payload
    skip_configs: HashMap<String, HashMap<(String, String), String>>,
    admin_config: Option<String>,
}

impl MemoryState {
    fn remove_owned(table: &mut OwnedTable, user: &str, key: &str) {
        if let Some(rows) = table.get_mut(user) {
            rows.remove(key);
            if rows.is_empty() {
                table.remove(user);
            }
        }
    }
}

/// Process-local storage; always available, never durable
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    history_limit: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_SEARCH_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            history_limit,
        }
    }

    fn get_owned<T: serde::de::DeserializeOwned>(table: &OwnedTable, user: &str, key: &str) -> Option<T> {
        table.get(user)?.get(key).and_then(|text| codec::decode(text))
    }

    fn all_owned<T: serde::de::DeserializeOwned>(table: &OwnedTable, user: &str) -> HashMap<String, T> {
        match table.get(user) {
            Some(rows) => codec::decode_map(rows.iter().map(|(k, v)| (k.clone(), v.clone()))),
            None => HashMap::new(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_play_record(&self, user: &str, key: &str) -> Option<PlayRecord> {
        Self::get_owned(&self.state.read().play_records, user, key)
    }

    fn set_play_record(&self, user: &str, key: &str, record: &PlayRecord) -> Result<()> {
        let text = codec::encode(record)?;
        self.state
            .write()
            .play_records
            .entry(user.to_string())
            .or_default()
            .insert(key.to_string(), text);
        Ok(())
    }

    fn get_all_play_records(&self, user: &str) -> HashMap<String, PlayRecord> {
        Self::all_owned(&self.state.read().play_records, user)
    }

    fn delete_play_record(&self, user: &str, key: &str) -> Result<()> {
        MemoryState::remove_owned(&mut self.state.write().play_records, user, key);
        Ok(())
    }

    fn get_favorite(&self, user: &str, key: &str) -> Option<Favorite> {
        Self::get_owned(&self.state.read().favorites, user, key)
    }

    fn set_favorite(&self, user: &str, key: &str, favorite: &Favorite) -> Result<()> {
        let text = codec::encode(favorite)?;
        self.state
            .write()
            .favorites
            .entry(user.to_string())
            .or_default()
            .insert(key.to_string(), text);
        Ok(())
    }

    fn get_all_favorites(&self, user: &str) -> HashMap<String, Favorite> {
        Self::all_owned(&self.state.read().favorites, user)
    }

    fn delete_favorite(&self, user: &str, key: &str) -> Result<()> {
        MemoryState::remove_owned(&mut self.state.write().favorites, user, key);
        Ok(())
    }

    fn register_user(&self, user: &str, password: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.users.contains_key(user) {
            return Err(StoreError::UserAlreadyExists(user.to_string()));
        }
        state.users.insert(user.to_string(), password.to_string());
        Ok(())
    }

    fn verify_user(&self, user: &str, password: &str) -> bool {
        self.state.read().users.get(user).is_some_and(|stored| stored == password)
    }

    fn check_user_exist(&self, user: &str) -> bool {
        self.state.read().users.contains_key(user)
    }

    fn change_password(&self, user: &str, new_password: &str) -> Result<()> {
        if let Some(stored) = self.state.write().users.get_mut(user) {
            *stored = new_password.to_string();
        }
        Ok(())
    }

    fn delete_user(&self, user: &str) -> Result<()> {
        let mut state = self.state.write();
        state.users.remove(user);
        state.play_records.remove(user);
        state.favorites.remove(user);
        state.search_history.remove(user);
        state.skip_configs.remove(user);
        Ok(())
    }

    fn get_all_users(&self) -> Vec<String> {
        self.state.read().users.keys().cloned().collect()
    }

    fn get_search_history(&self, user: &str) -> Vec<String> {
        self.state
            .read()
            .search_history
            .get(user)
            .map(|history| history.iter().take(self.history_limit).cloned().collect())
            .unwrap_or_default()
    }

    fn add_search_history(&self, user: &str, keyword: &str) -> Result<()> {
        let mut state = self.state.write();
        let history = state.search_history.entry(user.to_string()).or_default();
        history.retain(|k| k != keyword);
        history.push_front(keyword.to_string());
        history.truncate(self.history_limit);
        Ok(())
    }

    fn delete_search_history(&self, user: &str, keyword: Option<&str>) -> Result<()> {
        let mut state = self.state.write();
        match history_keyword(keyword) {
            Some(keyword) => {
                if let Some(history) = state.search_history.get_mut(user) {
                    history.retain(|k| k != keyword);
                }
            }
            None => {
                state.search_history.remove(user);
            }
        }
        Ok(())
    }

    fn get_skip_config(&self, user: &str, source: &str, id: &str) -> Option<SkipConfig> {
        let state = self.state.read();
        let text = state
            .skip_configs
            .get(user)?
            .get(&(source.to_string(), id.to_string()))?;
        codec::decode(text)
    }

    fn set_skip_config(&self, user: &str, source: &str, id: &str, config: &SkipConfig) -> Result<()> {
        let text = codec::encode(config)?;
        self.state
            .write()
            .skip_configs
            .entry(user.to_string())
            .or_default()
            .insert((source.to_string(), id.to_string()), text);
        Ok(())
    }

    fn delete_skip_config(&self, user: &str, source: &str, id: &str) -> Result<()> {
        let mut state = self.state.write();
        if let Some(rows) = state.skip_configs.get_mut(user) {
            rows.remove(&(source.to_string(), id.to_string()));
        }
        Ok(())
    }

    fn get_all_skip_configs(&self, user: &str) -> HashMap<String, SkipConfig> {
        let state = self.state.read();
        match state.skip_configs.get(user) {
            Some(rows) => codec::decode_map(
                rows.iter()
                    .map(|((source, id), text)| (skip_config_key(source, id), text.clone())),
            ),
            None => HashMap::new(),
        }
    }

    fn get_admin_config(&self) -> Option<AdminConfig> {
        self.state.read().admin_config.as_deref().and_then(codec::decode)
    }

    fn set_admin_config(&self, config: &AdminConfig) -> Result<()> {
        let text = codec::encode(config)?;
        self.state.write().admin_config = Some(text);
        Ok(())
    }

    fn clear_all_data(&self) -> Result<()> {
        *self.state.write() = MemoryState::default();
        tracing::info!("memory storage cleared");
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
