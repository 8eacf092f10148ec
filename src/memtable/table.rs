//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::wal::Operation;

/// In-memory table of live keys
pub struct MemTable {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Whether a key is present (read lock)
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// All entries whose key starts with `prefix`, in key order (read lock)
    pub fn scan_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        let data = self.data.read();
        prefix_range(&data, prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Apply a batch in order under a single write lock
    pub fn apply(&self, operations: &[Operation]) {
        let mut data = self.data.write();
        for operation in operations {
            match operation {
                Operation::Put { key, value } => {
                    data.insert(key.clone(), value.clone());
                }
                Operation::Delete { key } => {
                    data.remove(key);
                }
                Operation::DeletePrefix { prefix } if prefix.is_empty() => data.clear(),
                Operation::DeletePrefix { prefix } => {
                    let doomed: Vec<String> = prefix_range(&data, prefix).map(|(k, _)| k.clone()).collect();
                    for key in doomed {
                        data.remove(&key);
                    }
                }
            }
        }
    }

    /// Copy of every entry in key order (for compaction)
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

fn prefix_range<'a>(
    data: &'a BTreeMap<String, String>,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
    data.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(k, _)| k.starts_with(prefix))
}
