//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest accepted entry body (64 MB); anything bigger is treated as corrupt
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the WAL: one atomic batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The batch, applied in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: String, value: String },

    /// Delete a key
    Delete { key: String },

    /// Delete every key starting with `prefix` (empty prefix: everything)
    DeletePrefix { prefix: String },
}

impl WalEntry {
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        Self {
            lsn,
            operations,
            timestamp: now_millis(),
        }
    }

    /// Frame the entry: header followed by the bincode body
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self).map_err(|e| StoreError::Codec(e.to_string()))?;
        if body.len() > MAX_ENTRY_SIZE as usize {
            return Err(StoreError::Codec(format!(
                "WAL entry too large: {} bytes (max {})",
                body.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&Self::compute_crc(&body).to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Verify and decode a body read from disk
    pub fn deserialize(lsn: u64, crc: u32, body: &[u8]) -> Result<Self> {
        let actual = Self::compute_crc(body);
        if actual != crc {
            return Err(StoreError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: WalEntry =
            bincode::deserialize(body).map_err(|e| StoreError::WalCorruption(e.to_string()))?;
        if entry.lsn != lsn {
            return Err(StoreError::WalCorruption(format!(
                "LSN mismatch: header {}, body {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    pub fn compute_crc(body: &[u8]) -> u32 {
        crc32fast::hash(body)
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
