//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, StoreError};

use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    file: File,

    /// LSN the next append will use
    next_lsn: u64,

    sync_strategy: WalSyncStrategy,

    /// Entries appended since the last fsync
    unsynced: usize,

    /// Current file length in bytes
    size: u64,

    /// Set when a failed append could not be cut back out of the file
    failed: bool,
}

impl WalWriter {
    /// Open or create a WAL file for appending
    ///
    /// `next_lsn` is normally one past the last LSN seen during recovery.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: next_lsn.max(1),
            sync_strategy,
            unsynced: 0,
            size,
            failed: false,
        })
    }

    /// Append one batch as a single entry; returns its LSN
    ///
    /// An append either succeeds or leaves the log, LSN and size exactly as
    /// they were: a failed write or fsync cuts the file back to its previous
    /// length. If that cut fails too, the writer is marked failed and every
    /// later append returns `BackendUnavailable`.
    pub fn append(&mut self, operations: &[Operation]) -> Result<u64> {
        if self.failed {
            return Err(StoreError::unavailable("WAL writer failed, log tail is unknown"));
        }

        let lsn = self.next_lsn;
        let bytes = WalEntry::new(lsn, operations.to_vec()).serialize()?;
        let needs_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };

        let written = self.file.write_all(&bytes).and_then(|()| {
            if needs_sync {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(e) = written {
            if let Err(truncate_err) = self.file.set_len(self.size) {
                self.failed = true;
                tracing::error!(
                    path = %self.path.display(),
                    lsn,
                    error = %e,
                    truncate_error = %truncate_err,
                    "WAL append failed and could not be rolled back"
                );
                return Err(StoreError::unavailable(format!(
                    "WAL append failed ({}) and rollback failed ({})",
                    e, truncate_err
                )));
            }
            return Err(e.into());
        }

        self.size += bytes.len() as u64;
        self.next_lsn += 1;
        self.unsynced = if needs_sync { 0 } else { self.unsynced + 1 };

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Replace the log at `path` with a single entry holding `operations`
    ///
    /// Writes a sibling temp file, fsyncs it, then renames it over the log.
    /// A crash at any point leaves either the old log or the new one.
    pub fn rewrite(
        path: &Path,
        sync_strategy: WalSyncStrategy,
        lsn: u64,
        operations: Vec<Operation>,
    ) -> Result<Self> {
        let tmp_path = path.with_extension("wal.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            if !operations.is_empty() {
                tmp.write_all(&WalEntry::new(lsn, operations).serialize()?)?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        Self::open(path, sync_strategy, lsn + 1)
    }

    /// The last LSN handed out (0 if none)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn - 1
    }

    /// Current log size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// True once an append failed and could not be rolled back
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
