//! Write-Ahead Log (WAL) Module
//!
//! Durability for the key/value backend through append-only logging.
//!
//! ## Responsibilities
//! - Append one record per write batch before the batch touches the memtable
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay, truncating a torn tail
//! - Compaction: rewrite the log as a single snapshot batch
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! Integers are little-endian. `Data` is the bincode-encoded [`WalEntry`];
//! the CRC covers `Data` only. One entry holds a whole batch, so a batch is
//! either replayed completely or not at all.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};
pub(crate) use entry::now_millis;
pub use reader::{WalRead, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
