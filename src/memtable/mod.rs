//! MemTable Module
//!
//! In-memory ordered map holding the live state of the key/value backend.
//!
//! ## Responsibilities
//! - Fast point reads and ordered prefix scans
//! - Apply a whole WAL batch under one write lock, so readers observe either
//!   all of a batch or none of it
//! - Produce a snapshot for WAL compaction
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock: ordered keys make per-owner prefix scans a
//! range query.

mod table;

pub use table::MemTable;
