//! # WatchVault
//!
//! Storage core of a personal media-tracking service:
//! - Per-user play records, favorites, search history and skip markers
//! - A single global admin configuration
//! - One storage contract, three interchangeable backends
//! - Degraded mode: an unprovisioned backend never takes the host down
//! - Per-request adult-content filter resolution
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Request Handlers                          │
//! │                (external to this crate)                      │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//! ┌──────────────▼──────────────┐   ┌───────────▼───────────────┐
//! │   Engine  (dyn Storage)     │   │   Policy Resolver         │
//! └──────────────┬──────────────┘   └───────────────────────────┘
//!                │
//!      ┌─────────┼──────────────────┐
//!      ▼         ▼                  ▼
//! ┌─────────┐ ┌─────────┐   ┌──────────────┐
//! │ Memory  │ │ SQLite  │   │     KV       │
//! └─────────┘ └─────────┘   │ WAL+MemTable │
//!                           └──────────────┘
//!            (payloads pass through the JSON Record Codec)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod codec;
pub mod model;

pub mod memtable;
pub mod wal;

pub mod engine;
pub mod policy;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{BackendKind, Config};
pub use engine::Engine;
pub use error::{Result, StoreError};
pub use model::{AdminConfig, Favorite, PlayRecord, SkipConfig};
pub use policy::{resolve_adult_filter, resolve_for_user};
pub use storage::Storage;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of WatchVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
