//! SQLite schema
//!
//! Created lazily on first use. Every statement is `IF NOT EXISTS`, so running
//! it against an existing database is a no-op.

/// Tables and owner-scoped indexes
pub(super) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username   TEXT PRIMARY KEY,
    password   TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS play_records (
    username   TEXT NOT NULL,
    key        TEXT NOT NULL,
    data       TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (username, key)
);

CREATE TABLE IF NOT EXISTS favorites (
    username   TEXT NOT NULL,
    key        TEXT NOT NULL,
    data       TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (username, key)
);

CREATE TABLE IF NOT EXISTS search_history (
    username   TEXT NOT NULL,
    keyword    TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (username, keyword)
);

CREATE TABLE IF NOT EXISTS skip_configs (
    username   TEXT NOT NULL,
    source     TEXT NOT NULL,
    id         TEXT NOT NULL,
    data       TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (username, source, id)
);

CREATE TABLE IF NOT EXISTS admin_config (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    data       TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_play_records_username ON play_records(username);
CREATE INDEX IF NOT EXISTS idx_favorites_username ON favorites(username);
CREATE INDEX IF NOT EXISTS idx_search_history_username ON search_history(username, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_skip_configs_username ON skip_configs(username);
"#;

/// Per-owner tables cleared by `delete_user`, users table excluded
pub(super) const OWNED_TABLES: [&str; 4] = ["play_records", "favorites", "search_history", "skip_configs"];

/// Every table, cleared by `clear_all_data`
pub(super) const ALL_TABLES: [&str; 6] = [
    "users",
    "play_records",
    "favorites",
    "search_history",
    "skip_configs",
    "admin_config",
];
