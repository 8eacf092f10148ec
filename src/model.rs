//! Stored entity payloads
//!
//! Field names follow the JSON the web front end already reads and writes,
//! so records stored by older deployments keep decoding. Fields this crate
//! does not name are kept in `extra` and written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields carried through without interpretation
pub type Extra = Map<String, Value>;

/// Watch progress for one piece of content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayRecord {
    pub title: String,
    pub source_name: String,
    pub cover: String,
    pub year: String,
    /// Episode number being watched (1-based)
    pub index: u32,
    pub total_episodes: u32,
    /// Playback position in seconds
    pub play_time: f64,
    /// Episode duration in seconds
    pub total_time: f64,
    /// Unix millis of the last save
    pub save_time: i64,
    pub search_title: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A favorited title
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Favorite {
    pub source_name: String,
    pub total_episodes: u32,
    pub title: String,
    pub year: String,
    pub cover: String,
    pub save_time: i64,
    pub search_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Intro/outro skip markers for one (source, id)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub enable: bool,
    /// Seconds to skip at the start
    pub intro_time: f64,
    /// Seconds to skip at the end
    pub outro_time: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

// =============================================================================
// Admin Configuration
// =============================================================================

/// The process-wide admin configuration singleton
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AdminConfig {
    /// Raw config file contents the site was bootstrapped from
    pub config_file: String,
    pub site_config: SiteConfig,
    pub user_config: UserConfig,
    pub source_config: Vec<SourceEntry>,
    /// Sections such as custom categories and live sources
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SiteConfig {
    pub site_name: String,
    pub announcement: String,
    pub search_downstream_max_page: u32,
    /// Seconds
    pub site_interface_cache_time: u64,
    /// Global switch: `true` turns adult-content filtering off site-wide
    pub disable_yellow_filter: bool,
    pub fluid_search: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "WatchVault".to_string(),
            announcement: String::new(),
            search_downstream_max_page: 5,
            site_interface_cache_time: 7200,
            disable_yellow_filter: false,
            fluid_search: true,
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UserConfig {
    pub users: Vec<AdminUser>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl UserConfig {
    /// Look up a user entry by name
    pub fn find(&self, username: &str) -> Option<&AdminUser> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminUser {
    pub username: String,
    pub role: UserRole,
    pub banned: bool,
    /// Per-user override of the global filter switch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_adult_filter: Option<bool>,
    /// Per-user fields such as the enabled source list
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for AdminUser {
    fn default() -> Self {
        Self {
            username: String::new(),
            role: UserRole::User,
            banned: false,
            disable_adult_filter: None,
            extra: Extra::new(),
        }
    }
}

/// Stored as a lowercase string; roles this crate does not know are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Owner,
    Admin,
    User,
    Other(String),
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Other(role) => role,
        }
    }
}

impl From<String> for UserRole {
    fn from(role: String) -> Self {
        match role.as_str() {
            "owner" => UserRole::Owner,
            "admin" => UserRole::Admin,
            "user" => UserRole::User,
            _ => UserRole::Other(role),
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

/// An upstream content source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceEntry {
    pub key: String,
    pub name: String,
    pub api: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// `config` for sources from the config file, `custom` for admin-added
    pub from: String,
    pub disabled: bool,
    #[serde(flatten)]
    pub extra: Extra,
}
