//! Tests for the adult-content filter policy
//!
//! These tests verify:
//! - Request parameters win over both config layers
//! - `adult` is consulted before `filter`
//! - A per-user override wins over the site-wide switch
//! - Unrecognized parameter values fall through
//! - Resolution from a loaded admin config
//! - Parsing `key=value` pairs rejects malformed input

use std::collections::{BTreeMap, HashMap};

use watchvault::model::{AdminConfig, AdminUser, UserRole};
use watchvault::policy::{params_from_pairs, request_override};
use watchvault::StoreError;
use watchvault::{resolve_adult_filter, resolve_for_user};

// =============================================================================
// Helper Functions
// =============================================================================

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn config_with(global_disable: bool, users: Vec<AdminUser>) -> AdminConfig {
    let mut config = AdminConfig::default();
    config.site_config.disable_yellow_filter = global_disable;
    config.user_config.users = users;
    config
}

fn user(name: &str, disable_adult_filter: Option<bool>) -> AdminUser {
    AdminUser {
        username: name.to_string(),
        role: UserRole::User,
        banned: false,
        disable_adult_filter,
        ..Default::default()
    }
}

// =============================================================================
// Precedence Tests
// =============================================================================

#[test]
fn test_request_param_beats_both_layers() {
    assert!(resolve_adult_filter(&params(&[("adult", "0")]), false, Some(true)));
}

#[test]
fn test_user_override_beats_global() {
    assert!(!resolve_adult_filter(&params(&[]), false, Some(true)));
    assert!(resolve_adult_filter(&params(&[]), true, Some(false)));
}

#[test]
fn test_falls_through_to_global() {
    assert!(resolve_adult_filter(&params(&[]), false, None));
    assert!(!resolve_adult_filter(&params(&[]), true, None));
}

#[test]
fn test_filter_param_beats_config() {
    assert!(!resolve_adult_filter(&params(&[("filter", "off")]), true, Some(false)));
    assert!(resolve_adult_filter(&params(&[("filter", "enable")]), true, Some(true)));
}

#[test]
fn test_adult_param_checked_before_filter() {
    let both = params(&[("adult", "1"), ("filter", "on")]);
    assert!(!resolve_adult_filter(&both, false, None));

    let both = params(&[("adult", "false"), ("filter", "off")]);
    assert!(resolve_adult_filter(&both, true, Some(true)));
}

#[test]
fn test_request_override_values() {
    assert_eq!(request_override(&params(&[("adult", "1")])), Some(false));
    assert_eq!(request_override(&params(&[("adult", "true")])), Some(false));
    assert_eq!(request_override(&params(&[("adult", "0")])), Some(true));
    assert_eq!(request_override(&params(&[("adult", "false")])), Some(true));
    assert_eq!(request_override(&params(&[("filter", "off")])), Some(false));
    assert_eq!(request_override(&params(&[("filter", "disable")])), Some(false));
    assert_eq!(request_override(&params(&[("filter", "on")])), Some(true));
    assert_eq!(request_override(&params(&[("filter", "enable")])), Some(true));
    assert_eq!(request_override(&params(&[])), None);
}

#[test]
fn test_unrecognized_values_fall_through() {
    // An unknown `adult` value does not hide a valid `filter`
    let p = params(&[("adult", "maybe"), ("filter", "off")]);
    assert_eq!(request_override(&p), Some(false));

    let p = params(&[("adult", "TRUE"), ("filter", "yes")]);
    assert_eq!(request_override(&p), None);
    assert!(resolve_adult_filter(&p, false, None));
}

#[test]
fn test_other_param_containers() {
    let pairs: [(&str, &str); 1] = [("adult", "1")];
    assert!(!resolve_adult_filter(&pairs[..], false, None));

    let mut tree = BTreeMap::new();
    tree.insert("filter".to_string(), "on".to_string());
    assert!(resolve_adult_filter(&tree, true, Some(true)));

    let owned = vec![("filter".to_string(), "disable".to_string())];
    assert!(!resolve_adult_filter(owned.as_slice(), false, None));
}

// =============================================================================
// Admin Config Resolution Tests
// =============================================================================

#[test]
fn test_resolve_for_user_uses_user_entry() {
    let config = config_with(false, vec![user("alice", Some(true)), user("bob", None)]);
    let empty = params(&[]);

    assert!(!resolve_for_user(&empty, &config, Some("alice")));
    // Entry without an override falls through to global
    assert!(resolve_for_user(&empty, &config, Some("bob")));
    // Unknown user and anonymous requests use global
    assert!(resolve_for_user(&empty, &config, Some("carol")));
    assert!(resolve_for_user(&empty, &config, None));
}

#[test]
fn test_resolve_for_user_request_param_wins() {
    let config = config_with(true, vec![user("alice", Some(true))]);

    assert!(resolve_for_user(&params(&[("adult", "0")]), &config, Some("alice")));
    assert!(!resolve_for_user(&params(&[]), &config, None));
}

#[test]
fn test_resolve_with_default_config_filters() {
    assert!(resolve_for_user(&params(&[]), &AdminConfig::default(), Some("alice")));
}

// =============================================================================
// Parameter Parsing Tests
// =============================================================================

#[test]
fn test_params_from_pairs() {
    let parsed = params_from_pairs(["adult=0", "q=a=b", "empty="]).unwrap();
    assert_eq!(parsed["adult"], "0");
    assert_eq!(parsed["q"], "a=b");
    assert_eq!(parsed["empty"], "");
    assert!(resolve_adult_filter(&parsed, true, None));

    let repeated = params_from_pairs(vec!["filter=off".to_string(), "filter=on".to_string()]).unwrap();
    assert_eq!(repeated["filter"], "off");

    assert!(params_from_pairs(Vec::<String>::new()).unwrap().is_empty());
}

#[test]
fn test_params_from_pairs_rejects_malformed() {
    let err = params_from_pairs(["adult=1", "filter"]).unwrap_err();
    assert!(matches!(err, StoreError::Config(ref msg) if msg.contains("filter")), "got {:?}", err);

    let err = params_from_pairs(["=on"]).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)), "got {:?}", err);
}
