//! Shared conformance suite
//!
//! Every adapter must pass every check here; `conformance_tests.rs` runs the
//! suite once per backend.

#![allow(dead_code)]

use watchvault::model::{AdminUser, SiteConfig, UserConfig, UserRole};
use watchvault::{AdminConfig, Favorite, PlayRecord, SkipConfig, Storage, StoreError};

// =============================================================================
// Fixtures
// =============================================================================

pub fn play_record(title: &str, play_time: u64) -> PlayRecord {
    PlayRecord {
        title: title.to_string(),
        source_name: "Example Source".to_string(),
        cover: "https://img.example/cover.jpg".to_string(),
        year: "2024".to_string(),
        index: 3,
        total_episodes: 12,
        play_time: play_time as f64,
        total_time: 1440.0,
        save_time: 1_700_000_000_000,
        search_title: title.to_lowercase(),
        ..Default::default()
    }
}

pub fn favorite(title: &str) -> Favorite {
    Favorite {
        source_name: "Example Source".to_string(),
        total_episodes: 24,
        title: title.to_string(),
        year: "2023".to_string(),
        cover: "https://img.example/fav.jpg".to_string(),
        save_time: 1_700_000_000_500,
        search_title: title.to_lowercase(),
        origin: Some("vod".to_string()),
        ..Default::default()
    }
}

pub fn skip_config(intro: f64, outro: f64) -> SkipConfig {
    SkipConfig {
        enable: true,
        intro_time: intro,
        outro_time: outro,
        ..Default::default()
    }
}

pub fn admin_config(site_name: &str) -> AdminConfig {
    AdminConfig {
        config_file: "{}".to_string(),
        site_config: SiteConfig {
            site_name: site_name.to_string(),
            disable_yellow_filter: false,
            ..Default::default()
        },
        user_config: UserConfig {
            users: vec![AdminUser {
                username: "alice".to_string(),
                role: UserRole::Owner,
                banned: false,
                disable_adult_filter: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        },
        ..Default::default()
    }
}

// =============================================================================
// Play Records & Favorites
// =============================================================================

pub fn play_record_round_trip(s: &dyn Storage) {
    let record = play_record("Night Train", 321);
    s.set_play_record("alice", "src1+100", &record).unwrap();

    assert_eq!(s.get_play_record("alice", "src1+100"), Some(record));
    assert_eq!(s.get_play_record("alice", "src1+999"), None);
    assert_eq!(s.get_play_record("bob", "src1+100"), None);
}

pub fn play_record_upsert(s: &dyn Storage) {
    s.set_play_record("alice", "k", &play_record("Night Train", 10)).unwrap();
    s.set_play_record("alice", "k", &play_record("Night Train", 20)).unwrap();

    assert_eq!(s.get_play_record("alice", "k").unwrap().play_time, 20.0);

    let all = s.get_all_play_records("alice");
    assert_eq!(all.len(), 1);
    assert_eq!(all["k"].play_time, 20.0);
}

pub fn play_record_delete_is_idempotent(s: &dyn Storage) {
    s.set_play_record("alice", "k", &play_record("A", 1)).unwrap();

    s.delete_play_record("alice", "k").unwrap();
    assert_eq!(s.get_play_record("alice", "k"), None);

    s.delete_play_record("alice", "k").unwrap();
    assert_eq!(s.get_play_record("alice", "k"), None);
    assert!(s.get_all_play_records("alice").is_empty());
}

pub fn get_all_play_records_is_owner_scoped(s: &dyn Storage) {
    s.set_play_record("alice", "a", &play_record("A", 1)).unwrap();
    s.set_play_record("alice", "b", &play_record("B", 2)).unwrap();
    s.set_play_record("alice2", "c", &play_record("C", 3)).unwrap();

    let all = s.get_all_play_records("alice");
    assert_eq!(all.len(), 2);
    assert_eq!(all["a"].title, "A");
    assert_eq!(all["b"].title, "B");

    assert_eq!(s.get_all_play_records("alice2").len(), 1);
    assert!(s.get_all_play_records("nobody").is_empty());
}

pub fn favorite_lifecycle(s: &dyn Storage) {
    let first = favorite("Harbor Lights");
    s.set_favorite("alice", "src2+7", &first).unwrap();
    assert_eq!(s.get_favorite("alice", "src2+7"), Some(first));

    let mut second = favorite("Harbor Lights");
    second.total_episodes = 26;
    s.set_favorite("alice", "src2+7", &second).unwrap();

    let all = s.get_all_favorites("alice");
    assert_eq!(all.len(), 1);
    assert_eq!(all["src2+7"], second);

    s.delete_favorite("alice", "src2+7").unwrap();
    s.delete_favorite("alice", "src2+7").unwrap();
    assert_eq!(s.get_favorite("alice", "src2+7"), None);
    assert!(s.get_all_favorites("alice").is_empty());
}

// =============================================================================
// Users
// =============================================================================

pub fn user_registration(s: &dyn Storage) {
    assert!(!s.check_user_exist("alice"));

    s.register_user("alice", "hunter2").unwrap();
    assert!(s.check_user_exist("alice"));
    assert!(s.verify_user("alice", "hunter2"));
    assert!(!s.verify_user("alice", "wrong"));
    assert!(!s.verify_user("bob", "hunter2"));

    let err = s.register_user("alice", "other").unwrap_err();
    assert!(matches!(err, StoreError::UserAlreadyExists(ref name) if name == "alice"));

    // Failed registration leaves the original password in place
    assert!(s.verify_user("alice", "hunter2"));
}

pub fn change_password(s: &dyn Storage) {
    s.register_user("alice", "old").unwrap();
    s.change_password("alice", "new").unwrap();

    assert!(s.verify_user("alice", "new"));
    assert!(!s.verify_user("alice", "old"));

    // Missing user: no error, nothing created
    s.change_password("ghost", "pw").unwrap();
    assert!(!s.check_user_exist("ghost"));
}

pub fn get_all_users_is_sorted(s: &dyn Storage) {
    for name in ["carol", "alice", "bob"] {
        s.register_user(name, "pw").unwrap();
    }
    assert_eq!(s.get_all_users(), vec!["alice", "bob", "carol"]);
}

pub fn delete_user_removes_everything(s: &dyn Storage) {
    s.register_user("alice", "pw").unwrap();
    s.register_user("bob", "pw").unwrap();

    for user in ["alice", "bob"] {
        s.set_play_record(user, "k", &play_record("A", 1)).unwrap();
        s.set_favorite(user, "k", &favorite("F")).unwrap();
        s.add_search_history(user, "query").unwrap();
        s.set_skip_config(user, "src", "42", &skip_config(10.0, 20.0)).unwrap();
    }

    s.delete_user("alice").unwrap();

    assert!(!s.check_user_exist("alice"));
    assert!(s.get_all_play_records("alice").is_empty());
    assert!(s.get_all_favorites("alice").is_empty());
    assert!(s.get_all_skip_configs("alice").is_empty());
    assert!(s.get_search_history("alice").is_empty());

    // Other users untouched
    assert!(s.check_user_exist("bob"));
    assert_eq!(s.get_all_play_records("bob").len(), 1);
    assert_eq!(s.get_all_favorites("bob").len(), 1);
    assert_eq!(s.get_all_skip_configs("bob").len(), 1);
    assert_eq!(s.get_search_history("bob"), vec!["query"]);
    assert_eq!(s.get_all_users(), vec!["bob"]);

    // Deleting again is not an error
    s.delete_user("alice").unwrap();
}

/// Owner names may contain the characters adapters use inside their keys
pub fn owner_names_with_separators_are_isolated(s: &dyn Storage) {
    let owners = ["a", "a\0b", "a:1", "1:a"];
    for owner in owners {
        s.register_user(owner, "pw").unwrap();
        s.set_play_record(owner, "k", &play_record(owner, 1)).unwrap();
        s.set_favorite(owner, "k", &favorite(owner)).unwrap();
        s.add_search_history(owner, owner).unwrap();
        s.set_skip_config(owner, "src", "1", &skip_config(1.0, 2.0)).unwrap();
    }
    s.set_skip_config("a", "src\01", "2", &skip_config(3.0, 4.0)).unwrap();

    for owner in owners {
        let records = s.get_all_play_records(owner);
        assert_eq!(records.len(), 1, "owner {:?}", owner);
        assert_eq!(records["k"].title, owner);
        assert_eq!(s.get_all_favorites(owner).len(), 1);
        assert_eq!(s.get_search_history(owner), vec![owner]);
    }
    let skips = s.get_all_skip_configs("a");
    assert_eq!(skips.len(), 2);
    assert_eq!(skips["src\01+2"], skip_config(3.0, 4.0));
    assert_eq!(s.get_all_skip_configs("a\0b").len(), 1);

    s.delete_user("a").unwrap();

    assert!(!s.check_user_exist("a"));
    assert!(s.get_all_play_records("a").is_empty());
    for owner in &owners[1..] {
        assert!(s.check_user_exist(owner));
        assert_eq!(s.get_all_play_records(owner).len(), 1, "owner {:?}", owner);
        assert_eq!(s.get_all_favorites(owner).len(), 1);
        assert_eq!(s.get_search_history(owner), vec![*owner]);
        assert_eq!(s.get_all_skip_configs(owner).len(), 1);
    }
}

// =============================================================================
// Search History
// =============================================================================

pub fn search_history_order(s: &dyn Storage) {
    assert!(s.get_search_history("alice").is_empty());

    for keyword in ["one", "two", "three"] {
        s.add_search_history("alice", keyword).unwrap();
    }
    assert_eq!(s.get_search_history("alice"), vec!["three", "two", "one"]);
}

pub fn search_history_is_bounded(s: &dyn Storage) {
    for i in 0..25 {
        s.add_search_history("alice", &format!("kw{:02}", i)).unwrap();
    }

    let history = s.get_search_history("alice");
    let expected: Vec<String> = (5..25).rev().map(|i| format!("kw{:02}", i)).collect();
    assert_eq!(history.len(), 20);
    assert_eq!(history, expected);
}

pub fn search_history_reinsert_moves_to_front(s: &dyn Storage) {
    for keyword in ["a", "b", "c"] {
        s.add_search_history("alice", keyword).unwrap();
    }
    s.add_search_history("alice", "a").unwrap();

    assert_eq!(s.get_search_history("alice"), vec!["a", "c", "b"]);

    // Same keyword twice in a row: still one entry
    s.add_search_history("alice", "a").unwrap();
    assert_eq!(s.get_search_history("alice"), vec!["a", "c", "b"]);
}

pub fn search_history_reinsert_at_capacity(s: &dyn Storage) {
    for i in 0..20 {
        s.add_search_history("alice", &format!("kw{:02}", i)).unwrap();
    }
    // Oldest keyword refreshed: nothing else may be evicted
    s.add_search_history("alice", "kw00").unwrap();

    let history = s.get_search_history("alice");
    assert_eq!(history.len(), 20);
    assert_eq!(history[0], "kw00");
    assert_eq!(history[19], "kw01");
}

pub fn search_history_delete(s: &dyn Storage) {
    for keyword in ["a", "b", "c"] {
        s.add_search_history("alice", keyword).unwrap();
        s.add_search_history("bob", keyword).unwrap();
    }

    s.delete_search_history("alice", Some("b")).unwrap();
    assert_eq!(s.get_search_history("alice"), vec!["c", "a"]);

    s.delete_search_history("alice", Some("missing")).unwrap();
    assert_eq!(s.get_search_history("alice"), vec!["c", "a"]);

    s.delete_search_history("alice", None).unwrap();
    assert!(s.get_search_history("alice").is_empty());

    // Empty keyword clears everything too
    s.delete_search_history("bob", Some("")).unwrap();
    assert!(s.get_search_history("bob").is_empty());
}

pub fn search_history_is_per_user(s: &dyn Storage) {
    for i in 0..20 {
        s.add_search_history("alice", &format!("a{}", i)).unwrap();
    }
    s.add_search_history("bob", "only").unwrap();

    assert_eq!(s.get_search_history("alice").len(), 20);
    assert_eq!(s.get_search_history("bob"), vec!["only"]);
}

// =============================================================================
// Skip Configs
// =============================================================================

pub fn skip_config_lifecycle(s: &dyn Storage) {
    s.set_skip_config("alice", "srcA", "100", &skip_config(30.0, 60.0)).unwrap();
    s.set_skip_config("alice", "srcB", "100", &skip_config(5.0, 0.0)).unwrap();
    s.set_skip_config("alice", "srcA", "100", &skip_config(45.5, 90.0)).unwrap();

    assert_eq!(s.get_skip_config("alice", "srcA", "100"), Some(skip_config(45.5, 90.0)));
    assert_eq!(s.get_skip_config("alice", "srcA", "101"), None);

    let all = s.get_all_skip_configs("alice");
    assert_eq!(all.len(), 2);
    assert_eq!(all["srcA+100"], skip_config(45.5, 90.0));
    assert_eq!(all["srcB+100"], skip_config(5.0, 0.0));

    s.delete_skip_config("alice", "srcA", "100").unwrap();
    s.delete_skip_config("alice", "srcA", "100").unwrap();
    assert_eq!(s.get_skip_config("alice", "srcA", "100"), None);
    assert_eq!(s.get_all_skip_configs("alice").len(), 1);
}

// =============================================================================
// Admin Config & Maintenance
// =============================================================================

pub fn admin_config_singleton(s: &dyn Storage) {
    assert_eq!(s.get_admin_config(), None);

    s.set_admin_config(&admin_config("First")).unwrap();
    s.set_admin_config(&admin_config("Second")).unwrap();

    let stored = s.get_admin_config().unwrap();
    assert_eq!(stored, admin_config("Second"));
    assert_eq!(stored.user_config.users[0].disable_adult_filter, Some(true));
}

pub fn admin_config_preserves_unknown_sections(s: &dyn Storage) {
    let raw = r#"{
        "SiteConfig": {"SiteName": "Mine", "DoubanProxy": "https://proxy.example"},
        "UserConfig": {"Users": [{"username": "dave", "role": "guest", "enabledApis": ["src1"]}]},
        "CustomCategories": [{"name": "Docs", "type": "movie", "query": "documentary"}],
        "LiveConfig": [{"key": "tv", "url": "https://live.example/tv.m3u"}]
    }"#;
    let config: AdminConfig = serde_json::from_str(raw).unwrap();
    s.set_admin_config(&config).unwrap();

    let stored = s.get_admin_config().unwrap();
    assert_eq!(stored, config);

    let json = serde_json::to_value(&stored).unwrap();
    assert_eq!(json["CustomCategories"][0]["name"], "Docs");
    assert_eq!(json["LiveConfig"][0]["key"], "tv");
    assert_eq!(json["SiteConfig"]["DoubanProxy"], "https://proxy.example");
    assert_eq!(json["UserConfig"]["Users"][0]["role"], "guest");
    assert_eq!(json["UserConfig"]["Users"][0]["enabledApis"][0], "src1");
}

pub fn play_record_preserves_unknown_fields(s: &dyn Storage) {
    let mut record = play_record("Night Train", 0);
    record.play_time = 61.75;
    record.extra.insert("vod_class".to_string(), serde_json::json!("drama"));
    s.set_play_record("alice", "k", &record).unwrap();

    let stored = s.get_play_record("alice", "k").unwrap();
    assert_eq!(stored.play_time, 61.75);
    assert_eq!(stored.extra["vod_class"], "drama");
    assert_eq!(s.get_all_play_records("alice")["k"], record);
}

pub fn clear_all_data(s: &dyn Storage) {
    s.register_user("alice", "pw").unwrap();
    s.set_play_record("alice", "k", &play_record("A", 1)).unwrap();
    s.set_favorite("alice", "k", &favorite("F")).unwrap();
    s.add_search_history("alice", "q").unwrap();
    s.set_skip_config("alice", "src", "1", &skip_config(1.0, 2.0)).unwrap();
    s.set_admin_config(&admin_config("Site")).unwrap();

    s.clear_all_data().unwrap();

    assert!(s.get_all_users().is_empty());
    assert!(!s.check_user_exist("alice"));
    assert!(s.get_all_play_records("alice").is_empty());
    assert!(s.get_all_favorites("alice").is_empty());
    assert!(s.get_search_history("alice").is_empty());
    assert!(s.get_all_skip_configs("alice").is_empty());
    assert_eq!(s.get_admin_config(), None);

    // Usable afterwards
    s.register_user("alice", "pw2").unwrap();
    assert!(s.verify_user("alice", "pw2"));
}

pub fn reports_available(s: &dyn Storage) {
    assert!(s.is_available());
    assert!(!s.backend_name().is_empty());
}

// =============================================================================
// Degraded Mode
// =============================================================================

/// An adapter with no backend: reads empty, writes `BackendUnavailable`
pub fn degraded_mode(s: &dyn Storage) {
    assert!(!s.is_available());

    assert_eq!(s.get_play_record("alice", "k"), None);
    assert!(s.get_all_play_records("alice").is_empty());
    assert_eq!(s.get_favorite("alice", "k"), None);
    assert!(s.get_all_favorites("alice").is_empty());
    assert!(!s.verify_user("alice", "pw"));
    assert!(!s.check_user_exist("alice"));
    assert!(s.get_all_users().is_empty());
    assert!(s.get_search_history("alice").is_empty());
    assert_eq!(s.get_skip_config("alice", "src", "1"), None);
    assert!(s.get_all_skip_configs("alice").is_empty());
    assert_eq!(s.get_admin_config(), None);

    let writes: Vec<watchvault::Result<()>> = vec![
        s.set_play_record("alice", "k", &play_record("A", 1)),
        s.delete_play_record("alice", "k"),
        s.set_favorite("alice", "k", &favorite("F")),
        s.delete_favorite("alice", "k"),
        s.register_user("alice", "pw"),
        s.change_password("alice", "pw"),
        s.delete_user("alice"),
        s.add_search_history("alice", "q"),
        s.delete_search_history("alice", None),
        s.set_skip_config("alice", "src", "1", &skip_config(1.0, 2.0)),
        s.delete_skip_config("alice", "src", "1"),
        s.set_admin_config(&admin_config("Site")),
        s.clear_all_data(),
    ];

    for result in writes {
        assert!(matches!(result, Err(StoreError::BackendUnavailable(_))), "got {:?}", result);
    }
}
