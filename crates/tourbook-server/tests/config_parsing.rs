use std::{env, fs};

use tourbook_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("tourbook.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
body_limit_bytes = 4096

[logging]
level = "debug"

[cache]
hotel_list_ttl_secs = 60
hotel_detail_ttl_secs = 120

[proxy]
base_path = "/booking"
upstream_url = "http://127.0.0.1:9999"
api_key = "file-key"
fallback_enabled = false
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses, unspecified fields keep defaults
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.body_limit_bytes, 4096);
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");
    assert_eq!(cfg.cache.hotel_list_ttl_secs, 60);
    assert_eq!(cfg.cache.hotel_detail_ttl_secs, 120);
    assert_eq!(cfg.cache.response_ttl_secs, 300);
    assert_eq!(cfg.proxy.base_path, "/booking");
    assert_eq!(cfg.proxy.api_key.as_deref(), Some("file-key"));
    assert_eq!(cfg.proxy.api_key_header, "X-RapidAPI-Key");
    assert!(!cfg.proxy.fallback_enabled);
    assert!(!cfg.redis.enabled);

    // 2) Env override should win over file
    unsafe {
        env::set_var("TOURBOOK__CACHE__HOTEL_LIST_TTL_SECS", "15");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.hotel_list_ttl_secs, 15);
    // cleanup env var
    unsafe {
        env::remove_var("TOURBOOK__CACHE__HOTEL_LIST_TTL_SECS");
    }

    // 3) Invalid config (base path without leading slash) should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[proxy]
base_path = "api/booking"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("proxy.base_path"));

    // 4) Zero TTL with caching enabled is rejected
    let zero_ttl_path = dir.path().join("zero_ttl.toml");
    fs::write(&zero_ttl_path, "[cache]\nhotel_detail_ttl_secs = 0\n").expect("write toml");
    let err = load_config(zero_ttl_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("cache TTLs"));
}
