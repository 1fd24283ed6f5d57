use std::collections::HashMap;
use std::env::VarError;
use std::time::Duration;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_succeeds_with_empty_environment() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.sites_path.to_str(), Some("./config/sites.yaml"));
    assert_eq!(cfg.output_dir.to_str(), Some("./output"));
    assert_eq!(cfg.page_load_timeout_secs, 60);
    assert_eq!(cfg.settle_delay_ms, 3000);
    assert_eq!(cfg.detail_cooldown_ms, 2000);
    assert_eq!(cfg.max_load_more_clicks, 20);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.retry_backoff_base_secs, 2);
}

#[test]
fn duration_accessors_follow_raw_values() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.page_load_timeout(), Duration::from_secs(60));
    assert_eq!(cfg.settle_delay(), Duration::from_millis(3000));
    assert_eq!(cfg.detail_cooldown(), Duration::from_millis(2000));
}

#[test]
fn detail_cooldown_override() {
    let mut map = HashMap::new();
    map.insert("GIGDB_DETAIL_COOLDOWN_MS", "500");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.detail_cooldown_ms, 500);
}

#[test]
fn max_load_more_clicks_override() {
    let mut map = HashMap::new();
    map.insert("GIGDB_MAX_LOAD_MORE_CLICKS", " 5 ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.max_load_more_clicks, 5);
}

#[test]
fn invalid_settle_delay_is_rejected() {
    let mut map = HashMap::new();
    map.insert("GIGDB_SETTLE_DELAY_MS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GIGDB_SETTLE_DELAY_MS"),
        "expected InvalidEnvVar(GIGDB_SETTLE_DELAY_MS), got: {result:?}"
    );
}

#[test]
fn zero_page_load_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("GIGDB_PAGE_LOAD_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GIGDB_PAGE_LOAD_TIMEOUT_SECS"),
        "expected InvalidEnvVar(GIGDB_PAGE_LOAD_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn negative_retries_are_rejected() {
    let mut map = HashMap::new();
    map.insert("GIGDB_MAX_RETRIES", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn paths_and_user_agent_override() {
    let mut map = HashMap::new();
    map.insert("GIGDB_SITES_PATH", "/etc/gigdb/sites.yaml");
    map.insert("GIGDB_OUTPUT_DIR", "/var/lib/gigdb");
    map.insert("GIGDB_USER_AGENT", "gigdb-test/1.0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sites_path.to_str(), Some("/etc/gigdb/sites.yaml"));
    assert_eq!(cfg.output_dir.to_str(), Some("/var/lib/gigdb"));
    assert_eq!(cfg.user_agent, "gigdb-test/1.0");
}
