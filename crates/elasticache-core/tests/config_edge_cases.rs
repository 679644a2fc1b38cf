use std::fs;
use std::path::PathBuf;

use elasticache_core::config::{ReconcilerConfig, ResourceTimeouts};
use elasticache_core::model::ResourceKind;
use tempfile::TempDir;

/// Returns true if running as root (euid == 0). Used to skip permission tests.
#[cfg(unix)]
fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// 1. Missing config file
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/elasticache-core-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = ReconcilerConfig::load_from_path(&path).expect("missing file should load defaults");

    assert_eq!(config, ReconcilerConfig::default());
}

// ---------------------------------------------------------------------------
// 2. Empty config file
// ---------------------------------------------------------------------------

#[test]
fn load_empty_config_file_returns_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config =
        ReconcilerConfig::load_from_path(&config_path).expect("empty file should parse as default");

    assert_eq!(config, ReconcilerConfig::default());
    assert_eq!(config.cache_cluster, ResourceTimeouts::from_minutes(40, 80, 40));
    assert_eq!(config.wait.min_poll_interval_secs, 10);
    assert_eq!(config.wait.not_found_checks, 20);
}

// ---------------------------------------------------------------------------
// 3. Corrupt / invalid TOML
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[[[broken").unwrap();

    let result = ReconcilerConfig::load_from_path(&config_path);
    assert!(result.is_err(), "corrupt TOML should produce an error");

    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("Parse"),
        "error should mention parsing: {msg}"
    );
}

// ---------------------------------------------------------------------------
// 4. Partial timeout table
// ---------------------------------------------------------------------------

#[test]
fn load_timeout_table_missing_fields_returns_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[replication_group]
create_secs = 7200
"#;
    fs::write(&config_path, content).unwrap();

    let result = ReconcilerConfig::load_from_path(&config_path);
    assert!(result.is_err(), "incomplete timeout table should produce an error");
}

#[test]
fn load_partial_config_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[user_group]
create_secs = 60
update_secs = 120
delete_secs = 180

[wait]
min_poll_interval_secs = 5
"#;
    fs::write(&config_path, content).unwrap();

    let config = ReconcilerConfig::load_from_path(&config_path).unwrap();

    assert_eq!(config.timeouts(ResourceKind::ParameterGroup).delete_secs, 180);
    assert_eq!(config.wait.min_poll_interval_secs, 5);
    assert_eq!(config.wait.create_delay_secs, 30);
    assert_eq!(config.replication_group, ResourceTimeouts::replication_group());
}

// ---------------------------------------------------------------------------
// 5. Config with unknown / extra fields
// ---------------------------------------------------------------------------

#[test]
fn load_config_with_unknown_fields_ignores_them() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
unknown_top_level_key = "hello"

[retry]
initial_backoff_ms = 250
totally_unknown_field = true
"#;
    fs::write(&config_path, content).unwrap();

    let config = ReconcilerConfig::load_from_path(&config_path)
        .expect("unknown fields should be silently ignored");

    assert_eq!(config.retry.initial_backoff_ms, 250);
}

// ---------------------------------------------------------------------------
// 6. Environment variable expansion
// ---------------------------------------------------------------------------

#[test]
fn load_expands_env_var_defaults() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[wait]
create_delay_secs = ${ELASTICACHE_CORE_TEST_UNSET_DELAY:-45}
"#;
    fs::write(&config_path, content).unwrap();

    let config = ReconcilerConfig::load_from_path(&config_path).unwrap();

    assert_eq!(config.wait.create_delay_secs, 45);
}

// ---------------------------------------------------------------------------
// 7. Cross-field validation
// ---------------------------------------------------------------------------

#[test]
fn load_inverted_backoff_returns_invalid_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[retry]
initial_backoff_ms = 5000
max_backoff_ms = 100
"#;
    fs::write(&config_path, content).unwrap();

    let msg = ReconcilerConfig::load_from_path(&config_path)
        .unwrap_err()
        .to_string();
    assert!(msg.contains("max_backoff_ms"), "error should name the field: {msg}");
}

#[test]
fn load_zero_backoff_returns_invalid_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[retry]
initial_backoff_ms = 0
max_backoff_ms = 0
"#;
    fs::write(&config_path, content).unwrap();

    let msg = ReconcilerConfig::load_from_path(&config_path)
        .unwrap_err()
        .to_string();
    assert!(msg.contains("initial_backoff_ms"), "error should name the field: {msg}");
}

#[test]
fn load_oversized_timeout_returns_invalid_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[replication_group]
create_secs = 9223372036854775807
update_secs = 2400
delete_secs = 2700
"#;
    fs::write(&config_path, content).unwrap();

    let msg = ReconcilerConfig::load_from_path(&config_path)
        .unwrap_err()
        .to_string();
    assert!(
        msg.contains("replication_group.create_secs"),
        "error should name the field: {msg}"
    );
}

#[test]
fn load_oversized_retry_ceiling_returns_invalid_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[retry]\nreplication_group_delete_secs = 99999999999\n").unwrap();

    assert!(ReconcilerConfig::load_from_path(&config_path).is_err());
}

#[test]
fn load_zero_poll_interval_returns_invalid_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[wait]\nmin_poll_interval_secs = 0\n").unwrap();

    assert!(ReconcilerConfig::load_from_path(&config_path).is_err());
}

// ---------------------------------------------------------------------------
// 8. Permission errors (unix only)
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn load_unreadable_file_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# valid toml").unwrap();
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o000)).unwrap();

    let result = ReconcilerConfig::load_from_path(&config_path);
    assert!(result.is_err(), "unreadable file should produce an error");

    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("load") || msg.contains("Load") || msg.contains("Permission"),
        "error should reference loading or permissions: {msg}"
    );

    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn save_to_readonly_directory_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let readonly_dir = dir.path().join("readonly");
    fs::create_dir(&readonly_dir).unwrap();
    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o444)).unwrap();

    let config_path = readonly_dir.join("config.toml");
    let result = ReconcilerConfig::default().save_to_path(&config_path);
    assert!(result.is_err(), "saving to read-only dir should fail");

    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("save") || msg.contains("Save") || msg.contains("Permission"),
        "error should reference saving or permissions: {msg}"
    );

    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o755)).unwrap();
}

// ---------------------------------------------------------------------------
// 9. Roundtrip
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nested").join("config.toml");

    let mut config = ReconcilerConfig::default();
    config.global_replication_group = ResourceTimeouts::from_minutes(90, 90, 30);
    config.wait.not_found_checks = 5;
    config.retry.parameter_reset_secs = 120;

    config.save_to_path(&config_path).unwrap();
    let loaded = ReconcilerConfig::load_from_path(&config_path).unwrap();

    assert_eq!(loaded, config);
}
