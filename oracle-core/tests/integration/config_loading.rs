use oracle_core::infrastructure::config::{load_config_from_file, resolve_config_path, CONFIG_FILE_NAME};
use std::time::Duration;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[service]
private_keys = ["cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy"]
rsa_key_bits = 2048

[bitcoind]
rpc_url = "http://127.0.0.1:18332"
rpc_user = "oracle"
rpc_password = "secret"

[bitmessage]
api_url = "http://127.0.0.1:8442"
api_user = "bm"
api_password = "bm-secret"
default_address_label = "orisi-oracle"

[price_feed]
url = "https://example.invalid/ticker"
timeout_secs = 3

[runtime]
scheduler_interval_secs = 2
inbox_poll_secs = 4
task_workers = 8
external_call_timeout_secs = 20
pricecheck_retry_interval_secs = 120
pricecheck_max_retries = 3
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn test_config_when_full_toml_given_then_every_section_overrides_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, FULL_CONFIG);

    let config = load_config_from_file(&path, dir.path()).expect("config");
    assert_eq!(config.service.rsa_key_bits, 2048);
    assert_eq!(config.service.private_keys.len(), 1);
    assert_eq!(config.bitcoind.rpc_user.as_deref(), Some("oracle"));
    assert_eq!(config.bitmessage.default_address_label.as_deref(), Some("orisi-oracle"));
    assert_eq!(config.price_feed.timeout_secs, 3);
    assert_eq!(config.runtime.task_workers, 8);
    // per-collaborator timeouts inherit the shared call timeout
    assert_eq!(config.bitcoind.timeout_secs, 20);
    assert_eq!(config.bitmessage.timeout_secs, 20);
    assert!(config.validate().is_ok());

    let policy = config.engine_policy();
    assert_eq!(policy.pricecheck_retry_interval_secs, 120);
    assert_eq!(policy.pricecheck_max_retries, 3);
    assert_eq!(policy.external_call_timeout, Duration::from_secs(20));
    assert_eq!(policy.rsa_key_bits, 2048);
}

#[test]
fn test_config_when_values_out_of_range_then_validation_lists_every_problem() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
        [service]
        rsa_key_bits = 512
        private_keys = [" "]

        [bitcoind]
        rpc_url = "127.0.0.1:8332"

        [runtime]
        task_workers = 1000
        "#,
    );

    let config = load_config_from_file(&path, dir.path()).expect("config");
    let errors = config.validate().expect_err("invalid config");
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("rsa_key_bits")));
    assert!(errors.iter().any(|e| e.contains("private_keys")));
    assert!(errors.iter().any(|e| e.contains("bitcoind.rpc_url")));
    assert!(errors.iter().any(|e| e.contains("task_workers")));
}

#[test]
fn test_config_when_toml_is_broken_then_load_fails() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[runtime\ntask_workers = ");
    assert!(load_config_from_file(&path, dir.path()).is_err());
}

#[test]
fn test_config_when_no_override_then_path_is_inside_data_dir() {
    let dir = TempDir::new().expect("tempdir");
    if std::env::var(oracle_core::foundation::ORACLE_CONFIG_PATH_ENV).is_ok() {
        return;
    }
    assert_eq!(resolve_config_path(dir.path()).expect("path"), dir.path().join(CONFIG_FILE_NAME));
}
