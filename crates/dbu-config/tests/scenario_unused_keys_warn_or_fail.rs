//! Unused-key report.
//!
//! Validates:
//! 1) Unknown top-level and provider keys are reported in WARN mode.
//! 2) FAIL mode errors on the same input.
//! 3) Everything under `/users` counts as consumed.

use dbu_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const YAML: &str = r#"
provider:
  base_url: "https://api.example.test/v2"
  retries: 3
users:
  app:
    database_id: db1
    username: app
    access_control:
      - acl_keys: ["app:*"]
monitoring:
  enabled: true
"#;

#[test]
fn warn_mode_reports_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/monitoring/enabled".to_string(),
            "/provider/retries".to_string()
        ]
    );
}

#[test]
fn fail_mode_errors() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn fully_consumed_config_is_clean() {
    let yaml = r#"
provider:
  base_url: "https://api.example.test/v2"
  api_key_env: VULTR_API_KEY
  request_timeout_secs: 20
users:
  app:
    database_id: db1
    username: app
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
