#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use mmcall_core::error::MmError;
use mmcall_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8080"
  discovry: false # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, MmError::Config(_)), "{err:?}");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.api_prefix, "/api");
    assert!(cfg.server.discovery);
    assert_eq!(cfg.codec.limit_bytes, 102400);
    assert!(cfg.auth.is_empty());
    assert!(!cfg.validate_responses());
}

#[test]
fn response_validation_follows_debug_unless_set() {
    let cfg = config::load_from_str("version: 1\nserver:\n  debug: true\n").unwrap();
    assert!(cfg.validate_responses());

    let cfg = config::load_from_str(
        "version: 1\nserver:\n  debug: true\npolicy:\n  validate_responses: false\n",
    )
    .unwrap();
    assert!(!cfg.validate_responses());
}

#[test]
fn rejects_unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(err.to_string().contains("unsupported config version"), "{err}");
}

#[test]
fn rejects_idle_timeout_below_ping_interval() {
    let bad = r#"
version: 1
server:
  ping_interval_ms: 30000
  idle_timeout_ms: 20000
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn rejects_inverted_throttle_bounds() {
    let bad = r#"
version: 1
server:
  throttle_response: { min_ms: 50, max_ms: 10 }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn auth_provider_settings_are_checked() {
    let bad_alg = r#"
version: 1
auth:
  user:
    token: { key: "k", algorithm: "RS256" }
"#;
    assert!(config::load_from_str(bad_alg).is_err());

    let empty_key = r#"
version: 1
auth:
  user:
    token: { key: "" }
"#;
    assert!(config::load_from_str(empty_key).is_err());

    let inactive_empty_key = r#"
version: 1
auth:
  user:
    active: false
    token: { key: "" }
"#;
    assert!(config::load_from_str(inactive_empty_key).is_ok());

    let endless = r#"
version: 1
auth:
  user:
    token: { key: "k", expires_in_secs: 18446744073709551615 }
"#;
    let err = config::load_from_str(endless).expect_err("must fail");
    assert!(err.to_string().contains("expires_in_secs"), "{err}");

    let zero = r#"
version: 1
auth:
  user:
    token: { key: "k", expires_in_secs: 0 }
"#;
    assert!(config::load_from_str(zero).is_err());

    let bad_cost = r#"
version: 1
auth:
  user:
    token: { key: "k" }
    hash: 3
"#;
    assert!(config::load_from_str(bad_cost).is_err());
}

#[test]
fn shipped_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../mmcall.yaml");
    let cfg = config::load_from_file(path).expect("shipped config must load");
    assert!(cfg.auth.contains_key("user"));
}
