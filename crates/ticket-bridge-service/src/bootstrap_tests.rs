//! Tests for configuration loading and resolver construction.

use super::*;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn clear_overrides() {
    for key in ["TB__SERVER__PORT", "TB__WEBHOOKS__ENDPOINT_PATH"] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_no_files_yields_defaults() {
    clear_overrides();

    let config = load_service_config(&[], None).unwrap();

    assert_eq!(config.server.port, 5000);
    assert_eq!(config.webhooks.endpoint_path, "/webhook");
}

#[test]
#[serial]
fn test_explicit_file_overrides_defaults() {
    clear_overrides();
    let file = yaml_file(
        "server:\n  port: 8088\nwebhooks:\n  expose_error_details: true\nlogging:\n  json_format: true\n",
    );

    let config = load_service_config(&[], file.path().to_str()).unwrap();

    assert_eq!(config.server.port, 8088);
    assert!(config.webhooks.expose_error_details);
    assert!(config.logging.json_format);
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
#[serial]
fn test_missing_search_path_is_ignored() {
    clear_overrides();

    let config = load_service_config(&["/nonexistent/ticket-bridge/service"], None).unwrap();

    assert_eq!(config.server.port, 5000);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_overrides();

    let result = load_service_config(&[], Some("/nonexistent/ticket-bridge.yaml"));

    assert!(matches!(result, Err(BootstrapError::Load(_))));
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_overrides();
    let file = yaml_file("server:\n  port: 8088\n");
    std::env::set_var("TB__SERVER__PORT", "9090");

    let config = load_service_config(&[], file.path().to_str());
    clear_overrides();

    assert_eq!(config.unwrap().server.port, 9090);
}

#[test]
#[serial]
fn test_invalid_values_fail_validation() {
    clear_overrides();
    let file = yaml_file("webhooks:\n  endpoint_path: \"hooks\"\n");

    let result = load_service_config(&[], file.path().to_str());

    assert!(matches!(result, Err(BootstrapError::Invalid(_))));
}

#[test]
fn test_default_filter_covers_every_crate() {
    let filter = default_filter("debug");

    assert!(filter.contains("ticket_bridge_service=debug"));
    assert!(filter.contains("ticket_bridge_api=debug"));
    assert!(filter.contains("ticket_bridge_core=debug"));
    assert!(filter.contains("tower_http=debug"));
}

#[tokio::test]
async fn test_resolver_without_parameter_store_uses_environment_only() {
    let parameter_store = ParameterStoreConfig {
        enabled: false,
        ..ParameterStoreConfig::default()
    };

    let resolver = build_resolver(&parameter_store).await;

    assert_eq!(resolver.source_names(), vec!["env"]);
}
