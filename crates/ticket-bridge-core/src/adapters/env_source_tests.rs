//! Tests for [`EnvironmentSource`].
//!
//! These mutate process environment variables, so they run serially and use
//! variable names no other test touches.

use super::*;
use serial_test::serial;

fn set(name: &str, value: &str) {
    std::env::set_var(name, value);
}

fn clear(name: &str) {
    std::env::remove_var(name);
}

#[tokio::test]
#[serial]
async fn test_reads_variable_of_same_name() {
    set("TB_TEST_ENV_PRESENT", "value-1");

    let source = EnvironmentSource::new();
    let value = source.fetch("TB_TEST_ENV_PRESENT", false).await.unwrap();

    assert_eq!(value.unwrap().expose_secret(), "value-1");
    clear("TB_TEST_ENV_PRESENT");
}

#[tokio::test]
#[serial]
async fn test_missing_variable_is_none() {
    clear("TB_TEST_ENV_MISSING");

    let source = EnvironmentSource::new();
    let value = source.fetch("TB_TEST_ENV_MISSING", true).await.unwrap();

    assert!(value.is_none());
}

#[tokio::test]
#[serial]
async fn test_empty_variable_is_none() {
    set("TB_TEST_ENV_EMPTY", "");

    let source = EnvironmentSource::new();
    let value = source.fetch("TB_TEST_ENV_EMPTY", false).await.unwrap();

    assert!(value.is_none());
    clear("TB_TEST_ENV_EMPTY");
}

#[tokio::test]
#[serial]
async fn test_alias_used_when_primary_unset() {
    clear("TB_TEST_PRIMARY");
    set("TB_TEST_LEGACY", "https://legacy.example");

    let source = EnvironmentSource::new().with_alias("TB_TEST_PRIMARY", "TB_TEST_LEGACY");
    let value = source.fetch("TB_TEST_PRIMARY", false).await.unwrap();

    assert_eq!(value.unwrap().expose_secret(), "https://legacy.example");
    clear("TB_TEST_LEGACY");
}

#[tokio::test]
#[serial]
async fn test_primary_wins_over_alias() {
    set("TB_TEST_PRIMARY_2", "primary");
    set("TB_TEST_LEGACY_2", "legacy");

    let source = EnvironmentSource::new().with_alias("TB_TEST_PRIMARY_2", "TB_TEST_LEGACY_2");
    let value = source.fetch("TB_TEST_PRIMARY_2", false).await.unwrap();

    assert_eq!(value.unwrap().expose_secret(), "primary");
    clear("TB_TEST_PRIMARY_2");
    clear("TB_TEST_LEGACY_2");
}

#[test]
fn test_standard_aliases_map_jira_url_to_legacy_name() {
    let source = EnvironmentSource::with_standard_aliases();
    assert_eq!(
        source.aliases.get(keys::JIRA_URL),
        Some(&vec![keys::JIRA_BASE_URL.to_string()])
    );
}
