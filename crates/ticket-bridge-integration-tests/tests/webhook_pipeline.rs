//! End-to-end webhook tests: signed delivery in, Jira issue out, audit row
//! written.

mod common;

use axum::http::StatusCode;
use common::{issue_payload, json_body, pull_request_payload, TestBridge, PROJECT_KEY};
use serde_json::json;
use ticket_bridge_api::ServiceConfig;
use ticket_bridge_core::AuditOutcome;
use wiremock::{
    matchers::{body_partial_json, header_exists, method, path},
    Mock, ResponseTemplate,
};

async fn jira_creates(bridge: &TestBridge, key: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .and(header_exists("Authorization"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "10001", "key": key })),
        )
        .expect(expected_calls)
        .mount(&bridge.jira)
        .await;
}

/// A signed pull request delivery creates one issue and one audit row.
#[tokio::test]
async fn test_pull_request_creates_ticket_and_audit_row() {
    let bridge = TestBridge::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .and(body_partial_json(json!({
            "fields": {
                "project": { "key": PROJECT_KEY },
                "summary": "[GitHub] PR opened: Add caching (acme/widgets)",
                "issuetype": { "name": "Task" }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "key": "ENG-9" })))
        .expect(1)
        .mount(&bridge.jira)
        .await;

    let response = bridge
        .deliver("pull_request", "delivery-1", &pull_request_payload("Add caching"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "ok": true, "jira_ticket": "ENG-9" })
    );

    let rows = bridge.audit_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source_event, "pull_request");
    assert_eq!(rows[0].delivery_id, "delivery-1");
    assert_eq!(rows[0].outcome, AuditOutcome::Created);
    assert_eq!(rows[0].ticket_key.as_ref().map(|k| k.as_str()), Some("ENG-9"));
    assert!(rows[0]
        .payload
        .as_deref()
        .is_some_and(|p| p.contains("Add caching")));
}

/// Issue events are ticketed the same way.
#[tokio::test]
async fn test_issue_event_creates_ticket() {
    let bridge = TestBridge::start().await;
    jira_creates(&bridge, "ENG-21", 1).await;

    let response = bridge
        .deliver("issues", "delivery-2", &issue_payload("Crash on start"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["jira_ticket"], "ENG-21");
}

/// A bad signature is rejected before Jira or the audit log are touched.
#[tokio::test]
async fn test_invalid_signature_is_rejected_without_side_effects() {
    let bridge = TestBridge::start().await;
    jira_creates(&bridge, "ENG-1", 0).await;

    let body = serde_json::to_vec(&pull_request_payload("Sneaky")).unwrap();
    let response = bridge
        .send("pull_request", "delivery-3", "sha256=deadbeef", body)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "invalid signature" })
    );
    assert!(bridge.audit_rows().await.is_empty());
}

/// A body signed correctly but not JSON is a client error.
#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let bridge = TestBridge::start().await;
    jira_creates(&bridge, "ENG-1", 0).await;

    let body = b"{not json".to_vec();
    let signature = ticket_bridge_core::signature::sign(common::WEBHOOK_SECRET, &body);
    let response = bridge
        .send("pull_request", "delivery-4", &signature, body)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "invalid JSON" }));
    assert!(bridge.audit_rows().await.is_empty());
}

/// Events other than issues and pull requests are acknowledged and ignored.
#[tokio::test]
async fn test_unsupported_event_is_ignored() {
    let bridge = TestBridge::start().await;
    jira_creates(&bridge, "ENG-1", 0).await;

    let response = bridge
        .deliver("push", "delivery-5", &json!({ "ref": "refs/heads/main" }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "ok": true, "ignored_event": "push" })
    );
    assert!(bridge.audit_rows().await.is_empty());
}

/// A Jira failure yields 500 without details and a failed audit row.
#[tokio::test]
async fn test_jira_failure_is_audited() {
    let bridge = TestBridge::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&bridge.jira)
        .await;

    let response = bridge
        .deliver("pull_request", "delivery-6", &pull_request_payload("Boom"))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "jira_failed");
    assert!(body.get("details").is_none());

    let rows = bridge.audit_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].outcome, AuditOutcome::Failed);
    assert!(rows[0].ticket_key.is_none());
    assert!(rows[0].failure_reason.is_some());
}

/// With detail exposure enabled the 500 carries the upstream error.
#[tokio::test]
async fn test_jira_failure_details_when_exposed() {
    let mut config = ServiceConfig::default();
    config.webhooks.expose_error_details = true;
    let bridge = TestBridge::start_with(config).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&bridge.jira)
        .await;

    let response = bridge
        .deliver("issues", "delivery-7", &issue_payload("Outage"))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "jira_failed");
    assert!(body["details"].as_str().is_some_and(|d| d.contains("503")));
}

/// Replaying a delivery is not deduplicated.
#[tokio::test]
async fn test_replayed_delivery_creates_two_tickets() {
    let bridge = TestBridge::start().await;
    jira_creates(&bridge, "ENG-30", 2).await;
    let payload = pull_request_payload("Replay me");

    for _ in 0..2 {
        let response = bridge.deliver("pull_request", "same-id", &payload).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let rows = bridge.audit_rows().await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.delivery_id == "same-id"));
    assert!(rows[0].id > rows[1].id);
}

/// Deliveries without event or delivery headers still verify and are ignored.
#[tokio::test]
async fn test_missing_event_header_is_ignored_as_unknown() {
    let bridge = TestBridge::start().await;
    let body = serde_json::to_vec(&json!({})).unwrap();
    let signature = ticket_bridge_core::signature::sign(common::WEBHOOK_SECRET, &body);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("X-Hub-Signature-256", signature)
        .body(axum::body::Body::from(body))
        .unwrap();
    let response = tower::ServiceExt::oneshot(bridge.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ignored_event"], "unknown");
}
