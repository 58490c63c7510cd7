//! Shared fixtures for Ticket Bridge integration tests
//!
//! Every test gets:
//! - a wiremock server standing in for Jira Cloud
//! - a SQLite audit database in its own temporary directory
//! - a router wired with the real Jira client and the real SQL audit store

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use ticket_bridge_api::{create_router, AppState, ServiceConfig};
use ticket_bridge_core::{
    adapters::SqlAuditStore, signature, ticket::JiraTicketClient, AuditRecord, AuditStore,
    BridgeSettings, JiraSettings, SecretValue, TicketPipeline,
};
use tower::ServiceExt;
use wiremock::MockServer;

pub const WEBHOOK_SECRET: &str = "integration-secret";
pub const PROJECT_KEY: &str = "ENG";

/// A fully wired bridge with its fake Jira and audit database.
#[allow(dead_code)]
pub struct TestBridge {
    pub jira: MockServer,
    pub audit: Arc<SqlAuditStore>,
    pub state: AppState,
    pub router: Router,
    _db_dir: TempDir,
}

#[allow(dead_code)]
impl TestBridge {
    pub async fn start() -> Self {
        Self::start_with(ServiceConfig::default()).await
    }

    pub async fn start_with(config: ServiceConfig) -> Self {
        let jira = MockServer::start().await;
        let db_dir = tempfile::tempdir().expect("temp dir");
        let database_url = format!("sqlite://{}", db_dir.path().join("audit.db").display());

        let settings = Arc::new(BridgeSettings {
            webhook_secret: SecretValue::from(WEBHOOK_SECRET),
            jira: JiraSettings {
                base_url: jira.uri(),
                email: "bot@acme.test".to_string(),
                api_token: SecretValue::from("jira-token"),
                project_key: PROJECT_KEY.to_string(),
            },
            database_url: database_url.clone(),
        });

        let audit = Arc::new(
            SqlAuditStore::connect(&database_url)
                .await
                .expect("audit store"),
        );
        let client = JiraTicketClient::new(settings.jira.clone()).expect("jira client");
        let pipeline = TicketPipeline::new(settings, Arc::new(client), audit.clone());
        let state = AppState::new(config, pipeline);
        let router = create_router(state.clone());

        Self {
            jira,
            audit,
            state,
            router,
            _db_dir: db_dir,
        }
    }

    /// POST a delivery signed with the shared secret.
    pub async fn deliver(&self, event: &str, delivery_id: &str, body: &Value) -> Response<Body> {
        let bytes = serde_json::to_vec(body).expect("serialize");
        let signature = signature::sign(WEBHOOK_SECRET, &bytes);
        self.send(event, delivery_id, &signature, bytes).await
    }

    /// POST a delivery with an explicit signature header value.
    pub async fn send(
        &self,
        event: &str,
        delivery_id: &str,
        signature: &str,
        body: Vec<u8>,
    ) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("Content-Type", "application/json")
            .header("X-GitHub-Event", event)
            .header("X-GitHub-Delivery", delivery_id)
            .header("X-Hub-Signature-256", signature)
            .body(Body::from(body))
            .expect("request");

        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn audit_rows(&self) -> Vec<AuditRecord> {
        self.audit.list_recent(100).await.expect("list audit rows")
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[allow(dead_code)]
pub fn pull_request_payload(title: &str) -> Value {
    serde_json::json!({
        "action": "opened",
        "pull_request": { "title": title },
        "repository": { "full_name": "acme/widgets" }
    })
}

#[allow(dead_code)]
pub fn issue_payload(title: &str) -> Value {
    serde_json::json!({
        "action": "reopened",
        "issue": { "title": title },
        "repository": { "full_name": "acme/widgets" }
    })
}
