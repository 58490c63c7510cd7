//! Response types for the API.

use serde::Serialize;
use ticket_bridge_core::PipelineOutcome;

/// Webhook processing response
///
/// Serialises as `{"ok":true,"jira_ticket":"ENG-1"}` or
/// `{"ok":true,"ignored_event":"push"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira_ticket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_event: Option<String>,
}

impl From<PipelineOutcome> for WebhookResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Ticketed { ticket_key } => Self {
                ok: true,
                jira_ticket: Some(ticket_key.into_inner()),
                ignored_event: None,
            },
            PipelineOutcome::Ignored { event_type } => Self {
                ok: true,
                jira_ticket: None,
                ignored_event: Some(event_type),
            },
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
}
