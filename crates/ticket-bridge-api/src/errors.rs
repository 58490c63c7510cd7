//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ticket_bridge_core::PipelineError;
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// Response bodies are fixed strings GitHub (and anyone replaying deliveries)
/// can match on:
///
/// - `401 Unauthorized`: `{"error":"invalid signature"}`
/// - `400 Bad Request`: `{"error":"invalid JSON"}`
/// - `500 Internal Server Error`: `{"error":"jira_failed"}`, plus a
///   `details` string when detail exposure is enabled
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Signature header missing, malformed or wrong.
    #[error("invalid signature")]
    InvalidSignature,

    /// Authenticated body that does not parse as JSON.
    #[error("invalid JSON")]
    InvalidJson { message: String },

    /// No ticket was created, or it was created but could not be logged.
    #[error("jira_failed")]
    TicketFailed {
        message: String,
        expose_details: bool,
    },
}

impl WebhookHandlerError {
    /// Map a pipeline failure, choosing whether the 500 body carries details.
    pub fn from_pipeline(error: PipelineError, expose_details: bool) -> Self {
        match error {
            PipelineError::InvalidSignature => Self::InvalidSignature,
            PipelineError::MalformedPayload(e) => Self::InvalidJson {
                message: e.to_string(),
            },
            e @ (PipelineError::TicketCreation(_) | PipelineError::Persistence { .. }) => {
                Self::TicketFailed {
                    message: e.to_string(),
                    expose_details,
                }
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::InvalidJson { .. } => StatusCode::BAD_REQUEST,
            Self::TicketFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::InvalidSignature => {
                warn!("Rejecting webhook: invalid signature");
                serde_json::json!({ "error": self.to_string() })
            }
            Self::InvalidJson { message } => {
                warn!(error = %message, "Rejecting webhook: invalid JSON");
                serde_json::json!({ "error": self.to_string() })
            }
            Self::TicketFailed {
                message,
                expose_details,
            } => {
                error!(error = %message, "Webhook processing failed");
                if *expose_details {
                    serde_json::json!({ "error": self.to_string(), "details": message })
                } else {
                    serde_json::json!({ "error": self.to_string() })
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}
