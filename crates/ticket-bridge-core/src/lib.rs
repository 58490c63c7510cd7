//! # Ticket Bridge Core
//!
//! Core business logic for the Ticket Bridge webhook-to-ticket service.
//!
//! This crate contains the domain logic for authenticating GitHub webhook
//! deliveries, summarising `issues` and `pull_request` events, creating Jira
//! tickets for them and recording an append-only audit trail of every attempt.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions ([`ticket::TicketClient`],
//!   [`audit::AuditStore`], [`settings::ValueSource`])
//! - Infrastructure implementations live in [`adapters`] and are injected at runtime
//! - The [`pipeline::TicketPipeline`] wires the pieces into one request flow
//!
//! ## Usage
//!
//! ```rust
//! use ticket_bridge_core::{signature, summary, EventKind};
//!
//! let header = signature::sign("secret", b"{}");
//! assert!(signature::verify("secret", b"{}", &header));
//!
//! let payload = serde_json::json!({});
//! let text = summary::summarize(&EventKind::parse("deployment"), &payload);
//! assert_eq!(text, "[GitHub] Event: deployment");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod adapters;
pub mod audit;
pub mod pipeline;
pub mod settings;
pub mod signature;
pub mod summary;
pub mod ticket;

pub use audit::{AuditError, AuditOutcome, AuditRecord, AuditStore, NewAuditRecord};
pub use pipeline::{PipelineError, PipelineOutcome, TicketPipeline, WebhookDelivery};
pub use settings::{BridgeSettings, JiraSettings, SecretResolver, SecretValue, ValueSource};
pub use ticket::{TicketClient, TicketError, TicketKey, TicketRequest};

// ============================================================================
// Event Classification
// ============================================================================

/// GitHub event kind taken from the `X-GitHub-Event` header.
///
/// Only `issues` and `pull_request` are translated into tickets; every other
/// value is carried verbatim so it can be echoed back as an ignored event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Issues,
    PullRequest,
    Other(String),
}

impl EventKind {
    /// Classify a raw event header value.
    pub fn parse(value: &str) -> Self {
        match value {
            "issues" => Self::Issues,
            "pull_request" => Self::PullRequest,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name of the event, exactly as GitHub sends it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Issues => "issues",
            Self::PullRequest => "pull_request",
            Self::Other(name) => name,
        }
    }

    /// Whether this event kind results in a ticket.
    pub fn is_ticketable(&self) -> bool {
        matches!(self, Self::Issues | Self::PullRequest)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

// ============================================================================
// Time
// ============================================================================

/// UTC timestamp used for audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_rfc3339(s)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
