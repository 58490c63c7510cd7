//! # Audit Trail
//!
//! Append-only record of every ticket-creation attempt: which GitHub event
//! triggered it, the delivery that carried it, and either the ticket that was
//! created or the reason creation failed.
//!
//! Records are never updated or deleted. Replaying a delivery appends a second
//! row; the trail is a history, not a deduplicated index.

use crate::{ticket::TicketKey, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Result of one ticket-creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Created,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditOutcome {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "failed" => Ok(Self::Failed),
            other => Err(AuditError::Read {
                message: format!("unknown audit outcome '{}'", other),
            }),
        }
    }
}

/// Audit entry before it has been assigned an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditRecord {
    pub source_event: String,
    pub delivery_id: String,
    pub ticket_key: Option<TicketKey>,
    pub outcome: AuditOutcome,
    pub failure_reason: Option<String>,
    /// Ticket description snapshot, kept only when payload snapshots are enabled.
    pub payload: Option<String>,
}

impl NewAuditRecord {
    /// Entry for a ticket that was created.
    pub fn created(
        source_event: impl Into<String>,
        delivery_id: impl Into<String>,
        ticket_key: TicketKey,
    ) -> Self {
        Self {
            source_event: source_event.into(),
            delivery_id: delivery_id.into(),
            ticket_key: Some(ticket_key),
            outcome: AuditOutcome::Created,
            failure_reason: None,
            payload: None,
        }
    }

    /// Entry for an attempt that did not produce a ticket.
    pub fn failed(
        source_event: impl Into<String>,
        delivery_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_event: source_event.into(),
            delivery_id: delivery_id.into(),
            ticket_key: None,
            outcome: AuditOutcome::Failed,
            failure_reason: Some(reason.into()),
            payload: None,
        }
    }

    /// Attach a payload snapshot.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// Persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub source_event: String,
    pub delivery_id: String,
    pub ticket_key: Option<TicketKey>,
    pub outcome: AuditOutcome,
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    pub created_at: Timestamp,
}

/// Errors raised by audit storage.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit store connection failed: {message}")]
    Connection { message: String },

    #[error("Audit schema setup failed: {message}")]
    Schema { message: String },

    #[error("Audit write failed: {message}")]
    Write { message: String },

    #[error("Audit read failed: {message}")]
    Read { message: String },
}

/// Interface for the append-only audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one record and return it with its assigned id and timestamp.
    ///
    /// The write is durable once this returns `Ok`.
    async fn record(&self, entry: NewAuditRecord) -> Result<AuditRecord, AuditError>;

    /// Most recent records first, at most `limit` of them.
    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError>;

    /// Total number of records.
    async fn count(&self) -> Result<u64, AuditError>;

    /// Cheap liveness check used by readiness checks.
    async fn ping(&self) -> Result<(), AuditError> {
        self.count().await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
