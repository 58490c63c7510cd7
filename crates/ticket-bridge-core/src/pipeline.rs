//! # Ticket Pipeline
//!
//! Turns one authenticated GitHub delivery into at most one Jira ticket and
//! one audit record.
//!
//! ```text
//! RECEIVED -> VERIFIED -> PARSED -> IGNORED
//!                                -> TICKETED -> LOGGED
//!                                -> TICKET_FAILED
//! ```
//!
//! Each delivery is processed independently. Nothing is retried and nothing
//! is deduplicated: a redelivered event produces a second ticket and a second
//! audit row.

use crate::{
    audit::{AuditError, AuditStore, NewAuditRecord},
    settings::BridgeSettings,
    signature, summary,
    ticket::{TicketClient, TicketError, TicketKey, TicketRequest},
    EventKind,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Header naming the GitHub event type.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying GitHub's per-delivery identifier.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Event type recorded when the event header is missing.
pub const UNKNOWN_EVENT: &str = "unknown";

/// Delivery id recorded when the delivery header is missing.
pub const UNKNOWN_DELIVERY_ID: &str = "n/a";

// ============================================================================
// Core Types
// ============================================================================

/// One inbound webhook request, reduced to what the pipeline needs.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub event: EventKind,
    pub delivery_id: String,
    pub signature: String,
    pub body: Bytes,
}

impl WebhookDelivery {
    /// Build a delivery from optional header values.
    ///
    /// Missing headers take their defaults: event `unknown`, delivery id
    /// `n/a`, empty signature (which never verifies).
    pub fn new(
        event_type: Option<&str>,
        delivery_id: Option<&str>,
        signature: Option<&str>,
        body: Bytes,
    ) -> Self {
        Self {
            event: EventKind::parse(event_type.unwrap_or(UNKNOWN_EVENT)),
            delivery_id: delivery_id.unwrap_or(UNKNOWN_DELIVERY_ID).to_string(),
            signature: signature.unwrap_or_default().to_string(),
            body,
        }
    }
}

/// Successful pipeline results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// A ticket was created and its audit record committed.
    Ticketed { ticket_key: TicketKey },
    /// The event type is not one that produces tickets.
    Ignored { event_type: String },
}

/// Reasons a delivery did not end in a logged ticket.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Webhook body is not valid JSON: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("Ticket creation failed: {0}")]
    TicketCreation(#[from] TicketError),

    #[error("Ticket {ticket_key} created but audit write failed: {source}")]
    Persistence {
        ticket_key: TicketKey,
        #[source]
        source: AuditError,
    },
}

impl PipelineError {
    /// True when the sender is at fault (bad signature or body).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidSignature | PipelineError::MalformedPayload(_)
        )
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Orchestrates verification, summarisation, ticket creation and auditing.
#[derive(Clone)]
pub struct TicketPipeline {
    settings: Arc<BridgeSettings>,
    tickets: Arc<dyn TicketClient>,
    audit: Arc<dyn AuditStore>,
    store_payload_snapshot: bool,
}

impl TicketPipeline {
    pub fn new(
        settings: Arc<BridgeSettings>,
        tickets: Arc<dyn TicketClient>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            settings,
            tickets,
            audit,
            store_payload_snapshot: true,
        }
    }

    /// Whether audit records carry the ticket description as a payload snapshot.
    pub fn with_payload_snapshot(mut self, enabled: bool) -> Self {
        self.store_payload_snapshot = enabled;
        self
    }

    /// Audit store the pipeline writes to.
    pub fn audit_store(&self) -> &Arc<dyn AuditStore> {
        &self.audit
    }

    /// Process one delivery end to end.
    ///
    /// # Errors
    /// - `PipelineError::InvalidSignature` - signature missing or wrong
    /// - `PipelineError::MalformedPayload` - body is not JSON
    /// - `PipelineError::TicketCreation` - Jira call failed; a `failed` audit
    ///   record is attempted
    /// - `PipelineError::Persistence` - ticket exists but its audit record
    ///   could not be written
    #[instrument(
        skip(self, delivery),
        fields(
            event_type = %delivery.event,
            delivery_id = %delivery.delivery_id,
            body_bytes = delivery.body.len()
        )
    )]
    pub async fn process(
        &self,
        delivery: &WebhookDelivery,
    ) -> Result<PipelineOutcome, PipelineError> {
        if !signature::verify(
            self.settings.webhook_secret.expose_secret(),
            &delivery.body,
            &delivery.signature,
        ) {
            warn!("Rejected delivery with invalid signature");
            return Err(PipelineError::InvalidSignature);
        }

        let payload: serde_json::Value =
            serde_json::from_slice(&delivery.body).map_err(PipelineError::MalformedPayload)?;

        info!("Received GitHub event");

        if !delivery.event.is_ticketable() {
            info!("Ignoring event type");
            return Ok(PipelineOutcome::Ignored {
                event_type: delivery.event.as_str().to_string(),
            });
        }

        let request = TicketRequest::new(
            summary::summarize(&delivery.event, &payload),
            summary::describe(&payload),
        );

        let ticket_key = match self.tickets.create_ticket(&request).await {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "Failed to create Jira ticket");
                let entry = self.snapshot(
                    NewAuditRecord::failed(
                        delivery.event.as_str(),
                        &delivery.delivery_id,
                        e.to_string(),
                    ),
                    &request,
                );
                if let Err(audit_error) = self.audit.record(entry).await {
                    error!(error = %audit_error, "Failed to audit failed ticket attempt");
                }
                return Err(PipelineError::TicketCreation(e));
            }
        };

        info!(ticket_key = %ticket_key, "Created Jira ticket");

        let entry = self.snapshot(
            NewAuditRecord::created(
                delivery.event.as_str(),
                &delivery.delivery_id,
                ticket_key.clone(),
            ),
            &request,
        );
        match self.audit.record(entry).await {
            Ok(record) => {
                info!(audit_id = record.id, ticket_key = %ticket_key, "Logged ticket");
                Ok(PipelineOutcome::Ticketed { ticket_key })
            }
            Err(source) => {
                error!(ticket_key = %ticket_key, error = %source, "Failed to log created ticket");
                Err(PipelineError::Persistence { ticket_key, source })
            }
        }
    }

    fn snapshot(&self, entry: NewAuditRecord, request: &TicketRequest) -> NewAuditRecord {
        if self.store_payload_snapshot {
            entry.with_payload(request.description.clone())
        } else {
            entry
        }
    }
}

impl std::fmt::Debug for TicketPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketPipeline")
            .field("settings", &self.settings)
            .field("store_payload_snapshot", &self.store_payload_snapshot)
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
