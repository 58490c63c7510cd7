//! # In-Memory Audit Store
//!
//! Process-local [`AuditStore`] for tests and local experiments. Records are
//! lost when the process exits.

use crate::{
    audit::{AuditError, AuditRecord, AuditStore, NewAuditRecord},
    Timestamp,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory audit trail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditStore {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, oldest first.
    pub async fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record(&self, entry: NewAuditRecord) -> Result<AuditRecord, AuditError> {
        let mut records = self.records.write().await;
        let record = AuditRecord {
            id: records.len() as i64 + 1,
            source_event: entry.source_event,
            delivery_id: entry.delivery_id,
            ticket_key: entry.ticket_key,
            outcome: entry.outcome,
            failure_reason: entry.failure_reason,
            payload: entry.payload,
            created_at: Timestamp::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn count(&self) -> Result<u64, AuditError> {
        Ok(self.records.read().await.len() as u64)
    }
}
