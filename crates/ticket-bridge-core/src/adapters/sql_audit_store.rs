//! # SQL Audit Store
//!
//! [`AuditStore`] over sqlx's `Any` driver so one binary can write to a local
//! SQLite file in development and PostgreSQL in production, selected purely
//! by the `DATABASE_URL` scheme.
//!
//! Timestamps are stored as RFC3339 text; the `Any` driver has no portable
//! date-time type.

use crate::{
    audit::{AuditError, AuditRecord, AuditStore, NewAuditRecord},
    ticket::TicketKey,
    Timestamp,
};
use async_trait::async_trait;
use sqlx::{
    any::{AnyPoolOptions, AnyRow},
    AnyPool, Row,
};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Table holding the audit trail.
pub const AUDIT_TABLE: &str = "ticket_audit_log";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const SQLITE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ticket_audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_event TEXT NOT NULL,
    delivery_id TEXT NOT NULL,
    ticket_key TEXT,
    outcome TEXT NOT NULL,
    failure_reason TEXT,
    payload TEXT,
    created_at TEXT NOT NULL
)";

const POSTGRES_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ticket_audit_log (
    id BIGSERIAL PRIMARY KEY,
    source_event TEXT NOT NULL,
    delivery_id TEXT NOT NULL,
    ticket_key TEXT,
    outcome TEXT NOT NULL,
    failure_reason TEXT,
    payload TEXT,
    created_at TEXT NOT NULL
)";

const DELIVERY_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_ticket_audit_log_delivery_id \
    ON ticket_audit_log (delivery_id)";

const INSERT_RECORD: &str = "INSERT INTO ticket_audit_log \
    (source_event, delivery_id, ticket_key, outcome, failure_reason, payload, created_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";

const SELECT_RECENT: &str = "SELECT id, source_event, delivery_id, ticket_key, outcome, \
    failure_reason, payload, created_at FROM ticket_audit_log ORDER BY id DESC LIMIT $1";

const COUNT_RECORDS: &str = "SELECT COUNT(*) FROM ticket_audit_log";

/// Database engines the store knows how to set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBackend {
    Sqlite,
    Postgres,
}

impl SqlBackend {
    /// Detect the backend from a connection URL.
    pub fn from_url(url: &str) -> Result<Self, AuditError> {
        let scheme = url.split_once(':').map(|(s, _)| s).unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(AuditError::Connection {
                message: format!("unsupported database scheme '{}'", other),
            }),
        }
    }

    fn schema(&self) -> &'static str {
        match self {
            Self::Sqlite => SQLITE_SCHEMA,
            Self::Postgres => POSTGRES_SCHEMA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    fn sqlite_mode(self) -> &'static str {
        match self {
            Self::ReadWrite => "rwc",
            Self::ReadOnly => "ro",
        }
    }
}

/// Audit store backed by SQLite or PostgreSQL.
#[derive(Debug, Clone)]
pub struct SqlAuditStore {
    pool: AnyPool,
    backend: SqlBackend,
}

impl SqlAuditStore {
    /// Connect to `database_url` and create the audit table if needed.
    ///
    /// SQLite file databases get their parent directory created and are opened
    /// read-write-create unless the URL already names a `mode`.
    /// `sqlite::memory:` is limited to a single pooled connection so every
    /// query sees the same database.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, AuditError> {
        let store = Self::open(database_url, AccessMode::ReadWrite).await?;
        store.migrate().await?;

        info!(backend = ?store.backend, "Audit store ready");
        Ok(store)
    }

    /// Connect to an existing audit database for reading.
    ///
    /// Nothing is created: SQLite files are opened with `mode=ro`, so a
    /// missing file is a connection error, and no schema is applied.
    #[instrument(skip(database_url))]
    pub async fn connect_read_only(database_url: &str) -> Result<Self, AuditError> {
        let store = Self::open(database_url, AccessMode::ReadOnly).await?;
        debug!(backend = ?store.backend, "Audit store opened read-only");
        Ok(store)
    }

    async fn open(database_url: &str, access: AccessMode) -> Result<Self, AuditError> {
        sqlx::any::install_default_drivers();

        let backend = SqlBackend::from_url(database_url)?;
        let mut url = database_url.to_string();
        let mut max_connections = DEFAULT_MAX_CONNECTIONS;

        if backend == SqlBackend::Sqlite {
            match sqlite_path(database_url) {
                Some(path) => {
                    if access == AccessMode::ReadWrite {
                        ensure_parent_dir(path)?;
                    }
                    if !database_url.contains("mode=") {
                        let separator = if database_url.contains('?') { '&' } else { '?' };
                        url = format!(
                            "{}{}mode={}",
                            database_url,
                            separator,
                            access.sqlite_mode()
                        );
                    }
                }
                None => max_connections = 1,
            }
        }

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .map_err(|e| AuditError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool, backend })
    }

    /// Backend this store writes to.
    pub fn backend(&self) -> SqlBackend {
        self.backend
    }

    async fn migrate(&self) -> Result<(), AuditError> {
        for statement in [self.backend.schema(), DELIVERY_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AuditError::Schema {
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Filesystem path of a SQLite URL, or `None` for in-memory databases.
fn sqlite_path(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" || path.starts_with(":memory:") {
        None
    } else {
        Some(path)
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AuditError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| AuditError::Connection {
                message: format!("{}: {}", parent.display(), e),
            })?;
            debug!(directory = %parent.display(), "Created database directory");
        }
    }
    Ok(())
}

fn record_from_row(row: &AnyRow) -> Result<AuditRecord, AuditError> {
    let read = |e: sqlx::Error| AuditError::Read {
        message: e.to_string(),
    };

    let created_at: String = row.try_get("created_at").map_err(read)?;
    let outcome: String = row.try_get("outcome").map_err(read)?;
    let ticket_key: Option<String> = row.try_get("ticket_key").map_err(read)?;

    Ok(AuditRecord {
        id: row.try_get("id").map_err(read)?,
        source_event: row.try_get("source_event").map_err(read)?,
        delivery_id: row.try_get("delivery_id").map_err(read)?,
        ticket_key: ticket_key.map(TicketKey::new),
        outcome: outcome.parse()?,
        failure_reason: row.try_get("failure_reason").map_err(read)?,
        payload: row.try_get("payload").map_err(read)?,
        created_at: Timestamp::from_rfc3339(&created_at).map_err(|e| AuditError::Read {
            message: e.to_string(),
        })?,
    })
}

#[async_trait]
impl AuditStore for SqlAuditStore {
    #[instrument(
        skip(self, entry),
        fields(delivery_id = %entry.delivery_id, outcome = %entry.outcome)
    )]
    async fn record(&self, entry: NewAuditRecord) -> Result<AuditRecord, AuditError> {
        let write = |e: sqlx::Error| AuditError::Write {
            message: e.to_string(),
        };
        let created_at = Timestamp::now();

        let mut tx = self.pool.begin().await.map_err(write)?;
        let row = sqlx::query(INSERT_RECORD)
            .bind(entry.source_event.clone())
            .bind(entry.delivery_id.clone())
            .bind(entry.ticket_key.as_ref().map(|k| k.as_str().to_string()))
            .bind(entry.outcome.as_str())
            .bind(entry.failure_reason.clone())
            .bind(entry.payload.clone())
            .bind(created_at.to_rfc3339())
            .fetch_one(&mut *tx)
            .await
            .map_err(write)?;
        let id: i64 = row.try_get(0).map_err(write)?;
        tx.commit().await.map_err(write)?;

        debug!(id, "Audit record written");

        Ok(AuditRecord {
            id,
            source_event: entry.source_event,
            delivery_id: entry.delivery_id,
            ticket_key: entry.ticket_key,
            outcome: entry.outcome,
            failure_reason: entry.failure_reason,
            payload: entry.payload,
            created_at,
        })
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        let rows = sqlx::query(SELECT_RECENT)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuditError::Read {
                message: e.to_string(),
            })?;

        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self) -> Result<u64, AuditError> {
        let row = sqlx::query(COUNT_RECORDS)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuditError::Read {
                message: e.to_string(),
            })?;
        let count: i64 = row.try_get(0).map_err(|e| AuditError::Read {
            message: e.to_string(),
        })?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
#[path = "sql_audit_store_tests.rs"]
mod tests;
