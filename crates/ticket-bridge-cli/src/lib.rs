//! # Ticket Bridge CLI
//!
//! Operator tooling for Ticket Bridge:
//! - `sign` computes the `X-Hub-Signature-256` value for a body
//! - `send-test` signs and posts a sample delivery to a running service
//! - `audit` lists the most recent audit records

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use ticket_bridge_core::{
    adapters::SqlAuditStore,
    pipeline::{DELIVERY_HEADER, EVENT_HEADER},
    settings::DEFAULT_DATABASE_URL,
    signature::{self, SIGNATURE_HEADER},
    AuditError, AuditRecord, AuditStore,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

// ============================================================================
// CLI Structure
// ============================================================================

/// Ticket Bridge CLI - tools for the GitHub to Jira webhook bridge
#[derive(Parser, Debug)]
#[command(name = "ticket-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tools for the GitHub to Jira webhook bridge")]
pub struct Cli {
    /// Logging level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the signature header value for a request body
    Sign {
        /// Webhook shared secret
        #[arg(short, long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,

        /// File containing the body (stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Sign and POST a test delivery to a running service
    SendTest {
        /// Webhook endpoint URL
        #[arg(short, long, default_value = "http://127.0.0.1:5000/webhook")]
        url: String,

        /// Webhook shared secret
        #[arg(short, long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,

        /// GitHub event type to claim
        #[arg(short, long, default_value = "pull_request")]
        event: String,

        /// Delivery id header value
        #[arg(short, long)]
        delivery_id: Option<String>,

        /// File containing the body (built-in sample when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List recent audit records
    Audit {
        /// Database connection URL
        #[arg(
            long,
            env = "DATABASE_URL",
            default_value = DEFAULT_DATABASE_URL,
            hide_env_values = true
        )]
        database_url: String,

        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

// ============================================================================
// Errors
// ============================================================================

/// CLI error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Audit store error: {0}")]
    Audit(#[from] AuditError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument { .. } => 2,
            CliError::Io(_) => 3,
            CliError::Request { .. } => 4,
            CliError::Audit(_) => 5,
            CliError::Serialization(_) => 6,
        }
    }
}

// ============================================================================
// Command implementations
// ============================================================================

/// Body sent by `send-test` when no file is given.
pub fn sample_payload() -> serde_json::Value {
    json!({
        "action": "opened",
        "pull_request": { "title": "Test PR" },
        "repository": { "full_name": "myuser/myrepo" }
    })
}

/// Response of a test delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTestOutcome {
    pub status: u16,
    pub body: String,
}

fn require_secret(secret: &str) -> Result<(), CliError> {
    if secret.is_empty() {
        return Err(CliError::InvalidArgument {
            arg: "secret".to_string(),
            message: "webhook secret must not be empty".to_string(),
        });
    }
    Ok(())
}

async fn read_body(file: Option<&PathBuf>) -> Result<Vec<u8>, CliError> {
    match file {
        Some(path) => Ok(tokio::fs::read(path).await?),
        None => {
            let mut body = Vec::new();
            tokio::io::stdin().read_to_end(&mut body).await?;
            Ok(body)
        }
    }
}

/// Sign `body` and POST it to `url` as a GitHub delivery.
pub async fn send_test_delivery(
    url: &str,
    secret: &str,
    event: &str,
    delivery_id: Option<&str>,
    body: Vec<u8>,
) -> Result<SendTestOutcome, CliError> {
    require_secret(secret)?;
    let signature = signature::sign(secret, &body);

    let client = reqwest::Client::new();
    let mut request = client
        .post(url)
        .header(SIGNATURE_HEADER, signature)
        .header(EVENT_HEADER, event)
        .header("Content-Type", "application/json")
        .body(body);
    if let Some(id) = delivery_id {
        request = request.header(DELIVERY_HEADER, id);
    }

    info!(url, event, "Sending test delivery");
    let response = request.send().await.map_err(|e| CliError::Request {
        message: e.to_string(),
    })?;

    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| CliError::Request {
        message: e.to_string(),
    })?;
    debug!(status, "Test delivery answered");

    Ok(SendTestOutcome { status, body })
}

/// Render audit records for display.
///
/// `total` is the number of records in the store, of which `records` are the
/// most recent.
pub fn render_records(
    records: &[AuditRecord],
    total: u64,
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "total": total,
            "records": records,
        }))?),
        OutputFormat::Text => {
            if records.is_empty() && total == 0 {
                return Ok("No audit records".to_string());
            }
            let mut lines: Vec<String> = records
                .iter()
                .map(|r| {
                    let mut line = format!(
                        "#{} {} {} delivery={} {}",
                        r.id, r.created_at, r.source_event, r.delivery_id, r.outcome
                    );
                    if let Some(key) = &r.ticket_key {
                        line.push_str(&format!(" ticket={}", key));
                    }
                    if let Some(reason) = &r.failure_reason {
                        line.push_str(&format!(" reason=\"{}\"", reason));
                    }
                    line
                })
                .collect();
            lines.push(format!("Showing {} of {} audit records", records.len(), total));
            Ok(lines.join("\n"))
        }
    }
}

/// Execute a parsed command and return what it prints.
pub async fn execute(command: Commands) -> Result<String, CliError> {
    match command {
        Commands::Sign { secret, file } => {
            require_secret(&secret)?;
            let body = read_body(file.as_ref()).await?;
            Ok(signature::sign(&secret, &body))
        }
        Commands::SendTest {
            url,
            secret,
            event,
            delivery_id,
            file,
        } => {
            let body = match file {
                Some(path) => tokio::fs::read(&path).await?,
                None => serde_json::to_vec(&sample_payload())?,
            };
            let outcome =
                send_test_delivery(&url, &secret, &event, delivery_id.as_deref(), body).await?;
            Ok(format!(
                "Status: {}\nResponse: {}",
                outcome.status, outcome.body
            ))
        }
        Commands::Audit {
            database_url,
            limit,
            format,
        } => {
            let store = SqlAuditStore::connect_read_only(&database_url).await?;
            let records = store.list_recent(limit).await?;
            let total = store.count().await?;
            store.close().await;
            debug!(shown = records.len(), total, "Listed audit records");
            render_records(&records, total, format)
        }
    }
}

fn initialize_logging(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "ticket_bridge_cli={0},ticket_bridge_core={0}",
            cli.log_level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if cli.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    // Secrets may live in a local .env file.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    initialize_logging(&cli);

    let output = execute(cli.command).await?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
