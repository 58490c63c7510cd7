//! # Ticket Bridge Service
//!
//! Binary entry point for the Ticket Bridge HTTP service.
//!
//! This executable:
//! - Loads a `.env` file when present (development)
//! - Loads service configuration from files and `TB__` environment overrides
//! - Resolves secrets from the SSM Parameter Store, falling back to the environment
//! - Connects the audit store and the Jira client
//! - Starts the HTTP server from ticket-bridge-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 configuration error or
//! unusable Jira client, 4 audit store unavailable.

mod bootstrap;

use std::sync::Arc;
use ticket_bridge_api::{start_server, AppState, LoggingConfig, ServiceError};
use ticket_bridge_core::{
    adapters::SqlAuditStore, ticket::JiraTicketClient, BridgeSettings, TicketPipeline,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let dotenv_path = dotenvy::dotenv().ok();

    let explicit_path = std::env::var(bootstrap::CONFIG_FILE_ENV).ok();
    let loaded =
        bootstrap::load_service_config(bootstrap::DEFAULT_CONFIG_PATHS, explicit_path.as_deref());
    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            bootstrap::init_tracing(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    bootstrap::init_tracing(&service_config.logging);

    info!("Starting Ticket Bridge Service");
    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "Loaded environment from .env file");
    }
    if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    // -------------------------------------------------------------------------
    // Resolve secrets and connection settings
    // -------------------------------------------------------------------------
    let resolver = bootstrap::build_resolver(&service_config.parameter_store).await;
    let settings = Arc::new(BridgeSettings::resolve(&resolver).await);

    if !settings.jira_configured() {
        warn!("Jira settings incomplete; ticket creation will fail until they are provided");
    }

    let audit_store = match SqlAuditStore::connect(&settings.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!(
                error = %e,
                backend = settings.database_backend(),
                "Audit store unavailable; aborting"
            );
            std::process::exit(4);
        }
    };

    let ticket_client = match JiraTicketClient::new(settings.jira.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create Jira client; aborting");
            std::process::exit(3);
        }
    };

    let pipeline = TicketPipeline::new(settings, Arc::new(ticket_client), Arc::new(audit_store))
        .with_payload_snapshot(service_config.webhooks.store_payload_snapshot);

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(AppState::new(service_config, pipeline)).await {
        error!("Server stopped with error: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
        };

        std::process::exit(exit_code);
    }
}
