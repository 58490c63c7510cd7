//! # Ticket Bridge HTTP Service
//!
//! HTTP server for receiving GitHub webhooks and turning them into Jira
//! tickets through the Ticket Bridge pipeline.
//!
//! This service provides:
//! - GitHub webhook endpoint with signature validation
//! - Liveness (`GET /`) and readiness (`GET /ready`) endpoints

pub mod config;
pub mod errors;
pub mod responses;

pub use config::{LoggingConfig, ParameterStoreConfig, ServerConfig, ServiceConfig, WebhookConfig};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use responses::{HealthResponse, ReadinessResponse, WebhookResponse};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use std::{future::Future, future::IntoFuture, sync::Arc, time::Duration};
use ticket_bridge_core::{
    pipeline::{DELIVERY_HEADER, EVENT_HEADER},
    signature::SIGNATURE_HEADER,
    TicketPipeline, WebhookDelivery,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn, Instrument};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Pipeline turning deliveries into tickets
    pub pipeline: Arc<TicketPipeline>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServiceConfig, pipeline: TicketPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }
}

// ============================================================================
// Router and server
// ============================================================================

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route(&state.config.webhooks.endpoint_path, post(handle_webhook));

    let health_routes = Router::new()
        .route("/", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Bind to the configured address and serve until SIGINT or SIGTERM.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// In-flight requests get `server.shutdown_timeout_seconds` to finish once
/// `shutdown` fires; after that the server stops without waiting for them.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_timeout = Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let app = create_router(state);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!(
                "Initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
            let _ = signalled_tx.send(());
        })
        .into_future();

    let drain_deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(shutdown_timeout).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!("Graceful shutdown timed out; dropping in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handle GitHub webhook requests
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what GitHub signed.
///
/// The pipeline runs in its own task. A client that disconnects, or a server
/// that stops waiting at the drain deadline, only drops the response; the
/// ticket and its audit record are still written.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookHandlerError> {
    let delivery = WebhookDelivery::new(
        header_str(&headers, EVENT_HEADER),
        header_str(&headers, DELIVERY_HEADER),
        header_str(&headers, SIGNATURE_HEADER),
        body,
    );

    let expose_details = state.config.webhooks.expose_error_details;
    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::spawn(async move { pipeline.process(&delivery).await }.in_current_span())
        .await
        .map_err(|e| {
            error!(error = %e, "Webhook processing task aborted");
            WebhookHandlerError::TicketFailed {
                message: format!("processing task aborted: {}", e),
                expose_details,
            }
        })?
        .map_err(|e| WebhookHandlerError::from_pipeline(e, expose_details))?;

    Ok(Json(WebhookResponse::from(outcome)))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Liveness endpoint; never touches dependencies
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness endpoint; ready when the audit store answers
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match state.pipeline.audit_store().ping().await {
        Ok(()) => (StatusCode::OK, Json(ReadinessResponse { ready: true })),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse { ready: false }),
            )
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
