//! # Settings and Secret Resolution
//!
//! Resolves the values Ticket Bridge needs at start-up (webhook secret, Jira
//! credentials, database location) from an ordered chain of
//! [`ValueSource`]s: typically the AWS SSM Parameter Store first and the
//! process environment second.
//!
//! A failing source never fails resolution. Permission problems, network
//! errors and missing parameters are logged and the next source is asked, so
//! the same binary runs on an instance with parameter-store access and on a
//! developer laptop with only a `.env` file.
//!
//! The result is an immutable [`BridgeSettings`] built once and shared by
//! reference.

use async_trait::async_trait;
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

/// Parameter / environment names looked up at start-up.
pub mod keys {
    pub const GITHUB_WEBHOOK_SECRET: &str = "GITHUB_WEBHOOK_SECRET";
    pub const JIRA_URL: &str = "JIRA_URL";
    /// Legacy environment name for [`JIRA_URL`].
    pub const JIRA_BASE_URL: &str = "JIRA_BASE_URL";
    pub const JIRA_EMAIL: &str = "JIRA_EMAIL";
    pub const JIRA_API_TOKEN: &str = "JIRA_API_TOKEN";
    pub const JIRA_PROJECT_KEY: &str = "JIRA_PROJECT_KEY";
    pub const DATABASE_URL: &str = "DATABASE_URL";
}

/// Database used when no `DATABASE_URL` is configured anywhere.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://ticket-bridge.sqlite?mode=rwc";

// ============================================================================
// Secret values
// ============================================================================

/// Secure container for secret values
///
/// Secret values are never included in Debug output or logs and are zeroed
/// when dropped.
#[derive(Clone, Default)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    /// Create secret value from string
    pub fn from_string(value: String) -> Self {
        Self { inner: value }
    }

    /// Get secret as string (only for immediate use)
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::from_string(value.to_string())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SecretValue {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// ============================================================================
// Value sources
// ============================================================================

/// Errors a [`ValueSource`] can report.
///
/// These never leave [`SecretResolver`]; they exist so each source can say
/// *why* it had nothing, for logging.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Value not found: {key}")]
    NotFound { key: String },

    #[error("Access denied to {key}: {reason}")]
    AccessDenied { key: String, reason: String },

    #[error("Value source unavailable: {message}")]
    Unavailable { message: String },

    #[error("Lookup timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Value for {key} is unusable: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Interface for one place configuration values can come from.
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Short name used in logs, e.g. `ssm` or `env`.
    fn name(&self) -> &str;

    /// Look up `key`.
    ///
    /// `decrypt` asks stores that hold encrypted values to return plaintext;
    /// sources without encryption ignore it. `Ok(None)` and
    /// `Err(SourceError::NotFound)` mean the same thing to the resolver.
    async fn fetch(&self, key: &str, decrypt: bool) -> Result<Option<SecretValue>, SourceError>;
}

/// Ordered fallback chain over [`ValueSource`]s.
#[derive(Clone, Default)]
pub struct SecretResolver {
    sources: Vec<Arc<dyn ValueSource>>,
}

impl SecretResolver {
    /// Create a resolver with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; sources are consulted in insertion order.
    pub fn with_source(mut self, source: Arc<dyn ValueSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Names of the configured sources, in lookup order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve `key` from the first source that has a non-empty value.
    ///
    /// Never fails: source errors are logged and skipped.
    pub async fn resolve(&self, key: &str, decrypt: bool) -> Option<SecretValue> {
        for source in &self.sources {
            match source.fetch(key, decrypt).await {
                Ok(Some(value)) if !value.is_empty() => {
                    debug!(key, source = source.name(), "Resolved configuration value");
                    return Some(value);
                }
                Ok(_) | Err(SourceError::NotFound { .. }) => {
                    debug!(key, source = source.name(), "Configuration value not present");
                }
                Err(e) => {
                    warn!(
                        key,
                        source = source.name(),
                        error = %e,
                        "Configuration source failed; falling back"
                    );
                }
            }
        }
        None
    }

    /// Resolve `key`, falling back to `default` when no source has it.
    pub async fn resolve_or(&self, key: &str, decrypt: bool, default: &str) -> SecretValue {
        match self.resolve(key, decrypt).await {
            Some(value) => value,
            None => SecretValue::from(default),
        }
    }
}

impl fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Connection details for the Jira REST API.
#[derive(Debug, Clone, Default)]
pub struct JiraSettings {
    pub base_url: String,
    pub email: String,
    pub api_token: SecretValue,
    pub project_key: String,
}

/// Process-wide settings, resolved once at start-up and never mutated.
#[derive(Clone)]
pub struct BridgeSettings {
    pub webhook_secret: SecretValue,
    pub jira: JiraSettings,
    pub database_url: String,
}

impl BridgeSettings {
    /// Resolve every setting through `resolver`.
    ///
    /// Missing Jira values resolve to empty strings; the ticket client reports
    /// them per request. A missing database URL falls back to
    /// [`DEFAULT_DATABASE_URL`].
    pub async fn resolve(resolver: &SecretResolver) -> Self {
        let webhook_secret = resolver
            .resolve_or(keys::GITHUB_WEBHOOK_SECRET, true, "")
            .await;

        let jira = JiraSettings {
            base_url: resolver
                .resolve_or(keys::JIRA_URL, false, "")
                .await
                .expose_secret()
                .to_string(),
            email: resolver
                .resolve_or(keys::JIRA_EMAIL, false, "")
                .await
                .expose_secret()
                .to_string(),
            api_token: resolver.resolve_or(keys::JIRA_API_TOKEN, true, "").await,
            project_key: resolver
                .resolve_or(keys::JIRA_PROJECT_KEY, false, "")
                .await
                .expose_secret()
                .to_string(),
        };

        let database_url = resolver
            .resolve_or(keys::DATABASE_URL, false, DEFAULT_DATABASE_URL)
            .await
            .expose_secret()
            .to_string();

        let settings = Self {
            webhook_secret,
            jira,
            database_url,
        };

        info!(
            webhook_secret_configured = !settings.webhook_secret.is_empty(),
            jira_configured = settings.jira_configured(),
            database_backend = settings.database_backend(),
            "Resolved bridge settings"
        );
        if settings.webhook_secret.is_empty() {
            warn!("No webhook secret configured; every delivery will be rejected");
        }

        settings
    }

    /// Whether every Jira value is present.
    pub fn jira_configured(&self) -> bool {
        !self.jira.base_url.is_empty()
            && !self.jira.email.is_empty()
            && !self.jira.api_token.is_empty()
            && !self.jira.project_key.is_empty()
    }

    /// URL scheme of the database connection string, for logging.
    pub fn database_backend(&self) -> &str {
        self.database_url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .unwrap_or("unknown")
    }
}

impl fmt::Debug for BridgeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSettings")
            .field("webhook_secret", &self.webhook_secret)
            .field("jira", &self.jira)
            .field("database_backend", &self.database_backend())
            .finish()
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
