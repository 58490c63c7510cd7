//! Ticket creation against the Jira REST API.
//!
//! The [`TicketClient`] trait is the seam the pipeline depends on;
//! [`JiraTicketClient`] is the production implementation. Every call makes
//! exactly one HTTP attempt. Retrying is left to the caller.

use crate::settings::JiraSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use tracing::{debug, error, info, instrument};

/// Upper bound on a single ticket-creation request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Jira issue type used for every ticket.
pub const ISSUE_TYPE: &str = "Task";

// ============================================================================
// Core Types
// ============================================================================

/// Text of the ticket to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub summary: String,
    pub description: String,
}

impl TicketRequest {
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
        }
    }
}

/// Key of a created issue, e.g. `ENG-123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketKey(String);

impl TicketKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure modes of a ticket-creation call.
///
/// [`TicketError::Configuration`] is detected before any network traffic;
/// every other variant is an upstream failure (see [`TicketError::is_api_error`]).
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Jira configuration incomplete: missing {missing}")]
    Configuration { missing: String },

    #[error("Jira API error {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Jira request timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Jira request failed: {message}")]
    Transport { message: String },

    #[error("Jira response malformed: {message}")]
    MalformedResponse { message: String },
}

impl TicketError {
    /// True for failures reported by, or on the way to, the Jira API.
    pub fn is_api_error(&self) -> bool {
        !matches!(self, TicketError::Configuration { .. })
    }

    /// HTTP status returned by Jira, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TicketError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Interface Traits
// ============================================================================

/// Interface for creating tickets in the issue tracker.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Create one ticket and return its key.
    ///
    /// # Errors
    /// - `TicketError::Configuration` - credentials, URL or project missing
    /// - `TicketError::UnexpectedStatus` - status other than 200/201
    /// - `TicketError::Timeout` - request exceeded the client timeout
    /// - `TicketError::Transport` - connection-level failure
    /// - `TicketError::MalformedResponse` - success without an issue key
    async fn create_ticket(&self, request: &TicketRequest) -> Result<TicketKey, TicketError>;
}

// ============================================================================
// Jira wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateIssueBody<'a> {
    fields: IssueFields<'a>,
}

#[derive(Debug, Serialize)]
struct IssueFields<'a> {
    project: ProjectRef<'a>,
    summary: &'a str,
    description: AdfDocument<'a>,
    issuetype: IssueTypeRef<'a>,
}

#[derive(Debug, Serialize)]
struct ProjectRef<'a> {
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueTypeRef<'a> {
    name: &'a str,
}

/// Atlassian Document Format wrapper around a single plain-text paragraph.
#[derive(Debug, Serialize)]
struct AdfDocument<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u8,
    content: Vec<AdfNode<'a>>,
}

#[derive(Debug, Serialize)]
struct AdfNode<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<AdfNode<'a>>,
}

impl<'a> AdfDocument<'a> {
    fn paragraph(text: &'a str) -> Self {
        Self {
            kind: "doc",
            version: 1,
            content: vec![AdfNode {
                kind: "paragraph",
                text: None,
                content: vec![AdfNode {
                    kind: "text",
                    text: Some(text),
                    content: Vec::new(),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: Option<String>,
}

// ============================================================================
// Jira client
// ============================================================================

/// [`TicketClient`] backed by Jira Cloud's `POST /rest/api/3/issue`.
pub struct JiraTicketClient {
    settings: JiraSettings,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl JiraTicketClient {
    /// Create a client with the default 20 second timeout.
    pub fn new(settings: JiraSettings) -> Result<Self, TicketError> {
        Self::with_timeout(settings, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(settings: JiraSettings, timeout: Duration) -> Result<Self, TicketError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ticket-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TicketError::Transport {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            settings,
            http_client,
            timeout,
        })
    }

    fn issue_url(&self) -> String {
        format!(
            "{}/rest/api/3/issue",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn check_settings(&self) -> Result<(), TicketError> {
        let missing: Vec<&str> = [
            ("base URL", self.settings.base_url.is_empty()),
            ("project key", self.settings.project_key.is_empty()),
            ("email", self.settings.email.is_empty()),
            ("API token", self.settings.api_token.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            error!(missing = ?missing, "Jira settings incomplete");
            Err(TicketError::Configuration {
                missing: missing.join(", "),
            })
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> TicketError {
        if e.is_timeout() {
            TicketError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            }
        } else {
            TicketError::Transport {
                message: e.to_string(),
            }
        }
    }
}

impl fmt::Debug for JiraTicketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraTicketClient")
            .field("base_url", &self.settings.base_url)
            .field("project_key", &self.settings.project_key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl TicketClient for JiraTicketClient {
    #[instrument(skip(self, request), fields(project = %self.settings.project_key))]
    async fn create_ticket(&self, request: &TicketRequest) -> Result<TicketKey, TicketError> {
        self.check_settings()?;

        let url = self.issue_url();
        let body = CreateIssueBody {
            fields: IssueFields {
                project: ProjectRef {
                    key: &self.settings.project_key,
                },
                summary: &request.summary,
                description: AdfDocument::paragraph(&request.description),
                issuetype: IssueTypeRef { name: ISSUE_TYPE },
            },
        };

        debug!(url = %url, summary = %request.summary, "Creating Jira issue");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(
                &self.settings.email,
                Some(self.settings.api_token.expose_secret()),
            )
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            error!(status, body = %body, "Jira ticket creation failed");
            return Err(TicketError::UnexpectedStatus { status, body });
        }

        let created: CreatedIssue = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                TicketError::MalformedResponse {
                    message: format!("response is not an issue object: {}", e),
                }
            }
        })?;

        let key = created
            .key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TicketError::MalformedResponse {
                message: "response has no issue key".to_string(),
            })?;

        info!(ticket_key = %key, "Created Jira ticket");
        Ok(TicketKey::new(key))
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
