//! # AWS SSM Parameter Store Source
//!
//! Looks values up with `GetParameter`, optionally decrypting `SecureString`
//! parameters. Every failure is mapped to a [`SourceError`] so the resolver
//! can fall back to the environment.

use crate::settings::{SecretValue, SourceError, ValueSource};
use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion};
use aws_sdk_ssm::{config::Region, error::DisplayErrorContext, Client};
use std::time::Duration;
use tracing::instrument;

/// Region used when neither configuration nor the AWS environment names one.
pub const FALLBACK_REGION: &str = "us-east-1";

/// [`ValueSource`] backed by the AWS SSM Parameter Store.
#[derive(Debug, Clone)]
pub struct SsmParameterSource {
    client: Client,
    timeout: Duration,
}

impl SsmParameterSource {
    /// Build a source from the ambient AWS configuration.
    ///
    /// Region order: `region` argument, then the standard AWS provider chain
    /// (`AWS_REGION`, `AWS_DEFAULT_REGION`, profile, IMDS), then
    /// [`FALLBACK_REGION`]. Loading never fails; missing credentials surface
    /// as lookup errors later.
    pub async fn from_env(region: Option<String>, timeout: Duration) -> Self {
        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new(FALLBACK_REGION));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        Self::with_client(Client::new(&config), timeout)
    }

    /// Wrap an existing SSM client.
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ValueSource for SsmParameterSource {
    fn name(&self) -> &str {
        "ssm"
    }

    #[instrument(skip(self), fields(timeout_ms = self.timeout.as_millis() as u64))]
    async fn fetch(&self, key: &str, decrypt: bool) -> Result<Option<SecretValue>, SourceError> {
        let request = self
            .client
            .get_parameter()
            .name(key)
            .with_decryption(decrypt)
            .send();

        let output = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| SourceError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_parameter_not_found())
                    .unwrap_or(false);
                if not_found {
                    SourceError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    let message = DisplayErrorContext(&e).to_string();
                    if message.contains("AccessDenied") {
                        SourceError::AccessDenied {
                            key: key.to_string(),
                            reason: message,
                        }
                    } else {
                        SourceError::Unavailable { message }
                    }
                }
            })?;

        Ok(output
            .parameter()
            .and_then(|p| p.value())
            .map(|v| SecretValue::from_string(v.to_string())))
    }
}
