//! Process-environment [`ValueSource`].

use crate::settings::{keys, SecretValue, SourceError, ValueSource};
use async_trait::async_trait;
use std::collections::HashMap;

/// Reads values from environment variables of the same name.
///
/// Aliases let a key fall back to older variable names, e.g. `JIRA_URL`
/// falling back to `JIRA_BASE_URL`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource {
    aliases: HashMap<String, Vec<String>>,
}

impl EnvironmentSource {
    /// Environment source without aliases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment source with the aliases Ticket Bridge has always honored.
    pub fn with_standard_aliases() -> Self {
        Self::new().with_alias(keys::JIRA_URL, keys::JIRA_BASE_URL)
    }

    /// Also try `alias` when `key` is unset or empty.
    pub fn with_alias(mut self, key: &str, alias: &str) -> Self {
        self.aliases
            .entry(key.to_string())
            .or_default()
            .push(alias.to_string());
        self
    }

    fn read(name: &str) -> Result<Option<String>, SourceError> {
        match std::env::var(name) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(SourceError::InvalidValue {
                key: name.to_string(),
                reason: "value is not valid unicode".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ValueSource for EnvironmentSource {
    fn name(&self) -> &str {
        "env"
    }

    async fn fetch(&self, key: &str, _decrypt: bool) -> Result<Option<SecretValue>, SourceError> {
        if let Some(value) = Self::read(key)? {
            return Ok(Some(SecretValue::from_string(value)));
        }

        for alias in self.aliases.get(key).into_iter().flatten() {
            if let Some(value) = Self::read(alias)? {
                return Ok(Some(SecretValue::from_string(value)));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
#[path = "env_source_tests.rs"]
mod tests;
