//! # In-Memory Value Source
//!
//! Fixed key/value map for testing and for pinning values in development.

use crate::settings::{SecretValue, SourceError, ValueSource};
use async_trait::async_trait;
use std::collections::HashMap;

/// [`ValueSource`] over a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticValueSource {
    name: String,
    values: HashMap<String, String>,
}

impl StaticValueSource {
    /// Create an empty source reporting itself as `static`.
    pub fn new() -> Self {
        Self {
            name: "static".to_string(),
            values: HashMap::new(),
        }
    }

    /// Override the name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add or replace a value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticValueSource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |source, (k, v)| source.with_value(k, v))
    }
}

#[async_trait]
impl ValueSource for StaticValueSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, key: &str, _decrypt: bool) -> Result<Option<SecretValue>, SourceError> {
        Ok(self
            .values
            .get(key)
            .map(|v| SecretValue::from_string(v.clone())))
    }
}
