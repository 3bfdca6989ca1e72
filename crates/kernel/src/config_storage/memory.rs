//! Fixed in-process settings.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ConfigProvider, ConfigStore, default_value};

/// Settings held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfig {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .get(key)
            .cloned()
            .or_else(|| default_value(key).map(String::from)))
    }
}

#[async_trait]
impl ConfigStore for StaticConfig {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    async fn all(&self) -> Result<HashMap<String, String>> {
        Ok(self.values.read().clone())
    }
}
