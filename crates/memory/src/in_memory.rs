//! In-memory backend — useful for testing and ephemeral runs.

use async_trait::async_trait;
use oathlink_core::error::StorageError;
use oathlink_core::memory::{self, MemoryRecord, MemorySearch, MemoryStore, SearchQuery};
use oathlink_core::settings::SettingsStore;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::StoreOptions;

/// Stores memories in a Vec and settings in a map. Nothing survives the
/// process.
pub struct InMemoryBackend {
    entries: RwLock<Vec<MemoryRecord>>,
    settings: RwLock<HashMap<String, Value>>,
    options: StoreOptions,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            settings: RwLock::new(HashMap::new()),
            options,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, record: MemoryRecord) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == record.id) {
            return Err(StorageError::Query(format!("duplicate id {}", record.id)));
        }
        entries.push(record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryRecord>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.entries.read().await.len())
    }
}

#[async_trait]
impl MemorySearch for InMemoryBackend {
    fn max_limit(&self) -> usize {
        self.options.max_limit
    }

    async fn search_query(&self, query: &SearchQuery) -> Result<Vec<MemoryRecord>, StorageError> {
        let entries = self.entries.read().await;

        let mut results: Vec<MemoryRecord> = entries
            .iter()
            .filter(|e| e.matches(&query.text))
            .cloned()
            .collect();

        results.sort_by(memory::recent_first);
        results.truncate(query.limit);

        Ok(results)
    }
}

#[async_trait]
impl SettingsStore for InMemoryBackend {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.settings.read().await.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.settings
            .write()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}
