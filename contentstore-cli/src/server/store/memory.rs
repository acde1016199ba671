use std::collections::HashMap;

use async_trait::async_trait;
use contentstore_lib::ResourceName;
use tokio::sync::RwLock;

use super::{ResourceBackend, StoreError};

/// In-memory resource storage backed by a `RwLock<HashMap>`.
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceBackend for MemoryStore {
    async fn load(&self, resource: &ResourceName) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self.data.read().await;
        Ok(data.get(resource.as_str()).cloned())
    }

    async fn save(&self, resource: &ResourceName, content: &[u8]) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        data.insert(resource.to_string(), content.to_vec());
        Ok(())
    }

    async fn list_resources(&self) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().await;
        let mut names: Vec<String> = data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
