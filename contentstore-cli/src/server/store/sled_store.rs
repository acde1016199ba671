use std::path::Path;

use async_trait::async_trait;
use contentstore_lib::ResourceName;

use super::{ResourceBackend, StoreError};

const PREFIX: &str = "resource:";

/// Persistent resource storage backed by sled.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    /// Open a sled database at the given directory path.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(sled::open(data_dir)?))
    }

    fn key(resource: &ResourceName) -> String {
        format!("{}{}", PREFIX, resource)
    }
}

#[async_trait]
impl ResourceBackend for SledStore {
    async fn load(&self, resource: &ResourceName) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(Self::key(resource))?.map(|ivec| ivec.to_vec()))
    }

    async fn save(&self, resource: &ResourceName, content: &[u8]) -> Result<(), StoreError> {
        self.db.insert(Self::key(resource), content)?;
        self.db.flush()?;
        Ok(())
    }

    async fn list_resources(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for item in self.db.scan_prefix(PREFIX) {
            let (key, _) = item?;
            if let Some(name) = std::str::from_utf8(&key)
                .ok()
                .and_then(|k| k.strip_prefix(PREFIX))
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn kind(&self) -> &'static str {
        "sled"
    }
}
