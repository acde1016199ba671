pub mod file;
pub mod memory;
pub mod sled_store;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use contentstore_lib::{MutationError, ResourceName};
use thiserror::Error;

use super::config::{ServerConfig, StorageBackend};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to serialize resource {resource}: {source}")]
    Serialize {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Raw persistence of one serialized JSON array per resource.
/// Implementations must be thread-safe.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Raw content of a resource, `None` if it was never written.
    async fn load(&self, resource: &ResourceName) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the whole content of a resource.
    async fn save(&self, resource: &ResourceName, content: &[u8]) -> Result<(), StoreError>;

    /// Names of all resources that have stored content.
    async fn list_resources(&self) -> Result<Vec<String>, StoreError>;

    /// Short label for logs and metrics.
    fn kind(&self) -> &'static str;
}

/// Open the backend selected in the server configuration.
pub fn open_backend(config: &ServerConfig) -> Result<Arc<dyn ResourceBackend>, StoreError> {
    let backend: Arc<dyn ResourceBackend> = match config.storage {
        StorageBackend::File => Arc::new(file::FileStore::open(&config.content_dir)?),
        StorageBackend::Sled => Arc::new(sled_store::SledStore::open(&config.content_dir)?),
        StorageBackend::Memory => Arc::new(memory::MemoryStore::new()),
    };
    Ok(backend)
}
