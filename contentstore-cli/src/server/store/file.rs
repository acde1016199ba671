use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contentstore_lib::ResourceName;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{ResourceBackend, StoreError};

const EXTENSION: &str = "json";

/// One `<name>.json` file per resource under a content root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating the content root if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, resource: &ResourceName) -> PathBuf {
        self.root.join(format!("{}.{}", resource, EXTENSION))
    }
}

/// Write to a sibling temp file, fsync, then rename over the target.
async fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(content)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
    }
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

#[async_trait]
impl ResourceBackend for FileStore {
    async fn load(&self, resource: &ResourceName) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(resource);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn save(&self, resource: &ResourceName, content: &[u8]) -> Result<(), StoreError> {
        atomic_write(&self.path_for(resource), content).await
    }

    async fn list_resources(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if ResourceName::parse(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
