//! Filesystem-backed object store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{validate_key, ObjectStore, StorageError};

/// Stores each object as one file under a root directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write then rename so readers never see a partial object
        let partial = self.root.join(format!(".{}.partial", key));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!(key, size = bytes.len(), "object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects"));

        store.put("abc-cake.png", b"bytes").await.unwrap();
        assert_eq!(store.get("abc-cake.png").await.unwrap(), b"bytes");

        store.delete("abc-cake.png").await.unwrap();
        assert!(matches!(
            store.get("abc-cake.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn overwrite_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put("k", b"one").await.unwrap();
        store.put("k", b"two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn missing_delete_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(store.delete("nope").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn refuses_keys_outside_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(
            store.put("../escape", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("nested/key").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
