//! Blob storage for uploaded document bytes.
//!
//! The [`BlobStore`] trait keeps the service independent of the backing
//! object store; [`FsBlobStore`] is the local-first production
//! implementation, laying keys out as paths under a root directory.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Abstract object storage keyed by slash-separated strings
/// (e.g. `documents/{id}/{filename}`).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Removes every stored object.
    async fn delete_all(&self) -> Result<()>;
}

/// Filesystem-backed [`BlobStore`] rooted at a configured directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a key to a path under the root, rejecting traversal.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            bail!("blob key must not be empty");
        }
        for part in key.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                bail!("invalid blob key: {}", key);
            }
        }
        Ok(self.root.join(Path::new(key)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create blob directory for {}", key))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", key))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read blob {}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to delete blob {}", key)),
        }
        // Drop the per-document directory if it emptied out
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::remove_dir(parent).await;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Failed to clear blob store"),
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to recreate blob root")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::new(tmp.path());

        store.put("documents/d1/a.pdf", b"hello").await.unwrap();
        assert_eq!(store.get("documents/d1/a.pdf").await.unwrap(), b"hello");

        store.delete("documents/d1/a.pdf").await.unwrap();
        assert!(store.get("documents/d1/a.pdf").await.is_err());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::new(tmp.path());
        store.delete("documents/missing/x.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::new(tmp.path());
        assert!(store.put("../escape.pdf", b"x").await.is_err());
        assert!(store.get("a//b").await.is_err());
        assert!(store.get("").await.is_err());
    }

    #[tokio::test]
    async fn delete_all_clears_everything() {
        let tmp = TempDir::new().unwrap();
        let store = FsBlobStore::new(tmp.path());
        store.put("documents/d1/a.pdf", b"one").await.unwrap();
        store.put("documents/d2/b.pdf", b"two").await.unwrap();

        store.delete_all().await.unwrap();
        assert!(store.get("documents/d1/a.pdf").await.is_err());
        assert!(store.get("documents/d2/b.pdf").await.is_err());

        // Store remains usable afterwards
        store.put("documents/d3/c.pdf", b"three").await.unwrap();
    }
}
