//! Per-user long-term keypair storage.

use crate::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A stored long-term keypair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    /// The public half, as recorded in a [`dkg_types::Participant::public_key`] field.
    pub public_key: Vec<u8>,
    /// The secret half, never transmitted.
    pub private_key: Vec<u8>,
}

/// Persistent per-user map `{username -> KeyEntry}`.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the stored entry for `username`, or `None` if `gen_keys` has never run for it.
    async fn get(&self, username: &str) -> Result<Option<KeyEntry>, StoreError>;

    /// Store `entry` for `username`, overwriting any existing entry.
    async fn put(&self, username: &str, entry: KeyEntry) -> Result<(), StoreError>;
}

/// File-backed [`KeyStore`]: one JSON file per username.
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    /// Open a key store rooted at `root`, creating the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, username: &str) -> PathBuf {
        self.root.join(format!("{username}.json"))
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self, username: &str) -> Result<Option<KeyEntry>, StoreError> {
        let path = self.path_for(username);
        tokio::task::spawn_blocking(move || {
            if !path.exists() {
                return Ok(None);
            }
            serde_files_utils::json::read_json(path).map(Some).map_err(StoreError::Serde)
        })
        .await?
    }

    async fn put(&self, username: &str, entry: KeyEntry) -> Result<(), StoreError> {
        let path = self.path_for(username);
        tokio::task::spawn_blocking(move || serde_files_utils::json::write_json(path, &entry).map_err(StoreError::Serde))
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_on_unknown_user_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileKeyStore::new(dir.path()).expect("store opens");
        let result = store.get("alice").await.expect("get succeeds");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileKeyStore::new(dir.path()).expect("store opens");
        let entry = KeyEntry { public_key: vec![1, 2, 3], private_key: vec![4, 5, 6] };
        store.put("alice", entry.clone()).await.expect("put succeeds");

        let fetched = store.get("alice").await.expect("get succeeds").expect("entry exists");
        assert_eq!(fetched.public_key, entry.public_key);
        assert_eq!(fetched.private_key, entry.private_key);
    }
}
