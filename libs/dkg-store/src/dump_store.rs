//! Atomic put-if-version-matches dump storage, keyed by ceremony id.

use crate::StoreError;
use async_trait::async_trait;
use dkg_types::CeremonyId;
use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

/// A dump together with the version it was stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDump {
    /// The encoded dump bytes, as produced by `dkg_fsm::MachineDump::encode`.
    pub bytes: Vec<u8>,
    /// Monotonically increasing version, starting at 1 for a dump's first write.
    pub version: u64,
}

/// Keyed binary blob store for ceremony dumps with an atomic compare-and-swap `put`.
#[async_trait]
pub trait DumpStore: Send + Sync {
    /// Fetch the current dump for `ceremony_id`, or `None` if it has never been written.
    async fn get(&self, ceremony_id: &CeremonyId) -> Result<Option<VersionedDump>, StoreError>;

    /// Write `bytes` as the new dump for `ceremony_id`.
    ///
    /// `expected_version` must equal the store's current version for this key (`None` if the key
    /// has never been written) or the write is rejected with
    /// [`StoreError::VersionConflict`] and nothing changes. On success, returns the new version.
    async fn put(&self, ceremony_id: &CeremonyId, bytes: Vec<u8>, expected_version: Option<u64>) -> Result<u64, StoreError>;
}

/// File-backed [`DumpStore`]: each ceremony id maps to one file containing an 8-byte
/// little-endian version counter followed by the dump bytes. Writes go to a temporary file in the
/// same directory and are renamed into place, so a concurrent reader never observes a torn write.
pub struct FileDumpStore {
    root: PathBuf,
    // Reference implementation: a single lock serializes every write, which trivially also
    // serializes writes to the same key. A production store would shard this per ceremony id.
    write_lock: Mutex<()>,
}

impl FileDumpStore {
    /// Open a dump store rooted at `root`, creating the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, write_lock: Mutex::new(()) })
    }

    fn path_for(&self, ceremony_id: &CeremonyId) -> PathBuf {
        self.root.join(format!("{}.dump", ceremony_id.as_str()))
    }
}

fn read_versioned(path: &Path) -> Result<Option<VersionedDump>, std::io::Error> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error),
    };
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    let (version_bytes, bytes) = contents.split_at(std::mem::size_of::<u64>().min(contents.len()));
    let version = u64::from_le_bytes(version_bytes.try_into().unwrap_or([0; 8]));
    Ok(Some(VersionedDump { bytes: bytes.to_vec(), version }))
}

fn write_versioned(root: &Path, path: &Path, version: u64, bytes: &[u8]) -> Result<(), std::io::Error> {
    let mut temp = tempfile::NamedTempFile::new_in(root)?;
    temp.write_all(&version.to_le_bytes())?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[async_trait]
impl DumpStore for FileDumpStore {
    async fn get(&self, ceremony_id: &CeremonyId) -> Result<Option<VersionedDump>, StoreError> {
        let path = self.path_for(ceremony_id);
        Ok(tokio::task::spawn_blocking(move || read_versioned(&path)).await??)
    }

    async fn put(&self, ceremony_id: &CeremonyId, bytes: Vec<u8>, expected_version: Option<u64>) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(ceremony_id);
        let current = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || read_versioned(&path)).await??
        };
        let actual_version = current.as_ref().map(|dump| dump.version);
        if actual_version != expected_version {
            return Err(StoreError::VersionConflict { expected: expected_version, actual: actual_version });
        }
        let next_version = expected_version.unwrap_or(0).checked_add(1).unwrap_or(1);
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || write_versioned(&root, &path, next_version, &bytes)).await??;
        Ok(next_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_write_requires_no_expected_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDumpStore::new(dir.path()).expect("store opens");
        let ceremony_id = CeremonyId::new("abc123");

        let version = store.put(&ceremony_id, b"dump-v1".to_vec(), None).await.expect("first write succeeds");
        assert_eq!(version, 1);

        let fetched = store.get(&ceremony_id).await.expect("get succeeds").expect("dump exists");
        assert_eq!(fetched.bytes, b"dump-v1");
        assert_eq!(fetched.version, 1);
    }

    #[tokio::test]
    async fn put_with_stale_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDumpStore::new(dir.path()).expect("store opens");
        let ceremony_id = CeremonyId::new("abc123");

        store.put(&ceremony_id, b"v1".to_vec(), None).await.expect("first write succeeds");
        let result = store.put(&ceremony_id, b"v2-stale".to_vec(), None).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        let fetched = store.get(&ceremony_id).await.expect("get succeeds").expect("dump exists");
        assert_eq!(fetched.bytes, b"v1");
    }

    #[tokio::test]
    async fn put_with_matching_version_advances_the_dump() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDumpStore::new(dir.path()).expect("store opens");
        let ceremony_id = CeremonyId::new("abc123");

        store.put(&ceremony_id, b"v1".to_vec(), None).await.expect("first write succeeds");
        let version = store.put(&ceremony_id, b"v2".to_vec(), Some(1)).await.expect("second write succeeds");
        assert_eq!(version, 2);

        let fetched = store.get(&ceremony_id).await.expect("get succeeds").expect("dump exists");
        assert_eq!(fetched.bytes, b"v2");
    }

    #[tokio::test]
    async fn get_on_unknown_ceremony_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDumpStore::new(dir.path()).expect("store opens");
        assert!(store.get(&CeremonyId::new("missing")).await.expect("get succeeds").is_none());
    }
}
