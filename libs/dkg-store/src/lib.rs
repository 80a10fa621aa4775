//! Dump store and key store contracts, plus file-backed reference implementations.
//!
//! Both stores are keyed maps with different consistency needs: the dump store needs an atomic
//! compare-and-swap so a crashed writer can never leave two dispatchers disagreeing about a
//! ceremony's current state, while the key store is a plain per-user map that's only ever written
//! once, at `gen_keys` time.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::iterator_step_by_zero,
    clippy::invalid_regex,
    clippy::string_slice,
    clippy::unimplemented,
    clippy::todo
)]

mod dump_store;
mod key_store;

pub use dump_store::{DumpStore, FileDumpStore, VersionedDump};
pub use key_store::{FileKeyStore, KeyEntry, KeyStore};

/// A store operation failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `put` supplied a version that didn't match the store's current version for that key.
    #[error("version conflict: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        /// The version the caller expected to overwrite.
        expected: Option<u64>,
        /// The version actually stored.
        actual: Option<u64>,
    },

    /// The backing file system returned an error.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization failure while reading or writing a key entry.
    #[error("serde failure: {0}")]
    Serde(#[from] anyhow::Error),

    /// The background blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
