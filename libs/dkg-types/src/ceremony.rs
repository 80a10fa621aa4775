//! Ceremony identifiers.

use serde::{Deserialize, Serialize};

/// A ceremony's identifier: a hex string, typically derived from the initiator's nonce.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CeremonyId(String);

impl CeremonyId {
    /// Wrap a pre-computed hex identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a ceremony id from an initiator nonce by hex-encoding it.
    pub fn from_nonce(nonce: &[u8]) -> Self {
        Self(hex::encode(nonce))
    }

    /// The underlying hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CeremonyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
