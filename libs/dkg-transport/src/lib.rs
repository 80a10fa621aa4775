//! The log transport contract the dispatcher reads from and every CLI/HTTP entry point appends
//! to, plus an in-process reference implementation suitable for tests and single-node operation.
//!
//! The contract is deliberately narrow: append one or many envelopes and get back the offsets
//! the log assigned them, or read everything from an offset onward. A networked bus (Kafka, NATS,
//! ...) implements the same trait; nothing upstream of [`LogTransport`] needs to know which one is
//! in play.

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

mod memory;

pub use memory::InMemoryLogTransport;

use async_trait::async_trait;
use dkg_types::participant::Fingerprint;
use dkg_types::CeremonyId;
use serde::{Deserialize, Serialize};

/// An envelope as produced by its sender, before the log has assigned it an offset.
///
/// `signature` covers [`UnpositionedEnvelope::signed_bytes`], which does **not** include the
/// offset: the sender computes it before the log has appended (and therefore positioned) the
/// envelope, so the offset cannot be part of the signed material. Ordering within a ceremony is
/// instead guaranteed structurally, by the log itself delivering messages strictly in append
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpositionedEnvelope {
    /// The ceremony this envelope is addressed to.
    pub ceremony_id: CeremonyId,
    /// Which event this is, e.g. `"init_proposal"` or `"confirm"`. Selects how the dispatcher
    /// decodes `payload_bytes`.
    pub event_name: String,
    /// The encoded request payload.
    pub payload_bytes: Vec<u8>,
    /// Fingerprint of the sender's long-term public key.
    pub sender_fingerprint: Fingerprint,
    /// Signature by the sender's long-term key over [`Self::signed_bytes`].
    pub signature: Vec<u8>,
}

impl UnpositionedEnvelope {
    /// The bytes a sender signs and a dispatcher verifies: the ceremony id, event name and
    /// payload, concatenated with length-prefixes so no field can bleed into its neighbor.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.ceremony_id.as_str().len() + self.event_name.len() + self.payload_bytes.len() + 24);
        extend_length_prefixed(&mut bytes, self.ceremony_id.as_str().as_bytes());
        extend_length_prefixed(&mut bytes, self.event_name.as_bytes());
        extend_length_prefixed(&mut bytes, &self.payload_bytes);
        bytes
    }
}

fn extend_length_prefixed(bytes: &mut Vec<u8>, field: &[u8]) {
    bytes.extend_from_slice(&(field.len() as u64).to_le_bytes());
    bytes.extend_from_slice(field);
}

/// An envelope once the log has assigned it a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEnvelope {
    /// The envelope as the sender produced it.
    pub envelope: UnpositionedEnvelope,
    /// The offset the log assigned on append, monotonically increasing per topic.
    pub offset: u64,
}

/// A transport operation failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport has been closed and no longer accepts appends.
    #[error("transport closed")]
    Closed,
}

/// The append-only log a dispatcher replays and every producer appends to.
///
/// Implementations MUST deliver messages for a given `ceremony_id` in the order they were
/// appended; a single-partition log or one partitioned by `ceremony_id` both satisfy this.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Append one envelope, returning it positioned at the offset the log assigned.
    async fn send(&self, envelope: UnpositionedEnvelope) -> Result<LogEnvelope, TransportError>;

    /// Append a batch of envelopes atomically: either all are appended, in order, or none are.
    async fn send_batch(&self, envelopes: Vec<UnpositionedEnvelope>) -> Result<Vec<LogEnvelope>, TransportError>;

    /// Return every envelope at offset `>= from_offset`, in offset order.
    async fn get_messages(&self, from_offset: u64) -> Result<Vec<LogEnvelope>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_crypto::fingerprint;

    fn envelope(event_name: &str) -> UnpositionedEnvelope {
        UnpositionedEnvelope {
            ceremony_id: CeremonyId::new("abc123"),
            event_name: event_name.to_string(),
            payload_bytes: b"payload".to_vec(),
            sender_fingerprint: fingerprint(b"sender-key"),
            signature: vec![0u8; 64],
        }
    }

    #[test]
    fn signed_bytes_distinguish_field_boundaries() {
        let mut a = envelope("init");
        a.payload_bytes = b"x".to_vec();
        let mut b = envelope("ini");
        b.payload_bytes = b"tx".to_vec();
        assert_ne!(a.signed_bytes(), b.signed_bytes());
    }
}
