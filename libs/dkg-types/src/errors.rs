//! Error kinds raised while validating requests and driving ceremony state machines.
//!
//! These map 1:1 onto the kinds enumerated in the coordination core design: they're surfaced to
//! operators and, eventually, to HTTP clients, so each one carries a short, stable message rather
//! than leaking internal details.

use thiserror::Error;

/// An error raised while validating a request or applying it to a ceremony's state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// A request field failed validation (length, emptiness, timestamp).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A fingerprint or participant id referenced a participant outside the quorum.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    /// An event targeted a participant that isn't in the status it expects.
    #[error("invalid phase status for participant {participant}: expected {expected}, got {actual}")]
    InvalidPhaseStatus {
        /// The participant the event targeted.
        participant: ParticipantIndexDisplay,
        /// The status the event required.
        expected: String,
        /// The status the participant was actually in.
        actual: String,
    },

    /// The current state has no transition for the given message.
    #[error("event not permitted in the current state")]
    EventNotPermitted,

    /// An error event targeted a participant that had already confirmed.
    #[error("participant {0} already confirmed")]
    AlreadyConfirmed(ParticipantIndexDisplay),

    /// An error event targeted a participant that had already errored.
    #[error("participant {0} already errored")]
    AlreadyErrored(ParticipantIndexDisplay),

    /// Two participants hashed to the same fingerprint at proposal time.
    #[error("quorum collision: two participants share a fingerprint")]
    QuorumCollision,

    /// A participant tried to move its own status along a non-existent edge.
    #[error("invalid state transition for participant {0}")]
    InvalidStateTransition(ParticipantIndexDisplay),

    /// RNG exhaustion, encryption/decryption, or signature verification failure.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// Dump or log storage I/O failure.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

/// A thin display-only wrapper so [`CoordinationError`] variants can be `Clone + PartialEq` while
/// still printing participant indices nicely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantIndexDisplay(pub u16);

impl std::fmt::Display for ParticipantIndexDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<super::participant::ParticipantIndex> for ParticipantIndexDisplay {
    fn from(index: super::participant::ParticipantIndex) -> Self {
        Self(index.0)
    }
}
