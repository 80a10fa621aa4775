//! Typed request and response payloads for every event the ceremony tower accepts.
//!
//! Each variant here replaces what the source machine received as `args ...interface{}` and
//! type-asserted inside the callback; the dispatcher decodes log bytes straight into these types
//! and every `handle_message` match arm operates on a concrete field list.

use chrono::{DateTime, Utc};
use dkg_types::{CoordinationError, ParticipantIndex};
use serde::{Deserialize, Serialize};

const MIN_ADDR_LEN: usize = 3;
const MAX_ADDR_LEN: usize = 150;
const MIN_KEY_LEN: usize = 10;

/// One entry of a [`ParticipantsListRequest`].
///
/// The invitation secret and its sealed copy are generated by the proposal's originator (the CLI
/// or HTTP layer, which has legitimate access to randomness) before the request is ever handed to
/// this machine. `handle_message` only ever records bytes it's given, which keeps it a pure
/// function of its input and makes replaying the log from an empty dump reproduce byte-identical
/// state: re-running a callback that generated its own randomness would not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInput {
    /// Human-readable label.
    pub title: String,
    /// Network identifier (transport-specific; opaque here).
    pub addr: String,
    /// Long-term signing public key.
    pub public_key: Vec<u8>,
    /// Ephemeral ceremony key the invitation secret is sealed to.
    pub dkg_public_key: Vec<u8>,
    /// The 32-byte invitation secret in the clear.
    pub invitation_secret: Vec<u8>,
    /// `invitation_secret`, sealed to `dkg_public_key`.
    pub encrypted_invitation: Vec<u8>,
}

impl ParticipantInput {
    fn validate(&self) -> Result<(), CoordinationError> {
        if !(MIN_ADDR_LEN..=MAX_ADDR_LEN).contains(&self.addr.len()) {
            return Err(CoordinationError::InvalidRequest(format!(
                "addr length {} outside [{MIN_ADDR_LEN}, {MAX_ADDR_LEN}]",
                self.addr.len()
            )));
        }
        if self.public_key.len() < MIN_KEY_LEN {
            return Err(CoordinationError::InvalidRequest("public_key too short".into()));
        }
        if self.dkg_public_key.len() < MIN_KEY_LEN {
            return Err(CoordinationError::InvalidRequest("dkg_public_key too short".into()));
        }
        if self.invitation_secret.is_empty() || self.encrypted_invitation.is_empty() {
            return Err(CoordinationError::InvalidRequest("invitation secret missing".into()));
        }
        Ok(())
    }
}

/// `InitProposal` request: admits a quorum into a fresh ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsListRequest {
    /// Candidate participants, in submission order.
    pub participants: Vec<ParticipantInput>,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

impl ParticipantsListRequest {
    /// Validate field lengths and timestamp sanity. Does not check the configured minimum
    /// quorum size, which the caller supplies separately.
    pub fn validate(&self, min_participants: usize) -> Result<(), CoordinationError> {
        if self.participants.len() < min_participants {
            return Err(CoordinationError::InvalidRequest(format!(
                "expected at least {min_participants} participants, got {}",
                self.participants.len()
            )));
        }
        validate_created_at(self.created_at)?;
        for participant in &self.participants {
            participant.validate()?;
        }
        Ok(())
    }
}

/// `ConfirmByParticipant` request: a participant proves control of its key by returning the
/// decrypted invitation secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfirmationRequest {
    /// Fingerprint of the confirming participant's long-term public key.
    pub fingerprint: dkg_types::participant::Fingerprint,
    /// The invitation secret as decrypted by the participant.
    pub decrypted_invitation: Vec<u8>,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

/// Confirmation request shared by every DKG sub-phase (`PubKeyConfirmationReceived`,
/// `CommitConfirmationReceived`, ...). The phase itself is determined by which machine state
/// is currently active, not carried in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfirmationRequest {
    /// Index of the confirming participant.
    pub participant_index: ParticipantIndex,
    /// Phase-specific opaque material (`pub_key`, `commit`, `deal`, `response` or `master_key`).
    pub material: Vec<u8>,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

impl PhaseConfirmationRequest {
    /// Validate that the material is non-empty and the timestamp is sane.
    pub fn validate(&self) -> Result<(), CoordinationError> {
        if self.material.is_empty() {
            return Err(CoordinationError::InvalidRequest("material must not be empty".into()));
        }
        validate_created_at(self.created_at)
    }
}

/// Error request shared by every DKG sub-phase (`PubKeyConfirmationError`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseErrorRequest {
    /// Index of the erroring participant.
    pub participant_index: ParticipantIndex,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

/// Starts a new signing round over the already-agreed master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningStartRequest {
    /// Caller-chosen identifier for this round; carried through to the partial-key phase.
    pub signing_id: String,
    /// Source bytes to be signed.
    pub payload: Vec<u8>,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

impl SigningStartRequest {
    /// Validate that `signing_id` and `payload` are non-empty and the timestamp is sane.
    pub fn validate(&self) -> Result<(), CoordinationError> {
        if self.signing_id.is_empty() {
            return Err(CoordinationError::InvalidRequest("signing_id must not be empty".into()));
        }
        if self.payload.is_empty() {
            return Err(CoordinationError::InvalidRequest("payload must not be empty".into()));
        }
        validate_created_at(self.created_at)
    }
}

/// A participant's confirm/decline vote for the current signing round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfirmationRequest {
    /// Index of the voting participant.
    pub participant_index: ParticipantIndex,
    /// Whether the participant agreed to take part in this round.
    pub confirmed: bool,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

/// A participant's partial signature for the current signing round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialKeyRequest {
    /// Index of the submitting participant.
    pub participant_index: ParticipantIndex,
    /// The opaque partial-signature bytes.
    pub partial_key: Vec<u8>,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

impl PartialKeyRequest {
    /// Validate that `partial_key` is non-empty and the timestamp is sane.
    pub fn validate(&self) -> Result<(), CoordinationError> {
        if self.partial_key.is_empty() {
            return Err(CoordinationError::InvalidRequest("partial_key must not be empty".into()));
        }
        validate_created_at(self.created_at)
    }
}

/// A participant reporting that it could not produce a partial signature for this round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialKeyErrorRequest {
    /// Index of the erroring participant.
    pub participant_index: ParticipantIndex,
    /// Logical timestamp this request was created at.
    pub created_at: DateTime<Utc>,
}

/// One entry of a [`crate::signature_proposal::InvitationsResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInvitationEntry {
    /// Admitted participant's stable index.
    pub participant_index: ParticipantIndex,
    /// Human-readable label.
    pub title: String,
    /// Stable fingerprint of the participant's long-term public key.
    pub fingerprint: dkg_types::participant::Fingerprint,
    /// The invitation secret, sealed to the participant's `dkg_public_key`.
    pub encrypted_invitation: Vec<u8>,
}

fn validate_created_at(created_at: DateTime<Utc>) -> Result<(), CoordinationError> {
    if created_at.timestamp() == 0 {
        return Err(CoordinationError::InvalidRequest("created_at must be non-zero".into()));
    }
    Ok(())
}
