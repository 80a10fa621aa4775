//! Participants and their statuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A participant's stable position in the quorum, assigned at admission and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantIndex(pub u16);

impl std::fmt::Display for ParticipantIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable short identifier derived by hashing a participant's long-term public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// One of the four identical DKG mini-phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DkgPhase {
    /// Participants exchange ephemeral DKG round public keys.
    PubKey,
    /// Participants exchange VSS commitments.
    Commit,
    /// Participants exchange encrypted deals.
    Deal,
    /// Participants exchange responses to the deals they received.
    Response,
    /// Participants submit the reconstructed master public key.
    MasterKey,
}

impl DkgPhase {
    /// The phase that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::PubKey => Some(Self::Commit),
            Self::Commit => Some(Self::Deal),
            Self::Deal => Some(Self::Response),
            Self::Response => Some(Self::MasterKey),
            Self::MasterKey => None,
        }
    }
}

impl std::fmt::Display for DkgPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PubKey => "pub_key",
            Self::Commit => "commit",
            Self::Deal => "deal",
            Self::Response => "response",
            Self::MasterKey => "master_key",
        };
        write!(f, "{name}")
    }
}

/// A participant's status. Every value here is reachable along exactly the edges described in the
/// data model: `Await* -> (Confirmed | Declined | ConfirmationError)`, never backwards and never
/// skipping a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantStatus {
    /// Awaiting the participant's confirmation or decline of its invitation.
    SignatureAwaitConfirmation,
    /// The participant confirmed its invitation.
    SignatureConfirmed,
    /// The participant declined its invitation.
    SignatureDeclined,
    /// Awaiting the participant's confirmation for the given DKG mini-phase.
    DkgAwaitConfirmation(DkgPhase),
    /// The participant confirmed the given DKG mini-phase.
    DkgConfirmed(DkgPhase),
    /// The participant errored out of the given DKG mini-phase.
    DkgConfirmationError(DkgPhase),
    /// Awaiting the participant's confirmation or decline for the current signing round.
    SigningAwaitConfirmation,
    /// The participant confirmed participation in the current signing round.
    SigningConfirmed,
    /// The participant declined participation in the current signing round.
    SigningDeclined,
    /// Awaiting the participant's partial signature for the current signing round.
    PartialKeyAwaitConfirmation,
    /// The participant submitted its partial signature.
    PartialKeyConfirmed,
    /// The participant errored out while producing its partial signature.
    PartialKeyConfirmationError,
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignatureAwaitConfirmation => write!(f, "SignatureAwaitConfirmation"),
            Self::SignatureConfirmed => write!(f, "SignatureConfirmed"),
            Self::SignatureDeclined => write!(f, "SignatureDeclined"),
            Self::DkgAwaitConfirmation(phase) => write!(f, "{phase}AwaitConfirmation"),
            Self::DkgConfirmed(phase) => write!(f, "{phase}Confirmed"),
            Self::DkgConfirmationError(phase) => write!(f, "{phase}ConfirmationError"),
            Self::SigningAwaitConfirmation => write!(f, "SigningAwaitConfirmation"),
            Self::SigningConfirmed => write!(f, "SigningConfirmed"),
            Self::SigningDeclined => write!(f, "SigningDeclined"),
            Self::PartialKeyAwaitConfirmation => write!(f, "PartialKeyAwaitConfirmation"),
            Self::PartialKeyConfirmed => write!(f, "PartialKeyConfirmed"),
            Self::PartialKeyConfirmationError => write!(f, "PartialKeyConfirmationError"),
        }
    }
}

/// A single participant in a ceremony's quorum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Stable position in the quorum.
    pub participant_index: ParticipantIndex,
    /// Human-readable label.
    pub title: String,
    /// Network identifier.
    pub addr: String,
    /// Long-term signing public key, used to verify log envelopes from this participant.
    pub public_key: Vec<u8>,
    /// Ephemeral ceremony public key, used to encrypt this participant's invitation secret.
    pub dkg_public_key: Vec<u8>,
    /// Stable short identifier derived from `public_key`.
    pub fingerprint: Fingerprint,
    /// The 32-byte invitation secret in the clear, as generated by the proposal's originator.
    /// Kept alongside the sealed copy so a later `ConfirmByParticipant` can check the value the
    /// participant claims to have decrypted without the machine needing the participant's
    /// private key.
    pub invitation_secret: Vec<u8>,
    /// The same secret, sealed to `dkg_public_key` and handed to the participant out of band.
    pub invitation_secret_encrypted: Vec<u8>,
    /// Current status.
    pub status: ParticipantStatus,
    /// Timestamp of the last status change; drives deadline checks.
    pub updated_at: DateTime<Utc>,
    /// The round public-key share submitted during the `PubKey` mini-phase.
    pub pub_key_share: Option<Vec<u8>>,
    /// The VSS commitment submitted during the `Commit` mini-phase.
    pub commit: Option<Vec<u8>>,
    /// The encrypted deal submitted during the `Deal` mini-phase.
    pub deal: Option<Vec<u8>>,
    /// The response submitted during the `Response` mini-phase.
    pub response: Option<Vec<u8>>,
    /// The reconstructed master public key submitted during the `MasterKey` mini-phase.
    pub master_key: Option<Vec<u8>>,
    /// The partial signature submitted during the current signing round.
    pub partial_key: Option<Vec<u8>>,
}

impl Participant {
    /// Set this participant's status and bump `updated_at` to `at`.
    pub fn set_status(&mut self, status: ParticipantStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Whether `self.updated_at + deadline` is in the past relative to `now`.
    pub fn is_expired(&self, deadline: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.updated_at + deadline < now
    }
}
