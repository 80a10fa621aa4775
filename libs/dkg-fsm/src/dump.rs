//! Self-describing binary dump format for a ceremony's current machine and payload.
//!
//! Dumps are plain data: the active machine's full state enum, which already carries the
//! complete quorum payload, rather than a hand-rolled separate state-name string plus a parallel
//! quorum encoding. [`encoding::codec::MessageCodec`] supplies the version-byte-prefixed bincode
//! envelope on top.

use crate::{
    dkg_proposal::DkgProposalState, signature_proposal::SignatureProposalState,
    signing_proposal::SigningProposalState, Deadlines,
};
use dkg_types::CeremonyId;
use encoding::codec::{DecodeError, EncodeError, MessageCodec};
use serde::{Deserialize, Serialize};

/// Which of the three inner machines is currently driving a ceremony, together with its state.
#[derive(Clone, Serialize, Deserialize)]
pub enum ActiveState {
    /// The signature-proposal machine is active.
    SignatureProposal(SignatureProposalState),
    /// The DKG-proposal machine is active.
    DkgProposal(DkgProposalState),
    /// The signing-proposal machine is active.
    SigningProposal(SigningProposalState),
}

/// A self-describing snapshot of a ceremony, sufficient to restore it exactly.
///
/// Dumps reflect state **after** an event has been applied: the dispatcher writes one every time
/// it successfully processes a log message, keyed by `ceremony_id`.
#[derive(Clone, Serialize, Deserialize)]
pub struct MachineDump {
    /// The ceremony this dump belongs to.
    pub ceremony_id: CeremonyId,
    /// The deadlines configured when the ceremony was created. Carried at the top level, rather
    /// than only inside `active`, because a terminal inner state (a canceled proposal) no longer
    /// keeps one of its own but a restored [`crate::ceremony::CeremonyMachine`] still needs it to
    /// build whatever machine comes after a future hand-off.
    pub deadlines: Deadlines,
    /// The active machine and its state.
    pub active: ActiveState,
}

impl MachineDump {
    /// Encode this dump into its binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        MessageCodec::default().encode(self)
    }

    /// Decode a dump from its binary wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        MessageCodec::default().decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_types::Quorum;

    #[test]
    fn round_trips_through_the_wire_format() {
        let dump = MachineDump {
            ceremony_id: CeremonyId::new("deadbeef"),
            deadlines: Deadlines::default(),
            active: ActiveState::SignatureProposal(SignatureProposalState::new(2, Deadlines::default())),
        };
        let encoded = dump.encode().expect("encoding succeeds");
        let decoded = MachineDump::decode(&encoded).expect("decoding succeeds");
        assert_eq!(decoded.ceremony_id, dump.ceremony_id);
        assert!(matches!(decoded.active, ActiveState::SignatureProposal(_)));
    }

    #[test]
    fn identical_payloads_produce_byte_identical_dumps() {
        let quorum = Quorum::new(vec![]).expect("empty quorum is valid");
        let make = || MachineDump {
            ceremony_id: CeremonyId::new("cafebabe"),
            deadlines: Deadlines::default(),
            active: ActiveState::DkgProposal(DkgProposalState::new(quorum.clone(), Deadlines::default(), {
                use chrono::TimeZone;
                chrono::Utc.timestamp_opt(1, 0).single().expect("valid timestamp")
            })),
        };
        assert_eq!(make().encode().expect("encoding succeeds"), make().encode().expect("encoding succeeds"));
    }
}
