//! The composed ceremony machine: a single outer type whose active variant is one of the three
//! inner machines, with hand-offs between them driven by the inner machine's own `Final` output.

use crate::{
    dkg_proposal::{DkgProposalMessage, DkgProposalState},
    dump::{ActiveState, MachineDump},
    kernel_err,
    signature_proposal::{
        build_invitations_response, InvitationsResponse, SignatureProposalMessage, SignatureProposalState,
    },
    signing_proposal::{SigningProposalMessage, SigningProposalState},
    Deadlines,
};
use chrono::{DateTime, Utc};
use dkg_types::{CeremonyId, CoordinationError};
use state_machine::{errors::StateMachineError, StateMachine, StateMachineOutput};

/// The inner machine currently driving a ceremony.
enum CeremonyActive {
    SignatureProposal(StateMachine<SignatureProposalState>),
    DkgProposal(StateMachine<DkgProposalState>),
    SigningProposal(StateMachine<SigningProposalState>),
}

/// One event addressed to a ceremony. The dispatcher decodes a log message's payload into the
/// variant selected by the event's name and hands it straight to [`CeremonyMachine::handle_event`];
/// which inner machine actually accepts it is determined by [`CeremonyMachine`]'s current variant,
/// not by this enum.
pub enum CeremonyEvent {
    /// Addressed to the signature-proposal machine.
    SignatureProposal(SignatureProposalMessage),
    /// Addressed to the DKG-proposal machine.
    DkgProposal(DkgProposalMessage),
    /// Addressed to the signing-proposal machine.
    SigningProposal(SigningProposalMessage),
}

/// What the dispatcher should surface back to its caller after a successful event.
pub enum CeremonyOutcome {
    /// The event was applied; there's nothing further to report.
    Applied,
    /// A signature proposal was just admitted; these invitations should be delivered to the
    /// respective participants out of band.
    Invitations(InvitationsResponse),
}

/// A single ceremony's composed machine tower.
pub struct CeremonyMachine {
    ceremony_id: CeremonyId,
    deadlines: Deadlines,
    active: CeremonyActive,
}

impl CeremonyMachine {
    /// Start a brand new ceremony at the signature-proposal machine's initial state.
    pub fn new(ceremony_id: CeremonyId, min_participants: u32, deadlines: Deadlines) -> Self {
        let state = SignatureProposalState::new(min_participants, deadlines);
        Self { ceremony_id, deadlines, active: CeremonyActive::SignatureProposal(StateMachine::new(state)) }
    }

    /// This ceremony's identifier.
    pub fn ceremony_id(&self) -> &CeremonyId {
        &self.ceremony_id
    }

    /// The name of the machine currently driving this ceremony, for logging and the dump format.
    pub fn active_machine_name(&self) -> &'static str {
        match &self.active {
            CeremonyActive::SignatureProposal(_) => "signature_proposal",
            CeremonyActive::DkgProposal(_) => "dkg_proposal",
            CeremonyActive::SigningProposal(_) => "signing_proposal",
        }
    }

    /// The quorum backing whichever machine is currently active, if one has been admitted yet
    /// (the signature-proposal machine has none until its first `InitProposal`).
    pub fn quorum(&self) -> Result<Option<&dkg_types::Quorum>, StateMachineError> {
        let quorum = match &self.active {
            CeremonyActive::SignatureProposal(sm) => sm.state().map_err(StateMachineError::from)?.quorum(),
            CeremonyActive::DkgProposal(sm) => Some(sm.state().map_err(StateMachineError::from)?.quorum()),
            CeremonyActive::SigningProposal(sm) => Some(sm.state().map_err(StateMachineError::from)?.quorum()),
        };
        Ok(quorum)
    }

    /// Apply one event to whichever inner machine is currently active.
    ///
    /// Fails with [`CoordinationError::EventNotPermitted`] if `event` doesn't address the
    /// currently active machine (for example, a DKG confirmation arriving while the ceremony is
    /// still in the signature-proposal phase).
    pub fn handle_event(&mut self, event: CeremonyEvent) -> Result<CeremonyOutcome, StateMachineError> {
        match event {
            CeremonyEvent::SignatureProposal(message) => self.handle_signature_proposal_event(message),
            CeremonyEvent::DkgProposal(message) => self.handle_dkg_proposal_event(message),
            CeremonyEvent::SigningProposal(message) => self.handle_signing_proposal_event(message),
        }
    }

    fn handle_signature_proposal_event(
        &mut self,
        message: SignatureProposalMessage,
    ) -> Result<CeremonyOutcome, StateMachineError> {
        let CeremonyActive::SignatureProposal(sm) = &mut self.active else {
            return Err(kernel_err(CoordinationError::EventNotPermitted));
        };
        let is_init = matches!(message, SignatureProposalMessage::InitProposal(_));
        let output = sm.handle_message(message)?;
        match output {
            StateMachineOutput::Final(quorum) => {
                let clock = quorum_clock(&quorum)?;
                let next = DkgProposalState::new(quorum, self.deadlines, clock);
                self.active = CeremonyActive::DkgProposal(StateMachine::new(next));
                Ok(CeremonyOutcome::Applied)
            }
            StateMachineOutput::Empty | StateMachineOutput::Messages(_) if is_init => {
                let CeremonyActive::SignatureProposal(sm) = &self.active else {
                    return Err(kernel_err(CoordinationError::EventNotPermitted));
                };
                let quorum = sm
                    .state()
                    .map_err(StateMachineError::from)?
                    .quorum()
                    .ok_or_else(|| kernel_err(CoordinationError::EventNotPermitted))?;
                Ok(CeremonyOutcome::Invitations(build_invitations_response(quorum)))
            }
            StateMachineOutput::Empty | StateMachineOutput::Messages(_) => Ok(CeremonyOutcome::Applied),
        }
    }

    fn handle_dkg_proposal_event(&mut self, message: DkgProposalMessage) -> Result<CeremonyOutcome, StateMachineError> {
        let CeremonyActive::DkgProposal(sm) = &mut self.active else {
            return Err(kernel_err(CoordinationError::EventNotPermitted));
        };
        match sm.handle_message(message)? {
            StateMachineOutput::Final(quorum) => {
                let next = SigningProposalState::new(quorum, self.deadlines);
                self.active = CeremonyActive::SigningProposal(StateMachine::new(next));
                Ok(CeremonyOutcome::Applied)
            }
            StateMachineOutput::Empty | StateMachineOutput::Messages(_) => Ok(CeremonyOutcome::Applied),
        }
    }

    fn handle_signing_proposal_event(
        &mut self,
        message: SigningProposalMessage,
    ) -> Result<CeremonyOutcome, StateMachineError> {
        let CeremonyActive::SigningProposal(sm) = &mut self.active else {
            return Err(kernel_err(CoordinationError::EventNotPermitted));
        };
        sm.handle_message(message)?;
        Ok(CeremonyOutcome::Applied)
    }

    /// Snapshot this ceremony into its binary dump representation.
    pub fn dump(&self) -> Result<MachineDump, StateMachineError> {
        let active = match &self.active {
            CeremonyActive::SignatureProposal(sm) => {
                ActiveState::SignatureProposal(sm.state().map_err(StateMachineError::from)?.clone())
            }
            CeremonyActive::DkgProposal(sm) => {
                ActiveState::DkgProposal(sm.state().map_err(StateMachineError::from)?.clone())
            }
            CeremonyActive::SigningProposal(sm) => {
                ActiveState::SigningProposal(sm.state().map_err(StateMachineError::from)?.clone())
            }
        };
        Ok(MachineDump { ceremony_id: self.ceremony_id.clone(), deadlines: self.deadlines, active })
    }

    /// Restore a ceremony from a previously taken dump.
    pub fn from_dump(dump: MachineDump) -> Self {
        let active = match dump.active {
            ActiveState::SignatureProposal(state) => CeremonyActive::SignatureProposal(StateMachine::new(state)),
            ActiveState::DkgProposal(state) => CeremonyActive::DkgProposal(StateMachine::new(state)),
            ActiveState::SigningProposal(state) => CeremonyActive::SigningProposal(StateMachine::new(state)),
        };
        Self { ceremony_id: dump.ceremony_id, deadlines: dump.deadlines, active }
    }
}

/// Every participant in a freshly handed-off quorum was just set to the next phase's
/// `AwaitConfirmation` status with the same timestamp (the hand-off always calls
/// `Quorum::set_all_status` before returning `Final`), so that timestamp can be read back from
/// any participant instead of being threaded through [`CeremonyEvent`] separately.
fn quorum_clock(quorum: &dkg_types::Quorum) -> Result<DateTime<Utc>, StateMachineError> {
    quorum
        .iter()
        .next()
        .map(|participant| participant.updated_at)
        .ok_or_else(|| kernel_err(CoordinationError::EventNotPermitted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{ParticipantConfirmationRequest, ParticipantInput, ParticipantsListRequest};
    use chrono::TimeZone;
    use dkg_crypto::fingerprint;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn participant_input(name: &str, secret: u8) -> ParticipantInput {
        ParticipantInput {
            title: name.to_string(),
            addr: "127.0.0.1:9000".to_string(),
            public_key: format!("pubkey-{name}").into_bytes(),
            dkg_public_key: format!("dkgkey-{name}").into_bytes(),
            invitation_secret: vec![secret; 32],
            encrypted_invitation: vec![secret.wrapping_add(1); 32],
        }
    }

    #[test]
    fn init_proposal_surfaces_invitations_and_stays_on_signature_proposal() {
        let mut ceremony = CeremonyMachine::new(CeremonyId::new("abc123"), 2, Deadlines::default());
        let participants = vec![participant_input("john", 1), participant_input("billy", 2)];
        let event = CeremonyEvent::SignatureProposal(SignatureProposalMessage::InitProposal(ParticipantsListRequest {
            participants,
            created_at: at(1),
        }));
        let outcome = ceremony.handle_event(event).expect("init proposal succeeds");
        match outcome {
            CeremonyOutcome::Invitations(response) => assert_eq!(response.entries.len(), 2),
            CeremonyOutcome::Applied => panic!("expected invitations"),
        }
        assert_eq!(ceremony.active_machine_name(), "signature_proposal");
    }

    #[test]
    fn all_confirmed_hands_off_to_dkg_proposal() {
        let mut ceremony = CeremonyMachine::new(CeremonyId::new("abc123"), 2, Deadlines::default());
        let participants = vec![participant_input("john", 1), participant_input("billy", 2)];
        ceremony
            .handle_event(CeremonyEvent::SignatureProposal(SignatureProposalMessage::InitProposal(
                ParticipantsListRequest { participants, created_at: at(1) },
            )))
            .expect("init proposal succeeds");

        for (name, secret) in [("john", 1u8), ("billy", 2u8)] {
            ceremony
                .handle_event(CeremonyEvent::SignatureProposal(SignatureProposalMessage::Confirm(
                    ParticipantConfirmationRequest {
                        fingerprint: fingerprint(format!("pubkey-{name}").as_bytes()),
                        decrypted_invitation: vec![secret; 32],
                        created_at: at(2),
                    },
                )))
                .expect("confirm handled");
        }
        assert_eq!(ceremony.active_machine_name(), "dkg_proposal");
    }

    #[test]
    fn dump_and_restore_preserve_active_machine() {
        let ceremony = CeremonyMachine::new(CeremonyId::new("abc123"), 2, Deadlines::default());
        let dump = ceremony.dump().expect("dump succeeds");
        let restored = CeremonyMachine::from_dump(dump);
        assert_eq!(restored.active_machine_name(), "signature_proposal");
        assert_eq!(restored.ceremony_id().as_str(), "abc123");
    }

    /// The events below carry a fresh `CeremonyMachine` from `Initial` through the DKG hand-off.
    /// Applying the full sequence from scratch, or restoring from a dump taken partway through and
    /// replaying only the remaining suffix, must land on byte-identical encoded dumps: the dump is
    /// always a pure function of the events applied to it, never of how many times the process
    /// restarted along the way.
    fn replay_events() -> Vec<CeremonyEvent> {
        let participants = vec![participant_input("john", 1), participant_input("billy", 2)];
        vec![
            CeremonyEvent::SignatureProposal(SignatureProposalMessage::InitProposal(ParticipantsListRequest {
                participants,
                created_at: at(1),
            })),
            CeremonyEvent::SignatureProposal(SignatureProposalMessage::Confirm(ParticipantConfirmationRequest {
                fingerprint: fingerprint(b"pubkey-john"),
                decrypted_invitation: vec![1; 32],
                created_at: at(2),
            })),
            CeremonyEvent::SignatureProposal(SignatureProposalMessage::Confirm(ParticipantConfirmationRequest {
                fingerprint: fingerprint(b"pubkey-billy"),
                decrypted_invitation: vec![2; 32],
                created_at: at(3),
            })),
        ]
    }

    #[test]
    fn replaying_the_suffix_of_a_dump_matches_an_uninterrupted_run() {
        let mut uninterrupted = CeremonyMachine::new(CeremonyId::new("abc123"), 2, Deadlines::default());
        let mut dumps_by_offset = Vec::new();
        for event in replay_events() {
            uninterrupted.handle_event(event).expect("event applies");
            dumps_by_offset.push(uninterrupted.dump().expect("dump succeeds").encode().expect("encode succeeds"));
        }
        let final_dump = dumps_by_offset.last().expect("at least one event").clone();

        let midpoint = dumps_by_offset.len() / 2;
        let restored_dump = MachineDump::decode(&dumps_by_offset[midpoint - 1]).expect("decode succeeds");
        let mut restored = CeremonyMachine::from_dump(restored_dump);
        for event in replay_events().into_iter().skip(midpoint) {
            restored.handle_event(event).expect("event applies");
        }
        let replayed_final_dump = restored.dump().expect("dump succeeds").encode().expect("encode succeeds");

        assert_eq!(replayed_final_dump, final_dump);
    }
}
