//! Signature-proposal machine: admits a quorum and collects invitation confirmations.
//!
//! `Initial --InitProposal--> AwaitParticipantsConfirmations --(confirm/decline)*-->`
//! one of `ValidationCanceledByParticipant`, `ValidationCanceledByTimeout`, or a hand-off to the
//! DKG machine's first phase, carried as this machine's [`StateMachineState::FinalResult`].

use crate::{
    kernel_err,
    requests::{ParticipantConfirmationRequest, ParticipantInput, ParticipantsListRequest},
    Deadlines,
};
use chrono::{DateTime, Utc};
use dkg_crypto::fingerprint;
use dkg_types::{
    participant::{DkgPhase, Participant, ParticipantStatus},
    CoordinationError, ParticipantIndex, Quorum,
};
use serde::{Deserialize, Serialize};
use state_machine::{StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult};

/// Input accepted by the signature-proposal machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignatureProposalMessage {
    /// Admits a new quorum; only valid from [`SignatureProposalState::Initial`].
    InitProposal(ParticipantsListRequest),
    /// A participant's confirmation or decline of its invitation.
    Confirm(ParticipantConfirmationRequest),
}

/// The signature-proposal machine's state.
#[derive(Clone, Serialize, Deserialize)]
pub enum SignatureProposalState {
    /// No quorum admitted yet.
    Initial {
        /// Configured minimum quorum size.
        min_participants: u32,
        /// Per-phase confirmation deadlines.
        deadlines: Deadlines,
    },
    /// Waiting for every participant to confirm or decline its invitation.
    AwaitParticipantsConfirmations {
        /// The admitted quorum.
        quorum: Quorum,
        /// Per-phase confirmation deadlines.
        deadlines: Deadlines,
        /// Timestamp of the most recently applied event, used for deadline checks.
        clock: DateTime<Utc>,
    },
    /// A participant declined; the ceremony is aborted.
    ValidationCanceledByParticipant {
        /// The quorum as it stood when the decline was observed.
        quorum: Quorum,
    },
    /// The confirmation deadline elapsed before every participant confirmed.
    ValidationCanceledByTimeout {
        /// The quorum as it stood when the timeout was observed.
        quorum: Quorum,
    },
}

impl std::fmt::Display for SignatureProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial { .. } => "Initial",
            Self::AwaitParticipantsConfirmations { .. } => "AwaitParticipantsConfirmations",
            Self::ValidationCanceledByParticipant { .. } => "ValidationCanceledByParticipant",
            Self::ValidationCanceledByTimeout { .. } => "ValidationCanceledByTimeout",
        };
        write!(f, "{name}")
    }
}

impl SignatureProposalState {
    /// Start a fresh signature proposal.
    pub fn new(min_participants: u32, deadlines: Deadlines) -> Self {
        Self::Initial { min_participants, deadlines }
    }

    /// The quorum underlying this state, if one has been admitted yet.
    pub fn quorum(&self) -> Option<&Quorum> {
        match self {
            Self::Initial { .. } => None,
            Self::AwaitParticipantsConfirmations { quorum, .. }
            | Self::ValidationCanceledByParticipant { quorum }
            | Self::ValidationCanceledByTimeout { quorum } => Some(quorum),
        }
    }
}

fn admit_participant(input: ParticipantInput, index: u16, now: DateTime<Utc>) -> Participant {
    Participant {
        participant_index: ParticipantIndex(index),
        fingerprint: fingerprint(&input.public_key),
        title: input.title,
        addr: input.addr,
        public_key: input.public_key,
        dkg_public_key: input.dkg_public_key,
        invitation_secret: input.invitation_secret,
        invitation_secret_encrypted: input.encrypted_invitation,
        status: ParticipantStatus::SignatureAwaitConfirmation,
        updated_at: now,
        pub_key_share: None,
        commit: None,
        deal: None,
        response: None,
        master_key: None,
        partial_key: None,
    }
}

/// The response the dispatcher surfaces right after a successful `InitProposal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationsResponse {
    /// One entry per admitted participant.
    pub entries: Vec<crate::requests::ParticipantInvitationEntry>,
}

/// Build the response for a freshly admitted quorum, by reading back what was just stored.
pub fn build_invitations_response(quorum: &Quorum) -> InvitationsResponse {
    let entries = quorum
        .iter()
        .map(|p| crate::requests::ParticipantInvitationEntry {
            participant_index: p.participant_index,
            title: p.title.clone(),
            fingerprint: p.fingerprint,
            encrypted_invitation: p.invitation_secret_encrypted.clone(),
        })
        .collect();
    InvitationsResponse { entries }
}

impl StateMachineState for SignatureProposalState {
    type RecipientId = ();
    type InputMessage = SignatureProposalMessage;
    type OutputMessage = ();
    type FinalResult = Quorum;

    fn is_completed(&self) -> bool {
        match self {
            Self::AwaitParticipantsConfirmations { quorum, deadlines, clock } => {
                let deadline = deadlines.signature_confirmation();
                quorum.any_have_status(ParticipantStatus::SignatureDeclined)
                    || quorum.any_expired(*clock, deadline, |s| *s == ParticipantStatus::SignatureAwaitConfirmation)
                    || quorum.all_have_status(ParticipantStatus::SignatureConfirmed)
            }
            Self::Initial { .. }
            | Self::ValidationCanceledByParticipant { .. }
            | Self::ValidationCanceledByTimeout { .. } => false,
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            Self::AwaitParticipantsConfirmations { mut quorum, deadlines, clock } => {
                let deadline = deadlines.signature_confirmation();
                if quorum.any_have_status(ParticipantStatus::SignatureDeclined) {
                    Ok(StateMachineStateOutput::Empty(Self::ValidationCanceledByParticipant { quorum }))
                } else if quorum.any_expired(clock, deadline, |s| *s == ParticipantStatus::SignatureAwaitConfirmation) {
                    Ok(StateMachineStateOutput::Empty(Self::ValidationCanceledByTimeout { quorum }))
                } else {
                    quorum.set_all_status(ParticipantStatus::DkgAwaitConfirmation(DkgPhase::PubKey), clock);
                    Ok(StateMachineStateOutput::Final(quorum))
                }
            }
            _ => Err(kernel_err(CoordinationError::EventNotPermitted)),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        match (message, self) {
            (SignatureProposalMessage::InitProposal(request), Self::Initial { min_participants, deadlines }) => {
                request.validate(min_participants as usize).map_err(kernel_err)?;
                let mut seen_fingerprints = std::collections::HashSet::new();
                let mut participants = Vec::with_capacity(request.participants.len());
                for (index, input) in request.participants.into_iter().enumerate() {
                    let index = u16::try_from(index)
                        .map_err(|_| kernel_err(CoordinationError::InvalidRequest("too many participants".into())))?;
                    let participant = admit_participant(input, index, request.created_at);
                    if !seen_fingerprints.insert(participant.fingerprint) {
                        return Err(kernel_err(CoordinationError::QuorumCollision));
                    }
                    participants.push(participant);
                }
                let quorum = Quorum::new(participants).map_err(kernel_err)?;
                let next = Self::AwaitParticipantsConfirmations { quorum, deadlines, clock: request.created_at };
                next.advance_if_completed()
            }
            (
                SignatureProposalMessage::Confirm(request),
                Self::AwaitParticipantsConfirmations { mut quorum, deadlines, .. },
            ) => {
                let participant = quorum.get_mut_by_fingerprint(request.fingerprint).map_err(kernel_err)?;
                if participant.status != ParticipantStatus::SignatureAwaitConfirmation {
                    return Err(kernel_err(CoordinationError::InvalidPhaseStatus {
                        participant: participant.participant_index.into(),
                        expected: ParticipantStatus::SignatureAwaitConfirmation.to_string(),
                        actual: participant.status.to_string(),
                    }));
                }
                let confirmed = request.decrypted_invitation == participant.invitation_secret;
                let status = if confirmed { ParticipantStatus::SignatureConfirmed } else { ParticipantStatus::SignatureDeclined };
                participant.set_status(status, request.created_at);
                let next = Self::AwaitParticipantsConfirmations { quorum, deadlines, clock: request.created_at };
                next.advance_if_completed()
            }
            (_, state) => Ok(StateMachineStateOutput::Empty(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::ParticipantConfirmationRequest;
    use chrono::TimeZone;
    use state_machine::StateMachine;

    fn created_at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn deadlines(signature_confirmation_secs: i64) -> Deadlines {
        Deadlines { signature_confirmation_secs, ..Deadlines::default() }
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

    fn proposal(participants: Vec<ParticipantInput>, at: i64) -> SignatureProposalMessage {
        SignatureProposalMessage::InitProposal(ParticipantsListRequest { participants, created_at: created_at(at) })
    }

    #[test]
    fn happy_path_admits_quorum_and_awaits_confirmations() {
        let mut sm = StateMachine::new(SignatureProposalState::new(2, deadlines(300)));
        let participants =
            vec![participant_input("john", 1), participant_input("billy", 2), participant_input("matt", 3)];
        sm.handle_message(proposal(participants, 1)).expect("init proposal succeeds");
        assert_eq!(sm.state().expect("state present").to_string(), "AwaitParticipantsConfirmations");
        let quorum = sm.state().expect("state present").quorum().expect("quorum present");
        assert_eq!(quorum.len(), 3);
    }

    #[test]
    fn decline_cancels_proposal() {
        let mut sm = StateMachine::new(SignatureProposalState::new(2, deadlines(300)));
        let fingerprint = fingerprint(b"pubkey-john");
        let participants = vec![
            ParticipantInput { public_key: b"pubkey-john".to_vec(), ..participant_input("john", 1) },
            participant_input("billy", 2),
        ];
        sm.handle_message(proposal(participants, 1)).expect("init proposal succeeds");
        sm.handle_message(SignatureProposalMessage::Confirm(ParticipantConfirmationRequest {
            fingerprint,
            decrypted_invitation: vec![99; 32],
            created_at: created_at(2),
        }))
        .expect("confirm handled");
        assert_eq!(sm.state().expect("state present").to_string(), "ValidationCanceledByParticipant");
    }

    #[test]
    fn timeout_cancels_proposal_once_deadline_elapses_before_all_confirm() {
        // billy never confirms; once the deadline has elapsed, the next triggering event (here,
        // john finally confirming) finds billy still `AwaitConfirmation` past its deadline.
        let mut sm = StateMachine::new(SignatureProposalState::new(2, deadlines(60)));
        let participants = vec![participant_input("john", 1), participant_input("billy", 2)];
        sm.handle_message(proposal(participants, 1)).expect("init proposal succeeds");

        let fingerprint = fingerprint(b"pubkey-john");
        let late = created_at(1_000);
        let outcome = sm.handle_message(SignatureProposalMessage::Confirm(ParticipantConfirmationRequest {
            fingerprint,
            decrypted_invitation: vec![1; 32],
            created_at: late,
        }));
        assert!(outcome.is_ok());
        assert_eq!(sm.state().expect("state present").to_string(), "ValidationCanceledByTimeout");
    }

    #[test]
    fn all_confirmed_hands_off_to_dkg_pub_key_phase() {
        let mut sm = StateMachine::new(SignatureProposalState::new(2, deadlines(300)));
        let participants = vec![participant_input("john", 1), participant_input("billy", 2)];
        sm.handle_message(proposal(participants, 1)).expect("init proposal succeeds");

        sm.handle_message(SignatureProposalMessage::Confirm(ParticipantConfirmationRequest {
            fingerprint: fingerprint(b"pubkey-john"),
            decrypted_invitation: vec![1; 32],
            created_at: created_at(2),
        }))
        .expect("confirm handled");
        let output = sm
            .handle_message(SignatureProposalMessage::Confirm(ParticipantConfirmationRequest {
                fingerprint: fingerprint(b"pubkey-billy"),
                decrypted_invitation: vec![2; 32],
                created_at: created_at(3),
            }))
            .expect("confirm handled");
        let quorum = output.into_final().expect("final quorum");
        assert!(quorum.all_have_status(ParticipantStatus::DkgAwaitConfirmation(DkgPhase::PubKey)));
    }
}
