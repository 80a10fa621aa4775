//! Signing-proposal machine: repeated signing rounds over an already-agreed master key.
//!
//! `SigningIdle --start--> AwaitConfirmations --(confirm/decline)*-->`
//! `AwaitPartialKeys --(partial/error)*--> PartialKeysCollected --restart--> SigningIdle`,
//! with `CancelledByParticipant`, `CancelledByTimeout` and `CancelledByError` branching off the
//! two await states. Unlike the signature-proposal and DKG-proposal machines, this one never
//! yields a [`StateMachineState::FinalResult`]: a restart cycles it back to `SigningIdle` so the
//! same master key can be reused across rounds, which is also why [`SigningProposalState`]
//! doesn't carry the master key itself, only the quorum that already produced it.

use crate::{
    kernel_err,
    requests::{PartialKeyErrorRequest, PartialKeyRequest, SigningConfirmationRequest, SigningStartRequest},
    Deadlines,
};
use chrono::{DateTime, Utc};
use dkg_types::{participant::ParticipantStatus, CoordinationError, Quorum};
use serde::{Deserialize, Serialize};
use state_machine::{StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult};
use std::convert::Infallible;

/// Input accepted by the signing-proposal machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SigningProposalMessage {
    /// Starts a new signing round; only valid from [`SigningProposalState::SigningIdle`].
    Start(SigningStartRequest),
    /// A participant's confirmation or decline of the current round.
    Confirm(SigningConfirmationRequest),
    /// A participant's partial signature for the current round.
    PartialKey(PartialKeyRequest),
    /// A participant reporting it could not produce its partial signature.
    PartialKeyError(PartialKeyErrorRequest),
    /// Resets a completed round back to [`SigningProposalState::SigningIdle`].
    Restart,
}

/// The signing-proposal machine's state.
#[derive(Clone, Serialize, Deserialize)]
pub enum SigningProposalState {
    /// No round in progress.
    SigningIdle {
        /// The quorum carried over from the DKG proposal (or a prior round).
        quorum: Quorum,
        /// Per-phase confirmation deadlines.
        deadlines: Deadlines,
    },
    /// Waiting for every participant to confirm or decline the current round.
    AwaitConfirmations {
        /// The quorum.
        quorum: Quorum,
        /// Per-phase confirmation deadlines.
        deadlines: Deadlines,
        /// Timestamp of the most recently applied event.
        clock: DateTime<Utc>,
        /// Caller-chosen identifier for this round.
        signing_id: String,
        /// Source bytes to be signed this round.
        payload: Vec<u8>,
    },
    /// Waiting for every confirmed participant to submit its partial signature.
    AwaitPartialKeys {
        /// The quorum.
        quorum: Quorum,
        /// Per-phase confirmation deadlines.
        deadlines: Deadlines,
        /// Timestamp of the most recently applied event.
        clock: DateTime<Utc>,
        /// Caller-chosen identifier for this round.
        signing_id: String,
        /// Source bytes to be signed this round.
        payload: Vec<u8>,
    },
    /// Every participant submitted its partial signature for this round.
    PartialKeysCollected {
        /// The quorum.
        quorum: Quorum,
        /// Per-phase confirmation deadlines, carried through so [`SigningProposalMessage::Restart`]
        /// can hand them back to the next [`SigningProposalState::SigningIdle`].
        deadlines: Deadlines,
        /// Caller-chosen identifier for this round.
        signing_id: String,
        /// Source bytes that were signed this round.
        payload: Vec<u8>,
    },
    /// A participant declined; the round is aborted.
    CancelledByParticipant {
        /// The quorum as it stood when the decline was observed.
        quorum: Quorum,
        /// The round that was aborted.
        signing_id: String,
    },
    /// The confirmation or partial-key deadline elapsed before every participant responded.
    CancelledByTimeout {
        /// The quorum as it stood when the timeout was observed.
        quorum: Quorum,
        /// The round that was aborted.
        signing_id: String,
    },
    /// A participant errored out of the partial-key phase; the round is aborted.
    CancelledByError {
        /// The quorum as it stood when the error was observed.
        quorum: Quorum,
        /// The round that was aborted.
        signing_id: String,
    },
}

impl std::fmt::Display for SigningProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SigningIdle { .. } => "SigningIdle",
            Self::AwaitConfirmations { .. } => "AwaitConfirmations",
            Self::AwaitPartialKeys { .. } => "AwaitPartialKeys",
            Self::PartialKeysCollected { .. } => "PartialKeysCollected",
            Self::CancelledByParticipant { .. } => "CancelledByParticipant",
            Self::CancelledByTimeout { .. } => "CancelledByTimeout",
            Self::CancelledByError { .. } => "CancelledByError",
        };
        write!(f, "{name}")
    }
}

impl SigningProposalState {
    /// Build the initial state this machine starts in once the DKG proposal collects the master
    /// key: the quorum handed off is reused as-is, with no round in progress yet.
    pub fn new(quorum: Quorum, deadlines: Deadlines) -> Self {
        Self::SigningIdle { quorum, deadlines }
    }

    /// The quorum underlying this state.
    pub fn quorum(&self) -> &Quorum {
        match self {
            Self::SigningIdle { quorum, .. }
            | Self::AwaitConfirmations { quorum, .. }
            | Self::AwaitPartialKeys { quorum, .. }
            | Self::PartialKeysCollected { quorum, .. }
            | Self::CancelledByParticipant { quorum, .. }
            | Self::CancelledByTimeout { quorum, .. }
            | Self::CancelledByError { quorum, .. } => quorum,
        }
    }
}

impl StateMachineState for SigningProposalState {
    type RecipientId = ();
    type InputMessage = SigningProposalMessage;
    type OutputMessage = ();
    type FinalResult = Infallible;

    fn is_completed(&self) -> bool {
        match self {
            Self::AwaitConfirmations { quorum, deadlines, clock, .. } => {
                let deadline = deadlines.signing_confirmation();
                quorum.any_have_status(ParticipantStatus::SigningDeclined)
                    || quorum.any_expired(*clock, deadline, |s| *s == ParticipantStatus::SigningAwaitConfirmation)
                    || quorum.all_have_status(ParticipantStatus::SigningConfirmed)
            }
            Self::AwaitPartialKeys { quorum, deadlines, clock, .. } => {
                let deadline = deadlines.signing_confirmation();
                quorum.any_have_status(ParticipantStatus::PartialKeyConfirmationError)
                    || quorum.any_expired(*clock, deadline, |s| *s == ParticipantStatus::PartialKeyAwaitConfirmation)
                    || quorum.all_have_status(ParticipantStatus::PartialKeyConfirmed)
            }
            Self::SigningIdle { .. }
            | Self::PartialKeysCollected { .. }
            | Self::CancelledByParticipant { .. }
            | Self::CancelledByTimeout { .. }
            | Self::CancelledByError { .. } => false,
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            Self::AwaitConfirmations { mut quorum, deadlines, clock, signing_id, payload } => {
                let deadline = deadlines.signing_confirmation();
                if quorum.any_have_status(ParticipantStatus::SigningDeclined) {
                    Ok(StateMachineStateOutput::Empty(Self::CancelledByParticipant { quorum, signing_id }))
                } else if quorum.any_expired(clock, deadline, |s| *s == ParticipantStatus::SigningAwaitConfirmation) {
                    Ok(StateMachineStateOutput::Empty(Self::CancelledByTimeout { quorum, signing_id }))
                } else {
                    quorum.set_all_status(ParticipantStatus::PartialKeyAwaitConfirmation, clock);
                    for participant in quorum.iter_mut() {
                        participant.partial_key = None;
                    }
                    Ok(StateMachineStateOutput::Empty(Self::AwaitPartialKeys {
                        quorum,
                        deadlines,
                        clock,
                        signing_id,
                        payload,
                    }))
                }
            }
            Self::AwaitPartialKeys { quorum, deadlines, clock, signing_id, payload } => {
                let deadline = deadlines.signing_confirmation();
                if quorum.any_have_status(ParticipantStatus::PartialKeyConfirmationError) {
                    Ok(StateMachineStateOutput::Empty(Self::CancelledByError { quorum, signing_id }))
                } else if quorum.any_expired(clock, deadline, |s| *s == ParticipantStatus::PartialKeyAwaitConfirmation)
                {
                    Ok(StateMachineStateOutput::Empty(Self::CancelledByTimeout { quorum, signing_id }))
                } else {
                    Ok(StateMachineStateOutput::Empty(Self::PartialKeysCollected {
                        quorum,
                        deadlines,
                        signing_id,
                        payload,
                    }))
                }
            }
            _ => Err(kernel_err(CoordinationError::EventNotPermitted)),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        match (message, self) {
            (SigningProposalMessage::Start(request), Self::SigningIdle { mut quorum, deadlines }) => {
                request.validate().map_err(kernel_err)?;
                quorum.set_all_status(ParticipantStatus::SigningAwaitConfirmation, request.created_at);
                let next = Self::AwaitConfirmations {
                    quorum,
                    deadlines,
                    clock: request.created_at,
                    signing_id: request.signing_id,
                    payload: request.payload,
                };
                next.advance_if_completed()
            }
            (
                SigningProposalMessage::Confirm(request),
                Self::AwaitConfirmations { mut quorum, deadlines, signing_id, payload, .. },
            ) => {
                let participant = quorum.get_mut(request.participant_index).map_err(kernel_err)?;
                if participant.status != ParticipantStatus::SigningAwaitConfirmation {
                    return Err(kernel_err(CoordinationError::InvalidPhaseStatus {
                        participant: participant.participant_index.into(),
                        expected: ParticipantStatus::SigningAwaitConfirmation.to_string(),
                        actual: participant.status.to_string(),
                    }));
                }
                let status =
                    if request.confirmed { ParticipantStatus::SigningConfirmed } else { ParticipantStatus::SigningDeclined };
                participant.set_status(status, request.created_at);
                let next = Self::AwaitConfirmations {
                    quorum,
                    deadlines,
                    clock: request.created_at,
                    signing_id,
                    payload,
                };
                next.advance_if_completed()
            }
            (
                SigningProposalMessage::PartialKey(request),
                Self::AwaitPartialKeys { mut quorum, deadlines, signing_id, payload, .. },
            ) => {
                request.validate().map_err(kernel_err)?;
                let participant = quorum.get_mut(request.participant_index).map_err(kernel_err)?;
                if participant.status != ParticipantStatus::PartialKeyAwaitConfirmation {
                    return Err(kernel_err(CoordinationError::InvalidPhaseStatus {
                        participant: participant.participant_index.into(),
                        expected: ParticipantStatus::PartialKeyAwaitConfirmation.to_string(),
                        actual: participant.status.to_string(),
                    }));
                }
                participant.partial_key = Some(request.partial_key);
                participant.set_status(ParticipantStatus::PartialKeyConfirmed, request.created_at);
                let next = Self::AwaitPartialKeys {
                    quorum,
                    deadlines,
                    clock: request.created_at,
                    signing_id,
                    payload,
                };
                next.advance_if_completed()
            }
            (
                SigningProposalMessage::PartialKeyError(request),
                Self::AwaitPartialKeys { mut quorum, deadlines, signing_id, payload, .. },
            ) => {
                let participant = quorum.get_mut(request.participant_index).map_err(kernel_err)?;
                match participant.status {
                    ParticipantStatus::PartialKeyConfirmed => {
                        return Err(kernel_err(CoordinationError::AlreadyConfirmed(participant.participant_index.into())));
                    }
                    ParticipantStatus::PartialKeyConfirmationError => {
                        return Err(kernel_err(CoordinationError::AlreadyErrored(participant.participant_index.into())));
                    }
                    ParticipantStatus::PartialKeyAwaitConfirmation => {}
                    _ => {
                        return Err(kernel_err(CoordinationError::InvalidPhaseStatus {
                            participant: participant.participant_index.into(),
                            expected: ParticipantStatus::PartialKeyAwaitConfirmation.to_string(),
                            actual: participant.status.to_string(),
                        }));
                    }
                }
                participant.set_status(ParticipantStatus::PartialKeyConfirmationError, request.created_at);
                let next = Self::AwaitPartialKeys {
                    quorum,
                    deadlines,
                    clock: request.created_at,
                    signing_id,
                    payload,
                };
                next.advance_if_completed()
            }
            (SigningProposalMessage::Restart, Self::PartialKeysCollected { quorum, deadlines, .. }) => {
                Ok(StateMachineStateOutput::Empty(Self::SigningIdle { quorum, deadlines }))
            }
            (_, state) => Ok(StateMachineStateOutput::Empty(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dkg_types::{
        participant::{Fingerprint, ParticipantIndex},
        Participant,
    };
    use state_machine::StateMachine;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn participant(index: u16) -> Participant {
        Participant {
            participant_index: ParticipantIndex(index),
            title: format!("p{index}"),
            addr: "127.0.0.1:9000".to_string(),
            public_key: vec![0; 16],
            dkg_public_key: vec![0; 16],
            fingerprint: Fingerprint([index as u8; 32]),
            invitation_secret: vec![0; 32],
            invitation_secret_encrypted: vec![0; 32],
            status: ParticipantStatus::DkgConfirmed(dkg_types::DkgPhase::MasterKey),
            updated_at: at(0),
            pub_key_share: None,
            commit: None,
            deal: None,
            response: None,
            master_key: Some(vec![7; 32]),
            partial_key: None,
        }
    }

    fn idle(n: u16) -> SigningProposalState {
        let participants = (0..n).map(participant).collect();
        let quorum = Quorum::new(participants).expect("valid quorum");
        SigningProposalState::new(quorum, Deadlines::default())
    }

    fn start(signing_id: &str, at_secs: i64) -> SigningProposalMessage {
        SigningProposalMessage::Start(SigningStartRequest {
            signing_id: signing_id.to_string(),
            payload: b"message to sign".to_vec(),
            created_at: at(at_secs),
        })
    }

    #[test]
    fn full_round_collects_partial_keys_and_restarts() {
        let mut sm = StateMachine::new(idle(2));
        sm.handle_message(start("round-1", 1)).expect("start succeeds");
        assert_eq!(sm.state().expect("state present").to_string(), "AwaitConfirmations");

        for index in 0..2u16 {
            sm.handle_message(SigningProposalMessage::Confirm(SigningConfirmationRequest {
                participant_index: ParticipantIndex(index),
                confirmed: true,
                created_at: at(2),
            }))
            .expect("confirm handled");
        }
        assert_eq!(sm.state().expect("state present").to_string(), "AwaitPartialKeys");

        for index in 0..2u16 {
            sm.handle_message(SigningProposalMessage::PartialKey(PartialKeyRequest {
                participant_index: ParticipantIndex(index),
                partial_key: vec![index as u8; 8],
                created_at: at(3),
            }))
            .expect("partial key handled");
        }
        assert_eq!(sm.state().expect("state present").to_string(), "PartialKeysCollected");

        sm.handle_message(SigningProposalMessage::Restart).expect("restart handled");
        assert_eq!(sm.state().expect("state present").to_string(), "SigningIdle");

        sm.handle_message(start("round-2", 4)).expect("second start succeeds");
        assert_eq!(sm.state().expect("state present").to_string(), "AwaitConfirmations");
        assert!(sm
            .state()
            .expect("state present")
            .quorum()
            .all_have_status(ParticipantStatus::SigningAwaitConfirmation));
    }

    #[test]
    fn decline_cancels_round() {
        let mut sm = StateMachine::new(idle(2));
        sm.handle_message(start("round-1", 1)).expect("start succeeds");
        sm.handle_message(SigningProposalMessage::Confirm(SigningConfirmationRequest {
            participant_index: ParticipantIndex(0),
            confirmed: false,
            created_at: at(2),
        }))
        .expect("confirm handled");
        assert_eq!(sm.state().expect("state present").to_string(), "CancelledByParticipant");
    }

    #[test]
    fn partial_key_error_cancels_round() {
        let mut sm = StateMachine::new(idle(2));
        sm.handle_message(start("round-1", 1)).expect("start succeeds");
        for index in 0..2u16 {
            sm.handle_message(SigningProposalMessage::Confirm(SigningConfirmationRequest {
                participant_index: ParticipantIndex(index),
                confirmed: true,
                created_at: at(2),
            }))
            .expect("confirm handled");
        }
        sm.handle_message(SigningProposalMessage::PartialKeyError(PartialKeyErrorRequest {
            participant_index: ParticipantIndex(0),
            created_at: at(3),
        }))
        .expect("error handled");
        assert_eq!(sm.state().expect("state present").to_string(), "CancelledByError");
    }
}
