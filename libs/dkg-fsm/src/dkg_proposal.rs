//! DKG-proposal machine: the four sequential key-generation sub-phases.
//!
//! `PubKeys -> Commits -> Deals -> Responses -> MasterKey`, each following the same template:
//! `AwaitConfirmation -> Confirmed (all participants, resetting to the next phase's
//! AwaitConfirmation) | CanceledByError | CanceledByTimeout`. A single generic implementation
//! drives all four phases off the currently active [`DkgPhase`], which is what fixes the two bugs
//! the source had: the status set after a `ConfirmationError` always matches the phase that's
//! actually active (no copy-pasted phase-specific branches to drift out of sync), and every phase
//! uses the same error-before-timeout tie-break (the commits phase no longer swaps the pairing).

use crate::{
    kernel_err,
    requests::{PhaseConfirmationRequest, PhaseErrorRequest},
    Deadlines,
};
use chrono::{DateTime, Utc};
use dkg_types::{
    participant::{DkgPhase, Participant, ParticipantStatus},
    CoordinationError, Quorum,
};
use serde::{Deserialize, Serialize};
use state_machine::{StateMachineState, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult};

/// Input accepted by the DKG-proposal machine. The target phase is never carried in the
/// payload: it's always whichever phase [`DkgProposalState::AwaitConfirmations`] is currently in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DkgProposalMessage {
    /// A participant submitted its material for the current phase.
    Confirm(PhaseConfirmationRequest),
    /// A participant reported it could not produce its material for the current phase.
    Error(PhaseErrorRequest),
}

/// The DKG-proposal machine's state.
#[derive(Clone, Serialize, Deserialize)]
pub enum DkgProposalState {
    /// Waiting for every participant to confirm or error out of the current phase.
    AwaitConfirmations {
        /// The phase currently being collected.
        phase: DkgPhase,
        /// The quorum, reset to this phase's `AwaitConfirmation` status for everyone when entered.
        quorum: Quorum,
        /// Per-phase confirmation deadlines.
        deadlines: Deadlines,
        /// Timestamp of the most recently applied event.
        clock: DateTime<Utc>,
    },
    /// A participant errored out of `phase`; the ceremony is aborted.
    CanceledByError {
        /// The phase active when the error was observed.
        phase: DkgPhase,
        /// The quorum as it stood when the error was observed.
        quorum: Quorum,
    },
    /// `phase`'s confirmation deadline elapsed before every participant confirmed.
    CanceledByTimeout {
        /// The phase active when the timeout was observed.
        phase: DkgPhase,
        /// The quorum as it stood when the timeout was observed.
        quorum: Quorum,
    },
}

impl std::fmt::Display for DkgProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitConfirmations { phase, .. } => write!(f, "{phase}AwaitConfirmation"),
            Self::CanceledByError { phase, .. } => write!(f, "{phase}CanceledByError"),
            Self::CanceledByTimeout { phase, .. } => write!(f, "{phase}CanceledByTimeout"),
        }
    }
}

impl DkgProposalState {
    /// Build the initial state this machine starts in once the signature proposal collects: the
    /// quorum handed off already has every participant at `DkgAwaitConfirmation(PubKey)`.
    pub fn new(quorum: Quorum, deadlines: Deadlines, clock: DateTime<Utc>) -> Self {
        Self::AwaitConfirmations { phase: DkgPhase::PubKey, quorum, deadlines, clock }
    }

    /// The quorum underlying this state.
    pub fn quorum(&self) -> &Quorum {
        match self {
            Self::AwaitConfirmations { quorum, .. }
            | Self::CanceledByError { quorum, .. }
            | Self::CanceledByTimeout { quorum, .. } => quorum,
        }
    }

    /// The phase this state belongs to.
    pub fn phase(&self) -> DkgPhase {
        match self {
            Self::AwaitConfirmations { phase, .. }
            | Self::CanceledByError { phase, .. }
            | Self::CanceledByTimeout { phase, .. } => *phase,
        }
    }
}

fn phase_material_mut(participant: &mut Participant, phase: DkgPhase) -> &mut Option<Vec<u8>> {
    match phase {
        DkgPhase::PubKey => &mut participant.pub_key_share,
        DkgPhase::Commit => &mut participant.commit,
        DkgPhase::Deal => &mut participant.deal,
        DkgPhase::Response => &mut participant.response,
        DkgPhase::MasterKey => &mut participant.master_key,
    }
}

impl StateMachineState for DkgProposalState {
    type RecipientId = ();
    type InputMessage = DkgProposalMessage;
    type OutputMessage = ();
    type FinalResult = Quorum;

    fn is_completed(&self) -> bool {
        match self {
            Self::AwaitConfirmations { phase, quorum, deadlines, clock } => {
                let deadline = deadlines.for_dkg_phase(*phase);
                quorum.any_have_status(ParticipantStatus::DkgConfirmationError(*phase))
                    || quorum.any_expired(*clock, deadline, |s| *s == ParticipantStatus::DkgAwaitConfirmation(*phase))
                    || quorum.all_have_status(ParticipantStatus::DkgConfirmed(*phase))
            }
            Self::CanceledByError { .. } | Self::CanceledByTimeout { .. } => false,
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            Self::AwaitConfirmations { phase, mut quorum, deadlines, clock } => {
                if quorum.any_have_status(ParticipantStatus::DkgConfirmationError(phase)) {
                    Ok(StateMachineStateOutput::Empty(Self::CanceledByError { phase, quorum }))
                } else if quorum.any_expired(clock, deadlines.for_dkg_phase(phase), |s| {
                    *s == ParticipantStatus::DkgAwaitConfirmation(phase)
                }) {
                    Ok(StateMachineStateOutput::Empty(Self::CanceledByTimeout { phase, quorum }))
                } else {
                    match phase.next() {
                        Some(next_phase) => {
                            quorum.set_all_status(ParticipantStatus::DkgAwaitConfirmation(next_phase), clock);
                            Ok(StateMachineStateOutput::Empty(Self::AwaitConfirmations {
                                phase: next_phase,
                                quorum,
                                deadlines,
                                clock,
                            }))
                        }
                        None => Ok(StateMachineStateOutput::Final(quorum)),
                    }
                }
            }
            _ => Err(kernel_err(CoordinationError::EventNotPermitted)),
        }
    }

    fn handle_message(self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        match (message, self) {
            (DkgProposalMessage::Confirm(request), Self::AwaitConfirmations { phase, mut quorum, deadlines, .. }) => {
                request.validate().map_err(kernel_err)?;
                let participant = quorum.get_mut(request.participant_index).map_err(kernel_err)?;
                if participant.status != ParticipantStatus::DkgAwaitConfirmation(phase) {
                    return Err(kernel_err(CoordinationError::InvalidPhaseStatus {
                        participant: participant.participant_index.into(),
                        expected: ParticipantStatus::DkgAwaitConfirmation(phase).to_string(),
                        actual: participant.status.to_string(),
                    }));
                }
                *phase_material_mut(participant, phase) = Some(request.material);
                participant.set_status(ParticipantStatus::DkgConfirmed(phase), request.created_at);
                let next = Self::AwaitConfirmations { phase, quorum, deadlines, clock: request.created_at };
                next.advance_if_completed()
            }
            (DkgProposalMessage::Error(request), Self::AwaitConfirmations { phase, mut quorum, deadlines, .. }) => {
                let participant = quorum.get_mut(request.participant_index).map_err(kernel_err)?;
                match participant.status {
                    ParticipantStatus::DkgConfirmed(p) if p == phase => {
                        return Err(kernel_err(CoordinationError::AlreadyConfirmed(participant.participant_index.into())));
                    }
                    ParticipantStatus::DkgConfirmationError(p) if p == phase => {
                        return Err(kernel_err(CoordinationError::AlreadyErrored(participant.participant_index.into())));
                    }
                    ParticipantStatus::DkgAwaitConfirmation(p) if p == phase => {}
                    _ => {
                        return Err(kernel_err(CoordinationError::InvalidPhaseStatus {
                            participant: participant.participant_index.into(),
                            expected: ParticipantStatus::DkgAwaitConfirmation(phase).to_string(),
                            actual: participant.status.to_string(),
                        }));
                    }
                }
                participant.set_status(ParticipantStatus::DkgConfirmationError(phase), request.created_at);
                let next = Self::AwaitConfirmations { phase, quorum, deadlines, clock: request.created_at };
                next.advance_if_completed()
            }
            (_, state) => Ok(StateMachineStateOutput::Empty(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use dkg_types::{participant::Fingerprint, Participant, ParticipantIndex};
    use state_machine::StateMachine;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn participant(index: u16, status: ParticipantStatus, updated_at: DateTime<Utc>) -> Participant {
        Participant {
            participant_index: ParticipantIndex(index),
            title: format!("p{index}"),
            addr: "127.0.0.1:9000".to_string(),
            public_key: vec![0; 16],
            dkg_public_key: vec![0; 16],
            fingerprint: Fingerprint([index as u8; 32]),
            invitation_secret: vec![0; 32],
            invitation_secret_encrypted: vec![0; 32],
            status,
            updated_at,
            pub_key_share: None,
            commit: None,
            deal: None,
            response: None,
            master_key: None,
            partial_key: None,
        }
    }

    fn quorum_in_phase(n: u16, phase: DkgPhase, updated_at: DateTime<Utc>) -> Quorum {
        let participants =
            (0..n).map(|i| participant(i, ParticipantStatus::DkgAwaitConfirmation(phase), updated_at)).collect();
        Quorum::new(participants).expect("valid quorum")
    }

    #[test]
    fn all_confirmed_advances_every_participant_to_next_phase() {
        let quorum = quorum_in_phase(3, DkgPhase::PubKey, at(0));
        let mut sm = StateMachine::new(DkgProposalState::new(quorum, Deadlines::default(), at(0)));

        for index in 0..3u16 {
            sm.handle_message(DkgProposalMessage::Confirm(PhaseConfirmationRequest {
                participant_index: ParticipantIndex(index),
                material: vec![index as u8],
                created_at: at(1),
            }))
            .expect("confirm handled");
        }
        assert_eq!(sm.state().expect("state present").to_string(), "CommitAwaitConfirmation");
        assert!(sm.state().expect("state present").quorum().all_have_status(ParticipantStatus::DkgAwaitConfirmation(DkgPhase::Commit)));
    }

    #[test]
    fn error_beats_timeout_tie_break() {
        // Participant 0 stays `AwaitConfirmation` and will be expired by the time the triggering
        // event arrives; participant 1 has already errored out. Both conditions hold in the same
        // scan, and the error must win.
        let mut quorum = quorum_in_phase(3, DkgPhase::Commit, at(0));
        quorum.get_mut(ParticipantIndex(1)).expect("present").status = ParticipantStatus::DkgConfirmationError(DkgPhase::Commit);

        let mut deadlines = Deadlines::default();
        deadlines.commit_confirmation_secs = 10;
        let mut sm =
            StateMachine::new(DkgProposalState::AwaitConfirmations { phase: DkgPhase::Commit, quorum, deadlines, clock: at(0) });

        // Triggering event targets participant 2, not participant 0, so participant 0 remains
        // `AwaitConfirmation` (and expired) and participant 1 remains errored when the scan runs.
        sm.handle_message(DkgProposalMessage::Confirm(PhaseConfirmationRequest {
            participant_index: ParticipantIndex(2),
            material: vec![1],
            created_at: at(1_000),
        }))
        .expect("confirm handled");
        assert_eq!(sm.state().expect("state present").to_string(), "CommitCanceledByError");
    }

    #[test]
    fn master_key_phase_confirmed_yields_final_quorum() {
        let quorum = quorum_in_phase(1, DkgPhase::MasterKey, at(0));
        let mut sm = StateMachine::new(DkgProposalState::AwaitConfirmations {
            phase: DkgPhase::MasterKey,
            quorum,
            deadlines: Deadlines::default(),
            clock: at(0),
        });
        let output = sm
            .handle_message(DkgProposalMessage::Confirm(PhaseConfirmationRequest {
                participant_index: ParticipantIndex(0),
                material: vec![7],
                created_at: at(1),
            }))
            .expect("confirm handled");
        let quorum = output.into_final().expect("final quorum");
        assert!(quorum.all_have_status(ParticipantStatus::DkgConfirmed(DkgPhase::MasterKey)));
    }
}
