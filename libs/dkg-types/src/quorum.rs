//! The ordered set of participants admitted into a ceremony.

use crate::{
    errors::CoordinationError,
    participant::{Fingerprint, Participant, ParticipantIndex, ParticipantStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed set of participants admitted at signature-proposal time.
///
/// Participants are kept ordered by [`ParticipantIndex`] so that serializing a quorum is
/// deterministic: iteration order, and therefore dump bytes, never depend on insertion order or
/// on fingerprint hash values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quorum {
    participants: BTreeMap<ParticipantIndex, Participant>,
}

impl Quorum {
    /// Build a quorum from participants that are already indexed `[0, N)` without gaps.
    ///
    /// Returns [`CoordinationError::QuorumCollision`] if two participants share a fingerprint.
    pub fn new(participants: Vec<Participant>) -> Result<Self, CoordinationError> {
        let mut map = BTreeMap::new();
        let mut seen_fingerprints = std::collections::HashSet::new();
        for participant in participants {
            if !seen_fingerprints.insert(participant.fingerprint) {
                return Err(CoordinationError::QuorumCollision);
            }
            map.insert(participant.participant_index, participant);
        }
        Ok(Self { participants: map })
    }

    /// The number of participants in the quorum.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the quorum is empty.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Iterate over participants in `participant_index` order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Iterate mutably over participants in `participant_index` order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    /// Look up a participant by its index.
    pub fn get(&self, index: ParticipantIndex) -> Result<&Participant, CoordinationError> {
        self.participants.get(&index).ok_or_else(|| CoordinationError::UnknownParticipant(index.to_string()))
    }

    /// Look up a participant mutably by its index.
    pub fn get_mut(&mut self, index: ParticipantIndex) -> Result<&mut Participant, CoordinationError> {
        self.participants.get_mut(&index).ok_or_else(|| CoordinationError::UnknownParticipant(index.to_string()))
    }

    /// Look up a participant by its fingerprint.
    pub fn get_by_fingerprint(&self, fingerprint: Fingerprint) -> Result<&Participant, CoordinationError> {
        self.participants
            .values()
            .find(|p| p.fingerprint == fingerprint)
            .ok_or_else(|| CoordinationError::UnknownParticipant(fingerprint.to_string()))
    }

    /// Look up a participant mutably by its fingerprint.
    pub fn get_mut_by_fingerprint(
        &mut self,
        fingerprint: Fingerprint,
    ) -> Result<&mut Participant, CoordinationError> {
        self.participants
            .values_mut()
            .find(|p| p.fingerprint == fingerprint)
            .ok_or_else(|| CoordinationError::UnknownParticipant(fingerprint.to_string()))
    }

    /// Whether every participant currently has the given status.
    pub fn all_have_status(&self, status: ParticipantStatus) -> bool {
        self.participants.values().all(|p| p.status == status)
    }

    /// Whether any participant currently has the given status.
    pub fn any_have_status(&self, status: ParticipantStatus) -> bool {
        self.participants.values().any(|p| p.status == status)
    }

    /// Whether any participant's status is `predicate`-expired relative to `now`.
    pub fn any_expired<F>(&self, now: DateTime<Utc>, deadline: chrono::Duration, predicate: F) -> bool
    where
        F: Fn(&ParticipantStatus) -> bool,
    {
        self.participants.values().any(|p| predicate(&p.status) && p.is_expired(deadline, now))
    }

    /// Atomically set every participant's status to `status`, as required whenever a phase
    /// finishes and the next one's `AwaitConfirmation` status is entered for everyone at once.
    pub fn set_all_status(&mut self, status: ParticipantStatus, at: DateTime<Utc>) {
        for participant in self.participants.values_mut() {
            participant.set_status(status, at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Fingerprint;

    fn participant(index: u16, fingerprint: u8) -> Participant {
        Participant {
            participant_index: ParticipantIndex(index),
            title: format!("participant-{index}"),
            addr: "127.0.0.1:1000".to_string(),
            public_key: vec![0; 16],
            dkg_public_key: vec![0; 16],
            fingerprint: Fingerprint([fingerprint; 32]),
            invitation_secret: vec![9; 32],
            invitation_secret_encrypted: vec![1, 2, 3],
            status: ParticipantStatus::SignatureAwaitConfirmation,
            updated_at: Utc::now(),
            pub_key_share: None,
            commit: None,
            deal: None,
            response: None,
            master_key: None,
            partial_key: None,
        }
    }

    #[test]
    fn rejects_fingerprint_collisions() {
        let participants = vec![participant(0, 1), participant(1, 1)];
        assert!(matches!(Quorum::new(participants), Err(CoordinationError::QuorumCollision)));
    }

    #[test]
    fn iterates_in_index_order() {
        let participants = vec![participant(2, 3), participant(0, 1), participant(1, 2)];
        let quorum = Quorum::new(participants).expect("valid quorum");
        let indices: Vec<_> = quorum.iter().map(|p| p.participant_index.0).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn all_have_status_requires_unanimity() {
        let mut quorum = Quorum::new(vec![participant(0, 1), participant(1, 2)]).expect("valid quorum");
        assert!(quorum.all_have_status(ParticipantStatus::SignatureAwaitConfirmation));
        quorum.get_mut(ParticipantIndex(0)).expect("present").status = ParticipantStatus::SignatureConfirmed;
        assert!(!quorum.all_have_status(ParticipantStatus::SignatureAwaitConfirmation));
    }

    #[test]
    fn set_all_status_is_atomic_across_participants() {
        let mut quorum = Quorum::new(vec![participant(0, 1), participant(1, 2)]).expect("valid quorum");
        let now = Utc::now();
        quorum.set_all_status(ParticipantStatus::SignatureConfirmed, now);
        assert!(quorum.all_have_status(ParticipantStatus::SignatureConfirmed));
    }
}
