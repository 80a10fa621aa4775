//! Per-phase confirmation deadlines.
//!
//! The source machine reused a single deadline constant across three of the four DKG phases;
//! here every phase gets its own configurable value so an operator can tune them independently.

use chrono::Duration;
use dkg_types::DkgPhase;
use serde::{Deserialize, Serialize};

/// Confirmation deadlines, one per phase, expressed in seconds.
///
/// Kept in seconds (rather than [`Duration`] directly) so the type round-trips cleanly through
/// config files and the machine dump without pulling in `chrono`'s own serde representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlines {
    /// Deadline for signature-proposal invitation confirmations.
    pub signature_confirmation_secs: i64,
    /// Deadline for the pub-keys phase.
    pub pub_key_confirmation_secs: i64,
    /// Deadline for the commits phase.
    pub commit_confirmation_secs: i64,
    /// Deadline for the deals phase.
    pub deal_confirmation_secs: i64,
    /// Deadline for the responses phase.
    pub response_confirmation_secs: i64,
    /// Deadline for the master-key confirmation phase.
    pub master_key_confirmation_secs: i64,
    /// Deadline for signing-round confirmations.
    pub signing_confirmation_secs: i64,
}

impl Deadlines {
    /// The deadline that applies to a given DKG sub-phase.
    pub fn for_dkg_phase(&self, phase: DkgPhase) -> Duration {
        let secs = match phase {
            DkgPhase::PubKey => self.pub_key_confirmation_secs,
            DkgPhase::Commit => self.commit_confirmation_secs,
            DkgPhase::Deal => self.deal_confirmation_secs,
            DkgPhase::Response => self.response_confirmation_secs,
            DkgPhase::MasterKey => self.master_key_confirmation_secs,
        };
        Duration::seconds(secs)
    }

    /// The deadline for the signature-proposal confirmation phase.
    pub fn signature_confirmation(&self) -> Duration {
        Duration::seconds(self.signature_confirmation_secs)
    }

    /// The deadline for a signing round's confirmation phase.
    pub fn signing_confirmation(&self) -> Duration {
        Duration::seconds(self.signing_confirmation_secs)
    }
}

impl Default for Deadlines {
    /// Every phase defaults to five minutes; operators are expected to override these in config.
    fn default() -> Self {
        let five_minutes = 5 * 60;
        Self {
            signature_confirmation_secs: five_minutes,
            pub_key_confirmation_secs: five_minutes,
            commit_confirmation_secs: five_minutes,
            deal_confirmation_secs: five_minutes,
            response_confirmation_secs: five_minutes,
            master_key_confirmation_secs: five_minutes,
            signing_confirmation_secs: five_minutes,
        }
    }
}
