//! The composed ceremony state machine tower.
//!
//! A ceremony moves through three machines in sequence: signature proposal admits a quorum and
//! collects invitation confirmations, DKG proposal runs the four key-generation sub-phases, and
//! signing proposal runs repeated signing rounds over the resulting master key. [`ceremony`]
//! expresses this as a single outer sum type so the dispatcher never has to special-case which
//! inner machine is currently running.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::iterator_step_by_zero,
    clippy::invalid_regex,
    clippy::string_slice,
    clippy::unimplemented,
    clippy::todo
)]

pub mod ceremony;
pub mod deadlines;
pub mod dkg_proposal;
pub mod dump;
pub mod requests;
pub mod signature_proposal;
pub mod signing_proposal;

pub use ceremony::{CeremonyEvent, CeremonyMachine, CeremonyOutcome};
pub use deadlines::Deadlines;
pub use dump::MachineDump;

/// Lift a [`dkg_types::CoordinationError`] into the kernel's error type.
///
/// `StateMachineState::handle_message` can only fail with a [`state_machine::errors::StateMachineError`],
/// so every validation failure in this crate is funneled through here before it crosses that
/// boundary.
pub(crate) fn kernel_err(error: dkg_types::CoordinationError) -> state_machine::errors::StateMachineError {
    state_machine::errors::StateMachineError::UnexpectedError(error.into())
}
