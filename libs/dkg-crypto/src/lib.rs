//! The minimal, real crypto primitives the coordination core needs to run end to end.
//!
//! The threshold-crypto primitives (VSS commitments, deals, partial signatures) are out of scope
//! and are treated as opaque bytes everywhere in this workspace. This crate only covers the three
//! things the coordination core itself touches: computing a participant's fingerprint, sealing and
//! opening invitation secrets, and signing/verifying log envelopes.

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

pub mod fingerprint;
pub mod identity;
pub mod sealed_box;

pub use fingerprint::fingerprint;
pub use identity::{LongTermKeypair, LongTermPublicKey};
pub use sealed_box::{generate_invitation_secret, DkgKeypair, DkgPublicKey};

use thiserror::Error;

/// A crypto operation failed.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key was the wrong length or otherwise malformed.
    #[error("invalid key")]
    InvalidKey,

    /// A signature failed to verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// Sealing or opening an invitation secret failed.
    #[error("seal/open failure")]
    SealFailure,
}

impl From<CryptoError> for dkg_types::CoordinationError {
    fn from(error: CryptoError) -> Self {
        dkg_types::CoordinationError::CryptoFailure(error.to_string())
    }
}
