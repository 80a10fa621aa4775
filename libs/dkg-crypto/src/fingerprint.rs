//! Participant fingerprinting.

use dkg_types::participant::Fingerprint;
use sha2::{Digest, Sha256};

/// Compute the stable fingerprint for a participant's long-term public key.
pub fn fingerprint(public_key: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(public_key);
    Fingerprint(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        let key = b"pubkey123123";
        assert_eq!(fingerprint(key), fingerprint(key));
    }

    #[test]
    fn differs_for_different_keys() {
        assert_ne!(fingerprint(b"pubkey123123"), fingerprint(b"pubkey456456"));
    }
}
