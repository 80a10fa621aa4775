//! Sealing invitation secrets to a participant's ephemeral DKG public key.
//!
//! This implements the same anonymous sealed-box construction libsodium's `crypto_box_seal`
//! uses: an ephemeral X25519 keypair is generated per message, the shared secret is derived via
//! Diffie-Hellman with the recipient's static public key, the nonce is derived by hashing the two
//! public keys together (so it never needs to be transmitted), and the payload is encrypted with
//! XSalsa20-Poly1305. The output is `ephemeral_public_key || ciphertext`.

use crate::CryptoError;
use blake2::{digest::consts::U24, Blake2b, Digest};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use xsalsa20poly1305::{
    aead::{Aead, KeyInit},
    Nonce, XSalsa20Poly1305,
};

type Blake2b24 = Blake2b<U24>;

const PUBLIC_KEY_LEN: usize = 32;
const INVITATION_SECRET_LEN: usize = 32;

/// Draw a fresh 32-byte invitation secret. The caller seals it to the invitee's
/// [`DkgPublicKey`] and records both the clear and sealed copies on the `InitProposal` request
/// it builds; the machine itself never generates randomness.
pub fn generate_invitation_secret() -> [u8; INVITATION_SECRET_LEN] {
    use rand::RngCore;
    let mut secret = [0u8; INVITATION_SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    secret
}

/// A participant's ephemeral DKG keypair, generated at admission time and used only to receive
/// the sealed invitation secret.
pub struct DkgKeypair {
    secret: StaticSecret,
}

impl DkgKeypair {
    /// Generate a new ephemeral keypair.
    pub fn generate() -> Self {
        Self { secret: StaticSecret::random_from_rng(OsRng) }
    }

    /// The public half, as it should be stored in [`dkg_types::Participant::dkg_public_key`].
    pub fn public_key(&self) -> DkgPublicKey {
        DkgPublicKey(X25519PublicKey::from(&self.secret))
    }

    /// Open a sealed box addressed to this keypair's public key.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < PUBLIC_KEY_LEN {
            return Err(CryptoError::SealFailure);
        }
        let (ephemeral_bytes, ciphertext) = sealed.split_at(PUBLIC_KEY_LEN);
        let ephemeral_bytes: [u8; PUBLIC_KEY_LEN] = ephemeral_bytes.try_into().map_err(|_| CryptoError::SealFailure)?;
        let ephemeral_public = X25519PublicKey::from(ephemeral_bytes);
        let shared_secret = self.secret.diffie_hellman(&ephemeral_public);
        let nonce = derive_nonce(&ephemeral_public, &self.public_key().0);
        let cipher = XSalsa20Poly1305::new(shared_secret.as_bytes().into());
        cipher.decrypt(&nonce, ciphertext).map_err(|_| CryptoError::SealFailure)
    }
}

/// A participant's ephemeral DKG public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DkgPublicKey(X25519PublicKey);

impl DkgPublicKey {
    /// Decode a public key from the bytes stored in
    /// [`dkg_types::Participant::dkg_public_key`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(X25519PublicKey::from(bytes)))
    }

    /// The raw bytes to store in [`dkg_types::Participant::dkg_public_key`].
    pub fn as_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// Seal `plaintext` (the invitation secret) to this public key.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let ephemeral_secret = StaticSecret::random_from_rng(OsRng);
        let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);
        let shared_secret = ephemeral_secret.diffie_hellman(&self.0);
        let nonce = derive_nonce(&ephemeral_public, &self.0);
        let cipher = XSalsa20Poly1305::new(shared_secret.as_bytes().into());
        let ciphertext = cipher.encrypt(&nonce, plaintext).map_err(|_| CryptoError::SealFailure)?;

        let mut sealed = Vec::with_capacity(PUBLIC_KEY_LEN + ciphertext.len());
        sealed.extend_from_slice(ephemeral_public.as_bytes());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }
}

fn derive_nonce(ephemeral_public: &X25519PublicKey, recipient_public: &X25519PublicKey) -> Nonce {
    let mut hasher = Blake2b24::new();
    hasher.update(ephemeral_public.as_bytes());
    hasher.update(recipient_public.as_bytes());
    let digest = hasher.finalize();
    Nonce::from_slice(&digest).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_round_trips() {
        let keypair = DkgKeypair::generate();
        let secret = b"0123456789012345678901234567890123456789";
        let sealed = keypair.public_key().seal(secret).expect("seal should succeed");
        let opened = keypair.open(&sealed).expect("open should succeed");
        assert_eq!(opened, secret);
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let keypair = DkgKeypair::generate();
        let other = DkgKeypair::generate();
        let sealed = keypair.public_key().seal(b"secret").expect("seal should succeed");
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let keypair = DkgKeypair::generate();
        let mut sealed = keypair.public_key().seal(b"secret").expect("seal should succeed");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(keypair.open(&sealed).is_err());
    }
}
