//! Long-term participant identity: signs log envelopes and is fingerprinted for quorum admission.

use crate::CryptoError;
use user_keypair::{ed25519::Ed25519PublicKey, PublicKey, Signature, SigningKey};

/// A participant's long-term signing keypair.
#[derive(Debug, Clone)]
pub struct LongTermKeypair(SigningKey);

impl LongTermKeypair {
    /// Generate a new long-term ed25519 keypair.
    pub fn generate() -> Self {
        Self(SigningKey::generate_ed25519())
    }

    /// Sign a log envelope's canonical bytes.
    pub fn sign(&self, data: &[u8]) -> Signature {
        self.0.sign(data)
    }

    /// The public key counterpart, as it should be stored in a [`dkg_types::Participant`] record.
    pub fn public_key(&self) -> LongTermPublicKey {
        LongTermPublicKey(self.0.public_key())
    }

    /// The signing key's raw secret bytes, for persistence in the key store.
    pub fn secret_bytes(&self) -> Vec<u8> {
        self.0.as_bytes()
    }
}

/// A participant's long-term public key, as stored in the quorum.
#[derive(Debug, Clone)]
pub struct LongTermPublicKey(PublicKey);

impl LongTermPublicKey {
    /// Decode a public key from the bytes stored in a [`dkg_types::Participant::public_key`]
    /// field.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: &[u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        let key = Ed25519PublicKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(key.into()))
    }

    /// The raw bytes to store in [`dkg_types::Participant::public_key`].
    pub fn as_bytes(&self) -> Vec<u8> {
        self.0.as_bytes()
    }

    /// Verify that `signature` is a valid signature by this key over `data`.
    pub fn verify(&self, signature: &[u8], data: &[u8]) -> Result<(), CryptoError> {
        self.0.verify(&signature.to_vec().into(), data).map_err(|_| CryptoError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips() {
        let keypair = LongTermKeypair::generate();
        let public_key = keypair.public_key();
        let encoded = public_key.as_bytes();
        let decoded = LongTermPublicKey::from_bytes(&encoded).expect("valid key");

        let signature: Vec<u8> = keypair.sign(b"hello").into();
        decoded.verify(&signature, b"hello").expect("signature should verify");
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keypair = LongTermKeypair::generate();
        let signature = keypair.sign(b"hello");
        let signature_bytes: Vec<u8> = signature.into();
        keypair.public_key().verify(&signature_bytes, b"goodbye").expect_err("should not verify");
    }
}
