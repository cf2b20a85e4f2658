//! Ed25519 signing and SHA-256 hashing
//!
//! Every endorsement in the agreement protocol is an Ed25519 signature
//! over a proposed transaction's canonical bytes. This module holds the
//! per-party key material and the free verification helper used when
//! checking another party's endorsement against the directory key.

use crate::{Error, Result};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// A party's Ed25519 signing key plus its verifying half
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a fresh random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Derive a key pair from a 32-byte seed
    ///
    /// The same seed always yields the same keys; tests rely on this to
    /// pin down signature bytes.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Verifying key bytes, as registered with the identity directory
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Endorse a message (normally a transaction's canonical bytes)
    pub fn sign(&self, message: &[u8]) -> crate::types::Signature {
        crate::types::Signature::from_bytes(self.signing_key.sign(message).to_bytes())
    }

    /// Check an endorsement made with this key pair
    pub fn verify(&self, message: &[u8], signature: &crate::types::Signature) -> Result<()> {
        let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
        self.verifying_key
            .verify(message, &dalek_sig)
            .map_err(|e| Error::SignatureInvalid(e.to_string()))
    }
}

/// Check an endorsement against a bare verifying key
///
/// Returns `false` rather than an error for malformed keys; callers
/// treat an unverifiable endorsement the same as a wrong one.
pub fn verify_signature(
    message: &[u8],
    signature: &crate::types::Signature,
    public_key: &[u8; 32],
) -> bool {
    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// SHA-256 digest of arbitrary bytes
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
