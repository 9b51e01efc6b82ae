//! Crypto adapter: content hashing and signature verification
//!
//! Everything else in the crate treats cryptography as an interface: a
//! [`hash`] function producing content addresses and a [`SignatureVerifier`]
//! checking input signatures. Two verifiers ship: an ECDSA/secp256k1 one for
//! realistic keys, and a deterministic stub for tests and simulations.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};
use sha2::{Digest as _, Sha256};

use crate::types::Digest;

/// Hash arbitrary bytes into a content address.
pub fn hash(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Digest(out)
}

/// Signature check over a canonical pre-image.
///
/// `public_key` is the address of the output being spent, `message` the
/// pre-image of the spending transaction at the input's position. A `false`
/// return is a validation rejection, never an error.
pub trait SignatureVerifier {
    fn verify_signature(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// ECDSA verification over secp256k1.
///
/// Addresses are serialized public keys (compressed or uncompressed),
/// signatures are compact or DER, and the signed digest is the SHA-256 of
/// the pre-image.
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify_signature(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = PublicKey::from_slice(public_key) else {
            return false;
        };
        let Ok(sig) = Signature::from_compact(signature).or_else(|_| Signature::from_der(signature))
        else {
            return false;
        };
        let Ok(msg) = Message::from_digest_slice(hash(message).as_bytes()) else {
            return false;
        };
        self.secp.verify_ecdsa(&msg, &sig, &key).is_ok()
    }
}

/// Deterministic in-memory scheme: the signature for (key, message) is the
/// digest of the key concatenated with the message. No secrets involved, so
/// anyone can forge; only suitable for tests and simulations.
pub struct StubVerifier;

impl SignatureVerifier for StubVerifier {
    fn verify_signature(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        signature == stub_sign(public_key, message)
    }
}

/// Produce the signature [`StubVerifier`] expects for (key, message).
pub fn stub_sign(public_key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(public_key.len() + message.len());
    preimage.extend_from_slice(public_key);
    preimage.extend_from_slice(message);
    hash(&preimage).as_bytes().to_vec()
}
