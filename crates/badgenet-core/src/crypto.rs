//! Signing and verification contracts.
//!
//! BadgeNet carries optional payload authenticity (signed chat, signed
//! config overrides). The primitives themselves are external collaborators;
//! this module defines only the contracts the apps consume and the key
//! file conventions.
//!
//! Most badges carry only the event's public key and can verify; badges
//! with the matching private key (organizers) can also sign.

use std::path::PathBuf;

use crate::error::CryptoError;

/// Signature width used by the signed payload layouts.
pub const SIGNATURE_LEN: usize = 128;

/// Verifies detached signatures against the event's public key.
pub trait Verifier: Send + Sync {
    /// Whether `signature` is a valid signature over `message`.
    ///
    /// Malformed signatures simply fail verification; this never errors.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// Produces detached signatures with this node's private key.
pub trait Signer: Send + Sync {
    /// Sign `message`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::NoPrivateKey`] when the node has no private key (the
    /// common case; only organizer badges can sign).
    fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], CryptoError>;
}

/// Conventional path of a DER-encoded public key.
#[must_use]
pub fn public_key_path(name: &str) -> PathBuf {
    PathBuf::from(format!("/data/{name}_public.der"))
}

/// Conventional path of a DER-encoded private key.
#[must_use]
pub fn private_key_path(name: &str) -> PathBuf {
    PathBuf::from(format!("/data/{name}_private.der"))
}
