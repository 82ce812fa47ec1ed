//! # Signing and Verification
//!
//! ECDSA P-256 over the SHA-256 digest of the canonical unsigned encoding.
//!
//! The wire form of a signature is rigid: the two scalar components, each
//! left-zero-padded to exactly 32 bytes, concatenated to 64 bytes, then
//! base64 with the URL-safe alphabet and padding stripped. Not DER, not
//! any other structured encoding. The directory's verifier reconstitutes
//! the scalars by splitting the 64 bytes down the middle, so a DER-encoded
//! signature is not "slightly wrong", it is unverifiable.
//!
//! Verification failure is a negative result, not an error. Callers decide
//! whether a bad signature on fetched data is fatal.
//!
//! Obtaining a signature is a capability ([`OperationSigner`]) with two
//! implementations: [`KeypairSigner`] here, signing with a local rotation
//! key, and [`crate::hosting::HostedSigner`], asking a hosting service to
//! co-sign. Which one runs is caller policy, not control flow inside the
//! core.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::codec::{self, EncodeError};
use crate::hosting::HostingError;
use crate::keys::RotationKeypair;
use crate::operation::PlcOperation;

/// Raw signature width: two 32-byte scalars.
pub const SIGNATURE_LEN: usize = 64;

/// Errors while producing a signature.
#[derive(Debug, Error)]
pub enum SignError {
    /// Key material or nonce generation failed inside the ECDSA
    /// implementation. Deliberately unspecific.
    #[error("signing failed")]
    Signature(#[from] p256::ecdsa::Error),

    /// The record could not be canonically encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The hosting service refused or failed to co-sign.
    #[error("hosting service co-signing failed: {0}")]
    Hosting(#[from] HostingError),

    /// The co-signing exchange only carries operation fields; a tombstone
    /// must be signed locally.
    #[error("the hosting service cannot co-sign a tombstone")]
    HostedTombstone,
}

/// Sign the canonical unsigned bytes of a record.
///
/// Hashes with SHA-256 and signs the digest. Returns the text form of the
/// signature, ready to drop into the record's `sig` field.
pub fn sign_bytes(keypair: &RotationKeypair, unsigned: &[u8]) -> Result<String, SignError> {
    let signature: Signature = keypair
        .signing_key()
        .try_sign_digest(Sha256::new_with_prefix(unsigned))?;
    Ok(URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

/// Verify a signature text against a payload and public key.
///
/// Decodes the base64url text, splits it into the two 32-byte scalar
/// halves, and checks the signature over the payload's SHA-256 digest.
/// Any malformation (wrong alphabet, wrong length, scalar out of range)
/// verifies as `false`.
pub fn verify_bytes(key: &VerifyingKey, payload: &[u8], sig: &str) -> bool {
    let Ok(raw) = URL_SAFE_NO_PAD.decode(sig) else {
        return false;
    };
    if raw.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(signature) = Signature::from_slice(&raw) else {
        return false;
    };
    key.verify_digest(Sha256::new_with_prefix(payload), &signature)
        .is_ok()
}

/// Verify a signed record against a public key.
///
/// Re-encodes the record's unsigned form and checks the attached `sig`.
/// Unsigned records verify as `false`.
pub fn verify_operation(key: &VerifyingKey, op: &PlcOperation) -> bool {
    let Some(sig) = op.sig() else {
        return false;
    };
    let Ok(unsigned) = codec::unsigned_bytes(op) else {
        return false;
    };
    verify_bytes(key, &unsigned, sig)
}

/// The capability of turning an unsigned record into a signed one.
#[async_trait]
pub trait OperationSigner: Send + Sync {
    /// Produce a signed record equivalent to `op` with `sig` populated.
    async fn sign(&self, op: PlcOperation) -> Result<PlcOperation, SignError>;
}

/// Signs locally with a rotation keypair.
pub struct KeypairSigner {
    keypair: RotationKeypair,
}

impl KeypairSigner {
    pub fn new(keypair: RotationKeypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl OperationSigner for KeypairSigner {
    async fn sign(&self, op: PlcOperation) -> Result<PlcOperation, SignError> {
        let unsigned = codec::unsigned_bytes(&op)?;
        let sig = sign_bytes(&self.keypair, &unsigned)?;
        tracing::debug!(kind = op.type_name(), "signed operation with local key");
        Ok(op.into_signed(sig))
    }
}
