//! # Key Material
//!
//! P-256 rotation keys and their two textual encodings.
//!
//! The public half travels inside operations as a self-describing key
//! identifier: compressed SEC1 point, prefixed with the varint multicodec
//! tag for "p256-pub" (0x1200), base58btc encoded, wrapped in the multibase
//! marker `z` and the `did:key:` scheme label. Every such identifier for a
//! P-256 key therefore starts with `did:key:zDn`.
//!
//! The private half persists as SEC1 DER (RFC 5915). No canonical-hash
//! property is required of it, only round-trip fidelity: decoding must
//! reproduce an equivalent signing key.
//!
//! Key material is read-only once loaded. Secret bytes are never logged,
//! never printed by `Debug`, and DER buffers are zeroized on drop.

use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::SecretKey;
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroizing;

/// Scheme label for key identifiers.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Multibase marker for base58btc.
const MULTIBASE_BASE58BTC: char = 'z';

/// Multicodec tag for a compressed P-256 public key.
const MULTICODEC_P256_PUB: u64 = 0x1200;

/// Errors decoding stored or transmitted key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key identifier must start with 'did:key:'")]
    MissingScheme,

    #[error("expected base58btc multibase marker 'z', got {0:?}")]
    WrongMultibase(char),

    #[error("invalid base58 in key identifier")]
    Base58(#[from] bs58::decode::Error),

    #[error("truncated multicodec prefix")]
    TruncatedPrefix,

    #[error("unsupported multicodec tag {0:#x}, expected p256-pub (0x1200)")]
    UnsupportedKeyType(u64),

    #[error("invalid P-256 point in key identifier")]
    InvalidPoint,

    #[error("invalid private key DER")]
    InvalidPrivateKey,
}

/// A P-256 keypair authorized (or intended to be authorized) to sign
/// operations for an identity.
///
/// Does not implement `Serialize`; exporting the secret is a deliberate
/// act through [`RotationKeypair::to_sec1_der`], not a side effect of
/// shoving a keypair into a JSON body.
#[derive(Clone)]
pub struct RotationKeypair {
    secret: SecretKey,
}

impl RotationKeypair {
    /// Generate a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Load a keypair from SEC1 DER bytes (RFC 5915), the on-disk private
    /// key format.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_sec1_der(der).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self { secret })
    }

    /// Serialize the private key as SEC1 DER for local persistence.
    /// The returned buffer is zeroized when dropped.
    pub fn to_sec1_der(&self) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        self.secret
            .to_sec1_der()
            .map_err(|_| KeyError::InvalidPrivateKey)
    }

    /// The public verification key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(self.secret.public_key())
    }

    /// The signing key, for use by the signer module.
    pub(crate) fn signing_key(&self) -> SigningKey {
        SigningKey::from(&self.secret)
    }

    /// The public key-identifier string used inside `rotationKeys` and
    /// `verificationMethods`.
    pub fn did_key(&self) -> String {
        encode_did_key(&self.verifying_key())
    }
}

impl std::fmt::Debug for RotationKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material, not even partially.
        write!(f, "RotationKeypair({})", self.did_key())
    }
}

impl PartialEq for RotationKeypair {
    /// Keypairs compare by public key. Comparing secret scalars in
    /// non-constant time is a habit not worth acquiring.
    fn eq(&self, other: &Self) -> bool {
        self.verifying_key() == other.verifying_key()
    }
}

impl Eq for RotationKeypair {}

/// Encode a public key as a `did:key:` identifier string.
pub fn encode_did_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(true);
    let mut tagged = encode_uvarint(MULTICODEC_P256_PUB);
    tagged.extend_from_slice(point.as_bytes());
    let encoded = bs58::encode(tagged)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_string();
    format!("{DID_KEY_PREFIX}{MULTIBASE_BASE58BTC}{encoded}")
}

/// Decode a `did:key:` identifier string back into a verification key.
pub fn decode_did_key(s: &str) -> Result<VerifyingKey, KeyError> {
    let multibase = s.strip_prefix(DID_KEY_PREFIX).ok_or(KeyError::MissingScheme)?;
    let mut chars = multibase.chars();
    match chars.next() {
        Some(MULTIBASE_BASE58BTC) => {}
        Some(other) => return Err(KeyError::WrongMultibase(other)),
        None => return Err(KeyError::TruncatedPrefix),
    }
    let tagged = bs58::decode(chars.as_str())
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()?;
    let (tag, point) = decode_uvarint(&tagged).ok_or(KeyError::TruncatedPrefix)?;
    if tag != MULTICODEC_P256_PUB {
        return Err(KeyError::UnsupportedKeyType(tag));
    }
    VerifyingKey::from_sec1_bytes(point).map_err(|_| KeyError::InvalidPoint)
}

/// Unsigned LEB128 varint, as used for multicodec tags.
fn encode_uvarint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a varint prefix, returning the value and the remaining bytes.
/// `None` if the input ends mid-varint.
fn decode_uvarint(bytes: &[u8]) -> Option<(u64, &[u8])> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i as u32);
        if byte & 0x80 == 0 {
            return Some((value, &bytes[i + 1..]));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_key_roundtrip() {
        let kp = RotationKeypair::generate();
        let id = kp.did_key();
        let decoded = decode_did_key(&id).unwrap();
        assert_eq!(decoded, kp.verifying_key());
    }

    #[test]
    fn p256_did_keys_start_with_zdn() {
        // The fixed multicodec prefix plus a compressed point (first byte
        // 0x02 or 0x03) pins the leading base58 characters.
        let kp = RotationKeypair::generate();
        assert!(kp.did_key().starts_with("did:key:zDn"), "{}", kp.did_key());
    }

    #[test]
    fn uvarint_encodes_p256_tag_as_two_bytes() {
        assert_eq!(encode_uvarint(0x1200), vec![0x80, 0x24]);
        let (value, rest) = decode_uvarint(&[0x80, 0x24, 0x02]).unwrap();
        assert_eq!(value, 0x1200);
        assert_eq!(rest, &[0x02]);
    }

    #[test]
    fn uvarint_roundtrip_small_values() {
        for v in [0u64, 1, 0x7f, 0x80, 0xed, 0x1200, 0x3fff, 0x4000] {
            let enc = encode_uvarint(v);
            let (back, rest) = decode_uvarint(&enc).unwrap();
            assert_eq!(back, v);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn decode_rejects_missing_scheme() {
        let err = decode_did_key("zDnaExample").unwrap_err();
        assert!(matches!(err, KeyError::MissingScheme));
    }

    #[test]
    fn decode_rejects_wrong_multibase() {
        let err = decode_did_key("did:key:f0123abc").unwrap_err();
        assert!(matches!(err, KeyError::WrongMultibase('f')));
    }

    #[test]
    fn decode_rejects_bad_base58() {
        // '0' and 'l' are not in the Bitcoin alphabet.
        let err = decode_did_key("did:key:z0l0l0l").unwrap_err();
        assert!(matches!(err, KeyError::Base58(_)));
    }

    #[test]
    fn decode_rejects_foreign_multicodec_tag() {
        // An ed25519-pub tagged key (0xed): right container, wrong curve.
        let mut tagged = encode_uvarint(0xed);
        tagged.extend_from_slice(&[0x01; 32]);
        let id = format!(
            "did:key:z{}",
            bs58::encode(tagged)
                .with_alphabet(bs58::Alphabet::BITCOIN)
                .into_string()
        );
        let err = decode_did_key(&id).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedKeyType(0xed)));
    }

    #[test]
    fn decode_rejects_invalid_point() {
        let mut tagged = encode_uvarint(0x1200);
        tagged.extend_from_slice(&[0xff; 33]);
        let id = format!(
            "did:key:z{}",
            bs58::encode(tagged)
                .with_alphabet(bs58::Alphabet::BITCOIN)
                .into_string()
        );
        let err = decode_did_key(&id).unwrap_err();
        assert!(matches!(err, KeyError::InvalidPoint));
    }

    #[test]
    fn sec1_der_roundtrip() {
        let kp = RotationKeypair::generate();
        let der = kp.to_sec1_der().unwrap();
        let restored = RotationKeypair::from_sec1_der(&der).unwrap();
        assert_eq!(kp, restored);
        assert_eq!(kp.did_key(), restored.did_key());
    }

    #[test]
    fn garbage_der_rejected() {
        let err = RotationKeypair::from_sec1_der(&[0x30, 0x03, 0x01, 0x01, 0xff]).unwrap_err();
        assert!(matches!(err, KeyError::InvalidPrivateKey));
    }

    #[test]
    fn generated_keys_are_distinct() {
        let a = RotationKeypair::generate();
        let b = RotationKeypair::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = RotationKeypair::generate();
        let debug = format!("{kp:?}");
        assert!(debug.starts_with("RotationKeypair(did:key:z"));
        let der = kp.to_sec1_der().unwrap();
        // The DER bytes must not show up, hex or otherwise.
        assert!(!debug.contains(&format!("{:02x?}", &der[..8])));
    }
}
