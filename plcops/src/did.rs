//! # Identifier Derivation
//!
//! A genesis identifier is a pure function of the signed canonical bytes:
//! SHA-256, base32 (standard RFC 4648 alphabet), first 24 characters,
//! lowercased, behind the `did:plc:` prefix. Change any field, including
//! the signature itself, and you have named a different identity.
//!
//! Only meaningful for genesis records. Updates and tombstones apply to an
//! existing identifier; hashing them derives nothing useful.

use data_encoding::BASE32;
use sha2::{Digest, Sha256};

/// Method prefix of derived identifiers.
pub const DID_PLC_PREFIX: &str = "did:plc:";

/// Length of the base32 suffix kept from the digest.
pub const DID_SUFFIX_LEN: usize = 24;

/// Derive the identifier from the canonical *signed* encoding.
pub fn derive_did(signed_bytes: &[u8]) -> String {
    let digest = Sha256::digest(signed_bytes);
    let suffix = BASE32.encode(digest.as_slice())[..DID_SUFFIX_LEN].to_ascii_lowercase();
    format!("{DID_PLC_PREFIX}{suffix}")
}

/// Whether a string has the shape of a derived identifier: the method
/// prefix followed by exactly 24 lowercase base32 characters.
pub fn is_plc_did(s: &str) -> bool {
    match s.strip_prefix(DID_PLC_PREFIX) {
        Some(suffix) => {
            suffix.len() == DID_SUFFIX_LEN
                && suffix
                    .bytes()
                    .all(|b| matches!(b, b'a'..=b'z' | b'2'..=b'7'))
        }
        None => false,
    }
}
