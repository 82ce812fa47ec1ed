//! # Canonical Encoder
//!
//! The one deterministic binary serialization of an operation. Its SHA-256
//! digest is what gets signed, and (with the signature included) hashed into
//! the identifier, so this encoding has to match the directory's accepted
//! layout bit for bit. There is no "close enough" here: a self-consistent
//! but divergent encoding produces signatures the directory will reject and
//! identifiers nobody else can derive.
//!
//! The encoding is CBOR with three canonicality rules:
//!
//! - Record fields appear in schema order: `type`, then the variant's
//!   fields in declaration order. Not alphabetical.
//! - Map-valued fields encode their keys in lexicographic order. This
//!   falls out of the model using `BTreeMap`, so two logically equal maps
//!   encode identically no matter how they were built.
//! - An unset `sig` is omitted entirely. The unsigned form is a 6-entry
//!   map (tombstone: 2) and the signed form a 7-entry map (tombstone: 3);
//!   it is not a `null` or empty-string placeholder.
//!
//! `prev: None` is the one optional field that *does* encode, as CBOR
//! null. The directory expects the key to be present on genesis records.

use crate::operation::PlcOperation;
use thiserror::Error;

/// Failure to produce canonical bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cbor encoding failed: {0}")]
    Cbor(#[from] ciborium::ser::Error<std::io::Error>),
}

/// Canonical bytes of the record with the signature stripped. This is the
/// byte string whose SHA-256 digest the signature covers.
pub fn unsigned_bytes(op: &PlcOperation) -> Result<Vec<u8>, EncodeError> {
    encode(&op.unsigned())
}

/// Canonical bytes of the record exactly as given. Call this on a signed
/// record to obtain the bytes the identifier is derived from.
pub fn signed_bytes(op: &PlcOperation) -> Result<Vec<u8>, EncodeError> {
    encode(op)
}

/// Canonical bytes with an explicit choice about the signature field.
pub fn canonical_bytes(op: &PlcOperation, include_sig: bool) -> Result<Vec<u8>, EncodeError> {
    if include_sig {
        signed_bytes(op)
    } else {
        unsigned_bytes(op)
    }
}

fn encode(op: &PlcOperation) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(op, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Operation, Service, Tombstone};
    use std::collections::BTreeMap;

    fn genesis() -> PlcOperation {
        let mut services = BTreeMap::new();
        services.insert(
            "atproto_pds".to_string(),
            Service::new("AtprotoPersonalDataServer", "https://pds.example.com"),
        );
        let mut methods = BTreeMap::new();
        methods.insert("atproto".to_string(), "did:key:zSigner".to_string());
        Operation::new(
            vec!["did:key:zRotation".to_string()],
            methods,
            vec!["at://alice.example.com".to_string()],
            services,
            None,
        )
        .unwrap()
        .into()
    }

    /// CBOR header for a text string of the given length (< 24).
    fn text_header(len: u8) -> u8 {
        0x60 | len
    }

    #[test]
    fn unsigned_operation_is_six_entry_map_with_type_first() {
        let bytes = unsigned_bytes(&genesis()).unwrap();
        // 0xa6: map(6). Then "type" (tstr(4)) and "plc_operation" (tstr(13)).
        let mut expected = vec![0xa6, text_header(4)];
        expected.extend_from_slice(b"type");
        expected.push(text_header(13));
        expected.extend_from_slice(b"plc_operation");
        assert_eq!(&bytes[..expected.len()], &expected[..]);
    }

    #[test]
    fn signed_operation_is_seven_entry_map() {
        let signed = genesis().into_signed("c2lnbmF0dXJl".to_string());
        let bytes = signed_bytes(&signed).unwrap();
        assert_eq!(bytes[0], 0xa7);
    }

    #[test]
    fn tombstone_maps_have_two_then_three_entries() {
        let t = PlcOperation::from(Tombstone::new("bafyprev").unwrap());
        assert_eq!(unsigned_bytes(&t).unwrap()[0], 0xa2);
        let signed = t.into_signed("c2ln".to_string());
        assert_eq!(signed_bytes(&signed).unwrap()[0], 0xa3);
    }

    #[test]
    fn genesis_prev_encodes_as_cbor_null() {
        let bytes = unsigned_bytes(&genesis()).unwrap();
        // "prev" followed by the null simple value (0xf6).
        let mut needle = vec![text_header(4)];
        needle.extend_from_slice(b"prev");
        needle.push(0xf6);
        assert!(
            bytes.windows(needle.len()).any(|w| w == needle),
            "genesis encoding must contain prev => null"
        );
    }

    #[test]
    fn encoding_is_deterministic_across_map_insertion_order() {
        let mut services_ab = BTreeMap::new();
        services_ab.insert("a_first".to_string(), Service::new("T", "https://a"));
        services_ab.insert("b_second".to_string(), Service::new("T", "https://b"));

        let mut services_ba = BTreeMap::new();
        services_ba.insert("b_second".to_string(), Service::new("T", "https://b"));
        services_ba.insert("a_first".to_string(), Service::new("T", "https://a"));

        let make = |services: BTreeMap<String, Service>| -> PlcOperation {
            Operation::new(
                vec!["did:key:zRotation".to_string()],
                BTreeMap::new(),
                vec![],
                services,
                None,
            )
            .unwrap()
            .into()
        };

        let one = unsigned_bytes(&make(services_ab)).unwrap();
        let two = unsigned_bytes(&make(services_ba)).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn repeated_encoding_is_byte_identical() {
        let op = genesis();
        assert_eq!(unsigned_bytes(&op).unwrap(), unsigned_bytes(&op).unwrap());
    }

    #[test]
    fn sig_omission_shrinks_and_diverges() {
        let unsigned = genesis();
        let signed = unsigned.clone().into_signed("c2lnbmF0dXJl".to_string());

        let unsigned_enc = unsigned_bytes(&unsigned).unwrap();
        let signed_enc = signed_bytes(&signed).unwrap();

        // The signed field is additive, not defaulted to empty: the
        // unsigned form is strictly shorter, and the two diverge at byte
        // zero (map arity), so neither is a prefix of the other.
        assert!(unsigned_enc.len() < signed_enc.len());
        assert_ne!(&signed_enc[..unsigned_enc.len()], &unsigned_enc[..]);
    }

    #[test]
    fn canonical_bytes_flag_selects_form() {
        let signed = genesis().into_signed("c2ln".to_string());
        assert_eq!(
            canonical_bytes(&signed, false).unwrap(),
            unsigned_bytes(&signed).unwrap()
        );
        assert_eq!(
            canonical_bytes(&signed, true).unwrap(),
            signed_bytes(&signed).unwrap()
        );
    }

    #[test]
    fn unsigned_bytes_of_signed_record_match_presign_bytes() {
        // Re-encoding the unsigned form of a signed record must reproduce
        // the exact bytes that were hashed for signing.
        let unsigned = genesis();
        let before = unsigned_bytes(&unsigned).unwrap();
        let signed = unsigned.into_signed("c2lnbmF0dXJl".to_string());
        assert_eq!(unsigned_bytes(&signed).unwrap(), before);
    }

    #[test]
    fn cbor_roundtrip_preserves_value() {
        let signed = genesis().into_signed("c2ln".to_string());
        let bytes = signed_bytes(&signed).unwrap();
        let back: PlcOperation = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(back, signed);
    }
}
