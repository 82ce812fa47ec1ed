//! # Operation Model
//!
//! Typed records for the two things a did:plc chain is made of: operations
//! (genesis or update) and tombstones. These are pure data containers. The
//! only behavior they carry is field validation at construction; equality
//! and serialization derive entirely from field values.
//!
//! Two representation rules matter enough to call out here:
//!
//! 1. `verificationMethods` and `services` are [`BTreeMap`]s, not hash maps.
//!    The canonical encoding requires lexicographic key order, and encoding
//!    must not depend on the order a caller happened to insert entries.
//! 2. `sig` is `Option<String>` and is *omitted* from serialized forms when
//!    unset. The signature covers the encoding that lacks the `sig` field,
//!    so "absent" and "empty" are not the same thing and must never be
//!    conflated.
//!
//! A value is constructed fresh per submission attempt and never mutated
//! after its signature is computed. There is no local persistence of
//! submitted operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `type` literal carried by every operation record.
pub const OPERATION_TYPE: &str = "plc_operation";

/// The `type` literal carried by every tombstone record.
pub const TOMBSTONE_TYPE: &str = "plc_tombstone";

/// Errors raised by operation construction.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Every non-tombstone operation must carry at least one rotation key,
    /// otherwise the identity would be permanently unmodifiable.
    #[error("an operation must list at least one rotation key")]
    NoRotationKeys,

    /// A tombstone without a `prev` reference terminates nothing.
    #[error("a tombstone must reference the operation it terminates")]
    EmptyPrev,
}

/// A service endpoint advertised by an identity, e.g. its personal data
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Service-kind tag, e.g. `AtprotoPersonalDataServer`.
    pub r#type: String,
    /// Endpoint URL.
    pub endpoint: String,
}

impl Service {
    pub fn new(r#type: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// A genesis or update operation.
///
/// Field declaration order is load-bearing: the canonical encoder emits
/// fields in exactly this order (after the `type` tag). Do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Keys authorized to sign the next operation, in priority order.
    /// The first entry is the primary rotation key.
    pub rotation_keys: Vec<String>,
    /// Purpose name (e.g. `atproto`) to key-identifier string.
    pub verification_methods: BTreeMap<String, String>,
    /// URIs this identity claims, e.g. `at://` handles.
    pub also_known_as: Vec<String>,
    /// Named service endpoints.
    pub services: BTreeMap<String, Service>,
    /// Content identifier of the operation this one supersedes.
    /// `None` only for the very first operation of an identity.
    pub prev: Option<String>,
    /// Signature over the canonical encoding of everything above.
    /// `None` until signed; omitted from serialized forms while `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl Operation {
    /// Build an unsigned operation, validating the invariants the codec
    /// itself does not enforce.
    pub fn new(
        rotation_keys: Vec<String>,
        verification_methods: BTreeMap<String, String>,
        also_known_as: Vec<String>,
        services: BTreeMap<String, Service>,
        prev: Option<String>,
    ) -> Result<Self, OperationError> {
        if rotation_keys.is_empty() {
            return Err(OperationError::NoRotationKeys);
        }
        Ok(Self {
            rotation_keys,
            verification_methods,
            also_known_as,
            services,
            prev,
            sig: None,
        })
    }

    /// The primary rotation key, if any.
    pub fn primary_rotation_key(&self) -> Option<&str> {
        self.rotation_keys.first().map(String::as_str)
    }
}

/// A tombstone terminates an identity's operation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    /// Content identifier of the last valid operation. Required.
    pub prev: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl Tombstone {
    pub fn new(prev: impl Into<String>) -> Result<Self, OperationError> {
        let prev = prev.into();
        if prev.is_empty() {
            return Err(OperationError::EmptyPrev);
        }
        Ok(Self { prev, sig: None })
    }
}

/// The union of the two record variants, tagged by the `type` field.
///
/// Serde's internal tagging emits the tag as the first map entry, which is
/// exactly the position the directory's canonical layout requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlcOperation {
    #[serde(rename = "plc_operation")]
    Operation(Operation),
    #[serde(rename = "plc_tombstone")]
    Tombstone(Tombstone),
}

impl PlcOperation {
    /// The `type` literal this record serializes with.
    pub fn type_name(&self) -> &'static str {
        match self {
            PlcOperation::Operation(_) => OPERATION_TYPE,
            PlcOperation::Tombstone(_) => TOMBSTONE_TYPE,
        }
    }

    /// The signature, if the record has been signed.
    pub fn sig(&self) -> Option<&str> {
        match self {
            PlcOperation::Operation(op) => op.sig.as_deref(),
            PlcOperation::Tombstone(t) => t.sig.as_deref(),
        }
    }

    pub fn is_signed(&self) -> bool {
        self.sig().is_some()
    }

    /// Consume the record and attach a signature.
    ///
    /// Signing is a one-way door: the unsigned value is gone afterwards,
    /// which keeps "mutate after signing" bugs out of reach. Changing any
    /// field requires rebuilding and re-signing from scratch.
    pub fn into_signed(self, sig: String) -> Self {
        match self {
            PlcOperation::Operation(op) => PlcOperation::Operation(Operation {
                sig: Some(sig),
                ..op
            }),
            PlcOperation::Tombstone(t) => {
                PlcOperation::Tombstone(Tombstone { sig: Some(sig), ..t })
            }
        }
    }

    /// A copy with the signature stripped, i.e. the form whose digest the
    /// signature covers.
    pub fn unsigned(&self) -> Self {
        match self {
            PlcOperation::Operation(op) => {
                PlcOperation::Operation(Operation { sig: None, ..op.clone() })
            }
            PlcOperation::Tombstone(t) => {
                PlcOperation::Tombstone(Tombstone { sig: None, ..t.clone() })
            }
        }
    }
}

impl From<Operation> for PlcOperation {
    fn from(op: Operation) -> Self {
        PlcOperation::Operation(op)
    }
}

impl From<Tombstone> for PlcOperation {
    fn from(t: Tombstone) -> Self {
        PlcOperation::Tombstone(t)
    }
}
