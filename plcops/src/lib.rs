// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # plcops — did:plc Operation Tooling
//!
//! Client-side machinery for a DID method whose source of truth is an
//! append-only, hash-chained public directory. An identity is nothing but a
//! chain of signed operations: each one asserts the current rotation keys,
//! verification methods, linked identifiers and service endpoints, and
//! references the hash of the operation it supersedes. The directory accepts
//! an operation only if it is signed by an authorized rotation key and its
//! `prev` pointer matches the current head of the chain.
//!
//! The dangerous part of this system is not the networking. It is the
//! canonical byte encoding: the identifier is a hash of the signed bytes,
//! and the signature covers a hash of the unsigned bytes. One byte out of
//! place and you get a verifiable-but-wrong signature or an identifier
//! nobody else can reproduce. Everything in this crate is organized around
//! getting those bytes right.
//!
//! ## Modules
//!
//! - **operation** — Typed operation and tombstone records.
//! - **codec** — The one true canonical CBOR encoding.
//! - **signing** — ECDSA P-256 over the canonical digest; the
//!   `OperationSigner` capability for local and hosted signing.
//! - **did** — Identifier derivation from signed canonical bytes.
//! - **keys** — Key generation, did:key encoding, private key persistence.
//! - **audit** — Resolving the chain head from the directory's audit log.
//! - **directory** — HTTP client for the directory service.
//! - **hosting** — Co-signing through a hosting service (PDS).
//! - **config** — Explicit configuration passed in by the caller.
//!
//! ## Design notes
//!
//! The core takes no implicit environment dependency. Callers construct
//! [`config::DirectoryConfig`] / [`config::HostingConfig`] and hand them in.
//! No component retries: a rejected submission is surfaced verbatim so the
//! operator can re-resolve the chain head and decide what to do.

pub mod audit;
pub mod codec;
pub mod config;
pub mod did;
pub mod directory;
pub mod hosting;
pub mod keys;
pub mod operation;
pub mod signing;

pub use audit::AuditLogEntry;
pub use config::{DirectoryConfig, HostingConfig};
pub use directory::DirectoryClient;
pub use hosting::{HostedSigner, HostingClient};
pub use keys::RotationKeypair;
pub use operation::{Operation, PlcOperation, Service, Tombstone};
pub use signing::{KeypairSigner, OperationSigner};
