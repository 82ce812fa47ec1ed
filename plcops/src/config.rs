//! # Configuration
//!
//! Explicit configuration structs, passed into clients at construction.
//! The core reads no environment variables; the CLI maps its flags and
//! environment onto these values at the boundary.
//!
//! Protocol literals that must match the directory's expectations live
//! here too. If you are hardcoding one of these strings somewhere else,
//! stop.

use std::time::Duration;

/// The public directory of record.
pub const DEFAULT_DIRECTORY_ADDRESS: &str = "https://plc.directory";

/// Verification-method purpose name for the protocol signing key.
pub const SIGNING_KEY_PURPOSE: &str = "atproto";

/// Service-map key naming an identity's personal data server.
pub const PDS_SERVICE_NAME: &str = "atproto_pds";

/// Service-kind tag of a personal data server endpoint.
pub const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";

/// Default wall-clock budget for one directory or hosting round trip.
/// The core performs no retries, so this is the total time a call may take.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the directory service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base address, no trailing slash, e.g. `https://plc.directory`.
    pub address: String,
    pub timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DIRECTORY_ADDRESS.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl DirectoryConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

/// Where an identity's hosting service (PDS) lives.
#[derive(Debug, Clone)]
pub struct HostingConfig {
    /// Base address of the hosting service, no trailing slash.
    pub address: String,
    pub timeout: Duration,
}

impl HostingConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
