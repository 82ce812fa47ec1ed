//! # Local Key and Identifier Files
//!
//! The on-disk collaborators of the core: a public key-identifier text
//! file, a private key DER file, and the plain-text file holding the
//! derived identifier, written once at genesis.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use plcops::keys::RotationKeypair;

/// Write both halves of a keypair: the did:key text and the SEC1 DER.
/// The private key file is created owner-readable only.
pub fn write_keypair(
    public_path: &Path,
    private_path: &Path,
    keypair: &RotationKeypair,
) -> Result<()> {
    fs::write(public_path, keypair.did_key())
        .with_context(|| format!("writing public key to {}", public_path.display()))?;

    let der = keypair
        .to_sec1_der()
        .context("serializing private key")?;
    fs::write(private_path, der.as_slice())
        .with_context(|| format!("writing private key to {}", private_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(private_path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("restricting permissions on {}", private_path.display()))?;
    }

    Ok(())
}

/// Load the signing keypair from its DER file.
pub fn read_keypair(private_path: &Path) -> Result<RotationKeypair> {
    let der = fs::read(private_path)
        .with_context(|| format!("reading private key from {}", private_path.display()))?;
    RotationKeypair::from_sec1_der(&der)
        .with_context(|| format!("parsing private key in {}", private_path.display()))
}

/// Read the public key-identifier text.
pub fn read_public_key(public_path: &Path) -> Result<String> {
    let text = fs::read_to_string(public_path)
        .with_context(|| format!("reading public key from {}", public_path.display()))?;
    Ok(text.trim().to_string())
}

/// Record the derived identifier. Happens once, at genesis.
pub fn write_did(did_path: &Path, did: &str) -> Result<()> {
    fs::write(did_path, did)
        .with_context(|| format!("writing identifier to {}", did_path.display()))
}

/// Read the identifier back for later operations.
pub fn read_did(did_path: &Path) -> Result<String> {
    let text = fs::read_to_string(did_path)
        .with_context(|| format!("reading identifier from {}", did_path.display()))?;
    Ok(text.trim().to_string())
}
