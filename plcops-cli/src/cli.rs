//! # CLI Interface
//!
//! Defines the command-line argument structure for `plcops` using `clap`
//! derive. Four subcommands, one per operation workflow: `keygen`,
//! `create`, `rotate`, and `tombstone`.
//!
//! Environment variables are mapped to flags here, at the boundary. The
//! core library only ever sees explicit configuration.

use clap::{Args, Parser, Subcommand};
use plcops::config::DEFAULT_DIRECTORY_ADDRESS;
use std::path::PathBuf;

/// did:plc identity operation tooling.
///
/// Manages an identity's signed operation chain against the public
/// directory: key generation, genesis, rotation-key updates through a
/// hosting service, and tombstoning.
#[derive(Parser, Debug)]
#[command(
    name = "plcops",
    about = "did:plc identity operation tooling",
    version,
    propagate_version = true
)]
pub struct PlcopsCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh P-256 rotation keypair and write the key files.
    Keygen(KeygenArgs),
    /// Create a new identity: build, sign, and submit a genesis operation.
    Create(CreateArgs),
    /// Promote the local key to primary rotation key via the identity's
    /// hosting service (two invocations: request token, then sign).
    Rotate(RotateArgs),
    /// Terminate an identity's operation history with a signed tombstone.
    Tombstone(TombstoneArgs),
}

/// Where the directory service lives. Shared by every networked command.
#[derive(Args, Debug)]
pub struct DirectoryArgs {
    /// Base address of the directory service.
    #[arg(
        long = "directory",
        env = "PLC_DIRECTORY_ADDRESS",
        default_value = DEFAULT_DIRECTORY_ADDRESS
    )]
    pub directory: String,
}

/// Arguments for `keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the public key identifier (did:key text).
    #[arg(long, default_value = "key.pub")]
    pub public_key_file: PathBuf,

    /// Where to write the private key (SEC1 DER).
    #[arg(long, default_value = "key.priv")]
    pub private_key_file: PathBuf,
}

/// Arguments for `create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// Handle URI to claim, e.g. `at://alice.example.com`.
    #[arg(long)]
    pub handle: String,

    /// Endpoint URL of the identity's personal data server.
    #[arg(long)]
    pub pds: String,

    /// Private key to sign the genesis operation with.
    #[arg(long, default_value = "key.priv")]
    pub private_key_file: PathBuf,

    /// Where to record the derived identifier.
    #[arg(long, default_value = "did.txt")]
    pub did_file: PathBuf,
}

/// Arguments for `rotate`.
#[derive(Args, Debug)]
pub struct RotateArgs {
    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// The identifier whose rotation keys to update.
    #[arg(long, env = "PLC_DID")]
    pub did: String,

    /// Account password for the hosting-service login.
    #[arg(long, env = "PLC_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Authorization token from the hosting service's email. Omit on the
    /// first invocation to have the email sent.
    #[arg(long, env = "PLC_SIGNING_TOKEN")]
    pub token: Option<String>,

    /// Public key identifier to promote.
    #[arg(long, default_value = "key.pub")]
    pub public_key_file: PathBuf,
}

/// Arguments for `tombstone`.
#[derive(Args, Debug)]
pub struct TombstoneArgs {
    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// File holding the identifier to tombstone.
    #[arg(long, default_value = "did.txt")]
    pub did_file: PathBuf,

    /// Private key authorized to sign the tombstone.
    #[arg(long, default_value = "key.priv")]
    pub private_key_file: PathBuf,
}
