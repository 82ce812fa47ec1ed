// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # plcops CLI
//!
//! Entry point for the `plcops` binary. Parses arguments, initializes
//! logging, and drives the operation workflows in the `plcops` library:
//!
//! - `keygen`    — generate a rotation keypair, write the key files
//! - `create`    — sign and submit a genesis operation, record the DID
//! - `rotate`    — promote the local key via the hosting service
//! - `tombstone` — sign and submit a tombstone for the recorded DID
//!
//! Results go to stdout; diagnostics go to stderr via `tracing`.

mod cli;
mod keyfiles;
mod logging;

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::Parser;

use plcops::codec;
use plcops::config::{
    DirectoryConfig, HostingConfig, PDS_SERVICE_NAME, PDS_SERVICE_TYPE, SIGNING_KEY_PURPOSE,
};
use plcops::did::derive_did;
use plcops::hosting::promote_rotation_key;
use plcops::{
    DirectoryClient, HostedSigner, HostingClient, KeypairSigner, Operation, OperationSigner,
    RotationKeypair, Service, Tombstone,
};

use cli::{Commands, CreateArgs, KeygenArgs, PlcopsCli, RotateArgs, TombstoneArgs};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("plcops=info,plcops_cli=info");
    let cli = PlcopsCli::parse();

    match cli.command {
        Commands::Keygen(args) => keygen(args),
        Commands::Create(args) => create(args).await,
        Commands::Rotate(args) => rotate(args).await,
        Commands::Tombstone(args) => tombstone(args).await,
    }
}

/// Generate a fresh rotation keypair and write both key files.
fn keygen(args: KeygenArgs) -> Result<()> {
    let keypair = RotationKeypair::generate();
    keyfiles::write_keypair(&args.public_key_file, &args.private_key_file, &keypair)?;
    tracing::info!(
        public = %args.public_key_file.display(),
        private = %args.private_key_file.display(),
        "wrote keypair"
    );
    println!("{}", keypair.did_key());
    Ok(())
}

/// Build, sign, and submit a genesis operation; record the derived DID.
async fn create(args: CreateArgs) -> Result<()> {
    let keypair = keyfiles::read_keypair(&args.private_key_file)?;
    let key = keypair.did_key();

    let mut methods = BTreeMap::new();
    methods.insert(SIGNING_KEY_PURPOSE.to_string(), key.clone());
    let mut services = BTreeMap::new();
    services.insert(
        PDS_SERVICE_NAME.to_string(),
        Service::new(PDS_SERVICE_TYPE, args.pds),
    );
    let genesis = Operation::new(
        vec![key],
        methods,
        vec![args.handle],
        services,
        None,
    )
    .context("building genesis operation")?;

    let signed = KeypairSigner::new(keypair)
        .sign(genesis.into())
        .await
        .context("signing genesis operation")?;

    let did = derive_did(&codec::signed_bytes(&signed)?);
    keyfiles::write_did(&args.did_file, &did)?;

    let client = DirectoryClient::new(DirectoryConfig::new(args.directory.directory))?;
    client
        .submit(&did, &signed)
        .await
        .context("submitting genesis operation")?;

    println!("{did}");
    Ok(())
}

/// Promote the local key to primary rotation key through the identity's
/// hosting service.
///
/// Two-phase by design: without a token this requests the authorization
/// email and stops; with one it obtains the co-signed operation and
/// submits it.
async fn rotate(args: RotateArgs) -> Result<()> {
    let public = keyfiles::read_public_key(&args.public_key_file)?;

    let directory = DirectoryClient::new(DirectoryConfig::new(args.directory.directory))?;
    let state = directory
        .current_state(&args.did)
        .await
        .context("fetching current directory state")?;

    if state.primary_rotation_key() == Some(public.as_str()) {
        tracing::info!("local key is already the primary rotation key; nothing to do");
        return Ok(());
    }

    let pds = state
        .services
        .get(PDS_SERVICE_NAME)
        .map(|s| s.endpoint.clone())
        .filter(|endpoint| !endpoint.is_empty());
    let Some(pds) = pds else {
        bail!("directory data names no PDS endpoint; cannot request a co-signature");
    };

    let mut hosting = HostingClient::new(HostingConfig::new(pds))?;
    hosting
        .login(&args.did, &args.password)
        .await
        .context("logging in to the hosting service")?;

    let Some(token) = args.token else {
        hosting
            .request_signature_token()
            .await
            .context("requesting the authorization token")?;
        println!(
            "Authorization token requested. Check the account's email, then re-run \
             with --token (or PLC_SIGNING_TOKEN)."
        );
        return Ok(());
    };

    let rotation_keys = promote_rotation_key(&public, &state.rotation_keys);
    let candidate = Operation::new(
        rotation_keys,
        BTreeMap::new(),
        Vec::new(),
        BTreeMap::new(),
        None,
    )
    .context("building rotation-key update")?;

    let signed = HostedSigner::new(hosting, token)
        .sign(candidate.into())
        .await
        .context("obtaining the co-signed operation")?;

    directory
        .submit(&args.did, &signed)
        .await
        .context("submitting the co-signed operation")?;

    println!("rotation keys updated for {}", args.did);
    Ok(())
}

/// Sign and submit a tombstone for the recorded identifier.
async fn tombstone(args: TombstoneArgs) -> Result<()> {
    let did = keyfiles::read_did(&args.did_file)?;
    let keypair = keyfiles::read_keypair(&args.private_key_file)?;

    let client = DirectoryClient::new(DirectoryConfig::new(args.directory.directory))?;
    let prev = client
        .latest_cid(&did)
        .await
        .context("resolving the last valid operation")?;

    let tombstone = Tombstone::new(prev).context("building tombstone")?;
    let signed = KeypairSigner::new(keypair)
        .sign(tombstone.into())
        .await
        .context("signing tombstone")?;

    client
        .submit(&did, &signed)
        .await
        .context("submitting tombstone")?;

    println!("tombstoned {did}");
    Ok(())
}
