// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sponsor-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sponsor_auth::keys::generate_rsa_keypair;

/// Generate the RSA key pair used to sign sponsorship tokens
///
/// One-time provisioning step, run before the server starts. Writes the
/// private key as an unencrypted PKCS#1 PEM and the public key as an SPKI
/// PEM. Existing files at the output paths are overwritten without warning.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Output path for the public key PEM file
    #[clap(long, default_value = "./public_key.pem")]
    out_pub_key: PathBuf,

    /// Output path for the private key PEM file
    #[clap(long, default_value = "./private_key.pem")]
    out_private_key: PathBuf,

    /// RSA key length in bits
    #[clap(long, default_value = "2048")]
    length: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Generating RSA key pair with {} bits...", args.length);

    let (private_pem, public_pem) = generate_rsa_keypair(args.length)?;

    // Write private key to file
    let mut private_file = File::create(&args.out_private_key).with_context(|| {
        format!(
            "Failed to create private key file at {:?}",
            args.out_private_key
        )
    })?;
    private_file
        .write_all(private_pem.as_bytes())
        .context("Failed to write private key to file")?;

    // Write public key to file
    let mut public_file = File::create(&args.out_pub_key)
        .with_context(|| format!("Failed to create public key file at {:?}", args.out_pub_key))?;
    public_file
        .write_all(public_pem.as_bytes())
        .context("Failed to write public key to file")?;

    println!("Private key written to: {:?}", args.out_private_key);
    println!("Public key written to: {:?}", args.out_pub_key);
    println!();
    println!("The server signs tokens with the private key; hand the public");
    println!("key to whoever needs to verify the issued tokens.");

    Ok(())
}
