// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sponsor-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the sponsorship token issuance server

use anyhow::Result;
use clap::Parser;
use rocket::{
    config::LogLevel,
    data::{Limits, ToByteUnit},
};
use std::path::PathBuf;

use sponsor_auth::config::Config;
use sponsor_auth::server::build_rocket;

/// Authorization token issuance server for gasless transaction sponsorship
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Web server port, overrides the configuration file
    #[arg(short = 'p', long)]
    web_port: Option<u16>,

    /// Web server address, overrides the configuration file
    #[arg(short, long)]
    web_address: Option<String>,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.web_port, args.web_address);

    println!(
        "Token issuance server on {}:{}",
        config.service.address, config.service.port
    );

    let figment = rocket::Config::figment()
        .merge((
            "ident",
            format!("{}/{}", config.service.name, env!("CARGO_PKG_VERSION")),
        ))
        .merge(("limits", Limits::new().limit("json", 64.kibibytes())))
        .merge(("address", config.service.address.clone()))
        .merge(("port", config.service.port))
        .merge(("log_level", LogLevel::Normal));

    let rocket = build_rocket(figment, &config)?;
    let _ = rocket.launch().await?;

    Ok(())
}
