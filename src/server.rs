// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sponsor-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP layer of the token issuance service
//!
//! A single JSON endpoint, `POST /api/auth`, accepts `{"sender": "<string>"}`
//! and returns `{"token": "<jwt>"}`. The handler is stateless: the managed
//! [`AuthState`] holds an immutable [`TokenIssuer`] shared across concurrent
//! requests. Key-load and signing failures surface as 500; senders rejected by
//! the configured allowlist get 403.

use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{options, post, routes, Build, Rocket, State};
use rocket::{Request, Response};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::token::TokenIssuer;

/// Token request body
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    /// Requester identity, in practice a smart-account address
    pub sender: String,
}

/// Token response body
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The signed sponsorship token, to be forwarded as a bearer credential
    pub token: String,
}

/// Managed state shared by the request handlers
pub struct AuthState {
    issuer: TokenIssuer,
    sender_allowlist: Option<Vec<String>>,
}

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// Answers to OPTIONS requests
#[options("/<_path..>")]
async fn options(_path: PathBuf) -> Result<(), std::io::Error> {
    Ok(())
}

/// Issue one sponsorship token for the sender named in the request
///
/// The sender value is signed verbatim. Without an allowlist the service has
/// no proof the caller controls that identity; downstream consumers must not
/// treat the token alone as proof of sender authorization.
#[post("/auth", format = "json", data = "<request>")]
async fn auth(
    request: Json<AuthRequest>,
    state: &State<AuthState>,
) -> Result<Json<AuthResponse>, Status> {
    if let Some(allowlist) = &state.sender_allowlist {
        if !allowlist.iter().any(|allowed| allowed == &request.sender) {
            log::warn!("Rejected token request for unlisted sender {}", request.sender);
            return Err(Status::Forbidden);
        }
    }

    match state.issuer.issue(&request.sender) {
        Ok(token) => Ok(Json(AuthResponse { token })),
        Err(e) => {
            log::error!("Token issuance failed: {}", e);
            Err(Status::InternalServerError)
        }
    }
}

/// Build the Rocket instance for the issuance service
///
/// With key caching enabled this loads the private key immediately, so a
/// missing or corrupt key file fails the build instead of the first request.
pub fn build_rocket(figment: Figment, config: &Config) -> anyhow::Result<Rocket<Build>> {
    let state = AuthState {
        issuer: TokenIssuer::from_config(config)?,
        sender_allowlist: config.access.sender_allowlist.clone(),
    };

    Ok(rocket::custom(figment)
        .attach(CORS)
        .mount("/api", routes![auth, options])
        .manage(state))
}
