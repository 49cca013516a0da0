// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sponsor-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sponsorship token generation
//!
//! This module builds and signs the authorization tokens presented to the
//! downstream paymaster. Each token is a JWT whose claim set binds a
//! caller-supplied sender identity to this deployment's issuer and application
//! identifiers, with an expiry a configured validity window after issuance.
//!
//! Tokens are signed with the provisioned RSA private key using one of the
//! RS256/RS384/RS512 algorithms. No state is retained between issuances: the
//! issuer is a pure function of (key material, sender, clock).
//!
//! # Example Usage
//!
//! ```no_run
//! use sponsor_auth::config::Config;
//! use sponsor_auth::token::TokenIssuer;
//!
//! let config = Config::from_file("config.yaml").unwrap();
//! let issuer = TokenIssuer::from_config(&config).unwrap();
//! let token = issuer.issue("0xABC").unwrap();
//! ```

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{Config, MAX_VALIDITY_SECS};
use crate::keys::{KeyError, KeySource};

/// Claim set of a sponsorship authorization token
///
/// This structure defines the claims included in every token issued by this
/// service. It follows the standard JWT claims of RFC 7519 where they apply,
/// plus the `aid` and `sender` fields the paymaster expects.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SponsorClaims {
    /// Issuer
    ///
    /// Fixed string identifying this deployment to downstream verifiers.
    pub iss: String,

    /// Issued at timestamp
    ///
    /// The time at which the token was issued, represented as Unix time
    /// (seconds since 1970-01-01T00:00:00Z UTC).
    pub iat: i64,

    /// Expiration timestamp
    ///
    /// The time after which the token must not be accepted, represented as
    /// Unix time. Always strictly greater than `iat`.
    pub exp: i64,

    /// Application identifier
    ///
    /// The UUID assigned to the calling application by the paymaster's
    /// developer console. Constant for a given deployment.
    pub aid: Uuid,

    /// Sender identity
    ///
    /// The requester-supplied identity, in practice a blockchain account
    /// address. Carried verbatim: the service performs no normalization and,
    /// unless an allowlist is configured, no verification that the caller
    /// controls this identity. Downstream consumers must treat it as
    /// untrusted input.
    pub sender: String,
}

/// Errors raised while issuing a token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The private key could not be loaded
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The claim set could not be serialized or signed
    #[error("failed to sign claims: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Issues signed sponsorship tokens
///
/// Immutable once constructed; safe to share across concurrent request
/// handlers without synchronization.
pub struct TokenIssuer {
    keys: KeySource,
    algorithm: Algorithm,
    issuer: String,
    app_id: Uuid,
    validity: Duration,
    fixed_issued_at: Option<i64>,
}

impl TokenIssuer {
    /// Create a new issuer with default claim parameters
    pub fn new(keys: KeySource) -> Self {
        TokenIssuer {
            keys,
            algorithm: Algorithm::RS256,
            issuer: "sponsor-auth".to_string(),
            app_id: Uuid::nil(),
            validity: Duration::hours(1),
            fixed_issued_at: None,
        }
    }

    /// Build an issuer from the configuration
    ///
    /// In cached key mode this reads and parses the private key immediately,
    /// so a missing key file fails here rather than on the first request.
    pub fn from_config(config: &Config) -> Result<Self> {
        let keys = KeySource::from_config(&config.keys)
            .context("Failed to load signing key material")?;
        let algorithm = config.token.signing_algorithm()?;

        // Reject windows that would wrap or overflow the i64 expiry math
        let validity_secs = i64::try_from(config.token.validity_secs)
            .ok()
            .filter(|secs| (1..=MAX_VALIDITY_SECS as i64).contains(secs))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "token validity must be between 1 and {} seconds",
                    MAX_VALIDITY_SECS
                )
            })?;

        Ok(TokenIssuer {
            keys,
            algorithm,
            issuer: config.token.issuer.clone(),
            app_id: config.token.app_id,
            validity: Duration::seconds(validity_secs),
            fixed_issued_at: config.token.fixed_issued_at,
        })
    }

    /// Sets the JWT signing algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the issuer name used in the `iss` claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the application identifier used in the `aid` claim
    pub fn with_app_id(mut self, app_id: Uuid) -> Self {
        self.app_id = app_id;
        self
    }

    /// Set the validity of all issued tokens to the specified duration
    pub fn valid_for(mut self, duration: Duration) -> Self {
        self.validity = duration;
        self
    }

    /// Freeze the issued-at timestamp (testing hook)
    pub fn with_fixed_issued_at(mut self, iat: i64) -> Self {
        self.fixed_issued_at = Some(iat);
        self
    }

    /// Issue one signed token for the given sender
    ///
    /// The sender value is carried into the claim set verbatim. Issued-at is
    /// the current time unless a fixed override is configured; expiry is
    /// issued-at plus the validity window.
    pub fn issue(&self, sender: &str) -> Result<String, TokenError> {
        let iat = self
            .fixed_issued_at
            .unwrap_or_else(|| Utc::now().timestamp());
        let exp = iat + self.validity.num_seconds();

        let claims = SponsorClaims {
            iss: self.issuer.clone(),
            iat,
            exp,
            aid: self.app_id,
            sender: sender.to_string(),
        };

        let header = Header::new(self.algorithm);
        let key = self.keys.encoding_key()?;
        Ok(encode(&header, &claims, &key)?)
    }
}

/// Decode and verify a token against the deployment's public key
///
/// Intended for external verifiers and tests; the issuing service itself
/// never reads tokens back. Verification fails if the signature does not
/// match, if the token is expired, or if any segment was tampered with.
pub fn decode_claims(
    token: &str,
    public_key_pem: &[u8],
    algorithm: Algorithm,
) -> Result<SponsorClaims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_rsa_pem(public_key_pem)?;
    let validation = Validation::new(algorithm);
    let data = decode::<SponsorClaims>(token, &key, &validation)?;
    Ok(data.claims)
}
