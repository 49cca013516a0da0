// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the sponsor-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module implements configuration handling for the sponsor-auth service.
//! It supports loading, validating, and saving configuration from YAML files
//! using JSON Schema validation for robust error checking.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `service`: network binding for the issuance web server
//! - `token`: claim values and signing parameters for issued tokens
//! - `keys`: paths to the provisioned key files and the caching mode
//! - `access`: optional restrictions on which senders may obtain tokens
//!
//! ## Security Notes
//!
//! By default the service signs whatever `sender` value the caller supplies,
//! with no proof that the caller controls that identity. Deployments that need
//! that guarantee must set `access.sender_allowlist` (or add their own
//! verification in front of the service); the default open behavior exists for
//! trusted-caller demo setups only.
//!
//! ## Usage
//!
//! ```no_run
//! use sponsor_auth::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some(8081), Some("0.0.0.0".to_string()));
//!
//! // Access configuration values
//! println!("Server port: {}", config.service.port);
//! ```

use anyhow::{bail, Context, Result};
use jsonwebtoken::Algorithm;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use uuid::Uuid;

/// Upper bound for the token validity window, in seconds (100 years).
///
/// Keeps `exp` within `i64` range for any issued-at value and rejects
/// configurations whose expiry arithmetic would overflow.
pub const MAX_VALIDITY_SECS: u64 = 3_153_600_000;

/// Network settings for the issuance web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// The TCP port the web server will listen on.
    ///
    /// Valid range is 1-65534. Default value is 8080.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the web server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or a hostname. Default is "127.0.0.1".
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    /// Server identity reported in the `Server` response header.
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
        }
    }
}

/// Claim values and signing parameters for issued tokens.
///
/// Every token carries the fixed `issuer` and `app_id` claims from this
/// section, an issued-at timestamp, and an expiry `validity_secs` seconds
/// later. The signing algorithm selects the RSA digest size (RS256, RS384 or
/// RS512) and must match the provisioned key type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Issuer identifier placed in the `iss` claim of every token.
    ///
    /// A fixed string identifying this deployment to downstream verifiers.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Application identifier placed in the `aid` claim of every token.
    ///
    /// The UUID assigned to the calling application by the paymaster's
    /// developer console. The default is the nil UUID and must be replaced
    /// before tokens are accepted downstream.
    #[serde(default = "default_app_id")]
    pub app_id: Uuid,

    /// Token validity window in seconds.
    ///
    /// The `exp` claim is set to issued-at plus this value. Must be between
    /// 1 (so that expiry is strictly greater than issued-at) and
    /// [`MAX_VALIDITY_SECS`]. Default is 3600 (one hour).
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,

    /// JWT signing algorithm: "RS256", "RS384" or "RS512".
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Fixed issued-at timestamp override (seconds since epoch).
    ///
    /// When set, every token is issued with this `iat` instead of the current
    /// time. This exists for deterministic testing only; leaving it set in a
    /// deployment freezes the expiry of all issued tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_issued_at: Option<i64>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            app_id: default_app_id(),
            validity_secs: default_validity_secs(),
            algorithm: default_algorithm(),
            fixed_issued_at: None,
        }
    }
}

impl TokenConfig {
    /// Resolve the configured algorithm name to a `jsonwebtoken::Algorithm`
    pub fn signing_algorithm(&self) -> Result<Algorithm> {
        match self.algorithm.as_str() {
            "RS256" => Ok(Algorithm::RS256),
            "RS384" => Ok(Algorithm::RS384),
            "RS512" => Ok(Algorithm::RS512),
            other => bail!(
                "Unsupported signing algorithm '{}' (expected RS256, RS384 or RS512)",
                other
            ),
        }
    }
}

/// Locations of the provisioned key files and the key caching mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Path to the PKCS#1 PEM private key written by `rs256keygen`.
    ///
    /// Relative paths are resolved against the process working directory.
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,

    /// Path to the SPKI PEM public key written by `rs256keygen`.
    ///
    /// Not read by the service itself; recorded here so operators and
    /// external verifiers share one source of truth for the key location.
    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,

    /// Cache the private key in memory at startup.
    ///
    /// When `true` (the default) the key file is read and parsed once when the
    /// server starts; a missing key then fails fast instead of on the first
    /// request. When `false` the file is re-read on every request, which
    /// tolerates live key replacement at an I/O cost per token.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            private_key_path: default_private_key_path(),
            public_key_path: default_public_key_path(),
            cache: default_cache(),
        }
    }
}

/// Restrictions on which senders may obtain tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Optional allowlist of sender identities.
    ///
    /// When present, a token is only issued if the request's `sender` value
    /// matches one of these entries exactly; other requests are rejected with
    /// 403. When absent, any sender value is signed verbatim — the caller is
    /// trusted to claim identities it controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_allowlist: Option<Vec<String>>,
}

/// Root configuration structure for the sponsor-auth service.
///
/// Designed to be deserialized from and serialized to YAML using the serde
/// framework. The raw YAML is validated against a JSON schema before
/// deserialization so that operator mistakes surface as schema errors with a
/// generated sample file, not as serde messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the issuance web server.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Claim values and signing parameters.
    #[serde(default)]
    pub token: TokenConfig,

    /// Key file locations and caching mode.
    #[serde(default)]
    pub keys: KeyConfig,

    /// Sender access restrictions.
    #[serde(default)]
    pub access: AccessConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    "SponsorAuth".to_string()
}

fn default_issuer() -> String {
    "sponsor-auth".to_string()
}

fn default_app_id() -> Uuid {
    Uuid::nil()
}

fn default_validity_secs() -> u64 {
    3600
}

fn default_algorithm() -> String {
    "RS256".to_string()
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("private_key.pem")
}

fn default_public_key_path() -> PathBuf {
    PathBuf::from("public_key.pem")
}

fn default_cache() -> bool {
    true
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// If the file does not exist, a default configuration is written to the
    /// given path and returned. The raw YAML is validated against the embedded
    /// JSON schema before being deserialized.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        // Validate before deserializing to Config
        debug!("Validating {} configuration against schema", path.display());
        if let Err(err) = Self::validate_against_schema(&json_value) {
            error!("Configuration validation error before deserialization");
            // Generate a config.sample.yaml file with the default values
            // for the user to edit
            Self::create_sample_config(path)?;
            return Err(err);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                Self::create_sample_config(path)?;
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = Self::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate this configuration against the schema and the specific rules
    pub fn validate(&self) -> Result<()> {
        let json_value =
            serde_json::to_value(self).context("Failed to serialize configuration to JSON")?;
        Self::validate_against_schema(&json_value)?;
        Self::validate_specific_rules(self)
    }

    fn validate_against_schema(json_value: &serde_json::Value) -> Result<()> {
        let schema_str = include_str!("../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        if let Err(error) = validator.validate(json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }
        Ok(())
    }

    /// Rules the JSON schema cannot express
    fn validate_specific_rules(config: &Config) -> Result<()> {
        // Algorithm name must resolve to a supported RS* variant
        config.token.signing_algorithm()?;

        // Expiry must be strictly greater than issued-at, and the window must
        // stay within range of the i64 expiry arithmetic
        if config.token.validity_secs == 0 || config.token.validity_secs > MAX_VALIDITY_SECS {
            bail!(
                "token.validity_secs must be between 1 and {}",
                MAX_VALIDITY_SECS
            );
        }

        if let Some(allowlist) = &config.access.sender_allowlist {
            if allowlist.is_empty() {
                bail!("access.sender_allowlist must not be empty when present");
            }
        }

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the configuration
    /// loaded from the file.
    ///
    /// # Parameters
    ///
    /// * `web_port` - TCP port for the issuance web server
    /// * `web_address` - Network address for the issuance web server to bind to
    pub fn apply_args(&mut self, web_port: Option<u16>, web_address: Option<String>) {
        if let Some(web_port) = web_port {
            debug!("Overriding port from command line: {}", web_port);
            self.service.port = web_port;
        }

        if let Some(web_address) = web_address {
            debug!("Overriding address from command line: {}", web_address);
            self.service.address = web_address;
        }
    }
}
