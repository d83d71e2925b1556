// ABOUTME: Environment configuration management for the authorization server
// ABOUTME: Parses and validates issuer, token lifetimes, token format and the JWT secret
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::constants::{defaults, env_config};
use crate::crypto;
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use tracing::{info, warn};

/// Access token format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    /// HS256-signed JWT
    #[default]
    Jwt,
    /// Opaque `client:username:uuid` value
    Opaque,
}

impl TokenFormat {
    /// Parse from an environment value
    ///
    /// # Errors
    /// Returns an error for anything other than `jwt` or `opaque`
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "opaque" => Ok(Self::Opaque),
            other => bail!("Invalid {}: '{other}' (expected jwt or opaque)", env_config::TOKEN_FORMAT),
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt => f.write_str("jwt"),
            Self::Opaque => f.write_str("opaque"),
        }
    }
}

/// Token lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Authorization code lifetime
    pub authorization_code_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::seconds(defaults::ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::seconds(defaults::REFRESH_TOKEN_TTL_SECS),
            authorization_code_ttl: Duration::seconds(defaults::AUTH_CODE_TTL_SECS),
        }
    }
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Issuer label, used as the `iss` and `license` claims
    pub issuer: String,
    /// Token lifetimes
    pub tokens: TokenSettings,
    /// Access token format
    pub token_format: TokenFormat,
    /// HMAC secret for JWT access tokens
    pub jwt_secret: Vec<u8>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// A missing `JWT_SECRET` yields a random per-process secret.
    ///
    /// # Errors
    /// Returns an error if a variable is present but malformed, or validation fails
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let issuer = env_var_or(env_config::ISSUER, defaults::ISSUER);
        let tokens = TokenSettings {
            access_token_ttl: parse_ttl(
                env_config::ACCESS_TOKEN_TTL_SECS,
                defaults::ACCESS_TOKEN_TTL_SECS,
            )?,
            refresh_token_ttl: parse_ttl(
                env_config::REFRESH_TOKEN_TTL_SECS,
                defaults::REFRESH_TOKEN_TTL_SECS,
            )?,
            authorization_code_ttl: parse_ttl(
                env_config::AUTH_CODE_TTL_SECS,
                defaults::AUTH_CODE_TTL_SECS,
            )?,
        };
        let token_format = TokenFormat::parse(&env_var_or(env_config::TOKEN_FORMAT, "jwt"))?;
        let jwt_secret = load_jwt_secret()?;

        let config = Self {
            issuer,
            tokens,
            token_format,
            jwt_secret,
        };
        config.validate()?;

        info!("{}", config.summary());
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    /// Returns an error for an empty issuer, a non-positive lifetime, or a short secret
    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            bail!("{} must not be empty", env_config::ISSUER);
        }

        for (name, ttl) in [
            (env_config::ACCESS_TOKEN_TTL_SECS, self.tokens.access_token_ttl),
            (env_config::REFRESH_TOKEN_TTL_SECS, self.tokens.refresh_token_ttl),
            (env_config::AUTH_CODE_TTL_SECS, self.tokens.authorization_code_ttl),
        ] {
            if ttl <= Duration::zero() {
                bail!("{name} must be positive");
            }
        }

        if self.jwt_secret.len() < defaults::MIN_JWT_SECRET_BYTES {
            bail!(
                "{} must decode to at least {} bytes",
                env_config::JWT_SECRET,
                defaults::MIN_JWT_SECRET_BYTES
            );
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Twelvet Auth Configuration:\n\
             - Issuer: {}\n\
             - Token Format: {}\n\
             - Access Token TTL: {}s\n\
             - Refresh Token TTL: {}s\n\
             - Authorization Code TTL: {}s",
            self.issuer,
            self.token_format,
            self.tokens.access_token_ttl.num_seconds(),
            self.tokens.refresh_token_ttl.num_seconds(),
            self.tokens.authorization_code_ttl.num_seconds(),
        )
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("issuer", &self.issuer)
            .field("tokens", &self.tokens)
            .field("token_format", &self.token_format)
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse a lifetime in seconds
fn parse_ttl(key: &str, default_secs: i64) -> Result<Duration> {
    let raw = env_var_or(key, &default_secs.to_string());
    let secs: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid {key}: '{raw}' is not an integer number of seconds"))?;
    Ok(Duration::seconds(secs))
}

/// Decode `JWT_SECRET`, or generate one when unset
fn load_jwt_secret() -> Result<Vec<u8>> {
    match env::var(env_config::JWT_SECRET) {
        Ok(encoded) => general_purpose::STANDARD
            .decode(encoded.trim())
            .with_context(|| format!("{} is not valid base64", env_config::JWT_SECRET)),
        Err(_) => {
            warn!(
                "{} not set, generating an ephemeral signing secret; issued JWTs will not verify after restart",
                env_config::JWT_SECRET
            );
            crypto::random_bytes(64).context("Failed to generate JWT signing secret")
        }
    }
}
