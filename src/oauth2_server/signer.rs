// ABOUTME: Token signers turning finalized access token claims into a token value
// ABOUTME: HS256 JWT signer via jsonwebtoken and an opaque client:username:jti signer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::{claims, defaults, service_names};
use crate::errors::{AppError, AppResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::fmt;

/// Produces a token value from finalized claims
pub trait TokenSigner: Send + Sync {
    /// Sign or otherwise encode `claims`
    ///
    /// # Errors
    /// `ServerError` if the claims cannot be encoded
    fn sign(&self, claims: &Map<String, Value>) -> AppResult<String>;
}

/// HS256 JWT signer
pub struct JwtTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtTokenSigner {
    /// Create a signer from a shared secret
    ///
    /// # Errors
    /// `ServerError` if the secret is shorter than the configured minimum
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> AppResult<Self> {
        if secret.len() < defaults::MIN_JWT_SECRET_BYTES {
            return Err(AppError::server_error(format!(
                "JWT secret must be at least {} bytes",
                defaults::MIN_JWT_SECRET_BYTES
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        })
    }

    /// Verify a token issued by this signer and return its claims
    ///
    /// # Errors
    /// `InvalidGrant` if the signature, issuer, audience or expiry check fails
    pub fn verify(&self, token: &str) -> AppResult<Map<String, Value>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[service_names::TOKEN_AUDIENCE]);
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::invalid_grant("Token verification failed").with_source(e))
    }
}

impl TokenSigner for JwtTokenSigner {
    fn sign(&self, claims: &Map<String, Value>) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::server_error("Failed to encode access token").with_source(e))
    }
}

impl fmt::Debug for JwtTokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenSigner")
            .field("algorithm", &"HS256")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Opaque `<client_id>:<username>:<jti>` token values
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueTokenSigner;

impl OpaqueTokenSigner {
    fn required<'a>(claims_map: &'a Map<String, Value>, name: &str) -> AppResult<&'a str> {
        claims_map
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::server_error(format!("Opaque token needs the {name} claim")))
    }
}

impl TokenSigner for OpaqueTokenSigner {
    fn sign(&self, claims_map: &Map<String, Value>) -> AppResult<String> {
        let client_id = Self::required(claims_map, claims::CLIENT_ID)?;
        let username = claims_map
            .get(claims::USERNAME)
            .and_then(Value::as_str)
            .map_or_else(|| Self::required(claims_map, claims::SUB), Ok)?;
        let jti = Self::required(claims_map, claims::JTI)?;
        Ok(format!("{client_id}:{username}:{jti}"))
    }
}
