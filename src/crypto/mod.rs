// ABOUTME: Cryptographic helpers for token generation, secret hashing and PKCE
// ABOUTME: System CSPRNG tokens, Argon2id hashing, SHA-256 fingerprints and constant-time comparison
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Cryptographic utilities for the authorization server

use crate::errors::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

/// Minimum PKCE verifier/challenge length (RFC 7636 Section 4.1)
pub const PKCE_MIN_LEN: usize = 43;
/// Maximum PKCE verifier/challenge length
pub const PKCE_MAX_LEN: usize = 128;

/// Fill `len` bytes from the system CSPRNG
///
/// # Errors
/// Returns a server error if the system RNG fails; the server cannot operate securely without it
pub fn random_bytes(len: usize) -> AppResult<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];

    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(
            "CRITICAL: SystemRandom failed - cannot generate secure random bytes: {}",
            e
        );
        AppError::server_error("System RNG failure - server cannot operate securely")
    })?;

    Ok(bytes)
}

/// URL-safe base64 token of `len` random bytes
///
/// # Errors
/// Returns a server error if the system RNG fails
pub fn random_token(len: usize) -> AppResult<String> {
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(random_bytes(len)?))
}

/// Hash a secret for storage using Argon2id with a random salt
///
/// # Errors
/// Returns a server error if Argon2 hashing fails
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::server_error(format!("Argon2 password hashing failed: {e}")))
}

/// Verify a secret against a stored Argon2 hash (constant-time inside Argon2)
///
/// # Errors
/// Returns a server error if the stored hash cannot be parsed
pub fn verify_secret(secret: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        tracing::error!("Failed to parse stored password hash: {}", e);
        AppError::server_error("Stored credential hash is malformed")
    })?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

static DECOY_HASH: OnceLock<String> = OnceLock::new();

/// Argon2 hash of a random secret nobody knows, generated on first use
fn decoy_hash() -> AppResult<&'static str> {
    if let Some(hash) = DECOY_HASH.get() {
        return Ok(hash.as_str());
    }
    let generated = hash_secret(&random_token(32)?)?;
    Ok(DECOY_HASH.get_or_init(|| generated).as_str())
}

/// Spend one Argon2 verification for an identifier with no stored hash
///
/// Unknown users and clients then cost the same as a wrong secret, so
/// response timing does not reveal which identifiers exist.
///
/// # Errors
/// Returns a server error if the decoy hash cannot be generated
pub fn verify_decoy_secret(secret: &str) -> AppResult<()> {
    verify_secret(secret, decoy_hash()?)?;
    Ok(())
}

/// First 8 hex chars of SHA-256, safe to log in place of a credential
#[must_use]
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(8);
    encoded
}

/// Constant-time string equality
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// S256 code challenge for a PKCE verifier
#[must_use]
pub fn pkce_s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Length 43-128 of `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"`
#[must_use]
pub fn is_valid_pkce_value(value: &str) -> bool {
    (PKCE_MIN_LEN..=PKCE_MAX_LEN).contains(&value.len())
        && value
            .chars()
            .all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~'))
}
