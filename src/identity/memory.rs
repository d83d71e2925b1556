// ABOUTME: In-memory identity store and SMS code store backed by DashMap
// ABOUTME: Argon2id password hashes; SMS codes are removed atomically on first correct use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{IdentityValidator, SmsValidator};
use crate::constants::defaults;
use crate::crypto;
use crate::errors::{AppError, AppResult};
use crate::models::Principal;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

const BAD_CREDENTIALS: &str = "Bad credentials";

#[derive(Debug, Clone)]
struct UserRecord {
    principal: Principal,
    password_hash: String,
    phone: Option<String>,
    enabled: bool,
}

/// In-memory user directory
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    users: DashMap<String, UserRecord>,
    by_phone: DashMap<String, String>,
    by_subject: DashMap<String, String>,
}

impl InMemoryIdentityStore {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user; the principal's username is the login name
    ///
    /// # Errors
    /// `InvalidRequest` if the username or phone is taken, `ServerError` if hashing fails
    pub fn register_user(
        &self,
        principal: Principal,
        password: &str,
        phone: Option<&str>,
    ) -> AppResult<()> {
        let username = principal.username().to_owned();
        if self.users.contains_key(&username) {
            return Err(AppError::invalid_request(format!(
                "Username already registered: {username}"
            )));
        }
        if let Some(phone) = phone {
            if self.by_phone.contains_key(phone) {
                return Err(AppError::invalid_request("Phone number already registered"));
            }
        }

        let record = UserRecord {
            password_hash: crypto::hash_secret(password)?,
            phone: phone.map(str::to_owned),
            enabled: true,
            principal,
        };

        if let Some(phone) = &record.phone {
            self.by_phone.insert(phone.clone(), username.clone());
        }
        self.by_subject
            .insert(record.principal.subject().to_owned(), username.clone());
        self.users.insert(username, record);
        Ok(())
    }

    /// Disable a user; returns whether the user existed
    pub fn disable_user(&self, username: &str) -> bool {
        let Some(mut record) = self.users.get_mut(username) else {
            return false;
        };
        record.enabled = false;
        true
    }

    fn enabled_principal(&self, username: &str) -> Option<Principal> {
        self.users
            .get(username)
            .filter(|record| record.enabled)
            .map(|record| record.principal.clone())
    }
}

#[async_trait]
impl IdentityValidator for InMemoryIdentityStore {
    async fn authenticate(&self, username: &str, password: &str) -> AppResult<Principal> {
        // Copy out of the map so the shard lock is not held during Argon2
        let Some(record) = self.users.get(username).map(|r| r.value().clone()) else {
            tracing::debug!(username_len = username.len(), "Unknown username");
            crypto::verify_decoy_secret(password)?;
            return Err(AppError::invalid_grant(BAD_CREDENTIALS));
        };

        if !crypto::verify_secret(password, &record.password_hash)? || !record.enabled {
            return Err(AppError::invalid_grant(BAD_CREDENTIALS));
        }

        Ok(record.principal)
    }

    async fn load_by_phone(&self, phone: &str) -> AppResult<Option<Principal>> {
        Ok(self
            .by_phone
            .get(phone)
            .and_then(|username| self.enabled_principal(username.value())))
    }

    async fn load_by_subject(&self, subject: &str) -> AppResult<Option<Principal>> {
        Ok(self
            .by_subject
            .get(subject)
            .and_then(|username| self.enabled_principal(username.value())))
    }
}

#[derive(Debug, Clone)]
struct IssuedCode {
    code: String,
    expires_at: DateTime<Utc>,
    failed_attempts: u32,
}

/// In-memory one-time SMS code store
///
/// One live code per phone; issuing a new code replaces the previous one.
/// A code is dropped after `max_attempts` wrong guesses.
#[derive(Debug)]
pub struct InMemorySmsCodeStore {
    codes: DashMap<String, IssuedCode>,
    ttl: Duration,
    max_attempts: u32,
}

impl InMemorySmsCodeStore {
    /// Create a store whose codes live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: DashMap::new(),
            ttl,
            max_attempts: defaults::SMS_CODE_MAX_ATTEMPTS,
        }
    }

    /// Override how many wrong guesses a code survives
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Generate and store a fresh 6-digit code for `phone`
    ///
    /// # Errors
    /// `ServerError` if the system RNG fails
    pub fn issue(&self, phone: &str) -> AppResult<String> {
        let bytes = crypto::random_bytes(4)?;
        let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % 1_000_000;
        let code = format!("{value:06}");
        self.insert(phone, &code);
        Ok(code)
    }

    /// Store a known code for `phone`
    pub fn insert(&self, phone: &str, code: &str) {
        self.codes.insert(
            phone.to_owned(),
            IssuedCode {
                code: code.to_owned(),
                expires_at: Utc::now() + self.ttl,
                failed_attempts: 0,
            },
        );
    }

    /// Number of codes not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.codes.len()
    }
}

#[async_trait]
impl SmsValidator for InMemorySmsCodeStore {
    async fn verify(&self, phone: &str, code: &str) -> AppResult<bool> {
        let now = Utc::now();
        // The entry guard holds the shard write lock for the whole
        // check-and-update: of two concurrent correct attempts exactly one wins
        let Entry::Occupied(mut entry) = self.codes.entry(phone.to_owned()) else {
            return Ok(false);
        };

        if entry.get().expires_at <= now {
            entry.remove();
            tracing::debug!(phone_fp = %crypto::fingerprint(phone), "Expired SMS code dropped");
            return Ok(false);
        }
        if crypto::constant_time_eq(&entry.get().code, code) {
            entry.remove();
            return Ok(true);
        }

        let issued = entry.get_mut();
        issued.failed_attempts += 1;
        if issued.failed_attempts >= self.max_attempts {
            entry.remove();
            tracing::warn!(
                phone_fp = %crypto::fingerprint(phone),
                max_attempts = self.max_attempts,
                "SMS code dropped after too many wrong guesses"
            );
        }
        Ok(false)
    }
}
