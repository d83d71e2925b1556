// ABOUTME: Credential validator contracts consumed by the grant providers
// ABOUTME: Password identity check, phone and subject lookup, and single-use SMS code verification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Identity Validators
//!
//! The grant providers never see user storage directly. They call an
//! [`IdentityValidator`] to authenticate a username and password or to load a
//! principal by phone or subject, and an [`SmsValidator`] to check a one-time
//! code. In-memory implementations live in [`memory`].

/// In-memory identity and SMS code stores
pub mod memory;

pub use memory::{InMemoryIdentityStore, InMemorySmsCodeStore};

use crate::errors::AppResult;
use crate::models::Principal;
use async_trait::async_trait;

/// User identity lookups and password authentication
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    /// Authenticate a username and password
    ///
    /// # Errors
    /// `InvalidGrant` for unknown users, wrong passwords or disabled accounts,
    /// without saying which; `ServerError` if the backing store fails
    async fn authenticate(&self, username: &str, password: &str) -> AppResult<Principal>;

    /// Principal bound to a phone number
    ///
    /// # Errors
    /// `ServerError` if the backing store fails
    async fn load_by_phone(&self, phone: &str) -> AppResult<Option<Principal>>;

    /// Principal with the given subject, `None` if unknown or disabled
    ///
    /// # Errors
    /// `ServerError` if the backing store fails
    async fn load_by_subject(&self, subject: &str) -> AppResult<Option<Principal>>;
}

/// One-time SMS code verification
///
/// Implementations must consume a code on its first successful verification,
/// so a second call with the same `(phone, code)` returns `false`.
#[async_trait]
pub trait SmsValidator: Send + Sync {
    /// Verify and consume a code
    ///
    /// # Errors
    /// `ServerError` if the backing store fails
    async fn verify(&self, phone: &str, code: &str) -> AppResult<bool>;
}
