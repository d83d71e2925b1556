// ABOUTME: Authorization record store contract used by the token pipeline
// ABOUTME: Keyed storage of issued authorizations with an atomic single-use consume primitive
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Authorization Store
//!
//! Every successful issuance is persisted as exactly one [`Authorization`].
//! Records are never rewritten; the one mutation a store performs is flipping a
//! single-use token's `invalidated` flag inside [`AuthorizationService::consume_token`],
//! which must be atomic so that a code or refresh token is consumed at most once
//! even under concurrent attempts. [`AuthorizationService::release_token`] clears
//! the flag again when the issuance that consumed the token could not be persisted.

/// DashMap-backed reference store
pub mod memory;

pub use memory::InMemoryAuthorizationService;

use crate::errors::AppResult;
use crate::models::{Authorization, TokenKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Durable keyed storage for issued authorizations
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Persist a new record
    ///
    /// # Errors
    /// `ServerError` if the id or any token value is already stored, or the backend fails
    async fn save(&self, authorization: Authorization) -> AppResult<()>;

    /// Record by id
    ///
    /// # Errors
    /// `ServerError` if the backend fails
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Authorization>>;

    /// Record holding `value` as a token of `kind`
    ///
    /// # Errors
    /// `ServerError` if the backend fails
    async fn find_by_token(&self, value: &str, kind: TokenKind) -> AppResult<Option<Authorization>>;

    /// Delete a record and its token index entries; returns whether it existed
    ///
    /// # Errors
    /// `ServerError` if the backend fails
    async fn remove(&self, id: Uuid) -> AppResult<bool>;

    /// Atomically mark a single-use token as consumed
    ///
    /// Returns the owning record only if the token exists, belongs to
    /// `client_id`, is unexpired at `now`, and had not been consumed before.
    /// A token owned by another client is left untouched.
    ///
    /// # Errors
    /// `ServerError` if the backend fails
    async fn consume_token(
        &self,
        value: &str,
        kind: TokenKind,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Authorization>>;

    /// Undo a consume whose issuance failed before anything was persisted
    ///
    /// Returns whether a consumed token of `kind` on record `id` was restored.
    ///
    /// # Errors
    /// `ServerError` if the backend fails
    async fn release_token(&self, id: Uuid, kind: TokenKind) -> AppResult<bool>;
}
