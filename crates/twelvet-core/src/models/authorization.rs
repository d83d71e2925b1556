// ABOUTME: Persisted authorization record and the token metadata it owns
// ABOUTME: One record per successful issuance; token values are redacted from Debug output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::grant::{GrantType, Scopes};
use super::principal::Principal;
use crate::constants::BEARER;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Kind of token held by an authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Bearer access token
    AccessToken,
    /// Opaque refresh token
    RefreshToken,
    /// Single-use authorization code
    AuthorizationCode,
}

impl TokenKind {
    /// Token type hint value (RFC 7009 / RFC 7662)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::AuthorizationCode => "authorization_code",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issued token value with its validity window
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token value as handed to the caller
    pub value: String,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token stops being valid
    pub expires_at: DateTime<Utc>,
    /// Set once a single-use token has been consumed
    pub invalidated: bool,
    /// Claims embedded in (or associated with) the token
    pub claims: Map<String, Value>,
}

impl TokenMetadata {
    /// Create metadata for a fresh, unconsumed token
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            issued_at,
            expires_at,
            invalidated: false,
            claims: Map::new(),
        }
    }

    /// Attach claims
    #[must_use]
    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    /// Whether the token has expired at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Neither expired nor consumed
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && !self.is_expired(now)
    }

    /// Seconds of validity left at `now`, never negative
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

impl fmt::Debug for TokenMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMetadata")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("invalidated", &self.invalidated)
            .field("claims", &self.claims.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Authorization code plus the request parameters it was bound to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationCodeMetadata {
    /// The code itself
    pub token: TokenMetadata,
    /// Redirect URI that must match during token exchange
    pub redirect_uri: String,
    /// PKCE code challenge (RFC 7636)
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (S256 only)
    pub code_challenge_method: Option<String>,
    /// Client-generated state for CSRF protection
    pub state: Option<String>,
}

/// Persisted record of one issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    /// Record identifier, also the `auth_id` claim of the access token
    pub id: Uuid,
    /// Client the tokens were issued to
    pub client_id: String,
    /// Principal the tokens were issued for
    pub principal: Principal,
    /// Grant that produced this record
    pub grant_type: GrantType,
    /// Granted scopes
    pub scopes: Scopes,
    /// Access token, absent only for pending authorization codes
    pub access_token: Option<TokenMetadata>,
    /// Refresh token, when the grant issues one
    pub refresh_token: Option<TokenMetadata>,
    /// Authorization code, for records created by the authorize step
    pub authorization_code: Option<AuthorizationCodeMetadata>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Authorization {
    /// Subject of the bound principal
    #[must_use]
    pub fn subject(&self) -> &str {
        self.principal.subject()
    }

    /// Token of the given kind, if the record holds one
    #[must_use]
    pub fn token(&self, kind: TokenKind) -> Option<&TokenMetadata> {
        match kind {
            TokenKind::AccessToken => self.access_token.as_ref(),
            TokenKind::RefreshToken => self.refresh_token.as_ref(),
            TokenKind::AuthorizationCode => self.authorization_code.as_ref().map(|code| &code.token),
        }
    }

    /// Mutable access to the token of the given kind
    pub fn token_mut(&mut self, kind: TokenKind) -> Option<&mut TokenMetadata> {
        match kind {
            TokenKind::AccessToken => self.access_token.as_mut(),
            TokenKind::RefreshToken => self.refresh_token.as_mut(),
            TokenKind::AuthorizationCode => {
                self.authorization_code.as_mut().map(|code| &mut code.token)
            }
        }
    }

    /// Every token value held by this record, tagged with its kind
    #[must_use]
    pub fn token_values(&self) -> Vec<(TokenKind, &str)> {
        [
            TokenKind::AccessToken,
            TokenKind::RefreshToken,
            TokenKind::AuthorizationCode,
        ]
        .into_iter()
        .filter_map(|kind| self.token(kind).map(|token| (kind, token.value.as_str())))
        .collect()
    }

    /// Whether every token in the record is past its expiry
    #[must_use]
    pub fn is_fully_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_values()
            .iter()
            .filter_map(|(kind, _)| self.token(*kind))
            .all(|token| token.is_expired(now))
    }
}

/// Tokens returned to the caller after a successful grant
#[derive(Clone)]
pub struct TokenSet {
    /// Owning authorization record
    pub authorization_id: Uuid,
    /// Access token
    pub access_token: TokenMetadata,
    /// Refresh token, absent for grants that do not issue one
    pub refresh_token: Option<TokenMetadata>,
    /// Granted scopes
    pub scopes: Scopes,
}

impl TokenSet {
    /// Token type, always `Bearer`
    #[must_use]
    pub const fn token_type(&self) -> &'static str {
        BEARER
    }

    /// Access token lifetime in seconds
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        (self.access_token.expires_at - self.access_token.issued_at).num_seconds()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("authorization_id", &self.authorization_id)
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .field("scopes", &self.scopes)
            .finish()
    }
}
