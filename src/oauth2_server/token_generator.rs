// ABOUTME: Token generator chain producing access and refresh tokens for an authenticated grant
// ABOUTME: Ordered generators with declared capabilities, first success wins per token kind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Generators
//!
//! [`DelegatingTokenGenerator`] asks its generators, in order, for one token of
//! the requested [`TokenKind`]. A generator that does not support the grant is
//! skipped; the first one that returns a token wins.

use super::authentication::AuthenticatedGrant;
use super::customizer::{ClaimsBuilder, TokenClaimsCustomizer, TokenContext};
use super::signer::TokenSigner;
use crate::constants::{claims, defaults, service_names};
use crate::crypto;
use crate::errors::{AppError, AppResult};
use crate::models::{TokenKind, TokenMetadata, TokenSet};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Inputs for producing one token
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    /// Authenticated grant the token is for
    pub grant: &'a AuthenticatedGrant,
    /// Authorization the token will be stored under
    pub authorization_id: Uuid,
    /// Kind of token requested
    pub token_kind: TokenKind,
    /// Issue instant shared by every token of the set
    pub issued_at: DateTime<Utc>,
}

/// Produces tokens of one kind
pub trait TokenGenerator: Send + Sync {
    /// Kind of token this generator produces
    fn token_kind(&self) -> TokenKind;

    /// Whether this generator handles `grant`
    fn supports(&self, grant: &AuthenticatedGrant) -> bool;

    /// Produce a token, or `None` to let the next generator try
    ///
    /// # Errors
    /// `ServerError` if signing or random generation fails
    fn generate(&self, context: &GenerationContext<'_>) -> AppResult<Option<TokenMetadata>>;
}

/// Signed access tokens carrying registered and customized claims
pub struct AccessTokenGenerator {
    signer: Arc<dyn TokenSigner>,
    customizer: Arc<dyn TokenClaimsCustomizer>,
    issuer: String,
    ttl: Duration,
}

impl AccessTokenGenerator {
    /// Create an access token generator
    pub fn new(
        signer: Arc<dyn TokenSigner>,
        customizer: Arc<dyn TokenClaimsCustomizer>,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            signer,
            customizer,
            issuer: issuer.into(),
            ttl,
        }
    }
}

impl TokenGenerator for AccessTokenGenerator {
    fn token_kind(&self) -> TokenKind {
        TokenKind::AccessToken
    }

    fn supports(&self, _grant: &AuthenticatedGrant) -> bool {
        true
    }

    fn generate(&self, context: &GenerationContext<'_>) -> AppResult<Option<TokenMetadata>> {
        let grant = context.grant;
        let issued_at = context.issued_at;
        let expires_at = issued_at + self.ttl;

        let mut builder = ClaimsBuilder::new();
        builder.registered(claims::ISS, self.issuer.as_str());
        builder.registered(claims::SUB, grant.principal.subject());
        builder.registered(claims::AUD, service_names::TOKEN_AUDIENCE);
        builder.registered(claims::IAT, issued_at.timestamp());
        builder.registered(claims::EXP, expires_at.timestamp());
        builder.registered(claims::JTI, Uuid::new_v4().to_string());
        builder.registered(claims::SCOPE, grant.scopes.to_string());
        builder.registered(claims::CLIENT_ID, grant.client.client_id.as_str());
        builder.registered(claims::AUTH_ID, context.authorization_id.to_string());

        let token_context = TokenContext {
            principal: &grant.principal,
            client: &grant.client,
            scopes: &grant.scopes,
            grant_type: grant.grant_type,
            token_kind: context.token_kind,
            authorization_id: context.authorization_id,
        };
        self.customizer.customize(&token_context, &mut builder);

        let finalized = builder.build();
        let value = self.signer.sign(&finalized)?;
        Ok(Some(
            TokenMetadata::new(value, issued_at, expires_at).with_claims(finalized),
        ))
    }
}

/// Opaque random refresh tokens
#[derive(Debug, Clone, Copy)]
pub struct RefreshTokenGenerator {
    ttl: Duration,
}

impl RefreshTokenGenerator {
    /// Create a refresh token generator
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl TokenGenerator for RefreshTokenGenerator {
    fn token_kind(&self) -> TokenKind {
        TokenKind::RefreshToken
    }

    fn supports(&self, grant: &AuthenticatedGrant) -> bool {
        grant.wants_refresh_token()
    }

    fn generate(&self, context: &GenerationContext<'_>) -> AppResult<Option<TokenMetadata>> {
        let value = crypto::random_token(defaults::OPAQUE_TOKEN_BYTES)?;
        Ok(Some(TokenMetadata::new(
            value,
            context.issued_at,
            context.issued_at + self.ttl,
        )))
    }
}

/// Ordered generator chain
pub struct DelegatingTokenGenerator {
    generators: Vec<Arc<dyn TokenGenerator>>,
}

impl DelegatingTokenGenerator {
    /// Build a chain from generators in evaluation order
    ///
    /// # Errors
    /// `ServerError` if no generator produces access tokens
    pub fn new(generators: Vec<Arc<dyn TokenGenerator>>) -> AppResult<Self> {
        if !generators
            .iter()
            .any(|g| g.token_kind() == TokenKind::AccessToken)
        {
            return Err(AppError::server_error(
                "Token generator chain has no access token generator",
            ));
        }
        Ok(Self { generators })
    }

    /// First token of `context.token_kind` any eligible generator produces
    ///
    /// # Errors
    /// Propagates the failing generator's error
    pub fn generate(&self, context: &GenerationContext<'_>) -> AppResult<Option<TokenMetadata>> {
        for generator in &self.generators {
            if generator.token_kind() != context.token_kind || !generator.supports(context.grant) {
                continue;
            }
            if let Some(token) = generator.generate(context)? {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }

    /// Access token plus refresh token when the grant calls for one
    ///
    /// # Errors
    /// `ServerError` if no generator produces a required token or a generated
    /// refresh value equals the access value
    pub fn generate_token_set(
        &self,
        grant: &AuthenticatedGrant,
        authorization_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> AppResult<TokenSet> {
        let context = |token_kind| GenerationContext {
            grant,
            authorization_id,
            token_kind,
            issued_at,
        };

        let access_token = self
            .generate(&context(TokenKind::AccessToken))?
            .ok_or_else(|| {
                AppError::server_error(format!(
                    "No token generator produced an access token for {}",
                    grant.grant_type
                ))
            })?;

        let refresh_token = if grant.wants_refresh_token() {
            let token = self
                .generate(&context(TokenKind::RefreshToken))?
                .ok_or_else(|| {
                    AppError::server_error(format!(
                        "No token generator produced a refresh token for {}",
                        grant.grant_type
                    ))
                })?;
            if token.value == access_token.value {
                return Err(AppError::server_error(
                    "Refresh token value collides with the access token",
                ));
            }
            Some(token)
        } else {
            None
        };

        Ok(TokenSet {
            authorization_id,
            access_token,
            refresh_token,
            scopes: grant.scopes.clone(),
        })
    }
}
