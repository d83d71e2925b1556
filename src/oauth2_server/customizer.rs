// ABOUTME: Access token claims customization hook
// ABOUTME: Claims builder guarding registered claims, token context and the default identity customizer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::claims;
use crate::models::{GrantType, OAuth2Client, Principal, Scopes, TokenKind};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Claims under construction; registered claims are write-once
#[derive(Debug, Clone, Default)]
pub struct ClaimsBuilder {
    claims: Map<String, Value>,
}

impl ClaimsBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a registered claim; only the token generator calls this
    pub(crate) fn registered(&mut self, name: &str, value: impl Into<Value>) {
        self.claims.insert(name.to_owned(), value.into());
    }

    /// Add a custom claim
    ///
    /// Returns `false` and leaves the claim untouched when `name` is a registered
    /// claim such as `scope`, `exp` or `sub`.
    pub fn claim(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        if claims::PROTECTED.contains(&name.as_str()) {
            warn!(claim = %name, "Customizer attempted to overwrite a registered claim; ignored");
            return false;
        }
        self.claims.insert(name, value.into());
        true
    }

    /// Current value of a claim
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Finalized claims
    #[must_use]
    pub fn build(self) -> Map<String, Value> {
        self.claims
    }
}

/// What the customizer knows about the token being built
#[derive(Debug, Clone, Copy)]
pub struct TokenContext<'a> {
    /// Resolved principal
    pub principal: &'a Principal,
    /// Requesting client
    pub client: &'a OAuth2Client,
    /// Granted scopes
    pub scopes: &'a Scopes,
    /// Grant type being served
    pub grant_type: GrantType,
    /// Kind of token under construction
    pub token_kind: TokenKind,
    /// Authorization the token will belong to
    pub authorization_id: Uuid,
}

/// Adds claims to an access token before it is signed
pub trait TokenClaimsCustomizer: Send + Sync {
    /// Add claims for `context`
    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimsBuilder);
}

impl<F> TokenClaimsCustomizer for F
where
    F: Fn(&TokenContext<'_>, &mut ClaimsBuilder) + Send + Sync,
{
    fn customize(&self, context: &TokenContext<'_>, claims: &mut ClaimsBuilder) {
        self(context, claims);
    }
}

/// Default customizer: identity attributes plus the issuer label
#[derive(Debug, Clone)]
pub struct IdentityClaimsCustomizer {
    license: String,
}

impl IdentityClaimsCustomizer {
    /// Create a customizer stamping `license` into every access token
    pub fn new(license: impl Into<String>) -> Self {
        Self {
            license: license.into(),
        }
    }
}

impl TokenClaimsCustomizer for IdentityClaimsCustomizer {
    fn customize(&self, context: &TokenContext<'_>, builder: &mut ClaimsBuilder) {
        if context.token_kind != TokenKind::AccessToken {
            return;
        }
        let principal = context.principal;

        if !principal.is_client() {
            builder.claim(claims::USER_ID, principal.subject());
        }
        builder.claim(claims::USERNAME, principal.username());
        if let Some(tenant_id) = principal.tenant_id() {
            builder.claim(claims::TENANT_ID, tenant_id);
        }
        if !principal.authorities().is_empty() {
            let roles: Vec<Value> = principal
                .authorities()
                .iter()
                .map(|role| Value::String(role.clone()))
                .collect();
            builder.claim(claims::ROLES, roles);
        }
        for (name, value) in principal.attributes() {
            builder.claim(name.clone(), value.clone());
        }
        builder.claim(claims::LICENSE, self.license.as_str());
    }
}
