// ABOUTME: Registered OAuth 2.0 client model
// ABOUTME: Used by the client repository and by every provider for grant and scope checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::grant::{GrantType, Scopes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth 2.0 Client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Client {
    /// Internal record ID
    pub id: String,
    /// OAuth 2.0 client identifier
    pub client_id: String,
    /// Argon2id hash of the client secret
    pub client_secret_hash: String,
    /// Registered redirect URIs for authorization code flow
    pub redirect_uris: Vec<String>,
    /// Allowed OAuth 2.0 grant types (`authorization_code`, `password`, etc.)
    pub grant_types: Vec<String>,
    /// Allowed OAuth 2.0 response types (code)
    pub response_types: Vec<String>,
    /// Human-readable client name
    pub client_name: Option<String>,
    /// Client's home page URL
    pub client_uri: Option<String>,
    /// Space-separated list of allowed scopes
    pub scope: Option<String>,
    /// When this client was created
    pub created_at: DateTime<Utc>,
    /// Optional expiration time for the client registration
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuth2Client {
    /// Scopes this client may be granted
    #[must_use]
    pub fn allowed_scopes(&self) -> Scopes {
        self.scope.as_deref().map(Scopes::parse).unwrap_or_default()
    }

    /// Whether the client is registered for `grant`
    #[must_use]
    pub fn supports_grant(&self, grant: GrantType) -> bool {
        self.grant_types.iter().any(|g| g == grant.as_str())
    }

    /// Whether `redirect_uri` is one of the registered URIs (exact match)
    #[must_use]
    pub fn has_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    /// Whether the registration has lapsed at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn client() -> OAuth2Client {
        OAuth2Client {
            id: "1".to_owned(),
            client_id: "web".to_owned(),
            client_secret_hash: String::new(),
            redirect_uris: vec!["https://app.example.com/cb".to_owned()],
            grant_types: vec!["password".to_owned(), "refresh_token".to_owned()],
            response_types: vec!["code".to_owned()],
            client_name: None,
            client_uri: None,
            scope: Some("read profile".to_owned()),
            created_at: Utc::now(),
            expires_at: Some(Utc::now() + Duration::days(1)),
        }
    }

    #[test]
    fn test_client_capabilities() {
        let client = client();
        assert!(client.supports_grant(GrantType::Password));
        assert!(!client.supports_grant(GrantType::SmsCode));
        assert_eq!(client.allowed_scopes(), Scopes::parse("profile read"));
        assert!(client.has_redirect_uri("https://app.example.com/cb"));
        assert!(!client.has_redirect_uri("https://app.example.com/cb/"));
        assert!(!client.is_expired(Utc::now()));
        assert!(client.is_expired(Utc::now() + Duration::days(2)));
    }
}
