// ABOUTME: OAuth 2.0 wire models for the token, authorize, introspection and registration endpoints
// ABOUTME: Raw token requests, token and error responses; credential values are redacted from Debug
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::params;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw token endpoint request: parameter name to value
///
/// Parameters that are present but blank count as missing.
#[derive(Clone, Default)]
pub struct RawTokenRequest {
    params: BTreeMap<String, String>,
    client_credentials: Option<ClientCredentials>,
}

impl RawTokenRequest {
    /// Build from form parameters
    pub fn from_params<K, V, I>(params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            client_credentials: None,
        }
    }

    /// Attach client credentials already decoded by the transport (HTTP Basic)
    #[must_use]
    pub fn with_client_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.client_credentials = Some(credentials);
        self
    }

    /// Set one parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Trimmed, non-blank parameter value
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Required parameter
    ///
    /// # Errors
    /// `InvalidRequest` naming the parameter when it is missing or blank
    pub fn require(&self, name: &str) -> AppResult<&str> {
        self.get(name)
            .ok_or_else(|| AppError::invalid_request(format!("Missing required parameter: {name}")))
    }

    /// The `grant_type` parameter
    #[must_use]
    pub fn grant_type(&self) -> Option<&str> {
        self.get(params::GRANT_TYPE)
    }

    /// Client credentials: transport-supplied first, else `client_id` plus `client_secret`
    #[must_use]
    pub fn client_credentials(&self) -> Option<ClientCredentials> {
        if let Some(credentials) = &self.client_credentials {
            return Some(credentials.clone());
        }
        match (self.get(params::CLIENT_ID), self.get(params::CLIENT_SECRET)) {
            (Some(client_id), Some(client_secret)) => {
                Some(ClientCredentials::new(client_id, client_secret))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for RawTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTokenRequest")
            .field("grant_type", &self.grant_type())
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .field("client_credentials", &self.client_credentials)
            .finish()
    }
}

/// Client identifier and secret presented with a request
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client identifier
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

impl ClientCredentials {
    /// Create credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// OAuth 2.0 Client Registration Request (RFC 7591)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Redirect URIs for authorization code flow
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Optional client name for display
    pub client_name: Option<String>,
    /// Optional client URI for information
    pub client_uri: Option<String>,
    /// Grant types the client can use
    pub grant_types: Option<Vec<String>>,
    /// Response types the client can use
    pub response_types: Option<Vec<String>>,
    /// Scopes the client can request
    pub scope: Option<String>,
}

/// OAuth 2.0 Client Registration Response (RFC 7591)
#[derive(Debug, Serialize)]
pub struct ClientRegistrationResponse {
    /// Unique client identifier
    pub client_id: String,
    /// Client secret, shown once
    pub client_secret: String,
    /// When the client was registered
    pub client_id_issued_at: Option<i64>,
    /// When the client secret expires
    pub client_secret_expires_at: Option<i64>,
    /// Redirect URIs registered for this client
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<String>,
    /// Response types allowed for this client
    pub response_types: Vec<String>,
    /// Client name
    pub client_name: Option<String>,
    /// Client URI
    pub client_uri: Option<String>,
    /// Scopes this client can request
    pub scope: Option<String>,
}

/// OAuth 2.0 Authorization Request
#[derive(Debug, Deserialize, Clone)]
pub struct AuthorizeRequest {
    /// Response type (code)
    pub response_type: String,
    /// Client identifier
    pub client_id: String,
    /// Redirect URI for response
    pub redirect_uri: String,
    /// Requested scopes
    pub scope: Option<String>,
    /// State parameter for CSRF protection
    pub state: Option<String>,
    /// PKCE code challenge (RFC 7636)
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (S256)
    pub code_challenge_method: Option<String>,
}

/// OAuth 2.0 Authorization Response
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    /// Authorization code
    pub code: String,
    /// State parameter (if provided in request)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Where the transport should redirect the user agent
    #[serde(skip)]
    pub redirect_uri: String,
}

/// OAuth 2.0 Token Response
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Expires in seconds
    pub expires_in: i64,
    /// Scopes granted, space-joined and sorted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// OAuth 2.0 Error Response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    pub error_description: Option<String>,
    /// URI for error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl OAuth2Error {
    /// Render an application error; server errors get the generic description only
    #[must_use]
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.code.as_str().to_owned(),
            error_description: Some(error.public_description()),
            error_uri: Some(error.code.error_uri().to_owned()),
        }
    }
}

/// Error body plus the HTTP status a transport should answer with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status
    pub status: u16,
    /// Response body
    pub body: OAuth2Error,
}

impl ErrorResponse {
    /// Stable error code
    #[must_use]
    pub fn error(&self) -> &str {
        &self.body.error
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.body.error, self.status)
    }
}

/// Token Introspection Response (RFC 7662)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active
    pub active: bool,
    /// Granted scopes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the token was issued to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Login name of the principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Subject of the principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry as a Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issue time as a Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// `access_token` or `refresh_token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl IntrospectionResponse {
    /// Response for unknown, expired or consumed tokens
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }
}
