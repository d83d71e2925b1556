// ABOUTME: Request converter chain turning raw token requests into typed authentication requests
// ABOUTME: One converter per grant type, evaluated in order, first match wins
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Converter Chain
//!
//! Each [`AuthenticationConverter`] recognizes exactly one `grant_type` and
//! extracts that grant's fields into a [`GrantRequest`] variant. The
//! [`DelegatingAuthenticationConverter`] walks its converters in order and the
//! first one whose grant type matches handles the request.

use super::models::{ClientCredentials, RawTokenRequest};
use crate::constants::params;
use crate::errors::{AppError, AppResult};
use crate::models::{GrantType, Scopes};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Grant-specific fields of a token request
#[derive(Clone, PartialEq, Eq)]
pub enum GrantRequest {
    /// Exchange an authorization code
    AuthorizationCode {
        /// Code issued by the authorize step
        code: String,
        /// Redirect URI the code was bound to
        redirect_uri: String,
        /// PKCE verifier
        code_verifier: Option<String>,
    },
    /// Client acting on its own behalf
    ClientCredentials,
    /// Rotate a refresh token
    RefreshToken {
        /// Refresh token value
        refresh_token: String,
    },
    /// Resource owner password credentials
    Password {
        /// Login name
        username: String,
        /// Password
        password: String,
    },
    /// Phone number plus one-time SMS code
    SmsCode {
        /// Phone number
        phone: String,
        /// One-time code
        code: String,
    },
}

impl GrantRequest {
    /// Grant type of this variant
    #[must_use]
    pub const fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::ClientCredentials => GrantType::ClientCredentials,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
            Self::Password { .. } => GrantType::Password,
            Self::SmsCode { .. } => GrantType::SmsCode,
        }
    }
}

impl fmt::Debug for GrantRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizationCode {
                redirect_uri,
                code_verifier,
                ..
            } => f
                .debug_struct("AuthorizationCode")
                .field("redirect_uri", redirect_uri)
                .field("pkce", &code_verifier.is_some())
                .finish_non_exhaustive(),
            Self::ClientCredentials => f.write_str("ClientCredentials"),
            Self::RefreshToken { .. } => f.debug_struct("RefreshToken").finish_non_exhaustive(),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::SmsCode { .. } => f.debug_struct("SmsCode").finish_non_exhaustive(),
        }
    }
}

/// Typed authentication request produced by a converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    /// Credentials of the requesting client
    pub client: ClientCredentials,
    /// Requested scopes; empty means none requested
    pub scopes: Scopes,
    /// Grant-specific fields
    pub grant: GrantRequest,
}

impl AuthenticationRequest {
    /// Grant type of the request
    #[must_use]
    pub const fn grant_type(&self) -> GrantType {
        self.grant.grant_type()
    }
}

/// Converts a raw request for one grant type
pub trait AuthenticationConverter: Send + Sync {
    /// Grant type this converter recognizes
    fn grant_type(&self) -> GrantType;

    /// Whether this converter handles `grant_type`
    fn matches(&self, grant_type: &str) -> bool {
        self.grant_type().as_str() == grant_type
    }

    /// Extract the grant's fields
    ///
    /// # Errors
    /// `InvalidRequest` when a required field is missing, `InvalidClient` when no
    /// client credentials were presented
    fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest>;
}

/// Client credentials and requested scope, common to every grant
fn common_fields(request: &RawTokenRequest) -> AppResult<(ClientCredentials, Scopes)> {
    let client = request
        .client_credentials()
        .ok_or_else(|| AppError::invalid_client("Client credentials are required"))?;
    let scopes = request.get(params::SCOPE).map(Scopes::parse).unwrap_or_default();
    Ok((client, scopes))
}

/// `grant_type=password`
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordAuthenticationConverter;

impl AuthenticationConverter for PasswordAuthenticationConverter {
    fn grant_type(&self) -> GrantType {
        GrantType::Password
    }

    fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest> {
        let username = request.require(params::USERNAME)?.to_owned();
        let password = request.require(params::PASSWORD)?.to_owned();
        let (client, scopes) = common_fields(request)?;
        Ok(AuthenticationRequest {
            client,
            scopes,
            grant: GrantRequest::Password { username, password },
        })
    }
}

/// `grant_type=sms_code`
#[derive(Debug, Default, Clone, Copy)]
pub struct SmsCodeAuthenticationConverter;

impl AuthenticationConverter for SmsCodeAuthenticationConverter {
    fn grant_type(&self) -> GrantType {
        GrantType::SmsCode
    }

    fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest> {
        let phone = request.require(params::PHONE)?.to_owned();
        let code = request.require(params::CODE)?.to_owned();
        let (client, scopes) = common_fields(request)?;
        Ok(AuthenticationRequest {
            client,
            scopes,
            grant: GrantRequest::SmsCode { phone, code },
        })
    }
}

/// `grant_type=refresh_token`
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshTokenAuthenticationConverter;

impl AuthenticationConverter for RefreshTokenAuthenticationConverter {
    fn grant_type(&self) -> GrantType {
        GrantType::RefreshToken
    }

    fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest> {
        let refresh_token = request.require(params::REFRESH_TOKEN)?.to_owned();
        let (client, scopes) = common_fields(request)?;
        Ok(AuthenticationRequest {
            client,
            scopes,
            grant: GrantRequest::RefreshToken { refresh_token },
        })
    }
}

/// `grant_type=client_credentials`
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientCredentialsAuthenticationConverter;

impl AuthenticationConverter for ClientCredentialsAuthenticationConverter {
    fn grant_type(&self) -> GrantType {
        GrantType::ClientCredentials
    }

    fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest> {
        let (client, scopes) = common_fields(request)?;
        Ok(AuthenticationRequest {
            client,
            scopes,
            grant: GrantRequest::ClientCredentials,
        })
    }
}

/// `grant_type=authorization_code`
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationCodeAuthenticationConverter;

impl AuthenticationConverter for AuthorizationCodeAuthenticationConverter {
    fn grant_type(&self) -> GrantType {
        GrantType::AuthorizationCode
    }

    fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest> {
        let code = request.require(params::CODE)?.to_owned();
        let redirect_uri = request.require(params::REDIRECT_URI)?.to_owned();
        let code_verifier = request.get(params::CODE_VERIFIER).map(str::to_owned);
        let (client, scopes) = common_fields(request)?;
        Ok(AuthenticationRequest {
            client,
            scopes,
            grant: GrantRequest::AuthorizationCode {
                code,
                redirect_uri,
                code_verifier,
            },
        })
    }
}

/// Ordered converter chain
pub struct DelegatingAuthenticationConverter {
    converters: Vec<Arc<dyn AuthenticationConverter>>,
}

impl DelegatingAuthenticationConverter {
    /// Build a chain; two converters for one grant type is a configuration error
    ///
    /// # Errors
    /// `ServerError` on duplicate grant types or an empty chain
    pub fn new(converters: Vec<Arc<dyn AuthenticationConverter>>) -> AppResult<Self> {
        if converters.is_empty() {
            return Err(AppError::server_error("Converter chain is empty"));
        }
        let mut seen = HashSet::new();
        for converter in &converters {
            let grant_type = converter.grant_type();
            if !seen.insert(grant_type) {
                return Err(AppError::server_error(format!(
                    "Duplicate converter registered for grant type '{grant_type}'"
                )));
            }
        }
        Ok(Self { converters })
    }

    /// Chain with every built-in converter: password, sms, refresh, client credentials, code
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            converters: vec![
                Arc::new(PasswordAuthenticationConverter),
                Arc::new(SmsCodeAuthenticationConverter),
                Arc::new(RefreshTokenAuthenticationConverter),
                Arc::new(ClientCredentialsAuthenticationConverter),
                Arc::new(AuthorizationCodeAuthenticationConverter),
            ],
        }
    }

    /// Grant types handled by this chain, in evaluation order
    #[must_use]
    pub fn grant_types(&self) -> Vec<GrantType> {
        self.converters.iter().map(|c| c.grant_type()).collect()
    }

    /// Convert with the first matching converter
    ///
    /// # Errors
    /// `InvalidRequest` without a `grant_type`, `UnsupportedGrantType` when no
    /// converter matches, or the matched converter's own error
    pub fn convert(&self, request: &RawTokenRequest) -> AppResult<AuthenticationRequest> {
        let grant_type = request.require(params::GRANT_TYPE)?;

        let converter = self
            .converters
            .iter()
            .find(|converter| converter.matches(grant_type))
            .ok_or_else(|| {
                tracing::debug!(grant_type_len = grant_type.len(), "No converter for grant type");
                AppError::unsupported_grant_type()
            })?;

        converter.convert(request)
    }
}

impl fmt::Debug for DelegatingAuthenticationConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingAuthenticationConverter")
            .field("grant_types", &self.grant_types())
            .finish()
    }
}
