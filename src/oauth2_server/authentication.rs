// ABOUTME: Authentication providers that validate each grant's credentials and resolve principal and scope
// ABOUTME: Provider registry authenticates the client, then dispatches to the one provider for the grant type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Provider Registry
//!
//! The registry owns one [`AuthenticationProvider`] per [`GrantType`].
//! Client authentication happens once, in the registry, before any provider
//! runs, so providers receive an already-verified [`OAuth2Client`].

use super::client_registration::ClientRegistrationManager;
use super::converters::{AuthenticationRequest, GrantRequest};
use crate::crypto;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::identity::{IdentityValidator, SmsValidator};
use crate::logging::AppLogger;
use crate::models::{Authorization, GrantType, OAuth2Client, Principal, Scopes, TokenKind};
use crate::store::AuthorizationService;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const PKCE_METHOD_S256: &str = "S256";

/// Single-use token a provider consumed while authenticating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumedToken {
    /// Authorization that owns the token
    pub authorization_id: Uuid,
    /// Which of its tokens was consumed
    pub kind: TokenKind,
}

/// Result of a successful provider authentication
#[derive(Debug, Clone)]
pub struct AuthenticatedGrant {
    /// Authenticated client
    pub client: OAuth2Client,
    /// Resolved principal
    pub principal: Principal,
    /// Granted scopes, a subset of the client's permitted scopes
    pub scopes: Scopes,
    /// Grant type that produced this result
    pub grant_type: GrantType,
    /// Code or refresh token consumed to obtain this grant, if any
    pub consumed: Option<ConsumedToken>,
}

impl AuthenticatedGrant {
    fn new(client: &OAuth2Client, principal: Principal, scopes: Scopes, grant_type: GrantType) -> Self {
        Self {
            client: client.clone(),
            principal,
            scopes,
            grant_type,
            consumed: None,
        }
    }

    /// Whether a refresh token should accompany the access token
    #[must_use]
    pub fn wants_refresh_token(&self) -> bool {
        self.grant_type.issues_refresh_token() && self.client.supports_grant(GrantType::RefreshToken)
    }
}

/// Validates the credentials of one grant type
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Grant type this provider handles
    fn grant_type(&self) -> GrantType;

    /// Validate the grant and resolve principal plus scope
    ///
    /// # Errors
    /// `InvalidGrant` for bad or spent credentials, `InvalidScope` for scope
    /// violations, `ServerError` when a collaborator fails
    async fn authenticate(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant>;
}

/// Requested scope against the client's permitted set
///
/// # Errors
/// `InvalidScope` if nothing requested is permitted
pub fn resolve_scopes(client: &OAuth2Client, requested: &Scopes) -> AppResult<Scopes> {
    let allowed = client.allowed_scopes();
    if requested.is_empty() {
        return Ok(allowed);
    }
    let granted = requested.intersection(&allowed);
    if granted.is_empty() {
        return Err(AppError::invalid_scope(format!(
            "None of the requested scopes are permitted for client {}",
            client.client_id
        )));
    }
    if granted.len() < requested.len() {
        debug!(
            client_id = %client.client_id,
            requested = %requested,
            granted = %granted,
            "Requested scope narrowed to the client's permitted set"
        );
    }
    Ok(granted)
}

fn unexpected_request(grant_type: GrantType) -> AppError {
    AppError::server_error(format!(
        "Provider for {grant_type} received a request for another grant"
    ))
}

/// `grant_type=password`
pub struct PasswordAuthenticationProvider {
    identities: Arc<dyn IdentityValidator>,
}

impl PasswordAuthenticationProvider {
    /// Create a provider backed by `identities`
    #[must_use]
    pub fn new(identities: Arc<dyn IdentityValidator>) -> Self {
        Self { identities }
    }
}

#[async_trait]
impl AuthenticationProvider for PasswordAuthenticationProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::Password
    }

    async fn authenticate(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant> {
        let GrantRequest::Password { username, password } = &request.grant else {
            return Err(unexpected_request(self.grant_type()));
        };

        // Never tell the caller which half of the credentials was wrong
        let principal = self
            .identities
            .authenticate(username, password)
            .await
            .map_err(|e| match e.code {
                ErrorCode::ServerError => e,
                _ => AppError::invalid_grant("Bad credentials"),
            })?;

        let scopes = resolve_scopes(client, &request.scopes)?;
        Ok(AuthenticatedGrant::new(client, principal, scopes, GrantType::Password))
    }
}

/// `grant_type=sms_code`
pub struct SmsCodeAuthenticationProvider {
    identities: Arc<dyn IdentityValidator>,
    sms: Arc<dyn SmsValidator>,
}

impl SmsCodeAuthenticationProvider {
    /// Create a provider backed by the SMS validator and phone-bound identities
    #[must_use]
    pub fn new(identities: Arc<dyn IdentityValidator>, sms: Arc<dyn SmsValidator>) -> Self {
        Self { identities, sms }
    }
}

#[async_trait]
impl AuthenticationProvider for SmsCodeAuthenticationProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::SmsCode
    }

    async fn authenticate(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant> {
        let GrantRequest::SmsCode { phone, code } = &request.grant else {
            return Err(unexpected_request(self.grant_type()));
        };

        if !self.sms.verify(phone, code).await? {
            return Err(AppError::invalid_grant("Invalid or expired SMS code"));
        }

        let principal = self
            .identities
            .load_by_phone(phone)
            .await?
            .ok_or_else(|| AppError::invalid_grant("No account is bound to this phone number"))?;

        let scopes = resolve_scopes(client, &request.scopes)?;
        Ok(AuthenticatedGrant::new(client, principal, scopes, GrantType::SmsCode))
    }
}

/// `grant_type=client_credentials`
#[derive(Debug, Default)]
pub struct ClientCredentialsAuthenticationProvider;

#[async_trait]
impl AuthenticationProvider for ClientCredentialsAuthenticationProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::ClientCredentials
    }

    async fn authenticate(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant> {
        if !matches!(request.grant, GrantRequest::ClientCredentials) {
            return Err(unexpected_request(self.grant_type()));
        }

        let scopes = resolve_scopes(client, &request.scopes)?;
        Ok(AuthenticatedGrant::new(
            client,
            Principal::for_client(&client.client_id),
            scopes,
            GrantType::ClientCredentials,
        ))
    }
}

/// `grant_type=authorization_code`
pub struct AuthorizationCodeAuthenticationProvider {
    store: Arc<dyn AuthorizationService>,
}

impl AuthorizationCodeAuthenticationProvider {
    /// Create a provider consuming codes from `store`
    #[must_use]
    pub fn new(store: Arc<dyn AuthorizationService>) -> Self {
        Self { store }
    }

    fn verify_pkce(record: &Authorization, code_verifier: Option<&str>) -> AppResult<()> {
        let Some(code) = &record.authorization_code else {
            return Err(AppError::invalid_grant("Invalid authorization code"));
        };

        match (code.code_challenge.as_deref(), code_verifier) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(AppError::invalid_grant(
                "code_verifier supplied but no code_challenge was registered",
            )),
            (Some(_), None) => Err(AppError::invalid_grant("code_verifier is required")),
            (Some(challenge), Some(verifier)) => {
                let method = code.code_challenge_method.as_deref().unwrap_or(PKCE_METHOD_S256);
                if method != PKCE_METHOD_S256 {
                    return Err(AppError::invalid_grant("Unsupported code_challenge_method"));
                }
                if !crypto::is_valid_pkce_value(verifier) {
                    return Err(AppError::invalid_grant("Malformed code_verifier"));
                }
                let computed = crypto::pkce_s256_challenge(verifier);
                if crypto::constant_time_eq(&computed, challenge) {
                    Ok(())
                } else {
                    Err(AppError::invalid_grant("PKCE verification failed"))
                }
            }
        }
    }
}

#[async_trait]
impl AuthenticationProvider for AuthorizationCodeAuthenticationProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::AuthorizationCode
    }

    async fn authenticate(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant> {
        let GrantRequest::AuthorizationCode {
            code,
            redirect_uri,
            code_verifier,
        } = &request.grant
        else {
            return Err(unexpected_request(self.grant_type()));
        };

        // Consume first: a failed exchange still burns the code
        let record = self
            .store
            .consume_token(code, TokenKind::AuthorizationCode, &client.client_id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppLogger::log_security_event(
                    "authorization_code_rejected",
                    "medium",
                    &format!("code_fp={}", crypto::fingerprint(code)),
                    Some(&client.client_id),
                );
                AppError::invalid_grant("Invalid or expired authorization code")
            })?;

        let bound_redirect = record
            .authorization_code
            .as_ref()
            .map(|metadata| metadata.redirect_uri.as_str());
        if bound_redirect != Some(redirect_uri.as_str()) {
            warn!(client_id = %client.client_id, "redirect_uri does not match the authorize request");
            return Err(AppError::invalid_grant("redirect_uri mismatch"));
        }

        Self::verify_pkce(&record, code_verifier.as_deref())?;

        let mut grant = AuthenticatedGrant::new(
            client,
            record.principal.clone(),
            record.scopes.clone(),
            GrantType::AuthorizationCode,
        );
        grant.consumed = Some(ConsumedToken {
            authorization_id: record.id,
            kind: TokenKind::AuthorizationCode,
        });
        Ok(grant)
    }
}

/// `grant_type=refresh_token`; every use rotates the refresh token
pub struct RefreshTokenAuthenticationProvider {
    store: Arc<dyn AuthorizationService>,
    identities: Arc<dyn IdentityValidator>,
}

impl RefreshTokenAuthenticationProvider {
    /// Create a provider consuming refresh tokens from `store`
    #[must_use]
    pub fn new(store: Arc<dyn AuthorizationService>, identities: Arc<dyn IdentityValidator>) -> Self {
        Self { store, identities }
    }

    fn invalid_refresh_token() -> AppError {
        AppError::invalid_grant("Invalid or expired refresh token")
    }
}

#[async_trait]
impl AuthenticationProvider for RefreshTokenAuthenticationProvider {
    fn grant_type(&self) -> GrantType {
        GrantType::RefreshToken
    }

    async fn authenticate(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant> {
        let GrantRequest::RefreshToken { refresh_token } = &request.grant else {
            return Err(unexpected_request(self.grant_type()));
        };

        // Scope check before consuming so a bad scope does not burn the token
        let current = self
            .store
            .find_by_token(refresh_token, TokenKind::RefreshToken)
            .await?
            .filter(|record| record.client_id == client.client_id)
            .ok_or_else(Self::invalid_refresh_token)?;
        if !request.scopes.is_empty() && !request.scopes.is_subset(&current.scopes) {
            return Err(AppError::invalid_scope(
                "Requested scope exceeds the original grant",
            ));
        }

        let record = self
            .store
            .consume_token(refresh_token, TokenKind::RefreshToken, &client.client_id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppLogger::log_security_event(
                    "refresh_token_replay",
                    "high",
                    &format!("token_fp={}", crypto::fingerprint(refresh_token)),
                    Some(&client.client_id),
                );
                Self::invalid_refresh_token()
            })?;

        let principal = if record.principal.is_client() {
            record.principal.clone()
        } else {
            self.identities
                .load_by_subject(record.subject())
                .await?
                .ok_or_else(|| AppError::invalid_grant("Account is no longer active"))?
        };

        let scopes = if request.scopes.is_empty() {
            record.scopes.clone()
        } else {
            request.scopes.clone()
        };

        let mut grant = AuthenticatedGrant::new(client, principal, scopes, GrantType::RefreshToken);
        grant.consumed = Some(ConsumedToken {
            authorization_id: record.id,
            kind: TokenKind::RefreshToken,
        });
        Ok(grant)
    }
}

/// Client authentication plus one provider per grant type
pub struct ProviderRegistry {
    clients: Arc<ClientRegistrationManager>,
    providers: HashMap<GrantType, Arc<dyn AuthenticationProvider>>,
}

impl ProviderRegistry {
    /// Build a registry
    ///
    /// # Errors
    /// `ServerError` if two providers claim the same grant type
    pub fn new(
        clients: Arc<ClientRegistrationManager>,
        providers: Vec<Arc<dyn AuthenticationProvider>>,
    ) -> AppResult<Self> {
        let mut by_grant = HashMap::with_capacity(providers.len());
        for provider in providers {
            let grant_type = provider.grant_type();
            if by_grant.insert(grant_type, provider).is_some() {
                return Err(AppError::server_error(format!(
                    "Duplicate authentication provider for {grant_type}"
                )));
            }
        }
        Ok(Self {
            clients,
            providers: by_grant,
        })
    }

    /// Registry with the five built-in providers
    #[must_use]
    pub fn with_defaults(
        clients: Arc<ClientRegistrationManager>,
        store: Arc<dyn AuthorizationService>,
        identities: Arc<dyn IdentityValidator>,
        sms: Arc<dyn SmsValidator>,
    ) -> Self {
        let providers: [Arc<dyn AuthenticationProvider>; 5] = [
            Arc::new(PasswordAuthenticationProvider::new(identities.clone())),
            Arc::new(SmsCodeAuthenticationProvider::new(identities.clone(), sms)),
            Arc::new(RefreshTokenAuthenticationProvider::new(store.clone(), identities)),
            Arc::new(ClientCredentialsAuthenticationProvider),
            Arc::new(AuthorizationCodeAuthenticationProvider::new(store)),
        ];
        Self {
            clients,
            providers: providers
                .into_iter()
                .map(|provider| (provider.grant_type(), provider))
                .collect(),
        }
    }

    /// Client manager used for client authentication
    #[must_use]
    pub fn clients(&self) -> &ClientRegistrationManager {
        &self.clients
    }

    /// Whether a provider is registered for `grant_type`
    #[must_use]
    pub fn supports(&self, grant_type: GrantType) -> bool {
        self.providers.contains_key(&grant_type)
    }

    /// Authenticate the requesting client and check it may use the grant
    ///
    /// # Errors
    /// `InvalidClient` if authentication fails or the grant is not registered for the client
    pub async fn authenticate_client(&self, request: &AuthenticationRequest) -> AppResult<OAuth2Client> {
        let client = self
            .clients
            .validate_client(&request.client.client_id, &request.client.client_secret)
            .await?;

        let grant_type = request.grant_type();
        if !client.supports_grant(grant_type) {
            warn!(client_id = %client.client_id, %grant_type, "Client is not registered for grant type");
            return Err(AppError::invalid_client(format!(
                "unauthorized client: {grant_type} is not allowed for this client"
            )));
        }
        Ok(client)
    }

    /// Hand the request to the provider registered for its grant type
    ///
    /// # Errors
    /// `ServerError` if no provider is registered, otherwise whatever the provider returns
    pub async fn dispatch(
        &self,
        client: &OAuth2Client,
        request: &AuthenticationRequest,
    ) -> AppResult<AuthenticatedGrant> {
        let grant_type = request.grant_type();
        let provider = self.providers.get(&grant_type).ok_or_else(|| {
            AppError::server_error(format!("No authentication provider for {grant_type}"))
        })?;
        provider.authenticate(client, request).await
    }
}
