// ABOUTME: OAuth 2.0 authorization server composing the token pipeline and its auxiliary endpoints
// ABOUTME: Token, authorize, introspect, revoke and register operations over explicit collaborators
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::authentication::{resolve_scopes, AuthenticatedGrant, ProviderRegistry};
use super::client_registration::{ClientRegistrationManager, ClientRepository};
use super::converters::DelegatingAuthenticationConverter;
use super::customizer::{IdentityClaimsCustomizer, TokenClaimsCustomizer};
use super::handlers::{
    AuthenticationFailureHandler, AuthenticationSuccessHandler, DefaultFailureHandler,
    DefaultSuccessHandler,
};
use super::lifecycle::{RequestLifecycle, RequestState};
use super::models::{
    AuthorizeRequest, AuthorizeResponse, ClientCredentials, ClientRegistrationRequest,
    ClientRegistrationResponse, ErrorResponse, IntrospectionResponse, RawTokenRequest,
    TokenResponse,
};
use super::signer::{JwtTokenSigner, OpaqueTokenSigner, TokenSigner};
use super::token_generator::{AccessTokenGenerator, DelegatingTokenGenerator, RefreshTokenGenerator};
use crate::config::{ServerConfig, TokenFormat};
use crate::constants::defaults;
use crate::crypto;
use crate::errors::{AppError, AppResult};
use crate::identity::{IdentityValidator, SmsValidator};
use crate::logging::AppLogger;
use crate::models::{
    Authorization, AuthorizationCodeMetadata, GrantType, OAuth2Client, Principal, Scopes,
    TokenKind, TokenMetadata, TokenSet,
};
use crate::store::AuthorizationService;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{field, info_span, Instrument};
use uuid::Uuid;

const PKCE_METHOD_S256: &str = "S256";

/// External collaborators the server is built over
#[derive(Clone)]
pub struct Collaborators {
    /// Authorization record store
    pub store: Arc<dyn AuthorizationService>,
    /// Registered clients
    pub clients: Arc<dyn ClientRepository>,
    /// Password and identity lookups
    pub identities: Arc<dyn IdentityValidator>,
    /// One-time SMS codes
    pub sms: Arc<dyn SmsValidator>,
}

/// Which failure handler answers an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureStage {
    ClientAuthentication,
    Token,
}

struct Failure {
    stage: FailureStage,
    error: AppError,
}

impl Failure {
    const fn client(error: AppError) -> Self {
        Self {
            stage: FailureStage::ClientAuthentication,
            error,
        }
    }

    const fn token(error: AppError) -> Self {
        Self {
            stage: FailureStage::Token,
            error,
        }
    }
}

impl From<AppError> for Failure {
    fn from(error: AppError) -> Self {
        Self::token(error)
    }
}

/// OAuth 2.0 Authorization Server
///
/// Cheap to clone; every component is shared read-only behind an `Arc`.
#[derive(Clone)]
pub struct OAuth2AuthorizationServer {
    converter: Arc<DelegatingAuthenticationConverter>,
    providers: Arc<ProviderRegistry>,
    generator: Arc<DelegatingTokenGenerator>,
    store: Arc<dyn AuthorizationService>,
    success_handler: Arc<dyn AuthenticationSuccessHandler>,
    client_auth_failure_handler: Arc<dyn AuthenticationFailureHandler>,
    token_failure_handler: Arc<dyn AuthenticationFailureHandler>,
    authorization_code_ttl: Duration,
}

impl OAuth2AuthorizationServer {
    /// Start building a server
    #[must_use]
    pub fn builder() -> OAuth2AuthorizationServerBuilder {
        OAuth2AuthorizationServerBuilder::default()
    }

    /// Standard pipeline from configuration: all five grants, default handlers
    ///
    /// # Errors
    /// `ServerError` if the configured JWT secret is unusable
    pub fn from_config(config: &ServerConfig, collaborators: Collaborators) -> AppResult<Self> {
        let clients = Arc::new(ClientRegistrationManager::new(collaborators.clients));
        let providers = ProviderRegistry::with_defaults(
            clients,
            collaborators.store.clone(),
            collaborators.identities,
            collaborators.sms,
        );

        let signer: Arc<dyn TokenSigner> = match config.token_format {
            TokenFormat::Jwt => Arc::new(JwtTokenSigner::new(&config.jwt_secret, config.issuer.as_str())?),
            TokenFormat::Opaque => Arc::new(OpaqueTokenSigner),
        };
        let customizer: Arc<dyn TokenClaimsCustomizer> =
            Arc::new(IdentityClaimsCustomizer::new(config.issuer.as_str()));
        let generator = DelegatingTokenGenerator::new(vec![
            Arc::new(AccessTokenGenerator::new(
                signer,
                customizer,
                config.issuer.as_str(),
                config.tokens.access_token_ttl,
            )),
            Arc::new(RefreshTokenGenerator::new(config.tokens.refresh_token_ttl)),
        ])?;

        Self::builder()
            .providers(providers)
            .token_generator(generator)
            .store(collaborators.store)
            .authorization_code_ttl(config.tokens.authorization_code_ttl)
            .build()
    }

    /// Client registration manager backing client authentication
    #[must_use]
    pub fn clients(&self) -> &ClientRegistrationManager {
        self.providers.clients()
    }

    /// Grant types the converter chain recognizes
    #[must_use]
    pub fn grant_types(&self) -> Vec<GrantType> {
        self.converter.grant_types()
    }

    /// Handle a token request (POST /oauth/token)
    ///
    /// Either a complete token response is returned, with its authorization
    /// already persisted, or an error response and nothing is stored.
    ///
    /// # Errors
    /// Returns the mapped error response for any conversion, authentication,
    /// generation or persistence failure
    pub async fn token(&self, request: RawTokenRequest) -> Result<TokenResponse, ErrorResponse> {
        let span = info_span!(
            "token_request",
            grant_type = request.grant_type().unwrap_or("none"),
            client_id = field::Empty,
            state = field::Empty,
        );
        if let Some(credentials) = request.client_credentials() {
            span.record("client_id", credentials.client_id.as_str());
        }

        let mut lifecycle = RequestLifecycle::new(span.clone());
        let outcome = self
            .run_token_pipeline(&request, &mut lifecycle)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match outcome {
            Ok(response) => Ok(response),
            Err(failure) => {
                lifecycle.fail(failure.error.code);
                Err(self.respond_failure(&failure))
            }
        }
    }

    async fn run_token_pipeline(
        &self,
        request: &RawTokenRequest,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<TokenResponse, Failure> {
        let authentication = self.converter.convert(request)?;
        lifecycle.advance(RequestState::Converted)?;

        let client = self
            .providers
            .authenticate_client(&authentication)
            .await
            .map_err(Failure::client)?;
        let grant = self.providers.dispatch(&client, &authentication).await?;
        lifecycle.advance(RequestState::Validated)?;

        let tokens = match self.issue(&grant, lifecycle).await {
            Ok(tokens) => tokens,
            Err(error) => {
                self.release_consumed(&grant).await;
                return Err(error.into());
            }
        };

        let response = self.success_handler.on_success(&tokens);
        lifecycle.advance(RequestState::Responded)?;

        AppLogger::log_token_issued(
            &grant.client.client_id,
            grant.principal.subject(),
            grant.grant_type.as_str(),
            &tokens.authorization_id.to_string(),
            tokens.refresh_token.is_some(),
        );
        Ok(response)
    }

    async fn issue(
        &self,
        grant: &AuthenticatedGrant,
        lifecycle: &mut RequestLifecycle,
    ) -> AppResult<TokenSet> {
        let tokens = self
            .generator
            .generate_token_set(grant, Uuid::new_v4(), Utc::now())?;
        lifecycle.advance(RequestState::TokenGenerated)?;

        self.persist(grant, &tokens).await?;
        lifecycle.advance(RequestState::Persisted)?;
        Ok(tokens)
    }

    /// Restore the code or refresh token a failed issuance consumed
    async fn release_consumed(&self, grant: &AuthenticatedGrant) {
        let Some(consumed) = grant.consumed else {
            return;
        };
        match self
            .store
            .release_token(consumed.authorization_id, consumed.kind)
            .await
        {
            Ok(released) => tracing::debug!(
                authorization_id = %consumed.authorization_id,
                token_kind = %consumed.kind,
                released,
                "Released single-use token after failed issuance"
            ),
            Err(e) => tracing::error!(
                authorization_id = %consumed.authorization_id,
                token_kind = %consumed.kind,
                error = %e,
                "Failed to release single-use token after failed issuance"
            ),
        }
    }

    async fn persist(&self, grant: &AuthenticatedGrant, tokens: &TokenSet) -> AppResult<()> {
        let authorization = Authorization {
            id: tokens.authorization_id,
            client_id: grant.client.client_id.clone(),
            principal: grant.principal.clone(),
            grant_type: grant.grant_type,
            scopes: tokens.scopes.clone(),
            access_token: Some(tokens.access_token.clone()),
            refresh_token: tokens.refresh_token.clone(),
            authorization_code: None,
            created_at: tokens.access_token.issued_at,
        };

        self.store.save(authorization).await.map_err(|e| {
            tracing::error!(
                authorization_id = %tokens.authorization_id,
                error = %e,
                "Failed to persist authorization; discarding generated tokens"
            );
            e.into_server_error("Failed to persist authorization")
        })
    }

    fn respond_failure(&self, failure: &Failure) -> ErrorResponse {
        match failure.stage {
            FailureStage::ClientAuthentication => {
                self.client_auth_failure_handler.on_failure(&failure.error)
            }
            FailureStage::Token => self.token_failure_handler.on_failure(&failure.error),
        }
    }

    /// Handle an authorization request (GET /oauth/authorize)
    ///
    /// `principal` is the already-authenticated, consenting resource owner.
    ///
    /// # Errors
    /// Returns an error response if the client, redirect URI, scope or PKCE
    /// parameters are invalid, or the code cannot be stored
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
        principal: &Principal,
    ) -> Result<AuthorizeResponse, ErrorResponse> {
        self.issue_authorization_code(request, principal)
            .instrument(info_span!("authorize_request"))
            .await
            .map_err(|failure| self.respond_failure(&failure))
    }

    async fn issue_authorization_code(
        &self,
        request: AuthorizeRequest,
        principal: &Principal,
    ) -> Result<AuthorizeResponse, Failure> {
        let client = self.authorizing_client(&request.client_id).await.map_err(Failure::client)?;

        if request.response_type != "code" {
            return Err(AppError::invalid_request("Only 'code' response_type is supported").into());
        }

        if !client.has_redirect_uri(&request.redirect_uri) {
            return Err(AppError::invalid_request("Invalid redirect_uri").into());
        }

        let requested = request.scope.as_deref().map(Scopes::parse).unwrap_or_default();
        let scopes = resolve_scopes(&client, &requested)?;

        let (code_challenge, code_challenge_method) = Self::validate_pkce_request(&request)?;

        let code = crypto::random_token(defaults::OPAQUE_TOKEN_BYTES)?;
        let now = Utc::now();
        let authorization = Authorization {
            id: Uuid::new_v4(),
            client_id: client.client_id.clone(),
            principal: principal.clone(),
            grant_type: GrantType::AuthorizationCode,
            scopes,
            access_token: None,
            refresh_token: None,
            authorization_code: Some(AuthorizationCodeMetadata {
                token: TokenMetadata::new(code.as_str(), now, now + self.authorization_code_ttl),
                redirect_uri: request.redirect_uri.clone(),
                code_challenge,
                code_challenge_method,
                state: request.state.clone(),
            }),
            created_at: now,
        };
        self.store
            .save(authorization)
            .await
            .map_err(|e| e.into_server_error("Failed to store authorization code"))?;

        tracing::info!(
            client_id = %client.client_id,
            subject = %principal.subject(),
            code_fp = %crypto::fingerprint(&code),
            "Authorization code issued"
        );

        Ok(AuthorizeResponse {
            code,
            state: request.state,
            redirect_uri: request.redirect_uri,
        })
    }

    async fn authorizing_client(&self, client_id: &str) -> AppResult<OAuth2Client> {
        let client = self.clients().get_client(client_id).await?;
        if client.is_expired(Utc::now()) {
            return Err(AppError::invalid_client("Client registration has expired"));
        }
        if !client.supports_grant(GrantType::AuthorizationCode) {
            return Err(AppError::invalid_client(
                "unauthorized client: authorization_code is not allowed for this client",
            ));
        }
        Ok(client)
    }

    /// PKCE is optional; when present only S256 with a well-formed challenge is accepted
    fn validate_pkce_request(
        request: &AuthorizeRequest,
    ) -> AppResult<(Option<String>, Option<String>)> {
        let Some(challenge) = request.code_challenge.as_deref().map(str::trim) else {
            if request.code_challenge_method.is_some() {
                return Err(AppError::invalid_request(
                    "code_challenge_method given without code_challenge",
                ));
            }
            return Ok((None, None));
        };

        if !crypto::is_valid_pkce_value(challenge) {
            return Err(AppError::invalid_request(format!(
                "code_challenge must be {}-{} unreserved characters",
                crypto::PKCE_MIN_LEN,
                crypto::PKCE_MAX_LEN
            )));
        }

        let method = request.code_challenge_method.as_deref().unwrap_or(PKCE_METHOD_S256);
        if method != PKCE_METHOD_S256 {
            return Err(AppError::invalid_request(
                "code_challenge_method must be 'S256' (plain is not supported)",
            ));
        }

        Ok((Some(challenge.to_owned()), Some(PKCE_METHOD_S256.to_owned())))
    }

    /// Token introspection (RFC 7662)
    ///
    /// # Errors
    /// Returns an error response if the calling client fails authentication
    pub async fn introspect(
        &self,
        credentials: &ClientCredentials,
        token: &str,
    ) -> Result<IntrospectionResponse, ErrorResponse> {
        let span = info_span!("introspect_request", client_id = %credentials.client_id);
        self.introspect_token(credentials, token)
            .instrument(span)
            .await
            .map_err(|failure| self.respond_failure(&failure))
    }

    async fn introspect_token(
        &self,
        credentials: &ClientCredentials,
        token: &str,
    ) -> Result<IntrospectionResponse, Failure> {
        self.clients()
            .validate_client(&credentials.client_id, &credentials.client_secret)
            .await
            .map_err(Failure::client)?;

        let now = Utc::now();
        for kind in [TokenKind::AccessToken, TokenKind::RefreshToken] {
            let Some(record) = self.store.find_by_token(token, kind).await? else {
                continue;
            };
            let Some(metadata) = record.token(kind).filter(|t| t.is_active(now)) else {
                return Ok(IntrospectionResponse::inactive());
            };
            return Ok(IntrospectionResponse {
                active: true,
                scope: record.scopes.to_param(),
                client_id: Some(record.client_id.clone()),
                username: Some(record.principal.username().to_owned()),
                sub: Some(record.subject().to_owned()),
                exp: Some(metadata.expires_at.timestamp()),
                iat: Some(metadata.issued_at.timestamp()),
                token_type: Some(kind.as_str().to_owned()),
            });
        }
        Ok(IntrospectionResponse::inactive())
    }

    /// Token revocation (RFC 7009)
    ///
    /// Removes the whole authorization owning `token`. Unknown tokens and
    /// tokens owned by another client succeed without effect.
    ///
    /// # Errors
    /// Returns an error response if the calling client fails authentication or the store fails
    pub async fn revoke(
        &self,
        credentials: &ClientCredentials,
        token: &str,
        token_type_hint: Option<&str>,
    ) -> Result<(), ErrorResponse> {
        let span = info_span!("revoke_request", client_id = %credentials.client_id);
        self.revoke_token(credentials, token, token_type_hint)
            .instrument(span)
            .await
            .map_err(|failure| self.respond_failure(&failure))
    }

    async fn revoke_token(
        &self,
        credentials: &ClientCredentials,
        token: &str,
        token_type_hint: Option<&str>,
    ) -> Result<(), Failure> {
        let client = self
            .clients()
            .validate_client(&credentials.client_id, &credentials.client_secret)
            .await
            .map_err(Failure::client)?;

        let kinds = if token_type_hint == Some(TokenKind::RefreshToken.as_str()) {
            [TokenKind::RefreshToken, TokenKind::AccessToken]
        } else {
            [TokenKind::AccessToken, TokenKind::RefreshToken]
        };

        for kind in kinds {
            let Some(record) = self.store.find_by_token(token, kind).await? else {
                continue;
            };
            if record.client_id != client.client_id {
                AppLogger::log_security_event(
                    "foreign_token_revocation",
                    "medium",
                    &format!("token_fp={}", crypto::fingerprint(token)),
                    Some(&client.client_id),
                );
                return Ok(());
            }
            self.store.remove(record.id).await?;
            tracing::info!(
                client_id = %client.client_id,
                authorization_id = %record.id,
                token_kind = %kind,
                "Authorization revoked"
            );
            return Ok(());
        }
        Ok(())
    }

    /// Register a client (RFC 7591)
    ///
    /// # Errors
    /// Returns an error response if the registration request is invalid or cannot be stored
    pub async fn register_client(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, ErrorResponse> {
        self.clients()
            .register_client(request)
            .await
            .map_err(|e| self.token_failure_handler.on_failure(&e))
    }
}

/// Builder for [`OAuth2AuthorizationServer`]
#[derive(Default)]
pub struct OAuth2AuthorizationServerBuilder {
    converter: Option<DelegatingAuthenticationConverter>,
    providers: Option<ProviderRegistry>,
    generator: Option<DelegatingTokenGenerator>,
    store: Option<Arc<dyn AuthorizationService>>,
    success_handler: Option<Arc<dyn AuthenticationSuccessHandler>>,
    client_auth_failure_handler: Option<Arc<dyn AuthenticationFailureHandler>>,
    token_failure_handler: Option<Arc<dyn AuthenticationFailureHandler>>,
    authorization_code_ttl: Option<Duration>,
}

impl OAuth2AuthorizationServerBuilder {
    /// Converter chain; defaults to the five built-in converters
    #[must_use]
    pub fn converter(mut self, converter: DelegatingAuthenticationConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Provider registry (required)
    #[must_use]
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Token generator chain (required)
    #[must_use]
    pub fn token_generator(mut self, generator: DelegatingTokenGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Authorization store (required)
    #[must_use]
    pub fn store(mut self, store: Arc<dyn AuthorizationService>) -> Self {
        self.store = Some(store);
        self
    }

    /// Success handler
    #[must_use]
    pub fn success_handler(mut self, handler: Arc<dyn AuthenticationSuccessHandler>) -> Self {
        self.success_handler = Some(handler);
        self
    }

    /// Handler for client authentication failures
    #[must_use]
    pub fn client_auth_failure_handler(
        mut self,
        handler: Arc<dyn AuthenticationFailureHandler>,
    ) -> Self {
        self.client_auth_failure_handler = Some(handler);
        self
    }

    /// Handler for every other token endpoint failure
    #[must_use]
    pub fn token_failure_handler(mut self, handler: Arc<dyn AuthenticationFailureHandler>) -> Self {
        self.token_failure_handler = Some(handler);
        self
    }

    /// Authorization code lifetime; defaults to ten minutes
    #[must_use]
    pub const fn authorization_code_ttl(mut self, ttl: Duration) -> Self {
        self.authorization_code_ttl = Some(ttl);
        self
    }

    /// Assemble the server
    ///
    /// # Errors
    /// `ServerError` if a required component is missing or a converter's grant
    /// type has no provider
    pub fn build(self) -> AppResult<OAuth2AuthorizationServer> {
        let providers = self
            .providers
            .ok_or_else(|| AppError::server_error("Authorization server needs a provider registry"))?;
        let generator = self
            .generator
            .ok_or_else(|| AppError::server_error("Authorization server needs a token generator"))?;
        let store = self
            .store
            .ok_or_else(|| AppError::server_error("Authorization server needs an authorization store"))?;
        let converter = self
            .converter
            .unwrap_or_else(DelegatingAuthenticationConverter::with_defaults);

        if let Some(orphan) = converter
            .grant_types()
            .into_iter()
            .find(|grant_type| !providers.supports(*grant_type))
        {
            return Err(AppError::server_error(format!(
                "Converter for {orphan} has no matching authentication provider"
            )));
        }

        let default_failure: Arc<dyn AuthenticationFailureHandler> = Arc::new(DefaultFailureHandler);
        Ok(OAuth2AuthorizationServer {
            converter: Arc::new(converter),
            providers: Arc::new(providers),
            generator: Arc::new(generator),
            store,
            success_handler: self
                .success_handler
                .unwrap_or_else(|| Arc::new(DefaultSuccessHandler)),
            client_auth_failure_handler: self
                .client_auth_failure_handler
                .unwrap_or_else(|| default_failure.clone()),
            token_failure_handler: self.token_failure_handler.unwrap_or(default_failure),
            authorization_code_ttl: self
                .authorization_code_ttl
                .unwrap_or_else(|| Duration::seconds(defaults::AUTH_CODE_TTL_SECS)),
        })
    }
}

