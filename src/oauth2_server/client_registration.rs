// ABOUTME: OAuth 2.0 client registration (RFC 7591) and client authentication
// ABOUTME: Client repository contract, in-memory repository, Argon2id secrets and redirect URI rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::models::{ClientRegistrationRequest, ClientRegistrationResponse};
use crate::constants::{defaults, OOB_REDIRECT_URI};
use crate::crypto;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{GrantType, OAuth2Client};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Storage for registered clients
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Client by identifier
    ///
    /// # Errors
    /// `ServerError` if the backend fails
    async fn find_by_client_id(&self, client_id: &str) -> AppResult<Option<OAuth2Client>>;

    /// Store a new client
    ///
    /// # Errors
    /// `InvalidRequest` if the identifier is taken, `ServerError` if the backend fails
    async fn save(&self, client: OAuth2Client) -> AppResult<()>;
}

/// In-memory client repository
#[derive(Debug, Default)]
pub struct InMemoryClientRepository {
    clients: DashMap<String, OAuth2Client>,
}

impl InMemoryClientRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_by_client_id(&self, client_id: &str) -> AppResult<Option<OAuth2Client>> {
        Ok(self.clients.get(client_id).map(|client| client.value().clone()))
    }

    async fn save(&self, client: OAuth2Client) -> AppResult<()> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AppError::invalid_request(format!(
                "Client already registered: {}",
                client.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client);
                Ok(())
            }
        }
    }
}

/// OAuth 2.0 Client Registration Manager
pub struct ClientRegistrationManager {
    repository: Arc<dyn ClientRepository>,
}

impl ClientRegistrationManager {
    /// Creates a new client registration manager
    #[must_use]
    pub fn new(repository: Arc<dyn ClientRepository>) -> Self {
        Self { repository }
    }

    /// Register a new OAuth 2.0 client with generated credentials (RFC 7591)
    ///
    /// # Errors
    /// `InvalidRequest` if validation fails; `ServerError` if secret generation or storage fails
    pub async fn register_client(
        &self,
        request: ClientRegistrationRequest,
    ) -> AppResult<ClientRegistrationResponse> {
        let client_id = format!("twelvet_{}", Uuid::new_v4().simple());
        let client_secret = crypto::random_token(defaults::OPAQUE_TOKEN_BYTES)?;
        self.register_client_with_credentials(&client_id, &client_secret, request)
            .await
    }

    /// Register a client with caller-chosen credentials (provisioning, fixtures)
    ///
    /// # Errors
    /// `InvalidRequest` if validation fails or the id is taken; `ServerError` if storage fails
    pub async fn register_client_with_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        request: ClientRegistrationRequest,
    ) -> AppResult<ClientRegistrationResponse> {
        if client_id.trim().is_empty() || client_secret.is_empty() {
            return Err(AppError::invalid_request(
                "client_id and client_secret must not be empty",
            ));
        }

        // Only authorization_code by default; clients must explicitly request other grants
        let grant_types = request
            .grant_types
            .clone()
            .unwrap_or_else(|| vec![GrantType::AuthorizationCode.as_str().to_owned()]);
        let response_types = request
            .response_types
            .clone()
            .unwrap_or_else(|| vec!["code".to_owned()]);

        Self::validate_registration_request(&request, &grant_types, &response_types)?;

        let created_at = Utc::now();
        let expires_at = Some(created_at + Duration::days(defaults::CLIENT_REGISTRATION_TTL_DAYS));

        let client = OAuth2Client {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_owned(),
            client_secret_hash: crypto::hash_secret(client_secret)?,
            redirect_uris: request.redirect_uris.clone(),
            grant_types: grant_types.clone(),
            response_types: response_types.clone(),
            client_name: request.client_name.clone(),
            client_uri: request.client_uri.clone(),
            scope: request.scope.clone(),
            created_at,
            expires_at,
        };

        self.repository.save(client).await.map_err(|e| {
            if e.code == ErrorCode::InvalidRequest {
                return e;
            }
            tracing::error!(error = %e, client_id = %client_id, "Failed to store OAuth2 client registration");
            e.into_server_error("Failed to store client registration")
        })?;

        tracing::info!(client_id = %client_id, grant_types = ?grant_types, "OAuth client registered");

        Ok(ClientRegistrationResponse {
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            client_id_issued_at: Some(created_at.timestamp()),
            client_secret_expires_at: expires_at.map(|dt| dt.timestamp()),
            redirect_uris: request.redirect_uris,
            grant_types,
            response_types,
            client_name: request.client_name,
            client_uri: request.client_uri,
            scope: request.scope,
        })
    }

    /// Validate client credentials
    ///
    /// # Errors
    /// `InvalidClient` if the client is unknown, the secret is wrong, or the
    /// registration has expired; `ServerError` if the repository fails
    pub async fn validate_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> AppResult<OAuth2Client> {
        tracing::debug!("Validating OAuth client: {}", client_id);

        let Some(client) = self.repository.find_by_client_id(client_id).await? else {
            tracing::warn!("OAuth client {} not found", client_id);
            crypto::verify_decoy_secret(client_secret)?;
            return Err(AppError::invalid_client("Client authentication failed"));
        };

        // Constant-time comparison happens inside Argon2
        let verified = crypto::verify_secret(client_secret, &client.client_secret_hash)
            .map_err(|e| e.into_server_error("Stored client secret hash is malformed"))?;
        if !verified {
            tracing::warn!("OAuth client {} secret validation failed", client_id);
            return Err(AppError::invalid_client("Client authentication failed"));
        }

        Self::check_client_expiry(client_id, client.expires_at, Utc::now())?;

        tracing::debug!("OAuth client {} validated successfully", client_id);
        Ok(client)
    }

    /// Get client by `client_id`
    ///
    /// # Errors
    /// `InvalidClient` if not found, `ServerError` if the repository fails
    pub async fn get_client(&self, client_id: &str) -> AppResult<OAuth2Client> {
        self.repository
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("OAuth client {} not found", client_id);
                AppError::invalid_client("Client authentication failed")
            })
    }

    /// Check if client is expired
    fn check_client_expiry(
        client_id: &str,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(expires_at) = expires_at {
            if now > expires_at {
                tracing::warn!("OAuth client {} has expired", client_id);
                return Err(AppError::invalid_client("Client registration has expired"));
            }
        }
        Ok(())
    }

    /// Validate registration request
    fn validate_registration_request(
        request: &ClientRegistrationRequest,
        grant_types: &[String],
        response_types: &[String],
    ) -> AppResult<()> {
        for grant_type in grant_types {
            if GrantType::from_param(grant_type).is_none() {
                return Err(AppError::invalid_request(format!(
                    "Unsupported grant_type: {grant_type}"
                )));
            }
        }

        for response_type in response_types {
            if !Self::is_supported_response_type(response_type) {
                return Err(AppError::invalid_request(format!(
                    "Unsupported response_type: {response_type}"
                )));
            }
        }

        let uses_redirects = grant_types
            .iter()
            .any(|g| g == GrantType::AuthorizationCode.as_str());
        if uses_redirects && request.redirect_uris.is_empty() {
            return Err(AppError::invalid_request(
                "At least one redirect_uri is required for authorization_code",
            ));
        }

        for uri in &request.redirect_uris {
            if !Self::is_valid_redirect_uri(uri) {
                return Err(AppError::invalid_request(format!(
                    "Invalid redirect_uri: {uri}"
                )));
            }
        }

        Ok(())
    }

    /// Check if redirect URI is valid
    fn is_valid_redirect_uri(uri: &str) -> bool {
        // RFC 6749 Section 3.1.2: absolute, no fragment; https except loopback
        if !Self::validate_uri_format(uri) {
            return false;
        }

        // Allow out-of-band URN for native apps (RFC 8252)
        if uri == OOB_REDIRECT_URI {
            return true;
        }

        Self::validate_http_uri(uri)
    }

    /// Validate basic URI format requirements
    fn validate_uri_format(uri: &str) -> bool {
        if uri.trim().is_empty() {
            return false;
        }

        if uri.contains('#') {
            tracing::warn!("Rejected redirect_uri with fragment: {}", uri);
            return false;
        }

        // Wildcards would allow subdomain bypass
        if uri.contains('*') {
            tracing::warn!("Rejected redirect_uri with wildcard: {}", uri);
            return false;
        }

        true
    }

    /// Validate HTTP(S) URI scheme and host
    fn validate_http_uri(uri: &str) -> bool {
        let Ok(parsed_uri) = Url::parse(uri) else {
            tracing::warn!("Rejected malformed redirect_uri: {}", uri);
            return false;
        };

        let scheme = parsed_uri.scheme();
        let is_localhost = matches!(parsed_uri.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

        if scheme == "https" || (scheme == "http" && is_localhost) {
            return true;
        }

        tracing::warn!(
            "Rejected redirect_uri with non-HTTPS scheme for non-localhost: {}",
            uri
        );
        false
    }

    /// Check if response type is supported
    fn is_supported_response_type(response_type: &str) -> bool {
        matches!(response_type, "code")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ClientRegistrationManager {
        ClientRegistrationManager::new(Arc::new(InMemoryClientRepository::new()))
    }

    #[test]
    fn test_redirect_uri_rules() {
        assert!(ClientRegistrationManager::is_valid_redirect_uri("https://app.example.com/cb"));
        assert!(ClientRegistrationManager::is_valid_redirect_uri("http://localhost:8080/cb"));
        assert!(ClientRegistrationManager::is_valid_redirect_uri("http://127.0.0.1/cb"));
        assert!(ClientRegistrationManager::is_valid_redirect_uri(OOB_REDIRECT_URI));
        assert!(!ClientRegistrationManager::is_valid_redirect_uri("http://evil.example.com/cb"));
        assert!(!ClientRegistrationManager::is_valid_redirect_uri("https://app.example.com/cb#x"));
        assert!(!ClientRegistrationManager::is_valid_redirect_uri("https://*.example.com/cb"));
        assert!(!ClientRegistrationManager::is_valid_redirect_uri("/relative"));
    }

    #[tokio::test]
    async fn test_password_client_needs_no_redirect() {
        let manager = manager();
        let response = manager
            .register_client(ClientRegistrationRequest {
                grant_types: Some(vec!["password".to_owned(), "sms_code".to_owned()]),
                scope: Some("read".to_owned()),
                ..ClientRegistrationRequest::default()
            })
            .await
            .unwrap();

        assert!(response.client_id.starts_with("twelvet_"));
        let client = manager
            .validate_client(&response.client_id, &response.client_secret)
            .await
            .unwrap();
        assert!(client.supports_grant(GrantType::SmsCode));
    }

    #[tokio::test]
    async fn test_code_client_needs_redirect() {
        let error = manager()
            .register_client(ClientRegistrationRequest::default())
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_unknown_grant_type_rejected() {
        let error = manager()
            .register_client(ClientRegistrationRequest {
                grant_types: Some(vec!["implicit".to_owned()]),
                ..ClientRegistrationRequest::default()
            })
            .await
            .unwrap_err();
        assert!(error.message.contains("implicit"));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_invalid_client() {
        let manager = manager();
        manager
            .register_client_with_credentials(
                "web",
                "right",
                ClientRegistrationRequest {
                    grant_types: Some(vec!["client_credentials".to_owned()]),
                    ..ClientRegistrationRequest::default()
                },
            )
            .await
            .unwrap();

        let wrong = manager.validate_client("web", "wrong").await.unwrap_err();
        let unknown = manager.validate_client("nobody", "right").await.unwrap_err();
        assert_eq!(wrong.code, ErrorCode::InvalidClient);
        assert_eq!(unknown.code, ErrorCode::InvalidClient);
    }

    #[test]
    fn test_expired_client_rejected() {
        let now = Utc::now();
        let past = Some(now - Duration::seconds(1));
        let error = ClientRegistrationManager::check_client_expiry("web", past, now).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidClient);
    }
}
