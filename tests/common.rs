// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, an in-memory server, and seeded client, user and SMS fixtures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `twelvet_auth`

use chrono::Duration;
use std::env;
use std::sync::{Arc, Once};
use tracing::Level;
use twelvet_auth::config::{ServerConfig, TokenFormat, TokenSettings};
use twelvet_auth::identity::{InMemoryIdentityStore, InMemorySmsCodeStore};
use twelvet_auth::models::Principal;
use twelvet_auth::oauth2_server::{
    ClientRegistrationRequest, Collaborators, InMemoryClientRepository, OAuth2AuthorizationServer,
    RawTokenRequest, TokenResponse,
};
use twelvet_auth::store::{AuthorizationService, InMemoryAuthorizationService};

pub const CLIENT_ID: &str = "web";
pub const CLIENT_SECRET: &str = "web-secret";
pub const REDIRECT_URI: &str = "https://app.twelvet.test/callback";
pub const ISSUER: &str = "https://auth.twelvet.test";

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "correct";
pub const USER_SUBJECT: &str = "u-alice";
pub const PHONE: &str = "13800000001";
pub const SMS_CODE: &str = "135790";

pub const ALL_GRANTS: &[&str] = &[
    "authorization_code",
    "client_credentials",
    "refresh_token",
    "password",
    "sms_code",
];

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration with a fixed secret and default lifetimes
pub fn test_config(token_format: TokenFormat) -> ServerConfig {
    ServerConfig {
        issuer: ISSUER.to_owned(),
        tokens: TokenSettings::default(),
        token_format,
        jwt_secret: vec![42u8; 32],
    }
}

/// Server plus handles on the collaborators tests poke at directly
pub struct TestServer {
    pub server: OAuth2AuthorizationServer,
    pub store: Arc<dyn AuthorizationService>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub sms: Arc<InMemorySmsCodeStore>,
}

/// JWT server over fresh in-memory collaborators, seeded with the default fixtures
pub async fn create_test_server() -> TestServer {
    create_test_server_with(
        Arc::new(InMemoryAuthorizationService::new()),
        TokenFormat::Jwt,
    )
    .await
}

/// Server over the given store, seeded with the default fixtures
///
/// The default client may use every grant type but is only permitted the `read` scope.
pub async fn create_test_server_with(
    store: Arc<dyn AuthorizationService>,
    token_format: TokenFormat,
) -> TestServer {
    init_test_logging();

    let identities = Arc::new(InMemoryIdentityStore::new());
    let sms = Arc::new(InMemorySmsCodeStore::new(Duration::minutes(5)));
    let server = OAuth2AuthorizationServer::from_config(
        &test_config(token_format),
        Collaborators {
            store: store.clone(),
            clients: Arc::new(InMemoryClientRepository::new()),
            identities: identities.clone(),
            sms: sms.clone(),
        },
    )
    .expect("server builds from test config");

    let fixture = TestServer {
        server,
        store,
        identities,
        sms,
    };
    fixture
        .register_client(CLIENT_ID, CLIENT_SECRET, ALL_GRANTS, "read")
        .await;
    fixture
        .identities
        .register_user(
            Principal::new(USER_SUBJECT, USERNAME)
                .with_tenant("t-1")
                .with_authority("ROLE_USER"),
            PASSWORD,
            Some(PHONE),
        )
        .expect("register test user");
    fixture.sms.insert(PHONE, SMS_CODE);
    fixture
}

impl TestServer {
    /// Register a client with fixed credentials
    pub async fn register_client(&self, client_id: &str, secret: &str, grants: &[&str], scope: &str) {
        self.server
            .clients()
            .register_client_with_credentials(
                client_id,
                secret,
                ClientRegistrationRequest {
                    redirect_uris: vec![REDIRECT_URI.to_owned()],
                    grant_types: Some(grants.iter().map(|g| (*g).to_owned()).collect()),
                    scope: Some(scope.to_owned()),
                    ..ClientRegistrationRequest::default()
                },
            )
            .await
            .expect("register test client");
    }

    /// Password grant for the default user, expected to succeed
    pub async fn password_tokens(&self) -> TokenResponse {
        self.server
            .token(password_request(USERNAME, PASSWORD, None))
            .await
            .expect("password grant succeeds")
    }
}

/// Token request carrying the default client's credentials
pub fn client_request(grant_type: &str) -> RawTokenRequest {
    RawTokenRequest::from_params([
        ("grant_type", grant_type),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
    ])
}

/// Password grant request for the default client
pub fn password_request(username: &str, password: &str, scope: Option<&str>) -> RawTokenRequest {
    let request = client_request("password")
        .with_param("username", username)
        .with_param("password", password);
    match scope {
        Some(scope) => request.with_param("scope", scope),
        None => request,
    }
}

/// SMS grant request for the default client
pub fn sms_request(phone: &str, code: &str) -> RawTokenRequest {
    client_request("sms_code")
        .with_param("phone", phone)
        .with_param("code", code)
}

/// Refresh grant request for the default client
pub fn refresh_request(refresh_token: &str) -> RawTokenRequest {
    client_request("refresh_token").with_param("refresh_token", refresh_token)
}
