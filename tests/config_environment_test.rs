// ABOUTME: Integration tests for environment-based server configuration
// ABOUTME: Defaults, overrides, malformed values and the resulting server behaviour
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use base64::{engine::general_purpose, Engine as _};
use chrono::Duration;
use serial_test::serial;
use std::env;
use std::sync::Arc;
use twelvet_auth::config::{ServerConfig, TokenFormat};
use twelvet_auth::constants::{defaults, env_config};
use twelvet_auth::identity::{InMemoryIdentityStore, InMemorySmsCodeStore};
use twelvet_auth::oauth2_server::{
    ClientRegistrationRequest, Collaborators, InMemoryClientRepository, OAuth2AuthorizationServer,
    RawTokenRequest,
};
use twelvet_auth::store::InMemoryAuthorizationService;

const ALL_VARS: [&str; 6] = [
    env_config::ISSUER,
    env_config::ACCESS_TOKEN_TTL_SECS,
    env_config::REFRESH_TOKEN_TTL_SECS,
    env_config::AUTH_CODE_TTL_SECS,
    env_config::JWT_SECRET,
    env_config::TOKEN_FORMAT,
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.issuer, defaults::ISSUER);
    assert_eq!(config.token_format, TokenFormat::Jwt);
    assert_eq!(
        config.tokens.access_token_ttl.num_seconds(),
        defaults::ACCESS_TOKEN_TTL_SECS
    );
    assert!(config.jwt_secret.len() >= defaults::MIN_JWT_SECRET_BYTES);

    // Ephemeral secrets differ per load
    let again = ServerConfig::from_env().unwrap();
    assert_ne!(config.jwt_secret, again.jwt_secret);
}

#[test]
#[serial]
fn test_overrides_from_environment() {
    clear_env();
    let secret = vec![9u8; 48];
    env::set_var(env_config::ISSUER, "https://auth.example.org");
    env::set_var(env_config::ACCESS_TOKEN_TTL_SECS, "600");
    env::set_var(env_config::REFRESH_TOKEN_TTL_SECS, "86400");
    env::set_var(env_config::TOKEN_FORMAT, "opaque");
    env::set_var(env_config::JWT_SECRET, general_purpose::STANDARD.encode(&secret));

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.issuer, "https://auth.example.org");
    assert_eq!(config.tokens.access_token_ttl.num_seconds(), 600);
    assert_eq!(config.tokens.refresh_token_ttl.num_seconds(), 86400);
    assert_eq!(config.token_format, TokenFormat::Opaque);
    assert_eq!(config.jwt_secret, secret);
    assert!(config.summary().contains("opaque"));
}

#[test]
#[serial]
fn test_malformed_values_are_rejected() {
    let cases = [
        (env_config::ACCESS_TOKEN_TTL_SECS, "an hour"),
        (env_config::AUTH_CODE_TTL_SECS, "0"),
        (env_config::TOKEN_FORMAT, "paseto"),
        (env_config::JWT_SECRET, "not base64!"),
        (env_config::JWT_SECRET, "c2hvcnQ="),
        (env_config::ISSUER, "   "),
    ];

    for (var, value) in cases {
        clear_env();
        env::set_var(var, value);
        assert!(ServerConfig::from_env().is_err(), "{var}={value}");
    }
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_configured_lifetime_reaches_token_response() {
    clear_env();
    env::set_var(env_config::ACCESS_TOKEN_TTL_SECS, "120");
    let config = ServerConfig::from_env().unwrap();
    clear_env();

    let server = OAuth2AuthorizationServer::from_config(
        &config,
        Collaborators {
            store: Arc::new(InMemoryAuthorizationService::new()),
            clients: Arc::new(InMemoryClientRepository::new()),
            identities: Arc::new(InMemoryIdentityStore::new()),
            sms: Arc::new(InMemorySmsCodeStore::new(Duration::minutes(5))),
        },
    )
    .unwrap();
    assert_eq!(server.grant_types().len(), 5);

    server
        .clients()
        .register_client_with_credentials(
            "svc",
            "svc-secret",
            ClientRegistrationRequest {
                grant_types: Some(vec!["client_credentials".to_owned()]),
                scope: Some("read".to_owned()),
                ..ClientRegistrationRequest::default()
            },
        )
        .await
        .unwrap();

    let response = server
        .token(RawTokenRequest::from_params([
            ("grant_type", "client_credentials"),
            ("client_id", "svc"),
            ("client_secret", "svc-secret"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.expires_in, 120);
}
