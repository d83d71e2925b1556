// ABOUTME: Integration tests for dynamic client registration
// ABOUTME: Generated credentials, defaults, redirect URI rules and use of the registered client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{create_test_server, CLIENT_ID};
use std::time::Instant;
use twelvet_auth::errors::ErrorCode;
use twelvet_auth::oauth2_server::{ClientRegistrationRequest, RawTokenRequest};

fn request(redirect_uris: &[&str], grant_types: Option<&[&str]>) -> ClientRegistrationRequest {
    ClientRegistrationRequest {
        redirect_uris: redirect_uris.iter().map(|u| (*u).to_owned()).collect(),
        grant_types: grant_types.map(|g| g.iter().map(|s| (*s).to_owned()).collect()),
        client_name: Some("Reporting".to_owned()),
        scope: Some("read".to_owned()),
        ..ClientRegistrationRequest::default()
    }
}

#[tokio::test]
async fn test_registration_generates_credentials_and_defaults() {
    let fixture = create_test_server().await;
    let response = fixture
        .server
        .register_client(request(&["https://reports.example.com/cb"], None))
        .await
        .unwrap();

    assert!(response.client_id.starts_with("twelvet_"));
    assert!(response.client_secret.len() >= 32);
    assert_eq!(response.grant_types, vec!["authorization_code".to_owned()]);
    assert_eq!(response.response_types, vec!["code".to_owned()]);
    assert!(response.client_secret_expires_at.unwrap() > response.client_id_issued_at.unwrap());

    let stored = fixture.server.clients().get_client(&response.client_id).await.unwrap();
    assert_ne!(stored.client_secret_hash, response.client_secret);
}

#[tokio::test]
async fn test_registered_client_can_authenticate() {
    let fixture = create_test_server().await;
    let response = fixture
        .server
        .register_client(request(&[], Some(&["client_credentials"])))
        .await
        .unwrap();

    let token = fixture
        .server
        .token(RawTokenRequest::from_params([
            ("grant_type", "client_credentials"),
            ("client_id", response.client_id.as_str()),
            ("client_secret", response.client_secret.as_str()),
        ]))
        .await
        .unwrap();
    assert_eq!(token.scope.as_deref(), Some("read"));
}

#[tokio::test]
async fn test_redirect_uri_rules() {
    let fixture = create_test_server().await;
    for accepted in [
        &["https://app.example.com/callback"][..],
        &["http://localhost:3000/callback"][..],
        &["http://127.0.0.1:8080/cb"][..],
        &["urn:ietf:wg:oauth:2.0:oob"][..],
    ] {
        let result = fixture.server.register_client(request(accepted, None)).await;
        assert!(result.is_ok(), "{accepted:?}");
    }

    for rejected in [
        &[][..],
        &["http://app.example.com/callback"][..],
        &["https://app.example.com/cb#frag"][..],
        &["https://*.example.com/cb"][..],
        &["not a uri"][..],
    ] {
        let error = fixture
            .server
            .register_client(request(rejected, None))
            .await
            .unwrap_err();
        assert_eq!(error.error(), "invalid_request", "{rejected:?}");
    }
}

#[tokio::test]
async fn test_unknown_grant_type_rejected() {
    let fixture = create_test_server().await;
    let error = fixture
        .server
        .register_client(request(&[], Some(&["implicit"])))
        .await
        .unwrap_err();
    assert_eq!(error.error(), "invalid_request");
}

#[tokio::test]
async fn test_duplicate_client_id_rejected() {
    let fixture = create_test_server().await;
    let error = fixture
        .server
        .clients()
        .register_client_with_credentials(
            common::CLIENT_ID,
            "another-secret",
            request(&[common::REDIRECT_URI], None),
        )
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn test_unknown_client_costs_a_secret_check() {
    let fixture = create_test_server().await;
    let clients = fixture.server.clients();
    // First call also generates the decoy hash
    clients.validate_client("nobody", "x").await.unwrap_err();

    let started = Instant::now();
    for _ in 0..3 {
        let error = clients.validate_client(CLIENT_ID, "wrong").await.unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidClient);
    }
    let known = started.elapsed();

    let started = Instant::now();
    for _ in 0..3 {
        let error = clients.validate_client("nobody", "wrong").await.unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidClient);
    }
    let unknown = started.elapsed();

    assert!(unknown * 4 >= known, "unknown={unknown:?} known={known:?}");
}
