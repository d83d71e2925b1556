// ABOUTME: Integration tests for the client credentials grant
// ABOUTME: Client-only principals, no refresh tokens, scope narrowing and client-level claims
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{client_request, create_test_server, ISSUER};
use twelvet_auth::models::{GrantType, TokenKind};
use twelvet_auth::oauth2_server::{ClientCredentials, JwtTokenSigner, RawTokenRequest};

#[tokio::test]
async fn test_client_credentials_issue_access_token_only() {
    let fixture = create_test_server().await;

    let response = fixture
        .server
        .token(client_request("client_credentials"))
        .await
        .unwrap();
    assert!(response.refresh_token.is_none());
    assert_eq!(response.scope.as_deref(), Some("read"));

    let record = fixture
        .store
        .find_by_token(&response.access_token, TokenKind::AccessToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.subject(), "client:web");
    assert_eq!(record.grant_type, GrantType::ClientCredentials);
    assert!(record.refresh_token.is_none());
}

#[tokio::test]
async fn test_client_token_carries_no_user_claims() {
    let fixture = create_test_server().await;
    let response = fixture
        .server
        .token(client_request("client_credentials"))
        .await
        .unwrap();

    let claims = JwtTokenSigner::new(&[42u8; 32], ISSUER)
        .unwrap()
        .verify(&response.access_token)
        .unwrap();
    assert_eq!(claims["sub"], "client:web");
    assert_eq!(claims["username"], common::CLIENT_ID);
    assert!(claims.get("user_id").is_none());
    assert!(claims.get("tenant_id").is_none());
}

#[tokio::test]
async fn test_basic_credentials_are_accepted() {
    let fixture = create_test_server().await;
    let request = RawTokenRequest::from_params([("grant_type", "client_credentials")])
        .with_client_credentials(ClientCredentials::new(common::CLIENT_ID, common::CLIENT_SECRET));

    fixture.server.token(request).await.unwrap();
}

#[tokio::test]
async fn test_scope_requests() {
    let fixture = create_test_server().await;
    fixture
        .register_client("svc", "svc-secret", &["client_credentials"], "read write")
        .await;
    let svc = |scope: &str| {
        RawTokenRequest::from_params([
            ("grant_type", "client_credentials"),
            ("client_id", "svc"),
            ("client_secret", "svc-secret"),
            ("scope", scope),
        ])
    };

    let all = fixture.server.token(svc("write read")).await.unwrap();
    assert_eq!(all.scope.as_deref(), Some("read write"));

    let narrowed = fixture.server.token(svc("write admin")).await.unwrap();
    assert_eq!(narrowed.scope.as_deref(), Some("write"));

    let error = fixture.server.token(svc("admin")).await.unwrap_err();
    assert_eq!(error.error(), "invalid_scope");
}

#[tokio::test]
async fn test_client_without_refresh_grant_gets_no_refresh_token() {
    let fixture = create_test_server().await;
    fixture
        .register_client("pw-only", "pw-secret", &["password"], "read")
        .await;

    let response = fixture
        .server
        .token(RawTokenRequest::from_params([
            ("grant_type", "password"),
            ("client_id", "pw-only"),
            ("client_secret", "pw-secret"),
            ("username", common::USERNAME),
            ("password", common::PASSWORD),
        ]))
        .await
        .unwrap();
    assert!(response.refresh_token.is_none());
}
