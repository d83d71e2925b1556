// ABOUTME: Integration tests for the refresh token grant
// ABOUTME: Rotation, replay rejection, scope narrowing, foreign clients, revoked users and concurrent use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{create_test_server, refresh_request, ALL_GRANTS, USERNAME, USER_SUBJECT};
use std::collections::HashSet;
use twelvet_auth::models::TokenKind;
use twelvet_auth::oauth2_server::RawTokenRequest;

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let fixture = create_test_server().await;
    let first = fixture.password_tokens().await;
    let first_refresh = first.refresh_token.clone().unwrap();

    let second = fixture.server.token(refresh_request(&first_refresh)).await.unwrap();
    let second_refresh = second.refresh_token.clone().unwrap();

    assert_ne!(second.access_token, first.access_token);
    assert_ne!(second_refresh, first_refresh);
    assert_eq!(second.scope.as_deref(), Some("read"));

    let replay = fixture
        .server
        .token(refresh_request(&first_refresh))
        .await
        .unwrap_err();
    assert_eq!(replay.error(), "invalid_grant");

    let record = fixture
        .store
        .find_by_token(&second_refresh, TokenKind::RefreshToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.subject(), USER_SUBJECT);
    assert_ne!(
        record.id,
        fixture
            .store
            .find_by_token(&first.access_token, TokenKind::AccessToken)
            .await
            .unwrap()
            .unwrap()
            .id
    );
}

#[tokio::test]
async fn test_every_issued_value_is_unique() {
    let fixture = create_test_server().await;
    let mut seen = HashSet::new();

    let mut current = fixture.password_tokens().await;
    for _ in 0..5 {
        assert!(seen.insert(current.access_token.clone()));
        let refresh = current.refresh_token.clone().unwrap();
        assert!(seen.insert(refresh.clone()));
        current = fixture.server.token(refresh_request(&refresh)).await.unwrap();
    }
}

fn wide_client_request(pairs: &[(&str, &str)]) -> RawTokenRequest {
    RawTokenRequest::from_params(pairs.iter().copied())
        .with_param("client_id", "wide")
        .with_param("client_secret", "wide-secret")
}

#[tokio::test]
async fn test_scope_cannot_widen_on_refresh() {
    let fixture = create_test_server().await;
    fixture
        .register_client("wide", "wide-secret", ALL_GRANTS, "read write")
        .await;

    let initial = fixture
        .server
        .token(wide_client_request(&[
            ("grant_type", "password"),
            ("username", USERNAME),
            ("password", common::PASSWORD),
            ("scope", "read"),
        ]))
        .await
        .unwrap();
    let refresh = initial.refresh_token.unwrap();

    let widened = fixture
        .server
        .token(wide_client_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
            ("scope", "read write"),
        ]))
        .await
        .unwrap_err();
    assert_eq!(widened.error(), "invalid_scope");

    // The rejected attempt did not consume the token
    let narrowed = fixture
        .server
        .token(wide_client_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
            ("scope", "read"),
        ]))
        .await
        .unwrap();
    assert_eq!(narrowed.scope.as_deref(), Some("read"));
}

#[tokio::test]
async fn test_foreign_client_cannot_use_refresh_token() {
    let fixture = create_test_server().await;
    fixture
        .register_client("other", "other-secret", ALL_GRANTS, "read")
        .await;
    let refresh = fixture.password_tokens().await.refresh_token.unwrap();

    let foreign = RawTokenRequest::from_params([
        ("grant_type", "refresh_token"),
        ("client_id", "other"),
        ("client_secret", "other-secret"),
        ("refresh_token", refresh.as_str()),
    ]);
    let error = fixture.server.token(foreign).await.unwrap_err();
    assert_eq!(error.error(), "invalid_grant");

    fixture.server.token(refresh_request(&refresh)).await.unwrap();
}

#[tokio::test]
async fn test_disabled_user_cannot_refresh() {
    let fixture = create_test_server().await;
    let refresh = fixture.password_tokens().await.refresh_token.unwrap();
    fixture.identities.disable_user(USERNAME);

    let error = fixture.server.token(refresh_request(&refresh)).await.unwrap_err();
    assert_eq!(error.error(), "invalid_grant");
}

#[tokio::test]
async fn test_unknown_refresh_token() {
    let fixture = create_test_server().await;
    let error = fixture
        .server
        .token(refresh_request("not-a-real-token"))
        .await
        .unwrap_err();
    assert_eq!(error.error(), "invalid_grant");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_succeeds_once() {
    let fixture = create_test_server().await;
    let refresh = fixture.password_tokens().await.refresh_token.unwrap();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let server = fixture.server.clone();
            let request = refresh_request(&refresh);
            tokio::spawn(async move { server.token(request).await })
        })
        .collect();

    let mut successes = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
