// ABOUTME: Integration tests for grant type dispatch through the converter chain
// ABOUTME: One converter per grant type, unsupported and missing grant types, nothing persisted on rejection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{client_request, create_test_server_with, CLIENT_ID, CLIENT_SECRET};
use std::sync::Arc;
use twelvet_auth::config::TokenFormat;
use twelvet_auth::errors::ErrorCode;
use twelvet_auth::models::GrantType;
use twelvet_auth::oauth2_server::converters::{
    ClientCredentialsAuthenticationConverter, PasswordAuthenticationConverter,
};
use twelvet_auth::oauth2_server::{
    AuthenticationConverter, DelegatingAuthenticationConverter, GrantRequest, RawTokenRequest,
};
use twelvet_auth::store::InMemoryAuthorizationService;

fn raw(pairs: &[(&str, &str)]) -> RawTokenRequest {
    RawTokenRequest::from_params(pairs.iter().copied())
        .with_param("client_id", CLIENT_ID)
        .with_param("client_secret", CLIENT_SECRET)
}

#[test]
fn test_each_grant_type_maps_to_its_variant() {
    let chain = DelegatingAuthenticationConverter::with_defaults();

    let cases = [
        (
            raw(&[("grant_type", "authorization_code"), ("code", "c"), ("redirect_uri", "https://x/cb")]),
            GrantType::AuthorizationCode,
        ),
        (raw(&[("grant_type", "client_credentials")]), GrantType::ClientCredentials),
        (
            raw(&[("grant_type", "refresh_token"), ("refresh_token", "r")]),
            GrantType::RefreshToken,
        ),
        (
            raw(&[("grant_type", "password"), ("username", "u"), ("password", "p")]),
            GrantType::Password,
        ),
        (
            raw(&[("grant_type", "sms_code"), ("phone", "1"), ("code", "2")]),
            GrantType::SmsCode,
        ),
    ];

    for (request, expected) in cases {
        let converted = chain.convert(&request).unwrap();
        assert_eq!(converted.grant_type(), expected);
        assert_eq!(converted.client.client_id, CLIENT_ID);
    }
}

#[test]
fn test_fields_are_extracted() {
    let chain = DelegatingAuthenticationConverter::with_defaults();
    let converted = chain
        .convert(&raw(&[
            ("grant_type", "password"),
            ("username", "alice"),
            ("password", "pw"),
            ("scope", "write read write"),
        ]))
        .unwrap();

    assert_eq!(
        converted.grant,
        GrantRequest::Password {
            username: "alice".to_owned(),
            password: "pw".to_owned(),
        }
    );
    assert_eq!(converted.scopes.to_string(), "read write");
}

#[test]
fn test_missing_field_is_invalid_request() {
    let chain = DelegatingAuthenticationConverter::with_defaults();
    let error = chain
        .convert(&raw(&[("grant_type", "sms_code"), ("phone", "1")]))
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidRequest);
    assert!(error.message.contains("code"));
}

#[test]
fn test_unknown_and_missing_grant_type() {
    let chain = DelegatingAuthenticationConverter::with_defaults();

    let unknown = chain.convert(&raw(&[("grant_type", "implicit")])).unwrap_err();
    assert_eq!(unknown.code, ErrorCode::UnsupportedGrantType);

    let missing = chain.convert(&raw(&[])).unwrap_err();
    assert_eq!(missing.code, ErrorCode::InvalidRequest);
}

#[test]
fn test_missing_client_credentials_is_invalid_client() {
    let chain = DelegatingAuthenticationConverter::with_defaults();
    let request = RawTokenRequest::from_params([("grant_type", "client_credentials")]);
    assert_eq!(chain.convert(&request).unwrap_err().code, ErrorCode::InvalidClient);
}

#[test]
fn test_order_does_not_change_the_result() {
    let forward = DelegatingAuthenticationConverter::new(vec![
        Arc::new(PasswordAuthenticationConverter) as Arc<dyn AuthenticationConverter>,
        Arc::new(ClientCredentialsAuthenticationConverter),
    ])
    .unwrap();
    let reverse = DelegatingAuthenticationConverter::new(vec![
        Arc::new(ClientCredentialsAuthenticationConverter) as Arc<dyn AuthenticationConverter>,
        Arc::new(PasswordAuthenticationConverter),
    ])
    .unwrap();

    let request = raw(&[("grant_type", "password"), ("username", "u"), ("password", "p")]);
    assert_eq!(forward.convert(&request).unwrap(), reverse.convert(&request).unwrap());
}

#[test]
fn test_duplicate_converter_rejected() {
    let result = DelegatingAuthenticationConverter::new(vec![
        Arc::new(PasswordAuthenticationConverter) as Arc<dyn AuthenticationConverter>,
        Arc::new(PasswordAuthenticationConverter),
    ]);
    assert_eq!(result.err().map(|e| e.code), Some(ErrorCode::ServerError));
}

#[tokio::test]
async fn test_unsupported_grant_through_server_persists_nothing() {
    let store = Arc::new(InMemoryAuthorizationService::new());
    let fixture = create_test_server_with(store.clone(), TokenFormat::Jwt).await;

    let error = fixture
        .server
        .token(client_request("urn:ietf:params:oauth:grant-type:device_code"))
        .await
        .unwrap_err();

    assert_eq!(error.status, 400);
    assert_eq!(error.error(), "unsupported_grant_type");
    let description = error.body.error_description.unwrap_or_default();
    assert!(!description.contains("device_code"));
    assert!(store.is_empty());
}
