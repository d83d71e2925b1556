// ABOUTME: Integration tests for the SMS one-time code grant
// ABOUTME: Single-use codes, wrong codes, unbound phones and concurrent redemption
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{create_test_server, sms_request, PHONE, SMS_CODE, USER_SUBJECT};
use twelvet_auth::identity::SmsValidator;
use twelvet_auth::models::TokenKind;

#[tokio::test]
async fn test_sms_code_succeeds_once() {
    let fixture = create_test_server().await;

    let first = fixture.server.token(sms_request(PHONE, SMS_CODE)).await.unwrap();
    let record = fixture
        .store
        .find_by_token(&first.access_token, TokenKind::AccessToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.subject(), USER_SUBJECT);
    assert!(first.refresh_token.is_some());

    let second = fixture
        .server
        .token(sms_request(PHONE, SMS_CODE))
        .await
        .unwrap_err();
    assert_eq!(second.error(), "invalid_grant");
}

#[tokio::test]
async fn test_wrong_code_does_not_burn_the_real_one() {
    let fixture = create_test_server().await;

    let error = fixture
        .server
        .token(sms_request(PHONE, "000000"))
        .await
        .unwrap_err();
    assert_eq!(error.error(), "invalid_grant");
    assert_eq!(fixture.sms.pending(), 1);

    fixture.server.token(sms_request(PHONE, SMS_CODE)).await.unwrap();
    assert_eq!(fixture.sms.pending(), 0);
}

#[tokio::test]
async fn test_phone_without_account() {
    let fixture = create_test_server().await;
    fixture.sms.insert("19900000000", "111111");

    let error = fixture
        .server
        .token(sms_request("19900000000", "111111"))
        .await
        .unwrap_err();
    assert_eq!(error.error(), "invalid_grant");
}

#[tokio::test]
async fn test_issued_code_is_six_digits_and_single_use() {
    let fixture = create_test_server().await;
    let code = fixture.sms.issue(PHONE).unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    assert!(fixture.sms.verify(PHONE, &code).await.unwrap());
    assert!(!fixture.sms.verify(PHONE, &code).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_succeeds_at_most_once() {
    let fixture = create_test_server().await;

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let server = fixture.server.clone();
            tokio::spawn(async move { server.token(sms_request(PHONE, SMS_CODE)).await })
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
