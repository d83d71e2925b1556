// ABOUTME: Success and failure handlers shaping pipeline outcomes into token and error responses
// ABOUTME: Failures are logged with their internal source, callers only see the mapped code and description
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::models::{ErrorResponse, OAuth2Error, TokenResponse};
use crate::constants::BEARER;
use crate::errors::{AppError, ErrorCode};
use crate::models::TokenSet;
use std::error::Error as StdError;
use tracing::{error, warn};

/// Turns an issued token set into the token response
pub trait AuthenticationSuccessHandler: Send + Sync {
    /// Shape the response for `tokens`
    fn on_success(&self, tokens: &TokenSet) -> TokenResponse;
}

/// Turns a pipeline error into the error response
pub trait AuthenticationFailureHandler: Send + Sync {
    /// Shape the response for `error`
    fn on_failure(&self, error: &AppError) -> ErrorResponse;
}

/// Standard token response
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSuccessHandler;

impl AuthenticationSuccessHandler for DefaultSuccessHandler {
    fn on_success(&self, tokens: &TokenSet) -> TokenResponse {
        TokenResponse {
            access_token: tokens.access_token.value.clone(),
            token_type: BEARER.to_owned(),
            expires_in: tokens.expires_in(),
            scope: tokens.scopes.to_param(),
            refresh_token: tokens.refresh_token.as_ref().map(|t| t.value.clone()),
        }
    }
}

/// Standard OAuth2 error response
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFailureHandler;

impl AuthenticationFailureHandler for DefaultFailureHandler {
    fn on_failure(&self, failure: &AppError) -> ErrorResponse {
        let source = failure.source().map(ToString::to_string);
        if failure.code == ErrorCode::ServerError {
            error!(
                error.code = %failure.code,
                error.message = %failure.message,
                error.source = source.as_deref().unwrap_or("none"),
                "Request failed with a server error"
            );
        } else {
            warn!(
                error.code = %failure.code,
                error.message = %failure.message,
                http.status = failure.http_status(),
                "Request rejected"
            );
        }

        ErrorResponse {
            status: failure.http_status(),
            body: OAuth2Error::from_app_error(failure),
        }
    }
}
