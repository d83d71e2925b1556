// ABOUTME: Unified error type and OAuth 2.0 error code taxonomy for the token pipeline
// ABOUTME: Keeps internal failure detail separate from what is safe to show a caller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling
//!
//! Every failure inside the grant pipeline is an [`AppError`] tagged with one
//! [`ErrorCode`]. The code decides the stable wire value (`invalid_grant`, ...)
//! and the HTTP status a transport should use. The message is only shown to
//! callers for client-side errors; server errors are always rendered with the
//! generic description of their code, and the attached source is never rendered.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Stable OAuth 2.0 error codes (RFC 6749 Section 5.2)
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The `grant_type` is not recognized by any converter
    UnsupportedGrantType,
    /// Missing or malformed request parameter
    InvalidRequest,
    /// Unknown or unauthenticated client
    InvalidClient,
    /// Bad credentials, expired or used code, expired refresh token
    InvalidGrant,
    /// Requested scope exceeds the permitted set
    InvalidScope,
    /// Collaborator failure or misconfiguration
    ServerError,
}

impl ErrorCode {
    /// Wire value of this code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }

    /// HTTP status a transport should answer with
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::ServerError => 500,
            Self::UnsupportedGrantType
            | Self::InvalidRequest
            | Self::InvalidGrant
            | Self::InvalidScope => 400,
        }
    }

    /// Generic human-readable description of this code
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::UnsupportedGrantType => "The authorization grant type is not supported",
            Self::InvalidRequest => "The request is missing a required parameter or is malformed",
            Self::InvalidClient => "Client authentication failed",
            Self::InvalidGrant => "The provided authorization grant is invalid or expired",
            Self::InvalidScope => "The requested scope is invalid or exceeds the permitted scope",
            Self::ServerError => "The authorization server encountered an unexpected condition",
        }
    }

    /// RFC section documenting this error
    #[must_use]
    pub const fn error_uri(&self) -> &'static str {
        match self {
            Self::InvalidRequest | Self::InvalidScope => {
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1"
            }
            _ => "https://datatracker.ietf.org/doc/html/rfc6749#section-5.2",
        }
    }

    /// Whether the caller caused this error
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::ServerError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the authorization server
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Message describing the failure; shown to callers only for client errors
    pub message: String,
    /// Underlying cause, kept for operators
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Description that is safe to return to the caller
    #[must_use]
    pub fn public_description(&self) -> String {
        if self.code.is_client_error() && !self.message.is_empty() {
            self.message.clone()
        } else {
            self.code.description().to_owned()
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Unknown `grant_type`; the presented value is never echoed back
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self::new(
            ErrorCode::UnsupportedGrantType,
            ErrorCode::UnsupportedGrantType.description(),
        )
    }

    /// Missing or malformed parameter
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Client authentication failed
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidClient, message)
    }

    /// Grant could not be validated
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidGrant, message)
    }

    /// Requested scope not permitted
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidScope, message)
    }

    /// Collaborator failure or misconfiguration
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, message)
    }

    /// Re-tag any error as a server error, keeping the original as the source
    #[must_use]
    pub fn into_server_error(self, message: impl Into<String>) -> Self {
        if self.code == ErrorCode::ServerError {
            return self;
        }
        Self::server_error(message).with_source(self)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidClient.http_status(), 401);
        assert_eq!(ErrorCode::InvalidGrant.http_status(), 400);
        assert_eq!(ErrorCode::ServerError.http_status(), 500);
    }

    #[test]
    fn test_server_error_hides_message() {
        let error = AppError::server_error("connection refused by 10.0.0.3:6379");
        assert_eq!(
            error.public_description(),
            ErrorCode::ServerError.description()
        );
    }

    #[test]
    fn test_client_error_keeps_message() {
        let error = AppError::invalid_request("Missing parameter: username");
        assert_eq!(error.public_description(), "Missing parameter: username");
    }

    #[test]
    fn test_into_server_error_keeps_source() {
        let error = AppError::invalid_grant("boom").into_server_error("store failed");
        assert_eq!(error.code, ErrorCode::ServerError);
        assert!(StdError::source(&error).is_some());
    }

    #[test]
    fn test_unsupported_grant_type_uses_fixed_description() {
        let error = AppError::unsupported_grant_type();
        assert_eq!(
            error.public_description(),
            "The authorization grant type is not supported"
        );
    }

    #[test]
    fn test_error_code_serializes_as_wire_value() {
        let json = serde_json::to_string(&ErrorCode::UnsupportedGrantType).unwrap();
        assert_eq!(json, "\"unsupported_grant_type\"");
    }
}
