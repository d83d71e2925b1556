// ABOUTME: System-wide constants and environment variable names for the authorization server
// ABOUTME: Re-exports twelvet-core constants and adds configuration keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Domain constants live in `twelvet-core`; this module adds the names of the
//! environment variables read by [`crate::config::environment::ServerConfig`].

pub use twelvet_core::constants::*;

/// Environment variable names
pub mod env_config {
    /// Issuer label, used as `iss` and `license` claims
    pub const ISSUER: &str = "TWELVET_ISSUER";
    /// Access token lifetime in seconds
    pub const ACCESS_TOKEN_TTL_SECS: &str = "ACCESS_TOKEN_TTL_SECS";
    /// Refresh token lifetime in seconds
    pub const REFRESH_TOKEN_TTL_SECS: &str = "REFRESH_TOKEN_TTL_SECS";
    /// Authorization code lifetime in seconds
    pub const AUTH_CODE_TTL_SECS: &str = "AUTH_CODE_TTL_SECS";
    /// Base64-encoded HMAC secret for JWT access tokens
    pub const JWT_SECRET: &str = "JWT_SECRET";
    /// Access token format, `jwt` or `opaque`
    pub const TOKEN_FORMAT: &str = "TOKEN_FORMAT";
}
