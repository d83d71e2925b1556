// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Grant type identifiers, request parameters, claim names and default lifetimes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// `grant_type` values accepted by the token endpoint
pub mod grant_types {
    /// Authorization code grant (RFC 6749 Section 4.1)
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    /// Client credentials grant (RFC 6749 Section 4.4)
    pub const CLIENT_CREDENTIALS: &str = "client_credentials";
    /// Refresh token grant (RFC 6749 Section 6)
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Resource owner password grant (RFC 6749 Section 4.3)
    pub const PASSWORD: &str = "password";
    /// One-time SMS code grant
    pub const SMS_CODE: &str = "sms_code";
}

/// Token endpoint request parameter names
pub mod params {
    /// Grant type selector
    pub const GRANT_TYPE: &str = "grant_type";
    /// Client identifier
    pub const CLIENT_ID: &str = "client_id";
    /// Client secret
    pub const CLIENT_SECRET: &str = "client_secret";
    /// Space-separated scopes
    pub const SCOPE: &str = "scope";
    /// Authorization code or SMS code
    pub const CODE: &str = "code";
    /// Redirect URI bound to an authorization code
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// PKCE code verifier
    pub const CODE_VERIFIER: &str = "code_verifier";
    /// Refresh token value
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Resource owner username
    pub const USERNAME: &str = "username";
    /// Resource owner password
    pub const PASSWORD: &str = "password";
    /// Phone number for SMS login
    pub const PHONE: &str = "phone";
}

/// Access token claim names
pub mod claims {
    /// Issuer
    pub const ISS: &str = "iss";
    /// Subject
    pub const SUB: &str = "sub";
    /// Audience
    pub const AUD: &str = "aud";
    /// Issued at
    pub const IAT: &str = "iat";
    /// Expiration
    pub const EXP: &str = "exp";
    /// Token identifier
    pub const JTI: &str = "jti";
    /// Granted scope
    pub const SCOPE: &str = "scope";
    /// Requesting client
    pub const CLIENT_ID: &str = "client_id";
    /// Owning authorization record
    pub const AUTH_ID: &str = "auth_id";
    /// Stable user identifier
    pub const USER_ID: &str = "user_id";
    /// Login name
    pub const USERNAME: &str = "username";
    /// Tenant of the principal
    pub const TENANT_ID: &str = "tenant_id";
    /// Granted authorities
    pub const ROLES: &str = "roles";
    /// Issuer label
    pub const LICENSE: &str = "license";

    /// Claims owned by the access token generator; customizers cannot touch these
    pub const PROTECTED: &[&str] = &[ISS, SUB, AUD, IAT, EXP, JTI, SCOPE, CLIENT_ID, AUTH_ID];
}

/// Default lifetimes and sizes
pub mod defaults {
    /// Access token lifetime (1 hour)
    pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;
    /// Refresh token lifetime (30 days)
    pub const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;
    /// Authorization code lifetime (10 minutes)
    pub const AUTH_CODE_TTL_SECS: i64 = 600;
    /// Client registration lifetime in days
    pub const CLIENT_REGISTRATION_TTL_DAYS: i64 = 365;
    /// Random bytes in refresh tokens and authorization codes
    pub const OPAQUE_TOKEN_BYTES: usize = 32;
    /// Minimum HMAC secret length for JWT signing
    pub const MIN_JWT_SECRET_BYTES: usize = 32;
    /// Issuer label used when none is configured
    pub const ISSUER: &str = "https://auth.twelvet.cn";
    /// Wrong guesses allowed before an SMS code is dropped
    pub const SMS_CODE_MAX_ATTEMPTS: u32 = 5;
}

/// Service names used for audiences and structured logging
pub mod service_names {
    /// This server
    pub const TWELVET_AUTH: &str = "twelvet-auth";
    /// Audience of issued access tokens
    pub const TOKEN_AUDIENCE: &str = "twelvet";
}

/// Token type returned in every token response
pub const BEARER: &str = "Bearer";

/// Out-of-band redirect URI for native apps (RFC 8252)
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
