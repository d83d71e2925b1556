// ABOUTME: OAuth 2.0 server implementation: the multi-grant token pipeline and its endpoints
// ABOUTME: Converter chain, provider registry, token generators, outcome handlers and RFC 7591 registration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # OAuth 2.0 Server
//!
//! A token request flows through the components in this order:
//!
//! 1. [`DelegatingAuthenticationConverter`] turns raw parameters into an [`AuthenticationRequest`]
//! 2. [`ProviderRegistry`] authenticates the client and runs the grant's provider
//! 3. [`DelegatingTokenGenerator`] produces the token set, calling the claims customizer
//! 4. the [`AuthorizationService`](crate::store::AuthorizationService) persists one record
//! 5. the success or failure handler shapes the response
//!
//! [`OAuth2AuthorizationServer`] wires these together.

/// Provider registry and per-grant authentication providers
pub mod authentication;
/// RFC 7591 dynamic client registration implementation
pub mod client_registration;
/// Raw request to typed authentication request converters
pub mod converters;
/// Access token claims customization
pub mod customizer;
/// OAuth 2.0 authorization server endpoints
pub mod endpoints;
/// Success and failure outcome handlers
pub mod handlers;
/// Per-request pipeline state machine
pub mod lifecycle;
/// OAuth 2.0 data models and types
pub mod models;
/// Access token signers
pub mod signer;
/// Token generator chain
pub mod token_generator;

// Authentication providers
pub use authentication::{
    AuthenticatedGrant, AuthenticationProvider, ConsumedToken, ProviderRegistry,
};

// RFC 7591 client registration management
pub use client_registration::{ClientRegistrationManager, ClientRepository, InMemoryClientRepository};

// Converter chain
pub use converters::{
    AuthenticationConverter, AuthenticationRequest, DelegatingAuthenticationConverter,
    GrantRequest,
};

// Claims customization
pub use customizer::{ClaimsBuilder, IdentityClaimsCustomizer, TokenClaimsCustomizer, TokenContext};

/// OAuth 2.0 authorization server
pub use endpoints::{Collaborators, OAuth2AuthorizationServer, OAuth2AuthorizationServerBuilder};

// Outcome handlers
pub use handlers::{
    AuthenticationFailureHandler, AuthenticationSuccessHandler, DefaultFailureHandler,
    DefaultSuccessHandler,
};

pub use lifecycle::{RequestLifecycle, RequestState};

// OAuth 2.0 data models and request/response types

/// Authorization request
pub use models::AuthorizeRequest;
/// Authorization response
pub use models::AuthorizeResponse;
/// Client credentials presented with a request
pub use models::ClientCredentials;
/// Client registration request
pub use models::ClientRegistrationRequest;
/// Client registration response
pub use models::ClientRegistrationResponse;
/// Error response with HTTP status
pub use models::ErrorResponse;
/// Token introspection response
pub use models::IntrospectionResponse;
/// OAuth 2.0 error body
pub use models::OAuth2Error;
/// Raw token endpoint request
pub use models::RawTokenRequest;
/// Token exchange response
pub use models::TokenResponse;

// Signers and generators
pub use signer::{JwtTokenSigner, OpaqueTokenSigner, TokenSigner};
pub use token_generator::{
    AccessTokenGenerator, DelegatingTokenGenerator, GenerationContext, RefreshTokenGenerator,
    TokenGenerator,
};
