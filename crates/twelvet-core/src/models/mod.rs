// ABOUTME: Core data models shared by every stage of the token pipeline
// ABOUTME: Re-exports grant types, scopes, principals, clients and authorization records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! ## Core Models
//!
//! - `GrantType`: The five supported OAuth 2.0 grant types
//! - `Scopes`: Deduplicated, ordered scope set
//! - `Principal`: Immutable identity produced by a credential validator
//! - `OAuth2Client`: Registered client application
//! - `Authorization`: Persisted record of one token issuance
//! - `TokenSet`: Tokens handed back to the caller after a successful grant

mod authorization;
mod grant;
mod oauth2_server;
mod principal;

pub use authorization::{
    Authorization, AuthorizationCodeMetadata, TokenKind, TokenMetadata, TokenSet,
};
pub use grant::{GrantType, Scopes};
pub use oauth2_server::OAuth2Client;
pub use principal::Principal;
