// ABOUTME: Main library entry point for the twelvet multi-grant authorization server
// ABOUTME: Wires converters, providers, token generators and outcome handlers into one pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Twelvet Auth
//!
//! An OAuth 2.0 token issuance core supporting five grant types through one
//! extensible dispatch pipeline:
//!
//! - `authorization_code` (with PKCE S256)
//! - `client_credentials`
//! - `refresh_token` (rotating, single-use)
//! - `password`
//! - `sms_code`
//!
//! ## Architecture
//!
//! A raw token request flows through:
//! - **Converters**: raw parameters to a typed `AuthenticationRequest`
//! - **Providers**: credential validation, principal and scope resolution
//! - **Token generators**: signed access token plus opaque refresh token, with a claims customizer
//! - **Authorization store**: exactly one persisted record per issuance
//! - **Outcome handlers**: token response or redacted error response
//!
//! HTTP transport, consent UI and durable persistence are left to the embedding
//! application; in-memory adapters for every collaborator ship in this crate.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use twelvet_auth::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("issuer: {}", config.issuer);
//!     Ok(())
//! }
//! ```

/// Configuration management from environment variables
pub mod config;

/// Application constants and environment variable names
pub mod constants;

/// Random token generation, secret hashing and fingerprints
pub mod crypto;

/// Unified error handling with OAuth 2.0 error codes
pub mod errors;

/// Identity and SMS code validators
pub mod identity;

/// Production logging and structured output
pub mod logging;

/// Core data models re-exported from `twelvet-core`
pub mod models;

/// OAuth 2.0 authorization server: the grant pipeline and its endpoints
pub mod oauth2_server;

/// Authorization record store
pub mod store;
