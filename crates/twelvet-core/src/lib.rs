// ABOUTME: Core types and constants for the twelvet authorization server
// ABOUTME: Foundation crate with error handling, grant and token models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Twelvet Core
//!
//! Foundation crate providing shared types and constants for the twelvet
//! authorization server. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and the OAuth 2.0 `ErrorCode` taxonomy
//! - **constants**: Grant types, request parameters, claim names and default lifetimes
//! - **models**: Principals, scopes, clients, authorizations and token sets

/// Unified error handling system with stable OAuth 2.0 error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (Principal, Scopes, Authorization, `TokenSet`, etc.)
pub mod models;
