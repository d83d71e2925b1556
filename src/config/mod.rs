// ABOUTME: Configuration management module for the authorization server
// ABOUTME: Loads issuer, token lifetimes, token format and signing secret from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! - **Environment**: Server configuration from environment variables

/// Environment and server configuration
pub mod environment;

pub use environment::{ServerConfig, TokenFormat, TokenSettings};
