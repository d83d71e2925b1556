// ABOUTME: Core data models re-exported from twelvet-core
// ABOUTME: Principals, scopes, clients, authorization records and token sets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use twelvet_core::models::*;
