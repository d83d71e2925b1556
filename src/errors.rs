// ABOUTME: Unified error types re-exported from twelvet-core
// ABOUTME: AppError, ErrorCode and AppResult shared by every pipeline stage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use twelvet_core::errors::*;
