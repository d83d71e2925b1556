// ABOUTME: Per-request state machine for the token pipeline
// ABOUTME: Forward-only transitions with a terminal failure state, mirrored into the request span
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult, ErrorCode};
use std::fmt;
use tracing::Span;

/// Where a token request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Raw request accepted
    Received,
    /// Converter produced a typed request
    Converted,
    /// Client and grant credentials validated
    Validated,
    /// Token set generated
    TokenGenerated,
    /// Authorization persisted
    Persisted,
    /// Response produced
    Responded,
    /// Terminal failure
    Failed(ErrorCode),
}

impl RequestState {
    /// Name recorded in the tracing span
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Converted => "converted",
            Self::Validated => "validated",
            Self::TokenGenerated => "token_generated",
            Self::Persisted => "persisted",
            Self::Responded => "responded",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether no further transition is allowed
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Responded | Self::Failed(_))
    }

    /// Whether `self -> next` is a legal transition
    #[must_use]
    pub const fn can_advance_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Responded | Self::Failed(_), _) => false,
            (_, Self::Failed(_)) => true,
            (Self::Received, Self::Converted)
            | (Self::Converted, Self::Validated)
            | (Self::Validated, Self::TokenGenerated)
            | (Self::TokenGenerated, Self::Persisted)
            | (Self::Persisted, Self::Responded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(code) => write!(f, "failed({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Tracks one request's state and records it on its span
#[derive(Debug)]
pub struct RequestLifecycle {
    state: RequestState,
    span: Span,
}

impl RequestLifecycle {
    /// Start in `Received`, recording into `span`'s `state` field
    #[must_use]
    pub fn new(span: Span) -> Self {
        span.record("state", RequestState::Received.as_str());
        Self {
            state: RequestState::Received,
            span,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RequestState {
        self.state
    }

    /// Move to `next`
    ///
    /// # Errors
    /// `ServerError` if the transition is illegal
    pub fn advance(&mut self, next: RequestState) -> AppResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(AppError::server_error(format!(
                "Illegal request state transition {} -> {next}",
                self.state
            )));
        }
        self.state = next;
        self.span.record("state", next.as_str());
        tracing::debug!(state = %next, "Token request state changed");
        Ok(())
    }

    /// Enter the terminal failure state unless already terminal
    pub fn fail(&mut self, code: ErrorCode) {
        if self.state.is_terminal() {
            return;
        }
        let next = RequestState::Failed(code);
        self.state = next;
        self.span.record("state", next.as_str());
    }
}
