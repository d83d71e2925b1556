// ABOUTME: Grant type enumeration and scope set used across the token pipeline
// ABOUTME: Scopes are parsed from space-separated strings and rendered sorted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::grant_types;
use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Supported OAuth 2.0 grant types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code exchange (RFC 6749 Section 4.1)
    AuthorizationCode,
    /// Machine-to-machine client credentials (RFC 6749 Section 4.4)
    ClientCredentials,
    /// Refresh token rotation (RFC 6749 Section 6)
    RefreshToken,
    /// Resource owner password credentials (RFC 6749 Section 4.3)
    Password,
    /// Phone number plus one-time SMS code
    SmsCode,
}

impl GrantType {
    /// Every supported grant type
    pub const ALL: [Self; 5] = [
        Self::AuthorizationCode,
        Self::ClientCredentials,
        Self::RefreshToken,
        Self::Password,
        Self::SmsCode,
    ];

    /// Wire value used in the `grant_type` parameter
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => grant_types::AUTHORIZATION_CODE,
            Self::ClientCredentials => grant_types::CLIENT_CREDENTIALS,
            Self::RefreshToken => grant_types::REFRESH_TOKEN,
            Self::Password => grant_types::PASSWORD,
            Self::SmsCode => grant_types::SMS_CODE,
        }
    }

    /// Parse a `grant_type` parameter value
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|grant| grant.as_str() == value)
    }

    /// Whether a successful grant of this type also yields a refresh token
    #[must_use]
    pub const fn issues_refresh_token(&self) -> bool {
        !matches!(self, Self::ClientCredentials)
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_param(s).ok_or_else(AppError::unsupported_grant_type)
    }
}

/// Ordered, deduplicated set of scope strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scopes(BTreeSet<String>);

impl Scopes {
    /// Empty scope set
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse a space-separated scope string; duplicates collapse
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.split_whitespace().map(str::to_owned).collect()
    }

    /// Whether no scope is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scopes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set contains `scope`
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Iterate scopes in sorted order
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Scopes present in both sets
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Whether every scope in `self` is also in `other`
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Space-joined form, `None` when empty
    #[must_use]
    pub fn to_param(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for Scopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Scopes {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
