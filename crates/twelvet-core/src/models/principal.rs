// ABOUTME: Authenticated identity produced by credential validators
// ABOUTME: Immutable once built; carries subject, username, tenant, roles and attributes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Identity resolved by a validator
///
/// Built with the consuming `with_*` methods; there are no setters, so a
/// principal handed to the pipeline cannot change underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    username: String,
    tenant_id: Option<String>,
    authorities: BTreeSet<String>,
    attributes: BTreeMap<String, Value>,
}

impl Principal {
    /// Create a principal with a stable subject and a login name
    pub fn new(subject: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            username: username.into(),
            tenant_id: None,
            authorities: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Principal representing a client acting on its own behalf
    #[must_use]
    pub fn for_client(client_id: &str) -> Self {
        Self::new(format!("client:{client_id}"), client_id)
    }

    /// Set the tenant
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Add one granted authority (role)
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.insert(authority.into());
        self
    }

    /// Add an arbitrary identity attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Stable subject identifier
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Login name
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Tenant, if any
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Granted authorities in sorted order
    #[must_use]
    pub const fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    /// Extra identity attributes
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Whether this principal is a client rather than a user
    #[must_use]
    pub fn is_client(&self) -> bool {
        self.subject.starts_with("client:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates() {
        let principal = Principal::new("u-1", "alice")
            .with_tenant("t-1")
            .with_authority("ROLE_ADMIN")
            .with_authority("ROLE_ADMIN")
            .with_attribute("dept", 7);

        assert_eq!(principal.subject(), "u-1");
        assert_eq!(principal.tenant_id(), Some("t-1"));
        assert_eq!(principal.authorities().len(), 1);
        assert_eq!(principal.attributes()["dept"], Value::from(7));
        assert!(!principal.is_client());
    }

    #[test]
    fn test_client_principal() {
        let principal = Principal::for_client("svc");
        assert_eq!(principal.subject(), "client:svc");
        assert!(principal.is_client());
    }
}
