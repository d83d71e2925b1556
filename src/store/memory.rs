// ABOUTME: In-memory authorization store backed by DashMap
// ABOUTME: Token index for lookups; consume flips the invalidated flag under the record's entry lock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::AuthorizationService;
use crate::crypto;
use crate::errors::{AppError, AppResult};
use crate::models::{Authorization, TokenKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

type TokenKey = (TokenKind, String);

/// Reference store; not durable across restarts
///
/// Lock order: an index guard is never held while a record guard is taken.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationService {
    records: DashMap<Uuid, Authorization>,
    index: DashMap<TokenKey, Uuid>,
}

impl InMemoryAuthorizationService {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop records whose every token has expired; returns how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .records
            .iter()
            .filter(|entry| entry.value().is_fully_expired(now))
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter(|id| self.remove_record(*id))
            .count()
    }

    fn lookup_id(&self, value: &str, kind: TokenKind) -> Option<Uuid> {
        self.index.get(&(kind, value.to_owned())).map(|id| *id.value())
    }

    fn remove_record(&self, id: Uuid) -> bool {
        let Some((_, record)) = self.records.remove(&id) else {
            return false;
        };
        for (kind, value) in record.token_values() {
            self.index
                .remove_if(&(kind, value.to_owned()), |_, owner| *owner == id);
        }
        true
    }

    fn release_keys(&self, keys: &[TokenKey]) {
        for key in keys {
            self.index.remove(key);
        }
    }
}

#[async_trait]
impl AuthorizationService for InMemoryAuthorizationService {
    async fn save(&self, authorization: Authorization) -> AppResult<()> {
        let id = authorization.id;
        if self.records.contains_key(&id) {
            return Err(AppError::server_error("Authorization id already exists"));
        }

        let keys: Vec<TokenKey> = authorization
            .token_values()
            .into_iter()
            .map(|(kind, value)| (kind, value.to_owned()))
            .collect();

        // Claim every token value first so a collision leaves nothing behind
        let mut claimed = Vec::with_capacity(keys.len());
        for key in keys {
            let vacant = match self.index.entry(key.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(id);
                    true
                }
            };
            if !vacant {
                tracing::error!(
                    token_kind = %key.0,
                    token_fp = %crypto::fingerprint(&key.1),
                    "Token value collision while saving authorization"
                );
                self.release_keys(&claimed);
                return Err(AppError::server_error("Token value already stored"));
            }
            claimed.push(key);
        }

        let stored = match self.records.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(authorization);
                true
            }
        };
        if !stored {
            self.release_keys(&claimed);
            return Err(AppError::server_error("Authorization id already exists"));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Authorization>> {
        Ok(self.records.get(&id).map(|record| record.value().clone()))
    }

    async fn find_by_token(&self, value: &str, kind: TokenKind) -> AppResult<Option<Authorization>> {
        let Some(id) = self.lookup_id(value, kind) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|record| record.value().clone()))
    }

    async fn remove(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.remove_record(id))
    }

    async fn consume_token(
        &self,
        value: &str,
        kind: TokenKind,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Authorization>> {
        let Some(id) = self.lookup_id(value, kind) else {
            return Ok(None);
        };

        // get_mut holds the shard write lock for the whole check-and-mark
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if record.client_id != client_id {
            tracing::warn!(
                token_kind = %kind,
                presented_by = %client_id,
                "Single-use token presented by a client that does not own it"
            );
            return Ok(None);
        }
        let Some(token) = record.token_mut(kind) else {
            return Ok(None);
        };
        if token.invalidated || token.is_expired(now) {
            return Ok(None);
        }
        token.invalidated = true;

        Ok(Some(record.value().clone()))
    }

    async fn release_token(&self, id: Uuid, kind: TokenKind) -> AppResult<bool> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        let Some(token) = record.token_mut(kind) else {
            return Ok(false);
        };
        let released = token.invalidated;
        token.invalidated = false;
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GrantType, Principal, Scopes, TokenMetadata};
    use chrono::Duration;

    fn record(access: &str, refresh: Option<&str>) -> Authorization {
        let now = Utc::now();
        Authorization {
            id: Uuid::new_v4(),
            client_id: "web".to_owned(),
            principal: Principal::new("u-1", "alice"),
            grant_type: GrantType::Password,
            scopes: Scopes::parse("read"),
            access_token: Some(TokenMetadata::new(access, now, now + Duration::hours(1))),
            refresh_token: refresh.map(|r| TokenMetadata::new(r, now, now + Duration::days(1))),
            authorization_code: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_lookup_by_each_token() {
        let store = InMemoryAuthorizationService::new();
        let auth = record("a-1", Some("r-1"));
        let id = auth.id;
        store.save(auth).await.unwrap();

        let by_access = store.find_by_token("a-1", TokenKind::AccessToken).await.unwrap();
        let by_refresh = store.find_by_token("r-1", TokenKind::RefreshToken).await.unwrap();
        assert_eq!(by_access.unwrap().id, id);
        assert_eq!(by_refresh.unwrap().id, id);
        assert!(store
            .find_by_token("a-1", TokenKind::RefreshToken)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_collision_leaves_no_partial_index() {
        let store = InMemoryAuthorizationService::new();
        store.save(record("a-1", Some("r-1"))).await.unwrap();

        let clash = record("a-2", Some("r-1"));
        assert!(store.save(clash).await.is_err());
        assert!(store
            .find_by_token("a-2", TokenKind::AccessToken)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_consume_is_single_use_and_client_bound() {
        let store = InMemoryAuthorizationService::new();
        store.save(record("a-1", Some("r-1"))).await.unwrap();
        let now = Utc::now();

        let foreign = store
            .consume_token("r-1", TokenKind::RefreshToken, "other", now)
            .await
            .unwrap();
        assert!(foreign.is_none());

        let first = store
            .consume_token("r-1", TokenKind::RefreshToken, "web", now)
            .await
            .unwrap();
        assert!(first.unwrap().refresh_token.unwrap().invalidated);

        let second = store
            .consume_token("r-1", TokenKind::RefreshToken, "web", now)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_release_restores_consumed_token() {
        let store = InMemoryAuthorizationService::new();
        let auth = record("a-1", Some("r-1"));
        let id = auth.id;
        store.save(auth).await.unwrap();
        let now = Utc::now();

        assert!(!store.release_token(id, TokenKind::RefreshToken).await.unwrap());
        store
            .consume_token("r-1", TokenKind::RefreshToken, "web", now)
            .await
            .unwrap()
            .unwrap();
        assert!(store.release_token(id, TokenKind::RefreshToken).await.unwrap());

        let again = store
            .consume_token("r-1", TokenKind::RefreshToken, "web", now)
            .await
            .unwrap();
        assert!(again.is_some());
        assert!(!store
            .release_token(Uuid::new_v4(), TokenKind::RefreshToken)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_consume_rejects_expired() {
        let store = InMemoryAuthorizationService::new();
        store.save(record("a-1", Some("r-1"))).await.unwrap();
        let later = Utc::now() + Duration::days(2);
        assert!(store
            .consume_token("r-1", TokenKind::RefreshToken, "web", later)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_and_purge() {
        let store = InMemoryAuthorizationService::new();
        let auth = record("a-1", None);
        let id = auth.id;
        store.save(auth).await.unwrap();
        store.save(record("a-2", Some("r-2"))).await.unwrap();

        assert!(store.remove(id).await.unwrap());
        assert!(!store.remove(id).await.unwrap());
        assert!(store
            .find_by_token("a-1", TokenKind::AccessToken)
            .await
            .unwrap()
            .is_none());

        assert_eq!(store.purge_expired(Utc::now() + Duration::days(2)), 1);
        assert!(store.is_empty());
    }
}
