//! In-memory secret store with revision tracking

use crate::provider::{Channel, Payload, SecretHandle, SecretStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One secret with all of its revisions
///
/// Revisions are ordered oldest first. `tracked_revision` is the 1-based
/// revision this process last observed; `0` means never observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecretRecord {
    #[serde(default)]
    pub revisions: Vec<Payload>,
    #[serde(default)]
    pub tracked_revision: usize,
    /// Peer applications the secret is granted to
    #[serde(default)]
    pub grants: BTreeSet<String>,
    /// Set once every revision has been removed
    #[serde(default)]
    pub revoked: bool,
}

impl SecretRecord {
    /// A secret with a single revision
    #[must_use]
    pub fn with_content(payload: Payload) -> Self {
        Self {
            revisions: vec![payload],
            ..Self::default()
        }
    }

    fn latest_revision(&self) -> usize {
        self.revisions.len()
    }
}

/// In-memory [`SecretStore`]
///
/// This is ephemeral unless captured into a [`crate::provider::ModelState`].
#[derive(Clone, Debug, Default)]
pub struct MemorySecretStore {
    store: Arc<RwLock<BTreeMap<SecretHandle, SecretRecord>>>,
    mutations: Arc<AtomicU64>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: BTreeMap<SecretHandle, SecretRecord>) -> Self {
        Self {
            store: Arc::new(RwLock::new(records)),
            mutations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Insert a secret under a known handle, as an operator would
    pub async fn insert(&self, handle: SecretHandle, record: SecretRecord) {
        self.store.write().await.insert(handle, record);
    }

    /// Copy of every secret, for persisting
    pub async fn records(&self) -> BTreeMap<SecretHandle, SecretRecord> {
        self.store.read().await.clone()
    }

    pub async fn record(&self, handle: &SecretHandle) -> Option<SecretRecord> {
        self.store.read().await.get(handle).cloned()
    }

    /// True when the handle exists and all of its revisions were removed
    pub async fn is_revoked(&self, handle: &SecretHandle) -> bool {
        self.store
            .read()
            .await
            .get(handle)
            .is_some_and(|record| record.revoked && record.revisions.is_empty())
    }

    /// Number of create/update/grant/revoke calls served so far
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn count_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn create(&self, payload: Payload) -> Result<SecretHandle, StoreError> {
        self.count_mutation();
        let handle = SecretHandle::new(format!("secret:{}", Uuid::new_v4().simple()));
        let record = SecretRecord {
            revisions: vec![payload],
            tracked_revision: 1,
            ..SecretRecord::default()
        };
        self.store.write().await.insert(handle.clone(), record);
        debug!("Created secret {}", handle);
        Ok(handle)
    }

    async fn get_latest(
        &self,
        handle: &SecretHandle,
        refresh: bool,
    ) -> Result<Payload, StoreError> {
        let mut store = self.store.write().await;
        let record = store
            .get_mut(handle)
            .filter(|record| !record.revoked && !record.revisions.is_empty())
            .ok_or_else(|| StoreError::SecretNotFound(handle.clone()))?;

        if refresh || record.tracked_revision == 0 {
            record.tracked_revision = record.latest_revision();
        }
        let index = record.tracked_revision.min(record.latest_revision()) - 1;
        Ok(record.revisions[index].clone())
    }

    async fn update(&self, handle: &SecretHandle, payload: Payload) -> Result<(), StoreError> {
        self.count_mutation();
        let mut store = self.store.write().await;
        let record = store
            .get_mut(handle)
            .filter(|record| !record.revoked)
            .ok_or_else(|| StoreError::SecretNotFound(handle.clone()))?;
        record.revisions.push(payload);
        debug!(
            "Added revision {} to secret {}",
            record.latest_revision(),
            handle
        );
        Ok(())
    }

    async fn grant(&self, handle: &SecretHandle, channel: &Channel) -> Result<(), StoreError> {
        self.count_mutation();
        let mut store = self.store.write().await;
        let record = store
            .get_mut(handle)
            .filter(|record| !record.revoked)
            .ok_or_else(|| StoreError::SecretNotFound(handle.clone()))?;
        record.grants.insert(channel.peer.clone());
        debug!("Granted secret {} to {}", handle, channel.peer);
        Ok(())
    }

    async fn revoke_all(&self, handle: &SecretHandle) -> Result<(), StoreError> {
        self.count_mutation();
        let mut store = self.store.write().await;
        let record = store
            .get_mut(handle)
            .ok_or_else(|| StoreError::SecretNotFound(handle.clone()))?;
        record.revisions.clear();
        record.grants.clear();
        record.tracked_revision = 0;
        record.revoked = true;
        debug!("Removed all revisions of secret {}", handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChannelId;

    fn payload(value: &str) -> Payload {
        Payload::from([("tunnel-token".to_string(), value.to_string())])
    }

    fn channel() -> Channel {
        Channel {
            id: ChannelId(1),
            name: "cloudflared-route".to_string(),
            peer: "cloudflared".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_unique_handles() {
        let store = MemorySecretStore::new();
        let first = store.create(payload("a")).await.unwrap();
        let second = store.create(payload("a")).await.unwrap();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("secret:"));
    }

    #[tokio::test]
    async fn test_read_without_refresh_returns_tracked_revision() {
        let store = MemorySecretStore::new();
        let handle = store.create(payload("old")).await.unwrap();
        store.update(&handle, payload("new")).await.unwrap();

        let stale = store.get_latest(&handle, false).await.unwrap();
        assert_eq!(stale["tunnel-token"], "old");

        let fresh = store.get_latest(&handle, true).await.unwrap();
        assert_eq!(fresh["tunnel-token"], "new");

        let tracked = store.get_latest(&handle, false).await.unwrap();
        assert_eq!(tracked["tunnel-token"], "new");
    }

    #[tokio::test]
    async fn test_unobserved_secret_reads_latest() {
        let store = MemorySecretStore::new();
        let handle = SecretHandle::new("secret:operator");
        store
            .insert(
                handle.clone(),
                SecretRecord {
                    revisions: vec![payload("one"), payload("two")],
                    ..SecretRecord::default()
                },
            )
            .await;
        let content = store.get_latest(&handle, false).await.unwrap();
        assert_eq!(content["tunnel-token"], "two");
    }

    #[tokio::test]
    async fn test_revoke_all_removes_every_revision() {
        let store = MemorySecretStore::new();
        let handle = store.create(payload("a")).await.unwrap();
        store.grant(&handle, &channel()).await.unwrap();
        store.update(&handle, payload("b")).await.unwrap();

        store.revoke_all(&handle).await.unwrap();

        assert!(store.is_revoked(&handle).await);
        assert!(matches!(
            store.get_latest(&handle, true).await,
            Err(StoreError::SecretNotFound(_))
        ));
        assert!(store.record(&handle).await.unwrap().grants.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_handle_is_not_found() {
        let store = MemorySecretStore::new();
        let handle = SecretHandle::new("secret:missing");
        assert!(matches!(
            store.get_latest(&handle, true).await,
            Err(StoreError::SecretNotFound(_))
        ));
        assert!(store.update(&handle, payload("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_mutation_count_ignores_reads() {
        let store = MemorySecretStore::new();
        let handle = store.create(payload("a")).await.unwrap();
        store.grant(&handle, &channel()).await.unwrap();
        let _ = store.get_latest(&handle, true).await.unwrap();
        assert_eq!(store.mutation_count(), 2);
    }
}
