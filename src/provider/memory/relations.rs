//! In-memory relation store

use crate::provider::{Channel, ChannelId, RelationStore, Side, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// One relation with all of its data bags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelationRecord {
    pub id: ChannelId,
    pub endpoint: String,
    #[serde(default)]
    pub remote_app: String,
    #[serde(default)]
    pub local_app_data: BTreeMap<String, String>,
    #[serde(default)]
    pub remote_app_data: BTreeMap<String, String>,
    #[serde(default)]
    pub remote_units_data: BTreeMap<String, BTreeMap<String, String>>,
}

impl RelationRecord {
    pub fn new(id: u64, endpoint: impl Into<String>, remote_app: impl Into<String>) -> Self {
        Self {
            id: ChannelId(id),
            endpoint: endpoint.into(),
            remote_app: remote_app.into(),
            local_app_data: BTreeMap::new(),
            remote_app_data: BTreeMap::new(),
            remote_units_data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_local_app_data(mut self, key: &str, value: &str) -> Self {
        self.local_app_data
            .insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_remote_app_data(mut self, key: &str, value: &str) -> Self {
        self.remote_app_data
            .insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_remote_unit_data(mut self, unit: &str, key: &str, value: &str) -> Self {
        self.remote_units_data
            .entry(unit.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn channel(&self) -> Channel {
        Channel {
            id: self.id,
            name: self.endpoint.clone(),
            peer: self.remote_app.clone(),
        }
    }

    fn bag(&self, side: &Side) -> Option<&BTreeMap<String, String>> {
        match side {
            Side::Local => Some(&self.local_app_data),
            Side::Remote => Some(&self.remote_app_data),
            Side::RemoteUnit(unit) => self.remote_units_data.get(unit),
        }
    }
}

/// In-memory [`RelationStore`]
///
/// Relations are kept in establishment order.
#[derive(Clone, Debug, Default)]
pub struct MemoryRelationStore {
    relations: Arc<RwLock<Vec<RelationRecord>>>,
}

impl MemoryRelationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: Vec<RelationRecord>) -> Self {
        Self {
            relations: Arc::new(RwLock::new(records)),
        }
    }

    /// Establish a relation, replacing any relation with the same id
    pub async fn add_relation(&self, record: RelationRecord) -> Channel {
        let channel = record.channel();
        let mut relations = self.relations.write().await;
        relations.retain(|existing| existing.id != record.id);
        relations.push(record);
        channel
    }

    pub async fn remove_relation(&self, id: ChannelId) -> Option<RelationRecord> {
        let mut relations = self.relations.write().await;
        let index = relations.iter().position(|record| record.id == id)?;
        Some(relations.remove(index))
    }

    /// Copy of every relation, for persisting and comparisons
    pub async fn records(&self) -> Vec<RelationRecord> {
        self.relations.read().await.clone()
    }
}

#[async_trait]
impl RelationStore for MemoryRelationStore {
    async fn get(
        &self,
        channel: ChannelId,
        side: &Side,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        let relations = self.relations.read().await;
        let record = relations
            .iter()
            .find(|record| record.id == channel)
            .ok_or(StoreError::ChannelNotFound(channel))?;
        Ok(record.bag(side).and_then(|bag| bag.get(key)).cloned())
    }

    async fn set(
        &self,
        channel: ChannelId,
        side: &Side,
        key: &str,
        value: String,
    ) -> Result<(), StoreError> {
        if *side != Side::Local {
            return Err(StoreError::ReadOnly {
                channel,
                side: side.clone(),
            });
        }
        let mut relations = self.relations.write().await;
        let record = relations
            .iter_mut()
            .find(|record| record.id == channel)
            .ok_or(StoreError::ChannelNotFound(channel))?;
        record.local_app_data.insert(key.to_string(), value);
        debug!("Set '{}' on relation {}", key, channel);
        Ok(())
    }

    async fn delete(&self, channel: ChannelId, side: &Side, key: &str) -> Result<(), StoreError> {
        if *side != Side::Local {
            return Err(StoreError::ReadOnly {
                channel,
                side: side.clone(),
            });
        }
        let mut relations = self.relations.write().await;
        let record = relations
            .iter_mut()
            .find(|record| record.id == channel)
            .ok_or(StoreError::ChannelNotFound(channel))?;
        if record.local_app_data.remove(key).is_some() {
            debug!("Removed '{}' from relation {}", key, channel);
        }
        Ok(())
    }

    async fn bag(
        &self,
        channel: ChannelId,
        side: &Side,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let relations = self.relations.read().await;
        let record = relations
            .iter()
            .find(|record| record.id == channel)
            .ok_or(StoreError::ChannelNotFound(channel))?;
        Ok(record.bag(side).cloned().unwrap_or_default())
    }

    async fn list_relations(&self, name: &str) -> Result<Vec<Channel>, StoreError> {
        Ok(self
            .relations
            .read()
            .await
            .iter()
            .filter(|record| record.endpoint == name)
            .map(RelationRecord::channel)
            .collect())
    }

    async fn remote_units(&self, channel: ChannelId) -> Result<Vec<String>, StoreError> {
        let relations = self.relations.read().await;
        let record = relations
            .iter()
            .find(|record| record.id == channel)
            .ok_or(StoreError::ChannelNotFound(channel))?;
        Ok(record.remote_units_data.keys().cloned().collect())
    }
}
