//! # Provider Modules
//!
//! The two stores the reconciler drives, modelled as async traits:
//!
//! - `SecretStore`: a high-trust keyed store of versioned secret payloads
//! - `RelationStore`: low-trust key/value bags shared with a peer per relation
//!
//! The two only ever meet through a [`SecretHandle`] written into a relation
//! bag. Secret payloads are never inlined into relation data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod state_file;

pub use memory::{MemoryRelationStore, MemorySecretStore, RelationRecord, SecretRecord};
pub use state_file::{ModelState, StatusRecord};

/// Secret payload: field name to value
pub type Payload = BTreeMap<String, String>;

/// Opaque reference to a secret held by a [`SecretStore`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHandle(String);

impl SecretHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relation identifier, unique within a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One established relation between this application and a peer application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    /// Relation (endpoint) name, e.g. `cloudflared-route`
    pub name: String,
    /// Name of the peer application on the other end
    pub peer: String,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

/// Which data bag of a relation to address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Side {
    /// This application's bag, the only one writable from here
    Local,
    /// The peer application's bag
    Remote,
    /// The bag of one peer unit, e.g. `ingress-requirer/0`
    RemoteUnit(String),
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => f.write_str("local"),
            Side::Remote => f.write_str("remote"),
            Side::RemoteUnit(unit) => write!(f, "remote unit {unit}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secret not found: {0}")]
    SecretNotFound(SecretHandle),

    #[error("relation {0} not found")]
    ChannelNotFound(ChannelId),

    #[error("{side} data of relation {channel} is read-only")]
    ReadOnly { channel: ChannelId, side: Side },

    #[error("store backend failed: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Versioned secret storage with peer grants
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Create a new secret and return its handle
    async fn create(&self, payload: Payload) -> Result<SecretHandle, StoreError>;

    /// Read a secret's payload
    ///
    /// Without `refresh` the revision last observed by this process is returned;
    /// with `refresh` the observation advances to the latest revision first.
    async fn get_latest(&self, handle: &SecretHandle, refresh: bool)
        -> Result<Payload, StoreError>;

    /// Store a new revision under the same handle
    async fn update(&self, handle: &SecretHandle, payload: Payload) -> Result<(), StoreError>;

    /// Allow the peer application of `channel` to read the secret
    async fn grant(&self, handle: &SecretHandle, channel: &Channel) -> Result<(), StoreError>;

    /// Remove every revision of the secret
    async fn revoke_all(&self, handle: &SecretHandle) -> Result<(), StoreError>;
}

/// Per-relation key/value bags
#[async_trait]
pub trait RelationStore: Send + Sync + fmt::Debug {
    async fn get(
        &self,
        channel: ChannelId,
        side: &Side,
        key: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Write a key; only [`Side::Local`] is writable
    async fn set(
        &self,
        channel: ChannelId,
        side: &Side,
        key: &str,
        value: String,
    ) -> Result<(), StoreError>;

    /// Remove a key; removing an absent key is not an error
    async fn delete(&self, channel: ChannelId, side: &Side, key: &str) -> Result<(), StoreError>;

    /// Full contents of one bag
    async fn bag(&self, channel: ChannelId, side: &Side)
        -> Result<BTreeMap<String, String>, StoreError>;

    /// Established relations with the given name, in establishment order
    async fn list_relations(&self, name: &str) -> Result<Vec<Channel>, StoreError>;

    /// Unit names on the peer side of a relation, sorted
    async fn remote_units(&self, channel: ChannelId) -> Result<Vec<String>, StoreError>;
}
