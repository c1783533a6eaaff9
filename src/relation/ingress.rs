//! # ingress Endpoint
//!
//! This side publishes the tunnel URL under `ingress` as `{"url": ...}`.
//! The requirer describes itself in its application bag and one bag per
//! unit, each value JSON-encoded.

use crate::constants::INGRESS_FIELD;
use crate::provider::{Channel, RelationStore, Side, StoreError};
use crate::relation::IntegrationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Public URL served through the tunnel for `domain`
#[must_use]
pub fn derive_url(domain: &str) -> String {
    format!("https://{}/", domain.trim().trim_end_matches('/'))
}

#[derive(Debug, Serialize, Deserialize)]
struct IngressUrl {
    url: String,
}

/// Publishes and retracts the tunnel URL on an ingress channel
#[derive(Debug, Clone)]
pub struct IngressPublisher {
    relations: Arc<dyn RelationStore>,
}

impl IngressPublisher {
    pub fn new(relations: Arc<dyn RelationStore>) -> Self {
        Self { relations }
    }

    pub async fn publish(&self, channel: &Channel, url: &str) -> Result<(), StoreError> {
        let value = json!({ "url": url }).to_string();
        let current = self
            .relations
            .get(channel.id, &Side::Local, INGRESS_FIELD)
            .await?;
        if current.as_deref() == Some(value.as_str()) {
            debug!("Ingress URL on {} is up to date", channel);
            return Ok(());
        }
        self.relations
            .set(channel.id, &Side::Local, INGRESS_FIELD, value)
            .await?;
        info!("Published ingress URL {} on {}", url, channel);
        Ok(())
    }

    /// Remove the published record; no-op when nothing is published
    pub async fn retract(&self, channel: &Channel) -> Result<(), StoreError> {
        if self
            .relations
            .get(channel.id, &Side::Local, INGRESS_FIELD)
            .await?
            .is_none()
        {
            return Ok(());
        }
        self.relations
            .delete(channel.id, &Side::Local, INGRESS_FIELD)
            .await?;
        info!("Retracted ingress URL from {}", channel);
        Ok(())
    }

    /// URL currently published on `channel`
    pub async fn published_url(&self, channel: &Channel) -> Result<Option<String>, IntegrationError> {
        let Some(raw) = self
            .relations
            .get(channel.id, &Side::Local, INGRESS_FIELD)
            .await?
        else {
            return Ok(None);
        };
        let record: IngressUrl = serde_json::from_str(&raw)
            .map_err(|e| IntegrationError::InvalidIngressData(format!("published record: {e}")))?;
        Ok(Some(record.url))
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

/// Requirer application data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressAppData {
    pub model: String,
    pub name: String,
    pub port: u16,
    #[serde(default, alias = "strip-prefix")]
    pub strip_prefix: bool,
    #[serde(default, alias = "redirect-https")]
    pub redirect_https: bool,
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

/// Requirer unit data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressUnitData {
    pub host: String,
    #[serde(default)]
    pub ip: Option<String>,
}

/// Everything the requirer side of an ingress channel provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRequirerData {
    pub app: IngressAppData,
    /// Sorted by host
    pub units: Vec<IngressUnitData>,
}

impl IngressRequirerData {
    /// The `get-ingress-data` dump
    #[must_use]
    pub fn to_action_result(&self) -> Value {
        json!({
            "application-data": self.app,
            "unit-data": self.units,
        })
    }
}

/// Decode a bag whose values are each JSON-encoded
fn decode_bag<T: DeserializeOwned>(
    bag: &BTreeMap<String, String>,
    what: &str,
) -> Result<T, IntegrationError> {
    let mut fields = serde_json::Map::new();
    for (key, raw) in bag {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            IntegrationError::InvalidIngressData(format!("{what} field '{key}' is not JSON: {e}"))
        })?;
        fields.insert(key.clone(), value);
    }
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| IntegrationError::InvalidIngressData(format!("{what}: {e}")))
}

/// Read and validate the requirer side of an ingress channel
pub async fn requirer_data(
    relations: &dyn RelationStore,
    channel: &Channel,
) -> Result<IngressRequirerData, IntegrationError> {
    let app_bag = relations.bag(channel.id, &Side::Remote).await?;
    let app: IngressAppData = decode_bag(&app_bag, "application data")?;

    let mut units = Vec::new();
    for unit in relations.remote_units(channel.id).await? {
        let bag = relations
            .bag(channel.id, &Side::RemoteUnit(unit.clone()))
            .await?;
        units.push(decode_bag::<IngressUnitData>(&bag, &format!("unit {unit} data"))?);
    }
    units.sort_by(|a, b| a.host.cmp(&b.host));

    Ok(IngressRequirerData { app, units })
}

/// Run the `get-ingress-data` action against the first channel of `relation_name`
///
/// Returns the action results: a single `ingress` entry holding the JSON dump.
pub async fn ingress_data_action(
    relations: &dyn RelationStore,
    relation_name: &str,
) -> Result<BTreeMap<String, String>, IntegrationError> {
    let channel = relations
        .list_relations(relation_name)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| IntegrationError::NoRelation(relation_name.to_string()))?;
    let data = requirer_data(relations, &channel).await?;
    Ok(BTreeMap::from([(
        "ingress".to_string(),
        data.to_action_result().to_string(),
    )]))
}
