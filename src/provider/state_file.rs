//! # State File
//!
//! YAML model of everything one reconciliation pass observes: leadership,
//! unit configuration, secrets, and relation data. Loaded into the in-memory
//! stores before a pass and captured back afterwards.
//!
//! ```yaml
//! leader: true
//! config:
//!   domain: example.com
//!   tunnel-token: secret:operator-token
//! secrets:
//!   secret:operator-token:
//!     revisions:
//!       - tunnel-token: foobar
//! relations:
//!   - id: 1
//!     endpoint: cloudflared-route
//!     remote-app: cloudflared
//! ```

use crate::config::UnitConfig;
use crate::provider::{
    MemoryRelationStore, MemorySecretStore, RelationRecord, SecretHandle, SecretRecord,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Last reported unit status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusRecord {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelState {
    /// Whether this unit currently holds exclusive write authority
    #[serde(default)]
    pub leader: bool,
    #[serde(default)]
    pub config: UnitConfig,
    #[serde(default)]
    pub secrets: BTreeMap<SecretHandle, SecretRecord>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusRecord>,
}

impl ModelState {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Failed to parse state file")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize state file")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("Invalid state file {}", path.display()))
    }

    /// Write the state file atomically (temp file + rename)
    pub async fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_yaml()?;
        let tmp = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace state file {}", path.display()))?;
        Ok(())
    }

    /// In-memory stores seeded from this state
    #[must_use]
    pub fn stores(&self) -> (MemorySecretStore, MemoryRelationStore) {
        (
            MemorySecretStore::from_records(self.secrets.clone()),
            MemoryRelationStore::from_records(self.relations.clone()),
        )
    }

    /// Copy the current store contents back into this state
    pub async fn capture(&mut self, secrets: &MemorySecretStore, relations: &MemoryRelationStore) {
        self.secrets = secrets.records().await;
        self.relations = relations.records().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
leader: true
config:
  domain: example.com
  tunnel-token: secret:operator-token
secrets:
  secret:operator-token:
    revisions:
      - tunnel-token: foobar
relations:
  - id: 1
    endpoint: cloudflared-route
    remote-app: cloudflared
  - id: 2
    endpoint: ingress
    remote-app: requirer
    remote-app-data:
      name: '"requirer"'
"#;

    #[test]
    fn test_parse_sample_state() {
        let state = ModelState::from_yaml(SAMPLE).unwrap();
        assert!(state.leader);
        assert_eq!(state.config.domain(), Some("example.com"));
        assert_eq!(state.relations.len(), 2);
        assert_eq!(state.relations[1].remote_app_data["name"], "\"requirer\"");
        let secret = &state.secrets[&SecretHandle::new("secret:operator-token")];
        assert_eq!(secret.revisions[0]["tunnel-token"], "foobar");
        assert_eq!(secret.tracked_revision, 0);
    }

    #[test]
    fn test_empty_document_is_default_state() {
        let state = ModelState::from_yaml("{}").unwrap();
        assert_eq!(state, ModelState::default());
    }

    #[tokio::test]
    async fn test_capture_reflects_store_changes() {
        let mut state = ModelState::from_yaml(SAMPLE).unwrap();
        let (secrets, relations) = state.stores();
        relations.remove_relation(crate::provider::ChannelId(2)).await;
        state.capture(&secrets, &relations).await;
        assert_eq!(state.relations.len(), 1);
        assert_eq!(state.secrets.len(), 1);
    }
}
