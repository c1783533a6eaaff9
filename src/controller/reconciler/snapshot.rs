//! # Snapshot
//!
//! Everything one pass decides on, observed once at the start of the pass.

use crate::config::{RelationNames, UnitConfig};
use crate::constants::{DEFAULT_CLOUDFLARED_ROUTE_RELATION, TUNNEL_TOKEN_SECRET_VALUE_FIELD};
use crate::provider::{Channel, RelationStore, SecretHandle, SecretStore, StoreError};
use crate::relation::TunnelToken;
use tracing::debug;

/// The configured credential after dereferencing its secret handle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialInput {
    /// No handle configured
    #[default]
    Unset,
    Resolved(TunnelToken),
    /// The handle could not be dereferenced; the reason is operator-facing
    Invalid(String),
}

impl CredentialInput {
    /// Dereference `handle` with a forced refresh
    pub async fn resolve(
        secrets: &dyn SecretStore,
        handle: &SecretHandle,
    ) -> Result<Self, StoreError> {
        match secrets.get_latest(handle, true).await {
            Ok(mut content) => Ok(match content.remove(TUNNEL_TOKEN_SECRET_VALUE_FIELD) {
                Some(token) => CredentialInput::Resolved(TunnelToken::new(token)),
                None => CredentialInput::Invalid(format!(
                    "missing '{TUNNEL_TOKEN_SECRET_VALUE_FIELD}' in secret: {handle}"
                )),
            }),
            Err(StoreError::SecretNotFound(missing)) => Ok(CredentialInput::Invalid(format!(
                "secret not found: {missing}"
            ))),
            Err(e) => Err(e),
        }
    }

    /// The token, when resolved and non-blank
    #[must_use]
    pub fn token(&self) -> Option<&TunnelToken> {
        match self {
            CredentialInput::Resolved(token) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub domain: Option<String>,
    pub credential: CredentialInput,
    /// Resolver hint to announce
    pub nameserver: Option<String>,
    /// True iff this process is the sole writer
    pub has_authority: bool,
    /// Name of the credential relation, used in the waiting message
    pub credential_relation: String,
    pub credential_channel: Option<Channel>,
    pub ingress_channel: Option<Channel>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            domain: None,
            credential: CredentialInput::Unset,
            nameserver: None,
            has_authority: false,
            credential_relation: DEFAULT_CLOUDFLARED_ROUTE_RELATION.to_string(),
            credential_channel: None,
            ingress_channel: None,
        }
    }
}

impl Snapshot {
    /// Observe unit configuration and both stores
    ///
    /// Only the first established relation of each name is considered.
    pub async fn observe(
        config: &UnitConfig,
        has_authority: bool,
        names: &RelationNames,
        secrets: &dyn SecretStore,
        relations: &dyn RelationStore,
    ) -> Result<Self, StoreError> {
        let credential = match config.tunnel_token() {
            Some(handle) => CredentialInput::resolve(secrets, handle).await?,
            None => CredentialInput::Unset,
        };
        let credential_channel = relations
            .list_relations(&names.credential)
            .await?
            .into_iter()
            .next();
        let ingress_channel = relations
            .list_relations(&names.ingress)
            .await?
            .into_iter()
            .next();

        debug!(
            "Observed snapshot: authority={}, credential_channel={:?}, ingress_channel={:?}",
            has_authority,
            credential_channel.as_ref().map(ToString::to_string),
            ingress_channel.as_ref().map(ToString::to_string)
        );

        Ok(Self {
            domain: config.domain().map(str::to_string),
            credential,
            nameserver: config.nameserver().map(str::to_string),
            has_authority,
            credential_relation: names.credential.clone(),
            credential_channel,
            ingress_channel,
        })
    }

    /// Use `fallback` as the resolver hint when none is configured
    #[must_use]
    pub fn with_nameserver_fallback(mut self, fallback: Option<String>) -> Self {
        if self.nameserver.is_none() {
            self.nameserver = fallback;
        }
        self
    }
}
