//! # cloudflared-route Endpoint
//!
//! The tunnel token travels as a secret reference: the local application bag
//! holds only the handle (`tunnel_token_secret_id`), the token itself lives in
//! the secret store under `tunnel-token`, granted to the peer application.
//! The handle stays stable across token changes so the consumer keeps
//! following the same secret.

use crate::constants::{
    NAMESERVER_FIELD, TUNNEL_TOKEN_SECRET_ID_FIELD, TUNNEL_TOKEN_SECRET_VALUE_FIELD,
};
use crate::observability::metrics;
use crate::provider::{Channel, Payload, RelationStore, SecretHandle, SecretStore, Side, StoreError};
use crate::relation::{IntegrationError, TunnelToken};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn token_payload(token: &TunnelToken) -> Payload {
    Payload::from([(
        TUNNEL_TOKEN_SECRET_VALUE_FIELD.to_string(),
        token.expose().to_string(),
    )])
}

/// Handle stored in `side` of `channel`, if any
async fn secret_reference(
    relations: &dyn RelationStore,
    channel: &Channel,
    side: &Side,
) -> Result<Option<SecretHandle>, StoreError> {
    Ok(relations
        .get(channel.id, side, TUNNEL_TOKEN_SECRET_ID_FIELD)
        .await?
        .filter(|id| !id.is_empty())
        .map(SecretHandle::new))
}

/// Publishes, updates, and revokes the tunnel token secret on a channel
#[derive(Debug, Clone)]
pub struct CredentialDistributor {
    secrets: Arc<dyn SecretStore>,
    relations: Arc<dyn RelationStore>,
}

impl CredentialDistributor {
    pub fn new(secrets: Arc<dyn SecretStore>, relations: Arc<dyn RelationStore>) -> Self {
        Self { secrets, relations }
    }

    /// Make `channel` reference a secret whose `tunnel-token` equals `token`
    ///
    /// Creates and grants a secret on first use; afterwards updates the same
    /// secret in place, and only when the stored token differs.
    pub async fn publish(
        &self,
        channel: &Channel,
        token: &TunnelToken,
    ) -> Result<SecretHandle, StoreError> {
        if let Some(handle) = secret_reference(self.relations.as_ref(), channel, &Side::Local).await? {
            match self.secrets.get_latest(&handle, true).await {
                Ok(content) => {
                    if content.get(TUNNEL_TOKEN_SECRET_VALUE_FIELD).map(String::as_str)
                        != Some(token.expose())
                    {
                        self.secrets.update(&handle, token_payload(token)).await?;
                        metrics::increment_secret_operation("update");
                        info!("Updated tunnel token secret {} for {}", handle, channel);
                    } else {
                        debug!("Tunnel token secret {} for {} is up to date", handle, channel);
                    }
                    return Ok(handle);
                }
                Err(StoreError::SecretNotFound(_)) => {
                    warn!(
                        "Secret {} referenced by {} no longer exists, creating a new one",
                        handle, channel
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let handle = self.secrets.create(token_payload(token)).await?;
        metrics::increment_secret_operation("create");
        self.secrets.grant(&handle, channel).await?;
        metrics::increment_secret_operation("grant");
        self.relations
            .set(
                channel.id,
                &Side::Local,
                TUNNEL_TOKEN_SECRET_ID_FIELD,
                handle.as_str().to_string(),
            )
            .await?;
        info!(
            "Published tunnel token secret {} to {} ({})",
            handle, channel, channel.peer
        );
        Ok(handle)
    }

    /// Remove every revision of the referenced secret and clear the reference
    ///
    /// No-op when `channel` holds no reference.
    pub async fn revoke(&self, channel: &Channel) -> Result<(), StoreError> {
        let Some(raw) = self
            .relations
            .get(channel.id, &Side::Local, TUNNEL_TOKEN_SECRET_ID_FIELD)
            .await?
        else {
            return Ok(());
        };

        if !raw.is_empty() {
            let handle = SecretHandle::new(raw);
            match self.secrets.revoke_all(&handle).await {
                Ok(()) => {
                    metrics::increment_secret_operation("revoke");
                    info!("Revoked tunnel token secret {} on {}", handle, channel);
                }
                Err(StoreError::SecretNotFound(_)) => {
                    debug!("Secret {} on {} was already gone", handle, channel);
                }
                Err(e) => return Err(e),
            }
        }
        self.relations
            .delete(channel.id, &Side::Local, TUNNEL_TOKEN_SECRET_ID_FIELD)
            .await
    }
}

/// Sets or removes the resolver hint on a channel
#[derive(Debug, Clone)]
pub struct RouteAnnouncer {
    relations: Arc<dyn RelationStore>,
}

impl RouteAnnouncer {
    pub fn new(relations: Arc<dyn RelationStore>) -> Self {
        Self { relations }
    }

    /// Write `nameserver` when present and non-empty, otherwise remove the key
    pub async fn set_or_clear(
        &self,
        channel: &Channel,
        nameserver: Option<&str>,
    ) -> Result<(), StoreError> {
        let current = self
            .relations
            .get(channel.id, &Side::Local, NAMESERVER_FIELD)
            .await?;
        match nameserver.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) if current.as_deref() == Some(value) => Ok(()),
            Some(value) => {
                debug!("Announcing nameserver {} on {}", value, channel);
                self.relations
                    .set(channel.id, &Side::Local, NAMESERVER_FIELD, value.to_string())
                    .await
            }
            None if current.is_none() => Ok(()),
            None => {
                debug!("Removing nameserver from {}", channel);
                self.relations
                    .delete(channel.id, &Side::Local, NAMESERVER_FIELD)
                    .await
            }
        }
    }
}

/// Consumer-side view of a cloudflared-route channel
#[derive(Debug, Clone)]
pub struct CloudflaredRouteRequirer {
    secrets: Arc<dyn SecretStore>,
    relations: Arc<dyn RelationStore>,
    side: Side,
}

impl CloudflaredRouteRequirer {
    /// Reads the peer application's bag, as a consumer does
    pub fn new(secrets: Arc<dyn SecretStore>, relations: Arc<dyn RelationStore>) -> Self {
        Self {
            secrets,
            relations,
            side: Side::Remote,
        }
    }

    /// Read a different bag, e.g. [`Side::Local`] to inspect what this side published
    #[must_use]
    pub fn reading(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// The tunnel token referenced on `channel`
    ///
    /// `Ok(None)` when no token is referenced; [`IntegrationError::MissingField`]
    /// when the referenced secret lacks the `tunnel-token` field.
    pub async fn tunnel_token(
        &self,
        channel: &Channel,
    ) -> Result<Option<TunnelToken>, IntegrationError> {
        let Some(handle) =
            secret_reference(self.relations.as_ref(), channel, &self.side).await?
        else {
            return Ok(None);
        };
        let mut content = self.secrets.get_latest(&handle, true).await?;
        match content.remove(TUNNEL_TOKEN_SECRET_VALUE_FIELD) {
            Some(token) => Ok(Some(TunnelToken::new(token))),
            None => Err(IntegrationError::MissingField {
                handle,
                field: TUNNEL_TOKEN_SECRET_VALUE_FIELD,
            }),
        }
    }

    pub async fn nameserver(&self, channel: &Channel) -> Result<Option<String>, IntegrationError> {
        Ok(self
            .relations
            .get(channel.id, &self.side, NAMESERVER_FIELD)
            .await?)
    }
}
