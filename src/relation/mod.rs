//! # Relation Endpoints
//!
//! What this application writes to, and reads from, its two relations.
//!
//! - `route`: the cloudflared-route endpoint (tunnel token secret + resolver hint)
//! - `ingress`: the ingress endpoint (published URL + requirer data)

pub mod ingress;
pub mod route;
mod token;

pub use ingress::{
    derive_url, ingress_data_action, requirer_data, IngressAppData, IngressPublisher,
    IngressRequirerData, IngressUnitData,
};
pub use route::{CloudflaredRouteRequirer, CredentialDistributor, RouteAnnouncer};
pub use token::TunnelToken;

use crate::provider::{SecretHandle, StoreError};
use thiserror::Error;

/// Failures reading relation data on behalf of a consumer
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The referenced secret exists but is corrupt
    #[error("secret {handle} doesn't have '{field}' field")]
    MissingField {
        handle: SecretHandle,
        field: &'static str,
    },

    #[error("invalid ingress requirer data: {0}")]
    InvalidIngressData(String),

    #[error("no {0} relation")]
    NoRelation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
