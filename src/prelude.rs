//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use cloudflare_configurator::prelude::*;
//! ```

// Store traits and their shared types
pub use crate::provider::{
    Channel, ChannelId, MemoryRelationStore, MemorySecretStore, ModelState, Payload,
    RelationRecord, RelationStore, SecretHandle, SecretRecord, SecretStore, Side, StoreError,
};

// Reconciler types - core functionality
pub use crate::controller::reconciler::{
    plan, CredentialInput, Hold, Outcome, Plan, Reconciler, ReconcilerError, Snapshot, Step,
    Trigger,
};

// Relation endpoints and the query surface
pub use crate::relation::{
    CloudflaredRouteRequirer, CredentialDistributor, IngressPublisher, IntegrationError,
    RouteAnnouncer, TunnelToken,
};

// Config types
pub use crate::config::{ConfiguratorConfig, RelationNames, UnitConfig};
