//! # Reconciler
//!
//! Drives the credential and ingress channels to match the unit
//! configuration.
//!
//! ## Reconciliation Flow
//!
//! 1. Observe a [`Snapshot`] (authority, configuration, resolved credential,
//!    channel presence)
//! 2. [`plan`] the outcome and the ordered store mutations
//! 3. Apply the mutations through the relation endpoints
//! 4. Report the [`Outcome`] as the unit status

pub mod plan;
pub mod reconcile;
pub mod snapshot;
pub mod types;

pub use plan::{plan, Plan, Step};
pub use reconcile::Reconciler;
pub use snapshot::{CredentialInput, Snapshot};
pub use types::{Hold, Outcome, ReconcilerError, Trigger};
