//! # Types
//!
//! Core types for the reconciler.

use crate::provider::{Channel, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Externally visible unit status produced by one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum Outcome {
    Active,
    Blocked(String),
    Waiting(String),
}

impl Outcome {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Active => "active",
            Outcome::Blocked(_) => "blocked",
            Outcome::Waiting(_) => "waiting",
        }
    }

    /// Status message; empty when active
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Outcome::Active => "",
            Outcome::Blocked(message) | Outcome::Waiting(message) => message,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Active => f.write_str("active"),
            other => write!(f, "{}: {}", other.name(), other.message()),
        }
    }
}

/// Why a pass stopped short of convergence
///
/// The `Display` text is the status message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Hold {
    #[error("not sole authority: only a single unit is supported, remove the additional units")]
    NotSoleAuthority,

    #[error("invalid credential configuration: {0}")]
    InvalidCredential(String),

    /// Missing configuration items, in declaration order
    #[error("waiting for {} configuration", .0.join(", "))]
    IncompleteConfiguration(Vec<&'static str>),

    #[error("waiting for {0} integration")]
    ChannelAbsent(String),
}

impl Hold {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Hold::ChannelAbsent(_) => Outcome::Waiting(self.to_string()),
            _ => Outcome::Blocked(self.to_string()),
        }
    }

    /// Whether previously published artifacts must be withdrawn
    #[must_use]
    pub fn requires_cleanup(&self) -> bool {
        !matches!(self, Hold::NotSoleAuthority)
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// What caused a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    ConfigChanged,
    SecretChanged,
    IngressDataProvided,
    CredentialRelationChanged,
    /// The given credential channel is being torn down
    CredentialRelationBroken(Channel),
    /// Periodic timer
    Resync,
}

impl Trigger {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::ConfigChanged => "config-changed",
            Trigger::SecretChanged => "secret-changed",
            Trigger::IngressDataProvided => "ingress-data-provided",
            Trigger::CredentialRelationChanged => "credential-relation-changed",
            Trigger::CredentialRelationBroken(_) => "credential-relation-broken",
            Trigger::Resync => "resync",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
