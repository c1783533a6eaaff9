//! # Unit Configuration
//!
//! Operator-facing options the reconciler converges on.

use crate::provider::SecretHandle;
use serde::{Deserialize, Serialize};

/// Unit configuration as set by the operator
///
/// Empty strings are treated the same as unset options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnitConfig {
    /// Public domain served through the tunnel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Handle of the secret holding the tunnel token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_token: Option<SecretHandle>,
    /// Resolver address handed to cloudflared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameserver: Option<String>,
}

impl UnitConfig {
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        non_empty(self.domain.as_deref())
    }

    #[must_use]
    pub fn tunnel_token(&self) -> Option<&SecretHandle> {
        self.tunnel_token
            .as_ref()
            .filter(|handle| !handle.as_str().trim().is_empty())
    }

    #[must_use]
    pub fn nameserver(&self) -> Option<&str> {
        non_empty(self.nameserver.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
