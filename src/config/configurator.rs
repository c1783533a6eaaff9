//! # Configurator Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_CLOUDFLARED_ROUTE_RELATION, DEFAULT_CLUSTER_DNS_HOST, DEFAULT_INGRESS_RELATION,
    DEFAULT_METRICS_PORT, DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_STATE_FILE,
    DEFAULT_STATE_POLL_INTERVAL_MS,
};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Names of the two relations the reconciler drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationNames {
    /// Relation carrying the tunnel token secret and resolver hint
    pub credential: String,
    /// Relation the tunnel URL is published on
    pub ingress: String,
}

impl Default for RelationNames {
    fn default() -> Self {
        Self {
            credential: DEFAULT_CLOUDFLARED_ROUTE_RELATION.to_string(),
            ingress: DEFAULT_INGRESS_RELATION.to_string(),
        }
    }
}

/// Configurator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ConfiguratorConfig {
    /// State file holding unit config, secrets, and relation data
    pub state_file: PathBuf,
    /// Relation names for the credential and ingress channels
    pub relations: RelationNames,
    /// Host resolved for the resolver hint when `nameserver` is unset
    pub cluster_dns_host: String,
    /// Whether to fall back to the cluster DNS address at all
    pub cluster_dns_fallback: bool,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// HTTP port for `/metrics`, `/healthz`, `/readyz`, `/status`
    pub metrics_port: u16,
    /// Enable the HTTP server and metrics registration
    pub enable_metrics: bool,
    /// Interval between timer-based resync passes (seconds)
    pub resync_interval_secs: u64,
    /// Interval between state file modification checks (milliseconds)
    pub state_poll_interval_ms: u64,
}

impl Default for ConfiguratorConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            relations: RelationNames::default(),
            cluster_dns_host: DEFAULT_CLUSTER_DNS_HOST.to_string(),
            cluster_dns_fallback: true,
            log_level: "INFO".to_string(),
            log_format: LogFormat::Text,
            metrics_port: DEFAULT_METRICS_PORT,
            enable_metrics: true,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            state_poll_interval_ms: DEFAULT_STATE_POLL_INTERVAL_MS,
        }
    }
}

impl ConfiguratorConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            state_file: PathBuf::from(env_var_or_default_str("STATE_FILE", DEFAULT_STATE_FILE)),
            relations: RelationNames {
                credential: env_var_or_default_str(
                    "CREDENTIAL_RELATION_NAME",
                    DEFAULT_CLOUDFLARED_ROUTE_RELATION,
                ),
                ingress: env_var_or_default_str("INGRESS_RELATION_NAME", DEFAULT_INGRESS_RELATION),
            },
            cluster_dns_host: env_var_or_default_str("CLUSTER_DNS_HOST", DEFAULT_CLUSTER_DNS_HOST),
            cluster_dns_fallback: env_var_or_default_bool("CLUSTER_DNS_FALLBACK", true),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: LogFormat::parse(&env_var_or_default_str("LOG_FORMAT", "text")),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            state_poll_interval_ms: env_var_or_default(
                "STATE_POLL_INTERVAL_MS",
                DEFAULT_STATE_POLL_INTERVAL_MS,
            ),
        }
    }

    /// Get resync interval duration
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }

    /// Get state file poll interval duration
    #[must_use]
    pub fn state_poll_interval(&self) -> Duration {
        Duration::from_millis(self.state_poll_interval_ms.max(10))
    }

    /// Cluster DNS host to resolve, or `None` when the fallback is disabled
    #[must_use]
    pub fn dns_fallback_host(&self) -> Option<&str> {
        self.cluster_dns_fallback
            .then_some(self.cluster_dns_host.as_str())
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
