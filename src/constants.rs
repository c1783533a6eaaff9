//! # Constants
//!
//! Shared constants used throughout the configurator.
//!
//! Field names in the first block are a wire-level contract with the
//! cloudflared-route consumers and must never change.

/// Key in the local application bag holding the tunnel token secret handle
pub const TUNNEL_TOKEN_SECRET_ID_FIELD: &str = "tunnel_token_secret_id";

/// Key inside the secret payload holding the tunnel token itself
pub const TUNNEL_TOKEN_SECRET_VALUE_FIELD: &str = "tunnel-token";

/// Key in the local application bag holding the resolver hint
pub const NAMESERVER_FIELD: &str = "nameserver";

/// Key in the local application bag of the ingress relation holding the published URL
pub const INGRESS_FIELD: &str = "ingress";

/// Default name of the relation carrying the tunnel token
pub const DEFAULT_CLOUDFLARED_ROUTE_RELATION: &str = "cloudflared-route";

/// Default name of the relation the tunnel URL is published on
pub const DEFAULT_INGRESS_RELATION: &str = "ingress";

/// Unit configuration option names, in declaration order
pub const CONFIG_DOMAIN: &str = "domain";
pub const CONFIG_TUNNEL_TOKEN: &str = "tunnel-token";

/// Service name resolved for the resolver hint when `nameserver` is unset
pub const DEFAULT_CLUSTER_DNS_HOST: &str = "kube-dns.kube-system.svc";

/// Default state file consumed by the CLI and the watch loop
pub const DEFAULT_STATE_FILE: &str = "state.yaml";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default interval between timer-based resync passes (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;

/// Default interval between state file modification checks (milliseconds)
pub const DEFAULT_STATE_POLL_INTERVAL_MS: u64 = 1000;

/// Capacity of the trigger queue feeding the watch loop
pub const TRIGGER_QUEUE_CAPACITY: usize = 64;
