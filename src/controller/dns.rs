//! # Cluster DNS
//!
//! Fallback resolver hint: the address of the cluster DNS service.

use tokio::net::lookup_host;
use tracing::{debug, warn};

/// First address `host` resolves to, or `None` when resolution fails
pub async fn resolve_cluster_dns(host: &str) -> Option<String> {
    match lookup_host((host, 53)).await {
        Ok(mut addrs) => {
            let addr = addrs.next().map(|addr| addr.ip().to_string());
            debug!("Cluster DNS {} resolved to {:?}", host, addr);
            addr
        }
        Err(e) => {
            warn!("Failed to resolve cluster DNS {}: {}", host, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_literal_resolves_to_itself() {
        assert_eq!(
            resolve_cluster_dns("127.0.0.1").await.as_deref(),
            Some("127.0.0.1")
        );
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_none() {
        assert_eq!(resolve_cluster_dns("host.invalid.").await, None);
    }
}
