//! # Reconciler Integration Tests
//!
//! Full passes against the in-memory stores:
//! - Convergence, token rotation, and idempotence
//! - Authority loss leaves every channel untouched
//! - Every non-active outcome withdraws what was published
//! - Credential relation teardown
//! - The reconcile span names its trigger

mod common;

use cloudflare_configurator::constants::{NAMESERVER_FIELD, TUNNEL_TOKEN_SECRET_ID_FIELD};
use cloudflare_configurator::prelude::*;
use common::{unit_config, Harness, INGRESS_ID, ROUTE_ID};
use std::io::Write;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_complete_configuration_publishes_credential() {
    let harness = Harness::new();
    let route = harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;

    let outcome = harness
        .reconcile(&unit_config(Some("example.com"), Some(&handle)), true)
        .await;

    assert_eq!(outcome, Outcome::Active);
    let data = harness.local_data(ROUTE_ID).await;
    let published = SecretHandle::new(&data[TUNNEL_TOKEN_SECRET_ID_FIELD]);
    assert_ne!(published, handle, "the operator secret is never shared directly");

    let token = harness.requirer().tunnel_token(&route).await.unwrap();
    assert_eq!(token.as_ref().map(TunnelToken::expose), Some("foobar"));
    let record = harness.secrets.record(&published).await.unwrap();
    assert!(record.grants.contains("cloudflared"));
}

#[tokio::test]
async fn test_no_authority_leaves_channels_empty() {
    let harness = Harness::new();
    harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;

    let outcome = harness
        .reconcile(&unit_config(Some("example.com"), Some(&handle)), false)
        .await;

    assert!(matches!(outcome, Outcome::Blocked(ref m) if m.starts_with("not sole authority")));
    assert!(harness.local_data(ROUTE_ID).await.is_empty());
    assert_eq!(harness.secrets.mutation_count(), 0);
}

#[tokio::test]
async fn test_authority_loss_does_not_touch_published_state() {
    let harness = Harness::new();
    harness.add_route().await;
    harness.add_ingress().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let config = unit_config(Some("example.com"), Some(&handle));
    assert_eq!(harness.reconcile(&config, true).await, Outcome::Active);

    let relations_before = harness.relations.records().await;
    let secrets_before = harness.secrets.records().await;
    let mutations_before = harness.secrets.mutation_count();

    for config in [
        config.clone(),
        unit_config(None, Some(&handle)),
        unit_config(Some("example.com"), None),
        unit_config(None, None),
    ] {
        let outcome = harness.reconcile(&config, false).await;
        assert!(matches!(outcome, Outcome::Blocked(_)));
    }

    assert_eq!(harness.relations.records().await, relations_before);
    assert_eq!(harness.secrets.records().await, secrets_before);
    assert_eq!(harness.secrets.mutation_count(), mutations_before);
}

#[tokio::test]
async fn test_missing_domain_revokes_previous_credential() {
    let harness = Harness::new();
    let route = harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    assert_eq!(
        harness
            .reconcile(&unit_config(Some("example.com"), Some(&handle)), true)
            .await,
        Outcome::Active
    );
    let published = SecretHandle::new(&harness.local_data(ROUTE_ID).await[TUNNEL_TOKEN_SECRET_ID_FIELD]);

    let outcome = harness
        .reconcile(&unit_config(None, Some(&handle)), true)
        .await;

    assert_eq!(
        outcome,
        Outcome::Blocked("waiting for domain configuration".to_string())
    );
    assert!(harness.local_data(ROUTE_ID).await.is_empty());
    assert!(harness.secrets.is_revoked(&published).await);
    assert!(harness.requirer().tunnel_token(&route).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_credential_blocks_and_cleans_up() {
    let harness = Harness::new();
    harness.add_route().await;
    harness.add_ingress().await;
    let valid = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    assert_eq!(
        harness
            .reconcile(&unit_config(Some("example.com"), Some(&valid)), true)
            .await,
        Outcome::Active
    );

    let broken = SecretHandle::new("secret:broken");
    harness
        .secrets
        .insert(
            broken.clone(),
            SecretRecord::with_content(Payload::from([("token".to_string(), "x".to_string())])),
        )
        .await;
    let outcome = harness
        .reconcile(&unit_config(Some("example.com"), Some(&broken)), true)
        .await;

    assert_eq!(
        outcome,
        Outcome::Blocked(
            "invalid credential configuration: missing 'tunnel-token' in secret: secret:broken"
                .to_string()
        )
    );
    assert!(harness.local_data(ROUTE_ID).await.is_empty());
    assert!(harness.local_data(INGRESS_ID).await.is_empty());
}

#[tokio::test]
async fn test_unknown_credential_handle_blocks() {
    let harness = Harness::new();
    harness.add_route().await;
    let outcome = harness
        .reconcile(
            &unit_config(Some("example.com"), Some(&SecretHandle::new("secret:gone"))),
            true,
        )
        .await;
    assert_eq!(
        outcome,
        Outcome::Blocked("invalid credential configuration: secret not found: secret:gone".to_string())
    );
}

#[tokio::test]
async fn test_missing_channel_waits_and_retracts_ingress() {
    let harness = Harness::new();
    let route = harness.add_route().await;
    harness.add_ingress().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let config = unit_config(Some("example.com"), Some(&handle));
    assert_eq!(harness.reconcile(&config, true).await, Outcome::Active);
    assert!(!harness.local_data(INGRESS_ID).await.is_empty());

    harness.relations.remove_relation(route.id).await;
    let outcome = harness.reconcile(&config, true).await;

    assert_eq!(
        outcome,
        Outcome::Waiting("waiting for cloudflared-route integration".to_string())
    );
    assert!(harness.local_data(INGRESS_ID).await.is_empty());
}

#[tokio::test]
async fn test_without_ingress_channel_only_credential_is_published() {
    let harness = Harness::new();
    harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;

    let outcome = harness
        .reconcile(&unit_config(Some("example.com"), Some(&handle)), true)
        .await;

    assert_eq!(outcome, Outcome::Active);
    assert!(harness
        .local_data(ROUTE_ID)
        .await
        .contains_key(TUNNEL_TOKEN_SECRET_ID_FIELD));
    assert!(harness.relations.list_relations("ingress").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ingress_url_is_published() {
    let harness = Harness::new();
    harness.add_route().await;
    let ingress = harness.add_ingress().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;

    harness
        .reconcile(&unit_config(Some("example.com"), Some(&handle)), true)
        .await;

    let url = harness.publisher().published_url(&ingress).await.unwrap();
    assert_eq!(url.as_deref(), Some("https://example.com/"));
}

#[tokio::test]
async fn test_second_pass_performs_no_secret_mutations() {
    let harness = Harness::new();
    harness.add_route().await;
    harness.add_ingress().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let config = unit_config(Some("example.com"), Some(&handle));

    assert_eq!(harness.reconcile(&config, true).await, Outcome::Active);
    let relations_after_first = harness.relations.records().await;
    let mutations_after_first = harness.secrets.mutation_count();

    assert_eq!(harness.reconcile(&config, true).await, Outcome::Active);
    assert_eq!(harness.secrets.mutation_count(), mutations_after_first);
    assert_eq!(harness.relations.records().await, relations_after_first);
}

#[tokio::test]
async fn test_token_rotation_updates_in_place() {
    let harness = Harness::new();
    let route = harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let config = unit_config(Some("example.com"), Some(&handle));
    harness.reconcile(&config, true).await;
    let published = harness.local_data(ROUTE_ID).await[TUNNEL_TOKEN_SECRET_ID_FIELD].clone();

    harness
        .secrets
        .update(
            &handle,
            Payload::from([("tunnel-token".to_string(), "rotated".to_string())]),
        )
        .await
        .unwrap();
    assert_eq!(harness.reconcile(&config, true).await, Outcome::Active);

    assert_eq!(
        harness.local_data(ROUTE_ID).await[TUNNEL_TOKEN_SECRET_ID_FIELD],
        published
    );
    let token = harness.requirer().tunnel_token(&route).await.unwrap().unwrap();
    assert_eq!(token.expose(), "rotated");
}

#[tokio::test]
async fn test_nameserver_is_announced_and_cleared() {
    let harness = Harness::new();
    harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let mut config = unit_config(Some("example.com"), Some(&handle));
    config.nameserver = Some("10.152.183.10".to_string());

    harness.reconcile(&config, true).await;
    assert_eq!(
        harness.local_data(ROUTE_ID).await[NAMESERVER_FIELD],
        "10.152.183.10"
    );

    config.nameserver = Some(String::new());
    harness.reconcile(&config, true).await;
    assert!(!harness
        .local_data(ROUTE_ID)
        .await
        .contains_key(NAMESERVER_FIELD));
}

#[tokio::test]
async fn test_cleanup_on_empty_state_is_harmless() {
    let harness = Harness::new();
    harness.add_route().await;
    harness.add_ingress().await;

    let outcome = harness.reconcile(&unit_config(None, None), true).await;

    assert_eq!(
        outcome,
        Outcome::Blocked("waiting for domain, tunnel-token configuration".to_string())
    );
    assert!(harness.local_data(ROUTE_ID).await.is_empty());
    assert_eq!(harness.secrets.mutation_count(), 0);
}

#[tokio::test]
async fn test_relation_broken_revokes_credential() {
    let harness = Harness::new();
    let route = harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let config = unit_config(Some("example.com"), Some(&handle));
    harness.reconcile(&config, true).await;
    let published = SecretHandle::new(&harness.local_data(ROUTE_ID).await[TUNNEL_TOKEN_SECRET_ID_FIELD]);

    harness
        .reconciler
        .on_credential_relation_broken(&route)
        .await
        .unwrap();
    harness.relations.remove_relation(route.id).await;

    assert!(harness.secrets.is_revoked(&published).await);
    assert!(matches!(
        harness.reconcile(&config, true).await,
        Outcome::Waiting(_)
    ));
}

/// Formatted log output shared with a test subscriber
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_reconcile_span_carries_trigger() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let harness = Harness::new();
    harness.add_route().await;
    let handle = harness.operator_secret(&[("tunnel-token", "foobar")]).await;
    let snapshot = harness
        .snapshot(&unit_config(Some("example.com"), Some(&handle)), true)
        .await;
    harness
        .reconciler
        .reconcile(&Trigger::Resync, &snapshot)
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("reconcile{trigger=\"resync\""), "{output}");
    assert!(!output.contains("foobar"), "tokens never reach the log");
}
