//! Common test utilities for the reconciliation tests
//!
//! Builds in-memory stores, relations, and operator secrets the way a
//! deployed unit would see them.

#![allow(dead_code, reason = "not every test binary uses every fixture")]

use cloudflare_configurator::prelude::*;
use std::sync::Arc;

pub const ROUTE_ID: u64 = 1;
pub const INGRESS_ID: u64 = 2;
pub const OPERATOR_SECRET: &str = "secret:operator-token";

/// Stores plus a reconciler wired to them
pub struct Harness {
    pub secrets: MemorySecretStore,
    pub relations: MemoryRelationStore,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let secrets = MemorySecretStore::new();
        let relations = MemoryRelationStore::new();
        let reconciler = Reconciler::new(
            Arc::new(secrets.clone()) as Arc<dyn SecretStore>,
            Arc::new(relations.clone()) as Arc<dyn RelationStore>,
        );
        Self {
            secrets,
            relations,
            reconciler,
        }
    }

    pub fn distributor(&self) -> CredentialDistributor {
        CredentialDistributor::new(
            Arc::new(self.secrets.clone()),
            Arc::new(self.relations.clone()),
        )
    }

    pub fn announcer(&self) -> RouteAnnouncer {
        RouteAnnouncer::new(Arc::new(self.relations.clone()))
    }

    pub fn publisher(&self) -> IngressPublisher {
        IngressPublisher::new(Arc::new(self.relations.clone()))
    }

    /// Consumer view of what this side published
    pub fn requirer(&self) -> CloudflaredRouteRequirer {
        CloudflaredRouteRequirer::new(
            Arc::new(self.secrets.clone()),
            Arc::new(self.relations.clone()),
        )
        .reading(Side::Local)
    }

    pub async fn add_route(&self) -> Channel {
        self.relations
            .add_relation(RelationRecord::new(ROUTE_ID, "cloudflared-route", "cloudflared"))
            .await
    }

    pub async fn add_ingress(&self) -> Channel {
        self.relations
            .add_relation(ingress_record())
            .await
    }

    /// Store an operator secret holding `payload` under [`OPERATOR_SECRET`]
    pub async fn operator_secret(&self, payload: &[(&str, &str)]) -> SecretHandle {
        let handle = SecretHandle::new(OPERATOR_SECRET);
        let payload: Payload = payload
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.secrets
            .insert(handle.clone(), SecretRecord::with_content(payload))
            .await;
        handle
    }

    pub async fn snapshot(&self, config: &UnitConfig, leader: bool) -> Snapshot {
        Snapshot::observe(
            config,
            leader,
            &RelationNames::default(),
            &self.secrets,
            &self.relations,
        )
        .await
        .expect("snapshot")
    }

    pub async fn reconcile(&self, config: &UnitConfig, leader: bool) -> Outcome {
        let snapshot = self.snapshot(config, leader).await;
        self.reconciler
            .reconcile(&Trigger::ConfigChanged, &snapshot)
            .await
            .expect("reconcile")
    }

    /// Local bag of a relation
    pub async fn local_data(&self, id: u64) -> std::collections::BTreeMap<String, String> {
        self.relations
            .bag(ChannelId(id), &Side::Local)
            .await
            .expect("relation exists")
    }
}

pub fn ingress_record() -> RelationRecord {
    RelationRecord::new(INGRESS_ID, "ingress", "requirer")
        .with_remote_app_data("name", "\"requirer\"")
        .with_remote_app_data("model", "\"test-model\"")
        .with_remote_app_data("port", "8080")
        .with_remote_unit_data("requirer/1", "host", "\"requirer-1.local\"")
        .with_remote_unit_data("requirer/0", "host", "\"requirer-0.local\"")
        .with_remote_unit_data("requirer/0", "ip", "\"10.1.2.3\"")
}

pub fn unit_config(domain: Option<&str>, tunnel_token: Option<&SecretHandle>) -> UnitConfig {
    UnitConfig {
        domain: domain.map(str::to_string),
        tunnel_token: tunnel_token.cloned(),
        nameserver: None,
    }
}
