//! # Reconcile
//!
//! Executes a [`Plan`] against the stores. All decisions are made by
//! [`plan`]; this module only applies steps in order and reports.

use crate::controller::reconciler::plan::{plan, Plan, Step};
use crate::controller::reconciler::snapshot::Snapshot;
use crate::controller::reconciler::types::{Outcome, ReconcilerError, Trigger};
use crate::observability::metrics;
use crate::provider::{Channel, RelationStore, SecretStore};
use crate::relation::{CredentialDistributor, IngressPublisher, RouteAnnouncer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone)]
pub struct Reconciler {
    distributor: CredentialDistributor,
    announcer: RouteAnnouncer,
    publisher: IngressPublisher,
}

impl Reconciler {
    pub fn new(secrets: Arc<dyn SecretStore>, relations: Arc<dyn RelationStore>) -> Self {
        Self {
            distributor: CredentialDistributor::new(secrets, Arc::clone(&relations)),
            announcer: RouteAnnouncer::new(Arc::clone(&relations)),
            publisher: IngressPublisher::new(relations),
        }
    }

    /// Run one reconciliation pass to completion
    pub async fn reconcile(
        &self,
        trigger: &Trigger,
        snapshot: &Snapshot,
    ) -> Result<Outcome, ReconcilerError> {
        let credential_channel = snapshot.credential_channel.as_ref().map(ToString::to_string);
        let ingress_channel = snapshot.ingress_channel.as_ref().map(ToString::to_string);
        let span = info_span!(
            "reconcile",
            trigger = trigger.as_str(),
            authority = snapshot.has_authority,
            credential_channel = credential_channel.as_deref(),
            ingress_channel = ingress_channel.as_deref(),
        );

        async move {
            let start = Instant::now();
            metrics::increment_reconciliations();

            let Plan { outcome, steps } = plan(snapshot);
            for step in &steps {
                self.apply(step).await?;
            }

            metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
            metrics::increment_outcome(outcome.name());
            match &outcome {
                Outcome::Active => info!("Reconciled: active ({} steps)", steps.len()),
                hold => warn!("Reconciled: {} ({} steps)", hold, steps.len()),
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn apply(&self, step: &Step) -> Result<(), ReconcilerError> {
        debug!("Applying {} on {}", step.name(), step.channel());
        match step {
            Step::PublishCredential { channel, token } => {
                self.distributor.publish(channel, token).await?;
            }
            Step::AnnounceNameserver {
                channel,
                nameserver,
            } => {
                self.announcer
                    .set_or_clear(channel, nameserver.as_deref())
                    .await?;
            }
            Step::RevokeCredential { channel } => self.distributor.revoke(channel).await?,
            Step::PublishIngress { channel, url } => self.publisher.publish(channel, url).await?,
            Step::RetractIngress { channel } => self.publisher.retract(channel).await?,
        }
        Ok(())
    }

    /// Withdraw the credential from a channel that is being torn down
    ///
    /// Runs regardless of the remaining state; the following pass reports
    /// the missing channel.
    pub async fn on_credential_relation_broken(
        &self,
        channel: &Channel,
    ) -> Result<(), ReconcilerError> {
        info!("Credential relation {} broken, revoking its secret", channel);
        self.distributor.revoke(channel).await?;
        Ok(())
    }
}
