//! # Pass
//!
//! One reconciliation pass over the state file: load, observe, reconcile,
//! capture, record status, save.

use crate::config::ConfiguratorConfig;
use crate::controller::dns::resolve_cluster_dns;
use crate::controller::reconciler::{Outcome, Reconciler, Snapshot, Trigger};
use crate::provider::{ModelState, RelationStore, SecretStore, StatusRecord};
use crate::relation::ingress_data_action;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Handle `trigger` against an in-memory copy of `state`
///
/// Returns the updated state, status recorded, together with the outcome.
pub async fn handle_trigger(
    mut state: ModelState,
    trigger: &Trigger,
    config: &ConfiguratorConfig,
) -> Result<(ModelState, Outcome)> {
    let span = info_span!("pass", trigger = trigger.as_str());
    async move {
        let (secrets, relations) = state.stores();
        let reconciler = Reconciler::new(
            Arc::new(secrets.clone()) as Arc<dyn SecretStore>,
            Arc::new(relations.clone()) as Arc<dyn RelationStore>,
        );

        if let Trigger::CredentialRelationBroken(channel) = trigger {
            if state.leader {
                reconciler
                    .on_credential_relation_broken(channel)
                    .await
                    .with_context(|| format!("Failed to revoke credential on {channel}"))?;
            }
            if relations.remove_relation(channel.id).await.is_none() {
                debug!("Relation {} was already gone", channel);
            }
        }

        let mut snapshot = Snapshot::observe(
            &state.config,
            state.leader,
            &config.relations,
            &secrets,
            &relations,
        )
        .await
        .context("Failed to observe snapshot")?;
        if snapshot.nameserver.is_none() {
            if let Some(host) = config.dns_fallback_host() {
                snapshot = snapshot.with_nameserver_fallback(resolve_cluster_dns(host).await);
            }
        }

        let outcome = reconciler
            .reconcile(trigger, &snapshot)
            .await
            .context("Reconciliation failed")?;

        state.capture(&secrets, &relations).await;
        state.status = Some(StatusRecord {
            status: outcome.name().to_string(),
            message: outcome.message().to_string(),
            last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        });
        Ok((state, outcome))
    }
    .instrument(span)
    .await
}

/// Load the state file, handle `trigger`, and save the result
pub async fn run_pass(
    state_file: &Path,
    trigger: &Trigger,
    config: &ConfiguratorConfig,
) -> Result<Outcome> {
    let state = ModelState::load(state_file).await?;
    let (state, outcome) = handle_trigger(state, trigger, config).await?;
    state.save(state_file).await?;
    info!(
        "Pass for {} finished: {} (state saved to {})",
        trigger,
        outcome,
        state_file.display()
    );
    Ok(outcome)
}

/// Run the `get-ingress-data` action against the state file
pub async fn get_ingress_data(
    state_file: &Path,
    config: &ConfiguratorConfig,
) -> Result<BTreeMap<String, String>> {
    let state = ModelState::load(state_file).await?;
    let (_, relations) = state.stores();
    Ok(ingress_data_action(&relations, &config.relations.ingress).await?)
}
