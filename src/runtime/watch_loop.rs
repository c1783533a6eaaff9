//! # Watch Loop
//!
//! Serializes triggers into reconciliation passes. Producers (initial pass,
//! resync timer, state file poller) push into a bounded queue; a single
//! consumer runs one pass per trigger, in arrival order, to completion.
//! The loop stops when the shutdown channel flips to `true`.

use crate::config::ConfiguratorConfig;
use crate::constants::TRIGGER_QUEUE_CAPACITY;
use crate::controller::reconciler::Trigger;
use crate::observability::metrics;
use crate::runtime::pass::run_pass;
use crate::server::ServerState;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Modification time the poller treats as already seen
type KnownModified = Arc<Mutex<Option<SystemTime>>>;

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .ok()
}

/// Install the SIGINT/SIGTERM handler once and report it on a watch channel
///
/// The flag stays `true` after the signal, so a signal that lands while a
/// pass is running is seen when the loop next checks.
pub fn spawn_shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), stopping watch loop");
        let _ = tx.send(true);
    });
    rx
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn spawn_resync_timer(config: &ConfiguratorConfig, tx: mpsc::Sender<Trigger>) -> JoinHandle<()> {
    let period = config.resync_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; the initial pass covers it
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(Trigger::Resync).await.is_err() {
                break;
            }
        }
    })
}

fn spawn_state_poller(
    config: &ConfiguratorConfig,
    state_file: PathBuf,
    known: KnownModified,
    tx: mpsc::Sender<Trigger>,
) -> JoinHandle<()> {
    let period = config.state_poll_interval();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            // Lock before reading so a pass's own save is already recorded
            let mut known = known.lock().await;
            let current = modified(&state_file).await;
            if current.is_some() && current != *known {
                debug!("State file {} changed", state_file.display());
                *known = current;
                drop(known);
                if tx.send(Trigger::ConfigChanged).await.is_err() {
                    break;
                }
            }
        }
    })
}

/// Run passes until `shutdown` turns `true`
///
/// Pass failures are logged and the loop continues with the next trigger.
pub async fn run_watch_loop(
    config: Arc<ConfiguratorConfig>,
    server_state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let state_file = config.state_file.clone();
    info!("Starting watch loop on {}", state_file.display());

    let (tx, mut rx) = mpsc::channel::<Trigger>(TRIGGER_QUEUE_CAPACITY);
    let known: KnownModified = Arc::new(Mutex::new(modified(&state_file).await));

    tx.send(Trigger::ConfigChanged).await?;
    let timer = spawn_resync_timer(&config, tx.clone());
    let poller = spawn_state_poller(&config, state_file.clone(), Arc::clone(&known), tx);

    loop {
        let trigger = tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => {
                info!("Shutdown requested, exiting watch loop");
                break;
            }
            trigger = rx.recv() => match trigger {
                Some(trigger) => trigger,
                None => break,
            },
        };

        metrics::increment_trigger(trigger.as_str());
        // Hold the poller off while this pass rewrites the state file
        let mut known_guard = known.lock().await;
        match run_pass(&state_file, &trigger, &config).await {
            Ok(outcome) => server_state.record_outcome(outcome).await,
            Err(e) => {
                error!("Pass for {} failed: {:#}", trigger, e);
                server_state.record_failure();
            }
        }
        *known_guard = modified(&state_file).await;
        drop(known_guard);
    }

    server_state.mark_not_ready();
    timer.abort();
    poller.abort();
    if !rx.is_empty() {
        warn!("Dropping {} queued triggers on shutdown", rx.len());
    }
    Ok(())
}
