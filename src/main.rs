//! # Cloudflare Configurator
//!
//! Hands a Cloudflare tunnel token to `cloudflared-route` consumers and
//! publishes the tunnel URL over `ingress`.
//!
//! ## Usage
//!
//! ```bash
//! # Run one reconciliation pass against the state file
//! cloudflare-configurator --state state.yaml reconcile
//!
//! # Dump the ingress requirer data
//! cloudflare-configurator --state state.yaml get-ingress-data
//!
//! # Tear down a credential relation
//! cloudflare-configurator --state state.yaml relation-broken --relation-id 1
//!
//! # Watch the state file and serve metrics and probes
//! cloudflare-configurator serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudflare_configurator::config::ConfiguratorConfig;
use cloudflare_configurator::controller::reconciler::Trigger;
use cloudflare_configurator::observability::{self, init_tracing};
use cloudflare_configurator::provider::{ChannelId, ModelState};
use cloudflare_configurator::runtime::{
    get_ingress_data, handle_trigger, run_pass, run_watch_loop, spawn_shutdown_signal,
};
use cloudflare_configurator::server::{start_server, ServerState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cloudflare-configurator")]
#[command(about = "Cloudflare tunnel configurator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// State file (overrides STATE_FILE)
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single reconciliation pass
    Reconcile {
        /// What caused the pass
        #[arg(long, value_enum, default_value_t = TriggerArg::ConfigChanged)]
        trigger: TriggerArg,
    },
    /// Print the ingress requirer data as JSON
    GetIngressData,
    /// Revoke the credential on a departing relation, then reconcile
    RelationBroken {
        /// Relation id of the departing credential relation
        #[arg(long)]
        relation_id: u64,
    },
    /// Reconcile on every state file change and on a timer
    Serve,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TriggerArg {
    ConfigChanged,
    SecretChanged,
    IngressDataProvided,
    CredentialRelationChanged,
    Resync,
}

impl From<TriggerArg> for Trigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::ConfigChanged => Trigger::ConfigChanged,
            TriggerArg::SecretChanged => Trigger::SecretChanged,
            TriggerArg::IngressDataProvided => Trigger::IngressDataProvided,
            TriggerArg::CredentialRelationChanged => Trigger::CredentialRelationChanged,
            TriggerArg::Resync => Trigger::Resync,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ConfiguratorConfig::from_env();
    if let Some(state) = cli.state {
        config.state_file = state;
    }
    init_tracing(&config)?;

    match cli.command {
        Commands::Reconcile { trigger } => {
            let outcome = run_pass(&config.state_file, &trigger.into(), &config).await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::GetIngressData => {
            let results = get_ingress_data(&config.state_file, &config).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::RelationBroken { relation_id } => {
            let state = ModelState::load(&config.state_file).await?;
            let channel = state
                .relations
                .iter()
                .find(|record| record.id == ChannelId(relation_id))
                .map(|record| record.channel())
                .with_context(|| format!("relation {relation_id} not found"))?;
            let (state, outcome) =
                handle_trigger(state, &Trigger::CredentialRelationBroken(channel), &config)
                    .await?;
            state.save(&config.state_file).await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::Serve => serve(config).await?,
    }
    Ok(())
}

async fn serve(config: ConfiguratorConfig) -> Result<()> {
    let server_state = Arc::new(ServerState::default());

    if config.enable_metrics {
        observability::register_metrics()?;
        let port = config.metrics_port;
        let state = Arc::clone(&server_state);
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    info!("Cloudflare configurator starting");
    let shutdown = spawn_shutdown_signal();
    run_watch_loop(Arc::new(config), server_state, shutdown).await
}
