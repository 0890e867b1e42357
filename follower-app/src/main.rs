mod cli;
mod config;
mod store;

use std::fs;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use cli::{Cli, Command};
use shard_follower_core::options::FollowerOptions;
use shard_follower_core::orchestrator::FollowerOrchestrator;
use shard_follower_gateway::GatewayClient;
use store::{FileConsumer, FileCursorStore};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn setup_logs() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_env("FOLLOWER_LOG")
                .unwrap_or_else(|_| EnvFilter::default().add_directive("info".parse().unwrap())),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logs();

    let args = Cli::parse();

    let config_path = args.config_path.as_deref().unwrap_or("default_config.json");
    let config: config::Config = {
        let file = fs::File::open(config_path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| anyhow!("cannot parse config, reason: {e}"))?
    };

    let gateway = Arc::new(
        GatewayClient::new(&config.gateway_url)
            .map_err(|err| anyhow!("invalid gateway URL: {err}"))?,
    );

    let consumer = Arc::new(FileConsumer::new(config.output_storage.clone()));
    let mut options = FollowerOptions::new(config.gateway_url.clone(), consumer);
    options.max_look_behind = config.max_look_behind;
    options.wait_for_finalized_cross_shard_scrs = config.wait_for_finalized_cross_shard_scrs;
    options.notify_empty_blocks = config.notify_empty_blocks;
    options.include_cross_shard_started_transactions = config.include_cross_shard_started_transactions;
    options.cursor_store = Arc::new(FileCursorStore::new(config.cursor_storage.path.clone()));

    let orchestrator = Arc::new(FollowerOrchestrator::new(gateway, options));

    match args.command {
        Command::RunOnce => {
            let delivered = orchestrator.run_once().await?;
            tracing::info!(delivered, "sweep complete");
        }
        Command::Run { interval_secs } => {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            let shutdown = wait_for_shutdown_signal();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::info!("shutdown signal received");
                        break;
                    }
                    _ = ticker.tick() => {
                        match orchestrator.run_once().await {
                            Ok(delivered) => tracing::debug!(delivered, "sweep complete"),
                            Err(err) => tracing::error!(err = %err, "sweep failed"),
                        }
                    }
                }
            }
        }
    }

    tracing::info!("follower-app finished");
    Ok(())
}
