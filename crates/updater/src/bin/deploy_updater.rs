//! deploy-updater - applies image rollouts from an SQS queue to Kubernetes.
//!
//! # Environment Variables
//!
//! - `QUEUE_NAME` - queue to consume (or pass `-q`)
//! - `UPDATE_STRATEGY` - `spec`, `patch` or `release`
//! - `RUST_LOG` - log filter (default `info,updater=debug`)
//!
//! AWS credentials and the kubeconfig are taken from their usual ambient
//! sources.
//!
//! # Examples
//!
//! ```bash
//! # Read/modify/write Deployments, hide received messages for 30s
//! deploy-updater -q rollouts -t 30
//!
//! # Upgrade Helm releases from a chart repository
//! deploy-updater -q rollouts --strategy release --chart charts/web
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use updater::cluster::{HelmCli, KubeDeployments};
use updater::queue::SqsQueue;
use updater::{build_updater, run_updater, MessageQueue, UpdaterArgs};

/// Apply container image rollouts from a work queue
#[derive(Parser)]
#[command(name = "deploy-updater")]
#[command(about = "Apply container image rollouts from a work queue")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    updater: UpdaterArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,updater=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.updater.into_config()?;

    info!(
        queue = %config.queue_name,
        region = %config.region,
        strategy = %config.strategy,
        visibility_timeout = config.visibility_timeout,
        on_write_failure = ?config.on_write_failure,
        "Starting deploy-updater"
    );

    let queue = Arc::new(SqsQueue::connect(&config.region).await);
    let queue_url = queue
        .resolve_url(&config.queue_name)
        .await
        .with_context(|| format!("Failed to resolve queue '{}'", config.queue_name))?;

    let updater = build_updater(
        &config,
        Arc::new(KubeDeployments::new()),
        Arc::new(HelmCli::new()),
    );

    run_updater(queue, queue_url, updater, &config)
        .await
        .context("Dispatcher stopped")?;

    Ok(())
}
