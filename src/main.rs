//! cluster-dispatch
//!
//! Runs a health-monitored pool of TCP nodes and serves its diagnostics.
//!
//! ```text
//!   config.toml ──▶ FailoverCluster ──▶ WeightedSelector (in rotation)
//!                        │
//!                        ├── HealthMonitor ──▶ TcpProber (periodic connect)
//!                        │
//!                        └── admin router: /admin/status, /admin/nodes
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use cluster_dispatch::admin::setup_admin_router;
use cluster_dispatch::config::loader::load_config;
use cluster_dispatch::config::{FailoverConfig, NodeConfig};
use cluster_dispatch::lifecycle::Shutdown;
use cluster_dispatch::net::{TcpNode, TcpProber};
use cluster_dispatch::observability::{logging, metrics};
use cluster_dispatch::{ClusterNode, FailoverCluster};

#[derive(Parser)]
#[command(name = "cluster-dispatch")]
#[command(about = "Health-monitored failover pool of TCP nodes", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FailoverConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cluster-dispatch starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut nodes = Vec::with_capacity(config.nodes.len());
    for node in &config.nodes {
        match resolve(node).await {
            Some(entry) => nodes.push(entry),
            None => tracing::warn!(
                node = %node.name,
                address = %node.address,
                "Skipping node with unresolvable address"
            ),
        }
    }

    if nodes.is_empty() {
        tracing::warn!("No nodes configured; every dispatch will fail");
    }

    let cluster = Arc::new(FailoverCluster::from_config(&config, nodes, TcpProber));
    cluster.start();

    let shutdown = Shutdown::new();
    let mut signal = shutdown.subscribe();

    let admin = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin endpoint listening");

        let router = setup_admin_router(cluster.clone());
        let mut admin_signal = shutdown.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { admin_signal.recv().await })
                .await
        }))
    } else {
        None
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
        _ = signal.recv() => {}
    }
    shutdown.trigger();

    if let Some(handle) = admin {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin server failed"),
            Err(e) => tracing::error!(error = %e, "Admin server task failed"),
        }
    }

    cluster.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn resolve(node: &NodeConfig) -> Option<ClusterNode<TcpNode>> {
    let addr = tokio::net::lookup_host(&node.address).await.ok()?.next()?;
    Some(
        ClusterNode::new(TcpNode::new(&node.name, addr))
            .weight(node.weight)
            .internal(node.internal),
    )
}
