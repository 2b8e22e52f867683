//! Ledger transaction relayer - sequence-coordinated submission service
//!
//! Accepts ledger operations over HTTP, signs them through the node and keeps
//! each account's sequence number consistent across concurrent submissions.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use ledger_tx_relayer::api::{self, AppState};
use ledger_tx_relayer::config::Settings;
use ledger_tx_relayer::metrics::{self, MetricsServer};
use ledger_tx_relayer::node::{LedgerNode, NodeClient};
use ledger_tx_relayer::tx::{
    InMemorySequenceCache, NodeSigner, SequenceResolver, TransactionBuilder, TransactionSubmitter,
};
use ledger_tx_relayer::TransactionFacade;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting ledger tx relayer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for node {} ({} endpoints)",
        settings.node.name,
        settings.node.rpc_urls.len()
    );

    // Node client shared by resolver, signer and submitter
    let client = Arc::new(
        NodeClient::new(settings.node.clone()).context("Failed to initialize node client")?,
    );
    let node: Arc<dyn LedgerNode> = client.clone();
    if !node.health_check().await {
        warn!("Node {} is not answering yet", settings.node.name);
    }

    let resolver = Arc::new(SequenceResolver::new(Arc::new(InMemorySequenceCache::new())));
    let submitter = TransactionSubmitter::new(
        node.clone(),
        Arc::new(NodeSigner::new(client.clone())),
        resolver,
        settings.relayer.max_retries,
    )
    .with_retry_delay(Duration::from_millis(settings.relayer.retry_delay_ms));

    let facade = Arc::new(
        TransactionFacade::new(submitter, TransactionBuilder::from_config(&settings.node))
            .with_account_serialization(settings.relayer.serialize_accounts),
    );
    info!(
        "Transaction facade initialized (retry budget {}, serialized accounts: {})",
        settings.relayer.max_retries, settings.relayer.serialize_accounts
    );

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let state = AppState::new(facade.clone(), settings.relayer.instance_id.clone());
        async move {
            if let Err(e) = api::run_server(config, state).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check loop
    let health_handle = if settings.relayer.health_check_interval_secs > 0 {
        let node = node.clone();
        let name = settings.node.name.clone();
        let interval = settings.relayer.health_check_interval_secs;
        Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;

                let healthy = node.health_check().await;
                if !healthy {
                    warn!("Node {} health check failed", name);
                }
                metrics::record_node_health(healthy);
            }
        }))
    } else {
        None
    };

    info!("Relayer {} is running", settings.relayer.instance_id);
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    for handle in [metrics_handle, health_handle].into_iter().flatten() {
        handle.abort();
    }

    info!("Relayer stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,ledger_tx_relayer=debug,hyper=warn,reqwest=warn")
    });

    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("RELAYER_LOG_JSON").is_ok() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
