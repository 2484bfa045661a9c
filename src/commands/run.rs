use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;

use hsched::bus::NatsBus;
use hsched::config::Config;
use hsched::egress::Emitter;
use hsched::index::{IndexClient, IndexClientConfig};
use hsched::ingress::IngressAdapter;
use hsched::scheduler::DecisionEngine;
use hsched::{metrics, server};

/// Build the index client described by the configuration
pub fn index_client(config: &Config) -> Result<IndexClient> {
    let client_config = IndexClientConfig::new(config.index.api_uri.as_str())
        .with_timeout(config.index_timeout())
        .with_token(config.index.api_token.clone());

    IndexClient::new(client_config).context("Failed to build index client")
}

/// Consume discovered URLs and schedule them until a shutdown signal arrives
pub async fn run(config: Config) -> Result<()> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    tokio::spawn(wait_for_signal(shutdown_tx.clone()));

    let index = index_client(&config)?;
    let bus = NatsBus::connect(&config.bus)
        .await
        .context("Failed to connect to NATS")?;

    let policy = config.refresh_policy();
    let engine = DecisionEngine::new(Arc::new(index), policy);
    let emitter = Emitter::new(bus.publisher(), config.bus.outbound_subject.as_str());
    let adapter = Arc::new(IngressAdapter::new(engine, emitter));

    let ops_server = match config.server.metrics_addr {
        Some(addr) => {
            let listener = server::bind(addr).await?;
            Some(tokio::spawn(server::serve(listener, shutdown_rx.clone())))
        }
        None => None,
    };

    tracing::info!(
        nats_uri = %config.bus.nats_uri,
        api_uri = %config.index.api_uri,
        refresh_delay = %policy,
        max_in_flight = config.bus.max_in_flight,
        "Scheduler started"
    );

    let stats = bus.consume(adapter, shutdown_rx).await;

    // The consumer may also stop on its own (stream closed, setup failure)
    shutdown_tx.send_replace(true);

    if let Err(e) = bus.close().await {
        tracing::warn!(error = %e, "Failed to flush NATS connection");
    }

    if let Some(handle) = ops_server {
        match handle.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Ops server failed"),
            Err(e) => tracing::error!(error = %e, "Ops server task panicked"),
            Ok(Ok(())) => {}
        }
    }

    let stats = stats.context("Consumer stopped")?;
    tracing::info!(
        acked = stats.acked,
        nacked = stats.nacked,
        rejected = stats.rejected,
        settle_errors = stats.settle_errors,
        receive_errors = stats.receive_errors,
        "Scheduler stopped"
    );

    Ok(())
}

/// Flip the shutdown channel on Ctrl-C or SIGTERM
async fn wait_for_signal(shutdown: Arc<watch::Sender<bool>>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to wait for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight messages");
    shutdown.send_replace(true);
}
