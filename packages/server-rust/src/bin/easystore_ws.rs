//! `easystore-ws`: the EasyStore web service.
//!
//! Usage:
//!   ES_SERVICE_PORT=8080 easystore-ws
//!
//! Serves the object API over HTTP until Ctrl-C or SIGTERM, then stops
//! accepting requests and drains the ones in flight.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use easystore_server::cli::{init_tracing, Args};
use easystore_server::network::NetworkModule;
use easystore_server::service::{LockRegistry, ObjectGateway};
use easystore_server::storage::MemoryStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!("[SERVICE] easystore-ws {} starting up", env!("CARGO_PKG_VERSION"));
    args.log_summary();

    let service_config = args.service_config();
    let store = Arc::new(MemoryStore::with_step_latency(args.backend_latency()));
    let locks = Arc::new(LockRegistry::with_timeout(service_config.lock_timeout));
    let gateway = ObjectGateway::new(store, Arc::clone(&locks));

    let mut module = NetworkModule::new(args.network_config(), gateway);
    let shutdown = module.shutdown_controller();
    let sweeper = locks.spawn_sweeper(
        service_config.lock_sweep_interval,
        service_config.lock_idle_ttl,
        shutdown.shutdown_receiver(),
    );

    let port = module.start().await?;
    info!(port, "[SERVICE] listening");

    let signal_ctrl = Arc::clone(&shutdown);
    module
        .serve(async move {
            shutdown_signal().await;
            info!("[SERVICE] shutdown requested");
            signal_ctrl.trigger_shutdown();
        })
        .await?;

    sweeper.await?;
    info!("[SERVICE] stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("unable to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("unable to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
