//! Network module with deferred startup lifecycle.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves. The
//! split lets the caller learn the bound port (and wire the shutdown
//! controller into background tasks) before traffic flows.

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    create_file_handler, create_object_handler, delete_file_handler, delete_object_handler,
    favicon_handler, get_object_handler, get_objects_handler, healthcheck_handler,
    rename_file_handler, search_objects_handler, update_file_handler, update_object_handler,
    version_handler, AppState,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::service::ObjectGateway;

/// Owns the HTTP listener and the state shared with every handler.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, gateway: ObjectGateway) -> Self {
        Self {
            config,
            listener: None,
            state: AppState {
                gateway,
                shutdown: Arc::new(ShutdownController::new()),
            },
        }
    }

    /// Shared shutdown controller, for signal handlers and background tasks.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the router with every route and middleware layer.
    pub fn build_router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 asks the OS to pick.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then waits for admitted
    /// requests to finish (bounded by the configured drain timeout).
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, if TLS material
    /// cannot be loaded, or on a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let shutdown_ctrl = Arc::clone(&self.state.shutdown);
        let router = build_router(&self.config, self.state);

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = self.config.tls {
            serve_tls(listener, router, tls_config, shutdown).await?;
        } else {
            serve_plain(listener, router, shutdown).await?;
        }

        drain_requests(&shutdown_ctrl, &self.config).await;
        Ok(())
    }
}

/// Routes, outermost middleware last.
///
/// Static segments take priority over captures, so `/{ns}/search` never
/// reaches the update handler and `/healthcheck` never reads as a namespace.
fn build_router(config: &NetworkConfig, state: AppState) -> Router {
    let in_flight = axum::middleware::from_fn_with_state(
        Arc::clone(&state.shutdown),
        track_in_flight,
    );

    Router::new()
        .route("/", get(version_handler))
        .route("/version", get(version_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route("/healthcheck", get(healthcheck_handler))
        .route("/{ns}", put(get_objects_handler).post(create_object_handler))
        .route("/{ns}/search", put(search_objects_handler))
        .route(
            "/{ns}/{id}",
            get(get_object_handler)
                .put(update_object_handler)
                .delete(delete_object_handler),
        )
        .route(
            "/{ns}/{id}/file",
            post(create_file_handler).put(update_file_handler),
        )
        .route("/{ns}/{id}/file/{name}", delete(delete_file_handler))
        .route("/{ns}/{id}/file/{name}/rename", post(rename_file_handler))
        .layer(in_flight)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(build_http_layers(config))
        .with_state(state)
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving plain HTTP connections");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls, reusing the
/// pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

/// Moves to `Draining` (if the shutdown future did not already) and waits
/// for admitted requests.
async fn drain_requests(shutdown_ctrl: &ShutdownController, config: &NetworkConfig) {
    shutdown_ctrl.trigger_shutdown();

    let in_flight = shutdown_ctrl.in_flight_count();
    if in_flight > 0 {
        info!("Draining {} in-flight requests", in_flight);
    }

    if shutdown_ctrl.wait_for_drain(config.drain_timeout).await {
        info!("All requests drained");
    } else {
        warn!("Drain timeout expired with in-flight requests remaining");
    }
}
