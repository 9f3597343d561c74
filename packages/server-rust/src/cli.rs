//! Command-line and environment configuration for the `easystore-ws` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::network::{NetworkConfig, TlsConfig};
use crate::service::ServiceConfig;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Every setting can come from a flag or its `ES_*` environment variable.
#[derive(Debug, Parser)]
#[command(
    name = "easystore-ws",
    about = "EasyStore web service: per-object serialized access to an object store",
    version
)]
pub struct Args {
    /// Bind address
    #[arg(long, env = "ES_SERVICE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port
    #[arg(long, env = "ES_SERVICE_PORT")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[arg(long, env = "ES_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Comma-separated allowed CORS origins, `*` for any
    #[arg(long, env = "ES_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Maximum wait for an object lock in milliseconds, 0 waits forever
    #[arg(long, env = "ES_LOCK_TIMEOUT_MS", default_value_t = 0)]
    pub lock_timeout_ms: u64,

    /// Idle seconds before an unheld object lock is evicted
    #[arg(long, env = "ES_LOCK_IDLE_SECS", default_value_t = 300)]
    pub lock_idle_secs: u64,

    /// Seconds between lock eviction sweeps
    #[arg(
        long,
        env = "ES_LOCK_SWEEP_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub lock_sweep_secs: u64,

    /// Artificial delay per backend write step in milliseconds
    #[arg(long, env = "ES_BACKEND_LATENCY_MS", default_value_t = 0)]
    pub backend_latency_ms: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "ES_MAX_BODY_BYTES", default_value_t = 64 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Seconds shutdown waits for in-flight requests
    #[arg(long, env = "ES_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,

    /// PEM certificate chain; enables TLS together with `--tls-key`
    #[arg(long, env = "ES_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, env = "ES_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    #[arg(long, env = "ES_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }

    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            lock_timeout: (self.lock_timeout_ms > 0)
                .then(|| Duration::from_millis(self.lock_timeout_ms)),
            lock_idle_ttl: Duration::from_secs(self.lock_idle_secs),
            lock_sweep_interval: Duration::from_secs(self.lock_sweep_secs),
        }
    }

    #[must_use]
    pub fn backend_latency(&self) -> Duration {
        Duration::from_millis(self.backend_latency_ms)
    }

    /// Logs the effective configuration. Key material paths are masked.
    pub fn log_summary(&self) {
        info!("[CONFIG] host                = [{}]", self.host);
        info!("[CONFIG] port                = [{}]", self.port);
        info!("[CONFIG] request timeout     = [{}s]", self.request_timeout_secs);
        info!("[CONFIG] cors origins        = [{}]", self.cors_origins.join(","));
        info!("[CONFIG] lock timeout        = [{}ms]", self.lock_timeout_ms);
        info!("[CONFIG] lock idle ttl       = [{}s]", self.lock_idle_secs);
        info!("[CONFIG] lock sweep interval = [{}s]", self.lock_sweep_secs);
        info!("[CONFIG] backend latency     = [{}ms]", self.backend_latency_ms);
        info!("[CONFIG] max body bytes      = [{}]", self.max_body_bytes);
        info!("[CONFIG] drain timeout       = [{}s]", self.drain_timeout_secs);
        info!(
            "[CONFIG] tls cert            = [{}]",
            self.tls_cert
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string())
        );
        info!("[CONFIG] tls key             = [{}]", mask(self.tls_key.is_some()));
        info!("[CONFIG] log format          = [{:?}]", self.log_format);
    }
}

fn mask(present: bool) -> &'static str {
    if present {
        "REDACTED"
    } else {
        "none"
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
