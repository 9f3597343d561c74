use std::time::Duration;

/// Service-level configuration for the operation gateway and lock registry.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum wait for a resource-key lock. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
    /// Idle time after which an unheld lock entry may be evicted.
    pub lock_idle_ttl: Duration,
    /// Interval between lock eviction sweeps.
    pub lock_sweep_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lock_timeout: None,
            lock_idle_ttl: Duration::from_secs(300),
            lock_sweep_interval: Duration::from_secs(60),
        }
    }
}
