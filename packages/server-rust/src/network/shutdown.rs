//! Graceful shutdown with in-flight request tracking.
//!
//! Health state lives behind an `ArcSwap` so admission checks never block.
//! Requests are counted by RAII guards handed out at admission, which
//! also refuses new work once draining has started.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Server health state.
///
/// Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Ready,
    Draining,
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Whether new requests may be admitted in this state.
    #[must_use]
    pub fn is_accepting(self) -> bool {
        matches!(self, Self::Starting | Self::Ready)
    }
}

/// Coordinates shutdown across the listener, middleware and background tasks.
///
/// 1. The in-flight middleware calls [`admit`](Self::admit) per request
/// 2. [`trigger_shutdown`](Self::trigger_shutdown) moves to `Draining` and
///    notifies every [`shutdown_receiver`](Self::shutdown_receiver)
/// 3. [`wait_for_drain`](Self::wait_for_drain) waits for admitted requests
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Receiver flipped to `true` when shutdown is triggered. The lock
    /// sweeper and the listener select on it.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Moves to `Draining` and signals all receivers. Idempotent.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
        // receivers may already be gone
        let _ = self.shutdown_signal.send(true);
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Admits a request, returning a guard that counts it as in flight
    /// until dropped. Returns `None` once draining has started.
    #[must_use]
    pub fn admit(&self) -> Option<InFlightGuard> {
        if !self.health_state().is_accepting() {
            return None;
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Some(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for in-flight requests to finish, up to `timeout`.
    ///
    /// Returns `true` and moves to `Stopped` when everything drained;
    /// returns `false` and stays `Draining` on timeout.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let controller = ShutdownController::new();
        assert_eq!(controller.health_state(), HealthState::Starting);

        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Ready);

        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Draining);
        assert_eq!(controller.health_state().as_str(), "draining");
    }

    #[test]
    fn admit_counts_until_guard_drops() {
        let controller = ShutdownController::new();
        controller.set_ready();

        let first = controller.admit().unwrap();
        let second = controller.admit().unwrap();
        assert_eq!(controller.in_flight_count(), 2);

        drop(first);
        assert_eq!(controller.in_flight_count(), 1);
        drop(second);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[test]
    fn admit_refused_while_draining() {
        let controller = ShutdownController::new();
        controller.set_ready();
        controller.trigger_shutdown();

        assert!(controller.admit().is_none());
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_receiver_notified() {
        let controller = ShutdownController::new();
        let mut rx = controller.shutdown_receiver();
        assert!(!*rx.borrow());

        controller.trigger_shutdown();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn drain_waits_for_admitted_requests() {
        let controller = ShutdownController::new();
        controller.set_ready();

        let guard = controller.admit().unwrap();
        controller.trigger_shutdown();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        assert!(controller.wait_for_drain(Duration::from_secs(2)).await);
        assert_eq!(controller.health_state(), HealthState::Stopped);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn drain_timeout_stays_draining() {
        let controller = ShutdownController::new();
        controller.set_ready();

        let _guard = controller.admit().unwrap();
        controller.trigger_shutdown();

        assert!(!controller.wait_for_drain(Duration::from_millis(50)).await);
        assert_eq!(controller.health_state(), HealthState::Draining);
    }
}
