//! Process health state and graceful shutdown.
//!
//! The health state lives in an `ArcSwap` so probes read it without
//! locking. Admin and data-plane requests each hold an [`InFlightGuard`]
//! while they run; shutdown waits for the counter to reach zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;

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
}

#[derive(Debug)]
pub struct ShutdownController {
    signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    health: Arc<ArcSwap<HealthState>>,
}

impl ShutdownController {
    #[must_use]
    pub fn new() -> Self {
        let (signal, _rx) = watch::channel(false);
        Self {
            signal,
            in_flight: Arc::new(AtomicU64::new(0)),
            health: Arc::new(ArcSwap::from_pointee(HealthState::Starting)),
        }
    }

    pub fn set_ready(&self) {
        self.health.store(Arc::new(HealthState::Ready));
    }

    /// Resolves to `true` once shutdown has been triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    /// Moves to `Draining` and notifies every receiver.
    pub fn trigger_shutdown(&self) {
        self.health.store(Arc::new(HealthState::Draining));
        let _ = self.signal.send(true);
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health.load()
    }

    /// Counts one request as in flight until the guard is dropped.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits up to `timeout` for in-flight requests to finish.
    ///
    /// On success the state becomes `Stopped` and `true` is returned; on
    /// timeout the state stays `Draining`.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.health.store(Arc::new(HealthState::Stopped));
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
