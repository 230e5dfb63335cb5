//! Keyed async mutex serialising lifecycle operations per service name.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per service name, created on first use.
///
/// Operations on different services never contend. Entries are kept for
/// the life of the process; the set of service names is operator-managed
/// and small.
#[derive(Debug, Default)]
pub struct ServiceLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ServiceLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `service_name`.
    pub async fn acquire(&self, service_name: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.entry(service_name.to_string()).or_default().value());
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_name_is_exclusive() {
        let locks = Arc::new(ServiceLocks::new());
        let guard = locks.acquire("billing").await;

        let contender = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _guard = contender.acquire("billing").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_names_do_not_contend() {
        let locks = ServiceLocks::new();
        let _billing = locks.acquire("billing").await;
        let orders = tokio::time::timeout(Duration::from_millis(100), locks.acquire("orders")).await;
        assert!(orders.is_ok());
    }
}
