//! Per-service mutual exclusion.
//!
//! Mutations of one service (lifecycle actions, enable/disable, delete,
//! repair actions) are serialized; mutations of different services and all
//! reads proceed concurrently. The guard releases the lock on every exit
//! path, including early returns and panics.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

type LockTable = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Held while mutating one service.
#[derive(Debug)]
pub struct ServiceGuard {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl ServiceGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Name → mutex arena.
#[derive(Debug, Default, Clone)]
pub struct ServiceLocks {
    table: Arc<Mutex<LockTable>>,
}

impl ServiceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn acquire(&self, name: &str) -> ServiceGuard {
        let mutex = {
            let mut table = self.table.lock();
            // Drop entries nobody holds or waits on so the table tracks live names only.
            table.retain(|_, m| Arc::strong_count(m) > 1 || m.try_lock().is_err());
            table
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        tracing::trace!("Waiting for service lock '{}'", name);
        let guard = mutex.lock_owned().await;
        ServiceGuard {
            name: name.to_string(),
            _guard: guard,
        }
    }

    /// Number of names currently tracked.
    pub fn tracked(&self) -> usize {
        self.table.lock().len()
    }
}
