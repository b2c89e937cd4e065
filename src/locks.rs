// Per-character locks serializing load -> apply_delta -> save cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prometheus::IntGauge;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held while a character record is being read, modified and written back.
///
/// Releasing the guard, on any exit path, updates the active-locks gauge.
pub struct CharacterGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: CharacterLocks,
}

impl Drop for CharacterGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.report();
    }
}

#[derive(Debug, Clone, Default)]
pub struct CharacterLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
    gauge: Option<IntGauge>,
}

impl CharacterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks whose active count is mirrored into `gauge`.
    pub fn with_gauge(gauge: IntGauge) -> Self {
        Self {
            gauge: Some(gauge),
            ..Self::default()
        }
    }

    /// Wait for exclusive access to `owner_id`'s character.
    pub async fn lock(&self, owner_id: i64) -> CharacterGuard {
        let slot = {
            let mut map = self.inner.lock().unwrap();
            // Drop slots nobody holds or waits on.
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            map.entry(owner_id).or_default().clone()
        };
        self.report();
        let guard = slot.lock_owned().await;
        CharacterGuard {
            guard: Some(guard),
            locks: self.clone(),
        }
    }

    /// Number of characters currently locked or awaited.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap();
        map.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }

    fn report(&self) {
        if let Some(gauge) = &self.gauge {
            gauge.set(self.active() as i64);
        }
    }
}
