//! Cache invalidation notices
//!
//! After the backend's data changes (a proposal accepted, activities
//! imported, metrics recomputed) the session announces which views are now
//! stale. Front-ends subscribe and refetch.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// A backend data set that may have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    PlannedWorkouts,
    Calendar,
    Activities,
    Metrics,
}

#[derive(Debug, Clone)]
pub struct InvalidationBus {
    tx: broadcast::Sender<Invalidation>,
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.tx.subscribe()
    }

    pub fn publish(&self, keys: &[Invalidation]) {
        for key in keys {
            // No subscribers is fine
            let receivers = self.tx.send(*key).unwrap_or(0);
            tracing::debug!(?key, receivers, "Published invalidation");
        }
    }
}
