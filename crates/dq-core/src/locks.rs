//! # Per-thread Lock Arena
//!
//! Serializes writes against the same thread (append, transition, delete)
//! while writes to different threads run independently. Entries are pruned
//! as soon as no task holds or waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct ThreadLocks {
    slots: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `thread_id`.
    pub async fn lock(&self, thread_id: Uuid) -> ThreadGuard {
        let slot = self.slots.entry(thread_id).or_default().clone();
        let guard = slot.lock_owned().await;
        ThreadGuard {
            thread_id,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Number of threads currently held or awaited.
    pub fn active(&self) -> usize {
        self.slots.len()
    }
}

pub struct ThreadGuard {
    thread_id: Uuid,
    slots: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        // Release first so the map holds the only reference when idle.
        self.guard.take();
        self.slots
            .remove_if(&self.thread_id, |_, slot| Arc::strong_count(slot) == 1);
    }
}
