use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per resume id: at most one render (or delete) per resume is
/// in flight, while different resumes proceed in parallel. Entries are dropped
/// once nobody holds or waits on them.
#[derive(Clone, Default)]
pub struct RenderLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Held for the duration of a render. Releasing it admits the next waiter.
pub struct RenderPermit {
    guard: Option<OwnedMutexGuard<()>>,
    resume_id: Uuid,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl RenderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, resume_id: Uuid) -> RenderPermit {
        let lock = Arc::clone(&self.inner.entry(resume_id).or_default());
        let guard = lock.lock_owned().await;
        RenderPermit {
            guard: Some(guard),
            resume_id,
            locks: Arc::clone(&self.inner),
        }
    }

    /// Number of resume ids with a holder or waiter.
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.inner.len()
    }
}

impl Drop for RenderPermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: no holder, no waiter.
        self.locks
            .remove_if(&self.resume_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
