use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

use crate::ObjectId;

/// One mutual-exclusion lock per object.
///
/// Every read or write of an object's properties happens while holding its
/// guard. Locks for different objects never contend; waiters on the same
/// object are served first-acquirer-wins, not FIFO by arrival.
#[derive(Debug, Default)]
pub struct ObjectLocks {
    locks: DashMap<ObjectId, Arc<Mutex<()>>>,
}

/// Held for the span of a single object access; released on drop.
#[derive(Debug)]
pub struct ObjectGuard {
    object_id: ObjectId,
    _guard: OwnedMutexGuard<()>,
}

impl ObjectGuard {
    #[cfg(test)]
    pub(crate) fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

impl Drop for ObjectGuard {
    fn drop(&mut self) {
        trace!(object_id = %self.object_id, "object lock released");
    }
}

impl ObjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(
        &self,
        object_id: ObjectId,
    ) -> ObjectGuard {
        let mutex = self.mutex(object_id);
        let guard = mutex.lock_owned().await;
        trace!(%object_id, "object lock acquired");
        ObjectGuard {
            object_id,
            _guard: guard,
        }
    }

    /// Non-blocking variant; `None` while another task holds the object.
    #[cfg(test)]
    pub(crate) fn try_lock(
        &self,
        object_id: ObjectId,
    ) -> Option<ObjectGuard> {
        let guard = self.mutex(object_id).try_lock_owned().ok()?;
        Some(ObjectGuard {
            object_id,
            _guard: guard,
        })
    }

    /// Number of objects that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn mutex(
        &self,
        object_id: ObjectId,
    ) -> Arc<Mutex<()>> {
        self.locks.entry(object_id).or_default().clone()
    }
}
