use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ObjectId;
use crate::PropertyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub object: ObjectId,
    pub property: PropertyId,
}

impl DebounceKey {
    pub fn new(
        object: ObjectId,
        property: PropertyId,
    ) -> Self {
        Self { object, property }
    }
}

/// Pending notification job of one key.
#[derive(Debug)]
pub(crate) struct DebounceSlot {
    token: CancellationToken,
    handle: JoinHandle<()>,
    generation: u64,
    updated_at: Instant,
    /// Superseded jobs still finishing their in-flight sends
    retired: Vec<JoinHandle<()>>,
}

impl DebounceSlot {
    fn new(
        token: CancellationToken,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            token,
            handle,
            generation: 1,
            updated_at: Instant::now(),
            retired: Vec::new(),
        }
    }

    /// Installs the replacement of an already cancelled job.
    fn replace(
        &mut self,
        token: CancellationToken,
        handle: JoinHandle<()>,
    ) {
        self.token = token;
        let previous = std::mem::replace(&mut self.handle, handle);
        self.retired.retain(|h| !h.is_finished());
        if !previous.is_finished() {
            self.retired.push(previous);
        }
        self.generation += 1;
        self.updated_at = Instant::now();
    }

    pub(crate) fn is_busy(&self) -> bool {
        !self.handle.is_finished() || self.retired.iter().any(|h| !h.is_finished())
    }
}

/// Debounce table keyed by `(object, property)`.
///
/// Each key is synchronized through the map's entry lock, independently of
/// the per-object data lock, so writers that do not hold the object lock can
/// still notify.
#[derive(Debug, Default)]
pub(crate) struct DebounceTable {
    slots: DashMap<DebounceKey, DebounceSlot>,
}

impl DebounceTable {
    /// Schedules a job for `key` through `spawn`, cancelling the pending one.
    /// Returns the generation of the newly scheduled job.
    pub(crate) fn schedule<F>(
        &self,
        key: DebounceKey,
        spawn: F,
    ) -> u64
    where
        F: FnOnce(CancellationToken, u64) -> JoinHandle<()>,
    {
        let token = CancellationToken::new();
        match self.slots.entry(key) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                slot.token.cancel();
                let generation = slot.generation + 1;
                let handle = spawn(token.clone(), generation);
                slot.replace(token, handle);
                generation
            }
            Entry::Vacant(entry) => {
                let handle = spawn(token.clone(), 1);
                entry.insert(DebounceSlot::new(token, handle));
                1
            }
        }
    }

    pub(crate) fn generation(
        &self,
        key: &DebounceKey,
    ) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.generation)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.slots.iter().any(|slot| slot.is_busy())
    }

    /// Drops slots whose jobs are done and that saw no write for `max_idle`.
    pub(crate) fn evict_idle(
        &self,
        max_idle: Duration,
    ) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| slot.is_busy() || slot.updated_at.elapsed() < max_idle);
        before.saturating_sub(self.slots.len())
    }
}
