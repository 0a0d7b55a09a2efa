//! Dangling reference queue
//!
//! An instantiate request reserves a consumer slot up front. When the spawn
//! can't produce a usable instance (the parent vanished, or the spawner
//! returned nothing) the slot is queued here and released on the next tick.

use super::{HandlerId, RecordId};

/// Reserved instance slots waiting to be released
#[derive(Debug, Default)]
pub struct DanglingRefs {
    queue: Vec<(HandlerId, RecordId)>,
}

impl DanglingRefs {
    pub fn push(&mut self, handler: HandlerId, record: RecordId) {
        self.queue.push((handler, record));
    }

    /// Take every queued slot, leaving the queue empty
    pub fn take(&mut self) -> Vec<(HandlerId, RecordId)> {
        std::mem::take(&mut self.queue)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
