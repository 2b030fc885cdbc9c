//! Fixed-capacity arena of pre-built render resources
//!
//! Resources are never handed out by value. A caller holds a [`SlotId`] and
//! reaches the resource through [`ResourcePool::with`]; the arena owns every
//! resource for its whole lifetime.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Index of one slot in a [`ResourcePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

struct FreeList {
    order: VecDeque<SlotId>,
    /// Indexed by slot; mirrors membership in `order`
    is_free: Vec<bool>,
}

pub struct ResourcePool<R> {
    slots: Vec<Mutex<R>>,
    free: Mutex<FreeList>,
}

impl<R> ResourcePool<R> {
    /// Build a pool of `capacity` resources, all initially available
    pub fn from_fn(capacity: usize, mut make: impl FnMut(usize) -> R) -> Self {
        let slots = (0..capacity).map(|i| Mutex::new(make(i))).collect();
        let free = FreeList {
            order: (0..capacity).map(SlotId).collect(),
            is_free: vec![true; capacity],
        };
        Self {
            slots,
            free: Mutex::new(free),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn available(&self) -> usize {
        self.free.lock().order.len()
    }

    /// Take the front slot, or None when exhausted
    pub fn acquire(&self) -> Option<SlotId> {
        let slot = {
            let mut free = self.free.lock();
            let slot = free.order.pop_front();
            if let Some(slot) = slot {
                free.is_free[slot.0] = false;
            }
            slot
        };
        if slot.is_none() {
            debug!(capacity = self.capacity(), "Resource pool exhausted");
        }
        slot
    }

    /// Return a slot to the front of the free list
    pub fn release(&self, slot: SlotId) {
        if slot.0 >= self.slots.len() {
            warn!(slot = slot.0, "Release of a slot outside the pool ignored");
            return;
        }
        let mut free = self.free.lock();
        if free.is_free[slot.0] {
            warn!(slot = slot.0, "Double release of a pool slot ignored");
            return;
        }
        free.is_free[slot.0] = true;
        free.order.push_front(slot);
    }

    /// Run `f` against the resource in `slot`
    pub fn with<T>(&self, slot: SlotId, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        self.slots.get(slot.0).map(|resource| f(&mut resource.lock()))
    }
}
