//! Hybrid resource map (C9, §4.9).
//!
//! Backends attach per-resource state (image handles, memory allocations,
//! fences) through this map rather than threading it through the compiler.
//! Persistent resources live in a chunked array so growth never moves
//! existing entries; transient resources live in one dense array sized to
//! the owning frame's transient registry capacity.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::resource::ResourceHandle;

struct Chunk<V> {
    slots: Vec<Option<V>>,
}

/// Persistent side of a [`ResourceMap`]: chunked, atomically grown.
struct PersistentSide<V> {
    chunk_size: usize,
    allocated_chunks: AtomicUsize,
    chunks: RwLock<Vec<Chunk<V>>>,
}

impl<V> PersistentSide<V> {
    fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            allocated_chunks: AtomicUsize::new(0),
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn location(&self, index: u32) -> (usize, usize) {
        (index as usize / self.chunk_size, index as usize % self.chunk_size)
    }

    fn ensure_chunk(&self, chunk_index: usize) {
        if chunk_index < self.allocated_chunks.load(Ordering::Acquire) {
            return;
        }
        let mut chunks = self.chunks.write();
        while chunks.len() <= chunk_index {
            chunks.push(Chunk {
                slots: (0..self.chunk_size).map(|_| None).collect(),
            });
        }
        self.allocated_chunks.store(chunks.len(), Ordering::Release);
    }
}

/// Transient side of a [`ResourceMap`]: one dense slot per transient index.
struct TransientSide<V> {
    slots: RwLock<Vec<Option<V>>>,
}

impl<V> TransientSide<V> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new((0..capacity).map(|_| None).collect()),
        }
    }
}

/// Per-resource side-table keyed by [`ResourceHandle`], delegating to the
/// persistent or transient side by the handle's lifetime (§9 open question:
/// "expose a single unified API delegating by handle lifetime").
pub struct ResourceMap<V> {
    persistent: PersistentSide<V>,
    transient: TransientSide<V>,
}

impl<V: Clone> ResourceMap<V> {
    #[must_use]
    pub fn new(persistent_chunk_size: usize, transient_capacity: usize) -> Self {
        Self {
            persistent: PersistentSide::new(persistent_chunk_size),
            transient: TransientSide::new(transient_capacity),
        }
    }

    #[must_use]
    pub fn get(&self, handle: ResourceHandle) -> Option<V> {
        if handle.is_persistent() {
            let (chunk_index, row) = self.persistent.location(handle.index);
            if chunk_index >= self.persistent.allocated_chunks.load(Ordering::Acquire) {
                return None;
            }
            let chunks = self.persistent.chunks.read();
            chunks.get(chunk_index).and_then(|c| c.slots[row].clone())
        } else {
            let slots = self.transient.slots.read();
            slots.get(handle.index as usize).and_then(Clone::clone)
        }
    }

    pub fn set(&self, handle: ResourceHandle, value: V) {
        if handle.is_persistent() {
            let (chunk_index, row) = self.persistent.location(handle.index);
            self.persistent.ensure_chunk(chunk_index);
            let mut chunks = self.persistent.chunks.write();
            chunks[chunk_index].slots[row] = Some(value);
        } else {
            let mut slots = self.transient.slots.write();
            if handle.index as usize >= slots.len() {
                slots.resize(handle.index as usize + 1, None);
            }
            slots[handle.index as usize] = Some(value);
        }
    }

    pub fn remove(&self, handle: ResourceHandle) -> Option<V> {
        if handle.is_persistent() {
            let (chunk_index, row) = self.persistent.location(handle.index);
            if chunk_index >= self.persistent.allocated_chunks.load(Ordering::Acquire) {
                return None;
            }
            let mut chunks = self.persistent.chunks.write();
            chunks[chunk_index].slots[row].take()
        } else {
            let mut slots = self.transient.slots.write();
            slots.get_mut(handle.index as usize).and_then(Option::take)
        }
    }

    /// Calls `f` once for every occupied entry across both sides.
    pub fn for_each(&self, mut f: impl FnMut(u32, &V)) {
        let chunks = self.persistent.chunks.read();
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            for (row, slot) in chunk.slots.iter().enumerate() {
                if let Some(value) = slot {
                    f((chunk_index * self.persistent.chunk_size + row) as u32, value);
                }
            }
        }
        drop(chunks);
        let slots = self.transient.slots.read();
        for (index, slot) in slots.iter().enumerate() {
            if let Some(value) = slot {
                f(index as u32, value);
            }
        }
    }

    /// Construct-in-place: calls `f(existing, is_initialised)` and stores
    /// whatever it returns. `is_initialised` tells the caller whether it is
    /// updating an existing entry or creating a fresh one.
    pub fn with_value(&self, handle: ResourceHandle, f: impl FnOnce(Option<V>, bool) -> V) {
        let existing = self.get(handle);
        let is_initialised = existing.is_some();
        let value = f(existing, is_initialised);
        self.set(handle, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Lifetime, ResourceKind};

    fn persistent(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Texture, Lifetime::Persistent, 0, 0, index)
    }

    fn transient(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Texture, Lifetime::Transient, 0, 0, index)
    }

    #[test]
    fn persistent_side_grows_across_chunk_boundary() {
        let map: ResourceMap<u32> = ResourceMap::new(2, 0);
        map.set(persistent(0), 1);
        map.set(persistent(3), 2);
        assert_eq!(map.get(persistent(0)), Some(1));
        assert_eq!(map.get(persistent(3)), Some(2));
        assert_eq!(map.get(persistent(1)), None);
    }

    #[test]
    fn transient_side_is_dense_and_independent_of_persistent() {
        let map: ResourceMap<u32> = ResourceMap::new(4, 4);
        map.set(transient(2), 42);
        assert_eq!(map.get(transient(2)), Some(42));
        assert_eq!(map.get(persistent(2)), None);
    }

    #[test]
    fn with_value_reports_whether_the_entry_pre_existed() {
        let map: ResourceMap<u32> = ResourceMap::new(4, 4);
        map.with_value(persistent(0), |existing, was_init| {
            assert!(!was_init);
            existing.unwrap_or(0) + 1
        });
        map.with_value(persistent(0), |existing, was_init| {
            assert!(was_init);
            existing.unwrap_or(0) + 1
        });
        assert_eq!(map.get(persistent(0)), Some(2));
    }
}
