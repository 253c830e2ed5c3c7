//! Resource registries (§4.2).
//!
//! Persistent and transient resources live in different shaped stores:
//! persistent resources are long-lived and grow monotonically, so they are
//! kept in fixed-size chunks appended to under a lock, with generation
//! counters so a stale handle from before a `dispose`+reuse cannot alias the
//! new occupant. Transient resources are scoped to one frame's compilation,
//! so they live in a plain dense `Vec` tagged with the frame-graph slot that
//! allocated them (`registry_index`); using one from the wrong slot is a
//! programmer error caught by [`TransientRegistry::validate_handle`].

use parking_lot::Mutex;

use crate::backend::Backend;
use crate::errors::{FrameGraphError, Result};
use crate::resource::handle::{Lifetime, ResourceHandle, ResourceKind};

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// A chunked, append-mostly registry for persistent resources.
///
/// New chunks are appended under a lock; already-allocated chunks are never
/// moved, so a raw pointer into an existing chunk stays valid across growth.
pub struct PersistentRegistry<T> {
    kind: ResourceKind,
    chunk_size: usize,
    chunks: Mutex<Vec<Vec<Slot<T>>>>,
}

impl<T> PersistentRegistry<T> {
    #[must_use]
    pub fn new(kind: ResourceKind, chunk_size: usize) -> Self {
        Self {
            kind,
            chunk_size,
            chunks: Mutex::new(Vec::new()),
        }
    }

    /// Inserts `value`, reusing a disposed slot if one is free, and returns
    /// the handle identifying it.
    pub fn insert(&self, value: T) -> ResourceHandle {
        let mut chunks = self.chunks.lock();

        for (chunk_index, chunk) in chunks.iter_mut().enumerate() {
            for (row, slot) in chunk.iter_mut().enumerate() {
                if slot.value.is_none() {
                    slot.value = Some(value);
                    let index = (chunk_index * self.chunk_size + row) as u32;
                    return ResourceHandle::new(
                        self.kind,
                        Lifetime::Persistent,
                        0,
                        slot.generation,
                        index,
                    );
                }
            }
        }

        let chunk_index = chunks.len();
        log::debug!(
            "persistent registry for {:?} growing to chunk {chunk_index} ({} entries)",
            self.kind,
            self.chunk_size
        );
        let mut new_chunk = Vec::with_capacity(self.chunk_size);
        new_chunk.push(Slot {
            value: Some(value),
            generation: 0,
        });
        for _ in 1..self.chunk_size {
            new_chunk.push(Slot {
                value: None,
                generation: 0,
            });
        }
        let index = (chunk_index * self.chunk_size) as u32;
        chunks.push(new_chunk);
        ResourceHandle::new(self.kind, Lifetime::Persistent, 0, 0, index)
    }

    /// Disposes the resource at `handle`, bumping its slot's generation so
    /// any handle captured before this call can never alias the slot again.
    ///
    /// Panics if `handle` does not belong to this registry or its generation
    /// is stale — both are programmer errors (§7).
    pub fn dispose(&self, handle: ResourceHandle) -> T {
        assert!(handle.is_persistent(), "dispose called with a transient handle");
        let mut chunks = self.chunks.lock();
        let chunk_index = handle.index as usize / self.chunk_size;
        let row = handle.index as usize % self.chunk_size;
        let slot = chunks
            .get_mut(chunk_index)
            .and_then(|c| c.get_mut(row))
            .expect("handle out of range for this persistent registry");
        assert_eq!(
            slot.generation, handle.generation,
            "stale handle: slot generation {} does not match handle generation {}",
            slot.generation, handle.generation
        );
        slot.generation = slot.generation.wrapping_add(1);
        slot.value.take().expect("handle pointed at an already-disposed slot")
    }

    #[must_use]
    pub fn is_valid(&self, handle: ResourceHandle) -> bool {
        if !handle.is_persistent() {
            return false;
        }
        let chunks = self.chunks.lock();
        let chunk_index = handle.index as usize / self.chunk_size;
        let row = handle.index as usize % self.chunk_size;
        chunks
            .get(chunk_index)
            .and_then(|c| c.get(row))
            .is_some_and(|slot| slot.generation == handle.generation && slot.value.is_some())
    }
}

/// Allocates `value` in `registry` and asks `backend` to materialise it,
/// implementing spec §7's resource-materialisation-failure policy in one
/// place: on `false` the handle is disposed immediately (its slot's
/// generation is bumped, so it can never be mistaken for the next
/// allocation) and [`FrameGraphError::MaterialisationFailed`] is returned —
/// this is the "client constructor" §7 says the typed failure propagates to.
/// On success the handle is returned ready to hand to a pass.
pub fn allocate_persistent<T>(
    registry: &PersistentRegistry<T>,
    backend: &dyn Backend,
    value: T,
) -> Result<ResourceHandle> {
    let handle = registry.insert(value);
    if backend.materialise_persistent(handle) {
        Ok(handle)
    } else {
        registry.dispose(handle);
        Err(FrameGraphError::MaterialisationFailed { handle })
    }
}

/// A dense, frame-scoped registry for transient resources.
///
/// One instance is created per compiling frame and tagged with that frame's
/// `registry_index`; any handle issued by a different instance fails
/// [`validate_handle`](Self::validate_handle) rather than silently aliasing.
pub struct TransientRegistry<T> {
    kind: ResourceKind,
    registry_index: u32,
    entries: Vec<T>,
}

impl<T> TransientRegistry<T> {
    #[must_use]
    pub fn new(kind: ResourceKind, registry_index: u32) -> Self {
        Self {
            kind,
            registry_index,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> ResourceHandle {
        let index = self.entries.len() as u32;
        self.entries.push(value);
        ResourceHandle::new(self.kind, Lifetime::Transient, self.registry_index, 0, index)
    }

    #[must_use]
    pub fn get(&self, handle: ResourceHandle) -> Option<&T> {
        self.validate_handle(handle).then(|| &self.entries[handle.index as usize])
    }

    #[must_use]
    pub fn get_mut(&mut self, handle: ResourceHandle) -> Option<&mut T> {
        if !self.validate_handle(handle) {
            return None;
        }
        self.entries.get_mut(handle.index as usize)
    }

    /// Returns `true` iff `handle` was issued by this exact registry
    /// instance (same kind and `registry_index`) and is in range.
    ///
    /// A transient handle captured in one frame and replayed against a later
    /// frame's registry — which reuses the same `registry_index` slot with a
    /// fresh instance — fails this check; callers should treat that as the
    /// programmer error it is (§4.2, §7).
    #[must_use]
    pub fn validate_handle(&self, handle: ResourceHandle) -> bool {
        handle.is_transient()
            && handle.kind == self.kind
            && handle.registry_index == self.registry_index
            && (handle.index as usize) < self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
