//! Tagged Arena Allocator (C1)
//!
//! A process-wide collection of bump arenas keyed by [`Tag`]. All allocations
//! made under one tag are released together with [`TagArena::free_tag`] — no
//! per-allocation `Drop` bookkeeping, no individual frees.
//!
//! # Design
//!
//! Each tag owns a chain of 64-KiB (configurable) slabs, backed by `bumpalo`.
//! Allocation is thread-safe (a per-thread view can be acquired to avoid
//! contention on the hot path); bulk free is **not** thread-safe and is only
//! ever called by the frame orchestrator at well-defined points in the frame
//! lifecycle (§5: "Tag allocators are thread-safe on allocation ... and not
//! thread-safe on bulk free: the orchestrator owns free timing").
//!
//! # Failure mode
//!
//! Allocation never returns an error on a healthy process; OOM is fatal and
//! aborts like any other allocator failure in Rust (`bumpalo` itself aborts
//! on exhaustion), matching spec §4.1.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

use bumpalo::Bump;

/// Identifies one lifecycle scope of allocations for bulk-free purposes.
///
/// Matches spec §3 "Tag arena": kinds are `pass-execution-scratch(pass-index)`,
/// `graph-compilation`, `graph-execution`, and `resource-usage-nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Scratch memory for one pass's callback execution. Freed immediately
    /// after that pass's callback returns.
    PassExecutionScratch(u32),
    /// Memory used while compiling the dependency graph. Freed at the end of
    /// compile (§4.5 step 8).
    GraphCompilation,
    /// Memory backing the surviving schedule and rebased command storage.
    /// Freed at frame completion.
    GraphExecution,
    /// Memory backing [`crate::usage::UsageLog`] nodes. Freed at frame
    /// completion alongside `GraphExecution`.
    ResourceUsageNodes,
}

/// A bump arena for a single tag.
///
/// Wraps one `bumpalo::Bump` per thread that has allocated under this tag, so
/// that concurrent allocation never contends on a shared bump pointer. The
/// per-thread bumps are collected and reset together on [`TagArena::free_tag`].
struct ThreadLocalBump {
    bump: RefCell<Bump>,
}

impl ThreadLocalBump {
    fn new(slab_size: usize) -> Self {
        Self {
            bump: RefCell::new(Bump::with_capacity(slab_size)),
        }
    }
}

thread_local! {
    static THREAD_ID: u64 = {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NEXT.fetch_add(1, Ordering::Relaxed)
    };
}

/// The tagged arena allocator.
///
/// One instance typically lives for the process lifetime (or for the
/// lifetime of a single frame-graph context); tags are created lazily on
/// first allocation and torn down explicitly with [`free_tag`](Self::free_tag).
pub struct TagArena {
    slab_size: usize,
    tags: Mutex<HashMap<Tag, HashMap<u64, ThreadLocalBump>>>,
}

impl TagArena {
    /// Creates an allocator whose per-thread slabs are `slab_size` bytes.
    #[must_use]
    pub fn new(slab_size: usize) -> Self {
        Self {
            slab_size,
            tags: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates `len` bytes with the given `align` under `tag`.
    ///
    /// Returns a raw pointer valid until [`free_tag`](Self::free_tag) is
    /// called for this tag. Never fails on a healthy process.
    pub fn alloc_layout(&self, tag: Tag, layout: std::alloc::Layout) -> *mut u8 {
        let thread_id = THREAD_ID.with(|id| *id);
        let mut tags = self.tags.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let per_thread = tags.entry(tag).or_default();
        let slot = per_thread
            .entry(thread_id)
            .or_insert_with(|| ThreadLocalBump::new(self.slab_size));
        slot.bump.borrow_mut().alloc_layout(layout).as_ptr()
    }

    /// Allocates space for one `T` under `tag` and moves `value` into it,
    /// returning a mutable reference scoped to the arena's lifetime.
    ///
    /// # Safety invariant
    ///
    /// The returned reference must not outlive the next [`free_tag`](Self::free_tag)
    /// call for `tag` — the arena does not track individual allocations, by
    /// design (§4.1 invariant: "no allocation may outlive its tag").
    pub fn alloc<T>(&self, tag: Tag, value: T) -> &mut T {
        let layout = std::alloc::Layout::new::<T>();
        let ptr = self.alloc_layout(tag, layout).cast::<T>();
        unsafe {
            ptr.write(value);
            &mut *ptr
        }
    }

    /// Frees every allocation made under `tag`, across all threads.
    ///
    /// Not thread-safe with concurrent allocation under the same tag — the
    /// caller (the frame orchestrator) is responsible for ensuring no other
    /// thread is still allocating under `tag` when this is called.
    pub fn free_tag(&self, tag: Tag) {
        let mut tags = self.tags.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(per_thread) = tags.remove(&tag) {
            log::trace!(
                "freeing arena tag {tag:?} ({} thread-local slab chain(s))",
                per_thread.len()
            );
            drop(per_thread);
        }
    }

    /// Total bytes currently allocated under `tag`, summed across threads.
    /// Exposed for tests and diagnostics.
    #[must_use]
    pub fn allocated_bytes(&self, tag: Tag) -> usize {
        let tags = self.tags.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tags.get(&tag)
            .map(|per_thread| {
                per_thread
                    .values()
                    .map(|t| t.bump.borrow().allocated_bytes())
                    .sum()
            })
            .unwrap_or(0)
    }
}

impl Default for TagArena {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}
