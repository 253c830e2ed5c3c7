//! Construction-time configuration.
//!
//! No file or environment based configuration layer: every knob the compiler
//! and orchestrator expose is a plain field passed in at construction, rather
//! than read from the environment.

/// Tunables for a [`crate::orchestrator::FrameOrchestrator`].
#[derive(Debug, Clone, Copy)]
pub struct FrameGraphConfig {
    /// Maximum number of frames that may be in flight (GPU-submitted but not
    /// yet completion-signalled) at once. Bounds the inflight-frame semaphore.
    pub max_inflight_frames: u32,
    /// Byte size of one tagged-arena slab (§4.1: "chain of 64-KiB slabs").
    pub arena_slab_size: usize,
    /// Number of entries per chunk in a persistent resource registry (§4.2).
    pub persistent_chunk_size: usize,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            max_inflight_frames: 2,
            arena_slab_size: 64 * 1024,
            persistent_chunk_size: 1024,
        }
    }
}
