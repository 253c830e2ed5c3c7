//! Frame orchestrator (C8, §4.8).
//!
//! Bounds how many frames may be in flight, owns the per-frame pass list,
//! and drives one `execute` from enqueue through compile through backend
//! submission. Only the inflight-frame permit waits for actual GPU
//! completion; everything else in `execute` completes before it returns.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};

use crate::arena::{Tag, TagArena};
use crate::backend::Backend;
use crate::compiler::PassCompiler;
use crate::config::FrameGraphConfig;
use crate::errors::Result;
use crate::pass::EnqueuedPass;
use crate::usage::UsageLog;

/// RAII debug-group span for one scheduled pass, opened and closed around a
/// pass's encoding the way a GPU debug-group marker pair brackets it for
/// frame-capture tools. The core does not itself encode GPU commands
/// (§1 Non-goals), so this is exposed for a [`Backend`] impl to construct
/// around its own per-pass encoding rather than driven internally.
/// Emits nothing outside debug builds.
pub struct PassSpan<'a> {
    name: &'a str,
}

impl<'a> PassSpan<'a> {
    /// Opens a span for `name`. Pair with dropping the returned guard (or let
    /// it fall out of scope) once that pass's commands are encoded.
    #[must_use]
    pub fn enter(name: &'a str) -> Self {
        #[cfg(debug_assertions)]
        log::trace!("pass span begin: {name}");
        Self { name }
    }
}

impl Drop for PassSpan<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        log::trace!("pass span end: {}", self.name);
    }
}

/// Per-frame entry point. One instance typically lives for the lifetime of
/// a backend/queue pair; distinct instances sharing a backend serialise
/// through their own active-graph locks (§5).
pub struct FrameOrchestrator {
    arena: Arc<TagArena>,
    backend: Arc<dyn Backend>,
    pass_list: SyncMutex<Vec<EnqueuedPass>>,
    active_graph_lock: AsyncMutex<()>,
    inflight: Arc<Semaphore>,
    submission_index: Arc<AtomicU64>,
    next_pass_index: AtomicU32,
    upload_flush: Option<Box<dyn Fn() + Send + Sync>>,
    last_cpu_ms: Arc<AtomicU64>,
    last_gpu_ms: Arc<AtomicU64>,
}

impl FrameOrchestrator {
    #[must_use]
    pub fn new(config: FrameGraphConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            arena: Arc::new(TagArena::new(config.arena_slab_size)),
            backend,
            pass_list: SyncMutex::new(Vec::new()),
            active_graph_lock: AsyncMutex::new(()),
            inflight: Arc::new(Semaphore::new(config.max_inflight_frames as usize)),
            submission_index: Arc::new(AtomicU64::new(0)),
            next_pass_index: AtomicU32::new(0),
            upload_flush: None,
            last_cpu_ms: Arc::new(AtomicU64::new(0)),
            last_gpu_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Installs the hook run at the start of every `execute` unless this
    /// graph is itself the shared uploader (§4.8 step 1). Not modelled as a
    /// concrete subsystem here — upload flushing is an external collaborator
    /// (§1).
    #[must_use]
    pub fn with_upload_flush(mut self, flush: impl Fn() + Send + Sync + 'static) -> Self {
        self.upload_flush = Some(Box::new(flush));
        self
    }

    /// Appends `pass` to the end of the pass list.
    pub fn add_pass(&self, pass: EnqueuedPass) {
        self.pass_list.lock().push(pass);
    }

    /// Prepends `pass` — used for uploads that must precede every other
    /// pass enqueued this frame.
    pub fn insert_early(&self, pass: EnqueuedPass) {
        self.pass_list.lock().insert(0, pass);
    }

    #[must_use]
    pub fn has_enqueued_passes(&self) -> bool {
        !self.pass_list.lock().is_empty()
    }

    /// `true` iff the inflight semaphore has no permits left.
    #[must_use]
    pub fn has_max_frames_in_flight(&self) -> bool {
        self.inflight.available_permits() == 0
    }

    #[must_use]
    pub fn global_submission_index(&self) -> u64 {
        self.submission_index.load(Ordering::SeqCst)
    }

    /// CPU and GPU duration, in milliseconds, of the most recently submitted
    /// graph (§6 `last_graph_durations`). CPU duration covers enqueue through
    /// compile through `execute_render_graph` returning; GPU duration covers
    /// the completion handle's `wait`. Both are `0.0` until the first
    /// `execute`.
    #[must_use]
    pub fn last_graph_durations(&self) -> (f64, f64) {
        (
            f64::from_bits(self.last_cpu_ms.load(Ordering::Acquire)),
            f64::from_bits(self.last_gpu_ms.load(Ordering::Acquire)),
        )
    }

    /// The per-frame entry point (§4.8 `execute`).
    pub async fn execute<S, C>(&self, on_submission: S, on_completion: C) -> Result<()>
    where
        S: FnOnce() + Send + 'static,
        C: FnOnce(Result<()>) + Send + 'static,
    {
        if let Some(flush) = &self.upload_flush {
            flush();
        }

        let mut enqueued: Vec<EnqueuedPass> = std::mem::take(&mut *self.pass_list.lock());

        if enqueued.is_empty() {
            log::debug!("execute called with no enqueued passes");
            self.last_cpu_ms.store(0.0_f64.to_bits(), Ordering::Release);
            self.last_gpu_ms.store(0.0_f64.to_bits(), Ordering::Release);
            on_submission();
            on_completion(Ok(()));
            // Invariant 6 (§8) holds regardless of whether the frame was
            // empty: a successful `execute` always advances the submission
            // index by exactly one.
            self.submission_index.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        for (i, pass) in enqueued.iter_mut().enumerate() {
            pass.record.index = i as u32;
        }
        self.next_pass_index.store(0, Ordering::SeqCst);

        let _active_graph_guard = self.active_graph_lock.lock().await;
        let permit = Arc::clone(&self.inflight)
            .acquire_owned()
            .await
            .expect("inflight semaphore is never closed");

        let cpu_start = Instant::now();
        let mut usage_log = UsageLog::new();
        let compiled = PassCompiler::compile(enqueued, &mut usage_log, &self.arena).await;

        log::debug!(
            "submitting frame graph: {} active pass(es), {} used resource(s)",
            compiled.active_passes.len(),
            compiled.used_resources.len()
        );

        let completion = self.backend.execute_render_graph(
            &compiled.active_passes,
            &compiled.used_resources,
            &compiled.dependency_table,
        );

        self.last_cpu_ms
            .store((cpu_start.elapsed().as_secs_f64() * 1000.0).to_bits(), Ordering::Release);
        on_submission();

        let submission_index = Arc::clone(&self.submission_index);
        let last_gpu_ms = Arc::clone(&self.last_gpu_ms);
        let gpu_start = Instant::now();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || completion.wait())
                .await
                .unwrap_or_else(|join_error| panic!("completion wait task panicked: {join_error}"));
            last_gpu_ms.store((gpu_start.elapsed().as_secs_f64() * 1000.0).to_bits(), Ordering::Release);
            drop(permit);
            on_completion(result);
        });

        // Per-frame memory teardown (§4.8 step 9). Transient registries and
        // chunked command storage are owned by the caller's per-frame state
        // and already went out of scope with `compiled`/`usage_log`'s
        // backing recorders; only the tag-arena lifetimes and bookkeeping
        // that outlive this function need explicit release here.
        self.arena.free_tag(Tag::GraphExecution);
        self.arena.free_tag(Tag::ResourceUsageNodes);
        drop(_active_graph_guard);
        self.submission_index.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}
