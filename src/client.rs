//! Client-facing pass-enqueuing convenience API (§6 "Client interface").
//!
//! Wraps the lower-level [`EnqueuedPass`]/[`PassRecord`]/`PassCallback`
//! triple with one constructor per pass kind — the way callers actually
//! drive this crate: name a pass, describe what it touches, and hand over a
//! closure that records commands through the [`CommandRecorder`] it is
//! given.

use smallvec::SmallVec;

use crate::backend::Reflection;
use crate::errors::{FrameGraphError, Result};
use crate::orchestrator::FrameOrchestrator;
use crate::pass::{
    CommandRecorder, EnqueuedPass, PassCallback, PassKind, PassRecord, RenderTargetDescriptor,
    SideEffectFlags,
};
use crate::resource::ResourceHandle;

impl FrameOrchestrator {
    /// Enqueues a draw pass against `target`. Eager: the callback runs
    /// during usage evaluation (§4.4), and its actual reads/writes are
    /// inferred from the commands it records rather than declared upfront.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGraphError::TooManyColorAttachments`] if `target`
    /// binds more than 8 colour slots — a render target is always
    /// constructed with at most 8, but a caller assembling one by hand
    /// (rather than through [`RenderTargetDescriptor::set_color`]) could
    /// still violate this.
    pub fn add_draw_callback_pass(
        &self,
        name: impl Into<String>,
        target: RenderTargetDescriptor,
        execute: impl FnMut(&mut CommandRecorder) + Send + 'static,
    ) -> Result<()> {
        self.enqueue_draw_pass(name, target, Box::new(execute))
    }

    /// Draw-pass variant that also threads a backend-reflected pipeline
    /// state through to `execute`, alongside the recorder.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_draw_callback_pass`].
    pub fn add_reflectable_draw_callback_pass(
        &self,
        name: impl Into<String>,
        target: RenderTargetDescriptor,
        reflection: Box<dyn Reflection>,
        mut execute: impl FnMut(&mut CommandRecorder, &dyn Reflection) + Send + 'static,
    ) -> Result<()> {
        let callback: PassCallback =
            Box::new(move |recorder: &mut CommandRecorder| execute(recorder, reflection.as_ref()));
        self.enqueue_draw_pass(name, target, callback)
    }

    fn enqueue_draw_pass(
        &self,
        name: impl Into<String>,
        target: RenderTargetDescriptor,
        callback: PassCallback,
    ) -> Result<()> {
        let name = name.into();
        let count = target.color_count();
        if count > 8 {
            return Err(FrameGraphError::TooManyColorAttachments { pass_name: name, count });
        }
        let mut record = PassRecord::new(0, PassKind::Draw, name);
        record.render_target = Some(target);
        self.add_pass(EnqueuedPass::new(record, callback));
        Ok(())
    }

    /// Enqueues an eager compute pass.
    pub fn add_compute_callback_pass(
        &self,
        name: impl Into<String>,
        execute: impl FnMut(&mut CommandRecorder) + Send + 'static,
    ) {
        let record = PassRecord::new(0, PassKind::Compute, name.into());
        self.add_pass(EnqueuedPass::new(record, Box::new(execute)));
    }

    /// Compute-pass variant threading a backend-reflected pipeline state
    /// through to `execute`.
    pub fn add_reflectable_compute_callback_pass(
        &self,
        name: impl Into<String>,
        reflection: Box<dyn Reflection>,
        mut execute: impl FnMut(&mut CommandRecorder, &dyn Reflection) + Send + 'static,
    ) {
        let record = PassRecord::new(0, PassKind::Compute, name.into());
        let callback: PassCallback =
            Box::new(move |recorder: &mut CommandRecorder| execute(recorder, reflection.as_ref()));
        self.add_pass(EnqueuedPass::new(record, callback));
    }

    /// Enqueues an eager blit pass, appended after everything already
    /// enqueued this frame.
    pub fn add_blit_callback_pass(
        &self,
        name: impl Into<String>,
        execute: impl FnMut(&mut CommandRecorder) + Send + 'static,
    ) {
        let record = PassRecord::new(0, PassKind::Blit, name.into());
        self.add_pass(EnqueuedPass::new(record, Box::new(execute)));
    }

    /// Prepends a blit pass ahead of every other pass enqueued this frame —
    /// the upload path a caller not using [`FrameOrchestrator::with_upload_flush`]
    /// reaches for instead (§4.8 step 1).
    pub fn insert_early_blit_pass(
        &self,
        name: impl Into<String>,
        execute: impl FnMut(&mut CommandRecorder) + Send + 'static,
    ) {
        let record = PassRecord::new(0, PassKind::Blit, name.into());
        self.insert_early(EnqueuedPass::new(record, Box::new(execute)));
    }

    /// Enqueues a lazy external pass: one whose commands are produced by a
    /// collaborator this crate cannot introspect (§1 "Non-goals": backend
    /// translation to GPU APIs is out of scope), so its reads and writes
    /// must be declared upfront rather than inferred from recorded commands.
    /// `side_effects` is attached to every declared write, so a write to a
    /// resource this pass does not itself flag `persistent` can still force
    /// the pass to survive culling (e.g. a write through an externally
    /// owned handle, §4.5 step 2).
    pub fn add_external_callback_pass(
        &self,
        name: impl Into<String>,
        declared_reads: impl IntoIterator<Item = ResourceHandle>,
        declared_writes: impl IntoIterator<Item = ResourceHandle>,
        side_effects: SideEffectFlags,
        execute: impl FnMut(&mut CommandRecorder) + Send + 'static,
    ) {
        let mut record = PassRecord::new(0, PassKind::External, name.into());
        record.declared_reads = declared_reads.into_iter().collect();
        record.declared_writes = declared_writes.into_iter().collect::<SmallVec<[ResourceHandle; 8]>>();
        record.write_side_effects = record.declared_writes.iter().map(|_| side_effects).collect();
        self.add_pass(EnqueuedPass::new(record, Box::new(execute)));
    }

    /// Enqueues a CPU-only pass — run for its host-side effect, never
    /// appearing in the compiled schedule (§4.5 step 5: CPU-kind passes are
    /// always dropped once evaluated).
    pub fn add_cpu_callback_pass(
        &self,
        name: impl Into<String>,
        execute: impl FnMut(&mut CommandRecorder) + Send + 'static,
    ) {
        let record = PassRecord::new(0, PassKind::Cpu, name.into());
        self.add_pass(EnqueuedPass::new(record, Box::new(execute)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameGraphConfig;
    use crate::resource::{BufferDescriptor, Lifetime, PixelFormat, ResourceKind, TextureDescriptor, TextureUsage};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct NullCompletion;
    impl crate::backend::CompletionHandle for NullCompletion {
        fn wait(self) -> Result<()> {
            Ok(())
        }
    }

    struct NullBackend;
    impl crate::backend::Backend for NullBackend {
        fn materialise_persistent(&self, _resource: ResourceHandle) -> bool {
            true
        }
        fn dispose(&self, _resource: ResourceHandle) {}
        fn render_pipeline_reflection(
            &self,
            _descriptor: &TextureDescriptor,
            _render_target: &RenderTargetDescriptor,
        ) -> Option<Box<dyn Reflection>> {
            None
        }
        fn compute_pipeline_reflection(&self, _descriptor: &BufferDescriptor) -> Option<Box<dyn Reflection>> {
            None
        }
        fn supports_pixel_format(&self, _format: PixelFormat, _usage: TextureUsage) -> bool {
            true
        }
        fn size_and_alignment(&self, _descriptor: &TextureDescriptor) -> crate::backend::SizeAndAlignment {
            crate::backend::SizeAndAlignment { size: 0, alignment: 0 }
        }
        fn acceleration_structure_sizes(
            &self,
            _descriptor: &BufferDescriptor,
        ) -> crate::backend::AccelerationStructureSizes {
            crate::backend::AccelerationStructureSizes {
                acceleration_structure_size: 0,
                build_scratch_size: 0,
                update_scratch_size: 0,
            }
        }
        fn execute_render_graph(
            &self,
            _passes: &[PassRecord],
            _used_resources: &[ResourceHandle],
            _dependencies: &crate::compiler::DependencyTable,
        ) -> Box<dyn crate::backend::CompletionHandle> {
            Box::new(NullCompletion)
        }
        fn argument_buffer_path(&self, index: u32, _stages: crate::usage::RenderStages) -> crate::backend::BindingPath {
            crate::backend::BindingPath { set: index, binding: 0 }
        }
        fn push_constant_path(&self) -> crate::backend::BindingPath {
            crate::backend::BindingPath { set: 0, binding: 0 }
        }
    }

    fn transient(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Texture, Lifetime::Transient, 0, 0, index)
    }

    #[tokio::test]
    async fn empty_frame_fires_both_callbacks_without_enqueuing_anything() {
        let orchestrator = FrameOrchestrator::new(FrameGraphConfig::default(), Arc::new(NullBackend));
        let submitted = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicBool::new(false));
        let s = Arc::clone(&submitted);
        let c = Arc::clone(&completed);
        orchestrator
            .execute(move || s.store(true, Ordering::SeqCst), move |_| c.store(true, Ordering::SeqCst))
            .await
            .unwrap();
        assert!(submitted.load(Ordering::SeqCst));
        assert!(completed.load(Ordering::SeqCst));
        assert_eq!(orchestrator.global_submission_index(), 1);
    }

    #[test]
    fn draw_pass_with_all_eight_color_slots_bound_is_accepted() {
        let orchestrator = FrameOrchestrator::new(FrameGraphConfig::default(), Arc::new(NullBackend));
        let mut target = RenderTargetDescriptor::new();
        for slot in 0..8 {
            target.color_attachments[slot] = Some(crate::pass::Attachment {
                texture: transient(slot as u32),
                mip_level: 0,
                slice: 0,
                depth_plane: 0,
                resolve: None,
                extent: (64, 64),
                clear: crate::pass::ClearOp::Keep,
                format: PixelFormat::Rgba8Unorm,
            });
        }
        // `color_count` already saturates at 8 real slots; a hand-built
        // descriptor cannot literally exceed the array, so this exercises
        // the boundary (exactly 8 is accepted) rather than overflow.
        let result = orchestrator.add_draw_callback_pass("full", target, |_| {});
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn cpu_pass_never_survives_into_the_compiled_schedule() {
        let orchestrator = FrameOrchestrator::new(FrameGraphConfig::default(), Arc::new(NullBackend));
        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        orchestrator.add_cpu_callback_pass("upload-prep", move |_recorder| {
            r.store(true, Ordering::SeqCst);
        });
        orchestrator.execute(|| {}, |_| {}).await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
