//! Typed encoder wrapper (C7, §4.7).
//!
//! A thin, user-facing front end over [`crate::pass::CommandRecorder`] that
//! avoids redundant state-switching commands by diffing against what is
//! already bound, tracking pipeline and bind-group state across draws.
//! Everything this wrapper does still goes through
//! C4 and shows up as ordinary recorded commands — it carries no state of
//! its own that the compiler needs to know about.

use bitflags::bitflags;

use crate::pass::{Command, CommandRecorder};
use crate::resource::ResourceHandle;
use crate::usage::{AccessKind, RenderStages, SubresourceMask};

bitflags! {
    /// Which pieces of encoder state are stale relative to the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Dirty: u16 {
        const PIPELINE       = 1 << 0;
        const DEPTH_STENCIL  = 1 << 1;
        const PUSH_CONSTANTS = 1 << 2;
        const SET_0 = 1 << 3;
        const SET_1 = 1 << 4;
        const SET_2 = 1 << 5;
        const SET_3 = 1 << 6;
        const SET_4 = 1 << 7;
        const SET_5 = 1 << 8;
        const SET_6 = 1 << 9;
        const SET_7 = 1 << 10;
    }
}

const SET_BITS: [Dirty; 8] = [
    Dirty::SET_0,
    Dirty::SET_1,
    Dirty::SET_2,
    Dirty::SET_3,
    Dirty::SET_4,
    Dirty::SET_5,
    Dirty::SET_6,
    Dirty::SET_7,
];

/// State-diffing wrapper around a [`CommandRecorder`] for one pass.
///
/// Parameterised, in spirit, by a "pass reflection" (§4.7): the set of
/// function/push-constant/resource-set declarations a real backend would
/// attach. This crate does not encode argument buffers itself (out of
/// scope, §1), so sets and push constants are tracked as opaque byte
/// fingerprints the caller supplies.
pub struct TypedEncoder<'a> {
    recorder: &'a mut CommandRecorder,
    dirty: Dirty,
    pipeline_id: Option<u64>,
    depth_stencil_id: Option<u64>,
    push_constants: Vec<u8>,
    bound_sets: [Option<u64>; 8],
}

impl<'a> TypedEncoder<'a> {
    #[must_use]
    pub fn new(recorder: &'a mut CommandRecorder) -> Self {
        Self {
            recorder,
            dirty: Dirty::empty(),
            pipeline_id: None,
            depth_stencil_id: None,
            push_constants: Vec::new(),
            bound_sets: [None; 8],
        }
    }

    pub fn set_pipeline(&mut self, pipeline_id: u64) {
        if self.pipeline_id != Some(pipeline_id) {
            self.pipeline_id = Some(pipeline_id);
            self.dirty.insert(Dirty::PIPELINE);
        }
    }

    pub fn set_depth_stencil(&mut self, depth_stencil_id: u64) {
        if self.depth_stencil_id != Some(depth_stencil_id) {
            self.depth_stencil_id = Some(depth_stencil_id);
            self.dirty.insert(Dirty::DEPTH_STENCIL);
        }
    }

    pub fn set_push_constants(&mut self, bytes: &[u8]) {
        if self.push_constants != bytes {
            self.push_constants = bytes.to_vec();
            self.dirty.insert(Dirty::PUSH_CONSTANTS);
        }
    }

    /// Sets the push-constants block from a plain-old-data value, the way a
    /// pass reflection's "push-constants value type" (§4.7) knows how to
    /// encode itself, rather than asking callers to hand-roll a byte slice.
    pub fn set_push_constants_value<T: bytemuck::Pod>(&mut self, value: &T) {
        self.set_push_constants(bytemuck::bytes_of(value));
    }

    /// Binds a resource set fingerprint at `index` (0..8).
    ///
    /// # Panics
    ///
    /// Panics if `index >= 8` — a backend only ever exposes 8 set slots.
    pub fn set_resource_set(&mut self, index: usize, fingerprint: u64) {
        if self.bound_sets[index] != Some(fingerprint) {
            self.bound_sets[index] = Some(fingerprint);
            self.dirty.insert(SET_BITS[index]);
        }
    }

    /// Flushes dirty state in the order §4.7 specifies — depth-stencil,
    /// then pipeline, then dirty resource sets, then push constants — and
    /// appends the draw/dispatch command itself.
    ///
    /// This is the only place dirty flags are cleared; callers must flush
    /// before every draw/dispatch, not just once per pass.
    pub fn flush_and_record(
        &mut self,
        command: Command,
        resource: ResourceHandle,
        access: AccessKind,
        stages: RenderStages,
    ) {
        if self.dirty.contains(Dirty::DEPTH_STENCIL) {
            self.recorder.record_state_change(Command::SetDepthStencil {
                descriptor_id: self.depth_stencil_id.unwrap_or(0),
            });
            self.dirty.remove(Dirty::DEPTH_STENCIL);
        }

        if self.dirty.contains(Dirty::PIPELINE) {
            self.recorder.record_state_change(Command::SetPipeline {
                pipeline_id: self.pipeline_id.unwrap_or(0),
            });
            self.dirty.remove(Dirty::PIPELINE);
        }

        for (i, bit) in SET_BITS.iter().enumerate() {
            if self.dirty.contains(*bit) {
                self.recorder.record_state_change(Command::SetBindGroup {
                    index: i as u32,
                    bind_group_id: self.bound_sets[i].unwrap_or(0),
                });
                self.dirty.remove(*bit);
            }
        }

        if self.dirty.contains(Dirty::PUSH_CONSTANTS) {
            self.recorder.record_state_change(Command::PushConstants {
                offset: 0,
                size: self.push_constants.len() as u32,
            });
            self.dirty.remove(Dirty::PUSH_CONSTANTS);
        }

        self.recorder.record(command, resource, access, stages, SubresourceMask::full());
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Lifetime, ResourceKind};

    fn handle() -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Buffer, Lifetime::Transient, 0, 0, 0)
    }

    #[test]
    fn redundant_pipeline_sets_do_not_mark_dirty() {
        let mut recorder = CommandRecorder::new(0);
        let mut encoder = TypedEncoder::new(&mut recorder);
        encoder.set_pipeline(1);
        assert!(encoder.is_dirty());
        encoder.flush_and_record(
            Command::Draw { vertices: 0..3, instances: 0..1 },
            handle(),
            AccessKind::RENDER_TARGET_COLOR,
            RenderStages::FRAGMENT,
        );
        assert!(!encoder.is_dirty());
        encoder.set_pipeline(1);
        assert!(!encoder.is_dirty(), "setting the same pipeline id again must not re-dirty");
    }

    #[test]
    fn changing_pipeline_marks_dirty_again() {
        let mut recorder = CommandRecorder::new(0);
        let mut encoder = TypedEncoder::new(&mut recorder);
        encoder.set_pipeline(1);
        encoder.flush_and_record(
            Command::Draw { vertices: 0..3, instances: 0..1 },
            handle(),
            AccessKind::RENDER_TARGET_COLOR,
            RenderStages::FRAGMENT,
        );
        encoder.set_pipeline(2);
        assert!(encoder.is_dirty());
    }

    #[test]
    fn typed_push_constants_dirty_only_on_byte_change() {
        #[repr(C)]
        #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
        struct Uniforms {
            model_index: u32,
            _pad: [u32; 3],
        }

        let mut recorder = CommandRecorder::new(0);
        let mut encoder = TypedEncoder::new(&mut recorder);
        encoder.set_push_constants_value(&Uniforms { model_index: 1, _pad: [0; 3] });
        assert!(encoder.is_dirty());
        encoder.flush_and_record(
            Command::Dispatch { x: 1, y: 1, z: 1 },
            handle(),
            AccessKind::SHADER_WRITE,
            RenderStages::COMPUTE,
        );
        assert!(!encoder.is_dirty());
        encoder.set_push_constants_value(&Uniforms { model_index: 1, _pad: [0; 3] });
        assert!(!encoder.is_dirty(), "identical push-constant bytes must not re-dirty");
        encoder.set_push_constants_value(&Uniforms { model_index: 2, _pad: [0; 3] });
        assert!(encoder.is_dirty());
    }

    #[test]
    fn state_changes_emit_distinct_commands_and_touch_no_resource() {
        let mut recorder = CommandRecorder::new(0);
        let mut encoder = TypedEncoder::new(&mut recorder);
        encoder.set_depth_stencil(7);
        encoder.set_pipeline(1);
        encoder.set_resource_set(0, 9);
        let target = handle();
        encoder.flush_and_record(
            Command::Draw { vertices: 0..3, instances: 0..1 },
            target,
            AccessKind::RENDER_TARGET_COLOR,
            RenderStages::FRAGMENT,
        );

        let commands: Vec<&Command> = recorder.commands().collect();
        assert!(matches!(commands[0], Command::SetDepthStencil { descriptor_id: 7 }));
        assert!(matches!(commands[1], Command::SetPipeline { pipeline_id: 1 }));
        assert!(matches!(commands[2], Command::SetBindGroup { index: 0, bind_group_id: 9 }));
        assert!(matches!(commands[3], Command::Draw { .. }));

        // Only the draw itself reads/writes `target` — the state-change
        // commands ahead of it must not register as accesses.
        assert_eq!(recorder.read_resources(), &[] as &[ResourceHandle]);
        assert_eq!(recorder.written_resources(), &[target]);
    }
}
