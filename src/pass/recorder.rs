//! Command recorder (C4, §4.4).
//!
//! One [`CommandRecorder`] is opened per pass callback invocation. It appends
//! commands to a chunked, append-only [`ChunkArray`], and for every command
//! records the resource usage it implies into the crate-wide [`UsageLog`].

use smallvec::SmallVec;
use std::ops::Range;

use crate::pass::SideEffectFlags;
use crate::resource::{ResourceHandle, SubresourceMask};
use crate::usage::{AccessKind, RenderStages, ResourceUsage, UsageLog};

/// A chunked, append-only log. Chunks are fixed-size so a reference into an
/// earlier chunk survives later pushes — mirrors the persistent resource
/// registry's chunking, scaled down for per-pass command storage.
pub struct ChunkArray<T> {
    chunk_size: usize,
    chunks: Vec<Vec<T>>,
}

impl<T> ChunkArray<T> {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunks: Vec::new(),
        }
    }

    pub fn push(&mut self, value: T) -> u32 {
        if self.chunks.last().is_none_or(|c| c.len() == self.chunk_size) {
            self.chunks.push(Vec::with_capacity(self.chunk_size));
        }
        let chunk = self.chunks.last_mut().expect("just pushed a chunk");
        let index_in_chunk = chunk.len();
        chunk.push(value);
        ((self.chunks.len() - 1) * self.chunk_size + index_in_chunk) as u32
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&T> {
        let index = index as usize;
        let chunk_index = index / self.chunk_size;
        let row = index % self.chunk_size;
        self.chunks.get(chunk_index).and_then(|c| c.get(row))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flatten()
    }
}

impl<T> Default for ChunkArray<T> {
    fn default() -> Self {
        Self::new(256)
    }
}

/// One recorded GPU command. The payload is intentionally coarse — this
/// crate's job ends at tracking *which resources* a command touched and
/// *where* it sits in the stream, not at encoding backend-specific bytes.
#[derive(Debug, Clone)]
pub enum Command {
    SetPipeline { pipeline_id: u64 },
    SetDepthStencil { descriptor_id: u64 },
    SetBindGroup { index: u32, bind_group_id: u64 },
    SetVertexBuffer { slot: u32, buffer: ResourceHandle },
    SetIndexBuffer { buffer: ResourceHandle },
    Draw { vertices: Range<u32>, instances: Range<u32> },
    DrawIndexed { indices: Range<u32>, base_vertex: i32, instances: Range<u32> },
    Dispatch { x: u32, y: u32, z: u32 },
    Copy { src: ResourceHandle, dst: ResourceHandle },
    PushConstants { offset: u32, size: u32 },
}

/// Per-pass recorder state. Created at the start of a pass callback, consumed
/// by the compiler once the pass's commands and usages have been captured.
pub struct CommandRecorder {
    pass_index: u32,
    commands: ChunkArray<Command>,
    read_resources: SmallVec<[ResourceHandle; 8]>,
    written_resources: SmallVec<[ResourceHandle; 8]>,
    side_effects: SmallVec<[(ResourceHandle, SideEffectFlags); 4]>,
    usages: UsageLog,
}

impl CommandRecorder {
    #[must_use]
    pub fn new(pass_index: u32) -> Self {
        Self {
            pass_index,
            commands: ChunkArray::default(),
            read_resources: SmallVec::new(),
            written_resources: SmallVec::new(),
            side_effects: SmallVec::new(),
            usages: UsageLog::new(),
        }
    }

    /// Flags `resource` as carrying one of the §4.5 step 2 side-effect
    /// properties (window-handle, history-buffer, external-ownership) this
    /// pass's own written-resource set cannot otherwise express — persistent
    /// lifetime is already visible on the handle itself
    /// ([`ResourceHandle::is_persistent`]), but a transient window/swapchain
    /// texture or an externally-owned write looks like any other transient
    /// write unless the callback calls out here. A pass whose callback is
    /// eager (§4.4) is the only place this is needed; lazy/external passes
    /// declare the same thing upfront via
    /// [`crate::orchestrator::FrameOrchestrator::add_external_callback_pass`].
    pub fn flag_side_effects(&mut self, resource: ResourceHandle, flags: SideEffectFlags) {
        if let Some(existing) = self.side_effects.iter_mut().find(|(r, _)| *r == resource) {
            existing.1 = SideEffectFlags {
                persistent: existing.1.persistent || flags.persistent,
                window_handle: existing.1.window_handle || flags.window_handle,
                history_buffer: existing.1.history_buffer || flags.history_buffer,
                external_ownership: existing.1.external_ownership || flags.external_ownership,
            };
        } else {
            self.side_effects.push((resource, flags));
        }
    }

    #[must_use]
    pub fn side_effects(&self) -> &[(ResourceHandle, SideEffectFlags)] {
        &self.side_effects
    }

    /// Appends `command` and the usage it implies. `command_range` is the
    /// single-command range `[index, index+1)` within this pass's local
    /// command stream; the compiler rebases it to a global range later
    /// (§4.5 step 7).
    pub fn record(
        &mut self,
        command: Command,
        resource: ResourceHandle,
        access: AccessKind,
        stages: RenderStages,
        subresources: SubresourceMask,
    ) -> u32 {
        let index = self.commands.push(command);
        if access.is_write() {
            if !self.written_resources.contains(&resource) {
                self.written_resources.push(resource);
            }
        } else if !self.read_resources.contains(&resource) {
            self.read_resources.push(resource);
        }
        self.usages.merge_or_append(ResourceUsage {
            resource,
            pass_index: self.pass_index,
            command_range: index..index + 1,
            access,
            stages,
            subresources,
        });
        index
    }

    /// Appends `command` without registering any resource access. For
    /// pipeline/bind-group/push-constant state changes (§4.7), which bind no
    /// resource of their own — recording them through [`Self::record`]
    /// against the next draw's resource would misfile that resource as read
    /// and pollute its usage timeline with an empty-access entry.
    pub fn record_state_change(&mut self, command: Command) -> u32 {
        self.commands.push(command)
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub fn read_resources(&self) -> &[ResourceHandle] {
        &self.read_resources
    }

    #[must_use]
    pub fn written_resources(&self) -> &[ResourceHandle] {
        &self.written_resources
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Consumes the recorder, returning its usage log for merging into the
    /// frame-wide log once the pass survives culling.
    #[must_use]
    pub fn into_usages(self) -> UsageLog {
        self.usages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Lifetime, ResourceKind};

    fn handle(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Buffer, Lifetime::Transient, 0, 0, index)
    }

    #[test]
    fn chunk_array_spans_chunk_boundaries() {
        let mut array: ChunkArray<u32> = ChunkArray::new(2);
        let a = array.push(10);
        let b = array.push(20);
        let c = array.push(30);
        assert_eq!(array.get(a), Some(&10));
        assert_eq!(array.get(b), Some(&20));
        assert_eq!(array.get(c), Some(&30));
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn record_splits_reads_and_writes() {
        let mut recorder = CommandRecorder::new(0);
        recorder.record(
            Command::SetVertexBuffer { slot: 0, buffer: handle(1) },
            handle(1),
            AccessKind::VERTEX_BUFFER,
            RenderStages::VERTEX,
            SubresourceMask::full(),
        );
        recorder.record(
            Command::Draw { vertices: 0..3, instances: 0..1 },
            handle(2),
            AccessKind::RENDER_TARGET_COLOR,
            RenderStages::FRAGMENT,
            SubresourceMask::full(),
        );
        assert_eq!(recorder.read_resources(), &[handle(1)]);
        assert_eq!(recorder.written_resources(), &[handle(2)]);
        assert_eq!(recorder.command_count(), 2);
    }
}
