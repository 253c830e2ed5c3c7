//! Resource usage tracking (C4, §4.3).
//!
//! Every read or write a pass makes against a resource is recorded as a
//! [`ResourceUsage`]. The [`UsageLog`] keeps one timeline per resource,
//! sorted by `pass_index` and merged where adjacent usages agree on access
//! kind and stage — the dependency table (§4.5 step 2) walks these timelines
//! rather than re-deriving access patterns from the command stream.

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::ops::Range;

use crate::resource::{ResourceHandle, SubresourceMask};

bitflags! {
    /// What a pass did with a resource during one usage interval.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessKind: u32 {
        const SHADER_READ        = 1 << 0;
        const SHADER_WRITE       = 1 << 1;
        const SHADER_READ_WRITE  = 1 << 2;
        const VERTEX_BUFFER      = 1 << 3;
        const INDEX_BUFFER       = 1 << 4;
        const INDIRECT_BUFFER    = 1 << 5;
        const CONSTANT_BUFFER    = 1 << 6;
        const RENDER_TARGET_COLOR   = 1 << 7;
        const RENDER_TARGET_DEPTH   = 1 << 8;
        const RENDER_TARGET_STENCIL = 1 << 9;
        const INPUT_ATTACHMENT   = 1 << 10;
        const BLIT_SOURCE        = 1 << 11;
        const BLIT_DESTINATION   = 1 << 12;
        const CPU_READ           = 1 << 13;
        const CPU_WRITE          = 1 << 14;
    }

    /// Which pipeline stage(s) performed the access.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderStages: u32 {
        const VERTEX   = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE  = 1 << 2;
        const TILE     = 1 << 3;
        const MESH     = 1 << 4;
        const OBJECT   = 1 << 5;
        const BLIT     = 1 << 6;
        const EXTERNAL = 1 << 7;
    }
}

impl AccessKind {
    /// Writes are any bit that mutates the resource or one of its render
    /// target slots; everything else is a pure read.
    #[must_use]
    pub fn is_write(self) -> bool {
        self.intersects(
            Self::SHADER_WRITE
                | Self::SHADER_READ_WRITE
                | Self::RENDER_TARGET_COLOR
                | Self::RENDER_TARGET_DEPTH
                | Self::RENDER_TARGET_STENCIL
                | Self::BLIT_DESTINATION
                | Self::CPU_WRITE,
        )
    }
}

/// One interval of a resource's usage timeline: which pass touched it, over
/// what command-index range, how, and over which subresources.
#[derive(Debug, Clone)]
pub struct ResourceUsage {
    pub resource: ResourceHandle,
    pub pass_index: u32,
    pub command_range: Range<u32>,
    pub access: AccessKind,
    pub stages: RenderStages,
    pub subresources: SubresourceMask,
}

impl ResourceUsage {
    /// Two usages merge per §4.3 when they come from the same pass, agree on
    /// access kind, stage, and subresource mask, and `other`'s range is
    /// contiguous with (immediately follows) this one. Anything else — a
    /// different subresource mask, or a gap where some other resource's
    /// command sits between the two — stays as separate timeline entries, or
    /// the merged range would silently claim coverage of commands this
    /// resource was never touched by.
    fn mergeable_with(&self, other: &Self) -> bool {
        self.pass_index == other.pass_index
            && self.access == other.access
            && self.stages == other.stages
            && self.subresources == other.subresources
            && self.command_range.end == other.command_range.start
    }
}

/// Per-resource usage timelines, keyed by the resource's packed identity.
#[derive(Default)]
pub struct UsageLog {
    timelines: FxHashMap<u64, SmallVec<[ResourceUsage; 4]>>,
}

impl UsageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `usage`, merging it into the last entry for the same
    /// resource when [`ResourceUsage::mergeable_with`] holds, otherwise
    /// appending a new entry.
    ///
    /// Entries are expected to arrive in non-decreasing `pass_index` order
    /// (the order passes are evaluated in, §4.5 step 1) — merge only ever
    /// looks at the most recent entry, it does not re-sort the timeline.
    pub fn merge_or_append(&mut self, usage: ResourceUsage) {
        let key = usage.resource.to_bits();
        let timeline = self.timelines.entry(key).or_default();
        if let Some(last) = timeline.last_mut() {
            if last.mergeable_with(&usage) {
                last.command_range.end = usage.command_range.end;
                return;
            }
        }
        timeline.push(usage);
    }

    #[must_use]
    pub fn timeline(&self, resource: ResourceHandle) -> &[ResourceUsage] {
        self.timelines
            .get(&resource.to_bits())
            .map_or(&[], SmallVec::as_slice)
    }

    #[must_use]
    pub fn resources(&self) -> impl Iterator<Item = u64> + '_ {
        self.timelines.keys().copied()
    }

    /// Consumes the log, yielding every recorded usage across every
    /// resource. Used when folding one pass's local usage log into the
    /// frame-wide log after command-index rebasing (§4.5 step 7).
    pub fn into_entries(self) -> impl Iterator<Item = ResourceUsage> {
        self.timelines.into_values().flatten()
    }

    pub fn clear(&mut self) {
        self.timelines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Lifetime, ResourceKind};

    fn handle() -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Texture, Lifetime::Transient, 0, 0, 0)
    }

    #[test]
    fn merges_adjacent_usages_from_the_same_pass() {
        let mut log = UsageLog::new();
        log.merge_or_append(ResourceUsage {
            resource: handle(),
            pass_index: 3,
            command_range: 0..2,
            access: AccessKind::SHADER_READ,
            stages: RenderStages::FRAGMENT,
            subresources: SubresourceMask::full(),
        });
        log.merge_or_append(ResourceUsage {
            resource: handle(),
            pass_index: 3,
            command_range: 2..5,
            access: AccessKind::SHADER_READ,
            stages: RenderStages::FRAGMENT,
            subresources: SubresourceMask::full(),
        });
        let timeline = log.timeline(handle());
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].command_range, 0..5);
    }

    #[test]
    fn does_not_merge_across_different_passes() {
        let mut log = UsageLog::new();
        log.merge_or_append(ResourceUsage {
            resource: handle(),
            pass_index: 1,
            command_range: 0..1,
            access: AccessKind::SHADER_READ,
            stages: RenderStages::FRAGMENT,
            subresources: SubresourceMask::full(),
        });
        log.merge_or_append(ResourceUsage {
            resource: handle(),
            pass_index: 2,
            command_range: 0..1,
            access: AccessKind::SHADER_READ,
            stages: RenderStages::FRAGMENT,
            subresources: SubresourceMask::full(),
        });
        assert_eq!(log.timeline(handle()).len(), 2);
    }

    #[test]
    fn is_write_detects_render_target_and_shader_writes() {
        assert!(AccessKind::RENDER_TARGET_COLOR.is_write());
        assert!(AccessKind::SHADER_READ_WRITE.is_write());
        assert!(!AccessKind::SHADER_READ.is_write());
    }
}
