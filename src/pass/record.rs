//! Pass records (§3 "Pass record").

use smallvec::SmallVec;
use std::ops::Range;

use crate::resource::{PixelFormat, ResourceHandle};

/// What a pass is allowed to do, and how it is scheduled relative to culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Draw,
    Compute,
    Blit,
    External,
    Cpu,
}

/// Per-attachment clear behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearOp {
    Discard,
    Keep,
    Clear(ClearValue),
}

/// The value written by a [`ClearOp::Clear`], shaped to cover both colour and
/// depth/stencil attachments without a separate type per attachment kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// A view onto a texture bound as one render-target slot: the texture plus
/// the subresource it binds (mip level, array slice, depth plane) and an
/// optional resolve target for multisample attachments (§GLOSSARY
/// "Attachment").
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub texture: ResourceHandle,
    pub mip_level: u32,
    pub slice: u32,
    pub depth_plane: u32,
    pub resolve: Option<ResolveTarget>,
    /// `(width >> mip_level, height >> mip_level)`, precomputed by the
    /// caller from the texture descriptor so the merge predicate (§4.6) does
    /// not need registry access.
    pub extent: (u32, u32),
    pub clear: ClearOp,
    pub format: PixelFormat,
}

/// The resolve half of a multisample [`Attachment`]: `(texture, mip, slice,
/// depth-plane)`, compared as a whole per §4.6 "equal resolve-texture triples".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTarget {
    pub texture: ResourceHandle,
    pub mip_level: u32,
    pub slice: u32,
    pub depth_plane: u32,
}

/// The render targets a draw pass writes to.
///
/// Up to 8 colour attachment slots (§3), each addressed by slot index so the
/// §4.6 merge predicate can compare "corresponding attachment slots" across
/// two passes; plus an optional depth, stencil, visibility buffer, and the
/// array length shared by every attachment.
#[derive(Debug, Clone, Default)]
pub struct RenderTargetDescriptor {
    pub color_attachments: [Option<Attachment>; 8],
    pub depth: Option<Attachment>,
    pub stencil: Option<Attachment>,
    pub visibility_buffer: Option<ResourceHandle>,
    pub array_length: u32,
}

impl RenderTargetDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            array_length: 1,
            ..Default::default()
        }
    }

    /// Sets colour slot `index` (0..8). Panics if `index >= 8` — declaring
    /// more than 8 colour attachments is a programmer error surfaced as
    /// [`crate::errors::FrameGraphError::TooManyColorAttachments`] by the
    /// caller that validates pass declarations, not here.
    pub fn set_color(&mut self, index: usize, attachment: Attachment) {
        self.color_attachments[index] = Some(attachment);
    }

    #[must_use]
    pub fn color_count(&self) -> usize {
        self.color_attachments.iter().filter(|a| a.is_some()).count()
    }
}

/// Flags a resource write can carry that make the owning pass's writes
/// unconditionally observable (§4.5 step 2: "side effects").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideEffectFlags {
    pub persistent: bool,
    pub window_handle: bool,
    pub history_buffer: bool,
    pub external_ownership: bool,
}

impl SideEffectFlags {
    #[must_use]
    pub fn any(self) -> bool {
        self.persistent || self.window_handle || self.history_buffer || self.external_ownership
    }
}

/// One enqueued pass, tracked from declaration through compile.
pub struct PassRecord {
    pub index: u32,
    pub kind: PassKind,
    pub name: String,
    pub declared_reads: SmallVec<[ResourceHandle; 8]>,
    pub declared_writes: SmallVec<[ResourceHandle; 8]>,
    /// Set during usage evaluation (§4.5 step 1) from either the callback's
    /// actual accesses (eager passes) or `declared_reads`/`declared_writes`
    /// (lazy passes).
    pub read_resources: SmallVec<[ResourceHandle; 8]>,
    pub written_resources: SmallVec<[ResourceHandle; 8]>,
    /// Parallel to `written_resources` (not `declared_writes`) once usage
    /// evaluation has run: for lazy passes the two coincide by construction;
    /// for eager passes this is filled from whatever the callback flagged
    /// via [`crate::pass::CommandRecorder::flag_side_effects`].
    pub write_side_effects: SmallVec<[SideEffectFlags; 8]>,
    pub command_range: Range<u32>,
    pub is_active: bool,
    pub uses_window_texture: bool,
    pub has_side_effects: bool,
    pub render_target: Option<RenderTargetDescriptor>,
}

impl PassRecord {
    #[must_use]
    pub fn new(index: u32, kind: PassKind, name: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            name: name.into(),
            declared_reads: SmallVec::new(),
            declared_writes: SmallVec::new(),
            read_resources: SmallVec::new(),
            written_resources: SmallVec::new(),
            write_side_effects: SmallVec::new(),
            command_range: 0..0,
            is_active: false,
            uses_window_texture: false,
            has_side_effects: false,
            render_target: None,
        }
    }

    /// Eager passes infer their accesses from recorded commands; the
    /// declaration set is left empty on purpose (§4.4).
    #[must_use]
    pub fn is_eager(&self) -> bool {
        self.declared_writes.is_empty()
    }
}
