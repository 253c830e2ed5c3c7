//! Backend interface (§6 "Backend interface").
//!
//! The backend translates compiled schedules into GPU API calls. It is an
//! external collaborator (§1 "Non-goals": backend translation to GPU APIs
//! is out of scope) — this module only defines the boundary the core calls
//! across.

use crate::compiler::DependencyTable;
use crate::pass::PassRecord;
use crate::resource::{BufferDescriptor, PixelFormat, ResourceHandle, TextureDescriptor};

/// Opaque path describing where an argument buffer or push-constant block
/// binds in a backend's native binding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingPath {
    pub set: u32,
    pub binding: u32,
}

/// Backend-reported byte size and alignment for a resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAndAlignment {
    pub size: u64,
    pub alignment: u64,
}

/// Backend-reported memory requirements for an acceleration structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelerationStructureSizes {
    pub acceleration_structure_size: u64,
    pub build_scratch_size: u64,
    pub update_scratch_size: u64,
}

/// Opaque pipeline reflection data a backend derives from shader modules.
/// The core only threads this value through; it never inspects it.
pub trait Reflection: Send + Sync {}

/// A handle the backend resolves when submitted work completes, used by the
/// orchestrator to release the inflight-frame permit and fire completion
/// observers (§4.8 step 8).
pub trait CompletionHandle: Send {
    /// Blocks (or, in an async context, awaits) until the backend signals
    /// completion, returning `Ok(())` or the submission failure (§7).
    fn wait(self) -> crate::errors::Result<()>;
}

/// The collaborator this crate calls out to; never implemented by this
/// crate itself. A real backend translates `execute_render_graph`'s input
/// into command buffers and submits them.
pub trait Backend: Send + Sync {
    /// Materialises a persistent resource on first use. Returns `false` on
    /// allocation failure (e.g. GPU OOM); the core immediately disposes the
    /// handle and propagates a typed error (§7).
    fn materialise_persistent(&self, resource: ResourceHandle) -> bool;

    fn dispose(&self, resource: ResourceHandle);

    fn render_pipeline_reflection(
        &self,
        descriptor: &TextureDescriptor,
        render_target: &crate::pass::RenderTargetDescriptor,
    ) -> Option<Box<dyn Reflection>>;

    fn compute_pipeline_reflection(&self, descriptor: &BufferDescriptor) -> Option<Box<dyn Reflection>>;

    fn supports_pixel_format(&self, format: PixelFormat, usage: crate::resource::TextureUsage) -> bool;

    fn size_and_alignment(&self, descriptor: &TextureDescriptor) -> SizeAndAlignment;

    fn acceleration_structure_sizes(&self, descriptor: &BufferDescriptor) -> AccelerationStructureSizes;

    /// Submits the compiled schedule. `used_resources` is every resource any
    /// surviving pass touched; `dependencies` is the reduced dependency
    /// table the compiler produced.
    fn execute_render_graph(
        &self,
        passes: &[PassRecord],
        used_resources: &[ResourceHandle],
        dependencies: &DependencyTable,
    ) -> Box<dyn CompletionHandle>;

    fn argument_buffer_path(&self, index: u32, stages: crate::usage::RenderStages) -> BindingPath;

    fn push_constant_path(&self) -> BindingPath;
}
