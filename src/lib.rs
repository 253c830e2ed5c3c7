#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::doc_markdown)]

//! A frame render-graph compiler and scheduler for explicit GPU APIs.
//!
//! A client enqueues draw/compute/blit/external/cpu passes for one frame;
//! each pass declares the resources it reads and writes and records GPU
//! commands through [`pass::CommandRecorder`]. [`compiler::PassCompiler`]
//! turns the enqueued passes into a dependency-ordered, dead-code-eliminated
//! schedule with a globally indexed command stream and per-resource usage
//! timelines, ready for a [`backend::Backend`] to translate into barriers
//! and submit.

pub mod arena;
pub mod backend;
pub mod client;
pub mod compiler;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod map;
pub mod merge;
pub mod orchestrator;
pub mod pass;
pub mod resource;
pub mod usage;

pub use arena::{Tag, TagArena};
pub use backend::Backend;
pub use compiler::{CompiledGraph, DependencyEdge, DependencyTable, PassCompiler};
pub use config::FrameGraphConfig;
pub use encoder::TypedEncoder;
pub use errors::{FrameGraphError, Result};
pub use map::ResourceMap;
pub use merge::{mergeable, try_merge};
pub use orchestrator::{FrameOrchestrator, PassSpan};
pub use pass::{
    Attachment, ClearOp, ClearValue, Command, CommandRecorder, EnqueuedPass, PassCallback,
    PassKind, PassRecord, RenderTargetDescriptor, ResolveTarget,
};
pub use resource::{
    allocate_persistent, BufferDescriptor, Lifetime, PersistentRegistry, PixelFormat, ResourceHandle,
    ResourceKind, SubresourceMask, TextureDescriptor, TransientRegistry,
};
pub use usage::{AccessKind, RenderStages, ResourceUsage, UsageLog};
