//! Pass records and per-pass command capture (C4, §4.4).

mod callback;
mod record;
mod recorder;

pub use callback::{EnqueuedPass, PassCallback};
pub use record::{
    Attachment, ClearOp, ClearValue, PassKind, PassRecord, RenderTargetDescriptor, ResolveTarget,
    SideEffectFlags,
};
pub use recorder::{ChunkArray, Command, CommandRecorder};
