//! Pass callbacks and the enqueued-pass wrapper (§4.8, §9 "callback-heavy
//! pass types").
//!
//! A pass's callback is kept separate from [`PassRecord`] itself — the
//! record is plain, clonable bookkeeping data; the callback is a boxed
//! closure the client supplies at enqueue time and the compiler invokes
//! exactly once (or never, if culled).

use super::record::PassRecord;
use super::recorder::CommandRecorder;

/// A pass callback records commands into the [`CommandRecorder`] it is
/// given. `Send` so the compiler can run GPU-pass callbacks as concurrent
/// worker tasks during usage evaluation (§5).
pub type PassCallback = Box<dyn FnMut(&mut CommandRecorder) + Send>;

/// One client-enqueued pass: its bookkeeping record plus the callback that
/// records its commands.
pub struct EnqueuedPass {
    pub record: PassRecord,
    pub callback: PassCallback,
}

impl EnqueuedPass {
    #[must_use]
    pub fn new(record: PassRecord, callback: PassCallback) -> Self {
        Self { record, callback }
    }
}
