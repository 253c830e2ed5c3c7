//! Error Types
//!
//! This module defines the error types the compiler and orchestrator can
//! return. Programmer errors that indicate a bug in the calling code (an
//! invalid transient handle, a disposed handle, more than 8 colour
//! attachments, a pass-callback panic) are **not** represented here — per
//! spec §7 they remain `panic!`s, since they are not recoverable conditions
//! a caller should be expected to handle.
//!
//! All public fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, FrameGraphError>`.

use thiserror::Error;

use crate::resource::ResourceHandle;

/// The error type returned by fallible operations in this crate.
#[derive(Error, Debug)]
pub enum FrameGraphError {
    /// Backend failed to materialise a persistent resource (e.g. GPU OOM).
    ///
    /// Per spec §7, the handle is disposed immediately; this error is the
    /// typed failure propagated to the client constructor.
    #[error("failed to materialise persistent resource {handle:?}")]
    MaterialisationFailed {
        /// The handle that failed to materialise (already disposed).
        handle: ResourceHandle,
    },

    /// The backend rejected a render/compute pipeline-state creation.
    #[error("pipeline state creation failed: {0}")]
    PipelineStateFailed(String),

    /// `execute_render_graph` reported a submission failure.
    #[error("backend submission failed: {0}")]
    SubmissionFailed(String),

    /// A pass declared more than 8 colour attachments.
    #[error("render target for pass {pass_name:?} declares {count} colour attachments, max is 8")]
    TooManyColorAttachments {
        /// Name of the offending pass.
        pass_name: String,
        /// The attachment count that was rejected.
        count: usize,
    },
}

/// Alias for `Result<T, FrameGraphError>`.
pub type Result<T> = std::result::Result<T, FrameGraphError>;
