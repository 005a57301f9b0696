//! Upload pipeline: size check, bounded FIFO admission, simulated progress, persistence
//! and rollback.

mod errors;
mod limiter;
mod pipeline;
mod progress;

pub use errors::{UploadErrorEntry, UploadErrorList};
pub use limiter::{Admission, UploadLimiter, UploadPermit};
pub use pipeline::{
    SlotUploadState, UploadError, UploadEvent, UploadPhase, UploadPipeline, UploadRequest,
    UploadTicket,
};
pub use progress::SimulatedProgress;
