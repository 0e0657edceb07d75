//! Live diffing between two editable buffers
//!
//! Edits are snapshotted into immutable requests, throttled by the
//! scheduler, computed on an isolated worker thread, and published back
//! in order so a stale result never replaces a fresher one.

mod buffer;
mod driver;
mod request;
mod scheduler;
mod session;
mod worker;

pub use buffer::{BufferId, BufferProvider, BufferSnapshot, BufferStore, ComparePair, ContentSink};
pub use driver::LiveDiff;
pub use request::{DiffRequest, DiffResponse};
pub use scheduler::{
    RequestScheduler, ResponseOutcome, SchedulerConfig, SchedulerState, SchedulerStats, Submission,
};
pub use session::CompareSession;
pub use worker::{ComputeFn, DiffWorker, WorkerError, WORKER_THREADS};
