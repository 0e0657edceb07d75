//! Isolated diff worker
//!
//! The worker owns its threads and a request channel. It shares no state
//! with its caller: requests go in by value, responses come out through the
//! reply callback. A computation that panics is answered with an empty
//! response so a single bad request never takes the worker down.
//!
//! Two threads pull from the queue. The scheduler keeps one request in
//! flight, so normally only one of them is busy; the second lets an overdue
//! request be overtaken by a newer one.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use derive_more::Display;
use log::{debug, info, trace, warn};
use text_diff::DiffOperation;

use crate::request::{DiffRequest, DiffResponse};

/// Threads per worker
pub const WORKER_THREADS: usize = 2;

/// The diff function a worker runs for every request
pub type ComputeFn = Arc<dyn Fn(&DiffRequest) -> Vec<DiffOperation> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WorkerError {
    #[display(fmt = "diff worker is unavailable")]
    Unavailable,
}

impl std::error::Error for WorkerError {}

struct Job {
    seq: u64,
    request: DiffRequest,
}

pub struct DiffWorker {
    requests: Option<flume::Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl DiffWorker {
    /// Start a worker running the standard diff
    pub fn spawn<F>(reply: F) -> anyhow::Result<Self>
    where
        F: Fn(DiffResponse) + Send + Sync + 'static,
    {
        Self::spawn_with(Arc::new(DiffRequest::compute), reply)
    }

    /// Start a worker running `compute` for each request
    pub fn spawn_with<F>(compute: ComputeFn, reply: F) -> anyhow::Result<Self>
    where
        F: Fn(DiffResponse) + Send + Sync + 'static,
    {
        let (tx, rx) = flume::unbounded::<Job>();
        let reply = Arc::new(reply);

        let mut worker = Self {
            requests: Some(tx),
            handles: Vec::with_capacity(WORKER_THREADS),
        };
        for index in 0..WORKER_THREADS {
            let rx = rx.clone();
            let compute = compute.clone();
            let reply = reply.clone();

            let handle = thread::Builder::new()
                .name(format!("diff-worker-{}", index))
                .spawn(move || {
                    debug!("Diff worker thread {} started", index);
                    for job in rx.iter() {
                        reply(run_job(&compute, job));
                    }
                    debug!("Diff worker thread {} stopped", index);
                })?;
            worker.handles.push(handle);
        }

        info!("Diff worker started with {} threads", WORKER_THREADS);
        Ok(worker)
    }

    /// Queue a request; the response arrives through the reply callback
    pub fn submit(&self, seq: u64, request: DiffRequest) -> Result<(), WorkerError> {
        let requests = self.requests.as_ref().ok_or(WorkerError::Unavailable)?;
        requests
            .send(Job { seq, request })
            .map_err(|_| WorkerError::Unavailable)
    }

    pub fn is_running(&self) -> bool {
        self.requests.is_some() && self.handles.iter().any(|handle| !handle.is_finished())
    }

    /// Stop accepting requests and wait for the queued ones to finish
    pub fn shutdown(&mut self) {
        if self.requests.take().is_none() {
            return;
        }
        debug!("Waiting for diff worker to stop");
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("Diff worker thread panicked");
            }
        }
        info!("Diff worker stopped");
    }

    /// Stop accepting requests without waiting for the threads. A
    /// computation still running finishes in the background and its reply is
    /// still delivered.
    pub fn detach(mut self) {
        self.requests.take();
        let busy = self
            .handles
            .drain(..)
            .filter(|handle| !handle.is_finished())
            .count();
        if busy > 0 {
            debug!("Detached diff worker with {} busy threads", busy);
        }
    }
}

impl Drop for DiffWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job(compute: &ComputeFn, job: Job) -> DiffResponse {
    let Job { seq, request } = job;
    trace!(
        "Computing diff {} ({} / {} bytes)",
        seq,
        request.left_text.len(),
        request.right_text.len()
    );

    match panic::catch_unwind(AssertUnwindSafe(|| compute(&request))) {
        Ok(operations) => {
            trace!("Diff {} produced {} operations", seq, operations.len());
            DiffResponse::new(seq, operations)
        }
        Err(_) => {
            warn!("Diff computation {} panicked, answering with an empty result", seq);
            DiffResponse::empty(seq)
        }
    }
}
