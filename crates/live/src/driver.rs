//! Background driver tying the scheduler to a worker
//!
//! All scheduler transitions happen on one thread. Edits, worker responses
//! and control messages arrive through a single event channel, so they are
//! handled strictly one at a time. Timers are the channel's receive
//! deadline.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};

use crate::request::{DiffRequest, DiffResponse};
use crate::scheduler::{RequestScheduler, ResponseOutcome, SchedulerConfig, SchedulerStats, Submission};
use crate::worker::{ComputeFn, DiffWorker};

enum Event {
    Edit(DiffRequest),
    Response(DiffResponse),
    RestartWorker,
    Stats(Sender<SchedulerStats>),
    Shutdown,
}

/// Handle to a running live diff
///
/// Published responses arrive on the receiver returned by
/// [`spawn`](Self::spawn), newest last and never out of order.
pub struct LiveDiff {
    events: Sender<Event>,
    handle: Option<JoinHandle<()>>,
}

impl LiveDiff {
    pub fn spawn(config: SchedulerConfig) -> Result<(Self, Receiver<DiffResponse>)> {
        Self::spawn_with(config, Arc::new(DiffRequest::compute))
    }

    /// Like [`spawn`](Self::spawn), with a custom diff function
    pub fn spawn_with(
        config: SchedulerConfig,
        compute: ComputeFn,
    ) -> Result<(Self, Receiver<DiffResponse>)> {
        let (events_tx, events_rx) = flume::unbounded();
        let (updates_tx, updates_rx) = flume::unbounded();

        let driver = Driver {
            scheduler: RequestScheduler::new(config),
            worker: None,
            compute,
            events: events_rx,
            replies: events_tx.clone(),
            updates: updates_tx,
        };
        let handle = thread::Builder::new()
            .name("live-diff".into())
            .spawn(move || driver.run())?;

        Ok((
            Self {
                events: events_tx,
                handle: Some(handle),
            },
            updates_rx,
        ))
    }

    /// Schedule a diff of freshly edited content
    pub fn submit_edit(&self, request: DiffRequest) -> Result<()> {
        self.send(Event::Edit(request))
    }

    /// Replace the worker, e.g. after it stopped answering. The newest
    /// pending edit goes to the new worker right away.
    pub fn restart_worker(&self) -> Result<()> {
        self.send(Event::RestartWorker)
    }

    pub fn stats(&self) -> Result<SchedulerStats> {
        let (tx, rx) = flume::bounded(1);
        self.send(Event::Stats(tx))?;
        rx.recv()
            .map_err(|_| anyhow!("live diff driver stopped before reporting stats"))
    }

    /// Stop the driver and its worker
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.events.send(Event::Shutdown);
            if handle.join().is_err() {
                warn!("Live diff driver thread panicked");
            }
        }
    }

    fn send(&self, event: Event) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| anyhow!("live diff driver has stopped"))
    }
}

impl Drop for LiveDiff {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Driver {
    scheduler: RequestScheduler,
    worker: Option<DiffWorker>,
    compute: ComputeFn,
    events: Receiver<Event>,
    replies: Sender<Event>,
    updates: Sender<DiffResponse>,
}

impl Driver {
    fn run(mut self) {
        info!("Live diff driver started");
        self.start_worker();

        loop {
            let received = match self.scheduler.next_deadline() {
                Some(deadline) => self.events.recv_deadline(deadline),
                None => self.events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            let event = match received {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(submission) = self.scheduler.poll(Instant::now()) {
                        self.dispatch(submission);
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match event {
                Event::Edit(request) => {
                    if let Some(submission) = self.scheduler.on_edit(request, Instant::now()) {
                        self.dispatch(submission);
                    }
                }
                Event::Response(response) => self.publish(response),
                Event::RestartWorker => {
                    info!("Restarting diff worker");
                    self.stop_worker();
                    self.scheduler.cancel_timers();
                    self.start_worker();
                    if let Some(submission) = self.scheduler.poll(Instant::now()) {
                        self.dispatch(submission);
                    }
                }
                Event::Stats(reply) => {
                    let _ = reply.send(self.scheduler.stats());
                }
                Event::Shutdown => break,
            }
        }

        self.scheduler.reset();
        self.stop_worker();
        info!("Live diff driver stopped");
    }

    fn start_worker(&mut self) {
        let replies = self.replies.clone();
        let worker = DiffWorker::spawn_with(self.compute.clone(), move |response| {
            let _ = replies.send(Event::Response(response));
        });

        match worker {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => error!("Failed to start diff worker: {}", e),
        }
    }

    // The old worker may be stuck in a computation; never wait for it here.
    // Its late replies carry older sequence numbers and are dropped as stale.
    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.detach();
        }
    }

    fn dispatch(&mut self, submission: Submission) {
        let Some(worker) = self.worker.as_ref() else {
            warn!("No diff worker, holding request {}", submission.seq);
            self.scheduler.requeue(submission);
            return;
        };

        if let Err(e) = worker.submit(submission.seq, submission.request.clone()) {
            error!("Failed to submit request {}: {}", submission.seq, e);
            self.stop_worker();
            self.scheduler.requeue(submission);
        }
    }

    fn publish(&mut self, response: DiffResponse) {
        match self.scheduler.on_response(response, Instant::now()) {
            ResponseOutcome::Published(response) => {
                trace!("Publishing response {}", response.seq);
                if self.updates.send(response).is_err() {
                    debug!("Nobody is listening for diff updates");
                }
            }
            ResponseOutcome::Stale(response) => {
                trace!("Discarded stale response {}", response.seq);
            }
        }
    }
}
