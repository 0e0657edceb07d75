//! Request scheduling for live diffs
//!
//! The scheduler decides when an edit becomes a diff request. It keeps at
//! most one request in flight, coalesces edits made meanwhile into a single
//! pending request holding the newest snapshot, waits for a quiet period
//! after each response before submitting again, and forces a submission if
//! the in-flight request takes too long. Responses are published in
//! sequence order; anything older than the last published response is
//! dropped.
//!
//! The scheduler is a plain state machine. Callers pass in the current
//! time and act on what it returns, which keeps it deterministic under test.

use std::time::{Duration, Instant};

use derive_more::Display;
use log::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::request::{DiffRequest, DiffResponse};

/// Timing policy of a [`RequestScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// How long to wait after a response before submitting the pending request
    pub quiet_period: Duration,

    /// How long an in-flight request may block a pending one
    pub force_submit_after: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(100),
            force_submit_after: Duration::from_secs(3),
        }
    }
}

impl SchedulerConfig {
    pub fn quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    pub fn force_submit_after(mut self, force_submit_after: Duration) -> Self {
        self.force_submit_after = force_submit_after;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SchedulerState {
    /// Nothing in flight; a pending request may be waiting out the quiet period
    Idle,

    /// One request in flight, nothing waiting
    Inflight,

    /// One request in flight and a newer snapshot waiting behind it
    InflightWithPending,
}

/// A request the caller must hand to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub seq: u64,
    pub request: DiffRequest,
}

/// What to do with a response handed to [`RequestScheduler::on_response`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Newest result so far; display it
    Published(DiffResponse),

    /// Older than what is already displayed; drop it
    Stale(DiffResponse),
}

impl ResponseOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, ResponseOutcome::Published(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedulerStats {
    pub edits: u64,
    pub submitted: u64,
    pub published: u64,
    pub stale: u64,
}

#[derive(Debug, Clone, Copy)]
struct Inflight {
    seq: u64,
    submitted_at: Instant,
}

#[derive(Debug)]
pub struct RequestScheduler {
    config: SchedulerConfig,
    pending: Option<DiffRequest>,
    inflight: Option<Inflight>,
    quiet_until: Option<Instant>,
    last_response_at: Option<Instant>,
    last_published: Option<u64>,
    next_seq: u64,
    stats: SchedulerStats,
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl RequestScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            pending: None,
            inflight: None,
            quiet_until: None,
            last_response_at: None,
            last_published: None,
            next_seq: 1,
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn state(&self) -> SchedulerState {
        match (self.inflight.is_some(), self.pending.is_some()) {
            (false, _) => SchedulerState::Idle,
            (true, false) => SchedulerState::Inflight,
            (true, true) => SchedulerState::InflightWithPending,
        }
    }

    pub fn pending(&self) -> Option<&DiffRequest> {
        self.pending.as_ref()
    }

    /// Sequence number of the request currently in flight
    pub fn inflight(&self) -> Option<u64> {
        self.inflight.map(|inflight| inflight.seq)
    }

    /// Sequence number of the newest published response
    pub fn last_published(&self) -> Option<u64> {
        self.last_published
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Record an edit. The request replaces any pending one.
    pub fn on_edit(&mut self, request: DiffRequest, now: Instant) -> Option<Submission> {
        self.stats.edits += 1;
        if self.pending.replace(request).is_some() {
            trace!("Coalescing edit into the pending request");
        }

        match self.inflight {
            None => match self.quiet_deadline() {
                Some(quiet_until) if now < quiet_until => {
                    self.quiet_until = Some(quiet_until);
                    None
                }
                _ => self.submit(now),
            },
            Some(inflight) if self.overdue(inflight, now) => {
                debug!(
                    "Request {} is overdue, submitting a newer one alongside it",
                    inflight.seq
                );
                self.submit(now)
            }
            Some(_) => None,
        }
    }

    /// Record a response from the worker
    pub fn on_response(&mut self, response: DiffResponse, now: Instant) -> ResponseOutcome {
        let clears_inflight = self
            .inflight
            .is_some_and(|inflight| response.seq >= inflight.seq);
        let stale = self
            .last_published
            .is_some_and(|last| response.seq <= last);

        if clears_inflight {
            self.inflight = None;
        }
        // A stale straggler must not push the quiet window back
        if clears_inflight || !stale {
            self.last_response_at = Some(now);
            if self.inflight.is_none() && self.pending.is_some() {
                self.quiet_until = Some(now + self.config.quiet_period);
            }
        }

        if stale {
            debug!(
                "Dropping stale response {} (already showing {:?})",
                response.seq, self.last_published
            );
            self.stats.stale += 1;
            return ResponseOutcome::Stale(response);
        }

        self.last_published = Some(response.seq);
        self.stats.published += 1;
        ResponseOutcome::Published(response)
    }

    /// Fire whichever timer has expired
    pub fn poll(&mut self, now: Instant) -> Option<Submission> {
        self.pending.as_ref()?;

        match self.inflight {
            None => match self.quiet_until {
                Some(quiet_until) if now < quiet_until => None,
                _ => self.submit(now),
            },
            Some(inflight) if self.overdue(inflight, now) => {
                debug!(
                    "Request {} is overdue, submitting a newer one alongside it",
                    inflight.seq
                );
                self.submit(now)
            }
            Some(_) => None,
        }
    }

    /// When [`poll`](Self::poll) should next be called, if at all
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;

        match self.inflight {
            None => self.quiet_until,
            Some(inflight) => Some(inflight.submitted_at + self.config.force_submit_after),
        }
    }

    /// Hand back a submission the worker could not take. A newer pending
    /// edit wins over the returned request.
    pub fn requeue(&mut self, submission: Submission) {
        debug!("Request {} was not accepted, keeping it pending", submission.seq);
        if self.inflight.is_some_and(|inflight| inflight.seq == submission.seq) {
            self.inflight = None;
        }
        self.stats.submitted = self.stats.submitted.saturating_sub(1);
        self.pending.get_or_insert(submission.request);
        self.quiet_until = None;
    }

    /// Forget the in-flight request and all timers, keeping the pending
    /// snapshot so it can go to a new worker immediately
    pub fn cancel_timers(&mut self) {
        self.inflight = None;
        self.quiet_until = None;
        self.last_response_at = None;
    }

    /// Drop everything scheduled. Sequence numbers keep counting, so a late
    /// response from before the reset still cannot overwrite a newer one.
    pub fn reset(&mut self) {
        self.cancel_timers();
        self.pending = None;
    }

    fn quiet_deadline(&self) -> Option<Instant> {
        self.last_response_at
            .map(|at| at + self.config.quiet_period)
    }

    fn overdue(&self, inflight: Inflight, now: Instant) -> bool {
        now.saturating_duration_since(inflight.submitted_at) >= self.config.force_submit_after
    }

    fn submit(&mut self, now: Instant) -> Option<Submission> {
        let request = self.pending.take()?;
        let seq = self.next_seq;
        self.next_seq += 1;

        self.inflight = Some(Inflight {
            seq,
            submitted_at: now,
        });
        self.quiet_until = None;
        self.stats.submitted += 1;
        debug!("Submitting diff request {}", seq);

        Some(Submission { seq, request })
    }
}
