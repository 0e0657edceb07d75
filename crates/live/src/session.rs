use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use flume::Receiver;
use log::{debug, info, warn};
use text_diff::{side_text, DiffConfig, Side};

use crate::buffer::{BufferId, BufferProvider, BufferStore, ComparePair, ContentSink};
use crate::driver::LiveDiff;
use crate::request::{DiffRequest, DiffResponse};
use crate::scheduler::{SchedulerConfig, SchedulerStats};

/// A live comparison of two buffers
///
/// Every change made through the session schedules a new diff. The newest
/// published diff is kept as the displayed one and is what hunk actions
/// work from.
pub struct CompareSession<S = BufferStore> {
    store: S,
    pair: ComparePair,
    config: DiffConfig,
    live: LiveDiff,
    updates: Receiver<DiffResponse>,
    displayed: Option<DiffResponse>,
    retried_failure: bool,
}

impl<S: BufferProvider + ContentSink> CompareSession<S> {
    /// Start comparing the buffers of `pair` and schedule the first diff
    pub fn new(
        store: S,
        pair: ComparePair,
        config: DiffConfig,
        scheduler: SchedulerConfig,
    ) -> Result<Self> {
        let (live, updates) = LiveDiff::spawn(scheduler)?;
        Self::with_live(store, pair, config, live, updates)
    }

    /// Start a session on an already running [`LiveDiff`]
    pub fn with_live(
        store: S,
        pair: ComparePair,
        config: DiffConfig,
        live: LiveDiff,
        updates: Receiver<DiffResponse>,
    ) -> Result<Self> {
        if pair.is_mirrored() {
            info!("Comparing {} with itself", pair.left);
        }

        let session = Self {
            store,
            pair,
            config,
            live,
            updates,
            displayed: None,
            retried_failure: false,
        };
        session.refresh()?;
        Ok(session)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pair(&self) -> ComparePair {
        self.pair
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DiffConfig) -> Result<()> {
        self.config = config;
        self.refresh()
    }

    pub fn stats(&self) -> Result<SchedulerStats> {
        self.live.stats()
    }

    /// Current content of one side
    pub fn text(&self, side: Side) -> Result<String> {
        let id = self.pair.id(side);
        self.store
            .snapshot(id)
            .map(|snapshot| snapshot.contents())
            .ok_or_else(|| anyhow!("unknown {}", id))
    }

    /// Snapshot both sides into a request
    pub fn request(&self) -> Result<DiffRequest> {
        Ok(DiffRequest::new(
            self.text(Side::Left)?,
            self.text(Side::Right)?,
            &self.config,
        ))
    }

    /// Schedule a diff of the current content
    pub fn refresh(&self) -> Result<()> {
        self.live.submit_edit(self.request()?)
    }

    /// Replace the content shown on one side.
    ///
    /// In a mirrored pair both sides are the same buffer, so the edit lands
    /// in both views.
    pub fn edit(&mut self, side: Side, content: impl Into<String>) -> Result<()> {
        let id = self.pair.id(side);
        if self.pair.is_mirrored() {
            debug!("{} is shown on both sides, editing both views", id);
        }
        self.store.update(id, content.into())?;
        self.refresh()
    }

    /// Replace a buffer's content from outside the editor, e.g. a paste,
    /// drop or file reload. Buffers outside the pair are updated without
    /// scheduling a diff.
    pub fn replace(&mut self, id: BufferId, content: impl Into<String>) -> Result<()> {
        self.store.update(id, content.into())?;
        if self.pair.sides_of(id).is_empty() {
            return Ok(());
        }
        self.refresh()
    }

    pub fn restart_worker(&self) -> Result<()> {
        self.live.restart_worker()
    }

    /// The diff currently on display
    pub fn displayed(&self) -> Option<&DiffResponse> {
        self.displayed.as_ref()
    }

    /// Take every response published since the last call. Returns the newly
    /// displayed diff, if the display changed.
    pub fn poll_updates(&mut self) -> Option<&DiffResponse> {
        let latest = self.updates.try_iter().last()?;
        if self.show(latest) {
            self.displayed.as_ref()
        } else {
            None
        }
    }

    /// Block until a response is published or `timeout` passes
    pub fn wait_for_update(&mut self, timeout: Duration) -> Option<&DiffResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            let first = match self.updates.recv_deadline(deadline) {
                Ok(response) => response,
                Err(_) => return None,
            };
            let latest = self.updates.try_iter().last().unwrap_or(first);
            if self.show(latest) {
                return self.displayed.as_ref();
            }
        }
    }

    /// Wait until the displayed diff reflects the current content of both
    /// buffers
    pub fn wait_until_current(&mut self, timeout: Duration) -> Result<&DiffResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_current()? {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.wait_for_update(remaining).is_none() {
                bail!("no up to date diff within {:?}", timeout);
            }
        }
        self.displayed
            .as_ref()
            .ok_or_else(|| anyhow!("no diff is displayed"))
    }

    /// Act on one change of the displayed diff from `side` and write the
    /// rebuilt content into that side's buffer. Returns the new content.
    pub fn apply_hunk_action(&mut self, index: usize, side: Side) -> Result<String> {
        if !self.is_current()? {
            bail!("the displayed diff is out of date, wait for the next update");
        }
        let response = self
            .displayed
            .as_ref()
            .ok_or_else(|| anyhow!("no diff is displayed yet"))?;

        let content = text_diff::apply_hunk_action(&response.operations, index, side)?;
        let id = self.pair.id(side);
        info!("Applying change {} from the {} side to {}", index, side, id);

        self.store.update(id, content.clone())?;
        self.refresh()?;
        Ok(content)
    }

    /// Whether the displayed diff rebuilds the current content of both sides
    fn is_current(&self) -> Result<bool> {
        let Some(response) = self.displayed.as_ref() else {
            return Ok(false);
        };
        for side in [Side::Left, Side::Right] {
            if side_text(&response.operations, side) != self.text(side)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // Identical non-empty inputs still yield one equality, so only two empty
    // buffers legitimately diff to nothing
    fn accepts(&self, response: &DiffResponse) -> bool {
        !response.is_empty() || self.both_sides_empty()
    }

    fn both_sides_empty(&self) -> bool {
        [Side::Left, Side::Right]
            .into_iter()
            .all(|side| self.text(side).map_or(false, |text| text.is_empty()))
    }

    fn show(&mut self, response: DiffResponse) -> bool {
        if !self.accepts(&response) {
            warn!(
                "Diff {} came back empty for non-empty buffers, keeping the last result",
                response.seq
            );
            if !self.retried_failure {
                self.retried_failure = true;
                if let Err(e) = self.refresh() {
                    warn!("Failed to retry diff: {}", e);
                }
            }
            return false;
        }

        self.retried_failure = false;
        self.displayed = Some(response);
        true
    }
}
