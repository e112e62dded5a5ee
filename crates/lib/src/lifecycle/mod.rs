//! Lifecycle controller tying the components to one page load.
//!
//! [`ProgressManager`] owns the store, the coalescer and the load-time anchor.
//! It moves from [`LifecycleState::Uninitialized`] to
//! [`LifecycleState::Active`] exactly once, in [`ProgressManager::init`], and
//! from then on reacts to [`PageEvent`]s and timer deadlines.
//!
//! Everything runs on one timeline. The synchronous entry points
//! ([`handle_event`](ProgressManager::handle_event),
//! [`poll`](ProgressManager::poll)) take `now` explicitly; the async
//! [`run`](ProgressManager::run) driver feeds them from an event channel and
//! `tokio` timers on a single task.

use std::sync::Arc;

use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use crate::{
    AnchorTarget, Clock, PageKey, Result, SystemClock,
    backend::Medium,
    coalescer::Coalescer,
    config::ProgressConfig,
    host::{Host, PageEvent},
    page::with_fragment,
    resolver::{AnchorDecision, Resolution, resolve},
    store::ProgressStore,
};

/// Controller state. There is no terminal state; the manager lives as long
/// as the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
}

/// Progress of the one-shot restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Restore {
    /// Waiting for content to be ready.
    Pending,
    /// Resolved; scroll on the next frame.
    Scheduled(u64),
    Done,
}

/// Remembers and restores the reading position of one page.
pub struct ProgressManager<H: Host> {
    config: ProgressConfig,
    store: ProgressStore,
    clock: Arc<dyn Clock>,
    host: H,
    coalescer: Coalescer,
    state: LifecycleState,
    page_key: PageKey,
    anchor: Option<AnchorTarget>,
    restore: Restore,
    next_sweep: Option<Instant>,
}

impl<H: Host> std::fmt::Debug for ProgressManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("host", &"<Host>")
            .field("coalescer", &self.coalescer)
            .field("state", &self.state)
            .field("page_key", &self.page_key)
            .field("anchor", &self.anchor)
            .field("restore", &self.restore)
            .finish()
    }
}

impl<H: Host> ProgressManager<H> {
    /// Creates an uninitialized manager for the page `host` currently shows.
    ///
    /// # Errors
    /// Returns a config error if `config` fails validation.
    pub fn new(config: ProgressConfig, medium: impl Medium + 'static, host: H) -> Result<Self> {
        config.validate()?;

        let store = ProgressStore::from_config(medium, &config);
        let coalescer = Coalescer::new(config.throttle_delay, config.save_debounce_delay);
        let page_key = PageKey::from_location(&host.location());

        Ok(Self {
            config,
            store,
            clock: Arc::new(SystemClock),
            host,
            coalescer,
            state: LifecycleState::Uninitialized,
            page_key,
            anchor: None,
            restore: Restore::Pending,
            next_sweep: None,
        })
    }

    /// Replaces the wall clock used for record timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Captures the anchor, strips it from the address, sweeps expired
    /// records and starts the sweep period. Later calls do nothing.
    pub fn init(&mut self, now: Instant) {
        if self.state == LifecycleState::Active {
            debug!(page = %self.page_key, "Progress manager already initialized");
            return;
        }

        let location = self.host.location();
        self.anchor = AnchorTarget::from_location(&location);
        let stripped = with_fragment(&location, None);
        if stripped != location {
            self.host.replace_location(&stripped);
        }

        self.sweep();
        self.next_sweep = Some(now + self.config.sweep_interval);
        self.state = LifecycleState::Active;

        info!(
            page = %self.page_key,
            anchor = ?self.anchor.as_ref().map(AnchorTarget::id),
            "Reading progress initialized"
        );
    }

    /// Reacts to one page event. Events before [`init`](Self::init) are ignored.
    pub fn handle_event(&mut self, event: PageEvent, now: Instant) {
        if self.state != LifecycleState::Active {
            debug!(?event, "Ignoring page event before init");
            return;
        }

        match event {
            PageEvent::Scroll => self.coalescer.trigger(now),
            PageEvent::ContentReady => self.restore(),
            PageEvent::Frame => self.apply_scheduled_scroll(),
            PageEvent::BeforeUnload | PageEvent::VisibilityHidden => {
                debug!(?event, "Committing reading position on exit");
                self.commit_now();
            }
        }
    }

    /// Fires every timer due at `now`: throttle sample, debounce commit and
    /// the periodic sweep.
    pub fn poll(&mut self, now: Instant) {
        if self.state != LifecycleState::Active {
            return;
        }

        let host = &self.host;
        if let Some(offset) = self.coalescer.poll(now, || host.scroll_offset()) {
            self.commit(offset);
        }

        if self.next_sweep.is_some_and(|deadline| deadline <= now) {
            self.sweep();
            self.next_sweep = Some(now + self.config.sweep_interval);
        }
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.coalescer.next_deadline(), self.next_sweep) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Commits the latest position now, bypassing the debounce, and cancels
    /// both pending timers.
    ///
    /// With no position sampled this visit, the page's remembered record is
    /// kept as is but its `saved_at` is refreshed, so pages that are read
    /// again without scrolling do not expire.
    pub fn commit_now(&mut self) {
        let host = &self.host;
        match self.coalescer.flush(|| host.scroll_offset()) {
            Some(offset) => self.commit(offset),
            None => self.refresh(),
        }
    }

    /// Forgets this page's position, including any not yet committed.
    ///
    /// # Returns
    /// `true` if a stored record was removed.
    pub fn clear_progress(&mut self) -> bool {
        self.coalescer.reset();
        match self.store.remove(&self.page_key) {
            Ok(removed) => {
                info!(page = %self.page_key, removed, "Cleared reading position");
                removed
            }
            Err(err) => {
                warn!(error = %err, page = %self.page_key, "Failed to clear reading position");
                false
            }
        }
    }

    /// Forgets every page's position.
    pub fn clear_all_progress(&mut self) {
        self.coalescer.reset();
        match self.store.clear() {
            Ok(()) => info!("Cleared all reading positions"),
            Err(err) => warn!(error = %err, "Failed to clear reading positions"),
        }
    }

    /// Drives the manager from a host event stream until it closes.
    ///
    /// Calls [`init`](Self::init) first. Sleeps until the next deadline
    /// between events. When the stream ends the latest position is committed
    /// and the manager is handed back.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PageEvent>) -> Self {
        self.init(Instant::now());

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event, Instant::now()),
                    None => break,
                },
                _ = sleep_until_deadline(deadline) => self.poll(Instant::now()),
            }
        }

        debug!(page = %self.page_key, "Page event stream closed");
        self.commit_now();
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn page_key(&self) -> &PageKey {
        &self.page_key
    }

    /// Anchor captured by [`init`](Self::init).
    pub fn anchor(&self) -> Option<&AnchorTarget> {
        self.anchor.as_ref()
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn restore(&mut self) {
        if self.restore != Restore::Pending {
            debug!("Reading position already restored");
            return;
        }

        let stored = self.store.get(&self.page_key);
        let host = &self.host;
        let resolution = resolve(stored.as_ref(), self.anchor.as_ref(), |id| {
            host.element_offset(id)
        });

        if let Some(err) = resolution.error() {
            warn!(error = %err, page = %self.page_key, "Falling back from anchor");
        }
        self.log_resolution(&resolution, stored.and_then(|r| r.saved_at_utc()));

        if let Some(anchor) = resolution.restored_anchor() {
            let location = with_fragment(&self.host.location(), Some(anchor));
            self.host.replace_location(&location);
        }

        match resolution.target {
            Some(offset) => {
                self.restore = Restore::Scheduled(offset);
                self.host.request_frame();
            }
            None => self.restore = Restore::Done,
        }
    }

    fn apply_scheduled_scroll(&mut self) {
        if let Restore::Scheduled(offset) = self.restore {
            self.host.scroll_to(offset);
            self.restore = Restore::Done;
            debug!(offset, "Applied restored scroll position");
        }
    }

    fn log_resolution(
        &self,
        resolution: &Resolution,
        saved_at: Option<chrono::DateTime<chrono::Utc>>,
    ) {
        let saved_at = saved_at.map(|t| t.to_rfc3339());
        match &resolution.anchor {
            AnchorDecision::Absent if resolution.target.is_some() => {
                info!(offset = ?resolution.target, ?saved_at, "Restoring remembered position")
            }
            AnchorDecision::Absent => debug!("No remembered position for page"),
            AnchorDecision::Restore(anchor) => {
                info!(offset = ?resolution.target, anchor = anchor.id(), "Anchor is at or past remembered position")
            }
            AnchorDecision::Drop(anchor) => {
                info!(offset = ?resolution.target, anchor = anchor.id(), ?saved_at, "Remembered position is past anchor")
            }
            AnchorDecision::Invalid(_) => {
                info!(offset = ?resolution.target, ?saved_at, "Restoring without anchor")
            }
        }
    }

    fn commit(&mut self, offset: u64) {
        let now = self.clock.now_millis();
        if let Err(err) = self.store.save(&self.page_key, offset, now) {
            warn!(error = %err, page = %self.page_key, offset, "Failed to save reading position");
        }
    }

    fn refresh(&mut self) {
        let now = self.clock.now_millis();
        if let Err(err) = self.store.touch(&self.page_key, now) {
            warn!(error = %err, page = %self.page_key, "Failed to refresh reading position");
        }
    }

    fn sweep(&mut self) {
        let now = self.clock.now_millis();
        if let Err(err) = self.store.sweep(now, self.config.purge_threshold) {
            warn!(error = %err, "Failed to sweep expired reading positions");
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
