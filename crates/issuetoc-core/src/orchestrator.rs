//! Mount orchestration: the engine command loop and panel lifecycle.
//!
//! The orchestrator owns the single live panel instance and the single
//! registered watcher as explicit fields, never ambient page state, and is
//! the only component that mutates them. All work runs on one task: the
//! `run` loop selects over inbound commands, the live watcher's mutation
//! stream, the resolver's next poll tick, and the scroll throttle's trailing
//! deadline. No handler blocks the loop, so a shutdown lands even while a
//! mount is still waiting for the sidebar to appear.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use issuetoc_config::AppConfig;

use crate::extract::{Outline, extract};
use crate::host::{HostPage, MutationBatch, MutationSource, NodeId};
use crate::panel::PanelInstance;
use crate::resolve::MountResolver;
use crate::throttle::{Clock, Gate, SystemClock, Throttle};
use crate::track::ActiveEntryTracker;
use crate::watch::{ContentWatcher, Verdict};

/// Commands that can be sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Mount the outline if it is not already live.
    Mount,
    /// Tear down the current mount and recreate it.
    Remount,
    /// A scroll event occurred; recompute the active entry (throttled).
    Scroll,
    /// An outline row was selected; scroll its heading into view.
    Navigate(String),
    /// Stop the engine loop.
    Shutdown,
}

/// Errors from the engine runtime.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine command channel closed")]
    ChannelClosed,
}

/// Handle for sending commands to a running [`MountOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    command_tx: mpsc::Sender<EngineCommand>,
}

impl OrchestratorHandle {
    /// Wrap a raw command channel. Embeddings normally get a handle from
    /// [`MountOrchestrator::new`] instead.
    pub fn new(command_tx: mpsc::Sender<EngineCommand>) -> Self {
        Self { command_tx }
    }

    pub async fn request_mount(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Mount).await
    }

    pub async fn request_remount(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Remount).await
    }

    pub async fn notify_scroll(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Scroll).await
    }

    pub async fn navigate(&self, anchor_id: &str) -> Result<(), EngineError> {
        self.send(EngineCommand::Navigate(anchor_id.to_string())).await
    }

    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Shutdown).await
    }

    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

enum LoopEvent {
    Command(Option<EngineCommand>),
    Mutation(Option<MutationBatch>),
    PollResolve,
    TrailingScroll,
}

/// Top-level driver sequencing resolution, panel render, and watcher
/// registration, and owning the single live panel instance.
pub struct MountOrchestrator<H, C = SystemClock>
where
    H: HostPage + MutationSource,
    C: Clock,
{
    host: H,
    config: AppConfig,
    resolver: MountResolver,
    tracker: ActiveEntryTracker,
    scroll_throttle: Throttle<C>,
    command_rx: mpsc::Receiver<EngineCommand>,
    panel: Option<PanelInstance>,
    watcher: Option<ContentWatcher>,
    outline: Outline,
    active: Option<String>,
    mount_pending: bool,
    resolve_at: Option<Instant>,
    trailing_at: Option<Instant>,
}

impl<H: HostPage + MutationSource> MountOrchestrator<H, SystemClock> {
    /// Create an orchestrator over the given host page and return it with a
    /// command handle.
    pub fn new(host: H, config: AppConfig) -> (Self, OrchestratorHandle) {
        Self::with_clock(host, config, SystemClock::new())
    }
}

impl<H, C> MountOrchestrator<H, C>
where
    H: HostPage + MutationSource,
    C: Clock,
{
    /// Create an orchestrator with an injected clock for the scroll throttle.
    pub fn with_clock(host: H, config: AppConfig, clock: C) -> (Self, OrchestratorHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);

        let resolver = MountResolver::new(
            &config.selectors.sidebar_region,
            &config.selectors.insertion_point_id,
            Duration::from_millis(config.timing.poll_interval_ms),
        );
        let tracker = ActiveEntryTracker::new(config.layout.header_clearance);
        let scroll_throttle = Throttle::new(
            Duration::from_millis(config.timing.scroll_throttle_ms),
            clock,
        );

        let orchestrator = Self {
            host,
            config,
            resolver,
            tracker,
            scroll_throttle,
            command_rx,
            panel: None,
            watcher: None,
            outline: Outline::default(),
            active: None,
            mount_pending: false,
            resolve_at: None,
            trailing_at: None,
        };

        (orchestrator, OrchestratorHandle::new(command_tx))
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_mounted(&self) -> bool {
        self.panel.is_some()
    }

    pub fn has_watcher(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn active_entry(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Run the engine loop until shutdown. Returns the orchestrator so the
    /// embedding can inspect or reuse the host page afterwards.
    pub async fn run(mut self) -> Self {
        info!("outline engine started");

        loop {
            let event = {
                let resolve_at = self.resolve_at;
                let trailing_at = self.trailing_at;
                tokio::select! {
                    cmd = self.command_rx.recv() => LoopEvent::Command(cmd),
                    batch = Self::next_mutation(self.watcher.as_mut()) => LoopEvent::Mutation(batch),
                    _ = Self::sleep_until_opt(resolve_at) => LoopEvent::PollResolve,
                    _ = Self::sleep_until_opt(trailing_at) => LoopEvent::TrailingScroll,
                }
            };

            match event {
                LoopEvent::Command(None) | LoopEvent::Command(Some(EngineCommand::Shutdown)) => {
                    info!("outline engine shutting down");
                    break;
                }
                LoopEvent::Command(Some(EngineCommand::Mount)) => self.mount(),
                LoopEvent::Command(Some(EngineCommand::Remount)) => self.remount(),
                LoopEvent::Command(Some(EngineCommand::Scroll)) => self.on_scroll(),
                LoopEvent::Command(Some(EngineCommand::Navigate(anchor))) => {
                    self.on_navigate(&anchor);
                }
                LoopEvent::Mutation(None) => {
                    // Host side of the subscription is gone
                    self.watcher = None;
                }
                LoopEvent::Mutation(Some(batch)) => self.handle_mutation(batch),
                LoopEvent::PollResolve => {
                    self.resolve_at = None;
                    self.poll_mount();
                }
                LoopEvent::TrailingScroll => self.on_trailing_scroll(),
            }
        }

        info!("outline engine stopped");
        self
    }

    async fn next_mutation(watcher: Option<&mut ContentWatcher>) -> Option<MutationBatch> {
        match watcher {
            Some(watcher) => watcher.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn sleep_until_opt(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    /// Begin mounting the outline. Idempotent: short-circuits when a mount
    /// is already live or in flight, so racing triggers degrade to no-ops.
    /// When the insertion point does not resolve immediately the mount stays
    /// pending and the run loop retries on the resolver's interval; commands
    /// keep flowing in the meantime.
    pub fn mount(&mut self) {
        if self.mount_pending {
            debug!("mount already in flight");
            return;
        }
        if self.panel.is_some() {
            debug!("already mounted");
            return;
        }
        self.mount_pending = true;
        // Any watcher from a prior cycle must be disconnected before this
        // cycle renders, so two watchers can never double-trigger remounts.
        self.watcher = None;
        self.poll_mount();
    }

    /// One resolution attempt for a pending mount. Completes the mount on
    /// success, otherwise arms the next poll tick.
    pub fn poll_mount(&mut self) {
        if !self.mount_pending {
            return;
        }
        match self.resolver.poll_once(&mut self.host) {
            Some(point) => {
                self.resolve_at = None;
                self.complete_mount(point);
            }
            None => {
                self.resolve_at = Some(Instant::now() + self.resolver.interval());
            }
        }
    }

    fn complete_mount(&mut self, point: NodeId) {
        let outline = match self.host.query(&self.config.selectors.content_container) {
            Some(container) => extract(&mut self.host, container),
            None => {
                warn!(
                    selector = %self.config.selectors.content_container,
                    "content container absent, outline empty"
                );
                Outline::default()
            }
        };

        let panel = PanelInstance::render(&mut self.host, point, &outline, &self.config.layout);
        panel.fit_height(&mut self.host, &self.config.selectors, &self.config.layout);

        self.outline = outline;
        self.active = None;
        // Watcher registration never precedes the first successful render.
        self.watcher = ContentWatcher::register(
            &self.host,
            &self.config.selectors.observed_container,
            point,
        );
        self.panel = Some(panel);
        self.mount_pending = false;
        info!(entries = self.outline.len(), "outline mounted");
    }

    /// Tear down the live panel (if any) and run the mount sequence again.
    pub fn remount(&mut self) {
        self.watcher = None;
        if let Some(panel) = self.panel.take() {
            panel.teardown(&mut self.host);
        }
        self.active = None;
        self.outline = Outline::default();
        self.mount_pending = false;
        self.mount();
    }

    /// Evaluate one mutation batch against the live watcher and remount on a
    /// real content replacement.
    pub fn handle_mutation(&mut self, batch: MutationBatch) {
        let verdict = match &self.watcher {
            Some(watcher) => watcher.evaluate(&self.host, &batch),
            None => Verdict::Ignore,
        };
        if verdict == Verdict::Remount {
            debug!(added = batch.added.len(), "content replacement detected");
            self.remount();
        }
    }

    fn on_scroll(&mut self) {
        match self.scroll_throttle.acquire() {
            Gate::Fire => self.update_active(),
            Gate::Deferred => {
                let remaining = self.scroll_throttle.remaining().unwrap_or(Duration::ZERO);
                self.trailing_at = Some(Instant::now() + remaining);
            }
        }
    }

    fn on_trailing_scroll(&mut self) {
        // The expired timer is the authority on when the window ended; the
        // throttle clock only decides whether a trailing call is owed.
        self.trailing_at = None;
        if self.scroll_throttle.take_trailing() {
            self.update_active();
        }
    }

    fn on_navigate(&mut self, anchor_id: &str) {
        let navigated = match &self.panel {
            Some(panel) => panel.navigate_to(
                &mut self.host,
                &self.outline,
                anchor_id,
                self.config.layout.header_clearance,
            ),
            None => false,
        };
        if navigated {
            // Programmatic scroll: reflect the new position immediately
            self.update_active();
        }
    }

    fn update_active(&mut self) {
        let Some(panel) = &self.panel else {
            return;
        };
        let next = self.tracker.compute_active(&self.host, &self.outline);
        if next != self.active {
            debug!(active = ?next, "active entry changed");
            panel.set_active(&mut self.host, next.as_deref());
            self.active = next;
        }
    }
}
