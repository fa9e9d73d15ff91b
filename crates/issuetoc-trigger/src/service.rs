//! Rate-limited trigger delivery.
//!
//! Host navigation can emit several completion events for one logical
//! navigation. The service gates deliveries through a leading-edge throttle
//! and DROPS deliveries inside the window rather than replaying them later:
//! the engine's mount is idempotent, so one navigation burst must collapse to
//! exactly one mount request, never a delayed duplicate.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use issuetoc_core::throttle::Gate;
use issuetoc_core::{Clock, OrchestratorHandle, SystemClock, Throttle};

use crate::message::{NavigationMessage, is_issue_url};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Commands that can be sent to the trigger service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerCommand {
    /// An inbound navigation message to evaluate.
    Deliver(NavigationMessage),
    /// Stop the service loop.
    Shutdown,
}

/// Errors from the trigger service.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("trigger command channel closed")]
    ChannelClosed,
}

/// Handle for sending commands to a running [`TriggerService`].
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    command_tx: mpsc::Sender<TriggerCommand>,
}

impl TriggerHandle {
    pub async fn deliver(&self, message: NavigationMessage) -> Result<(), TriggerError> {
        self.send(TriggerCommand::Deliver(message)).await
    }

    /// Decode a raw JSON message and deliver it. Undecodable input is
    /// dropped with a warning, never an error: the channel is external and
    /// untrusted.
    pub async fn deliver_json(&self, raw: &str) -> Result<(), TriggerError> {
        match NavigationMessage::from_json(raw) {
            Ok(message) => self.deliver(message).await,
            Err(err) => {
                warn!(%err, "undecodable trigger message dropped");
                Ok(())
            }
        }
    }

    pub async fn shutdown(&self) -> Result<(), TriggerError> {
        self.send(TriggerCommand::Shutdown).await
    }

    async fn send(&self, command: TriggerCommand) -> Result<(), TriggerError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| TriggerError::ChannelClosed)
    }
}

/// Receives navigation messages, applies the URL scope rule and the
/// rate limit, and forwards mount requests to the engine.
pub struct TriggerService<C: Clock = SystemClock> {
    engine: OrchestratorHandle,
    throttle: Throttle<C>,
    command_rx: mpsc::Receiver<TriggerCommand>,
}

impl TriggerService<SystemClock> {
    /// Create a trigger service forwarding to the given engine handle, with
    /// the given rate-limit window.
    pub fn new(engine: OrchestratorHandle, window: Duration) -> (Self, TriggerHandle) {
        Self::with_clock(engine, window, SystemClock::new())
    }
}

impl<C: Clock> TriggerService<C> {
    /// Create a trigger service with an injected clock for the rate limiter.
    pub fn with_clock(
        engine: OrchestratorHandle,
        window: Duration,
        clock: C,
    ) -> (Self, TriggerHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let service = Self {
            engine,
            throttle: Throttle::new(window, clock),
            command_rx,
        };
        (service, TriggerHandle { command_tx })
    }

    /// Run the delivery loop until shutdown or channel close.
    pub async fn run(mut self) {
        info!("trigger service started");
        while let Some(command) = self.command_rx.recv().await {
            match command {
                TriggerCommand::Shutdown => break,
                TriggerCommand::Deliver(message) => self.on_deliver(message).await,
            }
        }
        info!("trigger service stopped");
    }

    /// Evaluate one inbound message.
    pub async fn on_deliver(&mut self, message: NavigationMessage) {
        let NavigationMessage::MountOutline(details) = message;
        if !is_issue_url(&details.url) {
            debug!(url = %details.url, "navigation outside scope, ignored");
            return;
        }
        match self.throttle.acquire() {
            Gate::Fire => {
                debug!(url = %details.url, "mount request forwarded");
                if let Err(err) = self.engine.request_mount().await {
                    warn!(%err, "mount request not delivered");
                }
            }
            Gate::Deferred => {
                debug!(url = %details.url, "trigger inside rate-limit window, dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuetoc_core::EngineCommand;
    use issuetoc_test_utils::FakeClock;
    use pretty_assertions::assert_eq;

    const ISSUE_URL: &str = "https://github.com/acme/widgets/issues/42";
    const WINDOW: Duration = Duration::from_millis(500);

    fn message(url: &str) -> NavigationMessage {
        NavigationMessage::MountOutline(crate::message::NavigationDetails {
            url: url.to_string(),
            context_id: None,
            timestamp_ms: None,
        })
    }

    fn service_with_probe() -> (
        TriggerService<FakeClock>,
        TriggerHandle,
        mpsc::Receiver<EngineCommand>,
        FakeClock,
    ) {
        let (engine_tx, engine_rx) = mpsc::channel(16);
        let clock = FakeClock::new();
        let (service, handle) = TriggerService::with_clock(
            OrchestratorHandle::new(engine_tx),
            WINDOW,
            clock.clone(),
        );
        (service, handle, engine_rx, clock)
    }

    #[tokio::test]
    async fn test_issue_navigation_forwards_mount() {
        let (mut service, _handle, mut engine_rx, _clock) = service_with_probe();
        service.on_deliver(message(ISSUE_URL)).await;
        assert_eq!(engine_rx.try_recv().unwrap(), EngineCommand::Mount);
    }

    #[tokio::test]
    async fn test_out_of_scope_navigation_ignored() {
        let (mut service, _handle, mut engine_rx, _clock) = service_with_probe();
        service
            .on_deliver(message("https://github.com/acme/widgets/pull/42"))
            .await;
        assert!(engine_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_burst_collapses_to_single_mount() {
        let (mut service, _handle, mut engine_rx, _clock) = service_with_probe();
        // The host fires several completion events for one navigation
        service.on_deliver(message(ISSUE_URL)).await;
        service.on_deliver(message(ISSUE_URL)).await;
        service.on_deliver(message(ISSUE_URL)).await;

        assert_eq!(engine_rx.try_recv().unwrap(), EngineCommand::Mount);
        assert!(engine_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_navigation_after_window_forwards_again() {
        let (mut service, _handle, mut engine_rx, clock) = service_with_probe();
        service.on_deliver(message(ISSUE_URL)).await;
        clock.advance(WINDOW);
        service.on_deliver(message(ISSUE_URL)).await;

        assert_eq!(engine_rx.try_recv().unwrap(), EngineCommand::Mount);
        assert_eq!(engine_rx.try_recv().unwrap(), EngineCommand::Mount);
    }

    #[tokio::test]
    async fn test_dropped_trigger_is_not_replayed_later() {
        let (mut service, _handle, mut engine_rx, clock) = service_with_probe();
        service.on_deliver(message(ISSUE_URL)).await;
        clock.advance(Duration::from_millis(100));
        service.on_deliver(message(ISSUE_URL)).await;
        clock.advance(WINDOW);

        // The deferred trigger was dropped, not queued for the window end
        assert_eq!(engine_rx.try_recv().unwrap(), EngineCommand::Mount);
        assert!(engine_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_engine_gone_does_not_panic() {
        let (engine_tx, engine_rx) = mpsc::channel(16);
        drop(engine_rx);
        let (mut service, _handle) =
            TriggerService::new(OrchestratorHandle::new(engine_tx), WINDOW);
        service.on_deliver(message(ISSUE_URL)).await;
    }

    #[test_log::test(tokio::test)]
    async fn test_run_loop_delivers_and_shuts_down() {
        let (service, handle, mut engine_rx, _clock) = service_with_probe();
        let task = tokio::spawn(service.run());

        handle.deliver(message(ISSUE_URL)).await.unwrap();
        handle
            .deliver_json(r#"{"type": "mount_outline", "payload": {"url": "nonsense"}}"#)
            .await
            .unwrap();
        handle.deliver_json("{ not json").await.unwrap();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(engine_rx.try_recv().unwrap(), EngineCommand::Mount);
        assert!(engine_rx.try_recv().is_err());
        assert!(matches!(
            handle.deliver(message(ISSUE_URL)).await,
            Err(TriggerError::ChannelClosed)
        ));
    }
}
