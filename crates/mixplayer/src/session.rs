//! Playback session controller.
//!
//! [`PlayerSession`] is the façade handed to the view layer. It owns the
//! session worker and the health-check scheduler, forwards commands into the
//! worker's mailbox, and exposes the current state for observation.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::descriptor::StreamDescriptor;
use crate::error::{PlayerError, Result};
use crate::events::{SessionEvent, StatePublisher};
use crate::machine::{SessionMachine, SessionSnapshot};
use crate::media::MediaEngine;
use crate::messages::{Command, SessionMessage};
use crate::probe::{FreshnessProbe, HttpFreshnessProber};
use crate::scheduler::HealthCheckScheduler;
use crate::state::SessionState;
use crate::worker::{SessionOutcome, SessionWorker};

/// A running playback session.
///
/// Must be created from within a Tokio runtime. Dropping the session without
/// calling [`PlayerSession::dispose`] still stops the worker and the
/// scheduler, but does not wait for them.
pub struct PlayerSession {
    descriptor: StreamDescriptor,
    sender: mpsc::Sender<SessionMessage>,
    state_rx: watch::Receiver<SessionState>,
    events_tx: broadcast::Sender<SessionEvent>,
    cancellation_token: CancellationToken,
    worker: Option<JoinHandle<SessionOutcome>>,
    scheduler: Option<JoinHandle<()>>,
}

impl PlayerSession {
    /// Start a session probing freshness over HTTP with `config.probe`.
    pub fn spawn<E: MediaEngine>(
        descriptor: StreamDescriptor,
        engine: E,
        config: PlayerConfig,
    ) -> Result<Self> {
        let prober = HttpFreshnessProber::from_config(&config.probe)?;
        Self::spawn_with_probe(descriptor, engine, Arc::new(prober), config)
    }

    /// Start a session with a custom freshness probe.
    pub fn spawn_with_probe<E: MediaEngine>(
        descriptor: StreamDescriptor,
        engine: E,
        prober: Arc<dyn FreshnessProbe>,
        config: PlayerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (sender, mailbox) = mpsc::channel(config.mailbox_capacity);
        let (state_tx, state_rx) = watch::channel(SessionState::Loading);
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        let cancellation_token = CancellationToken::new();

        let machine = SessionMachine::new(
            descriptor.clone(),
            engine,
            config.auto_reload,
            sender.downgrade(),
            StatePublisher::new(state_tx, events_tx.clone()),
        );
        let worker = SessionWorker::new(
            machine,
            descriptor.clone(),
            prober,
            mailbox,
            sender.downgrade(),
            cancellation_token.clone(),
        );
        let worker = tokio::spawn(worker.run());

        let scheduler = HealthCheckScheduler::new(
            config.check_interval,
            sender.downgrade(),
            cancellation_token.child_token(),
        )
        .spawn();

        info!(
            url = %descriptor,
            check_interval = ?config.check_interval,
            auto_reload = config.auto_reload,
            "Playback session spawned"
        );

        Ok(Self {
            descriptor,
            sender,
            state_rx,
            events_tx,
            cancellation_token,
            worker: Some(worker),
            scheduler: Some(scheduler),
        })
    }

    /// Stream this session plays.
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Resume playback. Only has an effect while `Paused`.
    pub async fn play(&self) -> Result<()> {
        self.send(Command::Play).await
    }

    /// Suspend playback. Only has an effect while `Playing`.
    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    /// Force the session back to `Loading`, whatever its current state, and
    /// forget the last freshness token. This is how `Failed` and `Ended`
    /// sessions are restarted.
    pub async fn reload(&self) -> Result<()> {
        self.send(Command::Reload).await
    }

    /// Handle an audio-route interruption: pause the engine and go back to
    /// `Loading`.
    pub async fn on_interruption(&self) -> Result<()> {
        self.send(Command::Interrupt).await
    }

    /// Tear down the media session and move to `Ended`.
    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    /// Current state as last published by the worker.
    pub fn current_state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Watch the current state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Receive every state change, in order.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Handle for delivering route interruptions from outside the owner of
    /// the session, e.g. an audio-route monitor task.
    pub fn interruption_handle(&self) -> InterruptionHandle {
        InterruptionHandle {
            mailbox: self.sender.downgrade(),
        }
    }

    /// Query the session. Ordered after every command sent before it.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Snapshot(reply_tx))
            .await
            .map_err(|_| PlayerError::Disposed)?;
        reply_rx.await.map_err(|_| PlayerError::Disposed)
    }

    /// Stop the scheduler and the worker, release the media session and wait
    /// for everything to finish. In-flight probes are discarded.
    pub async fn dispose(mut self) -> SessionOutcome {
        debug!(url = %self.descriptor, "Disposing playback session");
        self.cancellation_token.cancel();

        if let Some(scheduler) = self.scheduler.take()
            && let Err(e) = scheduler.await
        {
            warn!(error = %e, "Health check scheduler task failed");
        }

        match self.worker.take() {
            Some(worker) => match worker.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Session worker task failed");
                    SessionOutcome::Disposed
                }
            },
            None => SessionOutcome::Disposed,
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(PlayerError::Disposed);
        }
        self.sender
            .send(SessionMessage::Command(command))
            .await
            .map_err(|_| PlayerError::Disposed)
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

/// Delivers audio-route interruptions to a session without keeping it alive.
#[derive(Debug, Clone)]
pub struct InterruptionHandle {
    mailbox: mpsc::WeakSender<SessionMessage>,
}

impl InterruptionHandle {
    /// Deliver an interruption. Fails with [`PlayerError::Disposed`] once the
    /// session is gone.
    pub async fn interrupt(&self) -> Result<()> {
        let mailbox = self.mailbox.upgrade().ok_or(PlayerError::Disposed)?;
        mailbox
            .send(SessionMessage::Command(Command::Interrupt))
            .await
            .map_err(|_| PlayerError::Disposed)
    }
}
