//! The session worker: the single execution context of a playback session.
//!
//! Ticks, probe results, end notifications and commands all arrive through
//! one mailbox and are handled one at a time, so session state is never
//! mutated concurrently.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::descriptor::StreamDescriptor;
use crate::machine::SessionMachine;
use crate::media::MediaEngine;
use crate::messages::SessionMessage;
use crate::probe::FreshnessProbe;

/// How a session worker finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The session was disposed.
    Disposed,
    /// Every handle to the session was dropped.
    Closed,
}

pub(crate) struct SessionWorker<E: MediaEngine> {
    machine: SessionMachine<E>,
    descriptor: StreamDescriptor,
    prober: Arc<dyn FreshnessProbe>,
    mailbox: mpsc::Receiver<SessionMessage>,
    /// Handed to probe tasks; never keeps the session alive.
    self_handle: mpsc::WeakSender<SessionMessage>,
    cancellation_token: CancellationToken,
}

impl<E: MediaEngine> SessionWorker<E> {
    pub(crate) fn new(
        machine: SessionMachine<E>,
        descriptor: StreamDescriptor,
        prober: Arc<dyn FreshnessProbe>,
        mailbox: mpsc::Receiver<SessionMessage>,
        self_handle: mpsc::WeakSender<SessionMessage>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            machine,
            descriptor,
            prober,
            mailbox,
            self_handle,
            cancellation_token,
        }
    }

    pub(crate) async fn run(mut self) -> SessionOutcome {
        info!(url = %self.descriptor, "Playback session starting");
        self.machine.establish();

        let outcome = loop {
            tokio::select! {
                // Disposal wins over anything still queued.
                biased;

                _ = self.cancellation_token.cancelled() => break SessionOutcome::Disposed,

                msg = self.mailbox.recv() => match msg {
                    Some(msg) => self.handle_message(msg),
                    None => break SessionOutcome::Closed,
                },
            }
        };

        self.mailbox.close();
        self.machine.shutdown();
        info!(
            url = %self.descriptor,
            outcome = ?outcome,
            state = %self.machine.state(),
            "Playback session stopped"
        );
        outcome
    }

    fn handle_message(&mut self, msg: SessionMessage) {
        match msg {
            SessionMessage::Tick => {
                self.issue_probe();
                let report = self.machine.tick();
                trace!(report = ?report, "Tick handled");
            }
            SessionMessage::ProbeCompleted(result) => self.machine.observe_probe(result),
            SessionMessage::MediaEnded { generation, reason } => {
                if let Some(outcome) = self.machine.on_media_ended(generation, reason) {
                    debug!(outcome = ?outcome, "Handled media end");
                }
            }
            SessionMessage::Command(command) => {
                debug!(command = ?command, "Command received");
                self.machine.handle_command(command);
            }
            SessionMessage::Snapshot(reply) => {
                let _ = reply.send(self.machine.snapshot());
            }
        }
    }

    /// Start a freshness probe without waiting for it.
    ///
    /// The result comes back through the mailbox and is consumed by whatever
    /// tick follows it. Results arriving after disposal are dropped.
    fn issue_probe(&self) {
        let prober = Arc::clone(&self.prober);
        let descriptor = self.descriptor.clone();
        let mailbox = self.self_handle.clone();
        let token = self.cancellation_token.child_token();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = prober.probe(&descriptor) => result,
            };
            let Some(mailbox) = mailbox.upgrade() else {
                return;
            };
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = mailbox.send(SessionMessage::ProbeCompleted(result)) => {}
            }
        });
    }
}
