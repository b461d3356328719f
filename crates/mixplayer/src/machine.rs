//! Session state machine.
//!
//! Owns the playback state, the reload gate and the media engine. All methods
//! are synchronous and are only called from the session worker, which makes
//! every tick and every command atomic with respect to each other.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::descriptor::StreamDescriptor;
use crate::error::ProbeError;
use crate::events::{SessionEvent, StateChangeCause, StatePublisher};
use crate::gate::ReloadGate;
use crate::media::{MediaEndReason, MediaEngine, MediaEventSink, MediaReadiness};
use crate::messages::{Command, SessionMessage};
use crate::probe::FreshnessToken;
use crate::state::{SessionState, TickAction, TickDecision, TickInputs, evaluate_tick};
use crate::stats::SessionStats;

/// Result of going through the rebuild path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Rebuilt { generation: u64 },
    /// Refused by the reload gate; the existing media session is kept.
    Suppressed,
    /// Automatic reloading is switched off.
    Disabled,
    /// The engine failed to build a session; the next tick retries.
    Retrying,
    /// The engine failed for good; the session moved to `Failed`.
    Failed,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub from: SessionState,
    pub inputs: TickInputs,
    pub decision: TickDecision,
    pub rebuild: Option<RebuildOutcome>,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub reload_permitted: bool,
    pub token: Option<FreshnessToken>,
    /// Generation of the current media session; 0 before the first build.
    pub generation: u64,
    pub stats: SessionStats,
}

pub(crate) struct SessionMachine<E: MediaEngine> {
    descriptor: StreamDescriptor,
    engine: E,
    state: SessionState,
    gate: ReloadGate,
    auto_reload: bool,
    /// Generation of the current media session; bumped on every build.
    generation: u64,
    has_session: bool,
    /// Handed to media sessions so they can report their end.
    mailbox: mpsc::WeakSender<SessionMessage>,
    publisher: StatePublisher,
    stats: SessionStats,
}

impl<E: MediaEngine> SessionMachine<E> {
    pub(crate) fn new(
        descriptor: StreamDescriptor,
        engine: E,
        auto_reload: bool,
        mailbox: mpsc::WeakSender<SessionMessage>,
        publisher: StatePublisher,
    ) -> Self {
        Self {
            descriptor,
            engine,
            state: SessionState::Loading,
            gate: ReloadGate::new(),
            auto_reload,
            generation: 0,
            has_session: false,
            mailbox,
            publisher,
            stats: SessionStats::default(),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    /// Build the first media session. Runs regardless of the auto-reload
    /// switch.
    pub(crate) fn establish(&mut self) -> RebuildOutcome {
        info!(url = %self.descriptor, "Establishing media session");
        self.build_session()
    }

    /// Run one health check.
    pub(crate) fn tick(&mut self) -> TickReport {
        self.stats.ticks += 1;

        let from = self.state;
        let inputs = TickInputs {
            buffering_healthy: self.engine.is_likely_to_keep_up(),
            media_ready: self.has_session && self.engine.readiness() == MediaReadiness::Ready,
            reload_permitted: self.gate.is_permitted(),
        };
        let decision = evaluate_tick(from, inputs);

        debug!(
            state = %from,
            buffering_healthy = inputs.buffering_healthy,
            media_ready = inputs.media_ready,
            reload_permitted = inputs.reload_permitted,
            next = %decision.next,
            "Health check"
        );

        let rebuild = match decision.action {
            TickAction::StartPlayback => {
                self.engine.play();
                self.set_state(decision.next, StateChangeCause::HealthCheck);
                None
            }
            TickAction::RebuildSession => Some(self.request_rebuild()),
            TickAction::None => {
                self.set_state(decision.next, StateChangeCause::HealthCheck);
                None
            }
        };

        TickReport {
            from,
            inputs,
            decision,
            rebuild,
        }
    }

    /// Consume the result of a completed freshness probe.
    ///
    /// Only the gate is updated here; state decisions wait for the next tick.
    pub(crate) fn observe_probe(&mut self, result: Result<FreshnessToken, ProbeError>) {
        match result {
            Ok(token) => {
                self.stats.probes_succeeded += 1;
                self.gate.observe(token, self.state);
            }
            Err(e) => {
                self.stats.probes_failed += 1;
                if e.is_transient() {
                    debug!(url = %self.descriptor, error = %e, "Freshness probe failed");
                } else {
                    warn!(url = %self.descriptor, error = %e, "Freshness probe failed");
                }
            }
        }
    }

    pub(crate) fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Reload => self.reload(),
            Command::Interrupt => self.on_interruption(),
            Command::Stop => self.stop(),
        }
    }

    fn play(&mut self) {
        if self.state != SessionState::Paused {
            debug!(state = %self.state, "Ignoring play");
            return;
        }
        self.engine.play();
        self.set_state(SessionState::Playing, StateChangeCause::Play);
    }

    fn pause(&mut self) {
        if self.state != SessionState::Playing {
            debug!(state = %self.state, "Ignoring pause");
            return;
        }
        self.engine.pause();
        self.set_state(SessionState::Paused, StateChangeCause::Pause);
    }

    /// Start over as if freshly spawned: the gate forgets the last token, so
    /// an unchanged manifest does not keep the reloaded session in `Loading`.
    fn reload(&mut self) {
        info!(url = %self.descriptor, state = %self.state, "Reload requested");
        self.gate.reset();
        self.set_state(SessionState::Loading, StateChangeCause::Reload);
    }

    fn on_interruption(&mut self) {
        info!(url = %self.descriptor, state = %self.state, "Playback interrupted");
        self.engine.pause();
        self.set_state(SessionState::Loading, StateChangeCause::Interruption);
    }

    fn stop(&mut self) {
        if self.state == SessionState::Ended {
            return;
        }
        self.teardown();
        self.set_state(SessionState::Ended, StateChangeCause::Stop);
    }

    /// Self-healing path for media sessions that end or fail mid-stream.
    pub(crate) fn on_media_ended(
        &mut self,
        generation: u64,
        reason: MediaEndReason,
    ) -> Option<RebuildOutcome> {
        if generation != self.generation || !self.has_session {
            debug!(
                generation,
                current = self.generation,
                "Ignoring end notification for a replaced media session"
            );
            return None;
        }
        self.stats.media_ended += 1;

        if self.state.is_settled() {
            debug!(state = %self.state, reason = ?reason, "Media session ended while settled");
            return None;
        }

        warn!(url = %self.descriptor, generation, reason = ?reason, "Media session ended");
        Some(self.request_rebuild())
    }

    /// The gated rebuild path shared by health checks and end notifications.
    fn request_rebuild(&mut self) -> RebuildOutcome {
        if !self.auto_reload {
            return RebuildOutcome::Disabled;
        }
        // Suppression only protects an existing media session.
        if self.has_session && !self.gate.is_permitted() {
            self.stats.suppressed_rebuilds += 1;
            debug!(url = %self.descriptor, "Rebuild suppressed by reload gate");
            self.publisher.emit(SessionEvent::RebuildSuppressed {
                timestamp: Utc::now(),
            });
            return RebuildOutcome::Suppressed;
        }
        self.build_session()
    }

    fn build_session(&mut self) -> RebuildOutcome {
        self.teardown();
        self.generation += 1;
        let generation = self.generation;
        let sink = MediaEventSink::new(generation, self.mailbox.clone());

        match self.engine.replace_session(&self.descriptor, sink) {
            Ok(()) => {
                self.has_session = true;
                self.stats.rebuilds += 1;
                info!(url = %self.descriptor, generation, "Media session built");
                self.publisher.emit(SessionEvent::SessionRebuilt {
                    generation,
                    timestamp: Utc::now(),
                });
                self.set_state(SessionState::Loading, StateChangeCause::SessionRebuilt);
                RebuildOutcome::Rebuilt { generation }
            }
            Err(e) if e.is_recoverable() => {
                self.stats.failed_rebuilds += 1;
                warn!(url = %self.descriptor, generation, error = %e, "Media session build failed, will retry");
                self.set_state(SessionState::Loading, StateChangeCause::SessionRebuilt);
                RebuildOutcome::Retrying
            }
            Err(e) => {
                self.stats.failed_rebuilds += 1;
                error!(url = %self.descriptor, generation, error = %e, "Media session build failed");
                self.set_state(SessionState::Failed, StateChangeCause::RebuildFailed);
                RebuildOutcome::Failed
            }
        }
    }

    fn teardown(&mut self) {
        if self.has_session {
            self.engine.teardown();
            self.has_session = false;
        }
    }

    /// Release the media session on disposal. Does not publish a state change.
    pub(crate) fn shutdown(&mut self) {
        self.teardown();
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            reload_permitted: self.gate.is_permitted(),
            token: self.gate.last_token().cloned(),
            generation: if self.has_session { self.generation } else { 0 },
            stats: self.stats,
        }
    }

    fn set_state(&mut self, next: SessionState, cause: StateChangeCause) {
        if self.state == next {
            return;
        }
        let from = std::mem::replace(&mut self.state, next);
        self.publisher.state_changed(from, next, cause);
    }
}
