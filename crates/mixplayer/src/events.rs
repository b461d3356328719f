//! Observable session state.
//!
//! The current state is exposed through a `watch` channel; every change is also
//! broadcast as a [`SessionEvent`], in the order the changes were made.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::state::SessionState;

/// What caused a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StateChangeCause {
    HealthCheck,
    Play,
    Pause,
    Reload,
    Interruption,
    Stop,
    /// A media session was (re)built.
    SessionRebuilt,
    /// Building a media session failed for good.
    RebuildFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
        cause: StateChangeCause,
        timestamp: DateTime<Utc>,
    },
    /// A new media session was built.
    SessionRebuilt {
        generation: u64,
        timestamp: DateTime<Utc>,
    },
    /// A rebuild was refused because the manifest did not change or the
    /// session was playing when the last token arrived.
    RebuildSuppressed { timestamp: DateTime<Utc> },
}

impl SessionEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StateChanged { timestamp, .. }
            | Self::SessionRebuilt { timestamp, .. }
            | Self::RebuildSuppressed { timestamp } => *timestamp,
        }
    }
}

/// Publishing side of the observable state, owned by the session worker.
#[derive(Debug)]
pub(crate) struct StatePublisher {
    state_tx: watch::Sender<SessionState>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl StatePublisher {
    pub(crate) fn new(
        state_tx: watch::Sender<SessionState>,
        events_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            state_tx,
            events_tx,
        }
    }

    /// Publish a committed state change.
    pub(crate) fn state_changed(
        &self,
        from: SessionState,
        to: SessionState,
        cause: StateChangeCause,
    ) {
        info!(from = %from, to = %to, cause = ?cause, "Session state changed");
        self.state_tx.send_replace(to);
        // No subscribers is fine.
        let _ = self.events_tx.send(SessionEvent::StateChanged {
            from,
            to,
            cause,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }
}
