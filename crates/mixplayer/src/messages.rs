//! Messages handled by the session worker.
//!
//! Every mutation of session state goes through this mailbox so that it runs
//! on the worker, one message at a time.

use tokio::sync::oneshot;

use crate::error::ProbeError;
use crate::machine::SessionSnapshot;
use crate::media::MediaEndReason;
use crate::probe::FreshnessToken;

/// Explicit commands issued by callers of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Reload,
    /// External audio-route interruption.
    Interrupt,
    /// Tear down the media session and end playback.
    Stop,
}

#[derive(Debug)]
pub enum SessionMessage {
    /// Run one health check.
    Tick,
    /// A freshness probe issued by an earlier tick completed.
    ProbeCompleted(Result<FreshnessToken, ProbeError>),
    /// The media engine reported the end of a media session.
    MediaEnded {
        generation: u64,
        reason: MediaEndReason,
    },
    Command(Command),
    /// Query the current state (response sent via oneshot channel).
    Snapshot(oneshot::Sender<SessionSnapshot>),
}
