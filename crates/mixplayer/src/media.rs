//! Interface to the media engine that actually decodes and renders the stream.
//!
//! The engine is owned by the session worker and only ever called from it, so
//! implementations do not need interior synchronisation for these calls.

use tokio::sync::mpsc;

use crate::descriptor::StreamDescriptor;
use crate::messages::SessionMessage;

/// Status of the current media session as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaReadiness {
    #[default]
    Unknown,
    Ready,
    Failed,
}

/// Why the engine stopped playing the current media session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEndReason {
    /// The engine reached the end of the stream.
    PlayedToEnd,
    /// Decoding or transport failed mid-stream.
    Failed(String),
}

/// Failure of the media engine to build a session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MediaError {
    #[error("failed to build media session: {reason}")]
    Build { reason: String, recoverable: bool },

    #[error("unsupported media: {reason}")]
    Unsupported { reason: String },
}

impl MediaError {
    /// A build failure that a later attempt may recover from.
    pub fn build(reason: impl Into<String>) -> Self {
        Self::Build {
            reason: reason.into(),
            recoverable: true,
        }
    }

    /// A build failure that will not go away by retrying.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Build {
            reason: reason.into(),
            recoverable: false,
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Whether a later rebuild against the same stream may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Build { recoverable, .. } => *recoverable,
            Self::Unsupported { .. } => false,
        }
    }
}

/// The decoding/rendering collaborator driven by a playback session.
pub trait MediaEngine: Send + 'static {
    /// Discard the current media session (if any) and build a new one for
    /// `descriptor`.
    ///
    /// `events` must be used to report the end or failure of the session that
    /// is being built; reports from replaced sessions are ignored.
    fn replace_session(
        &mut self,
        descriptor: &StreamDescriptor,
        events: MediaEventSink,
    ) -> Result<(), MediaError>;

    /// Release the current media session.
    fn teardown(&mut self);

    /// Start or resume playback of the current media session.
    fn play(&mut self);

    /// Suspend playback, keeping the media session.
    fn pause(&mut self);

    /// Whether the current media session is likely to keep playing without
    /// stalling.
    fn is_likely_to_keep_up(&self) -> bool;

    /// Readiness of the current media session.
    fn readiness(&self) -> MediaReadiness;
}

/// Channel through which the engine reports that a media session ended.
///
/// The sink does not keep the session alive: once the session is disposed,
/// notifications are silently dropped.
#[derive(Debug, Clone)]
pub struct MediaEventSink {
    generation: u64,
    mailbox: mpsc::WeakSender<SessionMessage>,
}

impl MediaEventSink {
    pub(crate) fn new(generation: u64, mailbox: mpsc::WeakSender<SessionMessage>) -> Self {
        Self {
            generation,
            mailbox,
        }
    }

    /// Generation of the media session this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report that the media session ended, waiting for mailbox capacity.
    ///
    /// Returns `false` when the playback session is gone.
    pub async fn notify(&self, reason: MediaEndReason) -> bool {
        let Some(mailbox) = self.mailbox.upgrade() else {
            return false;
        };
        mailbox
            .send(SessionMessage::MediaEnded {
                generation: self.generation,
                reason,
            })
            .await
            .is_ok()
    }

    /// Non-blocking variant of [`MediaEventSink::notify`] for engine callbacks
    /// running outside of an async context.
    ///
    /// Returns `false` when the playback session is gone or its mailbox is full.
    pub fn try_notify(&self, reason: MediaEndReason) -> bool {
        let Some(mailbox) = self.mailbox.upgrade() else {
            return false;
        };
        mailbox
            .try_send(SessionMessage::MediaEnded {
                generation: self.generation,
                reason,
            })
            .is_ok()
    }
}
