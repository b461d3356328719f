use serde::Serialize;

/// Counters kept by a playback session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub ticks: u64,
    /// Media sessions built, including the initial one.
    pub rebuilds: u64,
    /// Rebuilds skipped because the reload gate refused them.
    pub suppressed_rebuilds: u64,
    pub failed_rebuilds: u64,
    pub probes_succeeded: u64,
    pub probes_failed: u64,
    /// End-of-stream notifications for the current media session.
    pub media_ended: u64,
}
