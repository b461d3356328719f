//! Reload suppression policy.
//!
//! A reload is only worth doing when the upstream manifest changed, and it is
//! never done behind the back of a session that is already playing: only the
//! buffering health signal may interrupt playback.

use tracing::debug;

use crate::probe::FreshnessToken;
use crate::state::SessionState;

/// Derive the reload permission for a new token observation.
pub fn reload_permitted(
    new_token: &FreshnessToken,
    previous_token: Option<&FreshnessToken>,
    state: SessionState,
) -> bool {
    let unchanged = previous_token == Some(new_token);
    !unchanged && state != SessionState::Playing
}

/// Tracks the last observed freshness token and the permission derived from it.
///
/// The permission starts out `true` and is only ever recomputed through
/// [`ReloadGate::observe`], or restored to `true` by [`ReloadGate::reset`].
#[derive(Debug, Clone)]
pub struct ReloadGate {
    previous: Option<FreshnessToken>,
    permitted: bool,
}

impl Default for ReloadGate {
    fn default() -> Self {
        Self {
            previous: None,
            permitted: true,
        }
    }
}

impl ReloadGate {
    /// A gate that has not observed any token yet and permits reloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last token and return to the initial permission.
    pub fn reset(&mut self) {
        debug!(etag = ?self.previous, "Reload gate reset");
        *self = Self::default();
    }

    /// Record a completed probe and recompute the permission.
    pub fn observe(&mut self, token: FreshnessToken, state: SessionState) -> bool {
        self.permitted = reload_permitted(&token, self.previous.as_ref(), state);
        debug!(
            etag = %token,
            state = %state,
            permitted = self.permitted,
            "Freshness token observed"
        );
        self.previous = Some(token);
        self.permitted
    }

    /// Permission derived from the last observation.
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Most recent token observed since creation or the last reset.
    pub fn last_token(&self) -> Option<&FreshnessToken> {
        self.previous.as_ref()
    }
}
