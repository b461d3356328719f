//! Session states and the per-tick transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Playback status of a session. Initial state is [`SessionState::Loading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Loading,
    Playing,
    Paused,
    Failed,
    Ended,
}

impl SessionState {
    /// Display name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Failed => "Failed",
            Self::Ended => "Ended",
        }
    }

    /// States the health check never leaves on its own.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paused | Self::Failed | Self::Ended)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals sampled at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInputs {
    /// The media pipeline is likely to keep up without stalling.
    pub buffering_healthy: bool,
    /// The current media session reports it is ready to play.
    pub media_ready: bool,
    pub reload_permitted: bool,
}

/// Side effect requested by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    None,
    StartPlayback,
    RebuildSession,
}

/// Outcome of evaluating one tick against the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickDecision {
    pub next: SessionState,
    pub action: TickAction,
}

impl TickDecision {
    fn stay(state: SessionState) -> Self {
        Self {
            next: state,
            action: TickAction::None,
        }
    }
}

/// Evaluate the health-check transition table for one tick.
///
/// Pure function of the current state and the sampled inputs; performs at
/// most one transition.
pub fn evaluate_tick(state: SessionState, inputs: TickInputs) -> TickDecision {
    match state {
        SessionState::Loading => {
            if inputs.buffering_healthy && inputs.media_ready && inputs.reload_permitted {
                TickDecision {
                    next: SessionState::Playing,
                    action: TickAction::StartPlayback,
                }
            } else {
                TickDecision {
                    next: SessionState::Loading,
                    action: TickAction::RebuildSession,
                }
            }
        }
        SessionState::Playing if !inputs.buffering_healthy => {
            // The following Loading tick rebuilds.
            TickDecision::stay(SessionState::Loading)
        }
        SessionState::Playing => TickDecision::stay(SessionState::Playing),
        SessionState::Paused | SessionState::Failed | SessionState::Ended => {
            TickDecision::stay(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(buffering_healthy: bool, media_ready: bool, reload_permitted: bool) -> TickInputs {
        TickInputs {
            buffering_healthy,
            media_ready,
            reload_permitted,
        }
    }

    #[test]
    fn test_loading_starts_playback_when_all_conditions_hold() {
        let decision = evaluate_tick(SessionState::Loading, inputs(true, true, true));
        assert_eq!(decision.next, SessionState::Playing);
        assert_eq!(decision.action, TickAction::StartPlayback);
    }

    #[test]
    fn test_loading_rebuilds_when_any_condition_fails() {
        for flags in [
            (false, true, true),
            (true, false, true),
            (true, true, false),
            (false, false, false),
        ] {
            let decision = evaluate_tick(SessionState::Loading, inputs(flags.0, flags.1, flags.2));
            assert_eq!(decision.next, SessionState::Loading, "flags {flags:?}");
            assert_eq!(decision.action, TickAction::RebuildSession, "flags {flags:?}");
        }
    }

    #[test]
    fn test_playing_drops_to_loading_on_unhealthy_buffer() {
        for (ready, permitted) in [(true, true), (false, false), (true, false)] {
            let decision = evaluate_tick(SessionState::Playing, inputs(false, ready, permitted));
            assert_eq!(decision.next, SessionState::Loading);
            assert_eq!(decision.action, TickAction::None);
        }
    }

    #[test]
    fn test_playing_stays_while_healthy() {
        for (ready, permitted) in [(true, true), (false, false), (false, true)] {
            let decision = evaluate_tick(SessionState::Playing, inputs(true, ready, permitted));
            assert_eq!(decision, TickDecision::stay(SessionState::Playing));
        }
    }

    #[test]
    fn test_settled_states_never_change_on_tick() {
        for state in [SessionState::Paused, SessionState::Failed, SessionState::Ended] {
            assert!(state.is_settled());
            for flags in [(true, true, true), (false, false, false)] {
                let decision = evaluate_tick(state, inputs(flags.0, flags.1, flags.2));
                assert_eq!(decision, TickDecision::stay(state));
            }
        }
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::default(), SessionState::Loading);
        assert_eq!(SessionState::Playing.to_string(), "Playing");
        assert_eq!(
            serde_json::to_string(&SessionState::Failed).unwrap(),
            "\"Failed\""
        );
    }
}
