//! Self-healing playback sessions for live HLS streams.
//!
//! A [`PlayerSession`] keeps a live stream playing across transient network
//! failures. On a fixed period it samples the buffering health of the
//! [`MediaEngine`] and fires an HTTP freshness probe whose `etag` decides
//! whether rebuilding the media session is worth it. Decoding and rendering
//! are left to the media engine.
//!
//! ```no_run
//! # use mixplayer::{MediaEngine, PlayerConfig, PlayerSession, StreamDescriptor};
//! # async fn run(engine: impl MediaEngine) -> mixplayer::Result<()> {
//! let descriptor = StreamDescriptor::parse("https://cdn.example.com/hls/live.m3u8")?;
//! let session = PlayerSession::spawn(descriptor, engine, PlayerConfig::default())?;
//!
//! let mut state = session.subscribe();
//! while state.changed().await.is_ok() {
//!     println!("session is {}", *state.borrow());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod gate;
mod machine;
pub mod media;
mod messages;
pub mod probe;
mod scheduler;
pub mod session;
pub mod state;
pub mod stats;
mod worker;

pub use config::{PlayerConfig, ProbeConfig, ProxyAuth, ProxyConfig, ProxyType};
pub use descriptor::StreamDescriptor;
pub use error::{PlayerError, ProbeError, Result};
pub use events::{SessionEvent, StateChangeCause};
pub use gate::{ReloadGate, reload_permitted};
pub use machine::{RebuildOutcome, SessionSnapshot, TickReport};
pub use media::{MediaEndReason, MediaEngine, MediaError, MediaEventSink, MediaReadiness};
pub use messages::Command;
pub use probe::{FreshnessProbe, FreshnessToken, HttpFreshnessProber};
pub use session::{InterruptionHandle, PlayerSession};
pub use state::{SessionState, TickAction, TickDecision, TickInputs, evaluate_tick};
pub use stats::SessionStats;
pub use worker::SessionOutcome;
