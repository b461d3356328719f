#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mixplayer::{
    FreshnessProbe, FreshnessToken, MediaEngine, MediaError, MediaEventSink, MediaReadiness,
    PlayerSession, ProbeError, SessionSnapshot, SessionState, StreamDescriptor,
};
use parking_lot::Mutex;

pub const STREAM_URL: &str = "http://127.0.0.1:9/hls/live.m3u8";

/// Initialize tracing for tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn descriptor() -> StreamDescriptor {
    StreamDescriptor::parse(STREAM_URL).unwrap()
}

#[derive(Debug, Default)]
pub struct EngineState {
    pub keep_up: bool,
    pub readiness: MediaReadiness,
    pub fail_builds: Option<MediaError>,
    pub builds: u32,
    pub teardowns: u32,
    pub plays: u32,
    pub pauses: u32,
    pub sinks: Vec<MediaEventSink>,
}

/// In-memory media engine whose health is set by the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    state: Arc<Mutex<EngineState>>,
}

impl ScriptedEngine {
    pub fn healthy() -> Self {
        let engine = Self::default();
        engine.set_health(true, MediaReadiness::Ready);
        engine
    }

    pub fn set_health(&self, keep_up: bool, readiness: MediaReadiness) {
        let mut state = self.state.lock();
        state.keep_up = keep_up;
        state.readiness = readiness;
    }

    pub fn fail_builds(&self, error: Option<MediaError>) {
        self.state.lock().fail_builds = error;
    }

    pub fn builds(&self) -> u32 {
        self.state.lock().builds
    }

    pub fn teardowns(&self) -> u32 {
        self.state.lock().teardowns
    }

    pub fn plays(&self) -> u32 {
        self.state.lock().plays
    }

    pub fn pauses(&self) -> u32 {
        self.state.lock().pauses
    }

    pub fn sink(&self, index: usize) -> MediaEventSink {
        self.state.lock().sinks[index].clone()
    }

    pub fn last_sink(&self) -> MediaEventSink {
        self.state
            .lock()
            .sinks
            .last()
            .cloned()
            .expect("no media session built")
    }
}

impl MediaEngine for ScriptedEngine {
    fn replace_session(
        &mut self,
        _descriptor: &StreamDescriptor,
        events: MediaEventSink,
    ) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_builds.clone() {
            return Err(err);
        }
        state.builds += 1;
        state.sinks.push(events);
        Ok(())
    }

    fn teardown(&mut self) {
        self.state.lock().teardowns += 1;
    }

    fn play(&mut self) {
        self.state.lock().plays += 1;
    }

    fn pause(&mut self) {
        self.state.lock().pauses += 1;
    }

    fn is_likely_to_keep_up(&self) -> bool {
        self.state.lock().keep_up
    }

    fn readiness(&self) -> MediaReadiness {
        self.state.lock().readiness
    }
}

#[derive(Debug)]
enum ProbeMode {
    /// Always answer with the same tag.
    Fixed(String),
    /// Answer with a new tag on every probe.
    Rotating(u64),
    /// Fail every probe.
    Failing,
    /// Never complete.
    Hanging,
    /// Answer after a delay.
    Delayed(Duration, String),
}

/// Freshness probe scripted by the test.
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    mode: Arc<Mutex<ProbeMode>>,
    calls: Arc<Mutex<u32>>,
}

impl ScriptedProbe {
    fn with_mode(mode: ProbeMode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn fixed(tag: &str) -> Self {
        Self::with_mode(ProbeMode::Fixed(tag.to_string()))
    }

    pub fn rotating() -> Self {
        Self::with_mode(ProbeMode::Rotating(0))
    }

    pub fn failing() -> Self {
        Self::with_mode(ProbeMode::Failing)
    }

    pub fn hanging() -> Self {
        Self::with_mode(ProbeMode::Hanging)
    }

    pub fn delayed(delay: Duration, tag: &str) -> Self {
        Self::with_mode(ProbeMode::Delayed(delay, tag.to_string()))
    }

    pub fn set_tag(&self, tag: &str) {
        *self.mode.lock() = ProbeMode::Fixed(tag.to_string());
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock()
    }

    pub fn into_arc(self) -> Arc<dyn FreshnessProbe> {
        Arc::new(self)
    }
}

#[async_trait]
impl FreshnessProbe for ScriptedProbe {
    async fn probe(&self, descriptor: &StreamDescriptor) -> Result<FreshnessToken, ProbeError> {
        *self.calls.lock() += 1;

        let (delay, answer) = {
            let mut mode = self.mode.lock();
            match &mut *mode {
                ProbeMode::Fixed(tag) => (None, Some(tag.clone())),
                ProbeMode::Rotating(n) => {
                    *n += 1;
                    (None, Some(format!("\"v{n}\"")))
                }
                ProbeMode::Failing => (None, None),
                ProbeMode::Hanging => (Some(Duration::MAX), None),
                ProbeMode::Delayed(delay, tag) => (Some(*delay), Some(tag.clone())),
            }
        };

        if let Some(delay) = delay {
            if delay == Duration::MAX {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(delay).await;
        }

        answer
            .map(FreshnessToken::from)
            .ok_or_else(|| ProbeError::MissingTag {
                url: descriptor.to_string(),
            })
    }
}

pub async fn wait_for_state(session: &PlayerSession, state: SessionState) {
    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state}"))
        .expect("session closed");
}

pub async fn wait_for_snapshot<F>(session: &PlayerSession, mut predicate: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    for _ in 0..600 {
        let snapshot = session.snapshot().await.unwrap();
        if predicate(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for snapshot condition");
}
