//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a [`Session`] over the simulated
//! device and in-memory track registry, and keeps handles to both so tests
//! can inspect what the host saw. The [`with_backend`] constructor also
//! starts a wiremock server standing in for the streaming backend.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use castforged::config::Config;
use castforged::host::{InMemoryTrackManager, SimulatedDevice};
use castforged::session::Session;
use castforged::telemetry::HttpStatusSource;
use castforged_common::{AudioTrack, EventBus, EventPayload, ExternalTextTrack, Resolution, TrackId};
use wiremock::MockServer;

pub const H264: &str = r#"video/mp4; codecs="avc1.42E01E""#;
pub const H264_HIGH: &str = r#"video/mp4; codecs="avc1.640028""#;
pub const AAC: &str = r#"audio/mp4; codecs="mp4a.40.5""#;

/// Session plus the host doubles it talks to.
pub struct TestHarness {
    pub session: Session,
    pub device: Arc<SimulatedDevice>,
    pub tracks: Arc<InMemoryTrackManager>,
    pub events: Arc<EventBus>,
}

impl TestHarness {
    /// H.264 + AAC device at 1080p, telemetry off.
    pub fn new() -> Self {
        Self::with_config(offline_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(
            config,
            SimulatedDevice::new([H264, H264_HIGH, AAC], Some(Resolution::new(1920, 1080))),
            InMemoryTrackManager::with_audio_tracks(vec![audio(1, "en"), audio(2, "de")]),
        )
    }

    pub fn with_device(config: Config, device: SimulatedDevice) -> Self {
        Self::build(config, device, InMemoryTrackManager::new())
    }

    /// Harness whose telemetry polls a mock backend every `interval`.
    pub async fn with_backend(interval: Duration) -> (Self, MockServer) {
        let server = MockServer::start().await;
        let mut harness = Self::new();
        harness.session.set_status_source(
            Arc::new(HttpStatusSource::new(Duration::from_secs(2))),
            interval,
        );
        (harness, server)
    }

    fn build(config: Config, device: SimulatedDevice, tracks: InMemoryTrackManager) -> Self {
        let device = Arc::new(device);
        let tracks = Arc::new(tracks);
        let events = Arc::new(EventBus::default());
        let session = Session::with_events(&config, device.clone(), tracks.clone(), events.clone());

        Self {
            session,
            device,
            tracks,
            events,
        }
    }

    /// Payloads published so far, oldest first.
    pub fn payloads(&self) -> Vec<EventPayload> {
        let mut events = self.events.recent_events(100);
        events.reverse();
        events.into_iter().map(|e| e.payload).collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.telemetry.enabled = false;
    config
}

pub fn audio(id: u32, language: &str) -> AudioTrack {
    AudioTrack {
        track_id: TrackId(id),
        language: Some(language.to_string()),
        name: None,
    }
}

pub fn vtt(language: &str) -> ExternalTextTrack {
    ExternalTextTrack {
        mime_type: "text/vtt".to_string(),
        uri: format!("https://subs.example/{language}.vtt"),
        language: Some(language.to_string()),
        display_label: Some(language.to_uppercase()),
    }
}
