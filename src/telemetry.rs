//! Transcode status polling.
//!
//! While media plays, the backend's status endpoint is polled on a fixed
//! interval and each answer is republished on the session's [`EventBus`].
//! At most one poller runs per session; the task handle is the only
//! cancellation token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use castforged_common::{Error, EventBus, EventPayload, Result, SessionId, TranscodeStatus};
use reqwest::Client;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

/// Path of the status endpoint relative to the backend origin.
pub const STATUS_PATH: &str = "/transcode-data";

/// Status endpoint for a backend origin.
pub fn status_url(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), STATUS_PATH)
}

/// Something that can report the backend's transcode status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, origin: &str) -> Result<TranscodeStatus>;
}

/// Fetches status over HTTP.
pub struct HttpStatusSource {
    client: Client,
}

impl HttpStatusSource {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self { client }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, origin: &str) -> Result<TranscodeStatus> {
        let url = status_url(origin);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::http(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::http(format!("GET {url}: status {}", response.status())));
        }

        response
            .json::<TranscodeStatus>()
            .await
            .map_err(|e| Error::http(format!("GET {url}: invalid body: {e}")))
    }
}

/// Periodic status poller bound to one session.
pub struct TelemetryPoller {
    source: Arc<dyn StatusSource>,
    events: Arc<EventBus>,
    session_id: SessionId,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl TelemetryPoller {
    pub fn new(
        source: Arc<dyn StatusSource>,
        events: Arc<EventBus>,
        session_id: SessionId,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            events,
            session_id,
            interval,
            handle: None,
        }
    }

    /// Start polling `origin`. A running poller is stopped first. The first
    /// fetch happens one interval after this call.
    pub fn start(&mut self, origin: String) {
        self.stop();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(%origin, "No async runtime, telemetry polling disabled");
                return;
            }
        };

        tracing::info!(
            %origin,
            interval_secs = self.interval.as_secs_f64(),
            "Starting telemetry poller"
        );
        self.events.publish(
            self.session_id,
            EventPayload::PollerStarted {
                origin: origin.clone(),
            },
        );

        let source = self.source.clone();
        let events = self.events.clone();
        let session_id = self.session_id;
        let period = self.interval;

        self.handle = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Dropped with this task on stop, which aborts in-flight fetches.
            let mut inflight = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let source = source.clone();
                        let origin = origin.clone();
                        inflight.spawn(async move { source.fetch(&origin).await });
                    }
                    Some(joined) = inflight.join_next() => {
                        match joined {
                            Ok(Ok(status)) => {
                                tracing::debug!(?status, "Transcode status");
                                events.publish(
                                    session_id,
                                    EventPayload::TranscodeStatus { status },
                                );
                            }
                            Ok(Err(e)) => {
                                tracing::warn!("Telemetry fetch failed: {}", e);
                                events.publish(
                                    session_id,
                                    EventPayload::TelemetryFailed { error: e.to_string() },
                                );
                            }
                            Err(e) => {
                                tracing::warn!("Telemetry fetch task failed: {}", e);
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Stop polling. Safe to call when not started or already stopped.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Stopped telemetry poller");
            self.events.publish(self.session_id, EventPayload::PollerStopped);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TelemetryPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records each origin it is asked about; optionally hangs on the first call.
    #[derive(Default)]
    struct RecordingSource {
        calls: Mutex<Vec<String>>,
        first_call_delay: Option<Duration>,
    }

    impl RecordingSource {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl StatusSource for RecordingSource {
        async fn fetch(&self, origin: &str) -> Result<TranscodeStatus> {
            let first = {
                let mut calls = self.calls.lock();
                calls.push(origin.to_string());
                calls.len() == 1
            };
            if let (true, Some(delay)) = (first, self.first_call_delay) {
                tokio::time::sleep(delay).await;
            }
            Ok(TranscodeStatus {
                original_video_codec: Some("hevc".to_string()),
                original_audio_codec: Some("eac3".to_string()),
                is_video_transcoding: true,
                is_audio_transcoding: false,
            })
        }
    }

    fn poller(source: Arc<RecordingSource>, events: Arc<EventBus>) -> TelemetryPoller {
        TelemetryPoller::new(source, events, SessionId::new(), Duration::from_secs(5))
    }

    #[test]
    fn test_status_url() {
        assert_eq!(status_url("https://h:8443"), "https://h:8443/transcode-data");
        assert_eq!(status_url("https://h/"), "https://h/transcode-data");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick_fetches_nothing() {
        let source = Arc::new(RecordingSource::default());
        let mut poller = poller(source.clone(), Arc::new(EventBus::default()));

        poller.start("https://h".to_string());
        tokio::time::sleep(Duration::from_millis(4_900)).await;
        poller.stop();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(source.calls().is_empty());
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_publishes() {
        let source = Arc::new(RecordingSource::default());
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let mut poller = poller(source.clone(), events.clone());

        poller.start("https://h".to_string());
        tokio::time::sleep(Duration::from_millis(10_100)).await;

        assert_eq!(source.calls().len(), 2);

        let mut statuses = 0;
        while let Ok(event) = rx.try_recv() {
            if let EventPayload::TranscodeStatus { status } = event.payload {
                assert!(status.is_video_transcoding);
                statuses += 1;
            }
        }
        assert_eq!(statuses, 2);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tick_does_not_block_next() {
        let source = Arc::new(RecordingSource {
            first_call_delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let mut poller = poller(source.clone(), Arc::new(EventBus::default()));

        poller.start("https://h".to_string());
        tokio::time::sleep(Duration::from_millis(15_100)).await;

        assert_eq!(source.calls().len(), 3);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_poller() {
        let source = Arc::new(RecordingSource::default());
        let mut poller = poller(source.clone(), Arc::new(EventBus::default()));

        poller.start("https://old".to_string());
        poller.start("https://new".to_string());
        tokio::time::sleep(Duration::from_millis(5_100)).await;

        assert_eq!(source.calls(), vec!["https://new".to_string()]);
        poller.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let events = Arc::new(EventBus::default());
        let mut poller = poller(Arc::new(RecordingSource::default()), events.clone());

        poller.stop();
        poller.start("https://h".to_string());
        poller.stop();
        poller.stop();

        let stops = events
            .recent_events(10)
            .into_iter()
            .filter(|e| e.payload == EventPayload::PollerStopped)
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_start_without_runtime_is_noop() {
        let source = Arc::new(RecordingSource::default());
        let mut poller = poller(source, Arc::new(EventBus::default()));
        poller.start("https://h".to_string());
        assert!(!poller.is_running());
    }
}
