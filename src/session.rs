//! Playback sessions.
//!
//! A [`Session`] wires the negotiation pieces to one host: it owns the only
//! [`LoadInterceptor`] for that host, so each LOAD is intercepted exactly
//! once. State shared between the load step and the load-complete step lives
//! in a [`SessionContext`] owned by the session; nothing is process-wide.

use std::sync::Arc;
use std::time::Duration;

use castforged_common::{
    EventBus, EventPayload, ExternalTextTrack, NegotiationError, SessionId, StreamLocator,
};

use crate::capability::CapabilityProber;
use crate::config::Config;
use crate::diagnostics::DiagnosticProbe;
use crate::host::{DeviceCapabilities, TrackManager};
use crate::interceptor::{LoadInterceptor, NegotiationOutcome};
use crate::messages::{CustomPayload, HostMessage, HostResponse, InboundMessage, LoadRequest};
use crate::retry::PlaybackConfig;
use crate::telemetry::{HttpStatusSource, StatusSource, TelemetryPoller};
use crate::tracks::{FirstTrackPolicy, TrackSelectionPolicy, TrackSynchronizer};

/// State carried from a load to its completion.
#[derive(Debug, Default)]
pub struct SessionContext {
    pending_tracks: Option<Vec<ExternalTextTrack>>,
    outcome: Option<NegotiationOutcome>,
    load_completions: u32,
}

impl SessionContext {
    /// Reset per-load state. Pending tracks survive until consumed or replaced.
    pub fn begin_load(&mut self) {
        self.outcome = None;
        self.load_completions = 0;
    }

    pub fn set_pending_tracks(&mut self, tracks: Vec<ExternalTextTrack>) {
        self.pending_tracks = Some(tracks);
    }

    /// Hand the pending tracks over; a second call returns `None`.
    pub fn take_pending_tracks(&mut self) -> Option<Vec<ExternalTextTrack>> {
        self.pending_tracks.take()
    }

    pub fn pending_tracks(&self) -> Option<&[ExternalTextTrack]> {
        self.pending_tracks.as_deref()
    }

    pub fn record_outcome(&mut self, outcome: NegotiationOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn outcome(&self) -> Option<&NegotiationOutcome> {
        self.outcome.as_ref()
    }

    pub fn negotiated_locator(&self) -> Option<&StreamLocator> {
        self.outcome.as_ref().and_then(NegotiationOutcome::locator)
    }

    pub fn load_completions(&self) -> u32 {
        self.load_completions
    }
}

/// One receiver session bound to one host.
pub struct Session {
    id: SessionId,
    ctx: SessionContext,
    interceptor: LoadInterceptor,
    tracks: TrackSynchronizer,
    poller: Option<TelemetryPoller>,
    diagnostics: Option<DiagnosticProbe>,
    playback: PlaybackConfig,
    events: Arc<EventBus>,
}

impl Session {
    /// Build a session from configuration and host bindings. Telemetry, when
    /// enabled, polls over HTTP.
    pub fn new(
        config: &Config,
        device: Arc<dyn DeviceCapabilities>,
        track_manager: Arc<dyn TrackManager>,
    ) -> Self {
        Self::with_events(config, device, track_manager, Arc::new(EventBus::default()))
    }

    /// Like [`Session::new`], publishing on a caller-supplied event bus.
    pub fn with_events(
        config: &Config,
        device: Arc<dyn DeviceCapabilities>,
        track_manager: Arc<dyn TrackManager>,
        events: Arc<EventBus>,
    ) -> Self {
        let id = SessionId::new();

        let interceptor =
            LoadInterceptor::new(CapabilityProber::new(device), config.negotiation.clone());
        let tracks = TrackSynchronizer::new(
            track_manager,
            Box::new(FirstTrackPolicy::from(&config.tracks)),
        );

        let poller = config.telemetry.enabled.then(|| {
            let source: Arc<dyn StatusSource> = Arc::new(HttpStatusSource::new(
                Duration::from_secs(config.telemetry.request_timeout_secs),
            ));
            TelemetryPoller::new(
                source,
                events.clone(),
                id,
                Duration::from_secs(config.telemetry.interval_secs),
            )
        });

        let diagnostics = config.diagnostics.probe_enabled.then(|| {
            DiagnosticProbe::new(
                Duration::from_secs(config.diagnostics.request_timeout_secs),
                events.clone(),
                id,
            )
        });

        tracing::debug!(session_id = %id, "Created session");

        Self {
            id,
            ctx: SessionContext::default(),
            interceptor,
            tracks,
            poller,
            diagnostics,
            playback: PlaybackConfig::new(&config.retry, &config.playback),
            events,
        }
    }

    /// Replace the telemetry transport, keeping the configured interval.
    pub fn set_status_source(&mut self, source: Arc<dyn StatusSource>, interval: Duration) {
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
        self.poller = Some(TelemetryPoller::new(
            source,
            self.events.clone(),
            self.id,
            interval,
        ));
    }

    /// Override the default track selection.
    pub fn set_selection_policy(&mut self, policy: Box<dyn TrackSelectionPolicy>) {
        self.tracks.set_policy(policy);
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Settings the host applies to its fetch layer.
    pub fn playback_config(&self) -> &PlaybackConfig {
        &self.playback
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(TelemetryPoller::is_running)
    }

    /// Decode and handle a raw message from either channel.
    pub fn handle_message(&mut self, input: &str) -> HostResponse {
        match InboundMessage::from_json(input) {
            Ok(message) => self.handle(message),
            Err(e) => {
                tracing::warn!("Rejected inbound message: {}", e);
                self.events.publish(
                    self.id,
                    EventPayload::MessageRejected {
                        reason: e.reason().to_string(),
                        detail: e.detail.clone(),
                    },
                );
                e.into()
            }
        }
    }

    pub fn handle(&mut self, message: InboundMessage) -> HostResponse {
        match message {
            InboundMessage::Host(HostMessage::Load(request)) => {
                match self.intercept_load(request) {
                    Ok(request) => HostResponse::Message(HostMessage::Load(request)),
                    Err(e) => e.into(),
                }
            }
            InboundMessage::Host(HostMessage::EditTracksInfo(request)) => {
                tracing::debug!(?request, "EDIT_TRACKS_INFO");
                HostResponse::Message(HostMessage::EditTracksInfo(request))
            }
            InboundMessage::Custom(CustomPayload::ExternalTextTracks { tracks }) => {
                tracing::debug!(
                    count = tracks.len(),
                    "External text tracks received on custom channel"
                );
                self.ctx.set_pending_tracks(tracks);
                HostResponse::Ack { ok: true }
            }
        }
    }

    /// Run the load interceptor for one request.
    pub fn intercept_load(
        &mut self,
        request: LoadRequest,
    ) -> Result<LoadRequest, NegotiationError> {
        let original = request
            .media
            .as_ref()
            .and_then(|media| media.descriptor())
            .map(|(_, descriptor)| descriptor.to_string());

        match self.interceptor.intercept(request, &mut self.ctx) {
            Ok(request) => {
                // Status for the previous media no longer applies.
                if let Some(poller) = self.poller.as_mut() {
                    poller.stop();
                }

                let rewritten = self.ctx.negotiated_locator().is_some();
                self.events.publish(
                    self.id,
                    EventPayload::LoadIntercepted {
                        content_id: original.clone().unwrap_or_default(),
                        rewritten,
                    },
                );

                if let (Some(probe), Some(locator), Some(media_url)) =
                    (&self.diagnostics, self.ctx.negotiated_locator(), &original)
                {
                    probe.spawn(&locator.origin(), media_url);
                }

                Ok(request)
            }
            Err(e) => {
                tracing::warn!("Rejected load: {}", e);
                self.events.publish(
                    self.id,
                    EventPayload::LoadRejected {
                        reason: e.reason().to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Host finished the initial load: register captured caption tracks,
    /// apply default track selection and start telemetry.
    ///
    /// Pending tracks are consumed by the first completion; repeated
    /// completions for the same load register nothing.
    pub fn on_load_complete(&mut self) -> usize {
        self.ctx.load_completions += 1;
        tracing::info!(completions = self.ctx.load_completions, "PLAYER_LOAD_COMPLETE");

        let registered = match self.ctx.take_pending_tracks() {
            Some(tracks) => self.tracks.sync(&tracks),
            None => 0,
        };
        if registered > 0 {
            self.events
                .publish(self.id, EventPayload::TracksRegistered { count: registered });
        }

        self.tracks.apply_default_selection();

        let locator = self.ctx.negotiated_locator();
        if let (Some(poller), Some(locator)) = (self.poller.as_mut(), locator) {
            if !poller.is_running() {
                poller.start(locator.origin());
            }
        }

        registered
    }

    /// Host stopped playback.
    pub fn on_stop(&mut self) {
        tracing::info!(session_id = %self.id, "Playback stopped");
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
    }

    /// Host reported a media status update.
    pub fn on_media_status(&self, status: &serde_json::Value) {
        tracing::debug!(%status, "MEDIA_STATUS");
    }
}
