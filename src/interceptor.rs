//! Load interception.
//!
//! Runs once per LOAD message: validate, probe the device, rewrite the
//! locator with negotiated parameters, and capture external caption tracks
//! into the session context. Only a missing media descriptor rejects the
//! load. Every later failure is logged and the request passes through
//! unmodified.

use castforged_common::{DeviceCapabilitySet, NegotiationError, StreamLocator};

use crate::capability::CapabilityProber;
use crate::config::NegotiationConfig;
use crate::messages::LoadRequest;
use crate::session::SessionContext;

pub const VIDEO_CODECS_PARAM: &str = "videoCodecs";
pub const AUDIO_CODECS_PARAM: &str = "audioCodecs";
pub const MAX_AUDIO_CHANNELS_PARAM: &str = "maxAudioChannels";
pub const MAX_WIDTH_PARAM: &str = "maxWidth";
pub const FORCE_TRANSCODING_PARAM: &str = "forceTranscoding";

/// Result of the optional rewrite step.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationOutcome {
    /// The descriptor was rewritten with negotiated parameters.
    Rewritten {
        locator: StreamLocator,
        capabilities: DeviceCapabilitySet,
    },
    /// Rewriting was skipped; the descriptor is unchanged.
    PassThrough { reason: SkipReason },
}

impl NegotiationOutcome {
    pub fn locator(&self) -> Option<&StreamLocator> {
        match self {
            Self::Rewritten { locator, .. } => Some(locator),
            Self::PassThrough { .. } => None,
        }
    }
}

/// Why a request passed through without rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The descriptor is not a structured locator (entity id, relative path).
    OpaqueDescriptor(String),
    /// The device capability query failed.
    ProbeFailed(String),
}

/// Negotiates device capabilities into load requests.
pub struct LoadInterceptor {
    prober: CapabilityProber,
    config: NegotiationConfig,
}

impl LoadInterceptor {
    pub fn new(prober: CapabilityProber, config: NegotiationConfig) -> Self {
        Self { prober, config }
    }

    /// Intercept a load request.
    ///
    /// Returns the request with its descriptor rewritten, the original
    /// request when negotiation was skipped, or `InvalidParam` when there is
    /// no media descriptor.
    pub fn intercept(
        &self,
        mut request: LoadRequest,
        ctx: &mut SessionContext,
    ) -> Result<LoadRequest, NegotiationError> {
        let Some(media) = request.media.as_mut() else {
            return Err(NegotiationError::invalid_param("load request has no media"));
        };
        let Some((field, descriptor)) = media.descriptor() else {
            return Err(NegotiationError::invalid_param(
                "media has neither contentId nor entity",
            ));
        };
        let descriptor = descriptor.to_string();

        ctx.begin_load();

        match media.external_text_tracks() {
            Some(Ok(tracks)) => {
                tracing::debug!(count = tracks.len(), "Captured external text tracks");
                ctx.set_pending_tracks(tracks);
            }
            Some(Err(e)) => {
                tracing::warn!("Ignoring malformed externalTextTracks: {}", e);
            }
            None => {}
        }

        let outcome = self.negotiate(&descriptor);
        match &outcome {
            NegotiationOutcome::Rewritten { locator, .. } => {
                tracing::info!(content_id = %locator, "Rewrote media locator");
                media.set_descriptor(field, locator.to_string());
            }
            NegotiationOutcome::PassThrough { reason } => {
                tracing::warn!(
                    content_id = %descriptor,
                    ?reason,
                    "Passing load through unmodified"
                );
            }
        }
        ctx.record_outcome(outcome);

        Ok(request)
    }

    /// Rewrite a single descriptor. Deterministic for a given device.
    pub fn negotiate(&self, descriptor: &str) -> NegotiationOutcome {
        let mut locator = match StreamLocator::parse(descriptor) {
            Ok(locator) => locator,
            Err(e) => {
                return NegotiationOutcome::PassThrough {
                    reason: SkipReason::OpaqueDescriptor(e.to_string()),
                }
            }
        };

        let capabilities = match self.probe() {
            Ok(capabilities) => capabilities,
            Err(e) => {
                return NegotiationOutcome::PassThrough {
                    reason: SkipReason::ProbeFailed(e.to_string()),
                }
            }
        };

        locator
            .append_all(VIDEO_CODECS_PARAM, &capabilities.video_codecs)
            .append_all(AUDIO_CODECS_PARAM, &capabilities.audio_codecs)
            .append(
                MAX_AUDIO_CHANNELS_PARAM,
                &self.config.max_audio_channels.to_string(),
            );

        if let Some(width) = self.max_width(&capabilities) {
            locator.append(MAX_WIDTH_PARAM, &width.to_string());
        }
        if self.config.force_transcoding {
            locator.append(FORCE_TRANSCODING_PARAM, "true");
        }

        NegotiationOutcome::Rewritten {
            locator,
            capabilities,
        }
    }

    fn probe(&self) -> castforged_common::Result<DeviceCapabilitySet> {
        let mut capabilities = self
            .prober
            .probe(&self.config.video_codecs, &self.config.audio_codecs)?;

        if self.config.probe_resolution {
            capabilities.max_resolution = self.prober.probe_max_resolution(
                &self.config.resolution_probe_mime,
                &self.config.resolutions,
            )?;
        }

        Ok(capabilities)
    }

    /// Width ceiling: the configured limit, tightened by a probed maximum
    /// that falls below the top candidate.
    fn max_width(&self, capabilities: &DeviceCapabilitySet) -> Option<u32> {
        let top = self.config.resolutions.first();
        let probed = capabilities
            .max_resolution
            .filter(|max| Some(max) != top)
            .map(|max| max.width);

        match (self.config.max_width, probed) {
            (Some(configured), Some(probed)) => Some(configured.min(probed)),
            (configured, probed) => configured.or(probed),
        }
    }
}
