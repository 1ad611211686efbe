use castforged_common::{CodecCandidate, Resolution};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub tracks: TracksConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NegotiationConfig {
    /// Channel ceiling appended as `maxAudioChannels`
    #[serde(default = "default_max_audio_channels")]
    pub max_audio_channels: u32,

    /// Append `forceTranscoding=true` to every negotiated locator
    #[serde(default)]
    pub force_transcoding: bool,

    /// Hard width ceiling appended as `maxWidth`
    #[serde(default)]
    pub max_width: Option<u32>,

    /// Probe the device's maximum resolution and downscale when it is below
    /// the top candidate
    #[serde(default)]
    pub probe_resolution: bool,

    /// Video probe table, in preference order
    #[serde(default = "default_video_codecs")]
    pub video_codecs: Vec<CodecCandidate>,

    /// Audio probe table, in preference order
    #[serde(default = "default_audio_codecs")]
    pub audio_codecs: Vec<CodecCandidate>,

    /// Resolution candidates, highest first
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<Resolution>,

    /// Type string used for resolution queries
    #[serde(default = "default_resolution_probe_mime")]
    pub resolution_probe_mime: String,
}

fn default_max_audio_channels() -> u32 {
    2
}

fn default_video_codecs() -> Vec<CodecCandidate> {
    vec![
        CodecCandidate::new(r#"video/mp4; codecs="vp8""#, "vp8"),
        CodecCandidate::new(r#"video/mp4; codecs="vp9""#, "vp9"),
        CodecCandidate::new(r#"video/mp4; codecs="avc1.42E01E""#, "h264"),
        CodecCandidate::new(r#"video/mp4; codecs="hev1.1.6.L150.B0""#, "h265"),
    ]
}

fn default_audio_codecs() -> Vec<CodecCandidate> {
    vec![
        CodecCandidate::new(r#"audio/mp4; codecs="vorbis""#, "vorbis"),
        CodecCandidate::new(r#"audio/mp4; codecs="mp4a.40.5""#, "aac"),
        CodecCandidate::new(r#"audio/mp4; codecs="mp4a.69""#, "mp3"),
    ]
}

fn default_resolutions() -> Vec<Resolution> {
    vec![
        Resolution::new(3840, 2160),
        Resolution::new(2560, 1440),
        Resolution::new(1920, 1080),
        Resolution::new(1280, 720),
    ]
}

fn default_resolution_probe_mime() -> String {
    r#"video/mp4; codecs="avc1.640028""#.to_string()
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_audio_channels: default_max_audio_channels(),
            force_transcoding: false,
            max_width: None,
            probe_resolution: false,
            video_codecs: default_video_codecs(),
            audio_codecs: default_audio_codecs(),
            resolutions: default_resolutions(),
            resolution_probe_mime: default_resolution_probe_mime(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "RetryPolicy::manifest")]
    pub manifest: RetryPolicy,

    #[serde(default = "RetryPolicy::segment")]
    pub segment: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            manifest: RetryPolicy::manifest(),
            segment: RetryPolicy::segment(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    /// Seconds of buffered media required before playback resumes after a stall
    #[serde(default = "default_auto_resume_duration")]
    pub auto_resume_duration_secs: u32,

    /// Buffered segments required before playback resumes after a stall
    #[serde(default = "default_auto_resume_segments")]
    pub auto_resume_number_of_segments: u32,
}

fn default_auto_resume_duration() -> u32 {
    5
}
fn default_auto_resume_segments() -> u32 {
    1
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            auto_resume_duration_secs: default_auto_resume_duration(),
            auto_resume_number_of_segments: default_auto_resume_segments(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TracksConfig {
    /// Activate the first audio track after load completes
    #[serde(default = "default_true")]
    pub select_first_audio: bool,

    /// Activate the first text track after load completes
    #[serde(default = "default_true")]
    pub select_first_text: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TracksConfig {
    fn default() -> Self {
        Self {
            select_first_audio: true,
            select_first_text: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_request_timeout() -> u64 {
    10
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiagnosticsConfig {
    /// Fire a best-effort probe request at the backend on every load
    #[serde(default)]
    pub probe_enabled: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            probe_enabled: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Capabilities of the simulated device used by the CLI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Type strings the device accepts
    #[serde(default = "default_supported_types")]
    pub supported: Vec<String>,

    /// Largest resolution the device accepts (unbounded when unset)
    #[serde(default)]
    pub max_resolution: Option<Resolution>,
}

fn default_supported_types() -> Vec<String> {
    vec![
        r#"video/mp4; codecs="avc1.42E01E""#.to_string(),
        r#"video/mp4; codecs="avc1.640028""#.to_string(),
        r#"audio/mp4; codecs="mp4a.40.5""#.to_string(),
    ]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            supported: default_supported_types(),
            max_resolution: Some(Resolution::new(1920, 1080)),
        }
    }
}
