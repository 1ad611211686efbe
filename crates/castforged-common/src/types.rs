//! Core type definitions for capability negotiation and track handling.
//!
//! Wire-facing structs use camelCase field names to match the host's
//! message shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a codec probe table: the exact type string handed to the
/// host's capability query and the short tag sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecCandidate {
    /// Container plus codec string, e.g. `video/mp4; codecs="avc1.42E01E"`.
    pub mime_type: String,
    /// Backend codec family name, e.g. `h264`.
    pub tag: String,
}

impl CodecCandidate {
    pub fn new(mime_type: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            tag: tag.into(),
        }
    }
}

/// A display resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count, used to order candidates.
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the current playback device affirmed it can decode.
///
/// Codec tags keep the order of the probe table they came from; that order
/// is the order in which they are appended to the locator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilitySet {
    pub video_codecs: Vec<String>,
    pub audio_codecs: Vec<String>,
    pub max_resolution: Option<Resolution>,
}

/// A caption/subtitle track supplied out-of-band by the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTextTrack {
    pub mime_type: String,
    pub uri: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "label")]
    pub display_label: Option<String>,
}

/// Host-assigned track identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-native text track record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTrack {
    pub track_id: TrackId,
    #[serde(rename = "trackContentType")]
    pub content_type: String,
    #[serde(rename = "trackContentId")]
    pub content_id: String,
    pub language: Option<String>,
    pub name: Option<String>,
}

impl TextTrack {
    /// Fill a freshly allocated host track from an external descriptor.
    pub fn from_external(track_id: TrackId, external: &ExternalTextTrack) -> Self {
        Self {
            track_id,
            content_type: external.mime_type.clone(),
            content_id: external.uri.clone(),
            language: external.language.clone(),
            name: external.display_label.clone(),
        }
    }
}

/// Host-native audio track record, as reported by the playback engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub track_id: TrackId,
    pub language: Option<String>,
    pub name: Option<String>,
}

/// Live transcode status published by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeStatus {
    pub original_video_codec: Option<String>,
    pub original_audio_codec: Option<String>,
    #[serde(default)]
    pub is_video_transcoding: bool,
    #[serde(default)]
    pub is_audio_transcoding: bool,
}
