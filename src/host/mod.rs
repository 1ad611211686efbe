//! Narrow interfaces onto the host runtime.
//!
//! The host owns the playback engine. The negotiation layer only asks it
//! whether a type string is displayable and reads/writes its track lists.

pub mod simulated;

pub use simulated::{InMemoryTrackManager, SimulatedDevice};

use castforged_common::{AudioTrack, Result, TextTrack, TrackId};

/// Arguments of the host's "can this device display this" primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayQuery<'a> {
    /// Container plus codec string, e.g. `video/mp4; codecs="vp9"`.
    pub mime_type: &'a str,
    /// Separate codec parameter, for hosts that take it apart from the type.
    pub codecs: Option<&'a str>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl<'a> DisplayQuery<'a> {
    pub fn codec(mime_type: &'a str) -> Self {
        Self {
            mime_type,
            codecs: None,
            width: None,
            height: None,
        }
    }

    pub fn sized(mime_type: &'a str, width: u32, height: u32) -> Self {
        Self {
            mime_type,
            codecs: None,
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Device capability queries.
///
/// Returning `Ok(false)` is the normal "cannot play" answer; `Err` means the
/// host failed to answer at all.
pub trait DeviceCapabilities: Send + Sync {
    fn can_display(&self, query: &DisplayQuery<'_>) -> Result<bool>;
}

/// The host's audio/text track registry for the current media.
pub trait TrackManager: Send + Sync {
    /// Allocate an identifier for a new text track.
    fn create_text_track(&self) -> TrackId;

    /// Register a batch of text tracks in one call.
    fn add_text_tracks(&self, tracks: Vec<TextTrack>) -> Result<()>;

    fn text_tracks(&self) -> Vec<TextTrack>;

    fn audio_tracks(&self) -> Vec<AudioTrack>;

    fn set_active_audio(&self, track_id: TrackId) -> Result<()>;

    fn set_active_text(&self, track_ids: &[TrackId]) -> Result<()>;
}
