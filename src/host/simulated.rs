//! In-process host used by the CLI and by tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use castforged_common::{AudioTrack, Error, Resolution, Result, TextTrack, TrackId};
use parking_lot::Mutex;

use super::{DeviceCapabilities, DisplayQuery, TrackManager};
use crate::config::DeviceConfig;

/// A device that accepts a fixed set of type strings up to a resolution.
pub struct SimulatedDevice {
    supported: HashSet<String>,
    max_resolution: Option<Resolution>,
    queries: AtomicUsize,
}

impl SimulatedDevice {
    pub fn new<I, S>(supported: I, max_resolution: Option<Resolution>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported: supported.into_iter().map(Into::into).collect(),
            max_resolution,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(config.supported.iter().cloned(), config.max_resolution)
    }

    /// Number of capability queries answered so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl DeviceCapabilities for SimulatedDevice {
    fn can_display(&self, query: &DisplayQuery<'_>) -> Result<bool> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        if !self.supported.contains(query.mime_type) {
            return Ok(false);
        }

        let fits = match (self.max_resolution, query.width, query.height) {
            (Some(max), Some(width), Some(height)) => width <= max.width && height <= max.height,
            _ => true,
        };
        Ok(fits)
    }
}

/// Track registry that keeps everything in memory.
///
/// Like a real host, it does not de-duplicate: adding the same descriptor
/// twice yields two tracks.
pub struct InMemoryTrackManager {
    next_id: AtomicU32,
    text: Mutex<Vec<TextTrack>>,
    audio: Mutex<Vec<AudioTrack>>,
    active_audio: Mutex<Option<TrackId>>,
    active_text: Mutex<Vec<TrackId>>,
    add_calls: AtomicUsize,
}

impl InMemoryTrackManager {
    pub fn new() -> Self {
        Self::with_audio_tracks(Vec::new())
    }

    /// Start with audio tracks already reported by the playback engine.
    pub fn with_audio_tracks(audio: Vec<AudioTrack>) -> Self {
        let next = audio.iter().map(|t| t.track_id.0).max().unwrap_or(0) + 1;
        Self {
            next_id: AtomicU32::new(next),
            text: Mutex::new(Vec::new()),
            audio: Mutex::new(audio),
            active_audio: Mutex::new(None),
            active_text: Mutex::new(Vec::new()),
            add_calls: AtomicUsize::new(0),
        }
    }

    pub fn active_audio(&self) -> Option<TrackId> {
        *self.active_audio.lock()
    }

    pub fn active_text(&self) -> Vec<TrackId> {
        self.active_text.lock().clone()
    }

    /// Number of batched `add_text_tracks` calls received.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryTrackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackManager for InMemoryTrackManager {
    fn create_text_track(&self) -> TrackId {
        TrackId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn add_text_tracks(&self, tracks: Vec<TextTrack>) -> Result<()> {
        self.add_calls.fetch_add(1, Ordering::Relaxed);
        self.text.lock().extend(tracks);
        Ok(())
    }

    fn text_tracks(&self) -> Vec<TextTrack> {
        self.text.lock().clone()
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        self.audio.lock().clone()
    }

    fn set_active_audio(&self, track_id: TrackId) -> Result<()> {
        if !self.audio.lock().iter().any(|t| t.track_id == track_id) {
            return Err(Error::host(format!("no audio track {track_id}")));
        }
        *self.active_audio.lock() = Some(track_id);
        Ok(())
    }

    fn set_active_text(&self, track_ids: &[TrackId]) -> Result<()> {
        let text = self.text.lock();
        if let Some(missing) = track_ids
            .iter()
            .find(|id| !text.iter().any(|t| t.track_id == **id))
        {
            return Err(Error::host(format!("no text track {missing}")));
        }
        *self.active_text.lock() = track_ids.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H264: &str = r#"video/mp4; codecs="avc1.42E01E""#;

    #[test]
    fn test_device_answers_from_supported_set() {
        let device = SimulatedDevice::new([H264], None);
        assert!(device.can_display(&DisplayQuery::codec(H264)).unwrap());
        assert!(!device
            .can_display(&DisplayQuery::codec(r#"video/mp4; codecs="vp9""#))
            .unwrap());
        assert_eq!(device.query_count(), 2);
    }

    #[test]
    fn test_device_bounds_resolution() {
        let device = SimulatedDevice::new([H264], Some(Resolution::new(1920, 1080)));
        assert!(device.can_display(&DisplayQuery::sized(H264, 1920, 1080)).unwrap());
        assert!(!device.can_display(&DisplayQuery::sized(H264, 3840, 2160)).unwrap());
    }

    #[test]
    fn test_track_ids_follow_audio_tracks() {
        let manager = InMemoryTrackManager::with_audio_tracks(vec![AudioTrack {
            track_id: TrackId(3),
            language: Some("en".to_string()),
            name: None,
        }]);
        assert_eq!(manager.create_text_track(), TrackId(4));
        assert_eq!(manager.create_text_track(), TrackId(5));
    }

    #[test]
    fn test_set_active_rejects_unknown_tracks() {
        let manager = InMemoryTrackManager::new();
        assert!(manager.set_active_audio(TrackId(1)).is_err());
        assert!(manager.set_active_text(&[TrackId(1)]).is_err());
        assert!(manager.set_active_text(&[]).is_ok());
    }
}
