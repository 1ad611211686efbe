//! External caption track registration.
//!
//! After the host finishes loading media, externally supplied caption tracks
//! are turned into host track records and registered in one batch, then a
//! default audio/text selection is applied.

use std::sync::Arc;

use castforged_common::{AudioTrack, ExternalTextTrack, TextTrack, TrackId};

use crate::config::TracksConfig;
use crate::host::TrackManager;

/// Tracks to activate once registration is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSelection {
    pub audio: Option<TrackId>,
    pub text: Vec<TrackId>,
}

/// Chooses the active tracks after load completes.
///
/// `text` lists the host's text tracks in host order, registered tracks
/// included.
pub trait TrackSelectionPolicy: Send + Sync {
    fn select(&self, audio: &[AudioTrack], text: &[TextTrack]) -> TrackSelection;
}

/// Activates the first audio and/or the first text track.
#[derive(Debug, Clone, Copy)]
pub struct FirstTrackPolicy {
    pub audio: bool,
    pub text: bool,
}

impl From<&TracksConfig> for FirstTrackPolicy {
    fn from(config: &TracksConfig) -> Self {
        Self {
            audio: config.select_first_audio,
            text: config.select_first_text,
        }
    }
}

impl TrackSelectionPolicy for FirstTrackPolicy {
    fn select(&self, audio: &[AudioTrack], text: &[TextTrack]) -> TrackSelection {
        TrackSelection {
            audio: audio.first().filter(|_| self.audio).map(|t| t.track_id),
            text: text
                .first()
                .filter(|_| self.text)
                .map(|t| vec![t.track_id])
                .unwrap_or_default(),
        }
    }
}

/// Registers external caption tracks with the host.
pub struct TrackSynchronizer {
    manager: Arc<dyn TrackManager>,
    policy: Box<dyn TrackSelectionPolicy>,
}

impl TrackSynchronizer {
    pub fn new(manager: Arc<dyn TrackManager>, policy: Box<dyn TrackSelectionPolicy>) -> Self {
        Self { manager, policy }
    }

    pub fn set_policy(&mut self, policy: Box<dyn TrackSelectionPolicy>) {
        self.policy = policy;
    }

    /// Register `tracks` in a single batch. Returns how many were registered;
    /// zero for an empty list or when the host rejects the batch.
    pub fn sync(&self, tracks: &[ExternalTextTrack]) -> usize {
        if tracks.is_empty() {
            tracing::debug!("No external text tracks to register");
            return 0;
        }

        let records: Vec<TextTrack> = tracks
            .iter()
            .map(|external| TextTrack::from_external(self.manager.create_text_track(), external))
            .collect();
        let count = records.len();

        match self.manager.add_text_tracks(records) {
            Ok(()) => {
                tracing::info!(count, "Registered external text tracks");
                count
            }
            Err(e) => {
                tracing::warn!("Failed to register external text tracks: {}", e);
                0
            }
        }
    }

    /// Apply the selection policy to the host's current track lists.
    pub fn apply_default_selection(&self) -> TrackSelection {
        let audio = self.manager.audio_tracks();
        let text = self.manager.text_tracks();
        tracing::debug!(audio = audio.len(), text = text.len(), "Host tracks after load");

        let selection = self.policy.select(&audio, &text);

        if let Some(track_id) = selection.audio {
            if let Err(e) = self.manager.set_active_audio(track_id) {
                tracing::warn!(%track_id, "Failed to activate audio track: {}", e);
            }
        }
        if !selection.text.is_empty() {
            if let Err(e) = self.manager.set_active_text(&selection.text) {
                tracing::warn!("Failed to activate text tracks: {}", e);
            }
        }

        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryTrackManager;
    use castforged_common::{Error, Result};

    fn vtt(lang: &str) -> ExternalTextTrack {
        ExternalTextTrack {
            mime_type: "text/vtt".to_string(),
            uri: format!("https://subs/{lang}.vtt"),
            language: Some(lang.to_string()),
            display_label: Some(lang.to_uppercase()),
        }
    }

    fn audio(id: u32) -> AudioTrack {
        AudioTrack {
            track_id: TrackId(id),
            language: None,
            name: None,
        }
    }

    fn synchronizer(manager: Arc<InMemoryTrackManager>) -> TrackSynchronizer {
        TrackSynchronizer::new(
            manager,
            Box::new(FirstTrackPolicy {
                audio: true,
                text: true,
            }),
        )
    }

    struct RejectingManager;

    impl TrackManager for RejectingManager {
        fn create_text_track(&self) -> TrackId {
            TrackId(1)
        }
        fn add_text_tracks(&self, _tracks: Vec<TextTrack>) -> Result<()> {
            Err(Error::host("track registry closed"))
        }
        fn text_tracks(&self) -> Vec<TextTrack> {
            Vec::new()
        }
        fn audio_tracks(&self) -> Vec<AudioTrack> {
            Vec::new()
        }
        fn set_active_audio(&self, _track_id: TrackId) -> Result<()> {
            Ok(())
        }
        fn set_active_text(&self, _track_ids: &[TrackId]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registers_each_track_in_one_batch() {
        let manager = Arc::new(InMemoryTrackManager::new());
        let sync = synchronizer(manager.clone());

        assert_eq!(sync.sync(&[vtt("en"), vtt("fr"), vtt("de")]), 3);
        assert_eq!(manager.add_calls(), 1);

        let registered = manager.text_tracks();
        assert_eq!(registered.len(), 3);
        assert_eq!(registered[1].content_id, "https://subs/fr.vtt");
        assert_eq!(registered[1].content_type, "text/vtt");
        assert_eq!(registered[1].name.as_deref(), Some("FR"));
    }

    #[test]
    fn test_empty_list_is_noop() {
        let manager = Arc::new(InMemoryTrackManager::new());
        let sync = synchronizer(manager.clone());
        assert_eq!(sync.sync(&[]), 0);
        assert_eq!(manager.add_calls(), 0);
    }

    #[test]
    fn test_host_rejection_is_soft() {
        let sync = TrackSynchronizer::new(
            Arc::new(RejectingManager),
            Box::new(FirstTrackPolicy {
                audio: true,
                text: true,
            }),
        );
        assert_eq!(sync.sync(&[vtt("en")]), 0);
    }

    #[test]
    fn test_default_selection_picks_first_tracks() {
        let manager = Arc::new(InMemoryTrackManager::with_audio_tracks(vec![audio(1), audio(2)]));
        let sync = synchronizer(manager.clone());
        sync.sync(&[vtt("en"), vtt("fr")]);

        let selection = sync.apply_default_selection();
        assert_eq!(selection.audio, Some(TrackId(1)));
        assert_eq!(selection.text, vec![TrackId(3)]);
        assert_eq!(manager.active_audio(), Some(TrackId(1)));
        assert_eq!(manager.active_text(), vec![TrackId(3)]);
    }

    #[test]
    fn test_selection_can_be_disabled() {
        let manager = Arc::new(InMemoryTrackManager::with_audio_tracks(vec![audio(1)]));
        let sync = TrackSynchronizer::new(
            manager.clone(),
            Box::new(FirstTrackPolicy::from(&TracksConfig {
                select_first_audio: false,
                select_first_text: false,
            })),
        );
        sync.sync(&[vtt("en")]);

        assert_eq!(sync.apply_default_selection(), TrackSelection::default());
        assert_eq!(manager.active_audio(), None);
        assert!(manager.active_text().is_empty());
    }

    #[test]
    fn test_custom_policy() {
        struct LastText;
        impl TrackSelectionPolicy for LastText {
            fn select(&self, _audio: &[AudioTrack], text: &[TextTrack]) -> TrackSelection {
                TrackSelection {
                    audio: None,
                    text: text.last().map(|t| vec![t.track_id]).unwrap_or_default(),
                }
            }
        }

        let manager = Arc::new(InMemoryTrackManager::new());
        let mut sync = synchronizer(manager.clone());
        sync.set_policy(Box::new(LastText));
        sync.sync(&[vtt("en"), vtt("fr")]);

        sync.apply_default_selection();
        assert_eq!(manager.active_text(), vec![TrackId(2)]);
    }
}
