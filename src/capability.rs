//! Device capability probing.
//!
//! Walks ordered probe tables against the host's capability query. The
//! output keeps table order, which is the order codec tags are sent to the
//! backend. A codec the device cannot play is simply left out.

use std::sync::Arc;

use castforged_common::{CodecCandidate, DeviceCapabilitySet, Resolution, Result};

use crate::host::{DeviceCapabilities, DisplayQuery};

/// Queries a device for the codecs and resolutions it accepts.
#[derive(Clone)]
pub struct CapabilityProber {
    device: Arc<dyn DeviceCapabilities>,
}

impl CapabilityProber {
    pub fn new(device: Arc<dyn DeviceCapabilities>) -> Self {
        Self { device }
    }

    /// Probe both codec tables. Resolution is left unset; see
    /// [`CapabilityProber::probe_max_resolution`].
    pub fn probe(
        &self,
        video: &[CodecCandidate],
        audio: &[CodecCandidate],
    ) -> Result<DeviceCapabilitySet> {
        let capabilities = DeviceCapabilitySet {
            video_codecs: self.probe_codecs(video)?,
            audio_codecs: self.probe_codecs(audio)?,
            max_resolution: None,
        };

        tracing::debug!(
            video = ?capabilities.video_codecs,
            audio = ?capabilities.audio_codecs,
            "Probed device codecs"
        );

        Ok(capabilities)
    }

    /// Tags of the candidates the device affirms, in table order.
    pub fn probe_codecs(&self, candidates: &[CodecCandidate]) -> Result<Vec<String>> {
        let mut supported = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self
                .device
                .can_display(&DisplayQuery::codec(&candidate.mime_type))?
            {
                supported.push(candidate.tag.clone());
            }
        }
        Ok(supported)
    }

    /// First resolution from a descending list that the device accepts.
    ///
    /// Falls back to the last (smallest) candidate when none is accepted.
    /// Returns `None` only for an empty candidate list.
    pub fn probe_max_resolution(
        &self,
        mime_type: &str,
        candidates: &[Resolution],
    ) -> Result<Option<Resolution>> {
        for candidate in candidates {
            let query = DisplayQuery::sized(mime_type, candidate.width, candidate.height);
            if self.device.can_display(&query)? {
                tracing::debug!(resolution = %candidate, "Device accepts resolution");
                return Ok(Some(*candidate));
            }
        }

        let floor = candidates.last().copied();
        if let Some(floor) = floor {
            tracing::debug!(resolution = %floor, "No resolution accepted, using floor");
        }
        Ok(floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedDevice;
    use castforged_common::Error;

    const H264: &str = r#"video/mp4; codecs="avc1.42E01E""#;
    const VP9: &str = r#"video/mp4; codecs="vp9""#;
    const AAC: &str = r#"audio/mp4; codecs="mp4a.40.5""#;

    fn video_table() -> Vec<CodecCandidate> {
        vec![
            CodecCandidate::new(VP9, "vp9"),
            CodecCandidate::new(H264, "h264"),
        ]
    }

    fn audio_table() -> Vec<CodecCandidate> {
        vec![CodecCandidate::new(AAC, "aac")]
    }

    fn resolutions() -> Vec<Resolution> {
        vec![
            Resolution::new(3840, 2160),
            Resolution::new(1920, 1080),
            Resolution::new(1280, 720),
        ]
    }

    struct BrokenDevice;

    impl DeviceCapabilities for BrokenDevice {
        fn can_display(&self, _query: &DisplayQuery<'_>) -> Result<bool> {
            Err(Error::host("capability API unavailable"))
        }
    }

    #[test]
    fn test_probe_keeps_table_order() {
        let device = Arc::new(SimulatedDevice::new([H264, VP9, AAC], None));
        let prober = CapabilityProber::new(device);
        let caps = prober.probe(&video_table(), &audio_table()).unwrap();
        assert_eq!(caps.video_codecs, vec!["vp9", "h264"]);
        assert_eq!(caps.audio_codecs, vec!["aac"]);
        assert!(caps.max_resolution.is_none());
    }

    #[test]
    fn test_unsupported_codecs_are_omitted() {
        let device = Arc::new(SimulatedDevice::new([H264], None));
        let prober = CapabilityProber::new(device);
        let caps = prober.probe(&video_table(), &audio_table()).unwrap();
        assert_eq!(caps.video_codecs, vec!["h264"]);
        assert!(caps.audio_codecs.is_empty());
    }

    #[test]
    fn test_host_failure_is_an_error() {
        let prober = CapabilityProber::new(Arc::new(BrokenDevice));
        assert!(prober.probe(&video_table(), &audio_table()).is_err());
    }

    #[test]
    fn test_max_resolution_takes_highest_accepted() {
        let device = Arc::new(SimulatedDevice::new([H264], Some(Resolution::new(1920, 1080))));
        let prober = CapabilityProber::new(device);
        assert_eq!(
            prober.probe_max_resolution(H264, &resolutions()).unwrap(),
            Some(Resolution::new(1920, 1080))
        );
    }

    #[test]
    fn test_max_resolution_unbounded_device() {
        let device = Arc::new(SimulatedDevice::new([H264], None));
        let prober = CapabilityProber::new(device);
        assert_eq!(
            prober.probe_max_resolution(H264, &resolutions()).unwrap(),
            Some(Resolution::new(3840, 2160))
        );
    }

    #[test]
    fn test_max_resolution_falls_back_to_floor() {
        let device = Arc::new(SimulatedDevice::new(Vec::<String>::new(), None));
        let prober = CapabilityProber::new(device);
        assert_eq!(
            prober.probe_max_resolution(H264, &resolutions()).unwrap(),
            Some(Resolution::new(1280, 720))
        );
        assert_eq!(prober.probe_max_resolution(H264, &[]).unwrap(), None);
    }
}
