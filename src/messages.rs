//! Inbound host messages.
//!
//! Messages are decoded once into a closed set of known kinds. Anything that
//! does not fit is rejected with `InvalidParam` at the boundary, so handlers
//! never probe optional fields of an untyped payload.

use castforged_common::{ErrorData, ExternalTextTrack, NegotiationError, TrackId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key inside `customData` carrying out-of-band caption tracks.
pub const EXTERNAL_TEXT_TRACKS_KEY: &str = "externalTextTracks";

/// A request to start playback of one media item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInformation>,

    /// Fields the negotiation layer does not interpret (requestId, autoplay...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoadRequest {
    /// Convenience constructor for a request addressed by `content_id`.
    pub fn for_content(content_id: impl Into<String>) -> Self {
        Self {
            media: Some(MediaInformation {
                content_id: Some(content_id.into()),
                ..Default::default()
            }),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,

    /// Opaque sender metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which field supplied the media descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorField {
    ContentId,
    Entity,
}

impl MediaInformation {
    /// The media descriptor: `contentId` when present, otherwise `entity`.
    /// Empty strings count as absent.
    pub fn descriptor(&self) -> Option<(DescriptorField, &str)> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.trim().is_empty())
        }

        non_empty(&self.content_id)
            .map(|s| (DescriptorField::ContentId, s))
            .or_else(|| non_empty(&self.entity).map(|s| (DescriptorField::Entity, s)))
    }

    pub fn set_descriptor(&mut self, field: DescriptorField, value: String) {
        match field {
            DescriptorField::ContentId => self.content_id = Some(value),
            DescriptorField::Entity => self.entity = Some(value),
        }
    }

    /// External caption tracks carried in `customData`, if any.
    ///
    /// `None` when the key is absent; `Some(Err)` when it is present but
    /// malformed.
    pub fn external_text_tracks(&self) -> Option<serde_json::Result<Vec<ExternalTextTrack>>> {
        let tracks = self.custom_data.as_ref()?.get(EXTERNAL_TEXT_TRACKS_KEY)?;
        Some(serde_json::from_value(tracks.clone()))
    }
}

/// Request to change the active tracks; passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTracksInfoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_track_ids: Option<Vec<TrackId>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Messages arriving on the host's media channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    Load(LoadRequest),
    EditTracksInfo(EditTracksInfoRequest),
}

/// Payloads arriving on the custom session channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CustomPayload {
    #[serde(rename = "externalTextTracks")]
    ExternalTextTracks { tracks: Vec<ExternalTextTrack> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct CustomEnvelope {
    data: CustomPayload,
}

/// Every message kind the session understands.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Host(HostMessage),
    Custom(CustomPayload),
}

impl InboundMessage {
    pub fn from_json(input: &str) -> Result<Self, NegotiationError> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| NegotiationError::invalid_param(format!("malformed message: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, NegotiationError> {
        let Some(object) = value.as_object() else {
            return Err(NegotiationError::invalid_param("message is not an object"));
        };

        if object.contains_key("data") {
            return serde_json::from_value::<CustomEnvelope>(value)
                .map(|envelope| Self::Custom(envelope.data))
                .map_err(|e| {
                    NegotiationError::invalid_param(format!("unknown custom message: {e}"))
                });
        }

        serde_json::from_value::<HostMessage>(value)
            .map(Self::Host)
            .map_err(|e| NegotiationError::invalid_param(format!("unknown host message: {e}")))
    }
}

/// What the session hands back to the host for one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostResponse {
    Message(HostMessage),
    Error(ErrorData),
    Ack { ok: bool },
}

impl From<NegotiationError> for HostResponse {
    fn from(err: NegotiationError) -> Self {
        Self::Error(err.to_error_data())
    }
}
