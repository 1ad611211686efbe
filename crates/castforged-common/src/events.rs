//! Session event system.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late observers (a debug overlay,
//! tests) can catch up. Background tasks report their outcomes here instead
//! of propagating failures into the negotiation result.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::SessionId;
use crate::types::TranscodeStatus;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Payload describing what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- Load lifecycle ------------------------------------------------------
    LoadIntercepted {
        content_id: String,
        rewritten: bool,
    },
    LoadRejected {
        reason: String,
    },
    /// An inbound message that could not be decoded into a known kind.
    MessageRejected {
        reason: String,
        detail: String,
    },
    TracksRegistered {
        count: usize,
    },

    // -- Diagnostics ---------------------------------------------------------
    DiagnosticProbeCompleted {
        media_url: String,
        body: serde_json::Value,
    },
    DiagnosticProbeFailed {
        media_url: String,
        error: String,
    },

    // -- Telemetry -----------------------------------------------------------
    PollerStarted {
        origin: String,
    },
    PollerStopped,
    TranscodeStatus {
        status: TranscodeStatus,
    },
    TelemetryFailed {
        error: String,
    },
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to.
    pub session_id: SessionId,
    /// What happened.
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(session_id: SessionId, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn publish(&self, session_id: SessionId, payload: EventPayload) {
        let event = Event::new(session_id, payload);
        tracing::trace!(%session_id, payload = ?event.payload, "Publishing event");

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // Ignore send errors (no subscribers).
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
