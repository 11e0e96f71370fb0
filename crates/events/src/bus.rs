//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out [`EngineEvent`]s to any number of subscribers. It is
//! designed to be shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use cuido_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// EngineEvent
// ---------------------------------------------------------------------------

/// Something that happened inside the engine.
///
/// Constructed via [`EngineEvent::new`] and enriched with
/// [`with_questionnaire`](EngineEvent::with_questionnaire),
/// [`with_session`](EngineEvent::with_session),
/// [`with_user`](EngineEvent::with_user) and
/// [`with_payload`](EngineEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Dot-separated event name, e.g. `"session.completed"`.
    pub event_type: String,

    pub questionnaire_id: Option<DbId>,

    pub session_id: Option<DbId>,

    /// The user the event concerns, when known.
    pub user_id: Option<DbId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl EngineEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            questionnaire_id: None,
            session_id: None,
            user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_questionnaire(mut self, questionnaire_id: DbId) -> Self {
        self.questionnaire_id = Some(questionnaire_id);
        self
    }

    pub fn with_session(mut self, session_id: DbId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use cuido_events::bus::{EngineEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(EngineEvent::new("session.started"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Events published while nobody is subscribed are dropped.
    pub fn publish(&self, event: EngineEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
