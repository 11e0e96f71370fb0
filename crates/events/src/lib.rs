//! In-process domain events for the questionnaire engine.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`EngineEvent`]: the event envelope.
//! - Event type name constants used by the engine.

pub mod bus;

pub use bus::{EngineEvent, EventBus};

/// A questionnaire definition was published.
pub const QUESTIONNAIRE_PUBLISHED: &str = "questionnaire.published";
/// A new in-progress session was opened.
pub const SESSION_STARTED: &str = "session.started";
/// An answer was written to the durable store.
pub const RESPONSE_UPSERTED: &str = "response.upserted";
/// A session was completed (and scored, where applicable).
pub const SESSION_COMPLETED: &str = "session.completed";
/// A guest buffer was reconciled into durable storage.
pub const GUEST_SYNCED: &str = "guest.synced";
