//! Questionnaire traversal and scoring engine.
//!
//! Orchestrates the pure logic in `cuido_core` against the collaborators the
//! surrounding application supplies:
//!
//! - [`store::QuestionnaireStore`] durable rows (PostgreSQL via [`pg::PgStore`],
//!   or [`memory::MemoryStore`])
//! - [`store::ProfileSink`] user profile writes
//! - [`store::LocalStorage`] the guest's local JSON blob
//!
//! [`engine::QuestionnaireEngine`] is the entry point callers use.

use std::sync::Arc;

use cuido_events::{EngineEvent, EventBus};

pub mod config;
pub mod engine;
pub mod error;
pub mod file_storage;
pub mod guest;
pub mod memory;
pub mod pg;
pub mod responses;
pub mod session;
pub mod store;

pub use engine::{Actor, Advance, Finish, QuestionnaireEngine, Resume, Step};
pub use error::{EngineError, EngineResult};

/// Publish on the bus if one is attached.
pub(crate) fn emit(events: &Option<Arc<EventBus>>, event: EngineEvent) {
    if let Some(bus) = events {
        bus.publish(event);
    }
}
