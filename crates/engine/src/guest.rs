//! Guest buffer persistence and its reconciliation into durable storage.
//!
//! A guest's answers live in one JSON blob in [`LocalStorage`] until an
//! identity is available. [`GuestSync::sync_to_cloud`] then replays them
//! through the same session and response paths an authenticated user takes,
//! keyed by `(session_id, question_id)`, so a sync can be re-run after any
//! partial failure without duplicating rows.

use std::sync::Arc;

use cuido_core::answer::Choice;
use cuido_core::error::CoreError;
use cuido_core::graph::QuestionNode;
use cuido_core::guest::GuestBuffer;
use cuido_core::profile::capture_for;
use cuido_core::types::DbId;
use cuido_events::{EngineEvent, EventBus, GUEST_SYNCED};
use serde::Serialize;

use crate::emit;
use crate::error::{EngineError, EngineResult};
use crate::responses::ResponseStore;
use crate::session::{CompletedSession, SessionManager};
use crate::store::{LocalStorage, ProfileSink, StoreError};

// ---------------------------------------------------------------------------
// GuestBufferStore
// ---------------------------------------------------------------------------

/// Handle to one guest buffer: a storage backend plus the key it lives under.
///
/// Passed explicitly wherever guest state is touched, so independent buffers
/// (e.g. in parallel tests) never interfere.
#[derive(Clone)]
pub struct GuestBufferStore {
    storage: Arc<dyn LocalStorage>,
    key: String,
}

impl GuestBufferStore {
    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The buffer, if one exists.
    pub fn load(&self) -> EngineResult<Option<GuestBuffer>> {
        match self.storage.get(&self.key)? {
            Some(blob) => Ok(Some(
                serde_json::from_str(&blob).map_err(StoreError::from)?,
            )),
            None => Ok(None),
        }
    }

    fn save(&self, buffer: &GuestBuffer) -> EngineResult<()> {
        let blob = serde_json::to_string(buffer).map_err(StoreError::from)?;
        self.storage.set(&self.key, &blob)?;
        Ok(())
    }

    /// Load the buffer for `questionnaire_id`, starting a new one if none
    /// exists. A buffer held for another questionnaire is never overwritten.
    fn load_for(&self, questionnaire_id: DbId) -> EngineResult<GuestBuffer> {
        match self.load()? {
            Some(buffer) if buffer.questionnaire_id == questionnaire_id => Ok(buffer),
            Some(buffer) => Err(CoreError::Conflict(format!(
                "Guest buffer holds answers for questionnaire {}, not {questionnaire_id}",
                buffer.questionnaire_id
            ))
            .into()),
            None => Ok(GuestBuffer::new(questionnaire_id)),
        }
    }

    /// Record (or replace) the answer to `question`, capturing its profile
    /// field when the question is tagged with one.
    pub fn upsert_response(
        &self,
        question: &QuestionNode,
        choice: Choice,
    ) -> EngineResult<GuestBuffer> {
        let mut buffer = self.load_for(question.questionnaire_id)?;
        if let Some((field, value)) = capture_for(question, &choice) {
            buffer.capture(field, value);
        }
        buffer.upsert_response(question.id, choice);
        self.save(&buffer)?;
        Ok(buffer)
    }

    /// Flag the buffered run as finished.
    pub fn mark_completed(&self, questionnaire_id: DbId) -> EngineResult<GuestBuffer> {
        let mut buffer = self.load_for(questionnaire_id)?;
        buffer.mark_completed();
        self.save(&buffer)?;
        Ok(buffer)
    }

    /// Drop the buffer without syncing it.
    pub fn discard(&self) -> EngineResult<()> {
        self.storage.remove(&self.key)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// What a successful sync did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub questionnaire_id: DbId,
    pub session_id: DbId,
    pub synced_responses: usize,
    pub applied_fields: usize,
    /// Set when the guest had finished the questionnaire.
    pub completed: Option<CompletedSession>,
}

/// Reconciles guest buffers into durable storage.
#[derive(Clone)]
pub struct GuestSync {
    sessions: SessionManager,
    responses: ResponseStore,
    profiles: Arc<dyn ProfileSink>,
    events: Option<Arc<EventBus>>,
}

impl GuestSync {
    pub fn new(
        sessions: SessionManager,
        responses: ResponseStore,
        profiles: Arc<dyn ProfileSink>,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            sessions,
            responses,
            profiles,
            events,
        }
    }

    /// Move the buffer into `user_id`'s durable session.
    ///
    /// Order: open or find the active session, upsert every buffered answer,
    /// apply captured profile fields, clear the buffer, and only then
    /// complete the session if the guest had finished. Any failure before
    /// the buffer is cleared returns [`EngineError::Sync`] and leaves the
    /// buffer untouched. Returns `None` when there is nothing to sync.
    pub async fn sync_to_cloud(
        &self,
        buffer_store: &GuestBufferStore,
        user_id: DbId,
    ) -> EngineResult<Option<SyncReport>> {
        let Some(buffer) = buffer_store.load()? else {
            return Ok(None);
        };
        if buffer.is_empty() && !buffer.completed {
            buffer_store.discard()?;
            return Ok(None);
        }

        let questionnaire_id = buffer.questionnaire_id;
        let total = buffer.answered_count();
        tracing::info!(user_id, questionnaire_id, responses = total, "Guest sync started");

        let session_id = self
            .write_durable(&buffer, user_id)
            .await
            .map_err(|(synced, err)| {
                tracing::warn!(
                    user_id,
                    questionnaire_id,
                    synced,
                    total,
                    error = %err,
                    "Guest sync failed, buffer retained",
                );
                EngineError::Sync {
                    synced,
                    total,
                    source: Box::new(err),
                }
            })?;

        buffer_store.discard().map_err(|err| EngineError::Sync {
            synced: total,
            total,
            source: Box::new(err),
        })?;

        let completed = if buffer.completed {
            self.sessions
                .complete_session(user_id, questionnaire_id)
                .await?
        } else {
            None
        };

        tracing::info!(
            user_id,
            questionnaire_id,
            session_id,
            responses = total,
            completed = completed.is_some(),
            "Guest sync finished",
        );
        emit(
            &self.events,
            EngineEvent::new(GUEST_SYNCED)
                .with_questionnaire(questionnaire_id)
                .with_session(session_id)
                .with_user(user_id)
                .with_payload(serde_json::json!({ "responses": total })),
        );

        Ok(Some(SyncReport {
            questionnaire_id,
            session_id,
            synced_responses: total,
            applied_fields: buffer.captured_fields.len(),
            completed,
        }))
    }

    /// Steps that must all succeed before the buffer may be cleared. On
    /// failure, reports how many answers had been written.
    async fn write_durable(
        &self,
        buffer: &GuestBuffer,
        user_id: DbId,
    ) -> Result<DbId, (usize, EngineError)> {
        let session = self
            .sessions
            .get_or_create_active_session(user_id, buffer.questionnaire_id)
            .await
            .map_err(|e| (0, e))?;

        let mut synced = 0;
        for (question_id, choice) in buffer.answers() {
            self.responses
                .upsert_response(session.id, question_id, choice)
                .await
                .map_err(|e| (synced, e))?;
            synced += 1;
        }

        if !buffer.captured_fields.is_empty() {
            self.profiles
                .apply_profile_fields(user_id, &buffer.captured_fields)
                .await
                .map_err(|e| (synced, e))?;
        }

        Ok(session.id)
    }
}
