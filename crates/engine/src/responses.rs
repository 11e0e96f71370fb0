//! Idempotent persistence of individual answers.

use std::sync::Arc;

use cuido_core::answer::Choice;
use cuido_core::error::CoreError;
use cuido_core::session::{Response, Session};
use cuido_core::types::DbId;
use cuido_events::{EngineEvent, EventBus, RESPONSE_UPSERTED};

use crate::emit;
use crate::error::EngineResult;
use crate::store::QuestionnaireStore;

/// Writes and reads the single response per `(session, question)`.
#[derive(Clone)]
pub struct ResponseStore {
    store: Arc<dyn QuestionnaireStore>,
    events: Option<Arc<EventBus>>,
}

impl ResponseStore {
    pub fn new(store: Arc<dyn QuestionnaireStore>, events: Option<Arc<EventBus>>) -> Self {
        Self { store, events }
    }

    async fn require_session(&self, session_id: DbId) -> EngineResult<Session> {
        self.store.find_session(session_id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "session",
                id: session_id,
            }
            .into()
        })
    }

    /// Write or overwrite the response for `(session_id, question_id)`.
    ///
    /// Fails with `NotFound` if the session does not exist and with
    /// `Conflict` if it is already closed. Earlier answers are not kept.
    pub async fn upsert_response(
        &self,
        session_id: DbId,
        question_id: DbId,
        choice: &Choice,
    ) -> EngineResult<Response> {
        let session = self.require_session(session_id).await?;
        session.ensure_open()?;

        let response = self
            .store
            .upsert_response(session_id, question_id, choice)
            .await?;
        tracing::debug!(session_id, question_id, "Response upserted");
        emit(
            &self.events,
            EngineEvent::new(RESPONSE_UPSERTED)
                .with_questionnaire(session.questionnaire_id)
                .with_session(session_id)
                .with_user(session.user_id)
                .with_payload(serde_json::json!({ "question_id": question_id })),
        );
        Ok(response)
    }

    /// Every response of a session, in the order first given.
    pub async fn list_responses(&self, session_id: DbId) -> EngineResult<Vec<Response>> {
        self.require_session(session_id).await?;
        self.store.list_responses(session_id).await
    }
}
