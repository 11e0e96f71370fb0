//! Session lifecycle: lazily opening one active attempt per user and
//! questionnaire, and closing it (with a score, for scored questionnaires).

use std::sync::Arc;

use cuido_core::error::CoreError;
use cuido_core::questionnaire::QuestionnaireStatus;
use cuido_core::scoring::{score_answers, ScoreOutcome};
use cuido_core::session::Session;
use cuido_core::types::DbId;
use cuido_events::{EngineEvent, EventBus, SESSION_COMPLETED, SESSION_STARTED};
use serde::Serialize;

use crate::emit;
use crate::error::EngineResult;
use crate::store::QuestionnaireStore;

/// A session closed by [`SessionManager::complete_session`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedSession {
    pub session: Session,
    /// Present for scored questionnaires.
    pub outcome: Option<ScoreOutcome>,
}

/// Owns the `(none) -> in_progress -> completed` lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn QuestionnaireStore>,
    events: Option<Arc<EventBus>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn QuestionnaireStore>, events: Option<Arc<EventBus>>) -> Self {
        Self { store, events }
    }

    /// Return the in-progress session for the pair, creating it if absent.
    ///
    /// Lookup and creation are two store calls; concurrent callers may race
    /// unless the store enforces uniqueness itself. Sessions are never opened
    /// for draft questionnaires.
    pub async fn get_or_create_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Session> {
        if let Some(session) = self
            .store
            .find_active_session(user_id, questionnaire_id)
            .await?
        {
            return Ok(session);
        }

        let questionnaire = self.store.require_questionnaire(questionnaire_id).await?;
        if questionnaire.status == QuestionnaireStatus::Draft {
            return Err(CoreError::Conflict(format!(
                "Questionnaire {questionnaire_id} is a draft and cannot be answered"
            ))
            .into());
        }

        let session = self
            .store
            .create_active_session(user_id, questionnaire_id)
            .await?;
        tracing::info!(
            session_id = session.id,
            user_id,
            questionnaire_id,
            "Questionnaire session started",
        );
        emit(
            &self.events,
            EngineEvent::new(SESSION_STARTED)
                .with_questionnaire(questionnaire_id)
                .with_session(session.id)
                .with_user(user_id),
        );
        Ok(session)
    }

    /// Complete the active session for the pair.
    ///
    /// Scored questionnaires are scored over every response of the session
    /// first; a scoring failure leaves the session open. Without an active
    /// session this is a no-op returning `None`, so retries are safe.
    pub async fn complete_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Option<CompletedSession>> {
        let Some(active) = self
            .store
            .find_active_session(user_id, questionnaire_id)
            .await?
        else {
            tracing::debug!(user_id, questionnaire_id, "No active session to complete");
            return Ok(None);
        };

        let questionnaire = self.store.require_questionnaire(questionnaire_id).await?;
        let outcome = if questionnaire.is_scored() {
            let graph = self.store.graph(questionnaire_id).await?;
            let responses = self.store.list_responses(active.id).await?;
            Some(score_answers(
                questionnaire.scoring_policy,
                &graph,
                responses.iter().map(|r| (r.question_id, &r.choice)),
            )?)
        } else {
            None
        };

        let Some(session) = self
            .store
            .complete_session(active.id, outcome.map(|o| o.score))
            .await?
        else {
            // Closed by a concurrent caller between lookup and update.
            return Ok(None);
        };

        tracing::info!(
            session_id = session.id,
            user_id,
            questionnaire_id,
            score = ?session.score,
            "Questionnaire session completed",
        );
        emit(
            &self.events,
            EngineEvent::new(SESSION_COMPLETED)
                .with_questionnaire(questionnaire_id)
                .with_session(session.id)
                .with_user(user_id)
                .with_payload(serde_json::json!({
                    "score": session.score,
                    "band": outcome.and_then(|o| o.band).map(|b| b.label),
                })),
        );
        Ok(Some(CompletedSession { session, outcome }))
    }
}
