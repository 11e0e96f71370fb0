//! Repository for the `questionnaire_sessions` table.

use cuido_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::QuestionnaireSession;

/// Column list for `questionnaire_sessions` queries.
const COLUMNS: &str =
    "id, user_id, questionnaire_id, status, started_at, completed_at, score";

/// Provides lookup and lifecycle operations for questionnaire sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Find the in-progress session for a user and questionnaire.
    pub async fn find_active(
        pool: &PgPool,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> Result<Option<QuestionnaireSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questionnaire_sessions \
             WHERE user_id = $1 AND questionnaire_id = $2 AND status = 'in_progress' \
             ORDER BY started_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, QuestionnaireSession>(&query)
            .bind(user_id)
            .bind(questionnaire_id)
            .fetch_optional(pool)
            .await
    }

    /// Get the in-progress session for a user and questionnaire, creating it
    /// if absent.
    ///
    /// Relies on the partial unique index `uq_questionnaire_sessions_active`;
    /// the no-op `DO UPDATE` guarantees `RETURNING` always yields the row,
    /// so two racing callers receive the same session.
    pub async fn get_or_create_active(
        pool: &PgPool,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> Result<QuestionnaireSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO questionnaire_sessions (user_id, questionnaire_id) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id, questionnaire_id) WHERE status = 'in_progress' \
             DO UPDATE SET user_id = questionnaire_sessions.user_id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionnaireSession>(&query)
            .bind(user_id)
            .bind(questionnaire_id)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<QuestionnaireSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM questionnaire_sessions WHERE id = $1");
        sqlx::query_as::<_, QuestionnaireSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Close an in-progress session as completed, storing its score.
    ///
    /// Returns `None` if the session does not exist or is already closed.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        score: Option<f64>,
    ) -> Result<Option<QuestionnaireSession>, sqlx::Error> {
        let query = format!(
            "UPDATE questionnaire_sessions \
             SET status = 'completed', completed_at = now(), score = $2 \
             WHERE id = $1 AND status = 'in_progress' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionnaireSession>(&query)
            .bind(id)
            .bind(score)
            .fetch_optional(pool)
            .await
    }

    /// List a user's sessions, most recent first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuestionnaireSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questionnaire_sessions \
             WHERE user_id = $1 \
             ORDER BY started_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, QuestionnaireSession>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
