//! Repository for the `question_responses` table.

use cuido_core::types::DbId;
use sqlx::PgPool;

use crate::models::response::QuestionResponse;

/// Column list for `question_responses` queries.
const COLUMNS: &str = "id, session_id, question_id, choice, created_at, updated_at";

/// Provides upsert and listing for question responses.
pub struct ResponseRepo;

impl ResponseRepo {
    /// Write the answer for `(session_id, question_id)`, replacing any
    /// previous answer for the same key.
    pub async fn upsert(
        pool: &PgPool,
        session_id: DbId,
        question_id: DbId,
        choice: &serde_json::Value,
    ) -> Result<QuestionResponse, sqlx::Error> {
        let query = format!(
            "INSERT INTO question_responses (session_id, question_id, choice) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (session_id, question_id) \
             DO UPDATE SET choice = EXCLUDED.choice, updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionResponse>(&query)
            .bind(session_id)
            .bind(question_id)
            .bind(choice)
            .fetch_one(pool)
            .await
    }

    /// List the responses of a session in the order they were first given.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<QuestionResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM question_responses \
             WHERE session_id = $1 \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, QuestionResponse>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Count the responses of a session.
    pub async fn count_by_session(pool: &PgPool, session_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM question_responses WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
