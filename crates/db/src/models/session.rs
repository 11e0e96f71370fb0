//! Questionnaire session entity model.

use cuido_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `questionnaire_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionnaireSession {
    pub id: DbId,
    pub user_id: DbId,
    pub questionnaire_id: DbId,
    pub status: String,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub score: Option<f64>,
}
