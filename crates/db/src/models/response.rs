//! Question response entity model.

use cuido_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `question_responses` table.
///
/// `choice` holds the tagged JSON form of `cuido_core::answer::Choice`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionResponse {
    pub id: DbId,
    pub session_id: DbId,
    pub question_id: DbId,
    pub choice: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
