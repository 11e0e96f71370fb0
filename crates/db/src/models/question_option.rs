//! Question option entity model and DTOs.

use cuido_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `question_options` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionOption {
    pub id: DbId,
    pub question_id: DbId,
    pub label: String,
    pub score: Option<f64>,
    pub next_question_id: Option<DbId>,
    pub display_order: i32,
    pub is_phantom: bool,
    pub created_at: Timestamp,
}

/// DTO for adding an option (or the phantom option) to a question.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionOption {
    pub question_id: DbId,
    pub label: String,
    pub score: Option<f64>,
    pub next_question_id: Option<DbId>,
    pub display_order: Option<i32>,
    pub is_phantom: Option<bool>,
}
