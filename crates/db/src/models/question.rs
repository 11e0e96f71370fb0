//! Question entity model and DTOs.

use cuido_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `questions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: DbId,
    pub questionnaire_id: DbId,
    pub order_index: i32,
    pub prompt: String,
    pub response_type: String,
    pub visibility_rule: Option<serde_json::Value>,
    pub captures_profile_field: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for adding a question to a draft questionnaire.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestion {
    pub questionnaire_id: DbId,
    pub order_index: i32,
    pub prompt: String,
    pub response_type: String,
    pub visibility_rule: Option<serde_json::Value>,
    pub captures_profile_field: Option<String>,
}
