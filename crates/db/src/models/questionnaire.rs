//! Questionnaire definition entity model and DTOs.

use cuido_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `questionnaires` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Questionnaire {
    pub id: DbId,
    pub title: String,
    pub kind: String,
    pub status: String,
    pub scoring_policy: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a draft questionnaire.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionnaire {
    pub title: String,
    pub kind: String,
    /// Defaults to `generic` when omitted.
    pub scoring_policy: Option<String>,
}
