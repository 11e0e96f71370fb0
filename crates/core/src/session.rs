//! Sessions (one attempt at a questionnaire) and their responses.

use serde::{Deserialize, Serialize};

use crate::answer::Choice;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// Status values for a questionnaire session.
///
/// `Abandoned` is reserved for external cleanup jobs; the engine itself only
/// ever moves a session from `InProgress` to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(CoreError::Validation(format!(
                "Invalid session status '{s}'. Must be one of: in_progress, completed, abandoned"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Closed sessions are never reopened.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One attempt by one user at one questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub questionnaire_id: DbId,
    pub status: SessionStatus,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub score: Option<f64>,
}

impl Session {
    /// Fail with `Conflict` unless the session still accepts answers.
    pub fn ensure_open(&self) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Session {} is {} and no longer accepts answers",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

/// The single stored answer for `(session_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub session_id: DbId,
    pub question_id: DbId,
    pub choice: Choice,
    pub updated_at: Timestamp,
}
