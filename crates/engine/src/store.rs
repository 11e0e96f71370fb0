//! Collaborator traits the engine is driven through.
//!
//! The engine never talks to PostgreSQL or browser storage directly; it goes
//! through these seams so the same logic runs against [`crate::pg::PgStore`]
//! in production and [`crate::memory::MemoryStore`] in tests.

use async_trait::async_trait;
use cuido_core::answer::Choice;
use cuido_core::error::CoreError;
use cuido_core::graph::{OptionNode, QuestionGraph, QuestionNode};
use cuido_core::profile::ProfileCaptures;
use cuido_core::questionnaire::QuestionnaireDefinition;
use cuido_core::session::{Response, Session};
use cuido_core::types::DbId;

use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A collaborator could not complete a read or write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local (guest) storage failed.
    #[error("Local storage error: {0}")]
    Local(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Durable store
// ---------------------------------------------------------------------------

/// Row-level access to definitions, graphs, sessions and responses.
///
/// Authorization is applied by the identity layer before calls reach here.
#[async_trait]
pub trait QuestionnaireStore: Send + Sync {
    async fn find_questionnaire(&self, id: DbId) -> EngineResult<Option<QuestionnaireDefinition>>;

    /// All questions and options of a questionnaire.
    async fn load_graph(&self, questionnaire_id: DbId)
        -> EngineResult<(Vec<QuestionNode>, Vec<OptionNode>)>;

    /// Move a draft to published, archiving the previously published
    /// onboarding definition in the same unit of work when publishing an
    /// onboarding one. `None` if `id` is not a draft.
    async fn publish_questionnaire(
        &self,
        id: DbId,
    ) -> EngineResult<Option<QuestionnaireDefinition>>;

    /// Move a published definition to archived. `None` if it is not published.
    async fn archive_questionnaire(
        &self,
        id: DbId,
    ) -> EngineResult<Option<QuestionnaireDefinition>>;

    async fn find_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Option<Session>>;

    /// Open an in-progress session.
    ///
    /// Stores with a uniqueness constraint on active sessions return the
    /// existing one instead of inserting a duplicate.
    async fn create_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Session>;

    async fn find_session(&self, id: DbId) -> EngineResult<Option<Session>>;

    /// Close an in-progress session as completed. `None` if it is missing or
    /// already closed.
    async fn complete_session(&self, id: DbId, score: Option<f64>) -> EngineResult<Option<Session>>;

    /// Write the single response for `(session_id, question_id)`.
    async fn upsert_response(
        &self,
        session_id: DbId,
        question_id: DbId,
        choice: &Choice,
    ) -> EngineResult<Response>;

    /// Responses of a session, in the order they were first given.
    async fn list_responses(&self, session_id: DbId) -> EngineResult<Vec<Response>>;

    /// Like [`find_questionnaire`](Self::find_questionnaire), failing with
    /// `NotFound` when absent.
    async fn require_questionnaire(&self, id: DbId) -> EngineResult<QuestionnaireDefinition> {
        self.find_questionnaire(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "questionnaire",
                id,
            }
            .into()
        })
    }

    /// Load and index the graph of a questionnaire.
    async fn graph(&self, questionnaire_id: DbId) -> EngineResult<QuestionGraph> {
        let (questions, options) = self.load_graph(questionnaire_id).await?;
        Ok(QuestionGraph::new(questions, options)?)
    }
}

// ---------------------------------------------------------------------------
// Profile collaborator
// ---------------------------------------------------------------------------

/// Receives free-text captures tagged for the user's profile.
#[async_trait]
pub trait ProfileSink: Send + Sync {
    /// Merge `fields` into the user's profile. Fields not present are left
    /// untouched. Applying the same captures twice has no further effect.
    async fn apply_profile_fields(&self, user_id: DbId, fields: &ProfileCaptures)
        -> EngineResult<()>;
}

// ---------------------------------------------------------------------------
// Local persistence
// ---------------------------------------------------------------------------

/// Local-only key/value storage holding one JSON blob per key.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
