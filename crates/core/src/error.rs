use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Graph integrity error: {0}")]
    GraphIntegrity(String),

    #[error("Dangling edge: option {option_id} points to missing question {target_id}")]
    DanglingEdge { option_id: DbId, target_id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
