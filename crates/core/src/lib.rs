//! Pure domain logic for the questionnaire traversal and scoring engine.
//!
//! Nothing in this crate performs I/O. Persistence lives in `cuido-db`,
//! orchestration and collaborator seams in `cuido-engine`.

pub mod answer;
pub mod error;
pub mod graph;
pub mod guest;
pub mod integrity;
pub mod profile;
pub mod progress;
pub mod questionnaire;
pub mod scoring;
pub mod session;
pub mod traversal;
pub mod types;
pub mod visibility;
