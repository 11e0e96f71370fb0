//! Questionnaire definition kinds, lifecycle statuses and scoring policies.
//!
//! Every enum here is stored as a lowercase snake_case string column, so each
//! one exposes a `from_str_db` / `as_str` pair used by the repository layer.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What a questionnaire is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionnaireKind {
    /// First-run flow; at most one published at a time.
    Onboarding,
    /// Reduced to a score when the session completes.
    Scored,
    Generic,
}

impl QuestionnaireKind {
    /// Parse a kind string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "onboarding" => Ok(Self::Onboarding),
            "scored" => Ok(Self::Scored),
            "generic" => Ok(Self::Generic),
            _ => Err(CoreError::Validation(format!(
                "Invalid questionnaire kind '{s}'. Must be one of: onboarding, scored, generic"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::Scored => "scored",
            Self::Generic => "generic",
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Authoring lifecycle of a questionnaire definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionnaireStatus {
    Draft,
    Published,
    Archived,
}

impl QuestionnaireStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            _ => Err(CoreError::Validation(format!(
                "Invalid questionnaire status '{s}'. Must be one of: draft, published, archived"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

/// Validate an authoring status transition.
///
/// Only `draft -> published` and `published -> archived` are allowed. A
/// published definition is frozen and an archived one is retired for good.
pub fn validate_status_transition(
    current: QuestionnaireStatus,
    next: QuestionnaireStatus,
) -> Result<(), CoreError> {
    use QuestionnaireStatus::*;
    match (current, next) {
        (Draft, Published) | (Published, Archived) => Ok(()),
        _ => Err(CoreError::Conflict(format!(
            "Cannot move questionnaire from '{}' to '{}'",
            current.as_str(),
            next.as_str()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Scoring policy
// ---------------------------------------------------------------------------

/// How a completed session of a scored questionnaire is reduced to a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Sum of the chosen options' weights.
    #[default]
    Generic,
    /// WHO-5 well-being index, 0-100 with qualitative bands.
    Who5,
}

impl ScoringPolicy {
    /// Parse a policy string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "generic" => Ok(Self::Generic),
            "who5" => Ok(Self::Who5),
            _ => Err(CoreError::Validation(format!(
                "Invalid scoring policy '{s}'. Must be one of: generic, who5"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Who5 => "who5",
        }
    }
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// A questionnaire definition header. Questions and options live in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireDefinition {
    pub id: DbId,
    pub title: String,
    pub kind: QuestionnaireKind,
    pub status: QuestionnaireStatus,
    pub scoring_policy: ScoringPolicy,
}

impl QuestionnaireDefinition {
    /// Whether completing a session of this questionnaire produces a score.
    pub fn is_scored(&self) -> bool {
        self.kind == QuestionnaireKind::Scored
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
