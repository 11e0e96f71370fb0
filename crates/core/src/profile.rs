//! Profile fields captured from onboarding answers.
//!
//! A question opts in at authoring time through
//! `QuestionNode::captures_profile_field`; its free-text answer is then
//! written to the user's profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::answer::Choice;
use crate::error::CoreError;
use crate::graph::QuestionNode;

/// Profile attributes an onboarding question can fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    /// The caregiver's display name.
    Name,
    /// Who the caregiver looks after.
    CaregivingSubject,
    /// Relationship to the person cared for.
    Relationship,
}

impl ProfileField {
    /// Parse a field tag from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "name" => Ok(Self::Name),
            "caregiving_subject" => Ok(Self::CaregivingSubject),
            "relationship" => Ok(Self::Relationship),
            _ => Err(CoreError::Validation(format!(
                "Invalid profile field '{s}'. Must be one of: name, caregiving_subject, relationship"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CaregivingSubject => "caregiving_subject",
            Self::Relationship => "relationship",
        }
    }
}

/// Captured values keyed by field. Later captures of a field replace earlier ones.
pub type ProfileCaptures = BTreeMap<ProfileField, String>;

/// The profile capture an answer produces, if its question is tagged and the
/// answer is non-blank free text.
pub fn capture_for(question: &QuestionNode, choice: &Choice) -> Option<(ProfileField, String)> {
    let field = question.captures_profile_field?;
    let text = choice.free_text()?.trim();
    (!text.is_empty()).then(|| (field, text.to_string()))
}
