//! Submitted answers and their validation against the question graph.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::graph::{QuestionGraph, ResponseType};
use crate::types::DbId;

/// Maximum accepted length of a free-text answer, in characters.
pub const MAX_FREE_TEXT_LENGTH: usize = 2000;

/// What the user picked for one question.
///
/// Serialized with an internal `type` tag; this is also the JSON stored in
/// the `question_responses.choice` column and in the guest buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Choice {
    Single { option_id: DbId },
    Multi { option_ids: Vec<DbId> },
    FreeText { text: String },
}

impl Choice {
    /// The free text of a free-text answer.
    pub fn free_text(&self) -> Option<&str> {
        match self {
            Self::FreeText { text } => Some(text),
            _ => None,
        }
    }
}

/// Validate an answer against the question it is submitted for.
///
/// Checks that the answer shape matches the question's response type, that
/// every referenced option belongs to the question and is not its phantom
/// option, and that multi selections and free text are non-empty.
pub fn validate_choice(
    graph: &QuestionGraph,
    question_id: DbId,
    choice: &Choice,
) -> Result<(), CoreError> {
    let question = graph.require_question(question_id)?;

    let selectable = |option_id: DbId| -> Result<(), CoreError> {
        match graph.option(option_id) {
            Some(o) if o.question_id == question_id && !o.is_phantom => Ok(()),
            _ => Err(CoreError::Validation(format!(
                "Option {option_id} is not a choice of question {question_id}"
            ))),
        }
    };

    match (question.response_type, choice) {
        (ResponseType::SingleChoice, Choice::Single { option_id }) => selectable(*option_id),
        (ResponseType::MultiChoice, Choice::Multi { option_ids }) => {
            if option_ids.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Question {question_id} requires at least one selected option"
                )));
            }
            let mut seen = std::collections::HashSet::new();
            for id in option_ids {
                if !seen.insert(*id) {
                    return Err(CoreError::Validation(format!(
                        "Option {id} selected more than once"
                    )));
                }
                selectable(*id)?;
            }
            Ok(())
        }
        (ResponseType::FreeText, Choice::FreeText { text }) => {
            if text.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "Question {question_id} requires a non-empty answer"
                )));
            }
            if text.chars().count() > MAX_FREE_TEXT_LENGTH {
                return Err(CoreError::Validation(format!(
                    "Answer must not exceed {MAX_FREE_TEXT_LENGTH} characters"
                )));
            }
            if graph.phantom_option(question_id).is_none() {
                return Err(CoreError::GraphIntegrity(format!(
                    "Free-text question {question_id} has no phantom option"
                )));
            }
            Ok(())
        }
        (expected, _) => Err(CoreError::Validation(format!(
            "Question {question_id} expects a {} answer",
            expected.as_str()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
