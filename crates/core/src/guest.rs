//! Local-only progress of an actor without an identity.
//!
//! [`GuestBuffer`] is the value persisted as one JSON blob in local storage.
//! It mirrors the durable response semantics: one answer per question,
//! re-answering replaces in place.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::answer::Choice;
use crate::profile::{ProfileCaptures, ProfileField};
use crate::types::{DbId, Timestamp};

/// One buffered answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedResponse {
    pub question_id: DbId,
    pub choice: Choice,
}

/// Everything a guest has answered for one questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestBuffer {
    pub questionnaire_id: DbId,
    pub responses: Vec<BufferedResponse>,
    #[serde(default)]
    pub captured_fields: ProfileCaptures,
    /// Set once the guest reached the end of the questionnaire.
    #[serde(default)]
    pub completed: bool,
    pub updated_at: Timestamp,
}

impl GuestBuffer {
    pub fn new(questionnaire_id: DbId) -> Self {
        Self {
            questionnaire_id,
            responses: Vec::new(),
            captured_fields: ProfileCaptures::new(),
            completed: false,
            updated_at: Utc::now(),
        }
    }

    /// Insert or replace the answer for `question_id`.
    ///
    /// A replaced answer keeps its original position.
    pub fn upsert_response(&mut self, question_id: DbId, choice: Choice) {
        match self
            .responses
            .iter_mut()
            .find(|r| r.question_id == question_id)
        {
            Some(existing) => existing.choice = choice,
            None => self.responses.push(BufferedResponse {
                question_id,
                choice,
            }),
        }
        self.updated_at = Utc::now();
    }

    /// Record a profile capture, replacing any earlier value for the field.
    pub fn capture(&mut self, field: ProfileField, value: String) {
        self.captured_fields.insert(field, value);
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.updated_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty() && self.captured_fields.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.responses.len()
    }

    /// `(question_id, choice)` pairs in answer order.
    pub fn answers(&self) -> impl Iterator<Item = (DbId, &Choice)> {
        self.responses.iter().map(|r| (r.question_id, &r.choice))
    }
}
