//! Scoring of completed sessions.
//!
//! Two policies exist: a generic weighted sum of the chosen options, and the
//! WHO-5 well-being index (five 0-5 answers scaled to 0-100 and mapped onto
//! seven qualitative bands).

use serde::{Deserialize, Serialize};

use crate::answer::Choice;
use crate::error::CoreError;
use crate::graph::QuestionGraph;
use crate::questionnaire::ScoringPolicy;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Generic
// ---------------------------------------------------------------------------

/// Sum of the weights of every chosen option.
///
/// Free-text answers and options without a weight contribute nothing. Multi
/// choice answers contribute every selected option.
pub fn generic_score<'a, I>(graph: &QuestionGraph, answers: I) -> f64
where
    I: IntoIterator<Item = (DbId, &'a Choice)>,
{
    answers
        .into_iter()
        .map(|(_, choice)| match choice {
            Choice::Single { option_id } => option_weight(graph, *option_id),
            Choice::Multi { option_ids } => {
                option_ids.iter().map(|id| option_weight(graph, *id)).sum()
            }
            Choice::FreeText { .. } => 0.0,
        })
        .sum()
}

fn option_weight(graph: &QuestionGraph, option_id: DbId) -> f64 {
    graph
        .option(option_id)
        .filter(|o| !o.is_phantom)
        .and_then(|o| o.score)
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// WHO-5
// ---------------------------------------------------------------------------

/// Number of items in the WHO-5 index.
pub const WHO5_ITEM_COUNT: usize = 5;

/// Highest value of a single WHO-5 item.
pub const WHO5_MAX_ITEM: u8 = 5;

/// Raw-to-percentage multiplier.
pub const WHO5_MULTIPLIER: u8 = 4;

/// Coarse mood used by downstream display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodCategory {
    VeryLow,
    Low,
    Tired,
    Neutral,
    Good,
    Great,
}

impl MoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Tired => "tired",
            Self::Neutral => "neutral",
            Self::Good => "good",
            Self::Great => "great",
        }
    }
}

/// An inclusive WHO-5 score range and its qualitative reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Who5Band {
    pub min: u8,
    pub max: u8,
    pub label: &'static str,
    pub mood: MoodCategory,
}

impl Who5Band {
    pub fn contains(&self, score: u8) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

/// The seven bands, in ascending order, covering 0-100 without gaps.
pub const WHO5_BANDS: &[Who5Band] = &[
    Who5Band {
        min: 0,
        max: 9,
        label: "Día muy difícil",
        mood: MoodCategory::VeryLow,
    },
    Who5Band {
        min: 10,
        max: 19,
        label: "Día difícil",
        mood: MoodCategory::Low,
    },
    Who5Band {
        min: 20,
        max: 34,
        label: "Día pesado",
        mood: MoodCategory::Low,
    },
    Who5Band {
        min: 35,
        max: 49,
        label: "Día cansado",
        mood: MoodCategory::Tired,
    },
    Who5Band {
        min: 50,
        max: 69,
        label: "Día normal",
        mood: MoodCategory::Neutral,
    },
    Who5Band {
        min: 70,
        max: 84,
        label: "Buen día",
        mood: MoodCategory::Good,
    },
    Who5Band {
        min: 85,
        max: 100,
        label: "Día excelente",
        mood: MoodCategory::Great,
    },
];

/// A computed WHO-5 result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Who5Score {
    /// Sum of the five items, 0-25.
    pub raw_score: u8,
    /// `raw_score * 4`, 0-100.
    pub final_score: u8,
    pub band: Who5Band,
}

/// Find the band for a 0-100 score.
pub fn who5_band(final_score: u8) -> Result<Who5Band, CoreError> {
    WHO5_BANDS
        .iter()
        .find(|b| b.contains(final_score))
        .copied()
        .ok_or_else(|| {
            CoreError::Validation(format!("WHO-5 score {final_score} is outside 0-100"))
        })
}

/// Score five WHO-5 items given on the 0-5 scale.
pub fn who5_from_items(items: &[u8]) -> Result<Who5Score, CoreError> {
    if items.len() != WHO5_ITEM_COUNT {
        return Err(CoreError::Validation(format!(
            "WHO-5 needs exactly {WHO5_ITEM_COUNT} answers, got {}",
            items.len()
        )));
    }
    if let Some(bad) = items.iter().find(|v| **v > WHO5_MAX_ITEM) {
        return Err(CoreError::Validation(format!(
            "WHO-5 answers must be between 0 and {WHO5_MAX_ITEM}, got {bad}"
        )));
    }
    let raw_score: u8 = items.iter().sum();
    let final_score = raw_score * WHO5_MULTIPLIER;
    Ok(Who5Score {
        raw_score,
        final_score,
        band: who5_band(final_score)?,
    })
}

/// Score a WHO-5 session from its stored answers.
///
/// Every answer must be a single choice whose option weight is a whole
/// number on the 0-5 scale; answers are read in question order.
pub fn who5_from_answers<'a, I>(graph: &QuestionGraph, answers: I) -> Result<Who5Score, CoreError>
where
    I: IntoIterator<Item = (DbId, &'a Choice)>,
{
    let mut items: Vec<(i32, DbId, u8)> = Vec::new();
    for (question_id, choice) in answers {
        let question = graph.require_question(question_id)?;
        let Choice::Single { option_id } = choice else {
            return Err(CoreError::Validation(format!(
                "WHO-5 question {question_id} must be answered with a single choice"
            )));
        };
        let weight = graph
            .option(*option_id)
            .and_then(|o| o.score)
            .ok_or_else(|| {
                CoreError::Validation(format!("WHO-5 option {option_id} carries no score"))
            })?;
        if weight.fract() != 0.0 || !(0.0..=f64::from(WHO5_MAX_ITEM)).contains(&weight) {
            return Err(CoreError::Validation(format!(
                "WHO-5 option {option_id} has weight {weight}, expected a whole number 0-{WHO5_MAX_ITEM}"
            )));
        }
        items.push((question.order_index, question_id, weight as u8));
    }
    items.sort_by_key(|(order, id, _)| (*order, *id));
    let values: Vec<u8> = items.into_iter().map(|(_, _, v)| v).collect();
    who5_from_items(&values)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Result of scoring a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub score: f64,
    /// Present for WHO-5 sessions only.
    pub band: Option<Who5Band>,
}

/// Score a session with the questionnaire's policy.
pub fn score_answers<'a, I>(
    policy: ScoringPolicy,
    graph: &QuestionGraph,
    answers: I,
) -> Result<ScoreOutcome, CoreError>
where
    I: IntoIterator<Item = (DbId, &'a Choice)>,
{
    match policy {
        ScoringPolicy::Generic => Ok(ScoreOutcome {
            score: generic_score(graph, answers),
            band: None,
        }),
        ScoringPolicy::Who5 => {
            let who5 = who5_from_answers(graph, answers)?;
            Ok(ScoreOutcome {
                score: f64::from(who5.final_score),
                band: Some(who5.band),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
