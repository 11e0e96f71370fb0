//! Visibility rules: whether a question is shown given the answers so far.
//!
//! Rules only ever look backwards. A condition that names a question which
//! has not been answered yet (or never will be, because it sits later in the
//! graph or is the question itself) is simply unsatisfied.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::answer::Choice;
use crate::error::CoreError;
use crate::graph::{QuestionGraph, QuestionNode};
use crate::types::DbId;

/// Question id -> option ids chosen for it.
pub type AnsweredSoFar = HashMap<DbId, BTreeSet<DbId>>;

/// How the conditions of a rule are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    And,
    Or,
}

/// "The answer to `question_id` is one of `acceptable_option_ids`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub question_id: DbId,
    pub acceptable_option_ids: Vec<DbId>,
}

impl Condition {
    fn holds(&self, answered: &AnsweredSoFar) -> bool {
        answered
            .get(&self.question_id)
            .is_some_and(|chosen| {
                self.acceptable_option_ids
                    .iter()
                    .any(|id| chosen.contains(id))
            })
    }
}

/// Boolean predicate over prior answers. Stored as JSONB on the question row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRule {
    pub combinator: Combinator,
    pub conditions: Vec<Condition>,
}

impl VisibilityRule {
    /// Evaluate the rule. A rule without conditions does not restrict anything.
    pub fn evaluate(&self, answered: &AnsweredSoFar) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.combinator {
            Combinator::And => self.conditions.iter().all(|c| c.holds(answered)),
            Combinator::Or => self.conditions.iter().any(|c| c.holds(answered)),
        }
    }

    /// Every question the rule looks at has been answered, so further
    /// answers can no longer change the outcome.
    pub fn is_settled(&self, answered: &AnsweredSoFar) -> bool {
        self.conditions
            .iter()
            .all(|c| answered.contains_key(&c.question_id))
    }
}

/// Whether `question` is visible. Questions without a rule always are.
pub fn is_visible(question: &QuestionNode, answered: &AnsweredSoFar) -> bool {
    question
        .visibility_rule
        .as_ref()
        .map_or(true, |rule| rule.evaluate(answered))
}

/// Build the answered-so-far map from `(question_id, choice)` pairs.
pub fn answered_from<'a, I>(graph: &QuestionGraph, answers: I) -> AnsweredSoFar
where
    I: IntoIterator<Item = (DbId, &'a Choice)>,
{
    answers
        .into_iter()
        .map(|(question_id, choice)| (question_id, graph.chosen_option_ids(question_id, choice)))
        .collect()
}

/// Walk forward from `candidate`, skipping questions that are not visible.
///
/// A hidden question is passed through its default branch (phantom option,
/// otherwise first option). Returns the first visible question reached, or
/// `None` when the walk falls off a terminal edge. More hops than there are
/// questions means the walk is looping, which is a `GraphIntegrity` error.
pub fn next_visible<'g>(
    graph: &'g QuestionGraph,
    answered: &AnsweredSoFar,
    mut candidate: Option<&'g QuestionNode>,
) -> Result<Option<&'g QuestionNode>, CoreError> {
    let mut hops = 0usize;
    while let Some(question) = candidate {
        if is_visible(question, answered) {
            return Ok(Some(question));
        }
        hops += 1;
        if hops > graph.len() {
            return Err(CoreError::GraphIntegrity(format!(
                "Skipping hidden questions loops back through question {}",
                question.id
            )));
        }
        candidate = match graph.default_branch(question.id) {
            Some(option) => graph.resolve_next(option)?,
            None => None,
        };
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
