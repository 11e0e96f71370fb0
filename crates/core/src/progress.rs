//! "Step X of ~N" estimation over a branching question graph.
//!
//! The remaining distance from a question is reported as a range: the
//! fewest and the most questions that can still be shown before a terminal
//! option. Edges are followed regardless of visibility rules, because those
//! depend on answers that have not been given yet. A question on the way
//! only counts towards the shortest bound when it is certain to be shown,
//! and not at all once its rule is settled as hidden.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::CoreError;
use crate::graph::{QuestionGraph, QuestionNode};
use crate::types::DbId;
use crate::visibility::AnsweredSoFar;

/// Shortest and longest remaining path, in shown questions, from one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathBounds {
    pub shortest: usize,
    pub longest: usize,
}

impl PathBounds {
    /// A question whose every option ends the questionnaire.
    pub const TERMINAL: Self = Self {
        shortest: 0,
        longest: 0,
    };

    const SHOWN: Self = Self {
        shortest: 1,
        longest: 1,
    };

    const UNDECIDED: Self = Self {
        shortest: 0,
        longest: 1,
    };

    fn widen(self, other: Self) -> Self {
        Self {
            shortest: self.shortest.min(other.shortest),
            longest: self.longest.max(other.longest),
        }
    }

    fn then(self, rest: Self) -> Self {
        Self {
            shortest: self.shortest + rest.shortest,
            longest: self.longest + rest.longest,
        }
    }
}

/// How many steps reaching `question` adds, given the answers so far.
fn step_weight(question: &QuestionNode, answered: &AnsweredSoFar) -> PathBounds {
    match &question.visibility_rule {
        None => PathBounds::SHOWN,
        Some(rule) if rule.evaluate(answered) => PathBounds::SHOWN,
        Some(rule) if rule.is_settled(answered) => PathBounds::TERMINAL,
        Some(_) => PathBounds::UNDECIDED,
    }
}

/// Progress indicator for the question currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEstimate {
    /// 1-based position of the current question.
    pub current_step: usize,
    /// Upper bound on the total number of steps.
    pub max_steps: usize,
    /// Fewest questions that may still follow the current one.
    pub min_remaining: usize,
}

impl ProgressEstimate {
    /// Most questions that may still follow the current one.
    pub fn max_remaining(&self) -> usize {
        self.max_steps - self.current_step
    }
}

/// Estimate progress at `current_question_id`; every entry of `answered`
/// is one step already taken.
pub fn estimate_progress(
    graph: &QuestionGraph,
    current_question_id: DbId,
    answered: &AnsweredSoFar,
) -> Result<ProgressEstimate, CoreError> {
    let bounds = remaining_bounds(graph, current_question_id, answered)?;
    let current_step = answered.len() + 1;
    Ok(ProgressEstimate {
        current_step,
        max_steps: current_step + bounds.longest,
        min_remaining: bounds.shortest,
    })
}

/// Shortest/longest remaining path from a question to any terminal option.
///
/// Fails with `GraphIntegrity` on a cycle and `DanglingEdge` on an edge to a
/// missing question.
pub fn remaining_bounds(
    graph: &QuestionGraph,
    question_id: DbId,
    answered: &AnsweredSoFar,
) -> Result<PathBounds, CoreError> {
    graph.require_question(question_id)?;
    let mut walker = PathWalker {
        graph,
        answered,
        memo: HashMap::new(),
        on_path: HashSet::new(),
    };
    walker.visit(question_id)
}

struct PathWalker<'g> {
    graph: &'g QuestionGraph,
    answered: &'g AnsweredSoFar,
    memo: HashMap<DbId, PathBounds>,
    on_path: HashSet<DbId>,
}

impl PathWalker<'_> {
    fn visit(&mut self, question_id: DbId) -> Result<PathBounds, CoreError> {
        if let Some(bounds) = self.memo.get(&question_id) {
            return Ok(*bounds);
        }
        if !self.on_path.insert(question_id) {
            return Err(CoreError::GraphIntegrity(format!(
                "Cycle detected through question {question_id}"
            )));
        }

        let graph = self.graph;
        let mut acc: Option<PathBounds> = None;
        for option in graph.options_of(question_id) {
            let branch = match graph.resolve_next(option)? {
                None => PathBounds::TERMINAL,
                Some(next) => step_weight(next, self.answered).then(self.visit(next.id)?),
            };
            acc = Some(acc.map_or(branch, |a| a.widen(branch)));
        }
        let bounds = acc.unwrap_or(PathBounds::TERMINAL);

        self.on_path.remove(&question_id);
        self.memo.insert(question_id, bounds);
        Ok(bounds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
