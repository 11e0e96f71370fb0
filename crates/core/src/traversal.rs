//! Stepping through a question graph with visibility applied.

use std::collections::HashMap;

use crate::answer::Choice;
use crate::error::CoreError;
use crate::graph::{QuestionGraph, QuestionNode};
use crate::types::DbId;
use crate::visibility::{answered_from, next_visible, AnsweredSoFar};

/// The first question to show, given what has been answered so far.
pub fn start_question<'g>(
    graph: &'g QuestionGraph,
    answered: &AnsweredSoFar,
) -> Result<Option<&'g QuestionNode>, CoreError> {
    next_visible(graph, answered, Some(graph.first_question()?))
}

/// The question shown after answering `question_id` with `choice`, or `None`
/// when the answer ends the questionnaire.
pub fn next_after_answer<'g>(
    graph: &'g QuestionGraph,
    answered: &AnsweredSoFar,
    question_id: DbId,
    choice: &Choice,
) -> Result<Option<&'g QuestionNode>, CoreError> {
    let option = graph.branch_option(question_id, choice)?;
    let target = graph.resolve_next(option)?;
    next_visible(graph, answered, target)
}

/// Replay stored answers from the entry point and return the first visible
/// question that has no answer yet. `None` means the path is fully answered.
pub fn pending_question<'g>(
    graph: &'g QuestionGraph,
    answers: &HashMap<DbId, Choice>,
) -> Result<Option<&'g QuestionNode>, CoreError> {
    let answered = answered_from(graph, answers.iter().map(|(q, c)| (*q, c)));
    let mut current = start_question(graph, &answered)?;
    let mut hops = 0usize;

    while let Some(question) = current {
        let Some(choice) = answers.get(&question.id) else {
            return Ok(Some(question));
        };
        hops += 1;
        if hops > graph.len() {
            return Err(CoreError::GraphIntegrity(format!(
                "Replaying answers loops back through question {}",
                question.id
            )));
        }
        current = next_after_answer(graph, &answered, question.id, choice)?;
    }

    Ok(None)
}
