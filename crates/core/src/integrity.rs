//! Publish-time graph checks.
//!
//! Traversal never guesses around a malformed graph; instead a definition is
//! checked once, when it is published, and refused if any issue is found.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::graph::{QuestionGraph, ResponseType};

/// Every problem that prevents the graph from being published.
pub fn integrity_issues(graph: &QuestionGraph) -> Vec<String> {
    let mut issues = Vec::new();

    if graph.is_empty() {
        issues.push("Questionnaire has no questions".to_string());
        return issues;
    }

    let entries = graph.entry_points();
    match entries.len() {
        0 => issues.push("No entry point: every question has an incoming edge".to_string()),
        1 => {}
        n => issues.push(format!(
            "Expected exactly one entry point, found {n}: {:?}",
            entries.iter().map(|q| q.id).collect::<Vec<_>>()
        )),
    }

    let mut order_seen: HashMap<i32, i64> = HashMap::new();
    for question in graph.questions() {
        if let Some(other) = order_seen.insert(question.order_index, question.id) {
            issues.push(format!(
                "Questions {other} and {} share order index {}",
                question.id, question.order_index
            ));
        }

        let options = graph.options_of(question.id);
        let phantoms = options.iter().filter(|o| o.is_phantom).count();
        let visible = options.len() - phantoms;
        match question.response_type {
            ResponseType::FreeText => {
                if phantoms != 1 || visible != 0 {
                    issues.push(format!(
                        "Free-text question {} must own exactly one phantom option and nothing else",
                        question.id
                    ));
                }
            }
            ResponseType::SingleChoice | ResponseType::MultiChoice => {
                if visible == 0 || phantoms != 0 {
                    issues.push(format!(
                        "Choice question {} must own at least one option and no phantom option",
                        question.id
                    ));
                }
                if question.captures_profile_field.is_some() {
                    issues.push(format!(
                        "Only free-text questions can capture profile fields (question {})",
                        question.id
                    ));
                }
            }
        }

        for option in options {
            if let Some(target) = option.next_question_id {
                if graph.question(target).is_none() {
                    issues.push(format!(
                        "Option {} points to missing question {target}",
                        option.id
                    ));
                }
            }
        }

        if let Some(rule) = &question.visibility_rule {
            for condition in &rule.conditions {
                if graph.question(condition.question_id).is_none() {
                    issues.push(format!(
                        "Visibility rule of question {} references missing question {}",
                        question.id, condition.question_id
                    ));
                    continue;
                }
                for option_id in &condition.acceptable_option_ids {
                    let owned = graph
                        .option(*option_id)
                        .is_some_and(|o| o.question_id == condition.question_id);
                    if !owned {
                        issues.push(format!(
                            "Visibility rule of question {} accepts option {option_id}, \
                             which is not an option of question {}",
                            question.id, condition.question_id
                        ));
                    }
                }
            }
        }
    }

    if let Err(CoreError::GraphIntegrity(msg)) = graph.check_acyclic() {
        issues.push(msg);
    }

    issues
}

/// Refuse to publish a graph with any integrity issue.
pub fn validate_for_publish(graph: &QuestionGraph) -> Result<(), CoreError> {
    let issues = integrity_issues(graph);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CoreError::GraphIntegrity(issues.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;
    use crate::profile::ProfileField;
    use crate::visibility::{Combinator, Condition, VisibilityRule};
    use assert_matches::assert_matches;

    fn valid() -> QuestionGraph {
        let mut q2 = question(2, 1, ResponseType::FreeText);
        q2.captures_profile_field = Some(ProfileField::Name);
        q2.visibility_rule = Some(VisibilityRule {
            combinator: Combinator::Or,
            conditions: vec![Condition {
                question_id: 1,
                acceptable_option_ids: vec![10],
            }],
        });
        QuestionGraph::new(
            vec![choice_q(1, 0), q2, choice_q(3, 2)],
            vec![
                option(10, 1, Some(2)),
                option(11, 1, Some(3)),
                phantom(20, 2, Some(3)),
                option(30, 3, None),
            ],
        )
        .unwrap()
    }

    #[test]
    fn well_formed_graph_publishes() {
        assert!(validate_for_publish(&valid()).is_ok());
    }

    #[test]
    fn two_entry_points_rejected() {
        let g = QuestionGraph::new(
            vec![choice_q(1, 0), choice_q(2, 1)],
            vec![option(10, 1, None), option(20, 2, None)],
        )
        .unwrap();
        let issues = integrity_issues(&g);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("exactly one entry point"));
    }

    #[test]
    fn empty_graph_rejected() {
        let g = QuestionGraph::new(vec![], vec![]).unwrap();
        assert_matches!(validate_for_publish(&g), Err(CoreError::GraphIntegrity(_)));
    }

    #[test]
    fn dangling_and_duplicate_order_reported() {
        let g = QuestionGraph::new(
            vec![choice_q(1, 0), choice_q(2, 0)],
            vec![option(10, 1, Some(2)), option(20, 2, Some(9))],
        )
        .unwrap();
        let issues = integrity_issues(&g);
        assert!(issues.iter().any(|i| i.contains("order index")));
        assert!(issues.iter().any(|i| i.contains("missing question 9")));
    }

    #[test]
    fn free_text_without_phantom_rejected() {
        let g = QuestionGraph::new(
            vec![question(1, 0, ResponseType::FreeText)],
            vec![option(10, 1, None)],
        )
        .unwrap();
        assert!(integrity_issues(&g)
            .iter()
            .any(|i| i.contains("phantom")));
    }

    #[test]
    fn rule_with_foreign_option_rejected() {
        let mut q2 = choice_q(2, 1);
        q2.visibility_rule = Some(VisibilityRule {
            combinator: Combinator::And,
            conditions: vec![Condition {
                question_id: 1,
                acceptable_option_ids: vec![20],
            }],
        });
        let g = QuestionGraph::new(
            vec![choice_q(1, 0), q2],
            vec![option(10, 1, Some(2)), option(20, 2, None)],
        )
        .unwrap();
        assert!(integrity_issues(&g)
            .iter()
            .any(|i| i.contains("accepts option 20")));
    }

    #[test]
    fn cycle_rejected() {
        let g = QuestionGraph::new(
            vec![choice_q(1, 0), choice_q(2, 1), choice_q(3, 2)],
            vec![
                option(10, 1, Some(2)),
                option(20, 2, Some(3)),
                option(30, 3, Some(2)),
                option(31, 3, None),
            ],
        )
        .unwrap();
        assert!(integrity_issues(&g).iter().any(|i| i.contains("Cycle")));
    }
}
