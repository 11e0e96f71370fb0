//! Question graph model.
//!
//! A questionnaire is a directed graph: questions are nodes and every option
//! contributes one edge through its `next_question_id` (`None` ends the run).
//! `order_index` is only a tie-breaker for entry-point selection and a
//! progress heuristic; traversal always follows option edges.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::answer::Choice;
use crate::error::CoreError;
use crate::profile::ProfileField;
use crate::types::DbId;
use crate::visibility::VisibilityRule;

// ---------------------------------------------------------------------------
// Response type
// ---------------------------------------------------------------------------

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    SingleChoice,
    MultiChoice,
    FreeText,
}

impl ResponseType {
    /// Parse a response type string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "single_choice" => Ok(Self::SingleChoice),
            "multi_choice" => Ok(Self::MultiChoice),
            "free_text" => Ok(Self::FreeText),
            _ => Err(CoreError::Validation(format!(
                "Invalid response type '{s}'. Must be one of: single_choice, multi_choice, free_text"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
            Self::FreeText => "free_text",
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A question node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionNode {
    pub id: DbId,
    pub questionnaire_id: DbId,
    pub order_index: i32,
    pub prompt: String,
    pub response_type: ResponseType,
    pub visibility_rule: Option<VisibilityRule>,
    /// Profile field filled from this question's free-text answer, if any.
    pub captures_profile_field: Option<ProfileField>,
}

/// An answer option and the edge it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionNode {
    pub id: DbId,
    pub question_id: DbId,
    pub label: String,
    /// Numeric weight; absent for onboarding questionnaires.
    pub score: Option<f64>,
    /// `None` means choosing this option ends the questionnaire.
    pub next_question_id: Option<DbId>,
    pub display_order: i32,
    /// The hidden option of a free-text question, carrying its branch edge.
    pub is_phantom: bool,
}

impl OptionNode {
    /// Whether choosing this option ends the questionnaire.
    pub fn is_terminal(&self) -> bool {
        self.next_question_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Read-only graph of one questionnaire's questions and options.
#[derive(Debug, Clone, Default)]
pub struct QuestionGraph {
    questions: BTreeMap<DbId, QuestionNode>,
    /// Options per question, sorted by `(display_order, id)`.
    options: HashMap<DbId, Vec<OptionNode>>,
    /// Option id -> owning question id.
    owners: HashMap<DbId, DbId>,
}

impl QuestionGraph {
    /// Build a graph from loaded rows.
    ///
    /// Fails if an option belongs to a question outside the set, or if ids
    /// repeat. Dangling `next_question_id` edges are kept and reported when
    /// they are followed.
    pub fn new(questions: Vec<QuestionNode>, options: Vec<OptionNode>) -> Result<Self, CoreError> {
        let mut graph = Self::default();

        for question in questions {
            let id = question.id;
            if graph.questions.insert(id, question).is_some() {
                return Err(CoreError::GraphIntegrity(format!(
                    "Question {id} appears more than once"
                )));
            }
        }

        for option in options {
            if !graph.questions.contains_key(&option.question_id) {
                return Err(CoreError::GraphIntegrity(format!(
                    "Option {} belongs to unknown question {}",
                    option.id, option.question_id
                )));
            }
            if graph.owners.insert(option.id, option.question_id).is_some() {
                return Err(CoreError::GraphIntegrity(format!(
                    "Option {} appears more than once",
                    option.id
                )));
            }
            graph.options.entry(option.question_id).or_default().push(option);
        }

        for list in graph.options.values_mut() {
            list.sort_by_key(|o| (o.display_order, o.id));
        }

        Ok(graph)
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// All questions, ordered by id.
    pub fn questions(&self) -> impl Iterator<Item = &QuestionNode> {
        self.questions.values()
    }

    pub fn question(&self, id: DbId) -> Option<&QuestionNode> {
        self.questions.get(&id)
    }

    /// Look up a question, failing with `NotFound` when it is not in the graph.
    pub fn require_question(&self, id: DbId) -> Result<&QuestionNode, CoreError> {
        self.question(id).ok_or(CoreError::NotFound {
            entity: "question",
            id,
        })
    }

    pub fn option(&self, id: DbId) -> Option<&OptionNode> {
        let question_id = self.owners.get(&id)?;
        self.options_of(*question_id).iter().find(|o| o.id == id)
    }

    /// Every option of a question, phantom included, in display order.
    pub fn options_of(&self, question_id: DbId) -> &[OptionNode] {
        self.options
            .get(&question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Options the user can actually pick. Phantom options are excluded.
    pub fn choices_for(&self, question_id: DbId) -> Vec<&OptionNode> {
        self.options_of(question_id)
            .iter()
            .filter(|o| !o.is_phantom)
            .collect()
    }

    /// The phantom option of a free-text question.
    pub fn phantom_option(&self, question_id: DbId) -> Option<&OptionNode> {
        self.options_of(question_id).iter().find(|o| o.is_phantom)
    }

    /// Questions that no option edge points at, lowest `order_index` first.
    pub fn entry_points(&self) -> Vec<&QuestionNode> {
        let targets: HashSet<DbId> = self
            .options
            .values()
            .flatten()
            .filter_map(|o| o.next_question_id)
            .collect();

        let mut entries: Vec<&QuestionNode> = self
            .questions
            .values()
            .filter(|q| !targets.contains(&q.id))
            .collect();
        entries.sort_by_key(|q| (q.order_index, q.id));
        entries
    }

    /// The starting question: lowest `order_index` among nodes with no
    /// incoming edge.
    pub fn first_question(&self) -> Result<&QuestionNode, CoreError> {
        if self.is_empty() {
            return Err(CoreError::GraphIntegrity(
                "Questionnaire has no questions".to_string(),
            ));
        }
        self.entry_points().into_iter().next().ok_or_else(|| {
            CoreError::GraphIntegrity(
                "Every question has an incoming edge; no entry point".to_string(),
            )
        })
    }

    /// Follow an option's edge.
    ///
    /// `Ok(None)` means the option ends the questionnaire. An edge that names
    /// a question missing from the graph is a `DanglingEdge` error, never a
    /// silent end.
    pub fn resolve_next(&self, option: &OptionNode) -> Result<Option<&QuestionNode>, CoreError> {
        match option.next_question_id {
            None => Ok(None),
            Some(target_id) => self
                .question(target_id)
                .map(Some)
                .ok_or(CoreError::DanglingEdge {
                    option_id: option.id,
                    target_id,
                }),
        }
    }

    /// The option whose edge an answer follows.
    ///
    /// Single choice follows the chosen option, multi choice the selected
    /// option with the lowest display order, free text the phantom option.
    pub fn branch_option(
        &self,
        question_id: DbId,
        choice: &Choice,
    ) -> Result<&OptionNode, CoreError> {
        let options = self.options_of(question_id);
        let found = match choice {
            Choice::Single { option_id } => options.iter().find(|o| o.id == *option_id),
            Choice::Multi { option_ids } => options.iter().find(|o| option_ids.contains(&o.id)),
            Choice::FreeText { .. } => options.iter().find(|o| o.is_phantom),
        };
        found.ok_or_else(|| {
            CoreError::Validation(format!(
                "Answer does not select any option of question {question_id}"
            ))
        })
    }

    /// The edge followed when a question is skipped: the phantom option of a
    /// free-text question, otherwise the first option in display order.
    pub fn default_branch(&self, question_id: DbId) -> Option<&OptionNode> {
        self.phantom_option(question_id)
            .or_else(|| self.options_of(question_id).first())
    }

    /// Option ids an answer counts as "chosen" for visibility purposes.
    pub fn chosen_option_ids(&self, question_id: DbId, choice: &Choice) -> BTreeSet<DbId> {
        match choice {
            Choice::Single { option_id } => BTreeSet::from([*option_id]),
            Choice::Multi { option_ids } => option_ids.iter().copied().collect(),
            Choice::FreeText { .. } => self
                .phantom_option(question_id)
                .map(|o| BTreeSet::from([o.id]))
                .unwrap_or_default(),
        }
    }

    /// Fail with `GraphIntegrity` if the forward edge graph has a cycle.
    ///
    /// Dangling edges are ignored here; they are reported separately.
    pub fn check_acyclic(&self) -> Result<(), CoreError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<DbId, Mark> = HashMap::new();

        for &start in self.questions.keys() {
            if marks.contains_key(&start) {
                continue;
            }
            // Iterative DFS; each frame is (question, next option index).
            let mut stack: Vec<(DbId, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Active);

            while let Some((node, idx)) = stack.last_mut() {
                let node = *node;
                let options = self.options_of(node);
                if *idx >= options.len() {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    continue;
                }
                let edge = options[*idx].next_question_id;
                *idx += 1;

                let Some(target) = edge.filter(|t| self.questions.contains_key(t)) else {
                    continue;
                };
                match marks.get(&target) {
                    Some(Mark::Active) => {
                        return Err(CoreError::GraphIntegrity(format!(
                            "Cycle detected through question {target}"
                        )));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(target, Mark::Active);
                        stack.push((target, 0));
                    }
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
