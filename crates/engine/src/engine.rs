//! Traversal facade: the calls a UI or batch job makes to walk a
//! questionnaire, for authenticated users and guests alike.

use std::collections::HashMap;
use std::sync::Arc;

use cuido_core::answer::{validate_choice, Choice};
use cuido_core::error::CoreError;
use cuido_core::graph::{OptionNode, QuestionGraph, QuestionNode};
use cuido_core::integrity::validate_for_publish;
use cuido_core::profile::{capture_for, ProfileCaptures};
use cuido_core::progress::{estimate_progress, ProgressEstimate};
use cuido_core::questionnaire::{
    validate_status_transition, QuestionnaireDefinition, QuestionnaireStatus,
};
use cuido_core::scoring::{score_answers, ScoreOutcome};
use cuido_core::traversal::{next_after_answer, pending_question, start_question};
use cuido_core::types::DbId;
use cuido_core::visibility::{answered_from, AnsweredSoFar};
use cuido_events::{EngineEvent, EventBus, QUESTIONNAIRE_PUBLISHED};
use serde::Serialize;

use crate::emit;
use crate::error::EngineResult;
use crate::guest::{GuestBufferStore, GuestSync, SyncReport};
use crate::responses::ResponseStore;
use crate::session::{CompletedSession, SessionManager};
use crate::store::{ProfileSink, QuestionnaireStore};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Who is answering.
#[derive(Clone, Copy)]
pub enum Actor<'a> {
    /// An identified user; state goes to the durable store.
    User(DbId),
    /// No identity yet; state goes to this local buffer.
    Guest(&'a GuestBufferStore),
}

/// A question to show, with its selectable options and a progress range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub question: QuestionNode,
    /// Options in display order, phantom options excluded.
    pub choices: Vec<OptionNode>,
    pub progress: ProgressEstimate,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Finish {
    /// A user's durable session was closed. `None` if it had already been
    /// closed elsewhere.
    Session(Option<CompletedSession>),
    /// A guest finished locally; the score (for scored questionnaires) is
    /// computed from the buffer and stored again on sync.
    Guest { outcome: Option<ScoreOutcome> },
}

/// Result of starting or answering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Advance {
    Next(Step),
    Finished(Finish),
}

/// Where an interrupted run stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resume {
    /// The user's active session, if any (always `None` for guests).
    pub session_id: Option<DbId>,
    /// Stored answers in the order first given.
    pub answers: Vec<(DbId, Choice)>,
    /// The first unanswered question on the path the answers imply; `None`
    /// when the path is fully answered and only completion remains.
    pub next: Option<Step>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Entry point wiring the store, the profile collaborator and optional
/// event bus into the session, response and guest components.
#[derive(Clone)]
pub struct QuestionnaireEngine {
    store: Arc<dyn QuestionnaireStore>,
    profiles: Arc<dyn ProfileSink>,
    sessions: SessionManager,
    responses: ResponseStore,
    guest_sync: GuestSync,
    events: Option<Arc<EventBus>>,
}

impl QuestionnaireEngine {
    pub fn new(store: Arc<dyn QuestionnaireStore>, profiles: Arc<dyn ProfileSink>) -> Self {
        Self::build(store, profiles, None)
    }

    /// Like [`new`](Self::new), publishing domain events on `events`.
    pub fn with_events(
        store: Arc<dyn QuestionnaireStore>,
        profiles: Arc<dyn ProfileSink>,
        events: Arc<EventBus>,
    ) -> Self {
        Self::build(store, profiles, Some(events))
    }

    fn build(
        store: Arc<dyn QuestionnaireStore>,
        profiles: Arc<dyn ProfileSink>,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        let sessions = SessionManager::new(Arc::clone(&store), events.clone());
        let responses = ResponseStore::new(Arc::clone(&store), events.clone());
        let guest_sync = GuestSync::new(
            sessions.clone(),
            responses.clone(),
            Arc::clone(&profiles),
            events.clone(),
        );
        Self {
            store,
            profiles,
            sessions,
            responses,
            guest_sync,
            events,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    // -- Definitions ---------------------------------------------------------

    /// Publish a draft after checking its graph. Publishing an onboarding
    /// questionnaire archives the one currently published.
    pub async fn publish(&self, questionnaire_id: DbId) -> EngineResult<QuestionnaireDefinition> {
        let questionnaire = self.store.require_questionnaire(questionnaire_id).await?;
        validate_status_transition(questionnaire.status, QuestionnaireStatus::Published)?;

        let graph = self.store.graph(questionnaire_id).await?;
        if let Err(e) = validate_for_publish(&graph) {
            tracing::error!(questionnaire_id, error = %e, "Refusing to publish questionnaire");
            return Err(e.into());
        }

        let published = self
            .store
            .publish_questionnaire(questionnaire_id)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Questionnaire {questionnaire_id} is no longer a draft"
                ))
            })?;
        tracing::info!(questionnaire_id, kind = published.kind.as_str(), "Questionnaire published");
        emit(
            &self.events,
            EngineEvent::new(QUESTIONNAIRE_PUBLISHED)
                .with_questionnaire(questionnaire_id)
                .with_payload(serde_json::json!({ "kind": published.kind.as_str() })),
        );
        Ok(published)
    }

    /// Retire a published questionnaire.
    pub async fn archive(&self, questionnaire_id: DbId) -> EngineResult<QuestionnaireDefinition> {
        let questionnaire = self.store.require_questionnaire(questionnaire_id).await?;
        validate_status_transition(questionnaire.status, QuestionnaireStatus::Archived)?;
        let archived = self
            .store
            .archive_questionnaire(questionnaire_id)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Questionnaire {questionnaire_id} is no longer published"
                ))
            })?;
        tracing::info!(questionnaire_id, "Questionnaire archived");
        Ok(archived)
    }

    async fn published_graph(
        &self,
        questionnaire_id: DbId,
    ) -> EngineResult<(QuestionnaireDefinition, QuestionGraph)> {
        let questionnaire = self.store.require_questionnaire(questionnaire_id).await?;
        if questionnaire.status != QuestionnaireStatus::Published {
            return Err(CoreError::Conflict(format!(
                "Questionnaire {questionnaire_id} is {} and cannot be started",
                questionnaire.status.as_str()
            ))
            .into());
        }
        let graph = self.store.graph(questionnaire_id).await?;
        Ok((questionnaire, graph))
    }

    // -- Traversal -----------------------------------------------------------

    /// The first visible question of a published questionnaire, or `None`
    /// if every question is hidden before anything has been answered.
    ///
    /// No session is opened; that happens lazily on the first answer.
    pub async fn start(&self, questionnaire_id: DbId) -> EngineResult<Option<Step>> {
        let (_, graph) = self.published_graph(questionnaire_id).await?;
        let answered = AnsweredSoFar::new();
        match start_question(&graph, &answered)? {
            Some(question) => Ok(Some(step(&graph, question, &answered)?)),
            None => Ok(None),
        }
    }

    /// Record an answer and advance along the chosen option's edge.
    ///
    /// Hidden questions on the way are skipped. When the edge ends the
    /// questionnaire the run is finished: a user's session is completed (and
    /// scored), a guest's buffer is marked completed.
    pub async fn submit_answer(
        &self,
        actor: Actor<'_>,
        questionnaire_id: DbId,
        question_id: DbId,
        choice: Choice,
    ) -> EngineResult<Advance> {
        let (questionnaire, graph) = self.published_graph(questionnaire_id).await?;
        validate_choice(&graph, question_id, &choice)?;
        let question = graph.require_question(question_id)?;

        let answers: Vec<(DbId, Choice)> = match actor {
            Actor::User(user_id) => {
                let session = self
                    .sessions
                    .get_or_create_active_session(user_id, questionnaire_id)
                    .await?;
                self.responses
                    .upsert_response(session.id, question_id, &choice)
                    .await?;
                if let Some((field, value)) = capture_for(question, &choice) {
                    let captures = ProfileCaptures::from([(field, value)]);
                    self.profiles.apply_profile_fields(user_id, &captures).await?;
                }
                self.responses
                    .list_responses(session.id)
                    .await?
                    .into_iter()
                    .map(|r| (r.question_id, r.choice))
                    .collect()
            }
            Actor::Guest(buffer) => buffer
                .upsert_response(question, choice.clone())?
                .responses
                .into_iter()
                .map(|r| (r.question_id, r.choice))
                .collect(),
        };

        let answered = answered_from(&graph, answers.iter().map(|(q, c)| (*q, c)));
        let next = next_after_answer(&graph, &answered, question_id, &choice).map_err(|e| {
            tracing::error!(questionnaire_id, question_id, error = %e, "Cannot advance");
            e
        })?;

        if let Some(next) = next {
            return Ok(Advance::Next(step(&graph, next, &answered)?));
        }

        let finish = match actor {
            Actor::User(user_id) => {
                Finish::Session(self.sessions.complete_session(user_id, questionnaire_id).await?)
            }
            Actor::Guest(buffer) => {
                let outcome = if questionnaire.is_scored() {
                    Some(score_answers(
                        questionnaire.scoring_policy,
                        &graph,
                        answers.iter().map(|(q, c)| (*q, c)),
                    )?)
                } else {
                    None
                };
                buffer.mark_completed(questionnaire_id)?;
                Finish::Guest { outcome }
            }
        };
        Ok(Advance::Finished(finish))
    }

    /// Pick up an interrupted run: replay the stored answers from the entry
    /// point and return the first question still unanswered.
    pub async fn resume(&self, actor: Actor<'_>, questionnaire_id: DbId) -> EngineResult<Resume> {
        let graph = self.store.graph(questionnaire_id).await?;

        let (session_id, answers): (Option<DbId>, Vec<(DbId, Choice)>) = match actor {
            Actor::User(user_id) => {
                match self
                    .store
                    .find_active_session(user_id, questionnaire_id)
                    .await?
                {
                    Some(session) => {
                        let answers = self
                            .responses
                            .list_responses(session.id)
                            .await?
                            .into_iter()
                            .map(|r| (r.question_id, r.choice))
                            .collect();
                        (Some(session.id), answers)
                    }
                    None => (None, Vec::new()),
                }
            }
            Actor::Guest(buffer) => {
                let answers = match buffer.load()? {
                    Some(b) if b.questionnaire_id == questionnaire_id => b
                        .responses
                        .into_iter()
                        .map(|r| (r.question_id, r.choice))
                        .collect(),
                    _ => Vec::new(),
                };
                (None, answers)
            }
        };

        let by_question: HashMap<DbId, Choice> = answers.iter().cloned().collect();
        let answered = answered_from(&graph, by_question.iter().map(|(q, c)| (*q, c)));
        let next = match pending_question(&graph, &by_question)? {
            Some(question) => Some(step(&graph, question, &answered)?),
            None => None,
        };
        Ok(Resume {
            session_id,
            answers,
            next,
        })
    }

    /// Complete the user's active session; a no-op without one.
    pub async fn complete_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Option<CompletedSession>> {
        self.sessions.complete_session(user_id, questionnaire_id).await
    }

    /// Reconcile a guest buffer into `user_id`'s durable session.
    pub async fn sync_to_cloud(
        &self,
        buffer: &GuestBufferStore,
        user_id: DbId,
    ) -> EngineResult<Option<SyncReport>> {
        self.guest_sync.sync_to_cloud(buffer, user_id).await
    }
}

fn step(
    graph: &QuestionGraph,
    question: &QuestionNode,
    answered: &AnsweredSoFar,
) -> EngineResult<Step> {
    Ok(Step {
        question: question.clone(),
        choices: graph.choices_for(question.id).into_iter().cloned().collect(),
        progress: estimate_progress(graph, question.id, answered)?,
    })
}
