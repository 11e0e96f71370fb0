//! In-memory collaborators.
//!
//! Used by tests and by callers that have no database (e.g. a local demo).
//! [`MemoryStore`] keeps plain find-then-create semantics for active
//! sessions; only the PostgreSQL store closes that race.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use cuido_core::answer::Choice;
use cuido_core::graph::{OptionNode, QuestionNode};
use cuido_core::profile::ProfileCaptures;
use cuido_core::questionnaire::{QuestionnaireDefinition, QuestionnaireKind, QuestionnaireStatus};
use cuido_core::session::{Response, Session, SessionStatus};
use cuido_core::types::DbId;

use crate::error::EngineResult;
use crate::store::{LocalStorage, ProfileSink, QuestionnaireStore, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory state lock poisoned".into()))
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    questionnaires: BTreeMap<DbId, QuestionnaireDefinition>,
    questions: Vec<QuestionNode>,
    options: Vec<OptionNode>,
    sessions: BTreeMap<DbId, Session>,
    /// Kept in first-answer order; upserts replace in place.
    responses: Vec<Response>,
    next_session_id: DbId,
    offline: bool,
}

impl State {
    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }
}

/// Durable-store stand-in holding every row in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a definition (any status) under its own id.
    pub fn add_questionnaire(&self, definition: QuestionnaireDefinition) -> Result<(), StoreError> {
        lock(&self.state)?
            .questionnaires
            .insert(definition.id, definition);
        Ok(())
    }

    pub fn add_question(&self, question: QuestionNode) -> Result<(), StoreError> {
        lock(&self.state)?.questions.push(question);
        Ok(())
    }

    pub fn add_option(&self, option: OptionNode) -> Result<(), StoreError> {
        lock(&self.state)?.options.push(option);
        Ok(())
    }

    /// Simulate an outage: every trait call fails with `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) -> Result<(), StoreError> {
        lock(&self.state)?.offline = offline;
        Ok(())
    }

    /// Snapshot of all sessions, by id.
    pub fn sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(lock(&self.state)?.sessions.values().cloned().collect())
    }

    /// Snapshot of all responses, across sessions.
    pub fn responses(&self) -> Result<Vec<Response>, StoreError> {
        Ok(lock(&self.state)?.responses.clone())
    }
}

#[async_trait]
impl QuestionnaireStore for MemoryStore {
    async fn find_questionnaire(&self, id: DbId) -> EngineResult<Option<QuestionnaireDefinition>> {
        let state = lock(&self.state)?;
        state.ensure_online()?;
        Ok(state.questionnaires.get(&id).cloned())
    }

    async fn load_graph(
        &self,
        questionnaire_id: DbId,
    ) -> EngineResult<(Vec<QuestionNode>, Vec<OptionNode>)> {
        let state = lock(&self.state)?;
        state.ensure_online()?;
        let questions: Vec<QuestionNode> = state
            .questions
            .iter()
            .filter(|q| q.questionnaire_id == questionnaire_id)
            .cloned()
            .collect();
        let options = state
            .options
            .iter()
            .filter(|o| questions.iter().any(|q| q.id == o.question_id))
            .cloned()
            .collect();
        Ok((questions, options))
    }

    async fn publish_questionnaire(
        &self,
        id: DbId,
    ) -> EngineResult<Option<QuestionnaireDefinition>> {
        let mut state = lock(&self.state)?;
        state.ensure_online()?;
        let kind = match state.questionnaires.get(&id) {
            Some(d) if d.status == QuestionnaireStatus::Draft => d.kind,
            _ => return Ok(None),
        };
        if kind == QuestionnaireKind::Onboarding {
            for other in state.questionnaires.values_mut() {
                if other.kind == QuestionnaireKind::Onboarding
                    && other.status == QuestionnaireStatus::Published
                {
                    other.status = QuestionnaireStatus::Archived;
                }
            }
        }
        Ok(state.questionnaires.get_mut(&id).map(|d| {
            d.status = QuestionnaireStatus::Published;
            d.clone()
        }))
    }

    async fn archive_questionnaire(
        &self,
        id: DbId,
    ) -> EngineResult<Option<QuestionnaireDefinition>> {
        let mut state = lock(&self.state)?;
        state.ensure_online()?;
        Ok(state
            .questionnaires
            .get_mut(&id)
            .filter(|d| d.status == QuestionnaireStatus::Published)
            .map(|d| {
                d.status = QuestionnaireStatus::Archived;
                d.clone()
            }))
    }

    async fn find_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Option<Session>> {
        let state = lock(&self.state)?;
        state.ensure_online()?;
        Ok(state
            .sessions
            .values()
            .rev()
            .find(|s| {
                s.user_id == user_id
                    && s.questionnaire_id == questionnaire_id
                    && s.status == SessionStatus::InProgress
            })
            .cloned())
    }

    async fn create_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Session> {
        let mut state = lock(&self.state)?;
        state.ensure_online()?;
        state.next_session_id += 1;
        let session = Session {
            id: state.next_session_id,
            user_id,
            questionnaire_id,
            status: SessionStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            score: None,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: DbId) -> EngineResult<Option<Session>> {
        let state = lock(&self.state)?;
        state.ensure_online()?;
        Ok(state.sessions.get(&id).cloned())
    }

    async fn complete_session(
        &self,
        id: DbId,
        score: Option<f64>,
    ) -> EngineResult<Option<Session>> {
        let mut state = lock(&self.state)?;
        state.ensure_online()?;
        Ok(state
            .sessions
            .get_mut(&id)
            .filter(|s| s.status == SessionStatus::InProgress)
            .map(|s| {
                s.status = SessionStatus::Completed;
                s.completed_at = Some(Utc::now());
                s.score = score;
                s.clone()
            }))
    }

    async fn upsert_response(
        &self,
        session_id: DbId,
        question_id: DbId,
        choice: &Choice,
    ) -> EngineResult<Response> {
        let mut state = lock(&self.state)?;
        state.ensure_online()?;
        let response = Response {
            session_id,
            question_id,
            choice: choice.clone(),
            updated_at: Utc::now(),
        };
        match state
            .responses
            .iter_mut()
            .find(|r| r.session_id == session_id && r.question_id == question_id)
        {
            Some(existing) => *existing = response.clone(),
            None => state.responses.push(response.clone()),
        }
        Ok(response)
    }

    async fn list_responses(&self, session_id: DbId) -> EngineResult<Vec<Response>> {
        let state = lock(&self.state)?;
        state.ensure_online()?;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryProfileSink
// ---------------------------------------------------------------------------

/// Profile collaborator that merges captures into a map per user.
#[derive(Default)]
pub struct MemoryProfileSink {
    profiles: Mutex<HashMap<DbId, ProfileCaptures>>,
}

impl MemoryProfileSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, user_id: DbId) -> Result<Option<ProfileCaptures>, StoreError> {
        Ok(lock(&self.profiles)?.get(&user_id).cloned())
    }
}

#[async_trait]
impl ProfileSink for MemoryProfileSink {
    async fn apply_profile_fields(
        &self,
        user_id: DbId,
        fields: &ProfileCaptures,
    ) -> EngineResult<()> {
        let mut profiles = lock(&self.profiles)?;
        let profile = profiles.entry(user_id).or_default();
        for (field, value) in fields {
            profile.insert(*field, value.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryLocalStorage
// ---------------------------------------------------------------------------

/// Local storage kept in a map; each instance is isolated from every other.
#[derive(Default)]
pub struct MemoryLocalStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}
