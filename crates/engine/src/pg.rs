//! PostgreSQL collaborators over the `cuido_db` repositories.
//!
//! Rows store enums as strings and rules/choices as JSONB; they are decoded
//! into domain types here. A row that fails to decode is reported as a
//! validation or serialization error rather than skipped.

use async_trait::async_trait;
use cuido_core::answer::Choice;
use cuido_core::error::CoreError;
use cuido_core::graph::{OptionNode, QuestionNode, ResponseType};
use cuido_core::profile::{ProfileCaptures, ProfileField};
use cuido_core::questionnaire::{
    QuestionnaireDefinition, QuestionnaireKind, QuestionnaireStatus, ScoringPolicy,
};
use cuido_core::session::{Response, Session, SessionStatus};
use cuido_core::types::DbId;
use cuido_db::models::profile::UpdateUserProfile;
use cuido_db::models::question::Question;
use cuido_db::models::question_option::QuestionOption;
use cuido_db::models::questionnaire::Questionnaire;
use cuido_db::models::response::QuestionResponse;
use cuido_db::models::session::QuestionnaireSession;
use cuido_db::repositories::{
    ProfileRepo, QuestionOptionRepo, QuestionRepo, QuestionnaireRepo, ResponseRepo, SessionRepo,
};
use cuido_db::DbPool;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::store::{ProfileSink, QuestionnaireStore, StoreError};

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn definition_from_row(row: Questionnaire) -> Result<QuestionnaireDefinition, CoreError> {
    Ok(QuestionnaireDefinition {
        id: row.id,
        kind: QuestionnaireKind::from_str_db(&row.kind)?,
        status: QuestionnaireStatus::from_str_db(&row.status)?,
        scoring_policy: ScoringPolicy::from_str_db(&row.scoring_policy)?,
        title: row.title,
    })
}

fn question_from_row(row: Question) -> EngineResult<QuestionNode> {
    let visibility_rule = row
        .visibility_rule
        .map(serde_json::from_value)
        .transpose()
        .map_err(StoreError::from)?;
    let captures_profile_field = row
        .captures_profile_field
        .as_deref()
        .map(ProfileField::from_str_db)
        .transpose()?;
    Ok(QuestionNode {
        id: row.id,
        questionnaire_id: row.questionnaire_id,
        order_index: row.order_index,
        response_type: ResponseType::from_str_db(&row.response_type)?,
        prompt: row.prompt,
        visibility_rule,
        captures_profile_field,
    })
}

fn option_from_row(row: QuestionOption) -> OptionNode {
    OptionNode {
        id: row.id,
        question_id: row.question_id,
        label: row.label,
        score: row.score,
        next_question_id: row.next_question_id,
        display_order: row.display_order,
        is_phantom: row.is_phantom,
    }
}

fn session_from_row(row: QuestionnaireSession) -> Result<Session, CoreError> {
    Ok(Session {
        id: row.id,
        user_id: row.user_id,
        questionnaire_id: row.questionnaire_id,
        status: SessionStatus::from_str_db(&row.status)?,
        started_at: row.started_at,
        completed_at: row.completed_at,
        score: row.score,
    })
}

fn response_from_row(row: QuestionResponse) -> EngineResult<Response> {
    Ok(Response {
        session_id: row.session_id,
        question_id: row.question_id,
        choice: serde_json::from_value(row.choice).map_err(StoreError::from)?,
        updated_at: row.updated_at,
    })
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// Durable store backed by PostgreSQL.
///
/// Active-session creation is a conditional insert against the partial
/// unique index on in-progress sessions, so concurrent callers converge on
/// one session.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect using `DATABASE_URL` from the config and apply migrations.
    /// `None` when no database is configured.
    pub async fn connect(config: &EngineConfig) -> EngineResult<Option<Self>> {
        let Some(url) = config.database_url.as_deref() else {
            return Ok(None);
        };
        let pool = cuido_db::create_pool(url, config.db_max_connections)
            .await
            .map_err(StoreError::from)?;
        cuido_db::run_migrations(&pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations");
            StoreError::Unavailable(format!("migrations failed: {e}"))
        })?;
        tracing::info!(max_connections = config.db_max_connections, "Database connected");
        Ok(Some(Self::new(pool)))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl QuestionnaireStore for PgStore {
    async fn find_questionnaire(&self, id: DbId) -> EngineResult<Option<QuestionnaireDefinition>> {
        let row = QuestionnaireRepo::find_by_id(&self.pool, id)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(definition_from_row).transpose()?)
    }

    async fn load_graph(
        &self,
        questionnaire_id: DbId,
    ) -> EngineResult<(Vec<QuestionNode>, Vec<OptionNode>)> {
        let questions = QuestionRepo::list_by_questionnaire(&self.pool, questionnaire_id)
            .await
            .map_err(StoreError::from)?;
        let options = QuestionOptionRepo::list_by_questionnaire(&self.pool, questionnaire_id)
            .await
            .map_err(StoreError::from)?;
        let questions = questions
            .into_iter()
            .map(question_from_row)
            .collect::<EngineResult<Vec<_>>>()?;
        Ok((questions, options.into_iter().map(option_from_row).collect()))
    }

    async fn publish_questionnaire(
        &self,
        id: DbId,
    ) -> EngineResult<Option<QuestionnaireDefinition>> {
        let row = QuestionnaireRepo::publish(&self.pool, id)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(definition_from_row).transpose()?)
    }

    async fn archive_questionnaire(
        &self,
        id: DbId,
    ) -> EngineResult<Option<QuestionnaireDefinition>> {
        let row = QuestionnaireRepo::archive(&self.pool, id)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(definition_from_row).transpose()?)
    }

    async fn find_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Option<Session>> {
        let row = SessionRepo::find_active(&self.pool, user_id, questionnaire_id)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(session_from_row).transpose()?)
    }

    async fn create_active_session(
        &self,
        user_id: DbId,
        questionnaire_id: DbId,
    ) -> EngineResult<Session> {
        let row = SessionRepo::get_or_create_active(&self.pool, user_id, questionnaire_id)
            .await
            .map_err(StoreError::from)?;
        Ok(session_from_row(row)?)
    }

    async fn find_session(&self, id: DbId) -> EngineResult<Option<Session>> {
        let row = SessionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(session_from_row).transpose()?)
    }

    async fn complete_session(
        &self,
        id: DbId,
        score: Option<f64>,
    ) -> EngineResult<Option<Session>> {
        let row = SessionRepo::complete(&self.pool, id, score)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(session_from_row).transpose()?)
    }

    async fn upsert_response(
        &self,
        session_id: DbId,
        question_id: DbId,
        choice: &Choice,
    ) -> EngineResult<Response> {
        let value = serde_json::to_value(choice).map_err(StoreError::from)?;
        let row = ResponseRepo::upsert(&self.pool, session_id, question_id, &value)
            .await
            .map_err(StoreError::from)?;
        response_from_row(row)
    }

    async fn list_responses(&self, session_id: DbId) -> EngineResult<Vec<Response>> {
        ResponseRepo::list_by_session(&self.pool, session_id)
            .await
            .map_err(StoreError::from)?
            .into_iter()
            .map(response_from_row)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PgProfileSink
// ---------------------------------------------------------------------------

/// Writes captured fields into `user_profiles`, merging with existing values.
#[derive(Clone)]
pub struct PgProfileSink {
    pool: DbPool,
}

impl PgProfileSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn profile_update(fields: &ProfileCaptures) -> UpdateUserProfile {
    UpdateUserProfile {
        display_name: fields.get(&ProfileField::Name).cloned(),
        caregiving_subject: fields.get(&ProfileField::CaregivingSubject).cloned(),
        relationship: fields.get(&ProfileField::Relationship).cloned(),
    }
}

#[async_trait]
impl ProfileSink for PgProfileSink {
    async fn apply_profile_fields(
        &self,
        user_id: DbId,
        fields: &ProfileCaptures,
    ) -> EngineResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        ProfileRepo::upsert(&self.pool, user_id, &profile_update(fields))
            .await
            .map_err(StoreError::from)?;
        tracing::debug!(user_id, fields = fields.len(), "Profile fields applied");
        Ok(())
    }
}
