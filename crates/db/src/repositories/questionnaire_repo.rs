//! Repository for the `questionnaires` table.

use cuido_core::types::DbId;
use sqlx::PgPool;

use crate::models::questionnaire::{CreateQuestionnaire, Questionnaire};

/// Column list for `questionnaires` queries.
const COLUMNS: &str = "id, title, kind, status, scoring_policy, created_at, updated_at";

/// Provides CRUD and lifecycle operations for questionnaire definitions.
pub struct QuestionnaireRepo;

impl QuestionnaireRepo {
    /// Insert a new draft questionnaire.
    pub async fn create(
        pool: &PgPool,
        input: &CreateQuestionnaire,
    ) -> Result<Questionnaire, sqlx::Error> {
        let query = format!(
            "INSERT INTO questionnaires (title, kind, scoring_policy) \
             VALUES ($1, $2, COALESCE($3, 'generic')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Questionnaire>(&query)
            .bind(&input.title)
            .bind(&input.kind)
            .bind(&input.scoring_policy)
            .fetch_one(pool)
            .await
    }

    /// Find a questionnaire by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Questionnaire>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM questionnaires WHERE id = $1");
        sqlx::query_as::<_, Questionnaire>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the published questionnaire of a kind, newest first.
    pub async fn find_published_by_kind(
        pool: &PgPool,
        kind: &str,
    ) -> Result<Option<Questionnaire>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questionnaires \
             WHERE kind = $1 AND status = 'published' \
             ORDER BY updated_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Questionnaire>(&query)
            .bind(kind)
            .fetch_optional(pool)
            .await
    }

    /// Publish a draft questionnaire.
    ///
    /// Publishing an onboarding questionnaire archives the currently
    /// published one in the same transaction. Returns `None` (and changes
    /// nothing) if `id` is not a draft.
    pub async fn publish(pool: &PgPool, id: DbId) -> Result<Option<Questionnaire>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let kind: Option<(String,)> = sqlx::query_as(
            "SELECT kind FROM questionnaires WHERE id = $1 AND status = 'draft' FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((kind,)) = kind else {
            return Ok(None);
        };

        if kind == "onboarding" {
            let archived = sqlx::query(
                "UPDATE questionnaires SET status = 'archived', updated_at = now() \
                 WHERE kind = 'onboarding' AND status = 'published'",
            )
            .execute(&mut *tx)
            .await?;
            if archived.rows_affected() > 0 {
                tracing::info!(
                    questionnaire_id = id,
                    archived = archived.rows_affected(),
                    "Archived previously published onboarding questionnaire",
                );
            }
        }

        let query = format!(
            "UPDATE questionnaires SET status = 'published', updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let published = sqlx::query_as::<_, Questionnaire>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(published))
    }

    /// Archive a published questionnaire. Returns `None` if it is not published.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<Option<Questionnaire>, sqlx::Error> {
        let query = format!(
            "UPDATE questionnaires SET status = 'archived', updated_at = now() \
             WHERE id = $1 AND status = 'published' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Questionnaire>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a questionnaire. Questions, options, sessions and responses
    /// cascade. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questionnaires WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
