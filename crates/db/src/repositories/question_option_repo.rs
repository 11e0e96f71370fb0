//! Repository for the `question_options` table.

use cuido_core::types::DbId;
use sqlx::PgPool;

use crate::models::question_option::{CreateQuestionOption, QuestionOption};

/// Column list for `question_options` queries.
const COLUMNS: &str = "id, question_id, label, score, next_question_id, \
     display_order, is_phantom, created_at";

/// Provides CRUD operations for question options.
pub struct QuestionOptionRepo;

impl QuestionOptionRepo {
    /// Insert a new option.
    pub async fn create(
        pool: &PgPool,
        input: &CreateQuestionOption,
    ) -> Result<QuestionOption, sqlx::Error> {
        let query = format!(
            "INSERT INTO question_options \
                (question_id, label, score, next_question_id, display_order, is_phantom) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 0), COALESCE($6, false)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionOption>(&query)
            .bind(input.question_id)
            .bind(&input.label)
            .bind(input.score)
            .bind(input.next_question_id)
            .bind(input.display_order)
            .bind(input.is_phantom)
            .fetch_one(pool)
            .await
    }

    /// Point an option's edge at another question (or end the run with `None`).
    pub async fn set_next_question(
        pool: &PgPool,
        id: DbId,
        next_question_id: Option<DbId>,
    ) -> Result<Option<QuestionOption>, sqlx::Error> {
        let query = format!(
            "UPDATE question_options SET next_question_id = $2 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionOption>(&query)
            .bind(id)
            .bind(next_question_id)
            .fetch_optional(pool)
            .await
    }

    /// List every option of every question in a questionnaire.
    pub async fn list_by_questionnaire(
        pool: &PgPool,
        questionnaire_id: DbId,
    ) -> Result<Vec<QuestionOption>, sqlx::Error> {
        let query = "SELECT o.id, o.question_id, o.label, o.score, o.next_question_id, \
                o.display_order, o.is_phantom, o.created_at \
             FROM question_options o \
             JOIN questions q ON q.id = o.question_id \
             WHERE q.questionnaire_id = $1 \
             ORDER BY o.question_id, o.display_order, o.id";
        sqlx::query_as::<_, QuestionOption>(query)
            .bind(questionnaire_id)
            .fetch_all(pool)
            .await
    }
}
