//! Repository for the `questions` table.

use cuido_core::types::DbId;
use sqlx::PgPool;

use crate::models::question::{CreateQuestion, Question};

/// Column list for `questions` queries.
const COLUMNS: &str = "id, questionnaire_id, order_index, prompt, response_type, \
     visibility_rule, captures_profile_field, created_at, updated_at";

/// Provides CRUD operations for questions.
pub struct QuestionRepo;

impl QuestionRepo {
    /// Insert a new question.
    pub async fn create(pool: &PgPool, input: &CreateQuestion) -> Result<Question, sqlx::Error> {
        let query = format!(
            "INSERT INTO questions \
                (questionnaire_id, order_index, prompt, response_type, \
                 visibility_rule, captures_profile_field) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(input.questionnaire_id)
            .bind(input.order_index)
            .bind(&input.prompt)
            .bind(&input.response_type)
            .bind(&input.visibility_rule)
            .bind(&input.captures_profile_field)
            .fetch_one(pool)
            .await
    }

    /// List the questions of a questionnaire in `order_index` order.
    pub async fn list_by_questionnaire(
        pool: &PgPool,
        questionnaire_id: DbId,
    ) -> Result<Vec<Question>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questions \
             WHERE questionnaire_id = $1 \
             ORDER BY order_index, id"
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(questionnaire_id)
            .fetch_all(pool)
            .await
    }
}
