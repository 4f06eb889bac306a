//! Repository for the `questionnaires` table.
//!
//! Every read and write takes the owner's id and filters on it, so a
//! record belonging to another user is indistinguishable from a missing one.

use formcraft_core::questionnaire::{Questionnaire, QuestionnairePatch};
use formcraft_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::questionnaire::QuestionnaireRow;

const COLUMNS: &str = "id, user_id, title, description, questions, created_at, updated_at";

pub struct QuestionnaireRepo;

impl QuestionnaireRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        document: &Questionnaire,
    ) -> Result<QuestionnaireRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO questionnaires (user_id, title, description, questions)
             VALUES ($1, $2, NULLIF($3, ''), $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionnaireRow>(&query)
            .bind(user_id)
            .bind(&document.title)
            .bind(&document.description)
            .bind(Json(&document.questions))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id_for_owner(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<QuestionnaireRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM questionnaires WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, QuestionnaireRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// All questionnaires of `user_id`, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<QuestionnaireRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questionnaires
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, QuestionnaireRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Apply the present fields of `patch` and bump `updated_at`. An empty
    /// description is stored as NULL.
    ///
    /// Returns `None` if no row with `id` belongs to `user_id`.
    pub async fn update_for_owner(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        patch: &QuestionnairePatch,
    ) -> Result<Option<QuestionnaireRow>, sqlx::Error> {
        let query = format!(
            "UPDATE questionnaires SET
                title = COALESCE($3, title),
                description = CASE WHEN $4::text IS NULL THEN description ELSE NULLIF($4, '') END,
                questions = COALESCE($5, questions),
                updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionnaireRow>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&patch.title)
            .bind(&patch.description)
            .bind(patch.questions.as_ref().map(Json))
            .fetch_optional(pool)
            .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete_for_owner(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questionnaires WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
