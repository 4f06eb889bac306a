//! Questionnaire row model.

use formcraft_core::questionnaire::{Question, Questionnaire, StoredQuestionnaire};
use formcraft_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `questionnaires` table. Questions live in one JSONB array so
/// their order is stored exactly as submitted.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionnaireRow {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub questions: Json<Vec<Question>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<QuestionnaireRow> for StoredQuestionnaire {
    fn from(row: QuestionnaireRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            document: Questionnaire {
                title: row.title,
                description: row.description,
                questions: row.questions.0,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
