//! Handlers for the `/forms` resource.
//!
//! Bodies are taken as raw JSON and run through the questionnaire schema,
//! so a bad shape is reported per field rather than as a parse failure.
//! Every query is scoped to the caller; someone else's questionnaire is a 404.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use formcraft_core::error::CoreError;
use formcraft_core::questionnaire::StoredQuestionnaire;
use formcraft_core::schema::{validate_complete, validate_patch};
use formcraft_core::types::DbId;
use formcraft_db::repositories::QuestionnaireRepo;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::AuthUser;
use crate::response::{Empty, Envelope, QuestionnaireListPayload, QuestionnairePayload};
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::not_found("Questionnaire", id))
}

/// POST /api/forms
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<Value>,
) -> AppResult<(StatusCode, Json<Envelope<QuestionnairePayload>>)> {
    let document = validate_complete(&body)?;
    let row = QuestionnaireRepo::create(&state.pool, auth.user_id, &document).await?;

    tracing::info!(
        questionnaire_id = row.id,
        user_id = auth.user_id,
        questions = document.questions.len(),
        "Questionnaire created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Questionnaire created successfully",
            QuestionnairePayload {
                questionnaire: row.into(),
            },
        )),
    ))
}

/// GET /api/forms
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Envelope<QuestionnaireListPayload>>> {
    let rows = QuestionnaireRepo::list_by_owner(&state.pool, auth.user_id).await?;
    let questionnaires: Vec<StoredQuestionnaire> = rows.into_iter().map(Into::into).collect();
    Ok(Json(Envelope::new(QuestionnaireListPayload { questionnaires })))
}

/// GET /api/forms/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<DbId>,
) -> AppResult<Json<Envelope<QuestionnairePayload>>> {
    let row = QuestionnaireRepo::find_by_id_for_owner(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(Envelope::new(QuestionnairePayload {
        questionnaire: row.into(),
    })))
}

/// PUT /api/forms/{id}
///
/// Partial update: only fields present in the body are validated and written.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<DbId>,
    AppJson(body): AppJson<Value>,
) -> AppResult<Json<Envelope<QuestionnairePayload>>> {
    let patch = validate_patch(&body)?;
    let row = QuestionnaireRepo::update_for_owner(&state.pool, id, auth.user_id, &patch)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(questionnaire_id = id, user_id = auth.user_id, "Questionnaire updated");

    Ok(Json(Envelope::with_message(
        "Questionnaire updated successfully",
        QuestionnairePayload {
            questionnaire: row.into(),
        },
    )))
}

/// DELETE /api/forms/{id}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<DbId>,
) -> AppResult<Json<Envelope<Empty>>> {
    let deleted = QuestionnaireRepo::delete_for_owner(&state.pool, id, auth.user_id).await?;
    if !deleted {
        return Err(not_found(id));
    }

    tracing::info!(questionnaire_id = id, user_id = auth.user_id, "Questionnaire deleted");
    Ok(Json(Envelope::with_message(
        "Questionnaire deleted successfully",
        Empty {},
    )))
}
