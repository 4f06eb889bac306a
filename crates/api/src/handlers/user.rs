//! Handlers for the `/users` resource.

use axum::extract::State;
use axum::Json;
use formcraft_core::error::CoreError;
use formcraft_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{Envelope, UserPayload};
use crate::state::AppState;

/// GET /api/users/me
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Envelope<UserPayload>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", auth.user_id)))?;
    Ok(Json(Envelope::new(UserPayload { user: user.into() })))
}
