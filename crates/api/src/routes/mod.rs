pub mod auth;
pub mod health;
pub mod questionnaire;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
///
/// /users/me                                        current user (requires auth)
///
/// /forms                                           list, create (requires auth)
/// /forms/{id}                                      get, update, delete (owner only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", user::router())
        .nest("/forms", questionnaire::router())
}
