//! Route definitions for the `/forms` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::questionnaire;
use crate::state::AppState;

/// Routes mounted at `/forms`.
///
/// ```text
/// GET    /      -> list
/// POST   /      -> create
/// GET    /{id}  -> get_by_id
/// PUT    /{id}  -> update
/// DELETE /{id}  -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(questionnaire::list).post(questionnaire::create))
        .route(
            "/{id}",
            get(questionnaire::get_by_id)
                .put(questionnaire::update)
                .delete(questionnaire::delete),
        )
}
