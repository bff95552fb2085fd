pub mod links;
pub mod redirect;

use crate::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the HTTP router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/links", post(links::create_link).get(links::list_links))
        .route("/links/:code", delete(links::delete_link))
        .route("/links/:code/limit", put(links::update_limit));

    Router::new()
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/session", post(links::issue_session))
        .nest("/api", api_router)
        // Short-link redirect goes LAST so /api/* and /session take priority
        .route("/:code", get(redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
