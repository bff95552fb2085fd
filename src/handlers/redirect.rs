use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// Consume one visit and redirect to the original URL. Expired links are
/// evicted by the lookup itself and answer 410; exhausted links answer 429
/// and stay in place. A target that cannot be sent as a `Location` header
/// answers 502 without consuming a visit.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    // Targets are stored verbatim, so one may not fit in a Location header.
    // The target of a record never changes, so check it before counting.
    if let Some(link) = state.links.store().get(state.links.extract_code(&code)) {
        if HeaderValue::from_str(&link.original_url).is_err() {
            return bad_target(&code, &link.original_url);
        }
    }

    let resolved = match state.links.resolve(&code) {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };

    // The code may have been reused since the check above.
    let location = match HeaderValue::from_str(&resolved.original_url) {
        Ok(location) => location,
        Err(_) => return bad_target(&code, &resolved.original_url),
    };

    tracing::debug!(
        "Redirecting '{}' -> {} ({}/{})",
        code,
        resolved.original_url,
        resolved.visits,
        resolved.max_visits
    );
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
}

fn bad_target(code: &str, target: &str) -> Response {
    tracing::error!(
        "Short link '{}' target cannot be used as a redirect: {:?}",
        code,
        target
    );
    (StatusCode::BAD_GATEWAY, "Link target is not a valid URL").into_response()
}
