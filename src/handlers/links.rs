use crate::{
    auth::{Owner, OWNER_COOKIE},
    error::LinkResult,
    models::LinkSummary,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Request / response bodies ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateLinkRequest {
    url: String,
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateLimitRequest {
    limit: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedLink {
    pub code: String,
    pub short_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionIssued {
    pub owner: String,
}

// ── Session ────────────────────────────────────────────────────────────────

/// POST /session
///
/// Issue a fresh owner token and hand it back both as a cookie and in the
/// body, so browser and API clients can use whichever suits them.
pub async fn issue_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let owner = state.sessions.issue().await;

    let cookie = Cookie::build((OWNER_COOKIE, owner.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(
            i64::try_from(state.config.session_duration_hours)
                .unwrap_or(i64::MAX)
                .min(i64::MAX / 3600),
        ))
        .build();

    (
        jar.add(cookie),
        Json(SessionIssued {
            owner: owner.to_string(),
        }),
    )
        .into_response()
}

// ── Links ──────────────────────────────────────────────────────────────────

/// POST /api/links
pub async fn create_link(
    Owner(owner): Owner,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateLinkRequest>,
) -> LinkResult<(StatusCode, Json<CreatedLink>)> {
    let code = state.links.create(&body.url, owner, body.limit)?;
    let short_url = state.links.short_url(&code);
    Ok((StatusCode::CREATED, Json(CreatedLink { code, short_url })))
}

/// GET /api/links
pub async fn list_links(
    Owner(owner): Owner,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<LinkSummary>> {
    Json(state.links.summaries_for_owner(&owner))
}

/// DELETE /api/links/:code
pub async fn delete_link(
    Owner(owner): Owner,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> LinkResult<StatusCode> {
    state.links.delete(&code, &owner)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/links/:code/limit
pub async fn update_limit(
    Owner(owner): Owner,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(body): Json<UpdateLimitRequest>,
) -> LinkResult<StatusCode> {
    state.links.update_limit(&code, body.limit, &owner)?;
    Ok(StatusCode::NO_CONTENT)
}
