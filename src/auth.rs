use crate::{models::OwnerId, AppState};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Cookie carrying the owner token.
pub const OWNER_COOKIE: &str = "owner_id";

/// Header alternative to the cookie, for API clients.
pub const OWNER_HEADER: &str = "x-owner-token";

// ── Session Store ──────────────────────────────────────────────────────────

/// In-memory registry of owner tokens issued by this process. Each entry maps
/// a token to the instant it was issued. Tokens expire after
/// `session_duration`; nothing survives a restart.
pub struct SessionStore {
    sessions: RwLock<HashMap<OwnerId, Instant>>,
    pub session_duration: Duration,
}

impl SessionStore {
    pub fn new(session_duration_hours: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_duration: Duration::from_secs(session_duration_hours.saturating_mul(3600)),
        }
    }

    /// Issue a new owner token.
    pub async fn issue(&self) -> OwnerId {
        let owner = OwnerId::generate();
        let mut sessions = self.sessions.write().await;
        // Opportunistically prune expired sessions on every issue
        sessions.retain(|_, issued_at| issued_at.elapsed() < self.session_duration);
        sessions.insert(owner, Instant::now());
        owner
    }

    /// Return `true` if the token was issued here and has not expired.
    pub async fn is_valid(&self, owner: &OwnerId) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(owner)
            .map(|issued_at| issued_at.elapsed() < self.session_duration)
            .unwrap_or(false)
    }
}

// ── Owner extractor ────────────────────────────────────────────────────────

/// Extractor that resolves the caller's owner token. Any handler taking an
/// `Owner` only runs when the request carries a token this process issued;
/// otherwise the request is rejected with 401.
pub struct Owner(pub OwnerId);

#[async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let token = jar
            .get(OWNER_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .or_else(|| {
                parts
                    .headers
                    .get(OWNER_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            });

        let owner = match token.as_deref().map(str::parse::<OwnerId>) {
            Some(Ok(owner)) => owner,
            _ => return Err(unauthorized("missing or malformed owner token")),
        };

        if state.sessions.is_valid(&owner).await {
            Ok(Owner(owner))
        } else {
            Err(unauthorized("unknown or expired owner token"))
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
