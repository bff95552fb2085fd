//! Short links with a visit quota and a fixed lifetime, owned by anonymous
//! session tokens and held entirely in memory.

pub mod auth;
pub mod clock;
pub mod codegen;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod service;
pub mod shell;
pub mod store;
pub mod sweeper;

use std::sync::Arc;

use auth::SessionStore;
use service::LinkService;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: config::AppConfig,
    pub links: Arc<LinkService>,
    /// Owner tokens issued to HTTP clients by this process.
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: config::AppConfig, links: Arc<LinkService>) -> Self {
        let sessions = SessionStore::new(config.session_duration_hours);
        Self {
            config,
            links,
            sessions,
        }
    }
}
