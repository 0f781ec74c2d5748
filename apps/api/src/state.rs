use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::{AutomationDeps, SessionRegistry};
use crate::records::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Application history. Postgres when DATABASE_URL is set, in-memory otherwise.
    pub records: Arc<dyn RecordStore>,
    /// Backend clients, pacing and limits handed to every new session.
    pub automation: AutomationDeps,
    pub sessions: SessionRegistry,
}
