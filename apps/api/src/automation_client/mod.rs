//! Automation client: the single point of entry for all calls to the
//! external automation backend (resume analysis, job search, job submission).
//!
//! No other module talks to the backend over HTTP. The orchestrator only sees
//! the four traits below, so each seam can be replaced in tests.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;

use crate::config::AutomationConfig;

pub mod probe;
pub mod resume;
pub mod search;
pub mod submission;


pub use probe::AvailabilityProbe;
pub use resume::ResumeAnalyzer;
pub use search::JobSearcher;
pub use submission::ApplicationSubmitter;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}

/// FastAPI-style error body: `{"detail": "..."}`. Validation errors carry a
/// list in `detail`, which is not a usable message.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    detail: Option<serde_json::Value>,
}

/// HTTP client for the automation backend.
#[derive(Clone)]
pub struct AutomationClient {
    http: Client,
    base_url: String,
    probe_timeout: Duration,
}

impl AutomationClient {
    pub fn new(config: &AutomationConfig) -> Result<Self, AutomationError> {
        Ok(Self {
            http: Client::builder().timeout(config.request_timeout).build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            probe_timeout: config.probe_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turns a non-2xx response into an `Api` error, preferring the backend's
/// `detail` message over `fallback`.
async fn api_error(response: Response, fallback: &str) -> AutomationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<BackendErrorBody>(&body)
        .ok()
        .and_then(|e| e.detail)
        .and_then(|d| d.as_str().map(str::to_string))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    AutomationError::Api { status, message }
}

/// The four client seams the orchestrator depends on.
#[derive(Clone)]
pub struct AutomationBackends {
    pub probe: Arc<dyn AvailabilityProbe>,
    pub resumes: Arc<dyn ResumeAnalyzer>,
    pub search: Arc<dyn JobSearcher>,
    pub submitter: Arc<dyn ApplicationSubmitter>,
}

impl AutomationBackends {
    /// All four seams served by one HTTP client.
    pub fn from_client(client: AutomationClient) -> Self {
        let client = Arc::new(client);
        Self {
            probe: client.clone(),
            resumes: client.clone(),
            search: client.clone(),
            submitter: client,
        }
    }
}
