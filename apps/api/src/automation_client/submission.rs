use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{api_error, AutomationClient, AutomationError};
use crate::models::automation::{JobPosting, SubmissionOutcome};

/// The only backend status counted as a successful submission. Anything else,
/// including "already applied", is a failure.
pub const APPLICATION_STARTED: &str = "application_started";

#[async_trait]
pub trait ApplicationSubmitter: Send + Sync {
    async fn submit(&self, job_url: &str) -> Result<ApplyReceipt, AutomationError>;
}

/// Body of a 2xx answer from `/apply-to-job`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub job_url: String,
    pub note: Option<String>,
}

impl ApplyReceipt {
    pub fn is_started(&self) -> bool {
        self.status == APPLICATION_STARTED
    }
}

#[async_trait]
impl ApplicationSubmitter for AutomationClient {
    async fn submit(&self, job_url: &str) -> Result<ApplyReceipt, AutomationError> {
        let response = self
            .http
            .post(self.url("/apply-to-job"))
            .form(&[("job_url", job_url)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "Failed to apply to job").await);
        }

        Ok(response.json().await?)
    }
}

/// Submits one posting and folds every failure mode into the outcome, so a
/// batch can always move on to the next posting.
pub async fn apply(submitter: &dyn ApplicationSubmitter, posting: &JobPosting) -> SubmissionOutcome {
    match submitter.submit(&posting.apply_url).await {
        Ok(receipt) if receipt.is_started() => {
            debug!("Backend started application for {}", receipt.job_url);
            SubmissionOutcome {
                posting: posting.clone(),
                succeeded: true,
                message: receipt.message,
                derived_record: None,
            }
        }
        Ok(receipt) => {
            warn!(
                "Application to {} at {} ({}) not started: status={}",
                posting.title, posting.company, receipt.job_url, receipt.status
            );
            let message = match receipt.note {
                Some(note) if !note.is_empty() => format!("{} ({note})", receipt.message),
                _ => receipt.message,
            };
            SubmissionOutcome {
                posting: posting.clone(),
                succeeded: false,
                message: format!("status '{}': {message}", receipt.status),
                derived_record: None,
            }
        }
        Err(e) => {
            warn!(
                "Failed to apply to {} at {}: {e}",
                posting.title, posting.company
            );
            SubmissionOutcome {
                posting: posting.clone(),
                succeeded: false,
                message: e.to_string(),
                derived_record: None,
            }
        }
    }
}
