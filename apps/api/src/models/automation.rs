//! Shared result types passed between the automation clients, the
//! orchestrator and the presentation layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::application::NewApplication;

/// Profile derived from a resume by the automation backend.
/// Immutable once created; a new upload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub job_profile: String,
    pub experience_level: String,
    pub stored: bool,
}

/// A single job listing. `apply_url` is its identity: two postings with the
/// same URL are the same posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub apply_url: String,
    pub description: Option<String>,
}

/// Acknowledgement of the backend's search-preparation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchAck {
    pub message: String,
    pub success: bool,
}

/// Result of submitting one posting.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub posting: JobPosting,
    pub succeeded: bool,
    pub message: String,
    /// Present only for successful submissions.
    pub derived_record: Option<NewApplication>,
}

/// What happened when the batch's synthesized records were handed to the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PersistenceReport {
    Pending,
    NothingToSave,
    Saved { record_ids: Vec<Uuid> },
    Failed { message: String },
}

/// Aggregated outcomes of one bulk-apply run, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionBatch {
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<SubmissionOutcome>,
    pub persistence: PersistenceReport,
}

impl SubmissionBatch {
    pub fn new() -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            outcomes: Vec::new(),
            persistence: PersistenceReport::Pending,
        }
    }

    pub fn record(&mut self, outcome: SubmissionOutcome) {
        if outcome.succeeded {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.outcomes.push(outcome);
    }

    /// Records synthesized from the successful outcomes, in submission order.
    pub fn derived_records(&self) -> Vec<NewApplication> {
        self.outcomes
            .iter()
            .filter_map(|o| o.derived_record.clone())
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Application process completed! Successfully applied to {} jobs. {} applications failed.",
            self.success_count, self.failure_count
        )
    }
}

impl Default for SubmissionBatch {
    fn default() -> Self {
        Self::new()
    }
}
