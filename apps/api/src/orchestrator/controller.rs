//! OrchestrationController: owns one automation workflow.
//!
//! Flow: probe → (stored profile | resume analysis) → start search → list jobs
//!       → user selection → sequential paced submission → record persistence.
//!
//! Every state change is published as an `AutomationSnapshot` on a watch
//! channel. Presentation layers never see the controller's fields directly.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::automation_client::submission;
use crate::automation_client::AutomationBackends;
use crate::models::application::{ApplicationStatus, NewApplication};
use crate::models::automation::{
    JobPosting, PersistenceReport, ResumeProfile, SubmissionBatch,
};
use crate::orchestrator::pacing::Pacer;
use crate::orchestrator::selection::SelectionSet;
use crate::orchestrator::stage::{AutomationStage, Stage};
use crate::records::RecordStore;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("Automation backend is not available; use manual entry")]
    Unavailable,

    #[error("Resume analysis failed: {0}")]
    UploadRejected(String),

    #[error("Job search failed: {0}")]
    SearchFailed(String),

    #[error("Application to {apply_url} failed: {message}")]
    SubmissionFailed { apply_url: String, message: String },

    #[error("Saving applied jobs failed: {0}")]
    PersistenceFailed(String),

    #[error("Cannot {intent} while {stage}")]
    InvalidTransition {
        stage: AutomationStage,
        intent: &'static str,
    },

    #[error("Please select at least one job to apply to")]
    EmptySelection,

    #[error("Posting {0} is not in the current job list")]
    UnknownPosting(String),

    #[error("Automation session is closed")]
    SessionClosed,
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot types
// ────────────────────────────────────────────────────────────────────────────

/// Result of the liveness probe. `ManualOnly` means automation intents are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Unknown,
    Available,
    ManualOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyProgress {
    pub processed: usize,
    pub total: usize,
    /// "Title at Company" of the posting being submitted.
    pub current: Option<String>,
}

/// Read-only view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationSnapshot {
    pub stage: AutomationStage,
    pub availability: Availability,
    pub profile: Option<ResumeProfile>,
    pub postings: Vec<JobPosting>,
    pub selected: Vec<String>,
    pub progress: Option<ApplyProgress>,
    /// Partial while applying, final once completed.
    pub batch: Option<SubmissionBatch>,
    pub message: Option<String>,
    pub error: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Dependencies
// ────────────────────────────────────────────────────────────────────────────

/// Collaborators shared by every session. Carried in `AppState`.
#[derive(Clone)]
pub struct AutomationDeps {
    pub backends: AutomationBackends,
    pub records: Arc<dyn RecordStore>,
    pub pacer: Arc<dyn Pacer>,
    pub max_jobs: u32,
}

/// Per-session facts supplied when the workflow is opened.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct OrchestrationController {
    deps: AutomationDeps,
    session: SessionContext,
    availability: Availability,
    stage: Stage,
    message: Option<String>,
    error: Option<String>,
    snapshots: watch::Sender<AutomationSnapshot>,
}

fn invalid(stage: AutomationStage, intent: &'static str) -> OrchestratorError {
    OrchestratorError::InvalidTransition { stage, intent }
}

impl OrchestrationController {
    pub fn new(deps: AutomationDeps, session: SessionContext) -> Self {
        let (snapshots, _) = watch::channel(AutomationSnapshot {
            stage: AutomationStage::Idle,
            availability: Availability::Unknown,
            profile: None,
            postings: Vec::new(),
            selected: Vec::new(),
            progress: None,
            batch: None,
            message: None,
            error: None,
        });
        Self {
            deps,
            session,
            availability: Availability::Unknown,
            stage: Stage::Idle,
            message: None,
            error: None,
            snapshots,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AutomationSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn stage(&self) -> AutomationStage {
        self.stage.kind()
    }

    pub fn snapshot(&self) -> AutomationSnapshot {
        let (selected, progress, batch) = match &self.stage {
            Stage::JobsReady {
                postings,
                selection,
                ..
            } => (selection.ordered_urls(postings), None, None),
            Stage::Applying { queue, batch, .. } => {
                let processed = batch.outcomes.len();
                let progress = ApplyProgress {
                    processed,
                    total: queue.len(),
                    current: queue
                        .get(processed)
                        .map(|p| format!("{} at {}", p.title, p.company)),
                };
                (
                    queue.iter().map(|p| p.apply_url.clone()).collect(),
                    Some(progress),
                    Some(batch.clone()),
                )
            }
            Stage::Completed { batch, .. } => (
                batch
                    .outcomes
                    .iter()
                    .map(|o| o.posting.apply_url.clone())
                    .collect(),
                None,
                Some(batch.clone()),
            ),
            _ => (Vec::new(), None, None),
        };

        AutomationSnapshot {
            stage: self.stage.kind(),
            availability: self.availability,
            profile: self.stage.profile().cloned(),
            postings: self.stage.postings().to_vec(),
            selected,
            progress,
            batch,
            message: self.message.clone(),
            error: self.error.clone(),
        }
    }

    fn publish(&self) -> AutomationSnapshot {
        let snapshot = self.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    /// Surfaces `err` on the published snapshot and hands it back to the caller.
    fn reject(&mut self, err: OrchestratorError) -> OrchestratorError {
        self.error = Some(err.to_string());
        self.publish();
        err
    }

    fn settle(
        &mut self,
        outcome: Result<(), OrchestratorError>,
    ) -> Result<AutomationSnapshot, OrchestratorError> {
        match outcome {
            Ok(()) => {
                self.error = None;
                Ok(self.publish())
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    fn ensure_available(&mut self) -> Result<(), OrchestratorError> {
        if self.availability == Availability::Available {
            Ok(())
        } else {
            Err(self.reject(OrchestratorError::Unavailable))
        }
    }

    fn expect_stage(
        &mut self,
        expected: AutomationStage,
        intent: &'static str,
    ) -> Result<(), OrchestratorError> {
        let current = self.stage.kind();
        if current == expected {
            Ok(())
        } else {
            Err(self.reject(invalid(current, intent)))
        }
    }

    // ── Idle ────────────────────────────────────────────────────────────────

    /// Probes the backend. When reachable, resumes from a previously stored
    /// analysis if the backend has one; otherwise the session stays `Idle`
    /// (automation) or is limited to manual entry (unreachable).
    pub async fn initialize(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        self.expect_stage(AutomationStage::Idle, "check the automation backend")?;
        self.error = None;

        if !self.deps.backends.probe.check_availability().await {
            info!(
                "Automation unavailable for user {}; manual entry only",
                self.session.user_id
            );
            self.availability = Availability::ManualOnly;
            self.message = Some(
                "Automation backend is not available. You can still add applications manually."
                    .to_string(),
            );
            return Ok(self.publish());
        }

        self.availability = Availability::Available;
        match self.deps.backends.resumes.stored_profile().await {
            Some(profile) => {
                info!(
                    "Loaded stored resume profile for user {}: {} / {}",
                    self.session.user_id, profile.job_profile, profile.experience_level
                );
                self.message = Some(format!(
                    "Using your analyzed resume: {}, {}",
                    profile.job_profile, profile.experience_level
                ));
                self.stage = Stage::ProfileReady { profile };
            }
            None => {
                self.message = Some("Upload your resume to start.".to_string());
            }
        }
        Ok(self.publish())
    }

    pub async fn submit_resume(
        &mut self,
        filename: String,
        resume: Bytes,
    ) -> Result<AutomationSnapshot, OrchestratorError> {
        self.ensure_available()?;
        self.expect_stage(AutomationStage::Idle, "analyze a resume")?;

        self.error = None;
        self.message = Some(format!("Analyzing {filename}..."));
        self.stage = Stage::AnalyzingResume;
        self.publish();

        match self.deps.backends.resumes.analyze(resume, &filename).await {
            Ok(profile) => {
                self.message = Some(format!(
                    "Resume analyzed! Detected profile: {}, Experience: {}",
                    profile.job_profile, profile.experience_level
                ));
                self.stage = Stage::ProfileReady { profile };
                Ok(self.publish())
            }
            Err(e) => {
                self.stage = Stage::Idle;
                self.message = None;
                Err(self.reject(OrchestratorError::UploadRejected(e.to_string())))
            }
        }
    }

    // ── ProfileReady ────────────────────────────────────────────────────────

    /// Starts the backend search and fetches the postings. Zero results still
    /// reach `JobsReady`; any failure returns to `ProfileReady`.
    pub async fn search(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        self.ensure_available()?;
        let profile = match &self.stage {
            Stage::ProfileReady { profile } => profile.clone(),
            other => {
                let current = other.kind();
                return Err(self.reject(invalid(current, "search for jobs")));
            }
        };

        self.error = None;
        self.message = Some("Starting automated job search...".to_string());
        self.stage = Stage::Searching {
            profile: profile.clone(),
        };
        self.publish();

        match self.fetch_postings(&profile).await {
            Ok(postings) => {
                info!(
                    "Search for '{}' ({}) returned {} postings",
                    profile.job_profile,
                    profile.experience_level,
                    postings.len()
                );
                self.message = Some(format!("Found {} job opportunities", postings.len()));
                self.stage = Stage::JobsReady {
                    profile,
                    postings,
                    selection: SelectionSet::default(),
                };
                Ok(self.publish())
            }
            Err(e) => {
                self.stage = Stage::ProfileReady { profile };
                self.message = None;
                Err(self.reject(e))
            }
        }
    }

    async fn fetch_postings(
        &self,
        profile: &ResumeProfile,
    ) -> Result<Vec<JobPosting>, OrchestratorError> {
        let search = &self.deps.backends.search;

        let ack = search
            .start_search(profile)
            .await
            .map_err(|e| OrchestratorError::SearchFailed(e.to_string()))?;
        if !ack.success {
            let reason = if ack.message.is_empty() {
                "the automation backend reported an error".to_string()
            } else {
                ack.message
            };
            return Err(OrchestratorError::SearchFailed(reason));
        }
        debug!("Search started: {}", ack.message);

        search
            .list_jobs(profile, self.deps.max_jobs)
            .await
            .map_err(|e| OrchestratorError::SearchFailed(e.to_string()))
    }

    // ── JobsReady ───────────────────────────────────────────────────────────

    pub fn toggle_selection(
        &mut self,
        apply_url: &str,
    ) -> Result<AutomationSnapshot, OrchestratorError> {
        let outcome = match &mut self.stage {
            Stage::JobsReady {
                postings,
                selection,
                ..
            } => {
                if postings.iter().any(|p| p.apply_url == apply_url) {
                    selection.toggle(apply_url);
                    Ok(())
                } else {
                    Err(OrchestratorError::UnknownPosting(apply_url.to_string()))
                }
            }
            other => Err(invalid(other.kind(), "change the selection")),
        };
        self.settle(outcome)
    }

    pub fn select_all(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        let outcome = match &mut self.stage {
            Stage::JobsReady {
                postings,
                selection,
                ..
            } => {
                selection.select_all(postings);
                Ok(())
            }
            other => Err(invalid(other.kind(), "change the selection")),
        };
        self.settle(outcome)
    }

    pub fn clear_selection(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        let outcome = match &mut self.stage {
            Stage::JobsReady { selection, .. } => {
                selection.clear();
                Ok(())
            }
            other => Err(invalid(other.kind(), "change the selection")),
        };
        self.settle(outcome)
    }

    /// Freezes the selection and enters `Applying`. An empty selection is a
    /// validation error and leaves the session in `JobsReady`.
    pub fn begin_apply(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        match std::mem::replace(&mut self.stage, Stage::Idle) {
            Stage::JobsReady {
                profile,
                postings,
                selection,
            } => {
                if selection.is_empty() {
                    self.stage = Stage::JobsReady {
                        profile,
                        postings,
                        selection,
                    };
                    return Err(self.reject(OrchestratorError::EmptySelection));
                }

                let queue = selection.freeze(&postings);
                info!(
                    "Applying to {} of {} postings for user {}",
                    queue.len(),
                    postings.len(),
                    self.session.user_id
                );
                self.error = None;
                self.message = Some(format!("Applying to {} selected jobs...", selection.len()));
                self.stage = Stage::Applying {
                    profile,
                    postings,
                    queue,
                    batch: SubmissionBatch::new(),
                };
                Ok(self.publish())
            }
            other => {
                let current = other.kind();
                self.stage = other;
                Err(self.reject(invalid(current, "start applying")))
            }
        }
    }

    // ── Applying ────────────────────────────────────────────────────────────

    /// Submits every frozen posting in order, pausing between submissions.
    /// Individual failures are recorded and never stop the batch. Successful
    /// submissions are persisted in one call at the end; a persistence failure
    /// is reported on the batch, not retried.
    pub async fn run_apply(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        let queue = match &self.stage {
            Stage::Applying { queue, .. } => queue.clone(),
            other => {
                let current = other.kind();
                return Err(self.reject(invalid(current, "run the application batch")));
            }
        };

        for (index, posting) in queue.iter().enumerate() {
            if index > 0 {
                self.deps.pacer.pause().await;
            }

            self.message = Some(format!(
                "Applying to {} at {}...",
                posting.title, posting.company
            ));
            self.publish();

            let mut outcome =
                submission::apply(self.deps.backends.submitter.as_ref(), posting).await;
            if outcome.succeeded {
                outcome.derived_record = Some(self.derive_record(posting, &outcome.message));
            } else {
                outcome.message = OrchestratorError::SubmissionFailed {
                    apply_url: posting.apply_url.clone(),
                    message: std::mem::take(&mut outcome.message),
                }
                .to_string();
            }

            if let Stage::Applying { batch, .. } = &mut self.stage {
                batch.record(outcome);
            }
        }

        let (profile, postings, mut batch) = match std::mem::replace(&mut self.stage, Stage::Idle)
        {
            Stage::Applying {
                profile,
                postings,
                batch,
                ..
            } => (profile, postings, batch),
            other => {
                let current = other.kind();
                self.stage = other;
                return Err(self.reject(invalid(current, "finish the application batch")));
            }
        };

        batch.persistence = self.persist(&batch).await;
        info!(
            "Batch for user {} finished: {} succeeded, {} failed",
            self.session.user_id, batch.success_count, batch.failure_count
        );

        self.message = Some(batch.summary());
        self.stage = Stage::Completed {
            profile,
            postings,
            batch,
        };
        Ok(self.publish())
    }

    async fn persist(&mut self, batch: &SubmissionBatch) -> PersistenceReport {
        let records = batch.derived_records();
        if records.is_empty() {
            return PersistenceReport::NothingToSave;
        }

        match self
            .deps
            .records
            .add_records(self.session.user_id, &records)
            .await
        {
            Ok(record_ids) => PersistenceReport::Saved { record_ids },
            Err(e) => {
                let err = OrchestratorError::PersistenceFailed(e.to_string());
                error!("{err} (user {})", self.session.user_id);
                self.error = Some(err.to_string());
                PersistenceReport::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    fn derive_record(&self, posting: &JobPosting, message: &str) -> NewApplication {
        NewApplication {
            company_name: posting.company.clone(),
            position: posting.title.clone(),
            status: ApplicationStatus::Applied,
            application_date: Utc::now(),
            job_description: posting.description.clone(),
            notes: Some(format!("Applied via automation: {message}")),
            resume_url: self.session.resume_url.clone(),
            cover_letter_url: self.session.cover_letter_url.clone(),
            correspondence_urls: Vec::new(),
            job_url: Some(posting.apply_url.clone()),
        }
    }

    // ── Cancellation ────────────────────────────────────────────────────────

    /// Abandons the workflow from `ProfileReady` or `JobsReady`. Nothing has
    /// been submitted at those points, so nothing needs undoing.
    pub fn cancel(&mut self) -> Result<AutomationSnapshot, OrchestratorError> {
        match self.stage.kind() {
            AutomationStage::ProfileReady | AutomationStage::JobsReady => {
                self.stage = Stage::Idle;
                self.error = None;
                self.message = Some("Automation cancelled.".to_string());
                Ok(self.publish())
            }
            current => Err(self.reject(invalid(current, "cancel"))),
        }
    }
}
