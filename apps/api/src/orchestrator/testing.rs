//! Scripted stand-ins for the automation backend, the record store and the
//! pacer. Shared by the orchestrator and route tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::automation_client::submission::{ApplyReceipt, APPLICATION_STARTED};
use crate::automation_client::{
    ApplicationSubmitter, AutomationBackends, AutomationError, AvailabilityProbe, JobSearcher,
    ResumeAnalyzer,
};
use crate::models::application::{
    ApplicationRecord, ApplicationUpdate, NewApplication, RecordFilter,
};
use crate::models::automation::{JobPosting, ResumeProfile, SearchAck};
use crate::orchestrator::{AutomationDeps, Pacer};
use crate::records::{RecordStore, RecordStoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Probe,
    StoredProfile,
    Analyze(String),
    StartSearch(String, String),
    ListJobs(String, String, u32),
    Submit(String),
}

/// How the fake answers `/apply-to-job` for one URL.
#[derive(Debug, Clone)]
pub(crate) enum FakeApply {
    Started,
    Status(&'static str),
    Error(&'static str),
}

pub(crate) struct FakeBackend {
    available: bool,
    stored: Option<ResumeProfile>,
    analysis: Result<ResumeProfile, String>,
    search_ack: Result<SearchAck, String>,
    jobs: Result<Vec<JobPosting>, String>,
    apply: HashMap<String, FakeApply>,
    calls: Mutex<Vec<Call>>,
}

fn api_error(message: &str) -> AutomationError {
    AutomationError::Api {
        status: 500,
        message: message.to_string(),
    }
}

impl FakeBackend {
    pub fn available() -> Self {
        Self {
            available: true,
            stored: None,
            analysis: Ok(backend_profile()),
            search_ack: Ok(SearchAck {
                message: "Found jobs".to_string(),
                success: true,
            }),
            jobs: Ok(Vec::new()),
            apply: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    pub fn with_stored_profile(mut self, profile: ResumeProfile) -> Self {
        self.stored = Some(profile);
        self
    }

    pub fn with_analysis_error(mut self, message: &str) -> Self {
        self.analysis = Err(message.to_string());
        self
    }

    pub fn with_search_ack(mut self, ack: SearchAck) -> Self {
        self.search_ack = Ok(ack);
        self
    }

    pub fn with_search_error(mut self, message: &str) -> Self {
        self.search_ack = Err(message.to_string());
        self
    }

    pub fn with_jobs(mut self, jobs: Vec<JobPosting>) -> Self {
        self.jobs = Ok(jobs);
        self
    }

    pub fn with_list_error(mut self, message: &str) -> Self {
        self.jobs = Err(message.to_string());
        self
    }

    /// URLs without an entry answer `application_started`.
    pub fn with_apply(mut self, apply_url: &str, answer: FakeApply) -> Self {
        self.apply.insert(apply_url.to_string(), answer);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs passed to `submit`, in call order.
    pub fn submitted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Submit(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AvailabilityProbe for FakeBackend {
    async fn check_availability(&self) -> bool {
        self.log(Call::Probe);
        self.available
    }
}

#[async_trait]
impl ResumeAnalyzer for FakeBackend {
    async fn analyze(
        &self,
        _resume: Bytes,
        filename: &str,
    ) -> Result<ResumeProfile, AutomationError> {
        self.log(Call::Analyze(filename.to_string()));
        self.analysis.clone().map_err(|m| api_error(&m))
    }

    async fn stored_profile(&self) -> Option<ResumeProfile> {
        self.log(Call::StoredProfile);
        self.stored.clone()
    }
}

#[async_trait]
impl JobSearcher for FakeBackend {
    async fn start_search(&self, profile: &ResumeProfile) -> Result<SearchAck, AutomationError> {
        self.log(Call::StartSearch(
            profile.job_profile.clone(),
            profile.experience_level.clone(),
        ));
        self.search_ack.clone().map_err(|m| api_error(&m))
    }

    async fn list_jobs(
        &self,
        profile: &ResumeProfile,
        max_jobs: u32,
    ) -> Result<Vec<JobPosting>, AutomationError> {
        self.log(Call::ListJobs(
            profile.job_profile.clone(),
            profile.experience_level.clone(),
            max_jobs,
        ));
        self.jobs.clone().map_err(|m| api_error(&m))
    }
}

#[async_trait]
impl ApplicationSubmitter for FakeBackend {
    async fn submit(&self, job_url: &str) -> Result<ApplyReceipt, AutomationError> {
        self.log(Call::Submit(job_url.to_string()));
        let receipt = |status: &str| ApplyReceipt {
            message: format!("{status} for {job_url}"),
            status: status.to_string(),
            job_url: job_url.to_string(),
            note: None,
        };
        match self.apply.get(job_url) {
            None | Some(FakeApply::Started) => Ok(receipt(APPLICATION_STARTED)),
            Some(FakeApply::Status(status)) => Ok(receipt(status)),
            Some(FakeApply::Error(message)) => Err(api_error(message)),
        }
    }
}

pub(crate) fn backends(fake: &Arc<FakeBackend>) -> AutomationBackends {
    AutomationBackends {
        probe: fake.clone(),
        resumes: fake.clone(),
        search: fake.clone(),
        submitter: fake.clone(),
    }
}

/// Counts pauses instead of sleeping.
#[derive(Default)]
pub(crate) struct RecordingPacer {
    pauses: AtomicUsize,
}

impl RecordingPacer {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// A record store whose database is down.
pub(crate) struct OfflineRecordStore;

fn offline() -> RecordStoreError {
    RecordStoreError::Unavailable("database offline".to_string())
}

#[async_trait]
impl RecordStore for OfflineRecordStore {
    async fn add_records(
        &self,
        _user_id: Uuid,
        _records: &[NewApplication],
    ) -> Result<Vec<Uuid>, RecordStoreError> {
        Err(offline())
    }

    async fn find_records(
        &self,
        _user_id: Uuid,
        _filter: &RecordFilter,
    ) -> Result<Vec<ApplicationRecord>, RecordStoreError> {
        Err(offline())
    }

    async fn update_record(
        &self,
        _user_id: Uuid,
        _id: Uuid,
        _update: &ApplicationUpdate,
    ) -> Result<ApplicationRecord, RecordStoreError> {
        Err(offline())
    }

    async fn delete_record(&self, _user_id: Uuid, _id: Uuid) -> Result<(), RecordStoreError> {
        Err(offline())
    }
}

pub(crate) fn deps(
    fake: &Arc<FakeBackend>,
    records: Arc<dyn RecordStore>,
    pacer: Arc<dyn Pacer>,
) -> AutomationDeps {
    AutomationDeps {
        backends: backends(fake),
        records,
        pacer,
        max_jobs: 10,
    }
}

pub(crate) fn backend_profile() -> ResumeProfile {
    ResumeProfile {
        job_profile: "Backend Engineer".to_string(),
        experience_level: "Mid".to_string(),
        stored: true,
    }
}

pub(crate) fn posting(apply_url: &str, title: &str, company: &str) -> JobPosting {
    JobPosting {
        title: title.to_string(),
        company: company.to_string(),
        location: "Remote".to_string(),
        apply_url: apply_url.to_string(),
        description: Some(format!("{title} role at {company}")),
    }
}

/// Three postings A, B, C in that order.
pub(crate) fn three_postings() -> Vec<JobPosting> {
    vec![
        posting("https://jobs.example/a", "Backend Engineer", "Acme"),
        posting("https://jobs.example/b", "Platform Engineer", "Globex"),
        posting("https://jobs.example/c", "API Engineer", "Initech"),
    ]
}
