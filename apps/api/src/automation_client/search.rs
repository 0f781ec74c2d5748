use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{api_error, AutomationClient, AutomationError};
use crate::models::automation::{JobPosting, ResumeProfile, SearchAck};

#[async_trait]
pub trait JobSearcher: Send + Sync {
    /// Triggers the backend's search step. Transport failures and non-2xx are
    /// errors; an `error` field in a 2xx body is `success: false`.
    async fn start_search(&self, profile: &ResumeProfile) -> Result<SearchAck, AutomationError>;

    /// At most `max_jobs` postings, in the order the backend ranked them.
    async fn list_jobs(
        &self,
        profile: &ResumeProfile,
        max_jobs: u32,
    ) -> Result<Vec<JobPosting>, AutomationError>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    job_profile: &'a str,
    experience: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartSearchResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ListJobsResponse {
    #[serde(default)]
    jobs: Vec<WireJob>,
}

#[derive(Debug, Deserialize)]
struct WireJob {
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    job_url: String,
    description: Option<String>,
}

impl From<WireJob> for JobPosting {
    fn from(job: WireJob) -> Self {
        JobPosting {
            title: job.title,
            company: job.company,
            location: job.location,
            apply_url: job.job_url,
            description: job.description,
        }
    }
}

/// Mirrors a truthiness check: `null`, `false` and `""` mean no error.
fn signals_error(error: Option<&Value>) -> bool {
    match error {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[async_trait]
impl JobSearcher for AutomationClient {
    async fn start_search(&self, profile: &ResumeProfile) -> Result<SearchAck, AutomationError> {
        let response = self
            .http
            .post(self.url("/apply-job"))
            .json(&SearchRequest {
                job_profile: &profile.job_profile,
                experience: &profile.experience_level,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "Failed to start job search").await);
        }

        let body: StartSearchResponse = response.json().await?;
        Ok(SearchAck {
            success: !signals_error(body.error.as_ref()),
            message: body.message,
        })
    }

    async fn list_jobs(
        &self,
        profile: &ResumeProfile,
        max_jobs: u32,
    ) -> Result<Vec<JobPosting>, AutomationError> {
        let max = max_jobs.to_string();
        let response = self
            .http
            .get(self.url("/get-jobs"))
            .query(&[
                ("job_profile", profile.job_profile.as_str()),
                ("experience", profile.experience_level.as_str()),
                ("max_jobs", max.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "Failed to get job listings").await);
        }

        let body: ListJobsResponse = response.json().await?;
        let mut jobs: Vec<JobPosting> = body.jobs.into_iter().map(JobPosting::from).collect();
        jobs.truncate(max_jobs as usize);

        debug!("Backend returned {} postings (max {max_jobs})", jobs.len());
        Ok(jobs)
    }
}
