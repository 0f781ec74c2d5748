use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};

use super::{api_error, AutomationClient, AutomationError};
use crate::models::automation::ResumeProfile;

#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    /// Uploads a resume for analysis. A non-2xx answer is an `Api` error
    /// carrying the backend's `detail` when it sent one.
    async fn analyze(&self, resume: Bytes, filename: &str)
        -> Result<ResumeProfile, AutomationError>;

    /// The analysis kept by the backend from an earlier upload, if any.
    /// Failures are logged and reported as `None`.
    async fn stored_profile(&self) -> Option<ResumeProfile>;
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    job_profile: String,
    experience: String,
}

#[derive(Debug, Deserialize)]
struct ResumeStatusResponse {
    #[serde(default)]
    resume_uploaded: bool,
    job_profile: Option<String>,
    experience: Option<String>,
}

#[async_trait]
impl ResumeAnalyzer for AutomationClient {
    async fn analyze(
        &self,
        resume: Bytes,
        filename: &str,
    ) -> Result<ResumeProfile, AutomationError> {
        let part = Part::bytes(resume.to_vec()).file_name(filename.to_string());
        let form = Form::new().part("resume", part);

        let response = self
            .http
            .post(self.url("/upload-resume"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "Failed to upload resume").await);
        }

        let body: AnalyzeResponse = response.json().await?;
        info!(
            "Resume '{filename}' analyzed: profile={}, experience={}",
            body.job_profile, body.experience
        );

        Ok(ResumeProfile {
            job_profile: body.job_profile,
            experience_level: body.experience,
            stored: true,
        })
    }

    async fn stored_profile(&self) -> Option<ResumeProfile> {
        let response = match self.http.get(self.url("/resume-status")).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Error checking resume status: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Resume status lookup returned {}", response.status());
            return None;
        }

        let status: ResumeStatusResponse = match response.json().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Unreadable resume status response: {e}");
                return None;
            }
        };

        if !status.resume_uploaded {
            return None;
        }

        match (status.job_profile, status.experience) {
            (Some(job_profile), Some(experience_level)) => Some(ResumeProfile {
                job_profile,
                experience_level,
                stored: true,
            }),
            _ => {
                warn!("Backend reports a stored resume without a profile; ignoring it");
                None
            }
        }
    }
}
