use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a tracked job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Interview,
    Offer,
    Rejected,
    Accepted,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Screening => "screening",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(ApplicationStatus::Applied),
            "screening" => Ok(ApplicationStatus::Screening),
            "interview" => Ok(ApplicationStatus::Interview),
            "offer" => Ok(ApplicationStatus::Offer),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

/// A persisted row of the `job_applications` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub position: String,
    pub status: String,
    pub application_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub job_description: Option<String>,
    pub notes: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
    pub correspondence_urls: Vec<String>,
    /// Posting URL for automated submissions; the idempotency key per user.
    pub job_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new record, either entered manually or synthesized from a
/// successful automated submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub company_name: String,
    pub position: String,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter_url: Option<String>,
    #[serde(default)]
    pub correspondence_urls: Vec<String>,
    #[serde(default)]
    pub job_url: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationUpdate {
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub application_date: Option<DateTime<Utc>>,
    pub job_description: Option<String>,
    pub notes: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
}

/// Narrows a user's record list. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<ApplicationStatus>,
    /// Case-insensitive substring of company, position or notes.
    pub search: Option<String>,
}

impl RecordFilter {
    /// Trimmed, non-empty search term.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status.as_str() {
                return false;
            }
        }
        match self.search_term() {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                record.company_name.to_lowercase().contains(&term)
                    || record.position.to_lowercase().contains(&term)
                    || record
                        .notes
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&term))
            }
        }
    }
}

/// Dashboard counters. Offers include accepted ones; pending means applied or screening.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct ApplicationStats {
    pub total: i64,
    pub interviews: i64,
    pub offers: i64,
    pub pending: i64,
}

impl ApplicationStats {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a ApplicationRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            match record.status.parse::<ApplicationStatus>() {
                Ok(ApplicationStatus::Interview) => stats.interviews += 1,
                Ok(ApplicationStatus::Offer | ApplicationStatus::Accepted) => stats.offers += 1,
                Ok(ApplicationStatus::Applied | ApplicationStatus::Screening) => {
                    stats.pending += 1
                }
                _ => {}
            }
        }
        stats
    }
}
