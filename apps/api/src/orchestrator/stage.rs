use std::fmt;

use serde::Serialize;

use crate::models::automation::{JobPosting, ResumeProfile, SubmissionBatch};
use crate::orchestrator::selection::SelectionSet;

/// The workflow step a session is in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStage {
    Idle,
    AnalyzingResume,
    ProfileReady,
    Searching,
    JobsReady,
    Applying,
    Completed,
}

impl AutomationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationStage::Idle => "idle",
            AutomationStage::AnalyzingResume => "analyzing_resume",
            AutomationStage::ProfileReady => "profile_ready",
            AutomationStage::Searching => "searching",
            AutomationStage::JobsReady => "jobs_ready",
            AutomationStage::Applying => "applying",
            AutomationStage::Completed => "completed",
        }
    }
}

impl fmt::Display for AutomationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller state. Each variant carries only the data that is valid in
/// that stage, so e.g. a selection cannot exist outside `JobsReady`.
#[derive(Debug, Clone)]
pub(crate) enum Stage {
    Idle,
    AnalyzingResume,
    ProfileReady {
        profile: ResumeProfile,
    },
    Searching {
        profile: ResumeProfile,
    },
    JobsReady {
        profile: ResumeProfile,
        postings: Vec<JobPosting>,
        selection: SelectionSet,
    },
    /// `queue` is the selection frozen when the batch started.
    Applying {
        profile: ResumeProfile,
        postings: Vec<JobPosting>,
        queue: Vec<JobPosting>,
        batch: SubmissionBatch,
    },
    Completed {
        profile: ResumeProfile,
        postings: Vec<JobPosting>,
        batch: SubmissionBatch,
    },
}

impl Stage {
    pub fn kind(&self) -> AutomationStage {
        match self {
            Stage::Idle => AutomationStage::Idle,
            Stage::AnalyzingResume => AutomationStage::AnalyzingResume,
            Stage::ProfileReady { .. } => AutomationStage::ProfileReady,
            Stage::Searching { .. } => AutomationStage::Searching,
            Stage::JobsReady { .. } => AutomationStage::JobsReady,
            Stage::Applying { .. } => AutomationStage::Applying,
            Stage::Completed { .. } => AutomationStage::Completed,
        }
    }

    pub fn profile(&self) -> Option<&ResumeProfile> {
        match self {
            Stage::Idle | Stage::AnalyzingResume => None,
            Stage::ProfileReady { profile }
            | Stage::Searching { profile }
            | Stage::JobsReady { profile, .. }
            | Stage::Applying { profile, .. }
            | Stage::Completed { profile, .. } => Some(profile),
        }
    }

    pub fn postings(&self) -> &[JobPosting] {
        match self {
            Stage::JobsReady { postings, .. }
            | Stage::Applying { postings, .. }
            | Stage::Completed { postings, .. } => postings,
            _ => &[],
        }
    }
}
