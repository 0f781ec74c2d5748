use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_AUTOMATION_BASE_URL: &str = "http://localhost:8000";

/// Application configuration loaded from environment variables.
/// Fails at startup if a numeric variable cannot be parsed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional: without it records are kept in memory for the process lifetime.
    pub database_url: Option<String>,
    pub automation: AutomationConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Everything the automation clients and the orchestrator need from the environment.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub base_url: String,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    /// Pause inserted between two consecutive job submissions.
    pub apply_delay: Duration,
    pub max_jobs: u32,
    /// A session that receives no request for this long is closed and forgotten.
    pub session_idle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("AUTOMATION_BASE_URL")
            .unwrap_or_else(|| DEFAULT_AUTOMATION_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            automation: AutomationConfig {
                base_url,
                probe_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "AUTOMATION_PROBE_TIMEOUT_MS",
                    5000,
                )?),
                request_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "AUTOMATION_REQUEST_TIMEOUT_SECS",
                    120,
                )?),
                apply_delay: Duration::from_millis(parse_or(&lookup, "APPLY_DELAY_MS", 2000)?),
                max_jobs: parse_or(&lookup, "MAX_JOBS", 10)?,
                session_idle_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "SESSION_IDLE_TIMEOUT_SECS",
                    900,
                )?),
            },
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
