use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::kernel::jobs::{BackoffPolicy, JobRunnerConfig};
use crate::kernel::GenerationParams;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub ai_model: String,
    pub generation: GenerationParams,
    pub task_max_retries: i32,
    pub backoff: BackoffPolicy,
    pub soft_time_limit: Duration,
    pub worker_poll_interval: Duration,
    pub worker_batch_size: i64,
    pub run_worker: bool,
    /// Upper bound for `?wait=true` requests
    pub sync_wait_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_or("PORT", 8080)?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| openai_client::DEFAULT_BASE_URL.to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            generation: GenerationParams {
                temperature: parse_or("AI_TEMPERATURE", 0.7)?,
                top_p: parse_or("AI_TOP_P", 1.0)?,
                max_tokens: parse_or("AI_MAX_TOKENS", 1500)?,
                streaming: parse_or("AI_STREAMING", false)?,
            },
            task_max_retries: parse_or("TASK_MAX_RETRIES", 3)?,
            backoff: BackoffPolicy {
                base: Duration::from_millis(parse_or("TASK_BACKOFF_BASE_MS", 1000)?),
                max: Duration::from_millis(parse_or("TASK_BACKOFF_MAX_MS", 60_000)?),
            },
            soft_time_limit: Duration::from_secs(parse_or("TASK_SOFT_TIME_LIMIT_SECS", 120)?),
            worker_poll_interval: Duration::from_millis(parse_or("WORKER_POLL_INTERVAL_MS", 1000)?),
            worker_batch_size: parse_or("WORKER_BATCH_SIZE", 4)?,
            run_worker: parse_or("RUN_WORKER", true)?,
            sync_wait_timeout: Duration::from_secs(parse_or("SYNC_WAIT_TIMEOUT_SECS", 60)?),
        })
    }

    /// Runner settings derived from the worker variables.
    pub fn job_runner_config(&self) -> JobRunnerConfig {
        JobRunnerConfig {
            batch_size: self.worker_batch_size,
            poll_interval: self.worker_poll_interval,
            soft_time_limit: self.soft_time_limit,
            ..Default::default()
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value", key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("SIDEQUEST_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("SIDEQUEST_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16> = parse_or("SIDEQUEST_TEST_BAD_PORT", 8080);
        assert!(result.is_err());
        env::remove_var("SIDEQUEST_TEST_BAD_PORT");
    }

    #[test]
    fn test_parse_or_reads_bool() {
        env::set_var("SIDEQUEST_TEST_STREAMING", "true");
        let value: bool = parse_or("SIDEQUEST_TEST_STREAMING", false).unwrap();
        assert!(value);
        env::remove_var("SIDEQUEST_TEST_STREAMING");
    }
}
