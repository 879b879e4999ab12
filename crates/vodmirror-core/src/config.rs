//! Configuration module
//!
//! Invocation-independent settings: transfer tuning knobs and storage backend
//! selection. Values load from the environment (with `.env` support) and may
//! be overridden by CLI flags before a run.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

pub const DEFAULT_WORKER_COUNT: usize = 5;
/// Upper bound on the worker pool regardless of what the caller asks for.
pub const MAX_WORKER_COUNT: usize = 20;
const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
const DEFAULT_FETCH_RETRY_PAUSE_SECS: u64 = 2;
/// Admission stops once less than this much of the time budget remains. Must
/// exceed the longest plausible single fetch+upload.
const DEFAULT_TIME_BUDGET_SAFETY_SECS: u64 = 120;
const DEFAULT_QUEUE_DEPTH: usize = 32;

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    /// Fetch attempts per resource before it is skipped.
    pub fetch_attempts: u32,
    /// Fixed pause between fetch attempts.
    pub fetch_retry_pause: Duration,
    /// Remaining-time threshold below which no further work is admitted.
    pub time_budget_safety_margin: Duration,
    /// Bound on the transfer work queue.
    pub queue_depth: usize,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            fetch_retry_pause: Duration::from_secs(DEFAULT_FETCH_RETRY_PAUSE_SECS),
            time_budget_safety_margin: Duration::from_secs(DEFAULT_TIME_BUDGET_SAFETY_SECS),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            storage_backend: StorageBackend::S3,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
        }
    }
}

impl MirrorConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            fetch_attempts: env_parse("VODMIRROR_FETCH_ATTEMPTS", DEFAULT_FETCH_ATTEMPTS),
            fetch_retry_pause: Duration::from_secs(env_parse(
                "VODMIRROR_FETCH_RETRY_PAUSE_SECS",
                DEFAULT_FETCH_RETRY_PAUSE_SECS,
            )),
            time_budget_safety_margin: Duration::from_secs(env_parse(
                "VODMIRROR_TIME_BUDGET_SAFETY_SECS",
                DEFAULT_TIME_BUDGET_SAFETY_SECS,
            )),
            queue_depth: env_parse("VODMIRROR_QUEUE_DEPTH", DEFAULT_QUEUE_DEPTH),
            storage_backend: env_parse("STORAGE_BACKEND", StorageBackend::S3),
            s3_bucket: env_string("S3_BUCKET"),
            s3_region: env_string("S3_REGION").or_else(|| env_string("AWS_REGION")),
            s3_endpoint: env_string("S3_ENDPOINT"),
            local_storage_path: env_string("LOCAL_STORAGE_PATH"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key = key, value = %raw, "Unparsable environment value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
