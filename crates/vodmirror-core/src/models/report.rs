//! Request and report shapes at the orchestration boundary.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::DEFAULT_WORKER_COUNT;

/// Final classification of one mirror pass.
///
/// `TimedOut` is not an error: it tells the external driver to invoke again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Complete,
    Incomplete,
    TimedOut,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStatus::Complete => write!(f, "COMPLETE"),
            CompletionStatus::Incomplete => write!(f, "INCOMPLETE"),
            CompletionStatus::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// Per-worker transfer tally, merged into the final report.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TransferOutcome {
    pub downloaded_count: usize,
    pub skipped_count: usize,
    pub skipped_urls: Vec<String>,
}

impl TransferOutcome {
    pub fn record_download(&mut self) {
        self.downloaded_count += 1;
    }

    pub fn record_skip(&mut self, url: String) {
        self.skipped_count += 1;
        self.skipped_urls.push(url);
    }

    pub fn merge(&mut self, other: TransferOutcome) {
        self.downloaded_count += other.downloaded_count;
        self.skipped_count += other.skipped_count;
        self.skipped_urls.extend(other.skipped_urls);
    }
}

/// Input of the single entry operation.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    /// Origin URL of the master manifest (`.m3u8` or `.mpd`).
    pub source_manifest_url: String,
    /// Prefix inside the destination store the asset is mirrored under.
    pub destination_path: String,
    /// Optional CDN auth headers sent with every origin request.
    pub auth_headers: Option<HashMap<String, String>>,
    /// Opaque packaging-configuration label passed through to the report.
    pub packaging_config: Option<String>,
    pub worker_count: usize,
    /// Origin admission limit in requests per second. 0 = unlimited.
    pub origin_rate_limit: f64,
    /// Wall-clock allowance granted by the execution host. `None` = unbounded.
    pub time_budget: Option<Duration>,
}

impl MirrorRequest {
    pub fn new(source_manifest_url: impl Into<String>, destination_path: impl Into<String>) -> Self {
        Self {
            source_manifest_url: source_manifest_url.into(),
            destination_path: destination_path.into(),
            auth_headers: None,
            packaging_config: None,
            worker_count: DEFAULT_WORKER_COUNT,
            origin_rate_limit: 0.0,
            time_budget: None,
        }
    }
}

/// Structured output of the entry operation; the external driver's only input
/// signal.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorReport {
    pub status: CompletionStatus,
    pub downloaded_count: usize,
    pub skipped_count: usize,
    pub skipped_urls: Vec<String>,
    pub destination_object_count: usize,
    pub total_resource_count: usize,
    pub progress_percentage: f64,
    /// Destination URI of the mirrored master manifest.
    pub manifest_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_config: Option<String>,
}
