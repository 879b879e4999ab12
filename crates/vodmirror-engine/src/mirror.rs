//! Orchestration entry point.
//!
//! This is the boundary the external repeated-invocation driver consumes: it
//! re-invokes while the reported status is TIMED_OUT (or INCOMPLETE with retry
//! budget remaining) and stops on COMPLETE or an error. All fatal failures
//! come back as structured `MirrorError` values, never panics.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use vodmirror_core::config::MAX_WORKER_COUNT;
use vodmirror_core::models::{CompletionStatus, ManifestKind, MirrorReport, MirrorRequest};
use vodmirror_core::{urls, validation, MirrorConfig, MirrorError};
use vodmirror_manifest::{parse_dash_asset, parse_hls_asset, RetryingFetcher};
use vodmirror_storage::ObjectStore;

use crate::budget::TimeBudget;
use crate::pacing::AdmissionPacer;
use crate::transfer::TransferEngine;

/// Execute one mirror invocation end to end.
pub async fn mirror(
    request: &MirrorRequest,
    store: Arc<dyn ObjectStore>,
    config: &MirrorConfig,
) -> Result<MirrorReport, MirrorError> {
    validation::validate_request(request)?;
    store
        .verify()
        .await
        .map_err(|e| MirrorError::Validation(e.to_string()))?;

    let kind = ManifestKind::from_source_url(&request.source_manifest_url).ok_or_else(|| {
        MirrorError::UnsupportedFormat(format!(
            "Manifest '{}' is neither .m3u8 nor .mpd",
            request.source_manifest_url
        ))
    })?;
    info!(kind = %kind, url = %request.source_manifest_url, "Parsing source asset");

    // One HTTP client per invocation, passed explicitly; no pool state
    // survives host re-use.
    let client = reqwest::Client::new();
    let fetcher = Arc::new(
        RetryingFetcher::new(
            client,
            request.auth_headers.as_ref(),
            config.fetch_attempts,
            config.fetch_retry_pause,
        )
        .map_err(|e| MirrorError::Validation(e.to_string()))?,
    );

    let asset = match kind {
        ManifestKind::Hls => parse_hls_asset(&fetcher, &request.source_manifest_url).await?,
        ManifestKind::Dash => parse_dash_asset(&fetcher, &request.source_manifest_url).await?,
    };
    let total = asset.total_resources();

    let inventory: HashSet<String> = store
        .list_keys(&request.destination_path)
        .await
        .map_err(|e| MirrorError::Storage(e.to_string()))?
        .into_iter()
        .collect();
    info!(
        total_resources = total,
        already_present = inventory.len(),
        needed = total.saturating_sub(inventory.len()),
        "Destination inventory read"
    );

    let engine = TransferEngine::new(
        Arc::clone(&fetcher),
        Arc::clone(&store),
        request.destination_path.clone(),
        config.queue_depth,
    );
    let pacer = AdmissionPacer::new(request.origin_rate_limit);
    let budget = TimeBudget::new(request.time_budget, config.time_budget_safety_margin);
    let worker_count = request.worker_count.clamp(1, MAX_WORKER_COUNT);

    let summary = engine
        .run(&asset, &inventory, worker_count, &pacer, &budget)
        .await?;

    let destination_object_count = store
        .list_keys(&request.destination_path)
        .await
        .map_err(|e| MirrorError::Storage(e.to_string()))?
        .len();

    let status = if destination_object_count == total {
        CompletionStatus::Complete
    } else if summary.stopped_on_budget {
        CompletionStatus::TimedOut
    } else {
        CompletionStatus::Incomplete
    };
    let progress_percentage = if total == 0 {
        100.0
    } else {
        round2(destination_object_count as f64 / total as f64 * 100.0)
    };

    let manifest_key = urls::object_key(
        &request.destination_path,
        &urls::destination_key(&asset.source_manifest_url, &asset.common_prefix),
    );

    info!(
        status = %status,
        destination_objects = destination_object_count,
        total_resources = total,
        progress = progress_percentage,
        "Mirror invocation finished"
    );

    Ok(MirrorReport {
        status,
        downloaded_count: summary.outcome.downloaded_count,
        skipped_count: summary.outcome.skipped_count,
        skipped_urls: summary.outcome.skipped_urls,
        destination_object_count,
        total_resource_count: total,
        progress_percentage,
        manifest_location: store.destination_uri(&manifest_key),
        packaging_config: request.packaging_config.clone(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
