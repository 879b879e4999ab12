//! The transfer pass: single admission producer, fixed worker pool.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use vodmirror_core::models::{TransferOutcome, VodAsset};
use vodmirror_core::{urls, MirrorError};
use vodmirror_manifest::RetryingFetcher;
use vodmirror_storage::{ObjectStore, StorageError};

use crate::budget::TimeBudget;
use crate::pacing::AdmissionPacer;

/// Content type stored for payloads whose origin response did not announce one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of one transfer pass, before completion classification.
#[derive(Debug)]
pub struct TransferSummary {
    pub outcome: TransferOutcome,
    /// Admission stopped early because the time budget ran low.
    pub stopped_on_budget: bool,
    /// Number of resources handed to the worker pool.
    pub admitted: usize,
}

pub struct TransferEngine {
    fetcher: Arc<RetryingFetcher>,
    store: Arc<dyn ObjectStore>,
    destination_path: String,
    queue_depth: usize,
}

impl TransferEngine {
    pub fn new(
        fetcher: Arc<RetryingFetcher>,
        store: Arc<dyn ObjectStore>,
        destination_path: String,
        queue_depth: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            destination_path,
            queue_depth,
        }
    }

    /// Run one pass: admit every missing resource in enumeration order and
    /// copy it to the destination.
    pub async fn run(
        &self,
        asset: &VodAsset,
        inventory: &HashSet<String>,
        worker_count: usize,
        pacer: &AdmissionPacer,
        budget: &TimeBudget,
    ) -> Result<TransferSummary, MirrorError> {
        let (tx, rx) = mpsc::channel::<String>(self.queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let fatal = CancellationToken::new();

        let mut workers: JoinSet<Result<TransferOutcome, StorageError>> = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(Self::worker(
                worker_id,
                Arc::clone(&rx),
                fatal.clone(),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.store),
                self.destination_path.clone(),
                asset.common_prefix.clone(),
            ));
        }
        // Workers own the receiver from here on; if all of them exit, sends
        // start failing instead of blocking on a full queue.
        drop(rx);
        info!(workers = worker_count, "Started transfer workers");

        let mut stopped_on_budget = false;
        let mut admitted = 0usize;
        for resource in &asset.all_resources {
            if budget.exhausted() {
                warn!(
                    admitted = admitted,
                    "Time budget safety threshold reached, stopping admission"
                );
                stopped_on_budget = true;
                break;
            }
            let key = urls::destination_key(resource, &asset.common_prefix);
            if inventory.contains(&key) {
                continue;
            }
            debug!(resource = %resource, "Admitting resource");
            let enqueued = tokio::select! {
                _ = fatal.cancelled() => false,
                sent = tx.send(resource.clone()) => sent.is_ok(),
            };
            if !enqueued {
                break;
            }
            admitted += 1;
            pacer.acquire().await;
        }
        // Closing the channel is the shutdown signal for the workers.
        drop(tx);

        let mut outcome = TransferOutcome::default();
        let mut storage_failure: Option<StorageError> = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(worker_outcome)) => outcome.merge(worker_outcome),
                Ok(Err(failure)) => storage_failure = Some(failure),
                Err(join_error) => {
                    return Err(MirrorError::Internal(format!(
                        "Transfer worker panicked: {}",
                        join_error
                    )));
                }
            }
        }

        if let Some(failure) = storage_failure {
            // Loss of write capability poisons the whole invocation; a partial
            // success report here would be false.
            return Err(MirrorError::Storage(failure.to_string()));
        }

        info!(
            downloaded = outcome.downloaded_count,
            skipped = outcome.skipped_count,
            admitted = admitted,
            "Transfer pass finished"
        );
        Ok(TransferSummary {
            outcome,
            stopped_on_budget,
            admitted,
        })
    }

    async fn worker(
        worker_id: usize,
        queue: Arc<Mutex<mpsc::Receiver<String>>>,
        fatal: CancellationToken,
        fetcher: Arc<RetryingFetcher>,
        store: Arc<dyn ObjectStore>,
        destination_path: String,
        common_prefix: String,
    ) -> Result<TransferOutcome, StorageError> {
        let mut outcome = TransferOutcome::default();
        loop {
            let next = {
                let mut rx = queue.lock().await;
                tokio::select! {
                    _ = fatal.cancelled() => None,
                    item = rx.recv() => item,
                }
            };
            let Some(url) = next else {
                break;
            };

            match fetcher.fetch(&url).await {
                Err(fetch_error) => {
                    // One bad segment must not halt the pass.
                    warn!(
                        worker = worker_id,
                        url = %url,
                        error = %fetch_error,
                        "Fetch failed after retries, skipping resource"
                    );
                    outcome.record_skip(url);
                }
                Ok((payload, content_type)) => {
                    let key = urls::object_key(
                        &destination_path,
                        &urls::destination_key(&url, &common_prefix),
                    );
                    let content_type = content_type.as_deref().unwrap_or(FALLBACK_CONTENT_TYPE);
                    match store.put(&key, payload, content_type).await {
                        Ok(()) => {
                            debug!(worker = worker_id, key = %key, "Stored resource");
                            outcome.record_download();
                        }
                        Err(storage_error) => {
                            error!(
                                worker = worker_id,
                                key = %key,
                                error = %storage_error,
                                "Destination write failed, halting invocation"
                            );
                            fatal.cancel();
                            return Err(storage_error);
                        }
                    }
                }
            }
        }
        Ok(outcome)
    }
}
