//! Batch scheduler: group-parallel, group-sequential execution of a work list
//!
//! The work list is split into contiguous batches of at most `concurrency` items.
//! Every item of a batch runs as its own task; the scheduler waits for all of them to
//! reach a terminal outcome before pausing for `batch_delay` and admitting the next
//! batch. A failing item never cancels its siblings and a high failure rate never
//! stops the run early.

use crate::config::DownloadConfig;
use crate::error::Result;
use crate::fetch::Fetch;
use crate::fs_guard::ensure_dir;
use crate::types::{DownloadOutcome, Event, RunSummary, WorkItem};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Buffer size of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Run-scoped counters shared by every fetch task of a run
///
/// Each completed item increments exactly one of `downloaded`, `skipped`, `failed`.
#[derive(Debug, Default)]
pub struct RunStatistics {
    total: AtomicU64,
    downloaded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

impl RunStatistics {
    /// Create counters for a run of `total` items
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            ..Default::default()
        }
    }

    /// Record the terminal outcome of one item
    pub fn record(&self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded(bytes) => {
                self.downloaded.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(*bytes, Ordering::Relaxed);
            }
            DownloadOutcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            DownloadOutcome::Failed(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record an item whose task died before producing an outcome
    fn record_lost(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Items that reached a terminal outcome so far
    pub fn processed(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
            + self.skipped.load(Ordering::Relaxed)
            + self.failed.load(Ordering::Relaxed)
    }

    /// Copy the counters into a [`RunSummary`]
    pub fn snapshot(&self, elapsed: Duration) -> RunSummary {
        RunSummary {
            total: self.total.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Split `items` into contiguous batches of at most `width` items, preserving order
pub fn plan_batches(items: Vec<WorkItem>, width: usize) -> Vec<Vec<WorkItem>> {
    items
        .chunks(width.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Drives a work list to completion in fixed-width batches
pub struct BatchScheduler {
    fetcher: Arc<dyn Fetch>,
    download_dir: PathBuf,
    concurrency: usize,
    batch_delay: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl BatchScheduler {
    /// Create a scheduler writing into `config.download_dir`
    pub fn new(fetcher: Arc<dyn Fetch>, config: &DownloadConfig) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            fetcher,
            download_dir: config.download_dir.clone(),
            concurrency: config.concurrency.max(1),
            batch_delay: config.batch_delay,
            event_tx,
        }
    }

    /// Subscribe to progress events
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Destination directory of this scheduler
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Process every item and return the aggregated counters
    ///
    /// # Errors
    ///
    /// Only setup errors are returned: the download directory cannot be created or is
    /// occupied by a non-directory. Per-item failures are counted in the summary.
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<RunSummary> {
        ensure_dir(&self.download_dir)?;

        let start = Instant::now();
        let total = items.len() as u64;
        let stats = Arc::new(RunStatistics::new(total));
        let batches = plan_batches(items, self.concurrency);
        let batch_count = batches.len();

        tracing::info!(
            total,
            batches = batch_count,
            concurrency = self.concurrency,
            dir = %self.download_dir.display(),
            "Starting download run"
        );

        for (index, batch) in batches.into_iter().enumerate() {
            self.emit_event(Event::BatchStarted {
                index,
                batches: batch_count,
                size: batch.len(),
            });

            self.run_batch(batch, &stats).await;

            let processed = stats.processed();
            let percent = if total > 0 {
                processed as f32 / total as f32 * 100.0
            } else {
                100.0
            };
            tracing::info!(
                batch = index + 1,
                batches = batch_count,
                processed,
                total,
                percent = %format!("{:.1}%", percent),
                "Batch complete"
            );
            self.emit_event(Event::BatchCompleted {
                index,
                processed,
                total,
                percent,
            });

            if index + 1 < batch_count && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let summary = stats.snapshot(start.elapsed());
        self.emit_event(Event::RunCompleted(summary.clone()));
        Ok(summary)
    }

    async fn run_batch(&self, batch: Vec<WorkItem>, stats: &Arc<RunStatistics>) {
        let (filenames, handles): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .map(|item| {
                let fetcher = Arc::clone(&self.fetcher);
                let dir = self.download_dir.clone();
                let stats = Arc::clone(stats);
                let event_tx = self.event_tx.clone();
                let filename = item.filename.clone();

                let handle = tokio::spawn(async move {
                    let outcome = fetcher.fetch(&item, &dir).await;
                    tracing::trace!(file = %item.filename, outcome = outcome.label(), "Item finished");
                    stats.record(&outcome);
                    event_tx.send(Event::ItemFinished { item, outcome }).ok();
                });
                (filename, handle)
            })
            .unzip();

        for (filename, result) in filenames.into_iter().zip(join_all(handles).await) {
            if let Err(e) = result {
                tracing::error!(file = %filename, error = %e, "Fetch task aborted");
                stats.record_lost();
            }
        }
    }
}
