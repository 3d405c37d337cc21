//! Worker pool wiring source → batcher → embedding workers → sink workers.
//!
//! Every embedding worker owns its own client and every sink worker owns its
//! own store connection. Workers communicate only through bounded queues and
//! return their counters when they finish; nothing mutable is shared.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::models::{
    Batch, Document, EmbedStats, EmbeddingResult, PipelineConfig, RunReport, SinkStats,
};
use crate::services::{
    Batcher, EmbedderProvider, EmbeddingStage, FailureSink, Router, Sink, StoreProvider,
};

pub struct Pipeline {
    settings: PipelineConfig,
    embedders: Arc<dyn EmbedderProvider>,
    stores: Arc<dyn StoreProvider>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineConfig,
        embedders: Arc<dyn EmbedderProvider>,
        stores: Arc<dyn StoreProvider>,
    ) -> Self {
        Self {
            settings,
            embedders,
            stores,
        }
    }

    /// Run the pipeline over `documents` until the input is exhausted or
    /// `cancel` turns true.
    ///
    /// Recoverable failures end up in the report. The run fails only when a
    /// whole stage could not start or a worker task died.
    pub async fn run<I>(
        &self,
        documents: I,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunReport, PipelineError>
    where
        I: IntoIterator<Item = Document> + Send + 'static,
        I::IntoIter: Send,
    {
        let started = Instant::now();
        let s = &self.settings;
        let capacity = s.queue_capacity.max(1);

        let failure_sink = match s.failure_report {
            Some(ref path) => {
                FailureSink::with_report(path)
                    .await
                    .map_err(|e| PipelineError::Setup {
                        stage: "failure report",
                        reason: format!("{}: {}", path.display(), e),
                    })?
            }
            None => FailureSink::log_only(),
        };

        info!(
            min_batch_size = s.min_batch_size,
            max_batch_size = s.max_batch_size,
            embed_workers = s.embed_workers,
            sink_workers = s.sink_workers,
            "starting pipeline"
        );

        let (doc_tx, doc_rx) = mpsc::channel::<Document>(capacity);
        let (batch_tx, batch_rx) = async_channel::bounded::<Batch>(capacity);
        let (processed_tx, processed_rx) = async_channel::bounded::<EmbeddingResult>(capacity);
        let (failed_tx, failed_rx) = mpsc::channel(capacity);

        let source = tokio::task::spawn_blocking(move || {
            let mut sent = 0u64;
            for doc in documents {
                if *cancel.borrow() {
                    return (sent, true);
                }
                if doc_tx.blocking_send(doc).is_err() {
                    break;
                }
                sent += 1;
            }
            (sent, false)
        });

        let batcher = tokio::spawn(
            Batcher::new(s.min_batch_size, s.max_batch_size).run(
                doc_rx,
                batch_tx,
                Duration::from_millis(s.batch_linger_ms),
            ),
        );

        let embed_workers = s.embed_workers.max(1);
        let embed_handles: Vec<_> = (0..embed_workers)
            .map(|id| {
                tokio::spawn(embed_worker(
                    id,
                    Arc::clone(&self.embedders),
                    batch_rx.clone(),
                    Router::new(processed_tx.clone(), failed_tx.clone()),
                ))
            })
            .collect();
        drop(batch_rx);
        drop(processed_tx);
        drop(failed_tx);

        let sink_workers = s.sink_workers.max(1);
        let sink_handles: Vec<_> = (0..sink_workers)
            .map(|id| {
                tokio::spawn(sink_worker(
                    id,
                    Arc::clone(&self.stores),
                    processed_rx.clone(),
                ))
            })
            .collect();
        drop(processed_rx);

        let failures = tokio::spawn(failure_sink.run(failed_rx));

        // Join everything before deciding the outcome so resources are released.
        let source_result = source
            .await
            .map_err(|e| PipelineError::WorkerPanicked(e.to_string()));
        let batcher_result = join(batcher).await;

        let mut report = RunReport::default();
        let mut first_error: Option<PipelineError> = None;

        let embed_setup = collect(embed_handles, &mut report, &mut first_error, |r, st| {
            r.embed.merge(&st)
        })
        .await;
        let sink_setup = collect(sink_handles, &mut report, &mut first_error, |r, st| {
            r.sink.merge(&st)
        })
        .await;
        let failures_result = failures
            .await
            .map_err(|e| PipelineError::WorkerPanicked(e.to_string()));

        report.duration_ms = started.elapsed().as_millis() as u64;

        let (sent, cancelled) = source_result?;
        report.cancelled = cancelled;
        let logged_failures = failures_result?;

        if let Some(err) = embed_setup.all_failed() {
            return Err(err);
        }
        if let Some(err) = sink_setup.all_failed() {
            return Err(err);
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        batcher_result?;

        if logged_failures != report.embed.failed {
            warn!(
                logged = logged_failures,
                routed = report.embed.failed,
                "failure sink count differs from routed failures"
            );
        }

        info!(
            read = sent,
            documents = report.embed.documents,
            batches = report.embed.batches,
            processed = report.embed.processed,
            failed = report.embed.failed,
            skipped_empty = report.embed.skipped_empty,
            persisted = report.sink.persisted,
            persist_failed = report.sink.persist_failed,
            cancelled = report.cancelled,
            "pipeline finished"
        );
        Ok(report)
    }
}

async fn embed_worker(
    id: usize,
    embedders: Arc<dyn EmbedderProvider>,
    batches: async_channel::Receiver<Batch>,
    router: Router,
) -> Result<EmbedStats, PipelineError> {
    let embedder = embedders.create().map_err(|e| PipelineError::Setup {
        stage: "embedding",
        reason: e.to_string(),
    })?;
    let stage = EmbeddingStage::new(embedder);
    let mut stats = EmbedStats::default();

    while let Ok(batch) = batches.recv().await {
        stats.batches += 1;
        stats.documents += batch.len() as u64;
        if !batch.is_empty() {
            stats.remote_calls += 1;
        }

        let outcome = stage.process(batch).await;
        stats.processed += outcome.processed.len() as u64;
        stats.failed += outcome.failed.len() as u64;
        stats.skipped_empty += outcome.skipped_empty as u64;

        router.route(outcome).await?;
    }

    debug!(worker = id, batches = stats.batches, "embedding worker finished");
    Ok(stats)
}

async fn sink_worker(
    id: usize,
    stores: Arc<dyn StoreProvider>,
    records: async_channel::Receiver<EmbeddingResult>,
) -> Result<SinkStats, PipelineError> {
    let store = stores.open().await.map_err(|e| PipelineError::Setup {
        stage: "sink",
        reason: e.to_string(),
    })?;
    let mut sink = Sink::new(store);
    let mut stats = SinkStats::default();

    while let Ok(record) = records.recv().await {
        if sink.persist(record).await {
            stats.persisted += 1;
        } else {
            stats.persist_failed += 1;
        }
    }

    sink.close().await;
    debug!(worker = id, persisted = stats.persisted, "sink worker finished");
    Ok(stats)
}

/// Setup outcome of one worker stage.
#[derive(Default)]
struct StageSetup {
    workers: usize,
    failures: Vec<PipelineError>,
}

impl StageSetup {
    fn all_failed(mut self) -> Option<PipelineError> {
        if self.workers > 0 && self.failures.len() == self.workers {
            return Some(self.failures.remove(0));
        }
        None
    }
}

async fn join<T>(handle: JoinHandle<Result<T, PipelineError>>) -> Result<T, PipelineError> {
    handle
        .await
        .map_err(|e| PipelineError::WorkerPanicked(e.to_string()))?
}

async fn collect<T>(
    handles: Vec<JoinHandle<Result<T, PipelineError>>>,
    report: &mut RunReport,
    first_error: &mut Option<PipelineError>,
    merge: impl Fn(&mut RunReport, T),
) -> StageSetup {
    let mut setup = StageSetup {
        workers: handles.len(),
        ..Default::default()
    };

    for handle in handles {
        match join(handle).await {
            Ok(stats) => merge(report, stats),
            Err(e @ PipelineError::Setup { .. }) => {
                warn!(error = %e, "worker could not start");
                report.worker_setup_failures += 1;
                setup.failures.push(e);
            }
            Err(e) => {
                if first_error.is_none() {
                    *first_error = Some(e);
                }
            }
        }
    }
    setup
}
