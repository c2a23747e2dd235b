// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reader loop tying the log source, parser, batcher and upload worker together.
//!
//! Lifecycle: `Init -> Running -> Draining -> Terminated`. Only configuration
//! and log source failures end a run with an error; parse and upload failures
//! are absorbed into counters.

use crate::batcher::EventBatcher;
use crate::config::DasConfig;
use crate::constants::STATS_INTERVAL_ENTRIES;
use crate::error::DasError;
use crate::identity::Identity;
use crate::parser::LogRecordParser;
use crate::record::LogRecord;
use crate::source::{LogSource, ReadOutcome};
use crate::stats::{ResourceUsage, StatsSnapshot};
use crate::transport::Transport;
use crate::upload::{UploadCounters, UploadHandle, UploadWorker};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Draining,
    Terminated,
}

/// Process-wide state owned by the reader task.
///
/// `entries` and `sleeps` (and the batcher's event count) are written here
/// only; upload counters are written only by the worker and read here.
pub struct ManagerState {
    pub identity: Arc<Identity>,
    pub phase: Phase,
    pub entries: u64,
    pub sleeps: u64,
    upload_counters: Arc<UploadCounters>,
}

pub struct Manager<S: LogSource> {
    state: ManagerState,
    source: S,
    parser: LogRecordParser,
    batcher: EventBatcher,
    upload: UploadHandle,
    worker_task: Option<JoinHandle<()>>,
    idle_sleep: Duration,
}

impl<S: LogSource> Manager<S> {
    /// Validates the configuration, opens the log source and starts the upload worker.
    pub async fn init(
        config: &DasConfig,
        identity: Identity,
        mut source: S,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DasError> {
        config.validate()?;
        source.open().await.map_err(DasError::LogSourceOpen)?;

        let identity = Arc::new(identity);
        let feature_run_id = Uuid::new_v4().to_string();
        debug!(
            "Starting DAS manager for {} (boot {}), feature run {feature_run_id}",
            identity.robot_id, identity.boot_id
        );

        let (worker, upload) = UploadWorker::new(
            config.url.clone(),
            Arc::clone(&identity),
            transport,
            config.max_deferrals_size,
        );
        let upload_counters = worker.counters();
        let worker_task = tokio::spawn(worker.run());

        Ok(Manager {
            state: ManagerState {
                identity,
                phase: Phase::Init,
                entries: 0,
                sleeps: 0,
                upload_counters,
            },
            source,
            parser: LogRecordParser::new(feature_run_id),
            batcher: EventBatcher::new(config.queue_threshold_size, upload.clone()),
            upload,
            worker_task: Some(worker_task),
            idle_sleep: config.idle_sleep,
        })
    }

    /// Runs until `shutdown` is cancelled or the log source fails, then drains.
    ///
    /// Cancellation is checked once per loop iteration; an in-flight read or
    /// upload is never interrupted.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<StatsSnapshot, DasError> {
        self.transition(Phase::Running);

        let result = loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested");
                break Ok(());
            }

            match self.source.read().await {
                Ok(ReadOutcome::Record(record)) => self.process_record(&record),
                Ok(ReadOutcome::NoData) => {
                    tokio::time::sleep(self.idle_sleep).await;
                    self.state.sleeps += 1;
                }
                Err(e) => {
                    error!("Failed to read log source: {e}");
                    break Err(DasError::LogRead(e));
                }
            }
        };

        self.transition(Phase::Draining);
        let drained = self.drain().await;
        self.transition(Phase::Terminated);

        let snapshot = self.snapshot();
        result.and(drained).map(|()| snapshot)
    }

    fn process_record(&mut self, record: &LogRecord) {
        self.state.entries += 1;
        if let Some(event) = self.parser.parse(record) {
            self.batcher.process_event(event);
        }
        if self.state.entries % STATS_INTERVAL_ENTRIES == 0 {
            self.snapshot().log("periodic");
        }
    }

    async fn drain(&mut self) -> Result<(), DasError> {
        self.batcher.flush();
        let barrier = self.upload.barrier().await;
        self.snapshot().log("final");
        self.source.close().await;

        if self.upload.shutdown().is_err() {
            debug!("Upload worker already stopped");
        }
        if let Some(task) = self.worker_task.take() {
            if let Err(e) = task.await {
                error!("Upload worker task failed: {e}");
            }
        }

        barrier.map_err(DasError::WorkerUnavailable)
    }

    fn transition(&mut self, phase: Phase) {
        debug!("DAS manager {:?} -> {:?}", self.state.phase, phase);
        self.state.phase = phase;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            entries: self.state.entries,
            events: self.batcher.event_count(),
            sleeps: self.state.sleeps,
            dispatch_failures: self.batcher.dispatch_failures(),
            upload: self.state.upload_counters.snapshot(),
            resources: ResourceUsage::read(),
        }
    }

    pub fn state(&self) -> &ManagerState {
        &self.state
    }
}
