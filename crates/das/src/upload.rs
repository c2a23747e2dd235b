// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Single sequential upload worker.
//!
//! The worker owns the deferral queue and processes [`UploadCommand`]s strictly
//! in the order they were sent, one at a time:
//!
//! ```text
//!    ┌──────────────┐
//!    │   Batcher    │ (producer, never blocks)
//!    └──────┬───────┘
//!           │ UploadCommand via unbounded channel
//!           v
//!    ┌──────────────┐       ┌───────────────┐
//!    │ UploadWorker │ ────> │   Transport   │
//!    └──────┬───────┘       └───────────────┘
//!           │ failed batches
//!           v
//!    ┌──────────────┐
//!    │DeferralQueue │ (bounded, drop-oldest)
//!    └──────────────┘
//! ```
//!
//! A new batch is always attempted first. The deferred backlog is retried,
//! oldest first, only right after a successful upload and the retry pass
//! stops at the first failure.

use crate::deferral::DeferralQueue;
use crate::event::Batch;
use crate::identity::Identity;
use crate::transport::Transport;
use crate::wire::serialize_batch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum UploadCommand {
    /// Serialize and post a batch.
    Upload(Batch),
    /// No-op acknowledged once every earlier command has completed.
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

/// Counters written only by the worker task.
///
/// Other tasks read them through [`UploadCounters::snapshot`] for stats output.
#[derive(Debug, Default)]
pub struct UploadCounters {
    upload_success: AtomicU64,
    upload_fail: AtomicU64,
    deferrals: AtomicU64,
    dropped: AtomicU64,
    pending: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadCountersSnapshot {
    pub upload_success: u64,
    pub upload_fail: u64,
    pub deferrals: u64,
    pub dropped: u64,
    /// Batches currently waiting in the deferral queue.
    pub pending: u64,
}

impl UploadCounters {
    pub fn snapshot(&self) -> UploadCountersSnapshot {
        UploadCountersSnapshot {
            upload_success: self.upload_success.load(Ordering::Relaxed),
            upload_fail: self.upload_fail.load(Ordering::Relaxed),
            deferrals: self.deferrals.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }

    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cheap handle used by the producer side to talk to the worker.
#[derive(Clone, Debug)]
pub struct UploadHandle {
    tx: mpsc::UnboundedSender<UploadCommand>,
}

impl UploadHandle {
    /// Queues a batch for upload without waiting.
    pub fn upload(&self, batch: Batch) -> Result<(), mpsc::error::SendError<UploadCommand>> {
        self.tx.send(UploadCommand::Upload(batch))
    }

    /// Waits until every previously queued command has been processed.
    pub async fn barrier(&self) -> Result<(), String> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(UploadCommand::Barrier(done_tx))
            .map_err(|e| format!("Failed to send barrier command: {e}"))?;

        done_rx
            .await
            .map_err(|e| format!("Failed to receive barrier acknowledgement: {e}"))
    }

    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<UploadCommand>> {
        self.tx.send(UploadCommand::Shutdown)
    }
}

pub struct UploadWorker {
    url: String,
    identity: Arc<Identity>,
    transport: Arc<dyn Transport>,
    deferred: DeferralQueue,
    counters: Arc<UploadCounters>,
    rx: mpsc::UnboundedReceiver<UploadCommand>,
}

impl UploadWorker {
    /// Returns the worker (to be spawned) and a handle to send it commands.
    pub fn new(
        url: String,
        identity: Arc<Identity>,
        transport: Arc<dyn Transport>,
        max_deferrals: usize,
    ) -> (Self, UploadHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = UploadWorker {
            url,
            identity,
            transport,
            deferred: DeferralQueue::new(max_deferrals),
            counters: Arc::new(UploadCounters::default()),
            rx,
        };
        (worker, UploadHandle { tx })
    }

    pub fn counters(&self) -> Arc<UploadCounters> {
        Arc::clone(&self.counters)
    }

    #[cfg(test)]
    pub(crate) fn into_receiver(self) -> mpsc::UnboundedReceiver<UploadCommand> {
        self.rx
    }

    pub async fn run(mut self) {
        debug!("Upload worker started");

        while let Some(command) = self.rx.recv().await {
            match command {
                UploadCommand::Upload(batch) => self.upload_batch(batch).await,
                UploadCommand::Barrier(done_tx) => {
                    if done_tx.send(()).is_err() {
                        error!("Failed to acknowledge barrier - receiver dropped");
                    }
                }
                UploadCommand::Shutdown => {
                    debug!("Upload worker shutting down");
                    break;
                }
            }
        }

        if !self.deferred.is_empty() {
            warn!(
                "Upload worker stopped with {} deferred batches not delivered",
                self.deferred.len()
            );
        }
        debug!("Upload worker stopped");
    }

    pub(crate) async fn upload_batch(&mut self, batch: Batch) {
        match self.send(&batch).await {
            Some(true) => {
                UploadCounters::incr(&self.counters.upload_success);
                self.drain_deferred().await;
            }
            Some(false) => {
                UploadCounters::incr(&self.counters.upload_fail);
                self.defer(batch);
            }
            None => UploadCounters::incr(&self.counters.dropped),
        }
    }

    /// Retries deferred batches oldest first, stopping at the first failure.
    async fn drain_deferred(&mut self) {
        while let Some(front) = self.deferred.front() {
            match self.send(front).await {
                Some(true) => {
                    UploadCounters::incr(&self.counters.upload_success);
                    self.deferred.pop_front();
                }
                Some(false) => {
                    UploadCounters::incr(&self.counters.upload_fail);
                    debug!(
                        "Deferred batch failed again, {} batches left for later",
                        self.deferred.len()
                    );
                    break;
                }
                None => {
                    UploadCounters::incr(&self.counters.dropped);
                    self.deferred.pop_front();
                }
            }
        }
        self.update_pending();
    }

    fn defer(&mut self, batch: Batch) {
        let size = batch.len();
        if let Some(evicted) = self.deferred.push_back_evicting(batch) {
            UploadCounters::incr(&self.counters.dropped);
            warn!(
                "Deferral queue full ({} batches), dropped batch of {} events",
                self.deferred.capacity(),
                evicted.len()
            );
        }
        if self.deferred.capacity() > 0 {
            UploadCounters::incr(&self.counters.deferrals);
            debug!(
                "Deferred batch of {size} events, {} batches pending",
                self.deferred.len()
            );
        }
        self.update_pending();
    }

    /// `None` when the batch cannot be serialized; it is dropped since a retry
    /// would fail the same way.
    async fn send(&self, batch: &Batch) -> Option<bool> {
        let body = match serialize_batch(batch, &self.identity) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize batch. Data dropped: {e}");
                return None;
            }
        };
        debug!("Uploading batch of {} events", batch.len());
        let response = self.transport.post(&self.url, body).await;
        if !response.success {
            debug!("Upload rejected: {}", response.body);
        }
        Some(response.success)
    }

    fn update_pending(&self) {
        self.counters
            .pending
            .store(self.deferred.len() as u64, Ordering::Relaxed);
    }
}
