// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::event::{Batch, Event};
use crate::upload::UploadHandle;
use tracing::{debug, error};

/// Accumulates events and hands full batches to the upload worker.
///
/// A dispatched batch is moved into the worker's queue and replaced by a fresh
/// one, so the producer never touches it again.
pub struct EventBatcher {
    batch: Batch,
    threshold: usize,
    upload: UploadHandle,
    event_count: u64,
    dispatch_failures: u64,
}

impl EventBatcher {
    pub fn new(threshold: usize, upload: UploadHandle) -> Self {
        EventBatcher {
            batch: Batch::new(),
            threshold,
            upload,
            event_count: 0,
            dispatch_failures: 0,
        }
    }

    pub fn process_event(&mut self, event: Event) {
        self.batch.push(event);
        self.event_count += 1;
        if self.batch.len() >= self.threshold {
            self.dispatch();
        }
    }

    /// Dispatches the open batch if it holds any events.
    pub fn flush(&mut self) {
        if !self.batch.is_empty() {
            self.dispatch();
        }
    }

    fn dispatch(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        let size = batch.len();
        match self.upload.upload(batch) {
            Ok(()) => debug!("Dispatched batch of {size} events"),
            Err(e) => {
                self.dispatch_failures += 1;
                error!("Failed to dispatch batch of {size} events, upload worker is gone: {e}");
            }
        }
    }

    pub fn open_len(&self) -> usize {
        self.batch.len()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn dispatch_failures(&self) -> u64 {
        self.dispatch_failures
    }
}
