// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded FIFO of batches waiting for a retry.
//!
//! When the queue is full the oldest batch is evicted to make room, so memory
//! stays bounded no matter how long the endpoint is unreachable.

use crate::event::Batch;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct DeferralQueue {
    batches: VecDeque<Batch>,
    capacity: usize,
}

impl DeferralQueue {
    /// `capacity` is counted in batches.
    pub fn new(capacity: usize) -> Self {
        DeferralQueue {
            batches: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn front(&self) -> Option<&Batch> {
        self.batches.front()
    }

    pub fn pop_front(&mut self) -> Option<Batch> {
        self.batches.pop_front()
    }

    /// Appends without checking the bound. Callers that need the bound use
    /// [`DeferralQueue::push_back_evicting`].
    pub fn push_back(&mut self, batch: Batch) {
        self.batches.push_back(batch);
    }

    /// Appends `batch`, first evicting the oldest entry if the queue is full.
    ///
    /// Returns the evicted batch. With a capacity of zero the new batch itself
    /// is returned and nothing is stored.
    pub fn push_back_evicting(&mut self, batch: Batch) -> Option<Batch> {
        if self.capacity == 0 {
            return Some(batch);
        }
        let evicted = if self.batches.len() >= self.capacity {
            self.batches.pop_front()
        } else {
            None
        };
        self.batches.push_back(batch);
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }
}
