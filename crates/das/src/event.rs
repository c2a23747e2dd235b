// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::record::Level;

/// One analytics record, built by the parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub sequence: i64,
    pub name: String,
    pub timestamp_millis: i64,
    pub level: Level,
    pub source: String,
    pub profile_id: String,
    pub feature_type: String,
    pub feature_run_id: String,
    // Empty strings are absent.
    pub s1: String,
    pub s2: String,
    pub s3: String,
    pub s4: String,
    // Zero is absent.
    pub i1: i64,
    pub i2: i64,
    pub i3: i64,
    pub i4: i64,
}

/// Ordered group of events uploaded together.
///
/// A batch is moved, never shared: the batcher owns it until dispatch and the
/// upload worker owns it afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    events: Vec<Event>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl From<Vec<Event>> for Batch {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}
