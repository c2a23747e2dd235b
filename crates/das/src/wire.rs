// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! JSON payload sent to the collection endpoint.
//!
//! A batch is a JSON array of event objects. Keys appear in a fixed order;
//! empty string payloads and zero integer payloads are left out.

use crate::event::{Batch, Event};
use crate::identity::Identity;
use serde::Serialize;

#[derive(Serialize)]
struct WireEvent<'a> {
    source: &'a str,
    event: &'a str,
    ts: i64,
    seq: i64,
    level: &'static str,
    robot_id: &'a str,
    robot_version: &'a str,
    boot_id: &'a str,
    profile_id: &'a str,
    feature_type: &'a str,
    feature_run_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    s1: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    s2: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    s3: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    s4: &'a str,
    #[serde(skip_serializing_if = "is_zero")]
    i1: i64,
    #[serde(skip_serializing_if = "is_zero")]
    i2: i64,
    #[serde(skip_serializing_if = "is_zero")]
    i3: i64,
    #[serde(skip_serializing_if = "is_zero")]
    i4: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl<'a> WireEvent<'a> {
    fn new(event: &'a Event, identity: &'a Identity) -> Self {
        WireEvent {
            source: &event.source,
            event: &event.name,
            ts: event.timestamp_millis,
            seq: event.sequence,
            level: event.level.as_wire_str(),
            robot_id: &identity.robot_id,
            robot_version: &identity.robot_version,
            boot_id: &identity.boot_id,
            profile_id: &event.profile_id,
            feature_type: &event.feature_type,
            feature_run_id: &event.feature_run_id,
            s1: &event.s1,
            s2: &event.s2,
            s3: &event.s3,
            s4: &event.s4,
            i1: event.i1,
            i2: event.i2,
            i3: event.i3,
            i4: event.i4,
        }
    }
}

/// Serializes a batch into the upload body.
pub fn serialize_batch(batch: &Batch, identity: &Identity) -> Result<Vec<u8>, serde_json::Error> {
    let events: Vec<WireEvent<'_>> = batch
        .events()
        .iter()
        .map(|event| WireEvent::new(event, identity))
        .collect();
    serde_json::to_vec(&events)
}
