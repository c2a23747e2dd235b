// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic stats for the shipper process.
//!
//! Counters come from the reader loop and the upload worker; resource usage is
//! read from procfs. Values that cannot be read are reported as absent.

use crate::upload::UploadCountersSnapshot;
use std::fs;
use tracing::{debug, info};

const PROC_SELF_STATM_PATH: &str = "/proc/self/statm"; // Sizes in pages: size resident shared text lib data dt
const PROC_SELF_STAT_PATH: &str = "/proc/self/stat"; // utime and stime are fields 14 and 15, in clock ticks
const PAGE_SIZE_KB: u64 = 4;

/// Memory and CPU usage of this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    /// Resident set size in KiB
    pub rss_kb: Option<u64>,
    /// User plus system CPU time in clock ticks
    pub cpu_ticks: Option<u64>,
}

impl ResourceUsage {
    pub fn read() -> Self {
        let rss_kb = fs::read_to_string(PROC_SELF_STATM_PATH)
            .ok()
            .and_then(|contents| parse_statm_rss_kb(&contents));
        if rss_kb.is_none() {
            debug!("Could not read resident memory from {PROC_SELF_STATM_PATH}");
        }

        let cpu_ticks = fs::read_to_string(PROC_SELF_STAT_PATH)
            .ok()
            .and_then(|contents| parse_stat_cpu_ticks(&contents));
        if cpu_ticks.is_none() {
            debug!("Could not read CPU time from {PROC_SELF_STAT_PATH}");
        }

        ResourceUsage { rss_kb, cpu_ticks }
    }
}

fn parse_statm_rss_kb(contents: &str) -> Option<u64> {
    let resident_pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * PAGE_SIZE_KB)
}

/// The command name (field 2) may contain spaces, so fields are counted after
/// its closing parenthesis.
fn parse_stat_cpu_ticks(contents: &str) -> Option<u64> {
    let after_comm = &contents[contents.rfind(')')? + 1..];
    let mut fields = after_comm.split_whitespace();
    // after_comm starts at field 3 (state); utime is field 14
    let utime: u64 = fields.nth(11)?.parse().ok()?;
    let stime: u64 = fields.next()?.parse().ok()?;
    Some(utime + stime)
}

/// Point-in-time view of every shipper counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub entries: u64,
    pub events: u64,
    pub sleeps: u64,
    /// Batches lost because the upload worker was no longer accepting them
    pub dispatch_failures: u64,
    pub upload: UploadCountersSnapshot,
    pub resources: ResourceUsage,
}

impl StatsSnapshot {
    pub fn log(&self, reason: &str) {
        info!(
            reason,
            entries = self.entries,
            events = self.events,
            sleeps = self.sleeps,
            dispatch_failures = self.dispatch_failures,
            upload_success = self.upload.upload_success,
            upload_fail = self.upload.upload_fail,
            deferrals = self.upload.deferrals,
            dropped = self.upload.dropped,
            pending = self.upload.pending,
            rss_kb = self.resources.rss_kb,
            cpu_ticks = self.resources.cpu_ticks,
            "DAS stats"
        );
    }
}
