// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Raw log records as delivered by the system log stream.

use serde::{Deserialize, Serialize};

/// Priority of a raw log record, following the nine levels of the system logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Unknown,
    Default,
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Silent,
}

/// Severity carried by an analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Priority> for Level {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Silent | Priority::Default | Priority::Verbose | Priority::Debug => {
                Level::Debug
            }
            Priority::Info => Level::Info,
            Priority::Warn => Level::Warn,
            Priority::Error | Priority::Fatal | Priority::Unknown => Level::Error,
        }
    }
}

impl Level {
    /// Name used in the upload payload.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warning",
            Level::Error => "error",
        }
    }
}

/// One entry of the system log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub tag: String,
    pub message: String,
    pub priority: Priority,
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl LogRecord {
    /// Saturates at the `i64` bounds for out-of-range source timestamps.
    pub fn timestamp_millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1000)
            .saturating_add(self.nanoseconds / 1_000_000)
    }
}
