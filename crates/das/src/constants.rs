// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// First character of every log message that carries an analytics event.
pub const EVENT_MARKER: char = '@';

/// Separator between the fields of an event message (ASCII unit separator).
pub const FIELD_MARKER: char = '\x1f';

/// `name, s1, s2, s3, s4, i1, i2, i3, i4`
pub const FIELD_COUNT: usize = 9;

/// Event name that opens a new feature run. Its `s3` is the run id and `s4` the feature type.
pub const FEATURE_START_EVENT: &str = "robot.feature_start";

pub const SYSTEM_PROFILE_ID: &str = "system";
pub const SYSTEM_FEATURE_TYPE: &str = "system";

/// Number of log entries between two periodic stats snapshots.
pub const STATS_INTERVAL_ENTRIES: u64 = 1000;

pub const DEFAULT_QUEUE_THRESHOLD_SIZE: usize = 50;
pub const DEFAULT_MAX_DEFERRALS_SIZE: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(10);
pub const DEFAULT_LOG_LEVEL: &str = "info";
