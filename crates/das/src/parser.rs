// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns raw log records into analytics events.
//!
//! An event message is the [`EVENT_MARKER`] followed by nine fields separated by
//! [`FIELD_MARKER`]: `name, s1, s2, s3, s4, i1, i2, i3, i4`. Records without the
//! marker are ordinary log lines and are ignored without any logging.

use crate::constants::{
    EVENT_MARKER, FEATURE_START_EVENT, FIELD_COUNT, FIELD_MARKER, SYSTEM_FEATURE_TYPE,
    SYSTEM_PROFILE_ID,
};
use crate::error::ParseError;
use crate::event::Event;
use crate::record::{Level, LogRecord};
use tracing::{debug, error};

/// Stateful record parser.
///
/// Owns the sequence counter and the sticky feature run. Both advance only
/// when a record parses successfully.
#[derive(Debug)]
pub struct LogRecordParser {
    next_sequence: i64,
    profile_id: String,
    feature_type: String,
    feature_run_id: String,
}

impl LogRecordParser {
    /// Creates a parser in the "system" feature with the given run id.
    pub fn new(feature_run_id: String) -> Self {
        Self {
            next_sequence: 0,
            profile_id: SYSTEM_PROFILE_ID.to_string(),
            feature_type: SYSTEM_FEATURE_TYPE.to_string(),
            feature_run_id,
        }
    }

    /// Parses one record, returning `None` for non-event and malformed records.
    pub fn parse(&mut self, record: &LogRecord) -> Option<Event> {
        match self.try_parse(record) {
            Ok(event) => Some(event),
            Err(ParseError::MissingEventMarker) => None,
            Err(e) => {
                error!(
                    "Failed to parse event from {}: {e}. Record dropped",
                    record.tag
                );
                None
            }
        }
    }

    pub fn try_parse(&mut self, record: &LogRecord) -> Result<Event, ParseError> {
        let body = record
            .message
            .strip_prefix(EVENT_MARKER)
            .ok_or(ParseError::MissingEventMarker)?;

        let fields: Vec<&str> = body.split(FIELD_MARKER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        }

        let name = fields[0];
        if name == FEATURE_START_EVENT {
            self.feature_run_id = fields[3].to_string();
            self.feature_type = fields[4].to_string();
            debug!(
                "Feature run {} started ({})",
                self.feature_run_id, self.feature_type
            );
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Ok(Event {
            sequence,
            name: name.to_string(),
            timestamp_millis: record.timestamp_millis(),
            level: Level::from(record.priority),
            source: record.tag.clone(),
            profile_id: self.profile_id.clone(),
            feature_type: self.feature_type.clone(),
            feature_run_id: self.feature_run_id.clone(),
            s1: fields[1].to_string(),
            s2: fields[2].to_string(),
            s3: fields[3].to_string(),
            s4: fields[4].to_string(),
            i1: parse_int(fields[5]),
            i2: parse_int(fields[6]),
            i3: parse_int(fields[7]),
            i4: parse_int(fields[8]),
        })
    }

    pub fn next_sequence(&self) -> i64 {
        self.next_sequence
    }

    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    pub fn feature_run_id(&self) -> &str {
        &self.feature_run_id
    }
}

// Non-numeric payloads are tolerated as zero.
fn parse_int(field: &str) -> i64 {
    field.trim().parse::<i64>().unwrap_or(0)
}

/// Builds an event message from its parts, the inverse of [`LogRecordParser::parse`].
pub fn format_event_message(name: &str, strings: [&str; 4], ints: [i64; 4]) -> String {
    let mut message = String::new();
    message.push(EVENT_MARKER);
    message.push_str(name);
    for s in strings {
        message.push(FIELD_MARKER);
        message.push_str(s);
    }
    for i in ints {
        message.push(FIELD_MARKER);
        message.push_str(&i.to_string());
    }
    message
}
