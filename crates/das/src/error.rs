// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that end a manager run. Everything else is recovered and counted.
#[derive(Debug, thiserror::Error)]
pub enum DasError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to open log source: {0}")]
    LogSourceOpen(#[source] SourceError),

    #[error("Failed to read log source: {0}")]
    LogRead(#[source] SourceError),

    #[error("Upload worker unavailable: {0}")]
    WorkerUnavailable(String),
}

/// Errors raised by a [`crate::source::LogSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log source is not open")]
    Closed,
}

/// Reasons a log record does not yield an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("message does not start with the event marker")]
    MissingEventMarker,

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}
