// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sources of raw log records.

use crate::error::SourceError;
use crate::record::LogRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Result of a single read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Record(LogRecord),
    /// Nothing available right now; the caller should wait and try again.
    NoData,
}

#[async_trait]
pub trait LogSource: Send {
    async fn open(&mut self) -> Result<(), SourceError>;
    async fn read(&mut self) -> Result<ReadOutcome, SourceError>;
    async fn close(&mut self);
}

/// Follows a file of newline-delimited JSON [`LogRecord`]s.
///
/// End of file, including a partially written last line, is reported as
/// [`ReadOutcome::NoData`] so the file can keep growing while it is read.
/// At end of file the path is checked again: if it now names a different file
/// (rotation) or a file shorter than what was already consumed (truncation),
/// the source reopens it and continues from the start. A partial line pending
/// at that point is discarded.
pub struct JsonLinesSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    pending: Vec<u8>,
    offset: u64,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonLinesSource {
            path: path.into(),
            reader: None,
            pending: Vec::new(),
            offset: 0,
        }
    }

    async fn was_replaced(&self) -> bool {
        let Some(reader) = self.reader.as_ref() else {
            return false;
        };
        // A missing path mid-rotation is not a replacement yet
        let Ok(on_disk) = tokio::fs::metadata(&self.path).await else {
            return false;
        };
        if on_disk.len() < self.offset {
            return true;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if let Ok(opened) = reader.get_ref().metadata().await {
                return opened.ino() != on_disk.ino() || opened.dev() != on_disk.dev();
            }
        }
        #[cfg(not(unix))]
        let _ = reader;
        false
    }
}

/// Decodes one complete line. `None` means the line was blank.
fn decode_line(line: &[u8]) -> Option<Result<LogRecord, String>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(e.to_string())),
    };
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<LogRecord>(text).map_err(|e| e.to_string()))
}

#[async_trait]
impl LogSource for JsonLinesSource {
    async fn open(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path).await?;
        debug!("Opened log source {}", self.path.display());
        self.reader = Some(BufReader::new(file));
        self.pending.clear();
        self.offset = 0;
        Ok(())
    }

    async fn read(&mut self) -> Result<ReadOutcome, SourceError> {
        loop {
            let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;
            let n = reader.read_until(b'\n', &mut self.pending).await?;
            self.offset += n as u64;

            if n == 0 && self.was_replaced().await {
                warn!(
                    "Log source {} was rotated or truncated, reopening",
                    self.path.display()
                );
                self.open().await?;
                continue;
            }
            if n == 0 || self.pending.last() != Some(&b'\n') {
                return Ok(ReadOutcome::NoData);
            }

            let line = std::mem::take(&mut self.pending);
            match decode_line(&line) {
                Some(Ok(record)) => return Ok(ReadOutcome::Record(record)),
                Some(Err(e)) => warn!("Skipping unreadable log line: {e}"),
                None => {}
            }
        }
    }

    async fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed log source {}", self.path.display());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::Priority;
    use std::io::{Seek, SeekFrom, Write};

    const LINE: &str =
        r#"{"tag":"vic-engine","message":"hello","priority":"info","seconds":1,"nanoseconds":0}"#;

    #[tokio::test]
    async fn test_read_records_then_no_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{LINE}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{LINE}").unwrap();

        let mut source = JsonLinesSource::new(file.path());
        source.open().await.unwrap();

        for _ in 0..2 {
            match source.read().await.unwrap() {
                ReadOutcome::Record(record) => {
                    assert_eq!(record.tag, "vic-engine");
                    assert_eq!(record.priority, Priority::Info);
                }
                ReadOutcome::NoData => panic!("expected a record"),
            }
        }
        assert_eq!(source.read().await.unwrap(), ReadOutcome::NoData);
        source.close().await;
    }

    #[tokio::test]
    async fn test_partial_line_waits_for_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let (head, tail) = LINE.split_at(20);
        write!(file, "{head}").unwrap();
        file.flush().unwrap();

        let mut source = JsonLinesSource::new(file.path());
        source.open().await.unwrap();
        assert_eq!(source.read().await.unwrap(), ReadOutcome::NoData);

        writeln!(file, "{tail}").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            source.read().await.unwrap(),
            ReadOutcome::Record(_)
        ));
    }

    #[tokio::test]
    async fn test_unreadable_line_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, "{LINE}").unwrap();

        let mut source = JsonLinesSource::new(file.path());
        source.open().await.unwrap();
        assert!(matches!(
            source.read().await.unwrap(),
            ReadOutcome::Record(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"tag\":\"\xff\xfe\"}\n").unwrap();
        writeln!(file, "{LINE}").unwrap();

        let mut source = JsonLinesSource::new(file.path());
        source.open().await.unwrap();
        match source.read().await.unwrap() {
            ReadOutcome::Record(record) => assert_eq!(record.message, "hello"),
            ReadOutcome::NoData => panic!("expected the valid record"),
        }
        assert_eq!(source.read().await.unwrap(), ReadOutcome::NoData);
    }

    #[tokio::test]
    async fn test_truncated_file_is_read_from_start() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{LINE}").unwrap();

        let mut source = JsonLinesSource::new(file.path());
        source.open().await.unwrap();
        assert!(matches!(
            source.read().await.unwrap(),
            ReadOutcome::Record(_)
        ));

        file.as_file().set_len(0).unwrap();
        file.as_file_mut().seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(source.read().await.unwrap(), ReadOutcome::NoData);

        writeln!(file, "{LINE}").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            source.read().await.unwrap(),
            ReadOutcome::Record(_)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rotated_file_is_reopened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, format!("{LINE}\n")).unwrap();

        let mut source = JsonLinesSource::new(&path);
        source.open().await.unwrap();
        assert!(matches!(
            source.read().await.unwrap(),
            ReadOutcome::Record(_)
        ));

        std::fs::rename(&path, dir.path().join("events.jsonl.1")).unwrap();
        let rotated = LINE.replace("hello", "after rotation");
        std::fs::write(&path, format!("{rotated}\n")).unwrap();

        match source.read().await.unwrap() {
            ReadOutcome::Record(record) => assert_eq!(record.message, "after rotation"),
            ReadOutcome::NoData => panic!("expected a record from the new file"),
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let mut source = JsonLinesSource::new("/no/such/events.jsonl");
        assert!(matches!(source.open().await, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_read_before_open_fails() {
        let mut source = JsonLinesSource::new("/no/such/events.jsonl");
        assert!(matches!(source.read().await, Err(SourceError::Closed)));
    }
}
