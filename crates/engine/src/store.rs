// LINO - Line Oracle
// Copyright (C) 2026 The LINO Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Event file store.
//!
//! Persists trace buffers as event files and reads them back. Every write
//! truncates the destination; nothing is ever appended across invocations.

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use lino_common::{EventRecord, LineEvent, LineField, LineId, RecordError};
use thiserror::Error;
use tracing::trace;

/// Errors raised by the event file store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The destination could not be created or written
    #[error("failed to write event file {path}: {source}")]
    Write {
        /// Event file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The event file could not be opened or read
    #[error("failed to read event file {path}: {source}")]
    Read {
        /// Event file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record could not be decoded
    #[error("malformed event file {path}, line {line_no}: {source}")]
    Malformed {
        /// Event file path
        path: PathBuf,
        /// One-based line number of the bad record
        line_no: usize,
        /// Decoding error
        #[source]
        source: RecordError,
    },
}

/// An event file at a fixed location
#[derive(Debug, Clone)]
pub struct EventFileStore {
    path: PathBuf,
    line_field: LineField,
}

impl EventFileStore {
    /// Store at `path` using the default line field (second-to-last)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), line_field: LineField::default() }
    }

    /// Use a different field position for the line id
    pub fn with_line_field(mut self, line_field: LineField) -> Self {
        self.line_field = line_field;
        self
    }

    /// Location of the event file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line field
    pub fn line_field(&self) -> LineField {
        self.line_field
    }

    /// Replace the file contents with `events`, one record per line.
    pub fn write(&self, source: &str, events: &[LineEvent]) -> Result<usize, StoreError> {
        let write_err = |source| StoreError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let file = fs::File::create(&self.path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        for event in events {
            writeln!(writer, "{}", EventRecord::new(source, *event).encode()).map_err(write_err)?;
        }
        writer.flush().map_err(write_err)?;

        trace!(path = %self.path.display(), records = events.len(), "event file written");
        Ok(events.len())
    }

    /// Delete the event file if present, so stale contents can never be read
    /// back as the result of a later invocation.
    pub fn remove(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write { path: self.path.clone(), source }),
        }
    }

    /// Does the event file exist?
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_contents(&self) -> Result<String, StoreError> {
        fs::read_to_string(&self.path)
            .map_err(|source| StoreError::Read { path: self.path.clone(), source })
    }

    /// Decode every record. Blank lines are skipped.
    pub fn read_records(&self) -> Result<Vec<EventRecord>, StoreError> {
        let contents = self.read_contents()?;
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                EventRecord::decode(line, self.line_field).map_err(|source| {
                    StoreError::Malformed { path: self.path.clone(), line_no: idx + 1, source }
                })
            })
            .collect()
    }

    /// Line ids of every record, in file order
    pub fn read_lines(&self) -> Result<Vec<LineId>, StoreError> {
        Ok(self.read_records()?.into_iter().map(|record| record.event.line).collect())
    }

    /// Does any record name `target`?
    ///
    /// The whole file is decoded first: a malformed record is an error even if
    /// a matching record precedes it.
    pub fn contains_line(&self, target: LineId) -> Result<bool, StoreError> {
        Ok(self.read_lines()?.contains(&target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn events(lines: &[u32]) -> Vec<LineEvent> {
        lines.iter().enumerate().map(|(i, l)| LineEvent::new(LineId::new(*l), i as u64)).collect()
    }

    #[test]
    fn test_write_then_read_back_lines() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let store = EventFileStore::new(dir.path().join("nested").join("event_file"));

        store.write("middle", &events(&[2, 3, 5, 7])).unwrap();
        assert_eq!(
            store.read_lines().unwrap(),
            [2, 3, 5, 7].map(LineId::new).to_vec()
        );
        assert!(store.contains_line(LineId::new(7)).unwrap());
        assert!(!store.contains_line(LineId::new(4)).unwrap());
    }

    #[test]
    fn test_write_truncates_previous_contents() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let store = EventFileStore::new(dir.path().join("event_file"));

        store.write("middle", &events(&[2, 3, 5, 7])).unwrap();
        store.write("middle", &events(&[8])).unwrap();
        assert_eq!(store.read_lines().unwrap(), vec![LineId::new(8)]);

        store.write("middle", &[]).unwrap();
        assert!(store.exists());
        assert!(store.read_lines().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let store = EventFileStore::new(dir.path().join("event_file"));

        store.remove().unwrap();
        assert!(matches!(store.read_lines(), Err(StoreError::Read { .. })));
    }

    #[test]
    fn test_malformed_record_reports_line_number() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event_file");
        fs::write(&path, "middle,7,0\n\nmiddle,seven,1\n").unwrap();

        match EventFileStore::new(&path).contains_line(LineId::new(7)) {
            Err(StoreError::Malformed { line_no, .. }) => assert_eq!(line_no, 3),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_line_field() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event_file");
        fs::write(&path, "7,middle\n9,middle\n").unwrap();

        let store = EventFileStore::new(&path).with_line_field(LineField::FromStart(0));
        assert_eq!(store.read_lines().unwrap(), vec![LineId::new(7), LineId::new(9)]);
    }
}
