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

//! Event file record format.
//!
//! An event file is plain text with one record per line and comma-separated
//! fields. Records written by LINO have the shape
//!
//! ```text
//! <source>,<line-id>,<seq>
//! ```
//!
//! External instrumentation tools may emit additional leading fields. The
//! line-id is located through a [`LineField`], which defaults to the
//! second-to-last field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LineEvent, LineId};

/// Field separator used in event records
pub const FIELD_SEPARATOR: char = ',';

/// Position of the line-id field within an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    /// Zero-based index counted from the first field
    FromStart(usize),
    /// One-based index counted from the last field (`1` is the last field)
    FromEnd(usize),
}

impl Default for LineField {
    fn default() -> Self {
        Self::FromEnd(2)
    }
}

impl LineField {
    /// Pick the line-id field out of a split record
    pub fn select<'a>(&self, fields: &[&'a str]) -> Option<&'a str> {
        match *self {
            Self::FromStart(index) => fields.get(index).copied(),
            Self::FromEnd(0) => None,
            Self::FromEnd(offset) => {
                fields.len().checked_sub(offset).and_then(|index| fields.get(index).copied())
            }
        }
    }
}

/// Errors raised while decoding event records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record has too few fields for the configured line field
    #[error("record {record:?} has no field at {field:?}")]
    MissingField {
        /// The raw record
        record: String,
        /// The configured field position
        field: LineField,
    },

    /// The selected field is not a valid line id
    #[error("record {record:?} has invalid line id {value:?}")]
    InvalidLineId {
        /// The raw record
        record: String,
        /// The selected field value
        value: String,
    },
}

/// A decoded event record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Name of the instrumented unit that emitted the event
    pub source: String,
    /// The event itself
    pub event: LineEvent,
}

impl EventRecord {
    /// Create a record for an event emitted by `source`
    pub fn new(source: impl Into<String>, event: LineEvent) -> Self {
        Self { source: source.into(), event }
    }

    /// Encode as a single event-file line (without the trailing newline).
    ///
    /// Separators inside the source name are replaced so the field layout
    /// stays fixed.
    pub fn encode(&self) -> String {
        let source = self.source.replace([FIELD_SEPARATOR, '\n', '\r'], "_");
        let seq = self.event.seq.map(|seq| seq.to_string()).unwrap_or_default();
        format!("{source}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{seq}", self.event.line)
    }

    /// Decode one event-file line.
    ///
    /// The source is taken from the first field and the sequence index from
    /// the last field when it parses; only the line id is mandatory.
    pub fn decode(record: &str, field: LineField) -> Result<Self, RecordError> {
        let line = decode_line_id(record, field)?;
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        let source = fields.first().map(|s| s.to_string()).unwrap_or_default();
        let seq = if fields.len() > 2 {
            fields.last().and_then(|last| last.trim().parse::<u64>().ok())
        } else {
            None
        };

        Ok(Self { source, event: LineEvent { line, seq } })
    }
}

/// Extract only the line id of an event-file line
pub fn decode_line_id(record: &str, field: LineField) -> Result<LineId, RecordError> {
    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    let value = field
        .select(&fields)
        .ok_or_else(|| RecordError::MissingField { record: record.to_string(), field })?;

    value.parse::<LineId>().map_err(|_| RecordError::InvalidLineId {
        record: record.to_string(),
        value: value.to_string(),
    })
}
