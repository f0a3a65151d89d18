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

//! Line identifiers and the events instrumented code emits.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::{
    ops::{Deref, DerefMut},
    str::FromStr,
};
use thiserror::Error;

/// Identifier of an instrumented source line.
///
/// Line ids are assigned by the instrumentation pass. They are compared
/// numerically: `"07"` and `"7"` in an event file both denote line 7.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into,
)]
#[serde(transparent)]
pub struct LineId(u32);

impl LineId {
    /// Create a line id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw numeric id
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Error returned when a textual line id cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid line id {value:?}: expected a non-negative integer")]
pub struct ParseLineIdError {
    /// The offending text
    pub value: String,
}

impl FromStr for LineId {
    type Err = ParseLineIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ParseLineIdError { value: s.to_string() })
    }
}

/// A single executed-line event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineEvent {
    /// The line that executed
    pub line: LineId,
    /// Position of the event within its run, when known
    pub seq: Option<u64>,
}

impl LineEvent {
    /// Create an event with a sequence index
    pub const fn new(line: LineId, seq: u64) -> Self {
        Self { line, seq: Some(seq) }
    }

    /// Create an event without sequence information
    pub const fn unsequenced(line: LineId) -> Self {
        Self { line, seq: None }
    }
}

/// The ordered events of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTrace {
    inner: Vec<LineEvent>,
}

impl Deref for LineTrace {
    type Target = Vec<LineEvent>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for LineTrace {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl LineTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Does any event in this trace hit `line`?
    pub fn contains_line(&self, line: LineId) -> bool {
        self.inner.iter().any(|event| event.line == line)
    }

    /// Distinct lines in first-hit order
    pub fn distinct_lines(&self) -> Vec<LineId> {
        let mut seen = std::collections::HashSet::new();
        self.inner.iter().map(|e| e.line).filter(|line| seen.insert(*line)).collect()
    }
}

impl From<Vec<LineEvent>> for LineTrace {
    fn from(inner: Vec<LineEvent>) -> Self {
        Self { inner }
    }
}

impl IntoIterator for LineTrace {
    type Item = LineEvent;
    type IntoIter = std::vec::IntoIter<LineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a LineTrace {
    type Item = &'a LineEvent;
    type IntoIter = std::slice::Iter<'a, LineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_id_parse_is_numeric() {
        assert_eq!("7".parse::<LineId>().unwrap(), LineId::new(7));
        assert_eq!(" 07 ".parse::<LineId>().unwrap(), LineId::new(7));
        assert!("seven".parse::<LineId>().is_err());
        assert!("-1".parse::<LineId>().is_err());
    }

    #[test]
    fn test_distinct_lines_keeps_first_hit_order() {
        let trace: LineTrace = vec![
            LineEvent::new(LineId::new(3), 0),
            LineEvent::new(LineId::new(4), 1),
            LineEvent::new(LineId::new(3), 2),
            LineEvent::new(LineId::new(1), 3),
        ]
        .into();

        assert_eq!(trace.distinct_lines(), vec![LineId::new(3), LineId::new(4), LineId::new(1)]);
        assert!(trace.contains_line(LineId::new(4)));
        assert!(!trace.contains_line(LineId::new(2)));
    }
}
