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

//! Coverage analysis over event files.
//!
//! The analyzer aggregates failing and passing event files into a per-line
//! spectrum. Depending on [`CoverageMode`] the coverage set is either every
//! line seen in a failing run, or the lines whose Ochiai suspiciousness reaches
//! a threshold.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs, io,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use lino_common::{LineField, LineId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{EventFileStore, StoreError};

/// Failures of a coverage analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An event file could not be read or parsed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An event directory could not be listed
    #[error("failed to list event directory {path}: {source}")]
    ListDir {
        /// The directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Neither failing nor passing files were given
    #[error("no event files to analyze")]
    NoInputs,
}

/// Execution counts of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Failing runs that executed the line
    pub failed: usize,
    /// Passing runs that executed the line
    pub passed: usize,
}

impl Spectrum {
    /// Ochiai suspiciousness given the total number of failing runs
    pub fn ochiai(&self, total_failed: usize) -> f64 {
        let denominator = ((total_failed * (self.failed + self.passed)) as f64).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            self.failed as f64 / denominator
        }
    }
}

/// How the coverage set is derived from the spectrum
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum CoverageMode {
    /// Every line executed by at least one failing run
    #[default]
    FailingSet,
    /// Lines whose suspiciousness is at least `threshold`
    Suspicious {
        /// Minimum Ochiai score
        threshold: f64,
    },
}

/// Result of an analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    lines: BTreeSet<LineId>,
    spectra: BTreeMap<LineId, Spectrum>,
    total_failed: usize,
    total_passed: usize,
}

impl Coverage {
    /// Is `line` in the coverage set?
    pub fn contains(&self, line: LineId) -> bool {
        self.lines.contains(&line)
    }

    /// The coverage set, ascending
    pub fn lines(&self) -> impl Iterator<Item = LineId> + '_ {
        self.lines.iter().copied()
    }

    /// Is the coverage set empty?
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Spectrum of `line`, if it executed anywhere
    pub fn spectrum(&self, line: LineId) -> Option<Spectrum> {
        self.spectra.get(&line).copied()
    }

    /// Ochiai score of `line`
    pub fn suspiciousness(&self, line: LineId) -> f64 {
        self.spectrum(line).map(|s| s.ochiai(self.total_failed)).unwrap_or_default()
    }

    /// Number of failing runs analyzed
    pub fn total_failed(&self) -> usize {
        self.total_failed
    }

    /// Number of passing runs analyzed
    pub fn total_passed(&self) -> usize {
        self.total_passed
    }

    /// Every executed line with its score, most suspicious first
    pub fn ranking(&self) -> Vec<(LineId, f64)> {
        self.spectra
            .iter()
            .map(|(line, spectrum)| (*line, spectrum.ochiai(self.total_failed)))
            .sorted_by(|(l1, s1), (l2, s2)| s2.total_cmp(s1).then(l1.cmp(l2)))
            .collect()
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.lines.iter().join(", "))
    }
}

/// Computes coverage from failing and passing event files
pub trait CoverageAnalyzer: fmt::Debug + Send + Sync {
    /// Analyze the given files
    fn analyze(&self, failing: &[PathBuf], passing: &[PathBuf])
        -> Result<Coverage, AnalysisError>;
}

/// The built-in spectrum-based analyzer
#[derive(Debug, Clone, Default)]
pub struct SpectrumAnalyzer {
    mode: CoverageMode,
    line_field: LineField,
}

impl SpectrumAnalyzer {
    /// Analyzer producing the failing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coverage mode
    pub fn with_mode(mut self, mode: CoverageMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set where line ids are read from
    pub fn with_line_field(mut self, line_field: LineField) -> Self {
        self.line_field = line_field;
        self
    }

    /// Analyze every file in `failing_dir` and `passing_dir`.
    ///
    /// A missing directory counts as holding no runs.
    pub fn analyze_dir(
        &self,
        failing_dir: &Path,
        passing_dir: &Path,
    ) -> Result<Coverage, AnalysisError> {
        let failing = list_event_files(failing_dir)?;
        let passing = list_event_files(passing_dir)?;
        info!(failing = failing.len(), passing = passing.len(), "Analyzing event archive");
        self.analyze(&failing, &passing)
    }

    /// Distinct lines of one run
    fn lines_of(&self, path: &Path) -> Result<BTreeSet<LineId>, AnalysisError> {
        let store = EventFileStore::new(path).with_line_field(self.line_field);
        Ok(store.read_lines()?.into_iter().collect())
    }
}

impl CoverageAnalyzer for SpectrumAnalyzer {
    fn analyze(
        &self,
        failing: &[PathBuf],
        passing: &[PathBuf],
    ) -> Result<Coverage, AnalysisError> {
        if failing.is_empty() && passing.is_empty() {
            return Err(AnalysisError::NoInputs);
        }

        let mut spectra: BTreeMap<LineId, Spectrum> = BTreeMap::new();
        for path in failing {
            for line in self.lines_of(path)? {
                spectra.entry(line).or_default().failed += 1;
            }
        }
        for path in passing {
            for line in self.lines_of(path)? {
                spectra.entry(line).or_default().passed += 1;
            }
        }

        let total_failed = failing.len();
        let lines = spectra
            .iter()
            .filter(|(_, spectrum)| match self.mode {
                CoverageMode::FailingSet => spectrum.failed > 0,
                CoverageMode::Suspicious { threshold } => {
                    spectrum.ochiai(total_failed) >= threshold
                }
            })
            .map(|(line, _)| *line)
            .collect();

        let coverage = Coverage { lines, spectra, total_failed, total_passed: passing.len() };
        debug!(mode = ?self.mode, coverage = %coverage, "Coverage computed");
        Ok(coverage)
    }
}

fn list_event_files(dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(AnalysisError::ListDir { path: dir.to_path_buf(), source }),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|source| AnalysisError::ListDir { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lino_common::LineEvent;
    use tempfile::TempDir;

    fn write_run(dir: &Path, name: &str, lines: &[u32]) -> PathBuf {
        let path = dir.join(name);
        let events: Vec<LineEvent> =
            lines.iter().enumerate().map(|(i, l)| LineEvent::new(LineId::new(*l), i as u64)).collect();
        EventFileStore::new(&path).write("middle", &events).unwrap();
        path
    }

    #[test]
    fn test_failing_set_is_union_of_failing_runs() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let f1 = write_run(dir.path(), "f1", &[1, 2, 3, 5, 7]);
        let f2 = write_run(dir.path(), "f2", &[1, 2, 9]);
        let p1 = write_run(dir.path(), "p1", &[1, 2, 3, 4]);

        let coverage = SpectrumAnalyzer::new().analyze(&[f1, f2], &[p1]).unwrap();
        assert_eq!(coverage.lines().map(LineId::get).collect::<Vec<_>>(), vec![1, 2, 3, 5, 7, 9]);
        assert!(!coverage.contains(LineId::new(4)));
        assert_eq!(coverage.spectrum(LineId::new(1)), Some(Spectrum { failed: 2, passed: 1 }));
    }

    #[test]
    fn test_suspicious_mode_and_ranking() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let f1 = write_run(dir.path(), "f1", &[1, 7]);
        let p1 = write_run(dir.path(), "p1", &[1, 4]);

        let coverage = SpectrumAnalyzer::new()
            .with_mode(CoverageMode::Suspicious { threshold: 0.9 })
            .analyze(&[f1], &[p1])
            .unwrap();

        assert_eq!(coverage.lines().collect::<Vec<_>>(), vec![LineId::new(7)]);
        let ranking = coverage.ranking();
        assert_eq!(ranking[0], (LineId::new(7), 1.0));
        assert_eq!(ranking.last().unwrap().0, LineId::new(4));
        assert_eq!(coverage.suspiciousness(LineId::new(4)), 0.0);
    }

    #[test]
    fn test_empty_coverage_differs_from_error() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let empty = write_run(dir.path(), "empty", &[]);
        let garbage = dir.path().join("garbage");
        std::fs::write(&garbage, "no line here\n").unwrap();

        let coverage = SpectrumAnalyzer::new().analyze(&[empty.clone()], &[]).unwrap();
        assert!(coverage.is_empty());

        assert!(matches!(
            SpectrumAnalyzer::new().analyze(&[garbage], &[]),
            Err(AnalysisError::Store(StoreError::Malformed { .. }))
        ));
        assert!(matches!(SpectrumAnalyzer::new().analyze(&[], &[]), Err(AnalysisError::NoInputs)));
    }

    #[test]
    fn test_analyze_dir_tolerates_missing_passing_dir() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let failing = dir.path().join("failing");
        std::fs::create_dir_all(&failing).unwrap();
        write_run(&failing, "run-0", &[2, 7]);

        let coverage =
            SpectrumAnalyzer::new().analyze_dir(&failing, &dir.path().join("passing")).unwrap();
        assert_eq!(coverage.total_failed(), 1);
        assert_eq!(coverage.total_passed(), 0);
        assert!(coverage.contains(LineId::new(7)));
    }
}
