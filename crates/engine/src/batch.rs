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

//! Batch trigger analysis.
//!
//! For each line of interest, evaluate every input against a fresh line
//! oracle and collect the inputs that reach the line. The result is the
//! ground truth an explanation for that line is later checked against.

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use lino_common::{LineId, Verdict};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{BuiltinConverter, Oracle};

/// A program under test and the inputs to study it with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Program name
    pub name: String,
    /// Initial inputs
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Lines of interest
    #[serde(default)]
    pub lines: Vec<LineId>,
    /// Input converter
    #[serde(default)]
    pub converter: BuiltinConverter,
    /// Source of the program, if it is instrumented by LINO
    #[serde(default)]
    pub put_path: Option<PathBuf>,
}

impl Subject {
    /// Subject without inputs or lines
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            lines: Vec::new(),
            converter: BuiltinConverter::default(),
            put_path: None,
        }
    }

    /// Set the inputs
    pub fn with_inputs<S: Into<String>>(mut self, inputs: impl IntoIterator<Item = S>) -> Self {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the lines of interest
    pub fn with_lines<L: Into<LineId>>(mut self, lines: impl IntoIterator<Item = L>) -> Self {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the converter
    pub fn with_converter(mut self, converter: BuiltinConverter) -> Self {
        self.converter = converter;
        self
    }
}

/// Inputs reaching one line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTriggers {
    /// The line
    pub line: LineId,
    /// Inputs whose verdict was FAILING, in input order
    pub triggered: Vec<String>,
    /// Inputs that could not be evaluated
    pub undefined: Vec<String>,
    /// Number of inputs evaluated
    pub evaluated: usize,
}

/// Result of [`check_trigger`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerReport {
    /// One entry per line, in request order
    pub lines: Vec<LineTriggers>,
}

impl TriggerReport {
    /// Entry for `line`
    pub fn get(&self, line: LineId) -> Option<&LineTriggers> {
        self.lines.iter().find(|entry| entry.line == line)
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("failed to serialize trigger report")
    }

    /// Write `<line>_line_triggered.txt` per line into `dir`, one input per line.
    ///
    /// Returns the written paths.
    pub fn write_ground_truth(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create ground truth directory {}", dir.display()))?;

        let mut written = Vec::with_capacity(self.lines.len());
        for entry in &self.lines {
            let path = dir.join(format!("{}_line_triggered.txt", entry.line));
            let mut contents = entry.triggered.join("\n");
            if !contents.is_empty() {
                contents.push('\n');
            }
            fs::write(&path, contents)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), inputs = entry.triggered.len(), "Ground truth written");
            written.push(path);
        }
        Ok(written)
    }
}

/// Evaluate `inputs` against one oracle per line.
///
/// `build` is called once per line and must return an oracle for that line.
/// Converter errors are counted as undefined; they do not stop the batch.
pub fn check_trigger<O, F>(lines: &[LineId], inputs: &[String], mut build: F) -> Result<TriggerReport>
where
    O: Oracle,
    F: FnMut(LineId) -> Result<O>,
{
    let progress = ProgressBar::new((lines.len() * inputs.len()) as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} 🎯 Checking triggers [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}",
        )?
        .progress_chars("=> ")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let mut report = TriggerReport::default();
    for &line in lines {
        let oracle = build(line).wrap_err_with(|| format!("failed to build oracle for line {line}"))?;
        progress.set_message(format!("line {line}"));

        let mut entry =
            LineTriggers { line, triggered: Vec::new(), undefined: Vec::new(), evaluated: 0 };
        for input in inputs {
            match oracle.evaluate(input) {
                Ok(Verdict::Failing) => entry.triggered.push(input.clone()),
                Ok(Verdict::Passing) => {}
                Ok(Verdict::Undefined) => entry.undefined.push(input.clone()),
                Err(e) => {
                    warn!(%line, %input, error = %e, "Input could not be evaluated");
                    entry.undefined.push(input.clone());
                }
            }
            entry.evaluated += 1;
            progress.inc(1);
        }

        info!(
            %line,
            triggered = entry.triggered.len(),
            undefined = entry.undefined.len(),
            "Line checked"
        );
        report.lines.push(entry);
    }

    progress.finish_with_message("✨ Done!");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OracleError;
    use lino_common::ConvertError;
    use tempfile::TempDir;

    /// FAILING when the input mentions the line, UNDEFINED on "?"
    struct Mentions(LineId);

    impl Oracle for Mentions {
        fn evaluate(&self, input: &str) -> std::result::Result<Verdict, OracleError> {
            if input == "bad" {
                return Err(ConvertError::new(input, "unparsable").into());
            }
            Ok(match input {
                "?" => Verdict::Undefined,
                s if s.split(',').any(|t| t == self.0.to_string()) => Verdict::Failing,
                _ => Verdict::Passing,
            })
        }
    }

    #[test]
    fn test_collects_triggering_inputs_per_line() {
        lino_common::logging::ensure_test_logging(None);
        let inputs: Vec<String> = ["3,7", "1,2", "7", "?", "bad"].map(String::from).to_vec();
        let lines = [LineId::new(3), LineId::new(7)];

        let report = check_trigger(&lines, &inputs, |line| Ok(Mentions(line))).unwrap();

        let seven = report.get(LineId::new(7)).unwrap();
        assert_eq!(seven.triggered, vec!["3,7", "7"]);
        assert_eq!(seven.undefined, vec!["?", "bad"]);
        assert_eq!(seven.evaluated, 5);
        assert_eq!(report.get(LineId::new(3)).unwrap().triggered, vec!["3,7"]);
    }

    #[test]
    fn test_ground_truth_files() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let inputs: Vec<String> = ["3,7", "1,2"].map(String::from).to_vec();
        let report =
            check_trigger(&[LineId::new(7), LineId::new(4)], &inputs, |line| Ok(Mentions(line)))
                .unwrap();

        let written = report.write_ground_truth(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("7_line_triggered.txt")).unwrap(), "3,7\n");
        assert_eq!(fs::read_to_string(dir.path().join("4_line_triggered.txt")).unwrap(), "");

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["lines"][0]["line"], 7);
    }

    #[test]
    fn test_build_failures_abort_the_batch() {
        lino_common::logging::ensure_test_logging(None);
        let result = check_trigger(&[LineId::new(1)], &["x".to_string()], |_| {
            Err::<Mentions, _>(eyre::eyre!("no such module"))
        });
        assert!(result.is_err());
    }
}
