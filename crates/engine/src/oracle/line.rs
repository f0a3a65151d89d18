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

//! The line oracle.
//!
//! One evaluation walks `Init -> Loaded -> Running -> Traced -> Decided`:
//!
//! 1. the stale event file is removed and a module is acquired from the
//!    loader; its buffer is reset even when the module was just loaded,
//! 2. the input is converted,
//! 3. the program runs under the timeout guard; its failures, timeouts
//!    included, are logged and otherwise ignored,
//! 4. the buffer is dumped to the event file and the file is read back to
//!    decide the verdict.
//!
//! Any harness failure on the way ends in `Aborted` with an UNDEFINED verdict.

use std::{fs, path::Path, sync::Arc};

use lino_common::{LineTrace, Verdict};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use super::{call_guarded, Oracle, OracleConfig, OracleError, VerdictStrategy};
use crate::{
    is_guard_active, EventFileStore, GuardError, InstrumentationLoader, LoadedModule, PutError,
    TimeoutGuard,
};

/// Where an evaluation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleState {
    /// Nothing done yet
    Init,
    /// A module with a clean buffer is ready
    Loaded,
    /// The program is running
    Running,
    /// The trace is complete
    Traced,
    /// A verdict was reached
    Decided,
    /// A harness failure stopped the evaluation
    Aborted,
}

/// The outcome of one evaluation, with what led to it
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// The verdict
    pub verdict: Verdict,
    /// Final state, `Decided` or `Aborted`
    pub state: OracleState,
    /// Events recorded by this invocation
    pub trace: LineTrace,
    /// The program's own failure, if any
    pub failure: Option<PutError>,
    /// Why the evaluation was aborted, if it was
    pub harness_error: Option<String>,
}

impl Evaluation {
    fn aborted(reached: OracleState, error: impl ToString, trace: LineTrace) -> Self {
        let harness_error = error.to_string();
        error!(stage = ?reached, error = %harness_error, "Evaluation aborted, verdict is UNDEFINED");
        Self {
            verdict: Verdict::Undefined,
            state: OracleState::Aborted,
            trace,
            failure: None,
            harness_error: Some(harness_error),
        }
    }
}

#[derive(Debug)]
struct Session {
    loader: InstrumentationLoader,
    runs: u64,
}

/// Reports whether an input drives the program through the target line.
///
/// Evaluations on one oracle are serialized. Independent oracles must use
/// distinct event paths.
#[derive(Debug)]
pub struct LineOracle {
    config: Arc<OracleConfig>,
    session: Mutex<Session>,
}

impl LineOracle {
    /// Create an oracle; the program is loaded on first use
    pub fn new(config: impl Into<Arc<OracleConfig>>) -> Self {
        let config = config.into();
        let mut loader = InstrumentationLoader::new(
            config.name.clone(),
            config.factory.clone(),
            config.events_path.clone(),
        )
        .with_policy(config.reload);
        if let Some(step) = &config.instrumentation {
            loader = loader.with_instrumenter(step.instrumenter.clone(), step.config.clone());
        }

        info!(
            oracle = %config.name,
            target = %config.target,
            timeout_secs = config.timeout_secs,
            events = %config.events_path.display(),
            "Line oracle created"
        );
        Self { config, session: Mutex::new(Session { loader, runs: 0 }) }
    }

    /// The configuration
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Number of evaluations so far
    pub fn runs(&self) -> u64 {
        self.session.lock().runs
    }

    /// Evaluate `input` and report how the verdict came about
    pub fn evaluate_detailed(&self, input: &str) -> Result<Evaluation, OracleError> {
        if is_guard_active() {
            return Err(OracleError::NestedGuard);
        }

        let config = &self.config;
        let mut session = self.session.lock();
        session.runs += 1;
        let run = session.runs;
        let _span = tracing::debug_span!("evaluate", oracle = %config.name, run).entered();

        let store = EventFileStore::new(&config.events_path).with_line_field(config.line_field);
        let mut state = OracleState::Init;

        // Init -> Loaded
        if let Err(e) = store.remove() {
            return Ok(Evaluation::aborted(state, e, LineTrace::new()));
        }
        let module = match session.loader.acquire() {
            Ok(module) => module,
            Err(e) => return Ok(Evaluation::aborted(state, e, LineTrace::new())),
        };
        module.buffer.reset();
        advance(&mut state, OracleState::Loaded);

        // Loaded -> Running
        let args = config.converter.convert(input)?.into_args();
        advance(&mut state, OracleState::Running);

        // Running -> Traced
        let guard = TimeoutGuard::new(config.timeout_secs);
        let failure = match call_guarded(guard, &module.program, args, module.buffer.tracer()) {
            Ok(Ok(_)) => None,
            Ok(Err(failure)) => {
                debug!(%input, %failure, "Program failed");
                Some(failure)
            }
            Err(GuardError::Nested) => return Err(OracleError::NestedGuard),
            Err(e) => return Ok(Evaluation::aborted(state, e, module.buffer.snapshot())),
        };
        advance(&mut state, OracleState::Traced);

        // Traced -> Decided
        let trace = module.buffer.snapshot();
        // The file is written from the same snapshot that is reported.
        let dumped = store.write(module.buffer.source(), &trace);
        if failure.as_ref().is_some_and(PutError::is_timeout) {
            // The abandoned call may still be running against this module.
            session.loader.invalidate();
        }
        if let Err(e) = dumped {
            return Ok(Evaluation::aborted(state, e, trace));
        }

        let verdict = match self.decide(&store) {
            Ok(verdict) => verdict,
            Err(e) => return Ok(Evaluation::aborted(state, e, trace)),
        };
        advance(&mut state, OracleState::Decided);
        debug!(%input, %verdict, events = trace.len(), "Evaluation decided");

        if let Some(archive) = &config.archive_dir {
            if let Err(e) = archive_event_file(archive, &config.name, store.path(), verdict) {
                warn!(archive = %archive.display(), error = %e, "Failed to archive event file");
            }
        }

        Ok(Evaluation { verdict, state, trace, failure, harness_error: None })
    }

    /// Reduce the dumped event file to a verdict
    fn decide(&self, store: &EventFileStore) -> eyre::Result<Verdict> {
        let target = self.config.target;
        let hit = match &self.config.strategy {
            VerdictStrategy::DirectParse => store.contains_line(target)?,
            VerdictStrategy::Coverage(analyzer) => {
                analyzer.analyze(&[store.path().to_path_buf()], &[])?.contains(target)
            }
        };
        Ok(if hit { Verdict::Failing } else { Verdict::Passing })
    }

    /// The module the next evaluation would reuse, if any
    pub fn loaded_module(&self) -> Option<LoadedModule> {
        self.session.lock().loader.current().cloned()
    }
}

impl Oracle for LineOracle {
    fn evaluate(&self, input: &str) -> Result<Verdict, OracleError> {
        self.evaluate_detailed(input).map(|evaluation| evaluation.verdict)
    }
}

fn advance(state: &mut OracleState, next: OracleState) {
    trace!(from = ?*state, to = ?next, "oracle state");
    *state = next;
}

/// Copy `events` to `<archive>/<failing|passing>/<name>-<n>.events`
fn archive_event_file(
    archive: &Path,
    name: &str,
    events: &Path,
    verdict: Verdict,
) -> std::io::Result<()> {
    let dir = match verdict {
        Verdict::Failing => archive.join("failing"),
        Verdict::Passing => archive.join("passing"),
        Verdict::Undefined => return Ok(()),
    };
    fs::create_dir_all(&dir)?;
    let index = fs::read_dir(&dir)?.count();
    fs::copy(events, dir.join(format!("{name}-{index:06}.events")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnProgram, LoadError, ModuleContext, ModuleFactory, SharedProgram, Tracer};
    use lino_common::{LineId, Value};
    use tempfile::TempDir;

    /// Records every integer argument as a line
    fn echo_factory() -> Arc<dyn ModuleFactory> {
        Arc::new(|_: &ModuleContext| -> Result<SharedProgram, LoadError> {
            Ok(Arc::new(FnProgram::new("echo", |args: Vec<Value>, tracer: &Tracer| {
                for arg in &args {
                    if let Some(line) = arg.as_u64() {
                        tracer.record(line as u32);
                    }
                }
                Ok(Value::Null)
            })))
        })
    }

    fn oracle(dir: &TempDir, target: u32) -> LineOracle {
        LineOracle::new(
            OracleConfig::new("echo", echo_factory(), LineId::new(target))
                .with_events_path(dir.path().join("event_file"))
                .with_converter(Arc::new(crate::BuiltinConverter::Csv)),
        )
    }

    #[test]
    fn test_hit_and_miss() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let oracle = oracle(&dir, 7);

        let hit = oracle.evaluate_detailed("1,7").unwrap();
        assert_eq!(hit.verdict, Verdict::Failing);
        assert_eq!(hit.state, OracleState::Decided);

        assert_eq!(oracle.evaluate("1,2").unwrap(), Verdict::Passing);
        assert_eq!(oracle.runs(), 2);
    }

    #[test]
    fn test_converter_errors_propagate() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let oracle = oracle(&dir, 7);

        assert!(matches!(oracle.evaluate("1,seven"), Err(OracleError::Convert(_))));
    }

    #[test]
    fn test_unwritable_event_path_is_undefined() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let oracle = LineOracle::new(
            OracleConfig::new("echo", echo_factory(), LineId::new(7))
                .with_events_path(blocker.join("event_file"))
                .with_converter(Arc::new(crate::BuiltinConverter::Csv)),
        );

        let evaluation = oracle.evaluate_detailed("7").unwrap();
        assert_eq!(evaluation.verdict, Verdict::Undefined);
        assert_eq!(evaluation.state, OracleState::Aborted);
        assert!(evaluation.harness_error.is_some());
    }

    #[test]
    fn test_archive_sorts_runs_by_verdict() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("archive");
        let oracle = LineOracle::new(
            OracleConfig::new("echo", echo_factory(), LineId::new(7))
                .with_events_path(dir.path().join("event_file"))
                .with_converter(Arc::new(crate::BuiltinConverter::Csv))
                .with_archive_dir(&archive),
        );

        oracle.evaluate("7").unwrap();
        oracle.evaluate("1").unwrap();
        oracle.evaluate("2").unwrap();

        assert_eq!(fs::read_dir(archive.join("failing")).unwrap().count(), 1);
        assert_eq!(fs::read_dir(archive.join("passing")).unwrap().count(), 2);
        assert!(archive.join("passing").join("echo-000001.events").exists());
    }

    #[test]
    fn test_reported_trace_matches_event_file() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let oracle = oracle(&dir, 7);

        let evaluation = oracle.evaluate_detailed("3,7,3").unwrap();
        let store = EventFileStore::new(dir.path().join("event_file"));
        let from_file = store.read_lines().unwrap();
        let reported: Vec<LineId> = evaluation.trace.iter().map(|event| event.line).collect();
        assert_eq!(from_file, reported);
        assert_eq!(reported, vec![LineId::new(3), LineId::new(7), LineId::new(3)]);
    }
}
