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

//! Line oracle configuration.

use std::{env, fmt, path::PathBuf, sync::Arc};

use lino_common::{LineField, LineId};

use crate::{
    BuiltinConverter, CoverageAnalyzer, InputConverter, InstrumentConfig, Instrumenter,
    ModuleFactory, ReloadPolicy,
};

/// Seconds allowed per call unless configured otherwise
pub const DEFAULT_TIMEOUT_SECS: u64 = 1;

/// File name of the event file inside a resource directory
pub const EVENT_FILE_NAME: &str = "event_file";

/// `<system temp>/lino/<name>`
pub fn default_resource_path(name: &str) -> PathBuf {
    env::temp_dir().join("lino").join(name)
}

/// How the trace of an invocation is reduced to a verdict
#[derive(Debug, Clone, Default)]
pub enum VerdictStrategy {
    /// Parse the event file and look for the target line
    #[default]
    DirectParse,
    /// Ask a coverage analyzer whether the target is in the run's coverage set
    Coverage(Arc<dyn CoverageAnalyzer>),
}

/// An instrumentation pass to run before the first load
#[derive(Debug, Clone)]
pub struct InstrumentationStep {
    /// The instrumenter
    pub instrumenter: Arc<dyn Instrumenter>,
    /// What to instrument, and where to
    pub config: InstrumentConfig,
}

/// Everything a [`LineOracle`](crate::LineOracle) needs.
///
/// Built once per session with the `with_*` methods, then shared read-only
/// by every evaluation.
#[derive(Clone)]
pub struct OracleConfig {
    /// Name of the program under test
    pub name: String,
    /// Builds instances of the instrumented program
    pub factory: Arc<dyn ModuleFactory>,
    /// Optional instrumentation pass
    pub instrumentation: Option<InstrumentationStep>,
    /// The line of interest
    pub target: LineId,
    /// Whole seconds per call; zero disables the deadline
    pub timeout_secs: u64,
    /// Where each invocation's events are dumped
    pub events_path: PathBuf,
    /// Which record field holds the line id
    pub line_field: LineField,
    /// Verdict computation
    pub strategy: VerdictStrategy,
    /// Module refresh between invocations
    pub reload: ReloadPolicy,
    /// If set, decided event files are archived under `failing/` and `passing/`
    pub archive_dir: Option<PathBuf>,
    /// Converts candidate inputs to arguments
    pub converter: Arc<dyn InputConverter>,
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("name", &self.name)
            .field("instrumentation", &self.instrumentation)
            .field("target", &self.target)
            .field("timeout_secs", &self.timeout_secs)
            .field("events_path", &self.events_path)
            .field("line_field", &self.line_field)
            .field("strategy", &self.strategy)
            .field("reload", &self.reload)
            .field("archive_dir", &self.archive_dir)
            .finish_non_exhaustive()
    }
}

impl OracleConfig {
    /// Configuration with defaults for everything but the program and target
    pub fn new(name: impl Into<String>, factory: Arc<dyn ModuleFactory>, target: LineId) -> Self {
        let name = name.into();
        let events_path = default_resource_path(&name).join(EVENT_FILE_NAME);
        Self {
            name,
            factory,
            instrumentation: None,
            target,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            events_path,
            line_field: LineField::default(),
            strategy: VerdictStrategy::default(),
            reload: ReloadPolicy::default(),
            archive_dir: None,
            converter: Arc::new(BuiltinConverter::default()),
        }
    }

    /// Instrument `config.source_path` with `instrumenter` before loading
    pub fn with_instrumentation(
        mut self,
        instrumenter: Arc<dyn Instrumenter>,
        config: InstrumentConfig,
    ) -> Self {
        self.instrumentation = Some(InstrumentationStep { instrumenter, config });
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the event file path
    pub fn with_events_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.events_path = path.into();
        self
    }

    /// Set the line id field
    pub fn with_line_field(mut self, line_field: LineField) -> Self {
        self.line_field = line_field;
        self
    }

    /// Set the verdict strategy
    pub fn with_strategy(mut self, strategy: VerdictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the reload policy
    pub fn with_reload(mut self, reload: ReloadPolicy) -> Self {
        self.reload = reload;
        self
    }

    /// Archive decided event files under `dir`
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    /// Set the input converter
    pub fn with_converter(mut self, converter: Arc<dyn InputConverter>) -> Self {
        self.converter = converter;
        self
    }
}
