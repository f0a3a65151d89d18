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

//! Oracle construction.

use std::{fs, io, path::PathBuf, sync::Arc};

use lino_common::{LineField, LineId};
use thiserror::Error;
use tracing::info;

use super::{
    default_resource_path, BuiltinConverter, DelimitedIntegers, ErrorPolicy, FailureOracle,
    FunctionalOracle, InputConverter, LineOracle, OracleConfig, SharedOracle, VerdictStrategy,
    DEFAULT_TIMEOUT_SECS, EVENT_FILE_NAME,
};
use crate::{
    CopyInstrumenter, InstrumentConfig, Instrumenter, LoadError, ModuleContext, ModuleFactory,
    ReloadPolicy, SharedProgram, TraceBuffer,
};

/// Failures while constructing an oracle
#[derive(Debug, Error)]
pub enum ConstructError {
    /// The program could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The resource directory could not be created
    #[error("failed to prepare resource directory {path}: {source}")]
    Resource {
        /// The directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A line oracle was requested without a target line
    #[error("no target line given")]
    MissingLine,
}

/// Options for building an oracle around a program under test.
///
/// [`construct`](Self::construct) picks the oracle kind: with a reference
/// program a [`FunctionalOracle`], otherwise with a target line a
/// [`LineOracle`], otherwise a [`FailureOracle`].
pub struct OracleBuilder {
    name: String,
    program_under_test: Arc<dyn ModuleFactory>,
    program_oracle: Option<SharedProgram>,
    error_definitions: ErrorPolicy,
    timeout_secs: u64,
    line: Option<LineId>,
    put_path: Option<PathBuf>,
    instrumenter: Option<Arc<dyn Instrumenter>>,
    language: String,
    converter: Option<Arc<dyn InputConverter>>,
    resource_path: Option<PathBuf>,
    line_field: LineField,
    strategy: VerdictStrategy,
    reload: ReloadPolicy,
    archive_dir: Option<PathBuf>,
}

impl std::fmt::Debug for OracleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleBuilder")
            .field("name", &self.name)
            .field("functional", &self.program_oracle.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("line", &self.line)
            .field("put_path", &self.put_path)
            .field("resource_path", &self.resource_path)
            .finish_non_exhaustive()
    }
}

impl OracleBuilder {
    /// Start from the program under test
    pub fn new(name: impl Into<String>, program_under_test: Arc<dyn ModuleFactory>) -> Self {
        Self {
            name: name.into(),
            program_under_test,
            program_oracle: None,
            error_definitions: ErrorPolicy::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            line: None,
            put_path: None,
            instrumenter: None,
            language: "python".to_string(),
            converter: None,
            resource_path: None,
            line_field: LineField::default(),
            strategy: VerdictStrategy::default(),
            reload: ReloadPolicy::default(),
            archive_dir: None,
        }
    }

    /// Compare against a reference program
    pub fn program_oracle(mut self, reference: SharedProgram) -> Self {
        self.program_oracle = Some(reference);
        self
    }

    /// Failure kind to verdict mapping
    pub fn error_definitions(mut self, policy: ErrorPolicy) -> Self {
        self.error_definitions = policy;
        self
    }

    /// Whole seconds per call
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Target line
    pub fn line(mut self, line: impl Into<LineId>) -> Self {
        self.line = Some(line.into());
        self
    }

    /// Source of the program, instrumented into the resource directory
    pub fn put_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.put_path = Some(path.into());
        self
    }

    /// Instrumenter for `put_path`; sources are copied as-is without one
    pub fn instrumenter(mut self, instrumenter: Arc<dyn Instrumenter>) -> Self {
        self.instrumenter = Some(instrumenter);
        self
    }

    /// Language tag passed to the instrumenter
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Input converter
    pub fn inp_converter(mut self, converter: Arc<dyn InputConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Directory holding the event file and instrumented source
    pub fn resource_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resource_path = Some(path.into());
        self
    }

    /// Where line ids sit in event records
    pub fn line_field(mut self, line_field: LineField) -> Self {
        self.line_field = line_field;
        self
    }

    /// Verdict strategy of a line oracle
    pub fn strategy(mut self, strategy: VerdictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reload policy of a line oracle
    pub fn reload(mut self, reload: ReloadPolicy) -> Self {
        self.reload = reload;
        self
    }

    /// Archive decided event files of a line oracle
    pub fn archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    /// Build the oracle the options call for
    pub fn construct(self) -> Result<SharedOracle, ConstructError> {
        if let Some(reference) = self.program_oracle.clone() {
            let converter = self
                .converter
                .clone()
                .unwrap_or_else(|| Arc::new(DelimitedIntegers::whitespace()));
            let program = self.load_once()?;
            info!(oracle = %self.name, "Constructed functional oracle");
            return Ok(Arc::new(FunctionalOracle::new(
                program,
                reference,
                converter,
                self.error_definitions,
                self.timeout_secs,
            )));
        }

        if self.line.is_some() {
            return Ok(Arc::new(self.line_oracle()?));
        }

        let program = self.load_once()?;
        info!(oracle = %self.name, "Constructed failure oracle");
        Ok(Arc::new(FailureOracle::new(program, self.error_definitions, self.timeout_secs)))
    }

    /// Build a line oracle; a target line is required
    pub fn line_oracle(self) -> Result<LineOracle, ConstructError> {
        let target = self.line.ok_or(ConstructError::MissingLine)?;
        let resources = self.resources()?;

        let mut config = OracleConfig::new(self.name, self.program_under_test, target)
            .with_timeout_secs(self.timeout_secs)
            .with_events_path(resources.join(EVENT_FILE_NAME))
            .with_line_field(self.line_field)
            .with_strategy(self.strategy)
            .with_reload(self.reload)
            .with_converter(self.converter.unwrap_or_else(|| Arc::new(BuiltinConverter::Raw)));

        if let Some(source) = self.put_path {
            let file_name = source.file_name().map(PathBuf::from).unwrap_or_else(|| "put".into());
            let output = resources.join("instrumented").join(file_name);
            let instrumenter = self.instrumenter.unwrap_or_else(|| Arc::new(CopyInstrumenter));
            config = config
                .with_instrumentation(instrumenter, InstrumentConfig::new(source, output, self.language));
        }
        if let Some(archive) = self.archive_dir {
            config = config.with_archive_dir(archive);
        }

        Ok(LineOracle::new(config))
    }

    fn resources(&self) -> Result<PathBuf, ConstructError> {
        let path = self.resource_path.clone().unwrap_or_else(|| default_resource_path(&self.name));
        fs::create_dir_all(&path)
            .map_err(|source| ConstructError::Resource { path: path.clone(), source })?;
        Ok(path)
    }

    /// Functional and failure oracles keep one instance for their lifetime
    fn load_once(&self) -> Result<SharedProgram, ConstructError> {
        let resources = self.resources()?;
        let context = ModuleContext {
            buffer: TraceBuffer::new(self.name.clone()),
            events_path: resources.join(EVENT_FILE_NAME),
            instrumented_path: None,
        };
        Ok(self.program_under_test.load(&context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnProgram, Oracle, PutError, Tracer};
    use lino_common::{Value, Verdict};
    use tempfile::TempDir;

    fn factory() -> Arc<dyn ModuleFactory> {
        Arc::new(|_: &ModuleContext| -> Result<SharedProgram, LoadError> {
            Ok(Arc::new(FnProgram::new("lines", |args: Vec<Value>, tracer: &Tracer| {
                let raw = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
                for token in raw.split_whitespace() {
                    let line = token.parse::<u32>().map_err(|e| PutError::new("ValueError", e.to_string()))?;
                    tracer.record(line);
                }
                Ok(Value::from(raw))
            })))
        })
    }

    #[test]
    fn test_line_given_builds_line_oracle() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let oracle = OracleBuilder::new("lines", factory())
            .line(5u32)
            .resource_path(dir.path())
            .construct()
            .unwrap();

        assert_eq!(oracle.evaluate("1 5").unwrap(), Verdict::Failing);
        assert_eq!(oracle.evaluate("1 2").unwrap(), Verdict::Passing);
        // The failure is tolerated; line 1 ran before it
        assert_eq!(oracle.evaluate("1 x 5").unwrap(), Verdict::Passing);
        assert!(dir.path().join(EVENT_FILE_NAME).exists());
    }

    #[test]
    fn test_no_line_builds_failure_oracle() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let oracle =
            OracleBuilder::new("lines", factory()).resource_path(dir.path()).construct().unwrap();

        assert_eq!(oracle.evaluate("1 2").unwrap(), Verdict::Passing);
        assert_eq!(oracle.evaluate("1 x").unwrap(), Verdict::Failing);
    }

    #[test]
    fn test_program_oracle_wins_over_line() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let reference: SharedProgram =
            Arc::new(FnProgram::new("reference", |_: Vec<Value>, _: &Tracer| Ok(Value::from("1 2"))));
        let oracle = OracleBuilder::new("lines", factory())
            .program_oracle(reference)
            .line(5u32)
            .inp_converter(Arc::new(BuiltinConverter::Raw))
            .resource_path(dir.path())
            .construct()
            .unwrap();

        // A line oracle would say PASSING for both
        assert_eq!(oracle.evaluate("1 2").unwrap(), Verdict::Passing);
        assert_eq!(oracle.evaluate("1 3").unwrap(), Verdict::Failing);
    }

    #[test]
    fn test_line_oracle_requires_a_line() {
        let builder = OracleBuilder::new("lines", factory());
        assert!(matches!(builder.line_oracle(), Err(ConstructError::MissingLine)));
    }

    #[test]
    fn test_put_path_is_instrumented_into_resources() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("middle.py");
        fs::write(&source, "def middle(x, y, z): ...\n").unwrap();
        let resources = dir.path().join("resources");

        let oracle = OracleBuilder::new("lines", factory())
            .line(5u32)
            .put_path(&source)
            .resource_path(&resources)
            .line_oracle()
            .unwrap();
        oracle.evaluate("5").unwrap();

        assert!(resources.join("instrumented").join("middle.py").exists());
        let module = oracle.loaded_module().unwrap();
        assert!(module.buffer.source().ends_with("middle.py"));
    }
}
