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

//! Loading instrumented programs.
//!
//! An instrumented program is produced by a [`ModuleFactory`] from a
//! [`ModuleContext`] that owns the module's [`TraceBuffer`]. Every load builds
//! a new buffer, so a reload is always a clean slate; a reset is the cheaper
//! alternative and is what [`ReloadPolicy::ResetOnly`] relies on.

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
};

use lino_common::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{panic_message, InstrumentConfig, InstrumentError, Instrumenter, TraceBuffer, Tracer};

/// A failure raised by the program under test itself.
///
/// `kind` plays the role of an exception type: oracles map it to a verdict
/// through their error definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct PutError {
    /// Failure kind
    pub kind: String,
    /// Human readable detail
    pub message: String,
}

impl PutError {
    /// The call exceeded its deadline
    pub const TIMEOUT: &'static str = "timeout";
    /// The call panicked
    pub const PANIC: &'static str = "panic";
    /// The result differed from the reference program's
    pub const UNEXPECTED_RESULT: &'static str = "unexpected_result";

    /// Failure of an arbitrary kind
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }

    /// Deadline expiry
    pub fn timeout(secs: u64) -> Self {
        Self::new(Self::TIMEOUT, format!("call timed out after {secs}s"))
    }

    /// Panic with the given payload text
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(Self::PANIC, message)
    }

    /// Mismatch against the reference result
    pub fn unexpected_result(expected: &Value, actual: &Value) -> Self {
        Self::new(Self::UNEXPECTED_RESULT, format!("expected {expected}, got {actual}"))
    }

    /// Is this a deadline expiry?
    pub fn is_timeout(&self) -> bool {
        self.kind == Self::TIMEOUT
    }
}

/// An instrumented program that can be called with positional arguments.
///
/// Instrumented statements report through `tracer`; implementations must not
/// keep the tracer beyond the call.
pub trait ProgramUnderTest: Send + Sync {
    /// Name used in logs and as the source field of event records
    fn name(&self) -> &str;

    /// Run the program on `args`
    fn call(&self, args: Vec<Value>, tracer: &Tracer) -> Result<Value, PutError>;
}

/// Shared handle to a loaded program
pub type SharedProgram = Arc<dyn ProgramUnderTest>;

/// A program backed by a closure
pub struct FnProgram<F> {
    name: String,
    body: F,
}

impl<F> FnProgram<F>
where
    F: Fn(Vec<Value>, &Tracer) -> Result<Value, PutError> + Send + Sync,
{
    /// Wrap `body` under `name`
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self { name: name.into(), body }
    }
}

impl<F> fmt::Debug for FnProgram<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProgram").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> ProgramUnderTest for FnProgram<F>
where
    F: Fn(Vec<Value>, &Tracer) -> Result<Value, PutError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: Vec<Value>, tracer: &Tracer) -> Result<Value, PutError> {
        (self.body)(args, tracer)
    }
}

/// What a factory gets to build a module instance from
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// The buffer owned by this module instance
    pub buffer: TraceBuffer,
    /// Where the oracle dumps this module's events
    pub events_path: PathBuf,
    /// The instrumented source, when an instrumentation pass ran
    pub instrumented_path: Option<PathBuf>,
}

/// Builds a fresh instance of an instrumented program.
///
/// Any state the instance needs must be created inside `load`; nothing may be
/// carried over from a previous instance.
pub trait ModuleFactory: Send + Sync {
    /// Build a new instance bound to `context`
    fn load(&self, context: &ModuleContext) -> Result<SharedProgram, LoadError>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&ModuleContext) -> Result<SharedProgram, LoadError> + Send + Sync,
{
    fn load(&self, context: &ModuleContext) -> Result<SharedProgram, LoadError> {
        self(context)
    }
}

/// Failures while preparing or loading an instrumented program
#[derive(Debug, Error)]
pub enum LoadError {
    /// The instrumentation pass failed
    #[error("instrumentation failed: {0}")]
    Instrumentation(#[from] InstrumentError),

    /// The factory refused to build the module
    #[error("failed to load module {module}: {reason}")]
    Module {
        /// Module name
        module: String,
        /// Why loading failed
        reason: String,
    },

    /// The factory panicked
    #[error("module {module} panicked while loading: {message}")]
    Panicked {
        /// Module name
        module: String,
        /// Panic payload text
        message: String,
    },
}

impl LoadError {
    /// A factory failure for `module`
    pub fn module(module: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Module { module: module.into(), reason: reason.to_string() }
    }
}

/// How module state is refreshed between invocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Keep the loaded instance and reset its buffer
    #[default]
    ResetOnly,
    /// Build a new instance for every invocation
    EveryInvocation,
}

/// A loaded program together with the buffer it records into
#[derive(Clone)]
pub struct LoadedModule {
    /// The program instance
    pub program: SharedProgram,
    /// Its trace buffer
    pub buffer: TraceBuffer,
    /// Load counter, starting at 1
    pub generation: u64,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("program", &self.program.name())
            .field("buffer", &self.buffer)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Instruments a program once and hands out loaded instances of it.
pub struct InstrumentationLoader {
    name: String,
    factory: Arc<dyn ModuleFactory>,
    instrumentation: Option<(Arc<dyn Instrumenter>, InstrumentConfig)>,
    policy: ReloadPolicy,
    events_path: PathBuf,
    prepared: bool,
    generation: u64,
    current: Option<LoadedModule>,
}

impl fmt::Debug for InstrumentationLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationLoader")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("events_path", &self.events_path)
            .field("prepared", &self.prepared)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl InstrumentationLoader {
    /// Loader for `name`, whose events are dumped to `events_path`
    pub fn new(
        name: impl Into<String>,
        factory: Arc<dyn ModuleFactory>,
        events_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            instrumentation: None,
            policy: ReloadPolicy::default(),
            events_path: events_path.into(),
            prepared: false,
            generation: 0,
            current: None,
        }
    }

    /// Run `instrumenter` on `config` before the first load
    pub fn with_instrumenter(
        mut self,
        instrumenter: Arc<dyn Instrumenter>,
        config: InstrumentConfig,
    ) -> Self {
        self.instrumentation = Some((instrumenter, config));
        self.prepared = false;
        self
    }

    /// Set the reload policy
    pub fn with_policy(mut self, policy: ReloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reload policy in effect
    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// Number of loads so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run the instrumentation pass if it has not succeeded yet
    pub fn prepare(&mut self) -> Result<(), LoadError> {
        if self.prepared {
            return Ok(());
        }
        if let Some((instrumenter, config)) = &self.instrumentation {
            instrumenter.instrument(config)?;
            info!(module = %self.name, output = %config.output_path.display(), "Instrumented program");
        }
        self.prepared = true;
        Ok(())
    }

    /// Build a new module instance, replacing the current one
    pub fn load(&mut self) -> Result<LoadedModule, LoadError> {
        self.prepare()?;
        self.current = None;

        let instrumented_path =
            self.instrumentation.as_ref().map(|(_, config)| config.output_path.clone());
        let source = instrumented_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| self.name.clone());
        let context = ModuleContext {
            buffer: TraceBuffer::new(source),
            events_path: self.events_path.clone(),
            instrumented_path,
        };

        let factory = &self.factory;
        let program = catch_unwind(AssertUnwindSafe(|| factory.load(&context))).map_err(
            |payload| LoadError::Panicked {
                module: self.name.clone(),
                message: panic_message(payload.as_ref()),
            },
        )??;

        self.generation += 1;
        let module = LoadedModule { program, buffer: context.buffer, generation: self.generation };
        debug!(module = %self.name, generation = self.generation, "Loaded module");
        self.current = Some(module.clone());
        Ok(module)
    }

    /// Drop the current instance and load a new one
    pub fn reload(&mut self) -> Result<LoadedModule, LoadError> {
        self.invalidate();
        self.load()
    }

    /// The module to use for the next invocation, according to the policy
    pub fn acquire(&mut self) -> Result<LoadedModule, LoadError> {
        match (&self.current, self.policy) {
            (Some(module), ReloadPolicy::ResetOnly) => Ok(module.clone()),
            _ => self.load(),
        }
    }

    /// Forget the current instance; the next [`acquire`](Self::acquire) reloads.
    ///
    /// The dropped instance's buffer is reset so that its tracers go stale.
    pub fn invalidate(&mut self) {
        if let Some(module) = self.current.take() {
            module.buffer.reset();
            debug!(module = %self.name, generation = module.generation, "Invalidated module");
        }
    }

    /// The current instance, if loaded
    pub fn current(&self) -> Option<&LoadedModule> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CopyInstrumenter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn counting_factory(loads: Arc<AtomicUsize>) -> Arc<dyn ModuleFactory> {
        Arc::new(move |ctx: &ModuleContext| -> Result<SharedProgram, LoadError> {
            loads.fetch_add(1, Ordering::SeqCst);
            // Module-level statement executed at load time
            ctx.buffer.tracer().record(1u32);
            Ok(Arc::new(FnProgram::new("echo", |args: Vec<Value>, tracer: &Tracer| {
                tracer.record(2u32);
                Ok(Value::Array(args))
            })))
        })
    }

    #[test]
    fn test_reset_only_reuses_instance() {
        lino_common::logging::ensure_test_logging(None);
        let loads = Arc::new(AtomicUsize::new(0));
        let mut loader =
            InstrumentationLoader::new("echo", counting_factory(loads.clone()), "unused");

        let first = loader.acquire().unwrap();
        let second = loader.acquire().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(first.generation, second.generation);
        assert_eq!(first.buffer.len(), 1);
    }

    #[test]
    fn test_every_invocation_builds_fresh_buffers() {
        lino_common::logging::ensure_test_logging(None);
        let loads = Arc::new(AtomicUsize::new(0));
        let mut loader = InstrumentationLoader::new("echo", counting_factory(loads.clone()), "x")
            .with_policy(ReloadPolicy::EveryInvocation);

        let first = loader.acquire().unwrap();
        first.program.call(vec![], &first.buffer.tracer()).unwrap();
        let second = loader.acquire().unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(second.generation, 2);
        assert_eq!(second.buffer.len(), 1);
    }

    #[test]
    fn test_invalidate_stales_previous_tracers() {
        lino_common::logging::ensure_test_logging(None);
        let loads = Arc::new(AtomicUsize::new(0));
        let mut loader = InstrumentationLoader::new("echo", counting_factory(loads), "x");

        let module = loader.acquire().unwrap();
        let tracer = module.buffer.tracer();
        loader.invalidate();
        assert!(loader.current().is_none());
        assert!(!tracer.is_active());
    }

    #[test]
    fn test_factory_failures_are_load_errors() {
        lino_common::logging::ensure_test_logging(None);
        let refusing: Arc<dyn ModuleFactory> =
            Arc::new(|_: &ModuleContext| -> Result<SharedProgram, LoadError> {
                Err(LoadError::module("broken", "syntax error in instrumented source"))
            });
        let panicking: Arc<dyn ModuleFactory> =
            Arc::new(|_: &ModuleContext| -> Result<SharedProgram, LoadError> {
                panic!("import failed")
            });

        let mut loader = InstrumentationLoader::new("broken", refusing, "x");
        assert!(matches!(loader.load(), Err(LoadError::Module { .. })));

        let mut loader = InstrumentationLoader::new("broken", panicking, "x");
        match loader.load() {
            Err(LoadError::Panicked { message, .. }) => assert_eq!(message, "import failed"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(loader.generation(), 0);
    }

    #[test]
    fn test_instrumentation_runs_once() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("middle.src");
        let output = dir.path().join("instrumented").join("middle.src");
        std::fs::write(&source, "marked source").unwrap();

        let loads = Arc::new(AtomicUsize::new(0));
        let mut loader = InstrumentationLoader::new("middle", counting_factory(loads), "x")
            .with_instrumenter(
                Arc::new(CopyInstrumenter),
                InstrumentConfig::new(&source, &output, "rust"),
            );

        let module = loader.load().unwrap();
        assert!(output.exists());
        assert_eq!(module.buffer.source(), output.display().to_string());

        std::fs::remove_file(&output).unwrap();
        loader.reload().unwrap();
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_source_is_an_instrumentation_failure() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let mut loader = InstrumentationLoader::new("middle", counting_factory(loads.clone()), "x")
            .with_instrumenter(
                Arc::new(CopyInstrumenter),
                InstrumentConfig::new(dir.path().join("gone"), dir.path().join("out"), "rust"),
            );

        assert!(matches!(loader.acquire(), Err(LoadError::Instrumentation(_))));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }
}
