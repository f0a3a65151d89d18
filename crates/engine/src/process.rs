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

//! External instrumented programs.
//!
//! A [`ProcessProgram`] runs an executable whose instrumentation writes event
//! records to the file named by [`LINO_EVENTS_PATH`]. After the child exits,
//! its records are replayed into the caller's tracer, so the oracle sees the
//! same trace an in-process program would have produced.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::Arc,
    thread,
    time::Duration,
};

use lino_common::{env::LINO_EVENTS_PATH, LineField, Value};
use tracing::{debug, warn};

use crate::{
    EventFileStore, LoadError, ModuleContext, ModuleFactory, ProgramUnderTest, PutError,
    SharedProgram, Tracer,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An instrumented executable called with positional command line arguments
#[derive(Debug, Clone)]
pub struct ProcessProgram {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    events_path: PathBuf,
    line_field: LineField,
}

impl ProcessProgram {
    /// Run `program`; the child writes its events to `events_path`
    pub fn new(program: impl Into<PathBuf>, events_path: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            name,
            program,
            args: Vec::new(),
            events_path: events_path.into(),
            line_field: LineField::default(),
        }
    }

    /// Fixed arguments placed before the input arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Where the line id sits in the child's records
    pub fn with_line_field(mut self, line_field: LineField) -> Self {
        self.line_field = line_field;
        self
    }

    /// Event path of the child
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// A factory producing a fresh adapter for every load.
    ///
    /// The child's event file lives next to the oracle's, with a `.child`
    /// suffix, so the two never overwrite each other.
    pub fn factory(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        line_field: LineField,
    ) -> Arc<dyn ModuleFactory> {
        let program = program.into();
        Arc::new(move |context: &ModuleContext| -> Result<SharedProgram, LoadError> {
            let executable = context.instrumented_path.clone().unwrap_or_else(|| program.clone());
            let adapter = Self::new(executable, child_events_path(&context.events_path))
                .with_args(args.clone())
                .with_line_field(line_field);
            Ok(Arc::new(adapter))
        })
    }

    fn spawn(&self, args: &[Value]) -> Result<Child, PutError> {
        Command::new(&self.program)
            .args(&self.args)
            .args(args.iter().map(render_arg))
            .env(LINO_EVENTS_PATH, &self.events_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PutError::new("spawn", format!("{}: {e}", self.program.display())))
    }

    /// Feed the child's records to `tracer`; a malformed file replays nothing.
    ///
    /// The records executed before any cancellation, so they are delivered
    /// even when the call was cancelled.
    fn replay(&self, tracer: &Tracer) -> Result<usize, PutError> {
        let store = EventFileStore::new(&self.events_path).with_line_field(self.line_field);
        if !store.exists() {
            return Ok(0);
        }
        let lines = store.read_lines().map_err(|e| {
            warn!(program = %self.name, error = %e, "Unreadable child event file");
            PutError::new("events", e.to_string())
        })?;
        for line in &lines {
            tracer.record_delivered(*line);
        }
        Ok(lines.len())
    }
}

impl ProgramUnderTest for ProcessProgram {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: Vec<Value>, tracer: &Tracer) -> Result<Value, PutError> {
        EventFileStore::new(&self.events_path)
            .remove()
            .map_err(|e| PutError::new("events", e.to_string()))?;
        if let Some(parent) = self.events_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PutError::new("events", e.to_string()))?;
        }

        let mut child = self.spawn(&args)?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if tracer.is_cancelled() => {
                    // Best effort; the child may have exited in between.
                    let _ = child.kill();
                    let _ = child.wait();
                    // Lines flushed before the kill still count; an unreadable file
                    // is already logged and does not change the outcome.
                    let replayed = self.replay(tracer).unwrap_or_default();
                    debug!(program = %self.name, replayed, "Killed cancelled child");
                    return Err(PutError::new(PutError::TIMEOUT, "child killed after deadline"));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(PutError::new("wait", e.to_string())),
            }
        };

        let stdout = stdout.and_then(|handle| handle.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|handle| handle.join().ok()).unwrap_or_default();

        let replayed = self.replay(tracer)?;
        debug!(program = %self.name, %status, replayed, "Child finished");

        if status.success() {
            Ok(Value::String(stdout.trim().to_string()))
        } else {
            Err(PutError::new("exit", format!("{status}: {}", stderr.trim())))
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Strings are passed verbatim, everything else in its JSON form
fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `<events_path>.child`
pub fn child_events_path(events_path: &Path) -> PathBuf {
    let mut name = events_path.as_os_str().to_owned();
    name.push(".child");
    PathBuf::from(name)
}
