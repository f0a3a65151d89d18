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

//! Command modules for the LINO CLI

pub mod analyze;
pub mod check;
pub mod instrument;
pub mod trigger;

pub use analyze::{analyze, AnalyzeArgs};
pub use check::{check, CheckArgs};
pub use instrument::{instrument, InstrumentArgs};
pub use trigger::{trigger, TriggerArgs};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Args;
use eyre::{eyre, Result};
use lino_common::LineField;
use lino_engine::{
    BuiltinConverter, CommandInstrumenter, CopyInstrumenter, InstrumentConfig, Instrumenter,
    ModuleFactory, OracleConfig, ProcessProgram,
};

use crate::config::SessionConfig;

/// Options shared by the commands that run a program
#[derive(Debug, Clone, Args)]
pub struct ProgramArgs {
    /// Instrumented executable (default: `[program].path` of the session file)
    #[arg(long)]
    pub program: Option<PathBuf>,

    /// Source to instrument before loading; the instrumented copy is what runs
    /// (default: `[subject].put_path`)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Argument placed before each input's arguments (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Seconds per call; 0 disables the deadline
    #[arg(long)]
    pub timeout: Option<u64>,

    /// How inputs become arguments: csv, ints, words or raw
    #[arg(long)]
    pub converter: Option<BuiltinConverter>,
}

impl ProgramArgs {
    /// Process factory for the program, flags first, then the session file.
    ///
    /// When a source is instrumented, the instrumented copy replaces the program.
    pub fn factory(&self, session: &SessionConfig) -> Result<Arc<dyn ModuleFactory>> {
        let program = self
            .program
            .clone()
            .or_else(|| session.program.path.clone())
            .or_else(|| self.source(session))
            .ok_or_else(|| {
                eyre!("no program given; pass --program or --source, or set [program].path")
            })?;
        let args = if self.args.is_empty() { session.program.args.clone() } else { self.args.clone() };
        Ok(ProcessProgram::factory(program, args, line_field(session)))
    }

    /// Effective source to instrument
    pub fn source(&self, session: &SessionConfig) -> Option<PathBuf> {
        self.source
            .clone()
            .or_else(|| session.subject.as_ref().and_then(|subject| subject.put_path.clone()))
    }

    /// Effective timeout
    pub fn timeout_secs(&self, session: &SessionConfig) -> u64 {
        self.timeout
            .or(session.oracle.timeout_secs)
            .unwrap_or(lino_engine::DEFAULT_TIMEOUT_SECS)
    }

    /// Effective converter
    pub fn converter(&self, session: &SessionConfig) -> BuiltinConverter {
        self.converter.or(session.oracle.converter).unwrap_or_default()
    }

    /// Session overrides every oracle built by the CLI shares.
    ///
    /// Installs the source under `instrumented_dir` when there is one.
    pub fn configure(
        &self,
        mut config: OracleConfig,
        session: &SessionConfig,
        instrumented_dir: &Path,
    ) -> Result<OracleConfig> {
        if let Some(reload) = session.oracle.reload {
            config = config.with_reload(reload);
        }
        if let Some(dir) = &session.oracle.archive_dir {
            config = config.with_archive_dir(dir);
        }
        if let Some(source) = self.source(session) {
            let file_name = source.file_name().map(PathBuf::from).unwrap_or_else(|| "put".into());
            let output = instrumented_dir.join(file_name);
            config = config.with_instrumentation(
                instrumenter(None, session)?,
                InstrumentConfig::new(source, output, language(None, session)),
            );
        }
        Ok(config)
    }
}

/// Instrumenter for `tool`, else `[instrument].tool`, else a plain copy
pub fn instrumenter(tool: Option<&str>, session: &SessionConfig) -> Result<Arc<dyn Instrumenter>> {
    let instrumenter: Arc<dyn Instrumenter> = match tool.or(session.instrument.tool.as_deref()) {
        Some(template) => Arc::new(CommandInstrumenter::from_template(template)?),
        None => Arc::new(CopyInstrumenter),
    };
    Ok(instrumenter)
}

/// Language tag, else `[instrument].language`, else `python`
pub fn language(language: Option<&str>, session: &SessionConfig) -> String {
    language
        .or(session.instrument.language.as_deref())
        .unwrap_or("python")
        .to_string()
}

/// Effective line field
pub fn line_field(session: &SessionConfig) -> LineField {
    session.oracle.line_field.unwrap_or_default()
}

/// File name friendly name of a program
pub fn program_name(args: &ProgramArgs, session: &SessionConfig) -> String {
    args.program
        .clone()
        .or_else(|| session.program.path.clone())
        .or_else(|| args.source(session))
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "put".to_string())
}
