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

//! Instrumentation drivers.

use std::{fs, path::Path, process::Command};

use tracing::{debug, info};

use super::{InstrumentConfig, InstrumentError, Instrumenter};

/// Runs an external marker-insertion tool.
///
/// The command is given as a template; the placeholders `{source}`,
/// `{output}`, `{language}` and `{predicate}` are substituted per argument.
///
/// ```text
/// sflkit-instrument --language {language} --events {predicate} {source} {output}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInstrumenter {
    program: String,
    args: Vec<String>,
}

impl CommandInstrumenter {
    /// Create from an explicit program and argument template
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Parse a command template with shell-style quoting
    pub fn from_template(template: &str) -> Result<Self, InstrumentError> {
        let parts = shlex::split(template)
            .ok_or_else(|| InstrumentError::MalformedTemplate(template.to_string()))?;
        let mut parts = parts.into_iter();
        let program = parts.next().ok_or(InstrumentError::EmptyTemplate)?;
        Ok(Self { program, args: parts.collect() })
    }

    fn render(&self, config: &InstrumentConfig) -> Vec<String> {
        let source = config.source_path.to_string_lossy();
        let output = config.output_path.to_string_lossy();
        let predicate = config.predicate.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source)
                    .replace("{output}", &output)
                    .replace("{language}", &config.language)
                    .replace("{predicate}", &predicate)
            })
            .collect()
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Instrumenter for CommandInstrumenter {
    fn instrument(&self, config: &InstrumentConfig) -> Result<(), InstrumentError> {
        ensure_source(&config.source_path)?;
        prepare_output(&config.output_path)?;

        let args = self.render(config);
        let command = self.command_line(&args);
        debug!(%command, "running instrumentation tool");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| InstrumentError::Spawn { command: command.clone(), source })?;

        if !output.status.success() {
            return Err(InstrumentError::ToolFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !config.output_path.exists() {
            return Err(InstrumentError::MissingOutput(config.output_path.clone()));
        }

        info!(
            source = %config.source_path.display(),
            output = %config.output_path.display(),
            "Instrumented source"
        );
        Ok(())
    }
}

/// Installs a source that already carries line markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyInstrumenter;

impl Instrumenter for CopyInstrumenter {
    fn instrument(&self, config: &InstrumentConfig) -> Result<(), InstrumentError> {
        ensure_source(&config.source_path)?;
        prepare_output(&config.output_path)?;

        if config.source_path != config.output_path {
            fs::copy(&config.source_path, &config.output_path).map_err(|source| {
                InstrumentError::Io { path: config.output_path.clone(), source }
            })?;
        }

        debug!(output = %config.output_path.display(), "Installed pre-instrumented source");
        Ok(())
    }
}

fn ensure_source(path: &Path) -> Result<(), InstrumentError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(InstrumentError::MissingSource(path.to_path_buf()))
    }
}

/// Create the output directory and drop any previous output
fn prepare_output(output: &Path) -> Result<(), InstrumentError> {
    let io_err = |source| InstrumentError::Io { path: output.to_path_buf(), source };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    match fs::remove_file(output) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(e)),
    }
}
