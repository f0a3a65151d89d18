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

//! Source code instrumentation
//!
//! Marker insertion itself is performed by an external tool; this module only
//! describes *what* to instrument ([`InstrumentConfig`]) and drives the tool
//! through the [`Instrumenter`] trait. Two drivers are provided:
//!
//! - [`CommandInstrumenter`] runs an external marker-insertion command
//! - [`CopyInstrumenter`] installs a source that already carries markers

mod command;
pub use command::*;

use std::{fmt, io, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of predicate the instrumentation emits events for.
///
/// Only line predicates are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateKind {
    /// One event per executed source line
    #[default]
    Line,
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => f.write_str("line"),
        }
    }
}

/// What to instrument and where to put the result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Original source of the program under test
    pub source_path: PathBuf,
    /// Where the instrumented variant is written
    pub output_path: PathBuf,
    /// Language tag understood by the instrumentation tool
    pub language: String,
    /// Predicate kind
    #[serde(default)]
    pub predicate: PredicateKind,
}

impl InstrumentConfig {
    /// Line instrumentation of `source_path` into `output_path`
    pub fn new(
        source_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            language: language.into(),
            predicate: PredicateKind::Line,
        }
    }
}

/// Errors raised while producing an instrumented source
#[derive(Debug, Error)]
pub enum InstrumentError {
    /// The source to instrument does not exist
    #[error("source {0} does not exist")]
    MissingSource(PathBuf),

    /// The instrumentation command could not be started
    #[error("failed to run instrumentation tool `{command}`: {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The instrumentation command exited unsuccessfully
    #[error("instrumentation tool `{command}` failed ({status}): {stderr}")]
    ToolFailed {
        /// Command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The tool reported success but produced nothing
    #[error("instrumentation produced no output at {0}")]
    MissingOutput(PathBuf),

    /// Copying or preparing files failed
    #[error("instrumentation I/O error on {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A command template without a program
    #[error("empty instrumentation command template")]
    EmptyTemplate,

    /// A command template with unbalanced quotes or a dangling escape
    #[error("malformed instrumentation command template: {0}")]
    MalformedTemplate(String),
}

/// Produces an instrumented variant of a program's source.
///
/// Implementations must be idempotent and overwrite any previous output.
pub trait Instrumenter: fmt::Debug + Send + Sync {
    /// Instrument `config.source_path` into `config.output_path`
    fn instrument(&self, config: &InstrumentConfig) -> Result<(), InstrumentError>;
}
