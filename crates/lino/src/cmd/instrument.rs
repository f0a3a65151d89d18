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

//! `lino instrument`: produce a line-instrumented copy of a source file

use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use lino_engine::{InstrumentConfig, Instrumenter};
use tracing::info;

use super::{instrumenter, language};
use crate::config::SessionConfig;

/// Arguments of `lino instrument`
#[derive(Debug, Clone, Args)]
pub struct InstrumentArgs {
    /// Source file
    #[arg(long)]
    pub source: PathBuf,

    /// Instrumented output
    #[arg(long)]
    pub output: PathBuf,

    /// Tool command template using `{source}`, `{output}`, `{language}`
    /// and `{predicate}` (default: `[instrument].tool`, else a plain copy)
    #[arg(long)]
    pub tool: Option<String>,

    /// Language tag passed to the tool
    #[arg(long)]
    pub language: Option<String>,
}

/// Instrument `--source` into `--output`
pub fn instrument(args: &InstrumentArgs, session: &SessionConfig) -> Result<()> {
    let config = InstrumentConfig::new(
        &args.source,
        &args.output,
        language(args.language.as_deref(), session),
    );
    instrumenter(args.tool.as_deref(), session)?.instrument(&config)?;

    info!(output = %args.output.display(), "Instrumented");
    println!("{}", args.output.display());
    Ok(())
}
