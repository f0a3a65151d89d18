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

//! `lino check`: verdicts for individual inputs

use std::{path::PathBuf, sync::Arc};

use clap::{Args, ValueEnum};
use eyre::{bail, Result};
use lino_common::{LineId, Verdict};
use lino_engine::{
    default_resource_path, LineOracle, OracleConfig, SpectrumAnalyzer, VerdictStrategy,
    EVENT_FILE_NAME,
};
use tracing::info;

use super::{line_field, program_name, ProgramArgs};
use crate::config::SessionConfig;

/// How a trace becomes a verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// FAILING iff the target line was recorded
    #[default]
    Direct,
    /// FAILING iff the target line is in the run's coverage set
    Coverage,
}

/// Arguments of `lino check`
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Target line
    #[arg(long)]
    pub line: u32,

    #[command(flatten)]
    pub program: ProgramArgs,

    /// Event file (default: `<temp>/lino/<program>/event_file`)
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Verdict strategy
    #[arg(long, value_enum, default_value_t = Strategy::Direct)]
    pub strategy: Strategy,

    /// Archive event files under `<DIR>/failing` and `<DIR>/passing`
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Print one JSON evaluation per input
    #[arg(long)]
    pub json: bool,

    /// Inputs to evaluate
    #[arg(required = true)]
    pub inputs: Vec<String>,
}

/// Evaluate every input; fails if any verdict is UNDEFINED
pub fn check(args: &CheckArgs, session: &SessionConfig) -> Result<()> {
    let name = program_name(&args.program, session);
    let events = args
        .events
        .clone()
        .or_else(|| session.oracle.events_path.clone())
        .unwrap_or_else(|| default_resource_path(&name).join(EVENT_FILE_NAME));

    let strategy = match args.strategy {
        Strategy::Direct => VerdictStrategy::DirectParse,
        Strategy::Coverage => VerdictStrategy::Coverage(Arc::new(
            SpectrumAnalyzer::new().with_line_field(line_field(session)),
        )),
    };

    let instrumented_dir = events
        .parent()
        .map(|dir| dir.join("instrumented"))
        .unwrap_or_else(|| default_resource_path(&name).join("instrumented"));
    let config = OracleConfig::new(&name, args.program.factory(session)?, LineId::new(args.line))
        .with_timeout_secs(args.program.timeout_secs(session))
        .with_events_path(&events)
        .with_line_field(line_field(session))
        .with_strategy(strategy)
        .with_converter(Arc::new(args.program.converter(session)));
    let mut config = args.program.configure(config, session, &instrumented_dir)?;
    if let Some(dir) = &args.archive {
        config = config.with_archive_dir(dir);
    }

    let oracle = LineOracle::new(config);
    let mut undefined = 0usize;
    for input in &args.inputs {
        let evaluation = oracle.evaluate_detailed(input)?;
        if evaluation.verdict == Verdict::Undefined {
            undefined += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&evaluation)?);
        } else {
            println!("{}\t{input}", evaluation.verdict);
        }
    }

    info!(inputs = args.inputs.len(), undefined, "Check finished");
    if undefined > 0 {
        bail!("{undefined} of {} input(s) were UNDEFINED", args.inputs.len());
    }
    Ok(())
}
