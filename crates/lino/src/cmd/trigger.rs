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

//! `lino trigger`: which inputs reach which lines

use std::{fs, path::PathBuf, sync::Arc};

use clap::Args;
use eyre::{eyre, Result, WrapErr};
use lino_common::LineId;
use lino_engine::{check_trigger, default_resource_path, LineOracle, OracleConfig, EVENT_FILE_NAME};

use super::{line_field, program_name, ProgramArgs};
use crate::config::SessionConfig;

/// Arguments of `lino trigger`
#[derive(Debug, Clone, Args)]
pub struct TriggerArgs {
    /// Lines to check (default: `[subject].lines`)
    #[arg(long, value_delimiter = ',')]
    pub lines: Vec<u32>,

    /// File with one input per line (default: `[subject].inputs`)
    #[arg(long)]
    pub inputs: Option<PathBuf>,

    /// Write `<line>_line_triggered.txt` files into this directory
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Directory holding one event file per line (default: `<temp>/lino/<program>`)
    #[arg(long)]
    pub resources: Option<PathBuf>,

    #[command(flatten)]
    pub program: ProgramArgs,
}

/// Run the batch and print the report as JSON
pub fn trigger(args: &TriggerArgs, session: &SessionConfig) -> Result<()> {
    let subject = session.subject.as_ref();

    let lines: Vec<LineId> = if args.lines.is_empty() {
        subject.map(|s| s.lines.clone()).unwrap_or_default()
    } else {
        args.lines.iter().copied().map(LineId::new).collect()
    };
    if lines.is_empty() {
        return Err(eyre!("no lines given; pass --lines or set [subject].lines"));
    }

    let inputs = match &args.inputs {
        Some(path) => read_inputs(path)?,
        None => subject.map(|s| s.inputs.clone()).unwrap_or_default(),
    };

    let converter = match (args.program.converter.or(session.oracle.converter), subject) {
        (Some(converter), _) => converter,
        (None, Some(subject)) => subject.converter,
        (None, None) => Default::default(),
    };

    let name = match subject {
        Some(subject) if args.program.program.is_none() => subject.name.clone(),
        _ => program_name(&args.program, session),
    };
    let resources = args.resources.clone().unwrap_or_else(|| default_resource_path(&name));
    let factory = args.program.factory(session)?;
    let timeout = args.program.timeout_secs(session);

    let report = check_trigger(&lines, &inputs, |line| {
        let config = OracleConfig::new(format!("{name}-{line}"), factory.clone(), line)
            .with_timeout_secs(timeout)
            .with_events_path(resources.join(format!("{line}_{EVENT_FILE_NAME}")))
            .with_line_field(line_field(session))
            .with_converter(Arc::new(converter));
        let instrumented_dir = resources.join("instrumented").join(line.to_string());
        Ok(LineOracle::new(args.program.configure(config, session, &instrumented_dir)?))
    })?;

    if let Some(out) = &args.out {
        report.write_ground_truth(out)?;
    }
    println!("{}", report.to_json()?);
    Ok(())
}

/// Non-empty lines of `path`
fn read_inputs(path: &std::path::Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read inputs from {}", path.display()))?;
    Ok(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
}
