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

//! LINO - Line Oracle
//!
//! Decides, for candidate inputs, whether running a program drives it
//! through a given source line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::Result;

mod cmd;
mod config;

use config::SessionConfig;

/// Command-line interface for LINO
#[derive(Debug, Parser)]
#[command(name = "lino")]
#[command(about = "LINO - Line Oracle for automated debugging")]
#[command(version)]
pub struct Cli {
    /// Session file with defaults (default: ~/.lino.toml if present)
    #[arg(long, env = "LINO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily rotated file
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check whether inputs reach a line of an instrumented program
    Check(cmd::CheckArgs),
    /// Collect the inputs that reach each of several lines
    Trigger(cmd::TriggerArgs),
    /// Rank lines by suspiciousness over archived event files
    Analyze(cmd::AnalyzeArgs),
    /// Instrument a source file for line events
    Instrument(cmd::InstrumentArgs),
    /// Print the effective session file as TOML
    Config,
}

fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    lino_common::logging::init_logging("lino", cli.log_file)?;

    let session = SessionConfig::resolve(cli.config.as_deref())?;

    match &cli.command {
        Commands::Check(args) => cmd::check(args, &session),
        Commands::Trigger(args) => cmd::trigger(args, &session),
        Commands::Analyze(args) => cmd::analyze(args),
        Commands::Instrument(args) => cmd::instrument(args, &session),
        Commands::Config => {
            print!("{}", session.to_toml()?);
            Ok(())
        }
    }
}
