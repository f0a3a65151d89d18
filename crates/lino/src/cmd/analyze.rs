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

//! `lino analyze`: spectrum ranking over archived runs

use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use lino_engine::{CoverageMode, SpectrumAnalyzer};

/// Arguments of `lino analyze`
#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Directory of event files from failing runs
    #[arg(long)]
    pub failing: PathBuf,

    /// Directory of event files from passing runs
    #[arg(long)]
    pub passing: PathBuf,

    /// Keep only lines whose Ochiai score reaches this value
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Print at most this many lines
    #[arg(long)]
    pub top: Option<usize>,
}

/// Print `line<TAB>score<TAB>failed<TAB>passed`, most suspicious first
pub fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let mode = match args.threshold {
        Some(threshold) => CoverageMode::Suspicious { threshold },
        None => CoverageMode::FailingSet,
    };
    let coverage = SpectrumAnalyzer::new().with_mode(mode).analyze_dir(&args.failing, &args.passing)?;

    let ranking = coverage.ranking();
    let shown = args.top.unwrap_or(ranking.len());
    for (line, score) in ranking.into_iter().take(shown) {
        let spectrum = coverage.spectrum(line).unwrap_or_default();
        println!("{line}\t{score:.4}\t{}\t{}", spectrum.failed, spectrum.passed);
    }
    Ok(())
}
