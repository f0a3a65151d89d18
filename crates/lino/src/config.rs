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

//! Session configuration file
//!
//! A TOML file holding defaults for the subcommands. Command line flags take
//! precedence over it.
//!
//! ```toml
//! [oracle]
//! timeout_secs = 2
//! converter = "csv"
//! archive_dir = "/tmp/lino-archive"
//!
//! [program]
//! path = "./build/middle"
//!
//! [subject]
//! name = "middle"
//! inputs = ["2,1,3", "1,2,3"]
//! lines = [7]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Result, WrapErr};
use lino_common::LineField;
use lino_engine::{BuiltinConverter, ReloadPolicy, Subject};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Oracle defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// Seconds per call
    pub timeout_secs: Option<u64>,
    /// Input converter
    pub converter: Option<BuiltinConverter>,
    /// Event file path
    pub events_path: Option<PathBuf>,
    /// Directory receiving `failing/` and `passing/` event files
    pub archive_dir: Option<PathBuf>,
    /// Module reload policy
    pub reload: Option<ReloadPolicy>,
    /// Position of the line id in event records
    pub line_field: Option<LineField>,
}

/// The external program under test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramSection {
    /// Executable
    pub path: Option<PathBuf>,
    /// Arguments placed before each input's arguments
    pub args: Vec<String>,
}

/// Instrumentation tool defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSection {
    /// Command template with `{source}` and `{output}` placeholders
    pub tool: Option<String>,
    /// Language tag
    pub language: Option<String>,
}

/// Contents of a session file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Oracle defaults
    pub oracle: OracleSection,
    /// Program under test
    pub program: ProgramSection,
    /// Instrumentation defaults
    pub instrument: InstrumentSection,
    /// Subject for batch trigger analysis
    pub subject: Option<Subject>,
}

impl SessionConfig {
    /// `~/.lino.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".lino.toml"))
    }

    /// Load `path`, or the default file if it exists, or defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load a session file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse config file as TOML: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).wrap_err("Failed to serialize config to TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lino_common::LineId;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_session() {
        lino_common::logging::ensure_test_logging(None);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(
            &path,
            r#"
[oracle]
timeout_secs = 3
converter = "csv"
reload = "every_invocation"
line_field = { from_end = 2 }

[program]
path = "./middle.sh"
args = ["--quiet"]

[subject]
name = "middle"
inputs = ["2,1,3", "1,2,3"]
lines = [7]
converter = "csv"
"#,
        )
        .unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.oracle.timeout_secs, Some(3));
        assert_eq!(config.oracle.converter, Some(BuiltinConverter::Csv));
        assert_eq!(config.oracle.reload, Some(ReloadPolicy::EveryInvocation));
        assert_eq!(config.oracle.line_field, Some(LineField::FromEnd(2)));
        assert_eq!(config.program.args, vec!["--quiet"]);

        let subject = config.subject.unwrap();
        assert_eq!(subject.lines, vec![LineId::new(7)]);
        assert_eq!(subject.inputs.len(), 2);
    }

    #[test]
    fn test_empty_session_is_default() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert!(SessionConfig::load(Path::new("/nonexistent/lino.toml")).is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = SessionConfig::default();
        config.oracle.timeout_secs = Some(5);
        config.program.path = Some(PathBuf::from("bin/put"));

        let parsed: SessionConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
