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

//! Test utilities for integration tests

use std::{path::Path, sync::Arc};

use lino_common::LineId;
use lino_engine::{BuiltinConverter, LineOracle, ModuleFactory, OracleConfig};

/// Path utilities for test resources
pub mod paths {
    use std::path::PathBuf;

    /// `<workspace>/testdata/events`
    pub fn events_dir() -> PathBuf {
        lino_common::test_utils::get_testdata_events_dir()
    }
}

/// Initialization utilities for tests
pub mod init {
    /// Initialize logging for a test
    pub fn init_test_environment() {
        lino_common::logging::ensure_test_logging(None);
    }
}

/// A line oracle for `factory` with its event file inside `dir`
pub fn line_oracle(
    name: &str,
    factory: Arc<dyn ModuleFactory>,
    target: u32,
    converter: BuiltinConverter,
    dir: &Path,
) -> LineOracle {
    LineOracle::new(line_config(name, factory, target, converter, dir))
}

/// The configuration [`line_oracle`] uses, for tests that tweak it
pub fn line_config(
    name: &str,
    factory: Arc<dyn ModuleFactory>,
    target: u32,
    converter: BuiltinConverter,
    dir: &Path,
) -> OracleConfig {
    OracleConfig::new(name, factory, LineId::new(target))
        .with_events_path(dir.join(name).join("event_file"))
        .with_converter(Arc::new(converter))
}
