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

//! Test utilities for locating shared test data.

use std::path::PathBuf;

/// Get the workspace root directory
pub fn get_workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Get the testdata directory (`<workspace>/testdata`)
pub fn get_testdata_root() -> PathBuf {
    get_workspace_root().join("testdata")
}

/// Get the directory holding archived sample event files
/// (`<workspace>/testdata/events`)
pub fn get_testdata_events_dir() -> PathBuf {
    get_testdata_root().join("events")
}
