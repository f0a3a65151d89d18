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

//! Environment variable name constants for LINO configuration.
//!
//! # Environment Variables
//!
//! - [`LINO_EVENTS_PATH`] - Where an instrumented external program writes its events
//! - [`LINO_LOG_DIR`] - Overrides the directory used for file logging

/// Environment variable through which an instrumented *external* program learns
/// where to write its event file.
///
/// In-process programs never read this variable: they receive the destination
/// explicitly through their tracer. Only the process adapter in `lino-engine`
/// sets it, on the child's environment, never on the current process.
pub const LINO_EVENTS_PATH: &str = "LINO_EVENTS_PATH";

/// Environment variable for overriding the log directory.
///
/// # Default
///
/// When not set, logs are written to `<system temp>/lino-logs/<component>`.
pub const LINO_LOG_DIR: &str = "LINO_LOG_DIR";
