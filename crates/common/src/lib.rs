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

//! LINO Common - Shared functionality for LINO components
//!
//! This crate provides the types shared by the oracle engine, the command line
//! front-end and the integration tests: line identifiers and events, the event
//! file record format, oracle verdicts, converted PUT inputs, environment
//! variable names and the logging setup.

/// Common types used throughout LINO including line events, verdicts and event records
pub mod types;

/// Environment variable names understood by LINO components
pub mod env;
/// Logging setup and utilities for consistent logging across LINO components
pub mod logging;
/// Helpers for isolated test environments
pub mod test_utils;

pub use types::*;
