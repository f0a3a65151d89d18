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

//! LINO Engine - line-coverage oracles for automated debugging
//!
//! Instrumented programs report executed lines to a [`TraceBuffer`]. A
//! [`LineOracle`] runs such a program under a [`TimeoutGuard`], dumps the trace
//! to an event file and decides whether the target line was reached.

pub mod batch;
pub use batch::*;

pub mod coverage;
pub use coverage::*;

pub mod instrumentation;
pub use instrumentation::*;

pub mod loader;
pub use loader::*;

pub mod oracle;
pub use oracle::*;

pub mod process;
pub use process::*;

pub mod store;
pub use store::*;

pub mod timeout;
pub use timeout::*;

pub mod trace;
pub use trace::*;
