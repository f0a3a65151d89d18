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

//! Core data types shared across LINO crates.
//!
//! - [`LineId`] / [`LineEvent`] - what instrumented code records
//! - [`EventRecord`] / [`LineField`] - the on-disk event file format
//! - [`Verdict`] - the oracle's output classification
//! - [`ConvertedInput`] - what an input converter hands to the program under test

mod line;
pub use line::*;

mod record;
pub use record::*;

mod value;
pub use value::*;

mod verdict;
pub use verdict::*;
