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

//! Values handed to a program under test.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use serde_json::Value;

/// The result of converting a raw candidate input for the program under test.
///
/// A [`ConvertedInput::Single`] value is passed as the only argument, while
/// [`ConvertedInput::Args`] is spread over the positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConvertedInput {
    /// Positional arguments, in parameter order
    Args(Vec<Value>),
    /// A single argument
    Single(Value),
}

impl ConvertedInput {
    /// Classify an untyped value: arrays become positional arguments,
    /// anything else is a single argument.
    pub fn detect(value: Value) -> Self {
        match value {
            Value::Array(args) => Self::Args(args),
            other => Self::Single(other),
        }
    }

    /// The argument list the program under test is called with
    pub fn into_args(self) -> Vec<Value> {
        match self {
            Self::Args(args) => args,
            Self::Single(value) => vec![value],
        }
    }

    /// Number of arguments the program under test receives
    pub fn arity(&self) -> usize {
        match self {
            Self::Args(args) => args.len(),
            Self::Single(_) => 1,
        }
    }
}

impl From<Value> for ConvertedInput {
    fn from(value: Value) -> Self {
        Self::detect(value)
    }
}

impl From<Vec<Value>> for ConvertedInput {
    fn from(args: Vec<Value>) -> Self {
        Self::Args(args)
    }
}

/// Raised by an input converter that cannot make sense of a candidate input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert input {input:?}: {reason}")]
pub struct ConvertError {
    /// The raw input
    pub input: String,
    /// Why the conversion failed
    pub reason: String,
}

impl ConvertError {
    /// Create a conversion error
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { input: input.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_spreads_arrays() {
        let converted = ConvertedInput::detect(json!([2, 1, 3]));
        assert_eq!(converted.arity(), 3);
        assert_eq!(converted.into_args(), vec![json!(2), json!(1), json!(3)]);
    }

    #[test]
    fn test_detect_keeps_scalars_whole() {
        let converted = ConvertedInput::detect(json!("<b>hi</b>"));
        assert_eq!(converted.arity(), 1);
        assert_eq!(converted.into_args(), vec![json!("<b>hi</b>")]);
    }
}
