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

//! Input converters: raw candidate input to program arguments.

use std::{fmt, str::FromStr};

use lino_common::{ConvertError, ConvertedInput, Value};
use serde::{Deserialize, Serialize};

/// Turns a raw candidate input into the arguments of the program under test
pub trait InputConverter: Send + Sync {
    /// Convert `raw`
    fn convert(&self, raw: &str) -> Result<ConvertedInput, ConvertError>;
}

impl<F> InputConverter for F
where
    F: Fn(&str) -> Result<ConvertedInput, ConvertError> + Send + Sync,
{
    fn convert(&self, raw: &str) -> Result<ConvertedInput, ConvertError> {
        self(raw)
    }
}

/// Integers separated by a fixed character, or by whitespace.
///
/// `"2,1,3"` becomes three positional integer arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedIntegers {
    separator: Option<char>,
}

impl DelimitedIntegers {
    /// Comma separated
    pub const fn comma() -> Self {
        Self { separator: Some(',') }
    }

    /// Whitespace separated
    pub const fn whitespace() -> Self {
        Self { separator: None }
    }

    /// Custom separator
    pub const fn with_separator(separator: char) -> Self {
        Self { separator: Some(separator) }
    }
}

impl InputConverter for DelimitedIntegers {
    fn convert(&self, raw: &str) -> Result<ConvertedInput, ConvertError> {
        let parse = |token: &str| {
            token
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| ConvertError::new(raw, format!("{token:?} is not an integer: {e}")))
        };
        let args = match self.separator {
            Some(separator) => raw.trim().split(separator).map(parse).collect::<Result<_, _>>()?,
            None => raw.split_whitespace().map(parse).collect::<Result<_, _>>()?,
        };
        Ok(ConvertedInput::Args(args))
    }
}

/// Whitespace separated words, passed as string arguments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Words;

impl InputConverter for Words {
    fn convert(&self, raw: &str) -> Result<ConvertedInput, ConvertError> {
        Ok(ConvertedInput::Args(raw.split_whitespace().map(Value::from).collect()))
    }
}

/// The whole input as a single string argument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawString;

impl InputConverter for RawString {
    fn convert(&self, raw: &str) -> Result<ConvertedInput, ConvertError> {
        Ok(ConvertedInput::Single(Value::from(raw)))
    }
}

/// Converters selectable by name from configuration and the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinConverter {
    /// [`DelimitedIntegers::comma`]
    Csv,
    /// [`DelimitedIntegers::whitespace`]
    Ints,
    /// [`Words`]
    Words,
    /// [`RawString`]
    #[default]
    Raw,
}

impl BuiltinConverter {
    /// Configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ints => "ints",
            Self::Words => "words",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for BuiltinConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinConverter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ints" => Ok(Self::Ints),
            "words" => Ok(Self::Words),
            "raw" => Ok(Self::Raw),
            other => Err(format!("unknown converter {other:?} (expected csv, ints, words or raw)")),
        }
    }
}

impl InputConverter for BuiltinConverter {
    fn convert(&self, raw: &str) -> Result<ConvertedInput, ConvertError> {
        match self {
            Self::Csv => DelimitedIntegers::comma().convert(raw),
            Self::Ints => DelimitedIntegers::whitespace().convert(raw),
            Self::Words => Words.convert(raw),
            Self::Raw => RawString.convert(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_integers() {
        let converted = BuiltinConverter::Csv.convert("2, 1,3").unwrap();
        assert_eq!(converted.into_args(), vec![json!(2), json!(1), json!(3)]);

        let err = BuiltinConverter::Csv.convert("2,x,3").unwrap_err();
        assert_eq!(err.input, "2,x,3");
        assert!(err.reason.contains("\"x\""));
    }

    #[test]
    fn test_whitespace_and_words() {
        assert_eq!(
            DelimitedIntegers::whitespace().convert(" 4  -5 ").unwrap().into_args(),
            vec![json!(4), json!(-5)]
        );
        assert_eq!(
            Words.convert("a  <b>").unwrap(),
            ConvertedInput::Args(vec![json!("a"), json!("<b>")])
        );
    }

    #[test]
    fn test_raw_and_closures() {
        assert_eq!(
            RawString.convert("<b>\"x\"</b>").unwrap(),
            ConvertedInput::Single(json!("<b>\"x\"</b>"))
        );

        let doubled = |raw: &str| -> Result<ConvertedInput, ConvertError> {
            Ok(ConvertedInput::Single(json!(raw.repeat(2))))
        };
        assert_eq!(doubled.convert("ab").unwrap().into_args(), vec![json!("abab")]);
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!("CSV".parse::<BuiltinConverter>().unwrap(), BuiltinConverter::Csv);
        assert_eq!(BuiltinConverter::Words.to_string(), "words");
        assert!("yaml".parse::<BuiltinConverter>().is_err());
    }
}
