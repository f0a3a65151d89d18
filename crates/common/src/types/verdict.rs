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

//! Oracle verdicts.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Classification of one oracle evaluation.
///
/// [`Verdict::Undefined`] means the measurement itself failed. It is never a
/// statement about the program under test and must not be folded into
/// [`Verdict::Passing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The behavior of interest (e.g. the target line) was not observed
    Passing,
    /// The behavior of interest was observed
    Failing,
    /// The invocation could not be evaluated
    Undefined,
}

impl Verdict {
    /// Is this a failing verdict?
    pub fn is_failing(self) -> bool {
        self == Self::Failing
    }

    /// Is this a passing verdict?
    pub fn is_passing(self) -> bool {
        self == Self::Passing
    }

    /// Is this an inconclusive verdict?
    pub fn is_undefined(self) -> bool {
        self == Self::Undefined
    }

    /// Upper-case label used in reports and on the command line
    pub fn label(self) -> &'static str {
        match self {
            Self::Passing => "PASSING",
            Self::Failing => "FAILING",
            Self::Undefined => "UNDEFINED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passing" | "pass" | "no_bug" => Ok(Self::Passing),
            "failing" | "fail" | "bug" => Ok(Self::Failing),
            "undefined" | "undef" => Ok(Self::Undefined),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_labels_roundtrip_through_from_str() {
        for verdict in [Verdict::Passing, Verdict::Failing, Verdict::Undefined] {
            assert_eq!(verdict.label().parse::<Verdict>().unwrap(), verdict);
        }
        assert_eq!("BUG".parse::<Verdict>().unwrap(), Verdict::Failing);
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_verdict_serde_uses_labels() {
        assert_eq!(serde_json::to_string(&Verdict::Undefined).unwrap(), "\"UNDEFINED\"");
    }
}
