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

//! Oracles: from a candidate input to a [`Verdict`].
//!
//! - [`LineOracle`] reports whether the target line executed.
//! - [`FunctionalOracle`] compares the program against a reference program.
//! - [`FailureOracle`] only looks at whether the program failed.
//!
//! [`OracleBuilder::construct`] picks one of them from the options given.

mod config;
mod construct;
mod converter;
mod failure;
mod functional;
mod line;

pub use config::*;
pub use construct::*;
pub use converter::*;
pub use failure::*;
pub use functional::*;
pub use line::*;

use std::{collections::HashMap, sync::Arc};

use lino_common::{ConvertError, Value, Verdict};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::{GuardError, PutError, SharedProgram, TimeoutGuard, Tracer};

/// Decides the verdict of a candidate input
pub trait Oracle: Send + Sync {
    /// Evaluate `input`
    fn evaluate(&self, input: &str) -> Result<Verdict, OracleError>;
}

/// Shared handle to an oracle
pub type SharedOracle = Arc<dyn Oracle>;

impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    fn evaluate(&self, input: &str) -> Result<Verdict, OracleError> {
        (**self).evaluate(input)
    }
}

/// Errors an oracle returns instead of a verdict
#[derive(Debug, Error)]
pub enum OracleError {
    /// The input converter rejected the input
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The oracle was called from inside a guarded call
    #[error("oracle evaluated inside a guarded call; nested timeouts are not supported")]
    NestedGuard,
}

/// Maps program failure kinds to verdicts.
///
/// Kinds without a definition get the fallback verdict. With no definitions
/// at all every failure is FAILING.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPolicy {
    /// Failure kind to verdict
    #[serde(default)]
    pub definitions: HashMap<String, Verdict>,
    /// Verdict for undefined kinds when `definitions` is not empty
    #[serde(default = "default_fallback")]
    pub fallback: Verdict,
}

fn default_fallback() -> Verdict {
    Verdict::Undefined
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self { definitions: HashMap::new(), fallback: default_fallback() }
    }
}

impl ErrorPolicy {
    /// Policy from `(kind, verdict)` pairs
    pub fn new<K: Into<String>>(definitions: impl IntoIterator<Item = (K, Verdict)>) -> Self {
        Self {
            definitions: definitions.into_iter().map(|(kind, v)| (kind.into(), v)).collect(),
            ..Self::default()
        }
    }

    /// Add one definition
    pub fn define(mut self, kind: impl Into<String>, verdict: Verdict) -> Self {
        self.definitions.insert(kind.into(), verdict);
        self
    }

    /// Set the fallback for undefined kinds
    pub fn with_fallback(mut self, fallback: Verdict) -> Self {
        self.fallback = fallback;
        self
    }

    /// Verdict for failures without a definition
    pub fn default_verdict(&self) -> Verdict {
        if self.definitions.is_empty() {
            Verdict::Failing
        } else {
            self.fallback
        }
    }

    /// Verdict for `error`
    pub fn classify(&self, error: &PutError) -> Verdict {
        self.definitions.get(&error.kind).copied().unwrap_or_else(|| self.default_verdict())
    }
}

/// Call `program` under `guard`.
///
/// Timeouts and panics become [`PutError`]s; only harness problems are
/// returned as [`GuardError`].
pub(crate) fn call_guarded(
    guard: TimeoutGuard,
    program: &SharedProgram,
    args: Vec<Value>,
    tracer: Tracer,
) -> Result<Result<Value, PutError>, GuardError> {
    let program = program.clone();
    let cancel = tracer.cancel_token().clone();
    match guard.run(&cancel, move || program.call(args, &tracer)) {
        Ok(result) => Ok(result),
        Err(GuardError::TimedOut { secs }) => Ok(Err(PutError::timeout(secs))),
        Err(GuardError::Panicked(message)) => Ok(Err(PutError::panic(message))),
        Err(e) => Err(e),
    }
}

/// How a guarded evaluation ended
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed,
    Failed(PutError),
    Aborted(GuardError),
}

impl Outcome {
    /// Nesting is the caller's mistake; anything else cannot be evaluated.
    pub(crate) fn aborted(error: GuardError) -> Result<Self, OracleError> {
        match error {
            GuardError::Nested => Err(OracleError::NestedGuard),
            other => Ok(Self::Aborted(other)),
        }
    }

    /// Verdict under `policy`
    pub(crate) fn verdict(self, input: &str, policy: &ErrorPolicy) -> Verdict {
        match self {
            Self::Completed => Verdict::Passing,
            Self::Failed(failure) => {
                let verdict = policy.classify(&failure);
                debug!(%input, %failure, %verdict, "Program failed");
                verdict
            }
            Self::Aborted(e) => {
                error!(%input, error = %e, "Evaluation aborted, verdict is UNDEFINED");
                Verdict::Undefined
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_policy_fails_everything() {
        let policy = ErrorPolicy::default();
        assert_eq!(policy.default_verdict(), Verdict::Failing);
        assert_eq!(policy.classify(&PutError::timeout(1)), Verdict::Failing);
    }

    #[test]
    fn test_defined_kinds_and_fallback() {
        let policy = ErrorPolicy::new([("ValueError", Verdict::Failing)])
            .define(PutError::TIMEOUT, Verdict::Undefined);

        assert_eq!(policy.classify(&PutError::new("ValueError", "bad")), Verdict::Failing);
        assert_eq!(policy.classify(&PutError::timeout(1)), Verdict::Undefined);
        assert_eq!(policy.classify(&PutError::panic("x")), Verdict::Undefined);

        let lenient = policy.with_fallback(Verdict::Passing);
        assert_eq!(lenient.classify(&PutError::panic("x")), Verdict::Passing);
    }
}
