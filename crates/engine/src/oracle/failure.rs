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

//! Failure-only oracle.

use lino_common::{Value, Verdict};
use parking_lot::Mutex;

use super::{call_guarded, ErrorPolicy, Oracle, OracleError, Outcome};
use crate::{SharedProgram, TimeoutGuard, TraceBuffer};

/// Calls the program with the raw input string; only failures matter.
pub struct FailureOracle {
    program: SharedProgram,
    policy: ErrorPolicy,
    guard: TimeoutGuard,
    buffer: Mutex<TraceBuffer>,
}

impl std::fmt::Debug for FailureOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureOracle")
            .field("program", &self.program.name())
            .field("policy", &self.policy)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl FailureOracle {
    /// Create a failure oracle
    pub fn new(program: SharedProgram, policy: ErrorPolicy, timeout_secs: u64) -> Self {
        let buffer = Mutex::new(TraceBuffer::new(program.name()));
        Self { program, policy, guard: TimeoutGuard::new(timeout_secs), buffer }
    }
}

impl Oracle for FailureOracle {
    fn evaluate(&self, input: &str) -> Result<Verdict, OracleError> {
        let buffer = self.buffer.lock();
        buffer.reset();

        let args = vec![Value::from(input)];
        let outcome = match call_guarded(self.guard, &self.program, args, buffer.tracer()) {
            Ok(Ok(_)) => Outcome::Completed,
            Ok(Err(failure)) => Outcome::Failed(failure),
            Err(e) => Outcome::aborted(e)?,
        };
        Ok(outcome.verdict(input, &self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnProgram, PutError, Tracer};
    use std::{sync::Arc, thread, time::Duration};

    fn parser() -> SharedProgram {
        Arc::new(FnProgram::new("parse", |args: Vec<Value>, _: &Tracer| {
            match args.first().and_then(Value::as_str) {
                Some("loop") => {
                    thread::sleep(Duration::from_secs(5));
                    Ok(Value::Null)
                }
                Some(s) if s.starts_with('(') && !s.ends_with(')') => {
                    Err(PutError::new("SyntaxError", "unbalanced parenthesis"))
                }
                Some(s) if s.contains("1/0") => Err(PutError::new("ZeroDivisionError", s)),
                _ => Ok(Value::Bool(true)),
            }
        }))
    }

    #[test]
    fn test_default_rule_without_definitions() {
        lino_common::logging::ensure_test_logging(None);
        let oracle = FailureOracle::new(parser(), ErrorPolicy::default(), 1);

        assert_eq!(oracle.evaluate("(1+2)").unwrap(), Verdict::Passing);
        assert_eq!(oracle.evaluate("(1+2").unwrap(), Verdict::Failing);
    }

    #[test]
    fn test_definitions_and_timeouts() {
        lino_common::logging::ensure_test_logging(None);
        let policy = ErrorPolicy::new([("ZeroDivisionError", Verdict::Failing)]);
        let oracle = FailureOracle::new(parser(), policy, 1);

        assert_eq!(oracle.evaluate("1/0").unwrap(), Verdict::Failing);
        assert_eq!(oracle.evaluate("(1").unwrap(), Verdict::Undefined);
        assert_eq!(oracle.evaluate("loop").unwrap(), Verdict::Undefined);
        assert_eq!(oracle.evaluate("2*3").unwrap(), Verdict::Passing);
    }
}
