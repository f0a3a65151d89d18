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

//! Functional equivalence oracle.

use std::sync::Arc;

use lino_common::Verdict;
use parking_lot::Mutex;

use super::{call_guarded, ErrorPolicy, InputConverter, Oracle, OracleError, Outcome};
use crate::{PutError, SharedProgram, TimeoutGuard, TraceBuffer};

/// Compares the program under test with a reference program.
///
/// Both are called with the converted input under the timeout. A failure of
/// either, or differing results, is classified by the [`ErrorPolicy`].
pub struct FunctionalOracle {
    program: SharedProgram,
    reference: SharedProgram,
    converter: Arc<dyn InputConverter>,
    policy: ErrorPolicy,
    guard: TimeoutGuard,
    buffer: Mutex<TraceBuffer>,
}

impl std::fmt::Debug for FunctionalOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionalOracle")
            .field("program", &self.program.name())
            .field("reference", &self.reference.name())
            .field("policy", &self.policy)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl FunctionalOracle {
    /// Create a functional oracle
    pub fn new(
        program: SharedProgram,
        reference: SharedProgram,
        converter: Arc<dyn InputConverter>,
        policy: ErrorPolicy,
        timeout_secs: u64,
    ) -> Self {
        let buffer = Mutex::new(TraceBuffer::new(program.name()));
        Self { program, reference, converter, policy, guard: TimeoutGuard::new(timeout_secs), buffer }
    }

    fn run(&self, input: &str) -> Result<Outcome, OracleError> {
        let args = self.converter.convert(input)?.into_args();
        let buffer = self.buffer.lock();

        buffer.reset();
        let produced = match call_guarded(self.guard, &self.program, args.clone(), buffer.tracer())
        {
            Ok(Ok(value)) => value,
            Ok(Err(failure)) => return Ok(Outcome::Failed(failure)),
            Err(e) => return Outcome::aborted(e),
        };

        buffer.reset();
        let expected = match call_guarded(self.guard, &self.reference, args, buffer.tracer()) {
            Ok(Ok(value)) => value,
            Ok(Err(failure)) => return Ok(Outcome::Failed(failure)),
            Err(e) => return Outcome::aborted(e),
        };

        if produced == expected {
            Ok(Outcome::Completed)
        } else {
            Ok(Outcome::Failed(PutError::unexpected_result(&expected, &produced)))
        }
    }
}

impl Oracle for FunctionalOracle {
    fn evaluate(&self, input: &str) -> Result<Verdict, OracleError> {
        Ok(self.run(input)?.verdict(input, &self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuiltinConverter, FnProgram, Tracer};
    use lino_common::Value;

    fn program(name: &str, body: fn(i64, i64) -> i64) -> SharedProgram {
        Arc::new(FnProgram::new(name, move |args: Vec<Value>, _: &Tracer| {
            let arg = |i: usize| args.get(i).and_then(Value::as_i64).unwrap_or_default();
            Ok(Value::from(body(arg(0), arg(1))))
        }))
    }

    #[test]
    fn test_matching_results_pass() {
        lino_common::logging::ensure_test_logging(None);
        let oracle = FunctionalOracle::new(
            program("max", |a, b| a.max(b)),
            program("reference", |a, b| if a > b { a } else { b }),
            Arc::new(BuiltinConverter::Ints),
            ErrorPolicy::default(),
            1,
        );
        assert_eq!(oracle.evaluate("3 9").unwrap(), Verdict::Passing);
    }

    #[test]
    fn test_mismatch_maps_through_definitions() {
        lino_common::logging::ensure_test_logging(None);
        let buggy = || program("max", |a, _| a);
        let reference = || program("reference", |a, b| a.max(b));

        let strict = FunctionalOracle::new(
            buggy(),
            reference(),
            Arc::new(BuiltinConverter::Ints),
            ErrorPolicy::default(),
            1,
        );
        assert_eq!(strict.evaluate("3 9").unwrap(), Verdict::Failing);
        assert_eq!(strict.evaluate("9 3").unwrap(), Verdict::Passing);

        let tolerant = FunctionalOracle::new(
            buggy(),
            reference(),
            Arc::new(BuiltinConverter::Ints),
            ErrorPolicy::new([("timeout", Verdict::Failing)]),
            1,
        );
        assert_eq!(tolerant.evaluate("3 9").unwrap(), Verdict::Undefined);
    }

    #[test]
    fn test_panicking_program_is_a_failure() {
        lino_common::logging::ensure_test_logging(None);
        let panicking: SharedProgram =
            Arc::new(FnProgram::new("panics", |_: Vec<Value>, _: &Tracer| panic!("index out of range")));
        let oracle = FunctionalOracle::new(
            panicking,
            program("reference", |a, _| a),
            Arc::new(BuiltinConverter::Ints),
            ErrorPolicy::new([(PutError::PANIC, Verdict::Failing)]),
            1,
        );
        assert_eq!(oracle.evaluate("1 2").unwrap(), Verdict::Failing);
        assert!(matches!(oracle.evaluate("x"), Err(OracleError::Convert(_))));
    }
}
