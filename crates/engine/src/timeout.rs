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

//! Wall-clock deadline around a single program-under-test call.
//!
//! The guarded closure runs on a dedicated thread. The caller waits for its
//! result up to the deadline; on expiry the call's [`CancelToken`] is raised
//! and the caller waits a further [`CANCEL_GRACE`] for the call to wind down
//! before abandoning the thread. Cancellation is cooperative: tracers stop
//! recording and process programs kill their child and hand over what it had
//! flushed, but an in-process computation keeps running in the background
//! until it returns on its own.

use std::{
    any::Any,
    cell::Cell,
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::mpsc,
    thread,
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::CancelToken;

/// How long a cancelled call may take to wind down before it is abandoned
pub const CANCEL_GRACE: Duration = Duration::from_millis(500);

thread_local! {
    static ARMED: Cell<bool> = const { Cell::new(false) };
}

/// Failures surfaced by [`TimeoutGuard::run`]
#[derive(Debug, Error)]
pub enum GuardError {
    /// The deadline expired before the call returned
    #[error("call timed out after {secs}s")]
    TimedOut {
        /// Configured deadline in seconds
        secs: u64,
    },

    /// The guarded call panicked
    #[error("call panicked: {0}")]
    Panicked(String),

    /// A guard was armed while another one is active on this thread
    #[error("nested timeout guards are not supported")]
    Nested,

    /// The worker thread could not be started
    #[error("failed to spawn guarded thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Marks the current thread as running under a guard until dropped.
struct Armed;

impl Armed {
    fn arm() -> Result<Self, GuardError> {
        ARMED.with(|armed| {
            if armed.replace(true) {
                Err(GuardError::Nested)
            } else {
                Ok(Self)
            }
        })
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        ARMED.with(|armed| armed.set(false));
    }
}

/// Whether a guard is active on the current thread
pub fn is_guard_active() -> bool {
    ARMED.with(Cell::get)
}

/// A deadline of whole seconds.
///
/// Zero disables the deadline; the call still runs on its own thread so panics
/// are contained the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutGuard {
    secs: u64,
}

impl Default for TimeoutGuard {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TimeoutGuard {
    /// Guard with a deadline of `secs` seconds
    pub const fn new(secs: u64) -> Self {
        Self { secs }
    }

    /// Guard without a deadline
    pub const fn disabled() -> Self {
        Self { secs: 0 }
    }

    /// Configured seconds
    pub const fn secs(&self) -> u64 {
        self.secs
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Duration> {
        (self.secs > 0).then(|| Duration::from_secs(self.secs))
    }

    /// Run `call` under the deadline.
    ///
    /// The guard is disarmed on every exit path. On expiry `cancel` is raised
    /// before [`GuardError::TimedOut`] is returned.
    pub fn run<F, T>(&self, cancel: &CancelToken, call: F) -> Result<T, GuardError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _armed = Armed::arm()?;
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("lino-guarded".to_string())
            .spawn(move || {
                // The worker is itself a guarded context.
                let _armed = Armed::arm();
                let outcome = catch_unwind(AssertUnwindSafe(call));
                // The receiver is gone once the caller gave up waiting.
                let _ = tx.send(outcome);
            })
            .map_err(GuardError::Spawn)?;

        let outcome = match self.deadline() {
            Some(deadline) => match rx.recv_timeout(deadline) {
                Ok(outcome) => outcome,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    cancel.cancel();
                    // The late result is discarded; only its side effects on the trace count.
                    let wound_down = rx.recv_timeout(CANCEL_GRACE).is_ok();
                    debug!(secs = self.secs, wound_down, "guarded call abandoned after deadline");
                    return Err(GuardError::TimedOut { secs: self.secs });
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(GuardError::Panicked("guarded thread exited without a result".into()))
                }
            },
            None => rx.recv().map_err(|_| {
                GuardError::Panicked("guarded thread exited without a result".into())
            })?,
        };

        trace!("guarded call finished before deadline");
        outcome.map_err(|payload| GuardError::Panicked(panic_message(payload.as_ref())))
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_returns_value_before_deadline() {
        lino_common::logging::ensure_test_logging(None);
        let token = CancelToken::new();
        let value = TimeoutGuard::new(2).run(&token, || 40 + 2).unwrap();
        assert_eq!(value, 42);
        assert!(!token.is_cancelled());
        assert!(!is_guard_active());
    }

    #[test]
    fn test_expiry_cancels_token_and_returns_promptly() {
        lino_common::logging::ensure_test_logging(None);
        let token = CancelToken::new();
        let observed = token.clone();
        let started = Instant::now();

        let result = TimeoutGuard::new(1).run(&token, move || {
            while !observed.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
        });

        assert!(matches!(result, Err(GuardError::TimedOut { secs: 1 })));
        assert!(token.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!is_guard_active());
    }

    #[test]
    fn test_cancelled_call_gets_grace_to_wind_down() {
        lino_common::logging::ensure_test_logging(None);
        let token = CancelToken::new();
        let observed = token.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let result = TimeoutGuard::new(1).run(&token, move || {
            while !observed.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            // Bookkeeping after cancellation, e.g. reaping a killed child
            thread::sleep(Duration::from_millis(50));
            done_tx.send(()).unwrap();
        });

        assert!(matches!(result, Err(GuardError::TimedOut { secs: 1 })));
        // The wind-down finished before the guard returned
        assert!(done_rx.try_recv().is_ok());
    }

    #[test]
    fn test_panic_is_contained_and_guard_disarmed() {
        lino_common::logging::ensure_test_logging(None);
        let token = CancelToken::new();
        let result: Result<(), _> = TimeoutGuard::new(1).run(&token, || panic!("boom"));

        match result {
            Err(GuardError::Panicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!is_guard_active());
        // A fresh guard can be armed right away
        assert_eq!(TimeoutGuard::new(1).run(&CancelToken::new(), || 1).unwrap(), 1);
    }

    #[test]
    fn test_nested_guard_is_rejected() {
        lino_common::logging::ensure_test_logging(None);
        let token = CancelToken::new();
        let inner = TimeoutGuard::new(1)
            .run(&token, || TimeoutGuard::new(1).run(&CancelToken::new(), || ()))
            .unwrap();

        assert!(matches!(inner, Err(GuardError::Nested)));
    }

    #[test]
    fn test_disabled_guard_has_no_deadline() {
        lino_common::logging::ensure_test_logging(None);
        let guard = TimeoutGuard::disabled();
        assert_eq!(guard.deadline(), None);
        assert_eq!(TimeoutGuard::new(3).deadline(), Some(Duration::from_secs(3)));

        let value = guard
            .run(&CancelToken::new(), || {
                thread::sleep(Duration::from_millis(20));
                "done"
            })
            .unwrap();
        assert_eq!(value, "done");
    }
}
