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

//! Trace buffer and tracer handles.
//!
//! A [`TraceBuffer`] is the append-only log of line events owned by one loaded
//! module instance. Instrumented code never touches the buffer directly: it is
//! handed a [`Tracer`], a cheap handle bound to the buffer *epoch* it was issued
//! in. [`TraceBuffer::reset`] clears the events and advances the epoch, so any
//! tracer still held by an abandoned call (e.g. one that outlived its timeout)
//! silently stops recording instead of leaking events into the next invocation.
//!
//! Lifecycle: `reset` → run with a fresh tracer → `dump` → read the event file.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use lino_common::{LineEvent, LineId, LineTrace};
use parking_lot::Mutex;
use tracing::trace;

use crate::{EventFileStore, StoreError};

/// Cancellation flag shared between the timeout guard and a running call.
///
/// Cancellation is cooperative for in-process programs: a cancelled tracer
/// stops recording, and long-running programs may poll
/// [`Tracer::is_cancelled`] to bail out early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct TraceState {
    events: Vec<LineEvent>,
    epoch: u64,
}

#[derive(Debug)]
struct TraceInner {
    source: String,
    state: Mutex<TraceState>,
}

/// The event log of one loaded module instance.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    inner: Arc<TraceInner>,
}

impl TraceBuffer {
    /// Create an empty buffer for the instrumented unit `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TraceInner {
                source: source.into(),
                state: Mutex::new(TraceState::default()),
            }),
        }
    }

    /// Name of the instrumented unit, written as the first field of each record
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Clear all events and invalidate every tracer issued so far.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.events.clear();
        state.epoch += 1;
        trace!(source = %self.inner.source, epoch = state.epoch, "trace buffer reset");
    }

    /// Issue a tracer bound to the current epoch, with a fresh cancel token
    pub fn tracer(&self) -> Tracer {
        let epoch = self.inner.state.lock().epoch;
        Tracer { inner: self.inner.clone(), epoch, cancel: CancelToken::new() }
    }

    /// Current epoch (number of resets so far)
    pub fn epoch(&self) -> u64 {
        self.inner.state.lock().epoch
    }

    /// Copy of the recorded events
    pub fn snapshot(&self) -> LineTrace {
        self.inner.state.lock().events.clone().into()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the current events to `destination`, replacing its contents.
    ///
    /// The buffer is left untouched; an empty buffer produces an empty file.
    /// Returns the number of records written.
    pub fn dump(&self, destination: &Path) -> Result<usize, StoreError> {
        let events = self.snapshot();
        EventFileStore::new(destination).write(self.source(), &events)
    }
}

/// Handle through which instrumented code records executed lines.
#[derive(Debug, Clone)]
pub struct Tracer {
    inner: Arc<TraceInner>,
    epoch: u64,
    cancel: CancelToken,
}

impl Tracer {
    /// Record that `line` executed.
    ///
    /// Never fails. Events from a stale (reset) or cancelled tracer are dropped.
    pub fn record(&self, line: impl Into<LineId>) {
        if !self.cancel.is_cancelled() {
            self.record_delivered(line);
        }
    }

    /// Record a line that executed before cancellation but is delivered late,
    /// such as the flushed records of a killed child process.
    ///
    /// Cancellation does not drop these events; a stale epoch still does.
    pub fn record_delivered(&self, line: impl Into<LineId>) {
        let mut state = self.inner.state.lock();
        if state.epoch != self.epoch {
            return;
        }
        let seq = state.events.len() as u64;
        state.events.push(LineEvent::new(line.into(), seq));
    }

    /// Is this tracer still allowed to record?
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.inner.state.lock().epoch == self.epoch
    }

    /// Has the surrounding call been cancelled (e.g. by a timeout)?
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancel token the timeout guard uses to abandon this call
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Name of the instrumented unit this tracer records for
    pub fn source(&self) -> &str {
        &self.inner.source
    }
}
