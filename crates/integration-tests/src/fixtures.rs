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

//! Instrumented fixture programs.
//!
//! Each fixture is a [`ModuleFactory`] whose program records the line ids an
//! instrumentation pass would have inserted into the original source. The
//! listings next to each fixture give the numbering.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use lino_common::Value;
use lino_engine::{FnProgram, LoadError, ModuleContext, ModuleFactory, PutError, SharedProgram, Tracer};
use tracing::debug;

fn int_arg(args: &[Value], index: usize) -> Result<i64, PutError> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| PutError::new("TypeError", format!("argument {index} must be an integer")))
}

fn str_arg(args: &[Value]) -> Result<String, PutError> {
    args.first()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PutError::new("TypeError", "expected a string argument"))
}

fn factory<F>(name: &'static str, body: F) -> Arc<dyn ModuleFactory>
where
    F: Fn(Vec<Value>, &Tracer) -> Result<Value, PutError> + Clone + Send + Sync + 'static,
{
    Arc::new(move |_: &ModuleContext| -> Result<SharedProgram, LoadError> {
        debug!(fixture = name, "Loading fixture");
        Ok(Arc::new(FnProgram::new(name, body.clone())))
    })
}

/// Line ids of [`middle`]
pub mod middle_lines {
    /// `if y < z:`
    pub const Y_LT_Z: u32 = 2;
    /// `return y` in the `x < y` branch
    pub const RETURN_Y_SORTED: u32 = 4;
    /// The buggy `return y`, which should be `return x`
    pub const BUGGY_RETURN: u32 = 7;
    /// `return y` in the descending branch
    pub const RETURN_Y_DESC: u32 = 10;
    /// Final `return z`
    pub const RETURN_Z: u32 = 13;
}

/// The classic buggy `middle(x, y, z)`.
///
/// ```text
///  1  def middle(x, y, z):
///  2      if y < z:
///  3          if x < y:
///  4              return y
///  5          elif x < z:
///  6              # bug
///  7              return y
///  8      else:
///  9          if x > y:
/// 10              return y
/// 11          elif x > z:
/// 12              return x
/// 13      return z
/// ```
pub fn middle() -> Arc<dyn ModuleFactory> {
    factory("middle", |args, tracer| {
        let (x, y, z) = (int_arg(&args, 0)?, int_arg(&args, 1)?, int_arg(&args, 2)?);
        tracer.record(1u32);
        tracer.record(2u32);
        if y < z {
            tracer.record(3u32);
            if x < y {
                tracer.record(4u32);
                return Ok(y.into());
            }
            tracer.record(5u32);
            if x < z {
                tracer.record(7u32);
                return Ok(y.into());
            }
        } else {
            tracer.record(9u32);
            if x > y {
                tracer.record(10u32);
                return Ok(y.into());
            }
            tracer.record(11u32);
            if x > z {
                tracer.record(12u32);
                return Ok(x.into());
            }
        }
        tracer.record(13u32);
        Ok(z.into())
    })
}

/// The correct `middle`, used as a reference program
pub fn middle_reference() -> SharedProgram {
    Arc::new(FnProgram::new("middle_reference", |args: Vec<Value>, _: &Tracer| {
        let mut values = [int_arg(&args, 0)?, int_arg(&args, 1)?, int_arg(&args, 2)?];
        values.sort_unstable();
        Ok(values[1].into())
    }))
}

/// `remove_html_markup(s)`, numbered from 0.
///
/// ```text
///  0  tag = False
///  1  quote = False
///  2  out = ''
///  3  for c in s:
///  4      if c == '<' and not quote:
///  5          tag = True
///  6      elif c == '>' and not quote:
///  7          tag = False
///  8      elif c == '"' or c == "'" and tag:
///  9          quote = not quote
/// 10      elif not tag:
/// 11          out = out + c
/// 12  return out
/// ```
pub fn remove_html_markup() -> Arc<dyn ModuleFactory> {
    factory("remove_html_markup", |args, tracer| {
        let s = str_arg(&args)?;
        tracer.record(0u32);
        let mut tag = false;
        tracer.record(1u32);
        let mut quote = false;
        tracer.record(2u32);
        let mut out = String::new();
        tracer.record(3u32);
        for c in s.chars() {
            tracer.record(4u32);
            if c == '<' && !quote {
                tracer.record(5u32);
                tag = true;
            } else {
                tracer.record(6u32);
                if c == '>' && !quote {
                    tracer.record(7u32);
                    tag = false;
                } else {
                    tracer.record(8u32);
                    if c == '"' || (c == '\'' && tag) {
                        tracer.record(9u32);
                        quote = !quote;
                    } else {
                        tracer.record(10u32);
                        if !tag {
                            tracer.record(11u32);
                            out.push(c);
                        }
                    }
                }
            }
        }
        tracer.record(12u32);
        Ok(out.into())
    })
}

/// Records line 1, then line 3 and returns when given 0. Any other input
/// spins on line 2 until the call is cancelled.
pub fn spin() -> Arc<dyn ModuleFactory> {
    factory("spin", |args, tracer| {
        let n = int_arg(&args, 0)?;
        tracer.record(1u32);
        if n == 0 {
            tracer.record(3u32);
            return Ok(Value::Null);
        }
        while !tracer.is_cancelled() {
            tracer.record(2u32);
            thread::sleep(Duration::from_millis(1));
        }
        Ok(Value::Null)
    })
}

/// Records line 1. Unless the input is `fast`, then sleeps `secs` seconds
/// ignoring cancellation and records line 2.
pub fn sleeper(secs: u64) -> Arc<dyn ModuleFactory> {
    factory("sleeper", move |args, tracer| {
        tracer.record(1u32);
        if str_arg(&args)? == "fast" {
            return Ok(Value::Null);
        }
        thread::sleep(Duration::from_secs(secs));
        tracer.record(2u32);
        Ok(Value::Null)
    })
}

/// Fails before executing any instrumented line
pub fn crash_before_any_line() -> Arc<dyn ModuleFactory> {
    factory("crash_before", |args, _| {
        Err(PutError::new("ValueError", format!("cannot handle {} arguments", args.len())))
    })
}

/// Records lines 1 to `line`, then panics
pub fn crash_after(line: u32) -> Arc<dyn ModuleFactory> {
    factory("crash_after", move |_, tracer| {
        for executed in 1..=line {
            tracer.record(executed);
        }
        panic!("crashed after line {line}");
    })
}

/// Records line 100 while the module loads, then line 1 per call
pub fn records_during_load() -> Arc<dyn ModuleFactory> {
    Arc::new(|context: &ModuleContext| -> Result<SharedProgram, LoadError> {
        context.buffer.tracer().record(100u32);
        Ok(Arc::new(FnProgram::new("load_time", |_: Vec<Value>, tracer: &Tracer| {
            tracer.record(1u32);
            Ok(Value::Null)
        })))
    })
}

/// Records line 5 on the first call of each instance only, like a lazily
/// initialized module-level cache.
pub fn warm_up_once() -> Arc<dyn ModuleFactory> {
    Arc::new(|_: &ModuleContext| -> Result<SharedProgram, LoadError> {
        let warmed = Arc::new(AtomicBool::new(false));
        Ok(Arc::new(FnProgram::new("warm_up", move |_: Vec<Value>, tracer: &Tracer| {
            tracer.record(1u32);
            if !warmed.swap(true, Ordering::SeqCst) {
                tracer.record(5u32);
            }
            Ok(Value::Null)
        })))
    })
}

/// Fails to load
pub fn unloadable() -> Arc<dyn ModuleFactory> {
    Arc::new(|_: &ModuleContext| -> Result<SharedProgram, LoadError> {
        Err(LoadError::module("unloadable", "SyntaxError: invalid syntax (line 3)"))
    })
}
