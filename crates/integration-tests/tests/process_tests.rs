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

//! Line oracle over an external instrumented program
//!
//! The program under test is a shell script that writes its line events to
//! the file named by `LINO_EVENTS_PATH`.
#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use lino_common::{LineField, Verdict};
use lino_engine::{BuiltinConverter, LineOracle, Oracle, OracleConfig, ProcessProgram};
use lino_integration_tests::test_utils::init;
use serial_test::serial;
use tempfile::TempDir;

const MIDDLE_SH: &str = r#"#!/bin/sh
seq=0
line() { echo "middle.sh,$1,$seq" >> "$LINO_EVENTS_PATH"; seq=$((seq + 1)); }
x=$1; y=$2; z=$3
: > "$LINO_EVENTS_PATH"
line 1
line 2
if [ "$y" -lt "$z" ]; then
    line 3
    if [ "$x" -lt "$y" ]; then line 4; echo "$y"; exit 0; fi
    line 5
    if [ "$x" -lt "$z" ]; then line 7; echo "$y"; exit 0; fi
else
    line 9
    if [ "$x" -gt "$y" ]; then line 10; echo "$y"; exit 0; fi
    line 11
    if [ "$x" -gt "$z" ]; then line 12; echo "$x"; exit 0; fi
fi
line 13
echo "$z"
"#;

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn oracle(dir: &Path, program: &Path, target: u32) -> LineOracle {
    let factory = ProcessProgram::factory(program, vec![], LineField::default());
    LineOracle::new(
        OracleConfig::new("middle.sh", factory, target.into())
            .with_events_path(dir.join("event_file"))
            .with_converter(std::sync::Arc::new(BuiltinConverter::Csv))
            .with_timeout_secs(5),
    )
}

#[test]
#[serial]
fn test_process_middle_scenario() {
    init::init_test_environment();
    let dir = TempDir::new().unwrap();
    let program = install(dir.path(), "middle.sh", MIDDLE_SH);
    let oracle = oracle(dir.path(), &program, 7);

    assert_eq!(oracle.evaluate("2,1,3").unwrap(), Verdict::Failing);
    assert_eq!(oracle.evaluate("1,2,3").unwrap(), Verdict::Passing);
    assert_eq!(oracle.evaluate("3,2,1").unwrap(), Verdict::Passing);
    assert!(dir.path().join("event_file.child").exists());
}

#[test]
#[serial]
fn test_process_failure_before_any_line() {
    init::init_test_environment();
    let dir = TempDir::new().unwrap();
    let program = install(dir.path(), "fail.sh", "#!/bin/sh\necho boom >&2\nexit 2\n");
    let oracle = oracle(dir.path(), &program, 1);

    let evaluation = oracle.evaluate_detailed("1,2,3").unwrap();
    assert_eq!(evaluation.verdict, Verdict::Passing);
    assert_eq!(evaluation.failure.unwrap().kind, "exit");
    assert_eq!(fs::read_to_string(dir.path().join("event_file")).unwrap(), "");
}

#[test]
#[serial]
fn test_process_timeout_kills_child() {
    init::init_test_environment();
    let dir = TempDir::new().unwrap();
    let program = install(dir.path(), "hang.sh", "#!/bin/sh\nexec sleep 30\n");
    let oracle = LineOracle::new(
        OracleConfig::new(
            "hang.sh",
            ProcessProgram::factory(&program, vec![], LineField::default()),
            1u32.into(),
        )
        .with_events_path(dir.path().join("event_file"))
        .with_timeout_secs(1),
    );

    let started = Instant::now();
    let evaluation = oracle.evaluate_detailed("x").unwrap();
    assert_eq!(evaluation.verdict, Verdict::Passing);
    assert!(evaluation.failure.unwrap().is_timeout());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
#[serial]
fn test_process_timeout_keeps_flushed_lines() {
    init::init_test_environment();
    let dir = TempDir::new().unwrap();
    let program = install(
        dir.path(),
        "hang.sh",
        "#!/bin/sh\necho \"hang.sh,1,0\" > \"$LINO_EVENTS_PATH\"\nexec sleep 30\n",
    );
    let oracle = LineOracle::new(
        OracleConfig::new(
            "hang.sh",
            ProcessProgram::factory(&program, vec![], LineField::default()),
            1u32.into(),
        )
        .with_events_path(dir.path().join("event_file"))
        .with_timeout_secs(1),
    );

    let started = Instant::now();
    let evaluation = oracle.evaluate_detailed("x").unwrap();
    assert_eq!(evaluation.verdict, Verdict::Failing);
    assert!(evaluation.failure.unwrap().is_timeout());
    assert!(evaluation.trace.contains_line(1u32.into()));
    assert!(started.elapsed() < Duration::from_secs(10));

    // A run that does not hang afterwards is decided on its own trace
    let quick = install(
        dir.path(),
        "quick.sh",
        "#!/bin/sh\necho \"quick.sh,2,0\" > \"$LINO_EVENTS_PATH\"\n",
    );
    let next = LineOracle::new(
        OracleConfig::new(
            "quick.sh",
            ProcessProgram::factory(&quick, vec![], LineField::default()),
            1u32.into(),
        )
        .with_events_path(dir.path().join("event_file")),
    );
    assert_eq!(next.evaluate("x").unwrap(), Verdict::Passing);
}
