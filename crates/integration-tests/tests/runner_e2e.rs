//! Process runner end-to-end tests
//!
//! Real child processes, real gate: audit line, output relay, exit mapping,
//! slot release and the concurrency bound.
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{runner, TestDir};
use dlfmt_core::application::RunError;
use dlfmt_core::domain::Invocation;
use dlfmt_core::port::log_sink::mocks::BufferSink;

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_hello_round_trip() {
    let dir = TestDir::new("hello");
    let exe = dir.script("dlfmt", "echo hello");
    let runner = runner(2);
    let sink = BufferSink::new();

    let invocation = Invocation::new(&exe, ["--format-file", "a.lua", "--param", "auto"], dir.path());
    runner.run(&invocation, &sink).await.unwrap();

    assert_eq!(
        sink.lines(),
        vec![
            format!("> \"{}\" --format-file a.lua --param auto", exe.display()),
            "hello".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_nonzero_exit_reports_code_and_stderr() {
    let dir = TestDir::new("boom");
    let exe = dir.script("dlfmt", "echo out; echo boom >&2; exit 2");
    let sink = BufferSink::new();

    let invocation = Invocation::new(&exe, ["--compress-file", "a.lua"], dir.path());
    let err = runner(2).run(&invocation, &sink).await.unwrap_err();

    assert_eq!(
        err,
        RunError::NonZeroExit {
            code: 2,
            stderr: "boom\n".to_string()
        }
    );
    assert!(err.to_string().contains("boom"));
    // stdout relayed before stderr
    assert_eq!(&sink.lines()[1..], ["out".to_string(), "boom".to_string()]);
}

#[tokio::test]
async fn test_audit_line_quotes_paths_with_spaces() {
    let dir = TestDir::new("quoting");
    let exe = dir.script("dlfmt", "exit 0");
    let target = dir.file("my file.lua", "x = 1\n");
    let sink = BufferSink::new();

    let invocation = Invocation::new(
        &exe,
        [
            "--format-file".to_string(),
            target.display().to_string(),
            "--param".to_string(),
            "manual".to_string(),
        ],
        dir.path(),
    );
    runner(1).run(&invocation, &sink).await.unwrap();

    assert_eq!(
        sink.lines()[0],
        format!(
            "> \"{}\" --format-file \"{}\" --param manual",
            exe.display(),
            target.display()
        )
    );
}

#[tokio::test]
async fn test_arguments_reach_process_verbatim() {
    let dir = TestDir::new("verbatim");
    let exe = dir.script("dlfmt", r#"for a in "$@"; do echo "[$a]"; done"#);
    let sink = BufferSink::new();

    let invocation = Invocation::new(&exe, ["--json-task", "my task; rm -rf $HOME.json"], dir.path());
    runner(1).run(&invocation, &sink).await.unwrap();

    assert_eq!(
        &sink.lines()[1..],
        ["[--json-task]".to_string(), "[my task; rm -rf $HOME.json]".to_string()]
    );
}

#[tokio::test]
async fn test_spawn_failure_releases_slot_for_next_caller() {
    let dir = TestDir::new("spawn-fail");
    let good = dir.script("dlfmt", "echo ok");
    let missing = dir.path().join("does-not-exist");
    let runner = runner(1);

    // Hold the only slot so both calls queue behind it
    let held = runner.gate().acquire().await;

    let failing = {
        let runner = Arc::clone(&runner);
        let invocation = Invocation::new(&missing, ["--compress-file", "a.lua"], dir.path());
        tokio::spawn(async move { runner.run(&invocation, &BufferSink::new()).await })
    };
    wait_until(|| runner.gate().waiting() == 1).await;

    let sink = BufferSink::new();
    let succeeding = {
        let runner = Arc::clone(&runner);
        let sink = sink.clone();
        let invocation = Invocation::new(&good, ["--compress-file", "a.lua"], dir.path());
        tokio::spawn(async move { runner.run(&invocation, &sink).await })
    };
    wait_until(|| runner.gate().waiting() == 2).await;

    drop(held);

    let err = failing.await.unwrap().unwrap_err();
    assert!(matches!(err, RunError::Spawn(ref msg) if msg.contains("does-not-exist")));
    succeeding.await.unwrap().unwrap();

    assert!(sink.contents().contains("ok"));
    assert_eq!(runner.gate().running(), 0);
}

#[tokio::test]
async fn test_third_invocation_waits_for_a_free_slot() {
    let dir = TestDir::new("saturation");
    let exe = dir.script(
        "dlfmt",
        r#"echo "start $2" >> events.log
sleep 1
echo "end $2" >> events.log"#,
    );
    let runner = runner(2);

    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|id| {
            let runner = Arc::clone(&runner);
            let invocation = Invocation::new(&exe, ["--compress-file", id], dir.path());
            tokio::spawn(async move { runner.run(&invocation, &BufferSink::new()).await })
        })
        .collect();

    wait_until(|| runner.gate().running() == 2 && runner.gate().waiting() == 1).await;
    wait_until(|| dir.read("events.log").lines().count() >= 2).await;
    // Two processes started, the third is still queued
    assert_eq!(dir.read("events.log").lines().count(), 2);

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let events = dir.read("events.log");
    let mut active = 0;
    let mut peak = 0;
    for line in events.lines() {
        if line.starts_with("start") {
            active += 1;
            peak = peak.max(active);
        } else {
            active -= 1;
        }
    }
    assert_eq!(events.lines().count(), 6);
    assert_eq!(peak, 2);
    assert_eq!(runner.gate().running(), 0);
}

#[tokio::test]
async fn test_deadline_kills_hung_process_and_frees_slot() {
    let dir = TestDir::new("deadline");
    let exe = dir.script("dlfmt", "echo waiting for lock >&2\nsleep 30");
    let runner = runner(1);
    let sink = BufferSink::new();

    let invocation = Invocation::new(&exe, ["--format-directory", ".", "--param", "auto"], dir.path())
        .with_deadline(Some(Duration::from_millis(300)));
    let err = runner.run(&invocation, &sink).await.unwrap_err();

    assert_eq!(
        err,
        RunError::Timeout {
            deadline_ms: 300,
            stderr: "waiting for lock\n".to_string()
        }
    );
    assert_eq!(&sink.lines()[1..], ["waiting for lock".to_string()]);
    assert!(runner.gate().try_acquire().is_some());
}
