//! Integration tests for the pseudo-terminal environment.

#![cfg(unix)]

use kennel_core::{Environment, EnvironmentError, EnvironmentKind, WaitOutcome};
use kennel_runtime::{EnvironmentSettings, PtyEnvironment};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

async fn environment() -> (TempDir, PtyEnvironment) {
    let dir = tempfile::tempdir().unwrap();
    let env = PtyEnvironment::new(dir.path().join("alpha"), EnvironmentSettings::default());
    env.create().await.unwrap();
    (dir, env)
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_pty_captures_output_without_carriage_returns() {
    let (_dir, env) = environment().await;
    assert_eq!(env.kind(), EnvironmentKind::Tty);

    let outcome = env.execute("echo", &args(&["hello"])).await.unwrap();

    assert_eq!(outcome, WaitOutcome::Completed { exit_code: Some(0) });
    assert!(env.console().lines.iter().any(|l| l == "hello"));
}

#[tokio::test]
async fn test_child_sees_a_terminal() {
    let (_dir, env) = environment().await;

    env.execute("sh", &args(&["-c", "test -t 0 && test -t 1 && echo tty"]))
        .await
        .unwrap();

    assert!(env.console().lines.iter().any(|l| l == "tty"));
}

#[tokio::test]
async fn test_input_is_terminated_for_the_line_discipline() {
    let (_dir, env) = environment().await;
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
    env.add_listener(Box::new(tx));

    env.execute_async("sh", &args(&["-c", "read line; echo got:$line"]))
        .await
        .unwrap();
    env.execute_in_main_process("ping").await.unwrap();

    let mut seen = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !seen.contains("got:ping") {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(chunk)) => seen.push_str(&String::from_utf8_lossy(&chunk)),
            _ => break,
        }
    }
    assert!(seen.contains("got:ping"), "console was {seen:?}");

    let outcome = env
        .wait_for_main_process_for(Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome, WaitOutcome::Completed { exit_code: Some(0) });
}

#[tokio::test]
async fn test_timeout_and_restart() {
    let (_dir, env) = environment().await;
    env.execute_async("sleep", &args(&["5"])).await.unwrap();
    assert!(matches!(
        env.execute_async("sleep", &args(&["5"])).await,
        Err(EnvironmentError::AlreadyRunning { .. })
    ));

    let outcome = env
        .wait_for_main_process_for(Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(!env.is_running());

    let outcome = env.execute("echo", &args(&["again"])).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_timeout_kills_the_whole_session() {
    let (_dir, env) = environment().await;
    env.execute_async("sh", &args(&["-c", "sleep 5; echo done"]))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let outcome = env
        .wait_for_main_process_for(Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(env.pid(), None);
}
