//! Drives `EngineBridge` against shell scripts standing in for the engine.
#![cfg(unix)]

use chrono::NaiveDate;
use polaris_audit::engine::{BridgeError, DayState, Engine, EngineBridge, EventMethod, Invocation, Strategy, Timeouts};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const BODY: &str = r#"{"location":{"latitude":69.65,"country_code":"NO","timezone":"Europe/Oslo","source":"Cache"},"state":"PolarNight","events":{"maghrib":{"time":"13:05:00","method":"Projected","confidence":0.5}}}"#;

fn script(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("polaris");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn tromso() -> Invocation {
    Invocation::city("Tromsø", Strategy::Projected45)
        .with_date(NaiveDate::from_ymd_opt(2026, 12, 21).unwrap())
        .with_confidence(true)
}

#[tokio::test]
async fn test_successful_response() {
    let dir = TempDir::new().unwrap();
    let bridge = EngineBridge::new(script(&dir, &format!("echo '{}'", BODY)));
    let resp = bridge.invoke(&tromso()).await.unwrap();
    assert_eq!(resp.state, DayState::PolarNight);
    assert_eq!(resp.location.source, "Cache");
    assert_eq!(resp.events.maghrib.method, Some(EventMethod::Projected));
}

#[tokio::test]
async fn test_arguments_reach_engine() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("args.txt");
    let body = format!("printf '%s\\n' \"$@\" > '{}'\necho '{}'", log.display(), BODY);
    let bridge = EngineBridge::new(script(&dir, &body));

    bridge.invoke(&tromso()).await.unwrap();
    let args = fs::read_to_string(&log).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args, vec!["Tromsø", "--strategy", "projected45", "--date", "2026-12-21", "--show-confidence"]);

    let coords = Invocation::coordinates(-33.9, 151.2, "UTC", NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(), Strategy::Strict);
    bridge.invoke(&coords).await.unwrap();
    let args = fs::read_to_string(&log).unwrap();
    assert!(args.lines().any(|l| l == "-33.9000"), "{}", args);
    assert!(args.lines().any(|l| l == "strict"), "{}", args);
}

#[tokio::test]
async fn test_leading_diagnostics_are_skipped() {
    let dir = TempDir::new().unwrap();
    let body = format!("echo 'Resolving Tromsø...'\necho 'cache hit'\necho '{}'", BODY);
    let bridge = EngineBridge::new(script(&dir, &body));
    let resp = bridge.invoke(&tromso()).await.unwrap();
    assert_eq!(resp.events.maghrib.time.as_deref(), Some("13:05:00"));
}

#[tokio::test]
async fn test_non_zero_exit() {
    let dir = TempDir::new().unwrap();
    let bridge = EngineBridge::new(script(&dir, "echo 'city not found' >&2\nexit 3"));
    let err = bridge.invoke(&tromso()).await.unwrap_err();
    match &err {
        BridgeError::ExitStatus { code, stderr } => {
            assert_eq!(*code, Some(3));
            assert_eq!(stderr, "city not found");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_external());
}

#[tokio::test]
async fn test_empty_output() {
    let dir = TempDir::new().unwrap();
    let bridge = EngineBridge::new(script(&dir, "exit 0"));
    let err = bridge.invoke(&tromso()).await.unwrap_err();
    assert!(matches!(err, BridgeError::EmptyOutput));
}

#[tokio::test]
async fn test_malformed_json() {
    let dir = TempDir::new().unwrap();
    let bridge = EngineBridge::new(script(&dir, "echo '{\"location\": '"));
    let err = bridge.invoke(&tromso()).await.unwrap_err();
    assert_eq!(err.kind(), "malformed-json");
}

#[tokio::test]
async fn test_timeout() {
    let dir = TempDir::new().unwrap();
    let timeouts = Timeouts { city: Duration::from_millis(200), coordinates: Duration::from_millis(200) };
    let bridge = EngineBridge::new(script(&dir, "exec sleep 10")).with_timeouts(timeouts);
    let err = bridge.invoke(&tromso()).await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));
}

#[tokio::test]
async fn test_version() {
    let dir = TempDir::new().unwrap();
    let bridge = EngineBridge::new(script(&dir, "echo 'polaris 0.5.0'"));
    assert_eq!(bridge.version().await.as_deref(), Some("polaris 0.5.0"));

    let failing = EngineBridge::new(script(&dir, "exit 1"));
    assert_eq!(failing.version().await, None);
}
