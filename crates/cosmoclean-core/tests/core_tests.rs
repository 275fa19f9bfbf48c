use std::path::{Path, PathBuf};
use std::time::Duration;

use cosmoclean_core::{
    CaseSensitivity, DEFAULT_TARGETS, MatchRecord, ScanConfig, ScanError, ScanEvent,
    ScanRequest, ScanResult, SymlinkPolicy,
};

fn sample_result() -> ScanResult {
    let mut calibrated = MatchRecord::pending("/astro/M31/calibrated", "calibrated");
    calibrated.resolve(Some(150), None);
    let mut registered = MatchRecord::pending("/astro/M31/registered", "registered");
    registered.resolve(Some(10), Some("1 entry could not be read (x: denied)".into()));
    let pending = MatchRecord::pending("/astro/M33/logs", "logs");

    ScanResult::new(
        PathBuf::from("/astro"),
        vec![calibrated, registered, pending],
        2,
        Duration::from_millis(1500),
    )
}

#[test]
fn test_result_summary() {
    let result = sample_result();

    assert_eq!(result.summary.total_matches, 3);
    assert_eq!(result.summary.total_bytes, 160);
    assert_eq!(result.summary.total_errors, 1);
    assert_eq!(result.summary.walk_errors, 2);
    assert_eq!(result.summary.error_count(), 3);
    assert!(result.find(Path::new("/astro/M33/logs")).is_some_and(|m| !m.is_resolved()));
    assert!(result.find(Path::new("/astro/M33")).is_none());
}

#[test]
fn test_result_json_round_trip() {
    let result = sample_result();
    let json = serde_json::to_string(&result).unwrap();
    let back: ScanResult = serde_json::from_str(&json).unwrap();

    assert_eq!(back.matches, result.matches);
    assert_eq!(back.summary, result.summary);
    assert_eq!(back.duration, result.duration);
}

#[test]
fn test_terminal_event_carries_result() {
    let event = ScanEvent::Cancelled(sample_result());
    assert!(event.is_terminal());
    assert_eq!(event.into_result().map(|r| r.len()), Some(3));

    let failed = ScanEvent::Failed {
        error: "walker stopped".into(),
    };
    assert!(failed.is_terminal());
    assert!(failed.into_result().is_none());
}

#[test]
fn test_config_serde_defaults() {
    let config: ScanConfig = serde_json::from_str(r#"{ "root": "/astro" }"#).unwrap();

    assert_eq!(config.root, PathBuf::from("/astro"));
    assert_eq!(config.targets.len(), DEFAULT_TARGETS.len());
    assert_eq!(config.case_sensitivity, CaseSensitivity::Insensitive);
    assert_eq!(config.symlink_policy, SymlinkPolicy::CountAsZero);
    assert_eq!(config.workers, 0);
}

#[test]
fn test_config_enums_use_snake_case() {
    let config: ScanConfig = serde_json::from_str(
        r#"{
            "root": "/astro",
            "targets": ["Calibrated"],
            "case_sensitivity": "sensitive",
            "workers": 3,
            "symlink_policy": "count_own_size"
        }"#,
    )
    .unwrap();

    let request = ScanRequest::from_config(&config).unwrap();
    assert_eq!(request.workers, 3);
    assert_eq!(request.symlink_policy, SymlinkPolicy::CountOwnSize);
    assert!(request.targets.matches("Calibrated"));
    assert!(!request.targets.matches("calibrated"));
}

#[test]
fn test_request_rejects_bad_targets() {
    let config = ScanConfig::new("/astro").with_targets(["  ", ""]);
    assert!(matches!(
        ScanRequest::from_config(&config),
        Err(ScanError::InvalidConfig { .. })
    ));

    let config = ScanConfig::new("/astro").with_targets(["lights/calibrated"]);
    assert!(matches!(
        ScanRequest::from_config(&config),
        Err(ScanError::InvalidConfig { .. })
    ));
}

#[test]
fn test_request_does_not_touch_disk() {
    let config = ScanConfig::new("/definitely/not/here/astro");
    let request = ScanRequest::from_config(&config).unwrap();
    assert_eq!(request.root, PathBuf::from("/definitely/not/here/astro"));

    let relative = ScanRequest::from_config(&ScanConfig::new("astro/M31")).unwrap();
    assert_eq!(relative.root, PathBuf::from("astro/M31"));

    assert!(matches!(
        ScanRequest::from_config(&ScanConfig::new("")),
        Err(ScanError::InvalidRoot { .. })
    ));
}
