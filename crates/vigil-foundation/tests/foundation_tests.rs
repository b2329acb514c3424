//! Foundation crate tests
//!
//! Tests cover:
//! - Error types (AppError variants, AudioError, DispatchError)
//! - Recovery strategy mapping
//! - Application state machine transitions

use std::time::Duration;
use vigil_foundation::error::{AppError, AudioError, DispatchError, RecoveryStrategy};
use vigil_foundation::state::{AppState, StateManager};

// ─── Error Tests ────────────────────────────────────────────────────

#[test]
fn audio_error_display_includes_context() {
    let err = AudioError::DeviceNotFound {
        name: Some("hw:1,0".to_string()),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("hw:1,0"), "message should name the device: {}", msg);

    let err = AudioError::BufferOverflow { count: 512 };
    assert!(format!("{}", err).contains("512"));
}

#[test]
fn audio_error_converts_into_app_error() {
    let err: AppError = AudioError::DeviceDisconnected.into();
    assert!(matches!(err, AppError::Audio(AudioError::DeviceDisconnected)));
}

#[test]
fn dispatch_error_converts_into_app_error() {
    let err: AppError = DispatchError::Status { status: 503 }.into();
    assert!(matches!(
        err,
        AppError::Dispatch(DispatchError::Status { status: 503 })
    ));
}

// ─── Recovery Strategy Tests ────────────────────────────────────────

#[test]
fn disconnected_device_retries() {
    let err = AppError::Audio(AudioError::DeviceDisconnected);
    match err.recovery_strategy() {
        RecoveryStrategy::Retry { max_attempts, delay } => {
            assert!(max_attempts > 0);
            assert!(delay >= Duration::from_millis(100));
        }
        other => panic!("expected Retry, got {:?}", other),
    }
}

#[test]
fn missing_device_falls_back_to_default() {
    let err = AppError::Audio(AudioError::DeviceNotFound { name: None });
    match err.recovery_strategy() {
        RecoveryStrategy::Fallback { to } => assert_eq!(to, "default"),
        other => panic!("expected Fallback, got {:?}", other),
    }
}

#[test]
fn dispatch_faults_are_ignored_by_the_loop() {
    let err = AppError::Dispatch(DispatchError::Request("timeout".into()));
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Ignore));
}

#[test]
fn fatal_errors_are_fatal() {
    let err = AppError::Fatal("boom".into());
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
}

// ─── State Machine Tests ────────────────────────────────────────────

#[test]
fn normal_interaction_cycle_transitions() {
    let sm = StateManager::new();
    assert_eq!(sm.current(), AppState::Initializing);

    sm.transition(AppState::Listening).unwrap();
    sm.transition(AppState::Recording).unwrap();
    sm.transition(AppState::Dispatching).unwrap();
    sm.transition(AppState::Listening).unwrap();
    assert_eq!(sm.current(), AppState::Listening);
}

#[test]
fn aborted_recording_returns_to_listening() {
    let sm = StateManager::new();
    sm.transition(AppState::Listening).unwrap();
    sm.transition(AppState::Recording).unwrap();
    sm.transition(AppState::Listening).unwrap();
    assert_eq!(sm.current(), AppState::Listening);
}

#[test]
fn cannot_skip_from_init_to_recording() {
    let sm = StateManager::new();
    let err = sm.transition(AppState::Recording);
    assert!(err.is_err(), "Initializing -> Recording must be rejected");
    assert_eq!(sm.current(), AppState::Initializing);
}

#[test]
fn shutdown_path_reaches_stopped() {
    let sm = StateManager::new();
    sm.transition(AppState::Listening).unwrap();
    sm.transition(AppState::Stopping).unwrap();
    sm.transition(AppState::Stopped).unwrap();
    assert_eq!(sm.current(), AppState::Stopped);
}

#[test]
fn subscribers_observe_transitions() {
    let sm = StateManager::new();
    let rx = sm.subscribe();
    sm.transition(AppState::Listening).unwrap();
    sm.transition(AppState::Recording).unwrap();

    assert_eq!(rx.recv().unwrap(), AppState::Listening);
    assert_eq!(rx.recv().unwrap(), AppState::Recording);
}
