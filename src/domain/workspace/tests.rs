use super::*;
use crate::domain::errors::{CaptureFailure, ValidationError};

fn ready_workspace(duration: f64) -> Workspace {
    let mut workspace = Workspace::default();
    workspace.select_source("holiday.mp4");
    workspace.on_metadata_loaded(duration);
    workspace
}

fn completed(bytes: &[u8]) -> TrimOutcome {
    TrimOutcome::Completed(TrimResult::from_chunks(vec![bytes.to_vec()], OutputFormat::Webm))
}

#[test]
fn test_initial_state() {
    let workspace = Workspace::default();
    assert!(workspace.source().is_none());
    assert!(workspace.status().is_empty());
    assert_eq!(workspace.range().end(), 10.0);
    assert!(!workspace.can_trim());
}

#[test]
fn test_metadata_opens_default_window() {
    let workspace = ready_workspace(30.0);
    assert_eq!(workspace.range().start(), 0.0);
    assert_eq!(workspace.range().end(), 10.0);
    assert_eq!(workspace.duration(), 30.0);
    assert_eq!(workspace.status(), &StatusMessage::Ready);
    assert!(workspace.can_trim());
}

#[test]
fn test_new_selection_resets_everything() {
    let mut workspace = ready_workspace(30.0);
    workspace.begin_trim(ReadyState::HaveEnoughData).unwrap();
    workspace.finish_trim(completed(b"clip"));
    assert!(workspace.result().is_some());

    workspace.select_source("other.mov");
    assert!(workspace.result().is_none());
    assert!(workspace.status().is_empty());
    assert_eq!(workspace.range().start(), 0.0);
    assert_eq!(workspace.range().end(), 0.0);
    assert_eq!(workspace.duration(), 0.0);
    assert!(!workspace.can_trim());
}

#[test]
fn test_range_edits_clear_status() {
    let mut workspace = ready_workspace(30.0);
    workspace.set_start(5.0);
    assert!(workspace.status().is_empty());
    workspace.set_end(3.0);
    assert_eq!(workspace.range().end(), 5.0);
}

#[test]
fn test_trim_without_source() {
    let mut workspace = Workspace::default();
    let err = workspace.begin_trim(ReadyState::HaveNothing).unwrap_err();
    assert!(matches!(err, DomainError::Validation(ValidationError::NoSource)));
    assert_eq!(workspace.status().to_string(), "Please upload a video first.");
    assert_eq!(workspace.range().end(), 10.0);
    assert!(!workspace.is_busy());
}

#[test]
fn test_trim_before_data_loaded() {
    let mut workspace = ready_workspace(30.0);
    workspace.set_start(2.0);
    assert!(workspace.begin_trim(ReadyState::HaveMetadata).is_err());
    assert_eq!(workspace.status(), &StatusMessage::NotLoaded);
    assert_eq!(workspace.phase(), TrimPhase::Idle);
    assert_eq!(workspace.range().start(), 2.0);
}

#[test]
fn test_trim_out_of_range() {
    let mut workspace = ready_workspace(30.0);
    workspace.set_end(45.0);
    assert!(workspace.begin_trim(ReadyState::HaveEnoughData).is_err());
    assert_eq!(workspace.status(), &StatusMessage::OutOfRange);
}

#[test]
fn test_accepted_trim_is_busy_until_finished() {
    let mut workspace = ready_workspace(30.0);
    workspace.set_end(8.0);
    workspace.set_start(2.0);
    let plan = workspace.begin_trim(ReadyState::HaveEnoughData).unwrap();
    assert_eq!((plan.start, plan.end), (2.0, 8.0));
    assert_eq!(workspace.phase(), TrimPhase::Validating);
    assert!(workspace.is_busy());
    assert!(!workspace.can_trim());
    assert_eq!(workspace.status(), &StatusMessage::Trimming);

    assert!(matches!(
        workspace.begin_trim(ReadyState::HaveEnoughData),
        Err(DomainError::Busy)
    ));
    assert_eq!(workspace.status(), &StatusMessage::Trimming);

    workspace.finish_trim(completed(b"clip"));
    assert!(!workspace.is_busy());
    assert_eq!(workspace.status(), &StatusMessage::Trimmed);
    assert_eq!(workspace.result().unwrap().data(), b"clip");
}

#[test]
fn test_failed_trim_keeps_previous_result_out() {
    let mut workspace = ready_workspace(30.0);
    workspace.begin_trim(ReadyState::HaveEnoughData).unwrap();
    workspace.finish_trim(TrimOutcome::Failed(CaptureFailure::not_supported("h264 in webm")));
    assert!(workspace.result().is_none());
    assert_eq!(
        workspace.status().to_string(),
        "Error during trimming: NotSupportedError"
    );
}

#[test]
fn test_download_without_result() {
    let mut workspace = ready_workspace(30.0);
    assert!(matches!(
        workspace.download_target(),
        Err(DomainError::NothingToDownload)
    ));
    assert_eq!(workspace.status(), &StatusMessage::NothingToDownload);
}

#[test]
fn test_executor_phase_replaces_validating() {
    let mut workspace = ready_workspace(30.0);
    workspace.set_end(8.0);
    workspace.set_start(2.0);
    workspace.begin_trim(ReadyState::HaveEnoughData).unwrap();
    workspace.set_phase(TrimPhase::Seeking);
    assert_eq!(workspace.phase(), TrimPhase::Seeking);
    assert!(matches!(
        workspace.begin_trim(ReadyState::HaveEnoughData),
        Err(DomainError::Busy)
    ));

    workspace.finish_trim(TrimOutcome::Failed(CaptureFailure::invalid_state("stopped early")));
    assert_eq!(workspace.phase(), TrimPhase::Idle);
}
