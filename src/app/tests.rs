use super::*;
use crate::actuator::MockActuator;
use crate::config::FeederConfig;
use crate::controller::ActuationCommand;
use crate::events::FeederEvent;
use crate::status::RecordingStatusSink;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;

fn create_test_config(input: &Path) -> FeederConfig {
    let mut config = FeederConfig::default();
    config.input.path = input.display().to_string();
    config.button.enabled = false;
    config
}

fn create_test_orchestrator(
    config: FeederConfig,
) -> (FeederOrchestrator, MockActuator, RecordingStatusSink) {
    let actuator = MockActuator::new();
    let sink = RecordingStatusSink::new();
    let orchestrator = FeederOrchestrator::with_components(
        config,
        Arc::new(actuator.clone()),
        Arc::new(sink.clone()),
    )
    .unwrap();
    (orchestrator, actuator, sink)
}

fn write_input(dir: &tempfile::TempDir, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join("detections.jsonl");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, &[]);
    let (mut orchestrator, _actuator, _sink) = create_test_orchestrator(create_test_config(&input));

    assert!(orchestrator.components().snapshot().is_empty());
    assert!(orchestrator.stats().is_none());

    orchestrator.initialize().await.unwrap();
    assert_eq!(
        orchestrator.components().get("controller"),
        Some(ComponentState::Stopped)
    );
    assert_eq!(
        orchestrator.components().get("source"),
        Some(ComponentState::Stopped)
    );
    assert_eq!(orchestrator.components().get("button"), None);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, &[]);
    let mut config = create_test_config(&input);
    config.controller.intruder_species = config.controller.feed_species;

    let result = FeederOrchestrator::with_components(
        config,
        Arc::new(MockActuator::new()),
        Arc::new(RecordingStatusSink::new()),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_replays_detection_stream() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        &[
            r#"{"detections":[{"class_id":0,"confidence":0.995}],"timestamp_ms":1000}"#,
            r#"{"detections":[{"class_id":0,"confidence":0.995}],"timestamp_ms":2000}"#,
            r#"{"detections":[{"class_id":1,"confidence":0.999}],"timestamp_ms":3000}"#,
            r#"{"detections":[],"timestamp_ms":12000}"#,
            r#"{"detections":[{"class_id":0,"confidence":0.999}],"timestamp_ms":12500}"#,
        ],
    );
    let (mut orchestrator, actuator, sink) = create_test_orchestrator(create_test_config(&input));

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(
        actuator.executed(),
        vec![
            ActuationCommand::Feed,
            ActuationCommand::AssertDeterrent,
            ActuationCommand::ClearDeterrent,
            ActuationCommand::Feed,
        ]
    );

    let stats = orchestrator.stats().unwrap();
    assert_eq!(stats.frames_processed, 5);
    assert_eq!(stats.feeds_issued, 2);
    assert_eq!(stats.deterrent_raised, 1);
    assert_eq!(stats.deterrent_cleared, 1);

    let texts = sink.texts();
    assert!(texts.contains(&"Intruder detected".to_string()));
    assert!(texts.contains(&"Intruder departed".to_string()));
    assert_eq!(
        orchestrator.components().get("controller"),
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_end_of_stream_clears_deterrent() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        &[r#"{"detections":[{"class_id":1,"confidence":1.0}],"timestamp_ms":1000}"#],
    );
    let (mut orchestrator, actuator, _sink) = create_test_orchestrator(create_test_config(&input));

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(
        actuator.executed(),
        vec![
            ActuationCommand::AssertDeterrent,
            ActuationCommand::ClearDeterrent
        ]
    );
}

#[tokio::test]
async fn test_missing_input_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir.path().join("absent.jsonl"));
    let (mut orchestrator, actuator, _sink) = create_test_orchestrator(config);

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit_code, 1);
    assert!(actuator.executed().is_empty());
    assert_eq!(
        orchestrator.components().get("source"),
        Some(ComponentState::Failed)
    );
}

#[tokio::test]
async fn test_labels_restrict_known_classes() {
    let dir = tempfile::tempdir().unwrap();
    let labels = dir.path().join("labels.txt");
    std::fs::write(&labels, "0 cat\n1 raccoon\n").unwrap();
    let input = write_input(
        &dir,
        &[
            r#"[{"class_id":7,"confidence":1.0}]"#,
            r#"[{"class_id":0,"confidence":1.0}]"#,
        ],
    );
    let mut config = create_test_config(&input);
    config.labels.path = Some(labels.display().to_string());
    let (mut orchestrator, actuator, _sink) = create_test_orchestrator(config);

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(actuator.executed(), vec![ActuationCommand::Feed]);
    assert_eq!(orchestrator.stats().unwrap().detections_rejected, 1);
}

#[tokio::test]
async fn test_bus_shutdown_request_reaches_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, &[]);
    let (mut orchestrator, _actuator, _sink) = create_test_orchestrator(create_test_config(&input));

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    orchestrator
        .event_bus()
        .publish(FeederEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "test".to_string(),
        })
        .unwrap();

    let receiver = orchestrator.shutdown_receiver.take().unwrap();
    let reason = timeout(Duration::from_secs(1), receiver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reason, ShutdownReason::UserRequest);

    assert_eq!(orchestrator.shutdown().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reset_handle_accepts_requests() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, &[]);
    let (orchestrator, _actuator, _sink) = create_test_orchestrator(create_test_config(&input));

    let handle = orchestrator.reset_handle();
    assert!(handle.request(crate::service::ResetSource::Internal));
}

#[test]
fn test_shutdown_reason_exit_codes() {
    assert_eq!(ShutdownReason::InputEnded.exit_code(), 0);
    assert_eq!(ShutdownReason::UserRequest.exit_code(), 0);
    assert_eq!(ShutdownReason::Signal("SIGTERM".into()).exit_code(), 0);
    assert_eq!(ShutdownReason::Error("boom".into()).exit_code(), 1);
}
