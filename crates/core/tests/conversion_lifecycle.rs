//! Conversion lifecycle integration tests.
//!
//! Exercises the orchestrator against the mock engine:
//! - Artifact shape on success (media type, size label, download name)
//! - Trigger guards (no file, already running) as strict no-ops
//! - Failure paths re-arming the trigger
//! - Virtual-file cleanup flag
//! - Engine log forwarding into the sink

use std::sync::Arc;
use std::time::Duration;

use wavepress_core::{
    testing::{EngineCall, MockEngine},
    CompressionLevel, ConversionConfig, ConversionPhase, ConvertError, EngineError, IntakeConfig,
    Orchestrator,
};

struct TestHarness {
    orchestrator: Orchestrator,
    engine: Arc<MockEngine>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(ConversionConfig::default())
    }

    fn with_config(conversion: ConversionConfig) -> Self {
        let engine = Arc::new(MockEngine::new());
        let engine_handle: Arc<dyn wavepress_core::TranscodeEngine> = engine.clone();
        let orchestrator = Orchestrator::new(engine_handle, conversion, IntakeConfig::default());
        Self {
            orchestrator,
            engine,
        }
    }

    async fn select_flac(&self, name: &str, size: usize) {
        self.orchestrator
            .select_file(name, "audio/flac", vec![0u8; size])
            .await
            .expect("intake should accept audio");
    }
}

#[tokio::test]
async fn test_successful_conversion_produces_artifact() {
    let harness = TestHarness::new();
    harness.engine.set_exec_output("output.mp3", vec![0u8; 2_097_152]).await;
    harness.select_flac("song.flac", 4096).await;

    let report = harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();

    assert_eq!(report.download_name, "compressed_song.mp3");
    assert_eq!(report.output_size_bytes, 2_097_152);
    assert_eq!(report.output_size_label, "2.00");

    let artifact = harness.orchestrator.artifact().await.unwrap();
    assert_eq!(artifact.media_type, "audio/mp3");
    assert_eq!(artifact.size_bytes, 2_097_152);

    let status = harness.orchestrator.status().await;
    assert_eq!(status.phase, ConversionPhase::Done);
    assert_eq!(status.status_line, "Conversion complete!");
    assert!(status.has_result);
    assert!(!status.converting);
}

#[tokio::test]
async fn test_pipeline_calls_engine_in_order() {
    let harness = TestHarness::new();
    harness.select_flac("song.flac", 128).await;

    harness
        .orchestrator
        .convert(CompressionLevel::High)
        .await
        .unwrap();

    let calls = harness.engine.recorded_calls().await;
    assert_eq!(
        calls,
        vec![
            EngineCall::Write {
                name: "input.flac".to_string(),
                len: 128
            },
            EngineCall::Exec {
                args: vec![
                    "-i".to_string(),
                    "input.flac".to_string(),
                    "-vn".to_string(),
                    "-b:a".to_string(),
                    "192k".to_string(),
                    "output.mp3".to_string(),
                ]
            },
            EngineCall::Read {
                name: "output.mp3".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_extension_preserved_and_absent() {
    let harness = TestHarness::new();

    harness.select_flac("noext", 16).await;
    harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();

    let calls = harness.engine.recorded_calls().await;
    assert!(calls.contains(&EngineCall::Write {
        name: "input".to_string(),
        len: 16
    }));
}

#[tokio::test]
async fn test_convert_without_selection_is_noop() {
    let harness = TestHarness::new();

    let err = harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoFileSelected));

    // No state transition, no engine call.
    assert!(harness.engine.recorded_calls().await.is_empty());
    let status = harness.orchestrator.status().await;
    assert_eq!(status.phase, ConversionPhase::Idle);
}

#[tokio::test]
async fn test_exec_failure_sets_failed_and_rearms_trigger() {
    let harness = TestHarness::new();
    harness.select_flac("song.flac", 64).await;
    harness
        .engine
        .fail_next_exec(EngineError::exec_failed("codec exploded", None))
        .await;

    let err = harness
        .orchestrator
        .convert(CompressionLevel::Low)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("codec exploded"));

    let status = harness.orchestrator.status().await;
    assert_eq!(status.phase, ConversionPhase::Failed);
    assert!(status.status_line.contains("codec exploded"));
    assert!(!status.converting);
    assert!(!status.has_result);
    assert!(harness.orchestrator.artifact().await.is_none());

    // Manual retry works; the injected error was consumed.
    harness
        .orchestrator
        .convert(CompressionLevel::Low)
        .await
        .unwrap();
    assert_eq!(
        harness.orchestrator.status().await.phase,
        ConversionPhase::Done
    );
}

#[tokio::test]
async fn test_memory_failure_appends_smaller_file_hint() {
    let harness = TestHarness::new();
    harness.select_flac("big.flac", 64).await;
    harness
        .engine
        .fail_next_exec(EngineError::exec_failed(
            "abort",
            Some("Cannot allocate memory".to_string()),
        ))
        .await;

    let _ = harness.orchestrator.convert(CompressionLevel::Balanced).await;

    let status = harness.orchestrator.status().await;
    assert!(status.status_line.contains("Try a smaller file"));
}

#[tokio::test]
async fn test_repeated_conversions_are_independent() {
    let harness = TestHarness::new();
    harness.select_flac("song.flac", 64).await;

    for _ in 0..3 {
        harness
            .orchestrator
            .convert(CompressionLevel::Balanced)
            .await
            .unwrap();
    }
    assert_eq!(harness.engine.exec_count().await, 3);
}

#[tokio::test]
async fn test_concurrent_trigger_is_rejected() {
    let harness = Arc::new(TestHarness::new());
    harness.engine.set_exec_duration(Duration::from_millis(200)).await;
    harness.select_flac("song.flac", 64).await;

    let background = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.orchestrator.convert(CompressionLevel::Balanced).await })
    };

    // Let the background conversion take the trigger.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.orchestrator.status().await.converting);

    let err = harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Busy));

    background.await.unwrap().unwrap();
    assert!(!harness.orchestrator.status().await.converting);
}

#[tokio::test]
async fn test_virtual_files_leak_by_default() {
    let harness = TestHarness::new();
    harness.select_flac("song.flac", 64).await;

    harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();

    let files = harness.engine.virtual_files().await;
    assert!(files.contains_key("input.flac"));
    assert!(files.contains_key("output.mp3"));
    let calls = harness.engine.recorded_calls().await;
    assert!(!calls.iter().any(|c| matches!(c, EngineCall::Delete { .. })));
}

#[tokio::test]
async fn test_cleanup_flag_deletes_virtual_files() {
    let harness = TestHarness::with_config(ConversionConfig {
        cleanup_virtual_files: true,
        ..Default::default()
    });
    harness.select_flac("song.flac", 64).await;

    harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();

    let files = harness.engine.virtual_files().await;
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_engine_log_lines_reach_sink() {
    let harness = TestHarness::new();
    harness
        .engine
        .set_log_lines(vec!["size=     128kB time=00:00:03".to_string()])
        .await;
    harness.select_flac("song.flac", 64).await;

    harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();

    // The forwarder task runs concurrently; give it a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let lines = harness.orchestrator.log_sink().lines().await;
    assert!(lines
        .iter()
        .any(|l| l.line.contains("size=     128kB time=00:00:03")));
}

#[tokio::test]
async fn test_selecting_new_file_clears_result_and_log() {
    let harness = TestHarness::new();
    harness.select_flac("first.flac", 64).await;
    harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();
    assert!(harness.orchestrator.artifact().await.is_some());

    harness.select_flac("second.flac", 64).await;
    assert!(harness.orchestrator.artifact().await.is_none());

    // The log pane was cleared along with the result.
    let lines = harness.orchestrator.log_sink().lines().await;
    assert!(!lines.iter().any(|l| l.line.starts_with("job ")));

    let status = harness.orchestrator.status().await;
    let selected = status.selected.unwrap();
    assert_eq!(selected.file_name, "second.flac");
}

#[tokio::test]
async fn test_unloaded_engine_fails_downstream_then_recovers() {
    let engine = Arc::new(MockEngine::unloaded());
    let engine_handle: Arc<dyn wavepress_core::TranscodeEngine> = engine.clone();
    let orchestrator = Orchestrator::new(
        engine_handle,
        ConversionConfig::default(),
        IntakeConfig::default(),
    );
    orchestrator
        .select_file("song.flac", "audio/flac", vec![0u8; 32])
        .await
        .unwrap();

    // Trigger is usable, conversion fails downstream.
    let err = orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Engine(EngineError::NotLoaded)));
    assert_eq!(
        orchestrator.status().await.phase,
        ConversionPhase::Failed
    );

    orchestrator.load_engine().await;
    let status = orchestrator.status().await;
    assert!(status.engine_loaded);
    assert_eq!(status.status_line, "Engine loaded. Ready.");

    orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_size_label_rounding_in_report() {
    let harness = TestHarness::new();
    // 3,590,324 / 1,048,576 = 3.4240...
    harness
        .engine
        .set_exec_output("output.mp3", vec![0u8; 3_590_324])
        .await;
    harness.select_flac("song.flac", 64).await;

    let report = harness
        .orchestrator
        .convert(CompressionLevel::Balanced)
        .await
        .unwrap();
    assert_eq!(report.output_size_label, "3.42");
}
