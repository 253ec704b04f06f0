use super::*;
use crate::analysis::features::encode_pcm16_le;
use crate::classification::{ClassificationReport, DryRunClassifier};
use crate::config::{SamplingConfig, TaskConfig};
use crate::error::ClassifierError;
use crate::telemetry::PipelineEvent;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::time::Duration;

struct TestPipeline {
    handle: PipelineHandle,
    classifier: Arc<DryRunClassifier>,
    reports: Arc<Mutex<Vec<ClassificationReport>>>,
}

fn pipeline(config: PipelineConfig) -> TestPipeline {
    let classifier = Arc::new(DryRunClassifier::new());
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink_reports = Arc::clone(&reports);
    let handle = PipelineHandle::new(
        config,
        classifier.clone(),
        Arc::new(move |report: &ClassificationReport| {
            sink_reports.lock().unwrap().push(report.clone());
        }),
    );
    TestPipeline {
        handle,
        classifier,
        reports,
    }
}

fn tone(frequency: f32) -> Vec<u8> {
    let samples: Vec<f32> = (0..2048)
        .map(|i| 0.6 * (2.0 * std::f32::consts::PI * frequency * i as f32 / 44_100.0).sin())
        .collect();
    encode_pcm16_le(&samples)
}

async fn wait_cycle_end(handle: &PipelineHandle) {
    let mut rx = handle.subscribe_cycle();
    rx.wait_for(|active| active.is_none()).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_full_cycle_sends_one_prompt() {
    let p = pipeline(PipelineConfig::default());
    p.handle.feed(tone(440.0)).unwrap();

    p.handle.begin_cycle().unwrap();
    assert!(p.handle.is_cycle_active());
    p.handle.submit_text("hello");

    wait_cycle_end(&p.handle).await;

    let prompts = p.classifier.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("- samples: 50"));
    assert!(prompts[0].contains("hello"));
    assert_eq!(p.reports.lock().unwrap().len(), 1);
    assert!(!p.handle.coordinator().is_complete());
    assert_eq!(p.handle.coordinator().generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_begin_cycle_twice_rejected() {
    let p = pipeline(PipelineConfig::default());
    p.handle.begin_cycle().unwrap();
    assert_eq!(p.handle.begin_cycle(), Err(SessionError::AlreadyRunning));
    p.handle.cancel_cycle().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_cycle_is_quiescent() {
    let p = pipeline(PipelineConfig::default());
    p.handle.feed(tone(440.0)).unwrap();
    p.handle.begin_cycle().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    p.handle.cancel_cycle().unwrap();
    assert!(!p.handle.is_cycle_active());

    p.handle.submit_text("late");
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(p.classifier.prompts().is_empty());

    // Restartable
    assert!(p.handle.begin_cycle().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_begin_is_noop() {
    let p = pipeline(PipelineConfig::default());
    assert!(p.handle.cancel_cycle().is_ok());
    assert!(!p.handle.is_cycle_active());
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_abandons_cycle_without_text() {
    let config = PipelineConfig {
        task: TaskConfig {
            poll_ms: 200,
            timeout_ms: 15_000,
            max_attempts: 50,
        },
        ..PipelineConfig::default()
    };
    let p = pipeline(config);
    p.handle.feed(tone(330.0)).unwrap();
    p.handle.begin_cycle().unwrap();

    wait_cycle_end(&p.handle).await;

    assert!(p.classifier.prompts().is_empty());
    assert_eq!(p.handle.coordinator().generation(), 1);
    assert!(p.handle.coordinator().snapshot().audio_stats.is_none());

    let snapshot = p.handle.telemetry().snapshot();
    assert_eq!(
        snapshot.count(|event| matches!(
            event,
            PipelineEvent::TaskCompleted {
                reason: CompletionReason::MaxAttempts,
                ..
            }
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_recognize_text_runs_once() {
    let p = pipeline(PipelineConfig::default());
    p.handle.feed(tone(440.0)).unwrap();
    p.handle.begin_cycle().unwrap();

    assert!(p.handle.recognize_text(|| Some("from ocr".to_string())));
    wait_cycle_end(&p.handle).await;

    let prompts = p.classifier.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("from ocr"));
}

#[tokio::test(start_paused = true)]
async fn test_sampling_error_leaves_audio_absent() {
    let p = pipeline(PipelineConfig::default());
    p.handle.feed(vec![0u8; 3]).unwrap();
    p.handle.begin_cycle().unwrap();
    p.handle.submit_text("hello");

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = p.handle.coordinator().snapshot();
    assert!(snapshot.audio_stats.is_none());
    assert_eq!(snapshot.recognized_text.as_deref(), Some("hello"));
    assert!(p.classifier.prompts().is_empty());
    assert!(!p.handle.sampler().is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_classifier_outlives_watchdog() {
    let config = PipelineConfig {
        sampling: SamplingConfig {
            max_samples: 2,
            total_duration_ms: 40,
        },
        task: TaskConfig {
            poll_ms: 20,
            timeout_ms: 1_000,
            max_attempts: 5,
        },
        ..PipelineConfig::default()
    };

    let (release_tx, release_rx) = std_mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let service = move |_: &str| -> Result<String, ClassifierError> {
        let _ = release_rx.lock().unwrap().recv();
        Ok(r#"{"emotion": "joy"}"#.to_string())
    };
    let reports = Arc::new(Mutex::new(Vec::<ClassificationReport>::new()));
    let sink_reports = Arc::clone(&reports);
    let handle = PipelineHandle::new(
        config,
        Arc::new(service),
        Arc::new(move |report: &ClassificationReport| {
            sink_reports.lock().unwrap().push(report.clone());
        }),
    );

    handle.feed(tone(440.0)).unwrap();
    handle.begin_cycle().unwrap();
    handle.submit_text("hello");

    // Well past the watchdog's 5 x 20 ms budget
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(handle.coordinator().is_dispatching());
    assert!(handle.is_cycle_active());
    assert_eq!(handle.begin_cycle(), Err(SessionError::AlreadyRunning));

    release_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), wait_cycle_end(&handle))
        .await
        .expect("cycle should end once the response settles");

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].emotion, "joy");

    let snapshot = handle.telemetry().snapshot();
    assert_eq!(
        snapshot.count(|event| matches!(event, PipelineEvent::ClassificationDiscarded { .. })),
        0
    );
    assert_eq!(
        snapshot.count(|event| matches!(event, PipelineEvent::ClassificationDelivered { .. })),
        1
    );
    assert!(!handle.is_cycle_active());
}

#[tokio::test(start_paused = true)]
async fn test_next_cycle_after_settle() {
    let p = pipeline(PipelineConfig::default());
    p.handle.feed(tone(440.0)).unwrap();
    p.handle.begin_cycle().unwrap();
    p.handle.submit_text("first");
    wait_cycle_end(&p.handle).await;

    p.handle.begin_cycle().unwrap();
    assert_eq!(*p.handle.subscribe_cycle().borrow(), Some(1));
    p.handle.submit_text("second");
    wait_cycle_end(&p.handle).await;

    assert_eq!(p.classifier.prompts().len(), 2);
    assert_eq!(p.reports.lock().unwrap().len(), 2);
}
