//! End-to-end sampling tests
//!
//! Drive a real `SamplingCoordinator` on a paused tokio clock so a full
//! 5-second session runs instantly:
//! - 50 sweep frames fed every 100 ms complete exactly once
//! - Session bounds (sample cap, deadline plus one tick)
//! - Telemetry counts agree with the delivered vectors

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audio_feature_pipeline::config::{AnalyzerConfig, SamplingConfig};
use audio_feature_pipeline::fixtures::sine_sweep_frames;
use audio_feature_pipeline::telemetry::{PipelineEvent, TelemetryCollector};
use audio_feature_pipeline::{FeatureStats, FeatureVector, SamplingCoordinator, SharedAnalyzer};
use tokio::sync::mpsc;
use tokio::time::Instant;

const FRAME_SIZE: usize = 2048;
const SAMPLE_RATE: u32 = 44_100;

fn sampler(telemetry: Arc<TelemetryCollector>) -> SamplingCoordinator {
    SamplingCoordinator::new(
        SharedAnalyzer::new(&AnalyzerConfig::default()),
        SamplingConfig::default(),
        telemetry,
    )
}

#[tokio::test(start_paused = true)]
async fn fifty_sweep_frames_complete_exactly_once() {
    let telemetry = Arc::new(TelemetryCollector::default());
    let sampler = sampler(Arc::clone(&telemetry));
    let frames = sine_sweep_frames(50, FRAME_SIZE, SAMPLE_RATE, 220.0, 1760.0);

    let completions = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let cleanups = Arc::new(AtomicUsize::new(0));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(Vec<FeatureVector>, FeatureStats)>();

    sampler.feed(frames[0].clone()).unwrap();
    let started = Instant::now();
    {
        let completions = Arc::clone(&completions);
        let errors = Arc::clone(&errors);
        let cleanups = Arc::clone(&cleanups);
        sampler
            .start(
                move |vectors, stats| {
                    completions.fetch_add(1, Ordering::SeqCst);
                    let _ = done_tx.send((vectors, stats));
                },
                move |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                },
                move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap();
    }

    let feeder = {
        let sampler = sampler.clone();
        tokio::spawn(async move {
            for frame in frames.into_iter().skip(1) {
                tokio::time::sleep(Duration::from_millis(100)).await;
                sampler.feed(frame).unwrap();
            }
        })
    };

    let (vectors, stats) = done_rx.recv().await.unwrap();
    let elapsed = started.elapsed();
    feeder.await.unwrap();

    // Let any stray tick run before counting callbacks
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert!(done_rx.try_recv().is_err());

    assert_eq!(vectors.len(), 50);
    assert_eq!(stats.sample_count, 50);
    assert!(elapsed <= Duration::from_millis(5_100));
    assert!((stats.duration_ms - 4_900.0).abs() < 1.0, "{}", stats.duration_ms);

    let bin_width = SAMPLE_RATE as f32 / FRAME_SIZE as f32;
    assert!((vectors[0].pitch() - 220.0).abs() <= bin_width);
    assert!(vectors
        .windows(2)
        .all(|pair| pair[0].pitch() <= pair[1].pitch()));
    assert!(vectors
        .windows(2)
        .all(|pair| pair[0].timestamp_ms <= pair[1].timestamp_ms));
    assert!(vectors.iter().all(|v| v.spectrum.len() == FRAME_SIZE / 2));

    let snapshot = telemetry.snapshot();
    assert_eq!(
        snapshot.count(|event| matches!(event, PipelineEvent::SampleCollected { .. })),
        50
    );
    assert_eq!(
        snapshot.count(|event| matches!(
            event,
            PipelineEvent::SessionCompleted { sample_count: 50 }
        )),
        1
    );
    assert!(!sampler.is_running());
}

#[tokio::test(start_paused = true)]
async fn session_without_producer_reports_empty_stats() {
    let telemetry = Arc::new(TelemetryCollector::default());
    let sampler = sampler(Arc::clone(&telemetry));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let started = Instant::now();

    sampler
        .start(
            move |vectors: Vec<FeatureVector>, stats: FeatureStats| {
                let _ = done_tx.send((vectors.len(), stats));
            },
            |_| {},
            || {},
        )
        .unwrap();

    let (count, stats) = done_rx.recv().await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(stats.sample_count, 0);
    assert_eq!(stats.duration_ms, 0.0);
    assert_eq!(stats.energy_mean, 0.0);
    assert!(started.elapsed() <= Duration::from_millis(5_100));

    let snapshot = telemetry.snapshot();
    assert_eq!(
        snapshot.count(|event| matches!(event, PipelineEvent::SampleSkipped)),
        50
    );
}

#[tokio::test(start_paused = true)]
async fn silent_session_stays_finite() {
    let sampler = sampler(Arc::new(TelemetryCollector::default()));
    sampler.feed(vec![0u8; FRAME_SIZE * 2]).unwrap();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    sampler
        .start(
            move |vectors: Vec<FeatureVector>, stats: FeatureStats| {
                let _ = done_tx.send((vectors, stats));
            },
            |_| {},
            || {},
        )
        .unwrap();

    let (vectors, stats) = done_rx.recv().await.unwrap();
    assert_eq!(vectors.len(), 50);
    assert!(vectors.iter().all(|v| v.energy == 0.0 && v.pitch() == 0.0));
    assert!(stats.loudness_mean_db.is_finite());
    assert_eq!(stats.pitch_variance, 0.0);
}
