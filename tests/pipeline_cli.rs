use std::path::{Path, PathBuf};
use std::process::Command;

use audio_feature_pipeline::fixtures::write_wav;
use serde_json::Value;

const SAMPLE_RATE: u32 = 44_100;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pipeline_cli"))
}

/// Scratch directory unique to one test
fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "audio_feature_pipeline_{}_{}",
        test,
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn a4_wav(dir: &Path, seconds: f32) -> PathBuf {
    let path = dir.join("a4.wav");
    let samples: Vec<f32> = (0..(SAMPLE_RATE as f32 * seconds) as usize)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
        .collect();
    write_wav(&path, &samples, SAMPLE_RATE).expect("write fixture wav");
    path
}

#[test]
fn analyze_prints_one_line_per_frame() {
    let dir = scratch_dir("analyze");
    let wav = a4_wav(&dir, 0.5);

    let output = cli()
        .args(["analyze", "--wav"])
        .arg(&wav)
        .args(["--frames", "3"])
        .output()
        .expect("failed to run pipeline_cli analyze");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("frame summary JSON"))
        .collect();
    assert_eq!(lines.len(), 3);

    let bin_width = SAMPLE_RATE as f64 / 2048.0;
    for (index, line) in lines.iter().enumerate() {
        assert_eq!(line["frame"].as_u64(), Some(index as u64));
        let pitch = line["pitch_hz"].as_f64().unwrap_or_default();
        assert!((pitch - 440.0).abs() <= bin_width, "pitch {pitch}");
        assert_eq!(line["pitch_name"], "A4");
        assert_eq!(line["harmonic_content"].as_array().map(Vec::len), Some(12));
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn analyze_appends_stats_line() {
    let dir = scratch_dir("analyze_stats");
    let wav = a4_wav(&dir, 0.25);

    let output = cli()
        .args(["analyze", "--stats", "--frames", "4", "--wav"])
        .arg(&wav)
        .output()
        .expect("failed to run pipeline_cli analyze --stats");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let last: Value = serde_json::from_str(stdout.lines().last().expect("stats line"))
        .expect("stats JSON");
    assert_eq!(last["sample_count"].as_u64(), Some(4));
    assert!((last["pitch_mean"].as_f64().unwrap_or_default() - 440.0).abs() < 25.0);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn analyze_missing_file_fails() {
    let output = cli()
        .args(["analyze", "--wav", "/nonexistent/clip.wav"])
        .output()
        .expect("failed to run pipeline_cli analyze");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Error"), "unexpected stderr: {stderr}");
}

#[test]
fn run_dry_cycle_prints_prompt_and_report() {
    let dir = scratch_dir("run");
    let wav = a4_wav(&dir, 1.0);
    let config = dir.join("config.json");
    std::fs::write(
        &config,
        r#"{"sampling": {"max_samples": 5, "total_duration_ms": 500}}"#,
    )
    .expect("write config");

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["run", "--text", "hello there", "--wav"])
        .arg(&wav)
        .output()
        .expect("failed to run pipeline_cli run");
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {stdout}",
        output.status.code()
    );

    assert!(stdout.contains("- samples: 5"), "prompt missing: {stdout}");
    assert!(stdout.contains("hello there"));
    assert!(stdout.contains("A4"));
    assert!(stdout.contains("\"emotion\": \"neutral\""));
    assert!(stdout.contains("\"color\": \"#A9A9A9\""));

    let _ = std::fs::remove_dir_all(dir);
}

#[cfg(unix)]
#[test]
fn run_with_failing_classifier_exits_nonzero() {
    let dir = scratch_dir("run_fail");
    let wav = a4_wav(&dir, 0.5);
    let config = dir.join("config.json");
    std::fs::write(
        &config,
        r#"{"sampling": {"max_samples": 3, "total_duration_ms": 300}}"#,
    )
    .expect("write config");

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["run", "--text", "hi", "--classifier-cmd", "false", "--wav"])
        .arg(&wav)
        .output()
        .expect("failed to run pipeline_cli run");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Classification failed"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(dir);
}
