use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use audio_feature_pipeline::classification::{
    ClassificationReport, ClassificationService, CommandClassifier, DryRunClassifier,
};
use audio_feature_pipeline::fixtures::WavClip;
use audio_feature_pipeline::{
    Dynamics, FeatureStats, FeatureVector, PipelineConfig, PipelineHandle, SpectralAnalyzer,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pipeline_cli",
    about = "Offline harness for the audio feature pipeline"
)]
struct Cli {
    /// JSON configuration file (defaults apply when absent or invalid)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one JSON feature summary per analysis frame of a WAV file
    Analyze {
        #[arg(long)]
        wav: PathBuf,
        /// Stop after this many frames
        #[arg(long)]
        frames: Option<usize>,
        /// Append a FeatureStats line over all printed frames
        #[arg(long)]
        stats: bool,
    },
    /// Run one classification cycle over a WAV file and a text snippet
    Run {
        #[arg(long)]
        wav: PathBuf,
        #[arg(long)]
        text: String,
        /// Command receiving the prompt on stdin; dry run when omitted
        #[arg(long)]
        classifier_cmd: Option<String>,
        /// Feed frames at their audio duration instead of one per sampling tick
        #[arg(long)]
        realtime: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .map(PipelineConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Analyze { wav, frames, stats } => run_analyze(&config, &wav, frames, stats),
        Commands::Run {
            wav,
            text,
            classifier_cmd,
            realtime,
        } => run_cycle(config, &wav, text, classifier_cmd, realtime),
    }
}

fn run_analyze(
    config: &PipelineConfig,
    wav: &Path,
    limit: Option<usize>,
    with_stats: bool,
) -> Result<ExitCode> {
    let clip = load_clip(config, wav)?;
    let mut analyzer = SpectralAnalyzer::new(&config.analyzer);
    let mut vectors = Vec::new();

    for (index, frame) in clip
        .frames(config.analyzer.frame_size)
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
    {
        let vector = analyzer
            .analyze(frame)
            .with_context(|| format!("analyzing frame {}", index))?;
        println!("{}", serde_json::to_string(&FrameSummary::new(index, &vector))?);
        vectors.push(vector);
    }

    if with_stats {
        println!("{}", serde_json::to_string(&FeatureStats::from_vectors(&vectors))?);
    }
    Ok(ExitCode::from(0))
}

fn run_cycle(
    config: PipelineConfig,
    wav: &Path,
    text: String,
    classifier_cmd: Option<String>,
    realtime: bool,
) -> Result<ExitCode> {
    let clip = load_clip(&config, wav)?;
    let frames = clip.frames(config.analyzer.frame_size);
    if frames.is_empty() {
        bail!("{} contains no audio", wav.display());
    }

    let classifier: Arc<dyn ClassificationService> = match classifier_cmd {
        Some(command) => Arc::new(CommandClassifier::from_command_line(&command)?),
        None => Arc::new(DryRunClassifier::new()),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(drive_cycle(config, frames, text, classifier, realtime))
}

async fn drive_cycle(
    config: PipelineConfig,
    frames: Vec<Vec<u8>>,
    text: String,
    classifier: Arc<dyn ClassificationService>,
    realtime: bool,
) -> Result<ExitCode> {
    let prompts = Arc::new(Mutex::new(Vec::<String>::new()));
    let recorded = Arc::clone(&prompts);
    let service = move |prompt: &str| {
        if let Ok(mut prompts) = recorded.lock() {
            prompts.push(prompt.to_string());
        }
        classifier.send(prompt)
    };

    let report = Arc::new(Mutex::new(None::<ClassificationReport>));
    let delivered = Arc::clone(&report);
    let sink = move |parsed: &ClassificationReport| {
        if let Ok(mut slot) = delivered.lock() {
            *slot = Some(parsed.clone());
        }
    };

    let pace = if realtime {
        Duration::from_secs_f64(
            config.analyzer.frame_size as f64 / config.analyzer.sample_rate.max(1) as f64,
        )
    } else {
        config.sampling.sample_interval()
    };

    let handle = PipelineHandle::new(config, Arc::new(service), Arc::new(sink));
    let mut cycle = handle.subscribe_cycle();

    let mut frames = frames.into_iter();
    if let Some(first) = frames.next() {
        handle.feed(first)?;
    }
    handle.begin_cycle()?;
    handle.submit_text(text);

    for frame in frames {
        tokio::time::sleep(pace).await;
        if !handle.sampler().is_running() {
            break;
        }
        handle.feed(frame)?;
    }

    cycle
        .wait_for(|active| active.is_none())
        .await
        .context("waiting for the classification cycle")?;

    let prompt = prompts
        .lock()
        .map_err(|_| anyhow!("prompt log poisoned"))?
        .last()
        .cloned();
    let report = report
        .lock()
        .map_err(|_| anyhow!("report slot poisoned"))?
        .clone();

    match (prompt, report) {
        (Some(prompt), Some(report)) => {
            println!("{prompt}");
            println!();
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::from(0))
        }
        (Some(prompt), None) => {
            println!("{prompt}");
            eprintln!("Classification failed; see log output");
            Ok(ExitCode::from(1))
        }
        (None, _) => {
            eprintln!("Cycle ended before a prompt was sent");
            Ok(ExitCode::from(1))
        }
    }
}

fn load_clip(config: &PipelineConfig, wav: &Path) -> Result<WavClip> {
    let clip = WavClip::load(wav)?;
    if clip.sample_rate != config.analyzer.sample_rate {
        log::warn!(
            "[pipeline_cli] {} is {} Hz, analyzer assumes {} Hz",
            wav.display(),
            clip.sample_rate,
            config.analyzer.sample_rate
        );
    }
    Ok(clip)
}

/// Per-frame JSON line; the full spectrum is left out
#[derive(Serialize)]
struct FrameSummary {
    frame: usize,
    timestamp_ms: f64,
    amplitude: f32,
    energy: f32,
    pitch_hz: f32,
    pitch_name: String,
    /// `None` for silent frames (-inf dB)
    loudness_db: Option<f32>,
    dynamics: Dynamics,
    spectral_centroid: f32,
    spectral_spread: f32,
    spectral_rolloff: f32,
    brightness: f32,
    roughness: f32,
    spectral_flux: f32,
    harmonic_complexity: f32,
    harmonic_content: Vec<f32>,
    is_beat: bool,
}

impl FrameSummary {
    fn new(frame: usize, vector: &FeatureVector) -> Self {
        let loudness = vector.loudness();
        Self {
            frame,
            timestamp_ms: vector.timestamp_ms,
            amplitude: vector.amplitude,
            energy: vector.energy,
            pitch_hz: vector.pitch(),
            pitch_name: vector.pitch_name(),
            loudness_db: loudness.is_finite().then_some(loudness),
            dynamics: vector.dynamics(),
            spectral_centroid: vector.spectral_centroid,
            spectral_spread: vector.spectral_spread,
            spectral_rolloff: vector.spectral_rolloff,
            brightness: vector.brightness,
            roughness: vector.roughness,
            spectral_flux: vector.spectral_flux,
            harmonic_complexity: vector.harmonic_complexity,
            harmonic_content: vector.harmonic_content.clone(),
            is_beat: vector.is_beat,
        }
    }
}
