//! Audio fixtures for the CLI and integration tests.
//!
//! Loads mono WAV clips through `hound`, slices them into analysis frames of
//! little-endian 16-bit PCM (the wire format `feed()` expects), and generates
//! deterministic sine sweeps.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::analysis::features::encode_pcm16_le;

/// Decoded mono clip with samples in [-1, 1]
#[derive(Debug, Clone)]
pub struct WavClip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl WavClip {
    /// Read a mono WAV file (16/24/32-bit int or float)
    pub fn load(path: &Path) -> Result<Self> {
        let (samples, sample_rate) = read_wav(path)?;
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    /// Consecutive frames of `frame_size` samples as PCM bytes
    ///
    /// The final partial frame is kept; the analyzer zero-pads it.
    pub fn frames(&self, frame_size: usize) -> Vec<Vec<u8>> {
        self.samples
            .chunks(frame_size.max(1))
            .map(encode_pcm16_le)
            .collect()
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// `count` frames of a logarithmic sine sweep from `start_hz` to `end_hz`
///
/// Each frame holds one steady tone; consecutive frames step in pitch.
pub fn sine_sweep_frames(
    count: usize,
    frame_size: usize,
    sample_rate: u32,
    start_hz: f32,
    end_hz: f32,
) -> Vec<Vec<u8>> {
    (0..count)
        .map(|frame| {
            let t = if count > 1 {
                frame as f32 / (count - 1) as f32
            } else {
                0.0
            };
            let frequency = start_hz * (end_hz / start_hz).powf(t);
            let samples: Vec<f32> = (0..frame_size)
                .map(|i| {
                    let phase = 2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32;
                    0.5 * phase.sin()
                })
                .collect();
            encode_pcm16_le(&samples)
        })
        .collect()
}

/// Write mono 16-bit PCM samples to a WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer
            .write_sample(value)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow!(
            "{} must be mono (found {} channels)",
            path.display(),
            spec.channels
        ));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(|err| anyhow!(err)))
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    Ok((samples, spec.sample_rate))
}
