// Harmonic module - pitch-class profile and harmonic complexity
//
// Every bin is folded onto one of the 12 equal-tempered pitch classes via
// its MIDI note number, giving a chroma-like profile of the frame.

/// Number of pitch classes in the harmonic profile
pub const PITCH_CLASSES: usize = 12;

/// Divisor applied to the pitch-class entropy.
///
/// Empirical constant: the true maximum of a 12-class entropy is
/// log2(12) ~= 3.58, so fully flat profiles land slightly below 1.0.
pub const HARMONIC_COMPLEXITY_SCALE: f32 = 4.0;

pub const NOTE_NAMES: [&str; PITCH_CLASSES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Fractional MIDI note number for a frequency: `69 + 12*log2(f/440)`
pub fn midi_from_frequency(frequency_hz: f32) -> f32 {
    69.0 + 12.0 * (frequency_hz / 440.0).log2()
}

/// Pitch class (0 = C) of a frequency, `None` for non-positive input
pub fn pitch_class(frequency_hz: f32) -> Option<usize> {
    if frequency_hz <= 0.0 || !frequency_hz.is_finite() {
        return None;
    }
    let midi = midi_from_frequency(frequency_hz).round() as i64;
    Some(midi.rem_euclid(PITCH_CLASSES as i64) as usize)
}

/// Note name with octave (e.g. "A4"), or "Rest" when there is no pitch
pub fn pitch_name(frequency_hz: f32) -> String {
    if frequency_hz <= 0.0 || !frequency_hz.is_finite() {
        return "Rest".to_string();
    }
    let midi = midi_from_frequency(frequency_hz).round() as i64;
    let name = NOTE_NAMES[midi.rem_euclid(PITCH_CLASSES as i64) as usize];
    let octave = midi.div_euclid(PITCH_CLASSES as i64) - 1;
    format!("{}{}", name, octave)
}

/// Accumulate bin magnitudes per pitch class, normalized so the strongest
/// class is 1.0
///
/// Bins below `min_frequency_hz` are ignored. A silent spectrum yields all
/// zeros.
pub fn compute_harmonic_content(
    spectrum: &[f32],
    bin_width: f32,
    min_frequency_hz: f32,
) -> Vec<f32> {
    let mut classes = vec![0.0_f32; PITCH_CLASSES];

    for (i, &mag) in spectrum.iter().enumerate() {
        let frequency = i as f32 * bin_width;
        if frequency < min_frequency_hz {
            continue;
        }
        if let Some(class) = pitch_class(frequency) {
            classes[class] += mag;
        }
    }

    let max = classes.iter().copied().fold(0.0_f32, f32::max);
    if max > 1e-10 {
        for value in classes.iter_mut() {
            *value /= max;
        }
    } else {
        classes.iter_mut().for_each(|v| *v = 0.0);
    }
    classes
}

/// Shannon entropy (base 2) of the pitch-class distribution divided by
/// [`HARMONIC_COMPLEXITY_SCALE`]
pub fn compute_harmonic_complexity(harmonic_content: &[f32]) -> f32 {
    let total: f32 = harmonic_content.iter().sum();
    if total <= 1e-10 {
        return 0.0;
    }

    let entropy: f32 = harmonic_content
        .iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| {
            let p = v / total;
            -p * p.log2()
        })
        .sum();

    entropy / HARMONIC_COMPLEXITY_SCALE
}
