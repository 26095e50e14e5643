//! Audio I/O and basic processing functionality

use crate::analysis::{PitchAnalysis, ReconciliationReport, RhythmAnalysis, TimedNote};
use crate::config::Config;
use crate::error::{Result as TranscribeResult, TranscribeError};
use hound::WavReader;
use std::path::Path;

/// Mono audio samples with their sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Samples normalized to [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Return a copy at `target_rate`, or a plain clone when the rate already matches
    pub fn resampled(&self, target_rate: u32) -> Waveform {
        if self.sample_rate == target_rate {
            return self.clone();
        }
        Waveform::new(
            resample_linear(&self.samples, self.sample_rate, target_rate),
            target_rate,
        )
    }
}

/// Audio state carried through the pipeline passes
#[derive(Debug, Clone)]
pub struct AudioState {
    /// Decoded input waveform (native sample rate)
    pub waveform: Waveform,
    /// Configuration reference
    pub config: Config,

    // Pass 0: Preflight
    /// Waveform at the rhythm analysis sample rate
    pub analysis_waveform: Option<Waveform>,
    /// RMS envelope of the analysis waveform
    pub envelope: Vec<f32>,

    // Passes 1-2: Pitch path
    pub pitch: PitchAnalysis,

    // Passes 3-4: Rhythm path
    pub rhythm: RhythmAnalysis,

    // Pass 5: Reconciliation
    pub timed_notes: Vec<TimedNote>,
    pub reconciliation: ReconciliationReport,
}

impl AudioState {
    /// Load audio file and create initial state
    pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> TranscribeResult<Self> {
        let (samples, sr) = load_audio_file(path)?;
        Ok(Self::from_waveform(Waveform::new(samples, sr), config))
    }

    /// Create state around an already decoded waveform
    pub fn from_waveform(waveform: Waveform, config: &Config) -> Self {
        AudioState {
            waveform,
            config: config.clone(),
            analysis_waveform: None,
            envelope: Vec::new(),
            pitch: PitchAnalysis::default(),
            rhythm: RhythmAnalysis::default(),
            timed_notes: Vec::new(),
            reconciliation: ReconciliationReport::default(),
        }
    }

    /// Get audio duration in seconds
    pub fn duration_sec(&self) -> f64 {
        self.waveform.duration_sec()
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.waveform.len()
    }
}

/// Load audio file and return mono samples with sample rate
pub fn load_audio_file<P: AsRef<Path>>(path: P) -> TranscribeResult<(Vec<f32>, u32)> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" | "wave" => load_wav_file(path),
        _ => Err(TranscribeError::InvalidAudioFormat(format!(
            "Unsupported audio format '{}'; transcode to WAV first",
            extension
        ))),
    }
}

/// Load WAV file, averaging all channels to mono
fn load_wav_file<P: AsRef<Path>>(path: P) -> TranscribeResult<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(TranscribeError::InvalidAudioFormat(
            "WAV header declares zero channels".to_string(),
        ));
    }

    if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
        return Err(TranscribeError::InvalidAudioFormat(format!(
            "Unsupported bit depth: {}",
            spec.bits_per_sample
        )));
    }

    let sr = spec.sample_rate;
    let mut samples: Vec<f32> = Vec::with_capacity(reader.len() as usize);

    match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            for sample in reader.samples::<i32>() {
                samples.push(sample? as f32 / max_value);
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                samples.push(sample?);
            }
        }
    }

    let channels = spec.channels as usize;
    let samples = if channels > 1 {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((samples, sr))
}

/// Validate audio file format and content
pub fn validate_audio_file<P: AsRef<Path>>(path: P, config: &Config) -> TranscribeResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TranscribeError::InputValidationError(format!(
            "Audio file does not exist: {}",
            path.display()
        )));
    }

    let (samples, sr) = load_audio_file(path)?;
    validate_waveform(&Waveform::new(samples, sr), config)
}

/// Check that a decoded waveform can be analyzed.
///
/// Silence is accepted here: a silent recording is a content rejection
/// reported later by the pipeline, not an input error.
pub fn validate_waveform(waveform: &Waveform, config: &Config) -> TranscribeResult<()> {
    if waveform.is_empty() {
        return Err(TranscribeError::InputValidationError(
            "Audio contains no samples".to_string(),
        ));
    }

    let sr = waveform.sample_rate;
    if !(config.audio.min_sample_rate..=config.audio.max_sample_rate).contains(&sr) {
        return Err(TranscribeError::UnsupportedSampleRate(sr));
    }

    if waveform.samples.iter().any(|x| !x.is_finite()) {
        return Err(TranscribeError::InputValidationError(
            "Audio contains non-finite samples".to_string(),
        ));
    }

    let duration_sec = waveform.duration_sec();
    if duration_sec > config.audio.max_duration_sec as f64 {
        return Err(TranscribeError::InputValidationError(format!(
            "Audio too long: {:.1}s (maximum {:.0}s)",
            duration_sec, config.audio.max_duration_sec
        )));
    }

    let peak = waveform
        .samples
        .iter()
        .fold(0.0f32, |acc, &x| acc.max(x.abs()));
    if peak > 0.99 {
        log::warn!("Audio may be clipped (peak = {:.3})", peak);
    }

    Ok(())
}

/// RMS amplitude envelope: one value per hop over `[i, i + frame_size)`.
///
/// Trailing windows shorter than `frame_size` use the samples available, so
/// the output has `ceil(len / hop_length)` entries.
pub fn amplitude_envelope(samples: &[f32], frame_size: usize, hop_length: usize) -> Vec<f32> {
    let hop_length = hop_length.max(1);
    let frame_size = frame_size.max(1);

    (0..samples.len())
        .step_by(hop_length)
        .map(|start| {
            let end = (start + frame_size).min(samples.len());
            rms(&samples[start..end])
        })
        .collect()
}

/// Root mean square of a slice (0 for an empty slice)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Resample with linear interpolation
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}
