//! Onset detection: the detector capability and the built-in flux detectors

use crate::audio::amplitude_envelope;
use crate::config::{OnsetConfig, OnsetMethod};
use crate::spectral::{magnitude_spectrogram, onset_spectral_flux, stft, Window};

/// Note onset detector.
///
/// Returns onset times in seconds, ascending. An empty result is valid.
pub trait OnsetDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<f64>>;
}

/// Build the built-in detector selected by `config.method`
pub fn detector_from_config(config: &OnsetConfig) -> Box<dyn OnsetDetector> {
    match config.method {
        OnsetMethod::EnergyFlux => Box::new(EnergyFluxOnsetDetector::new(config.clone())),
        OnsetMethod::SpectralFlux => Box::new(SpectralFluxOnsetDetector::new(config.clone())),
    }
}

/// Onsets from rises in the RMS envelope
#[derive(Debug, Clone)]
pub struct EnergyFluxOnsetDetector {
    config: OnsetConfig,
}

impl EnergyFluxOnsetDetector {
    pub fn new(config: OnsetConfig) -> Self {
        Self { config }
    }
}

impl Default for EnergyFluxOnsetDetector {
    fn default() -> Self {
        Self::new(OnsetConfig::default())
    }
}

impl OnsetDetector for EnergyFluxOnsetDetector {
    fn name(&self) -> &'static str {
        "energy_flux"
    }

    fn detect(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<f64>> {
        if sample_rate == 0 {
            anyhow::bail!("sample rate must be positive");
        }
        let hop = self.config.hop_length.max(1);
        let envelope = amplitude_envelope(samples, self.config.frame_size, hop);
        let flux = energy_flux(&envelope);

        let frame_rate = sample_rate as f64 / hop as f64;
        let peaks = PeakPicker::from_config(&self.config).pick(&flux, frame_rate);

        // Frame k covers [k * hop, k * hop + frame_size); report the frame start
        Ok(peaks
            .into_iter()
            .map(|k| (k * hop) as f64 / sample_rate as f64)
            .collect())
    }
}

/// Onsets from positive spectral flux of the STFT magnitude, counted only in
/// frames whose energy rises
#[derive(Debug, Clone)]
pub struct SpectralFluxOnsetDetector {
    config: OnsetConfig,
}

impl SpectralFluxOnsetDetector {
    pub fn new(config: OnsetConfig) -> Self {
        Self { config }
    }
}

impl OnsetDetector for SpectralFluxOnsetDetector {
    fn name(&self) -> &'static str {
        "spectral_flux"
    }

    fn detect(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<f64>> {
        if sample_rate == 0 {
            anyhow::bail!("sample rate must be positive");
        }
        let hop = self.config.hop_length.max(1);
        let stft_data = stft(samples, self.config.n_fft, hop, Window::Hann, sample_rate);
        let flux = onset_spectral_flux(&magnitude_spectrogram(&stft_data));

        let frame_rate = sample_rate as f64 / hop as f64;
        let peaks = PeakPicker::from_config(&self.config).pick(&flux, frame_rate);

        Ok(peaks.into_iter().map(|k| stft_data.times[k]).collect())
    }
}

/// Half-wave rectified first difference of an envelope (first value 0)
pub fn energy_flux(envelope: &[f32]) -> Vec<f32> {
    let mut flux = vec![0.0; envelope.len()];
    for t in 1..envelope.len() {
        flux[t] = (envelope[t] - envelope[t - 1]).max(0.0);
    }
    flux
}

/// Adaptive-threshold peak picker shared by the flux detectors
#[derive(Debug, Clone, Copy)]
pub struct PeakPicker {
    pub adaptive_window_sec: f32,
    pub k_global: f32,
    pub min_relative_strength: f32,
    pub refractory_ms: f32,
}

impl PeakPicker {
    pub fn from_config(config: &OnsetConfig) -> Self {
        Self {
            adaptive_window_sec: config.adaptive_window_sec,
            k_global: config.k_global,
            min_relative_strength: config.min_relative_strength,
            refractory_ms: config.refractory_ms,
        }
    }

    /// Indices of peaks in `signal`, sampled at `frame_rate` frames per second
    pub fn pick(&self, signal: &[f32], frame_rate: f64) -> Vec<usize> {
        let max_strength = signal.iter().fold(0.0f32, |acc, &x| acc.max(x));
        if max_strength <= 0.0 {
            return Vec::new();
        }
        let floor = self.min_relative_strength * max_strength;

        let window_frames = (self.adaptive_window_sec as f64 * frame_rate) as usize;
        let thresholds = adaptive_threshold(signal, window_frames, self.k_global);
        let refractory_frames = (self.refractory_ms as f64 / 1000.0 * frame_rate).ceil() as usize;

        find_peaks_with_refractory(signal, &thresholds, floor, refractory_frames)
    }
}

/// Rolling mean + k * std over `[i - window_frames, i + window_frames]`
fn adaptive_threshold(signal: &[f32], window_frames: usize, k: f32) -> Vec<f32> {
    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(window_frames);
            let end = signal.len().min(i + window_frames + 1);
            let window = &signal[start..end];

            let mean = window.iter().sum::<f32>() / window.len() as f32;
            let variance =
                window.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / window.len() as f32;
            mean + k * variance.sqrt()
        })
        .collect()
}

/// Find local maxima above both thresholds, at least `min_distance_frames` apart
fn find_peaks_with_refractory(
    signal: &[f32],
    thresholds: &[f32],
    floor: f32,
    min_distance_frames: usize,
) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;

    for i in 1..signal.len().saturating_sub(1) {
        if let Some(last) = last_peak {
            if i < last + min_distance_frames {
                continue;
            }
        }

        let value = signal[i];
        if value >= signal[i - 1] && value > signal[i + 1] && value > thresholds[i] && value >= floor
        {
            peaks.push(i);
            last_peak = Some(i);
        }
    }

    peaks
}
