//! Spectral processing utilities (STFT, spectral flux)

use ndarray::{Array2, Axis};
use rustfft::{num_complex::Complex32, FftPlanner};

/// STFT data structure
#[derive(Debug, Clone)]
pub struct StftData {
    /// Complex spectrum, shape (n_fft / 2 + 1, n_frames)
    pub s: Array2<Complex32>,
    pub freqs: Vec<f32>,
    /// Frame center times in seconds
    pub times: Vec<f64>,
}

impl StftData {
    pub fn n_frames(&self) -> usize {
        self.s.shape()[1]
    }
}

/// Window shape applied before each FFT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Hann,
    Rectangular,
}

/// Compute the STFT of a signal over full frames only.
///
/// Signals shorter than `n_fft` yield zero frames.
pub fn stft(y: &[f32], n_fft: usize, hop_length: usize, window: Window, sample_rate: u32) -> StftData {
    let n_bins = n_fft / 2 + 1;
    let hop_length = hop_length.max(1);

    let n_frames = if n_fft == 0 || y.len() < n_fft {
        0
    } else {
        (y.len() - n_fft) / hop_length + 1
    };
    let mut s = Array2::<Complex32>::zeros((n_bins, n_frames));

    if n_frames > 0 {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        let window_fn = generate_window(window, n_fft);

        for frame_idx in 0..n_frames {
            let start = frame_idx * hop_length;

            let mut frame: Vec<Complex32> = y[start..start + n_fft]
                .iter()
                .zip(&window_fn)
                .map(|(&sample, &win)| Complex32::new(sample * win, 0.0))
                .collect();

            fft.process(&mut frame);

            for (i, &val) in frame[..n_bins].iter().enumerate() {
                s[[i, frame_idx]] = val;
            }
        }
    }

    let freqs: Vec<f32> = (0..n_bins)
        .map(|i| i as f32 * sample_rate as f32 / n_fft.max(1) as f32)
        .collect();

    let times: Vec<f64> = (0..n_frames)
        .map(|i| (i * hop_length + n_fft / 2) as f64 / sample_rate.max(1) as f64)
        .collect();

    StftData { s, freqs, times }
}

fn generate_window(window: Window, size: usize) -> Vec<f32> {
    match window {
        Window::Hann if size > 1 => (0..size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
            })
            .collect(),
        _ => vec![1.0; size],
    }
}

/// Compute magnitude spectrogram
pub fn magnitude_spectrogram(stft_data: &StftData) -> Array2<f32> {
    stft_data.s.map(|c| c.norm())
}

/// Positive spectral flux per frame (first frame is 0)
pub fn spectral_flux(mag_spec: &Array2<f32>) -> Vec<f32> {
    let mut flux = vec![0.0; mag_spec.shape()[1]];

    for t in 1..mag_spec.shape()[1] {
        let mut frame_flux = 0.0;
        for f in 0..mag_spec.shape()[0] {
            let diff = mag_spec[[f, t]] - mag_spec[[f, t - 1]];
            if diff > 0.0 {
                frame_flux += diff;
            }
        }
        flux[t] = frame_flux;
    }

    flux
}

/// Sum of squared magnitudes per frame
pub fn frame_energy(mag_spec: &Array2<f32>) -> Vec<f32> {
    mag_spec
        .axis_iter(Axis(1))
        .map(|column| column.iter().map(|&m| m * m).sum())
        .collect()
}

/// Positive spectral flux restricted to frames whose total energy rises.
///
/// Cutting a tone off smears its energy across many bins, which shows up as
/// positive flux even though the frame is getting quieter. Those frames are
/// zeroed so only attacks remain.
pub fn onset_spectral_flux(mag_spec: &Array2<f32>) -> Vec<f32> {
    let energy = frame_energy(mag_spec);
    let mut flux = spectral_flux(mag_spec);
    for t in 1..flux.len() {
        if energy[t] <= energy[t - 1] {
            flux[t] = 0.0;
        }
    }
    flux
}
