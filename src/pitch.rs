//! Pitch estimation: the estimator capability and the built-in YIN estimator

use crate::analysis::{PitchFrame, PitchTrack};
use crate::audio::rms;
use crate::config::YinConfig;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Frame-level fundamental frequency estimator.
///
/// `predict` receives one chunk of mono audio and returns frames whose times
/// are relative to the start of that chunk.
pub trait PitchEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, chunk: &[f32], sample_rate: u32) -> anyhow::Result<PitchTrack>;
}

/// YIN estimator over centered, zero-padded frames
#[derive(Debug, Clone)]
pub struct YinPitchEstimator {
    config: YinConfig,
}

impl YinPitchEstimator {
    pub fn new(config: YinConfig) -> Self {
        Self { config }
    }
}

impl Default for YinPitchEstimator {
    fn default() -> Self {
        Self::new(YinConfig::default())
    }
}

impl PitchEstimator for YinPitchEstimator {
    fn name(&self) -> &'static str {
        "yin"
    }

    fn predict(&self, chunk: &[f32], sample_rate: u32) -> anyhow::Result<PitchTrack> {
        let cfg = &self.config;
        if sample_rate == 0 {
            anyhow::bail!("sample rate must be positive");
        }
        if cfg.frame_length < 4 || cfg.hop_length == 0 {
            anyhow::bail!(
                "invalid YIN framing (frame_length {}, hop_length {})",
                cfg.frame_length,
                cfg.hop_length
            );
        }

        let sr = sample_rate as f32;
        let n = cfg.frame_length;
        let tau_max = ((sr / cfg.fmin_hz).ceil() as usize).min(n - 2);
        let tau_min = ((sr / cfg.fmax_hz).floor() as usize).max(2);
        if tau_min >= tau_max {
            anyhow::bail!(
                "frequency range {}-{} Hz is not resolvable at {} Hz with frame length {}",
                cfg.fmin_hz,
                cfg.fmax_hz,
                sample_rate,
                n
            );
        }

        let yin = YinKernel::new(n);
        let half = n / 2;
        let mut track = PitchTrack::with_capacity(chunk.len() / cfg.hop_length + 1);
        let mut frame = vec![0.0f32; n];

        for center in (0..chunk.len()).step_by(cfg.hop_length) {
            fill_centered_frame(chunk, center, half, &mut frame);
            let time = center as f64 / sample_rate as f64;

            if rms(&frame) < cfg.silence_rms {
                track.push(PitchFrame {
                    time,
                    frequency: 0.0,
                    confidence: 0.0,
                });
                continue;
            }

            let diff = yin.difference_function(&frame, tau_max);
            let cmnd = cumulative_mean_normalized_difference(&diff);
            let tau = pick_period(&cmnd, tau_min, tau_max, cfg.threshold);
            let refined = parabolic_interpolation(&cmnd, tau);

            let (frequency, confidence) = if refined > 0.0 {
                (sr / refined, (1.0 - cmnd[tau]).clamp(0.0, 1.0))
            } else {
                (0.0, 0.0)
            };
            track.push(PitchFrame {
                time,
                frequency,
                confidence,
            });
        }

        log::trace!("yin: {} frames over {} samples", track.len(), chunk.len());
        Ok(track)
    }
}

/// Copy `[center - half, center - half + frame.len())` into `frame`, zero outside the signal
fn fill_centered_frame(signal: &[f32], center: usize, half: usize, frame: &mut [f32]) {
    for (k, slot) in frame.iter_mut().enumerate() {
        let idx = (center + k).checked_sub(half);
        *slot = idx.and_then(|i| signal.get(i)).copied().unwrap_or(0.0);
    }
}

/// FFT plans reused across the frames of one call
struct YinKernel {
    frame_length: usize,
    fft_len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl YinKernel {
    fn new(frame_length: usize) -> Self {
        let fft_len = (frame_length * 2).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            frame_length,
            fft_len,
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
        }
    }

    /// YIN difference function d(tau) for tau in [0, max_tau], using an
    /// FFT autocorrelation:
    /// d(tau) = sum x_j^2 + sum x_{j+tau}^2 - 2 r(tau) over j in [0, N - tau).
    fn difference_function(&self, frame: &[f32], max_tau: usize) -> Vec<f32> {
        let n = frame.len().min(self.frame_length);
        let mut diff = vec![0.0; max_tau + 1];
        if n == 0 || max_tau == 0 {
            return diff;
        }

        let mut buffer = vec![Complex { re: 0.0f32, im: 0.0f32 }; self.fft_len];
        for (slot, &sample) in buffer.iter_mut().zip(&frame[..n]) {
            slot.re = sample;
        }

        self.forward.process(&mut buffer);
        for value in buffer.iter_mut() {
            *value = Complex {
                re: value.norm_sqr(),
                im: 0.0,
            };
        }
        self.inverse.process(&mut buffer);

        let scale = 1.0 / self.fft_len as f32;
        let mut prefix_sq = vec![0.0f32; n + 1];
        for (idx, &sample) in frame[..n].iter().enumerate() {
            prefix_sq[idx + 1] = prefix_sq[idx] + sample * sample;
        }

        for tau in 1..=max_tau.min(n - 1) {
            let sum_head = prefix_sq[n - tau];
            let sum_tail = prefix_sq[n] - prefix_sq[tau];
            let autocorr = buffer[tau].re * scale;
            diff[tau] = (sum_head + sum_tail - 2.0 * autocorr).max(0.0);
        }

        diff
    }
}

/// Cumulative mean normalized difference d'(tau) = d(tau) / ((1/tau) * sum_{j=1..tau} d(j))
pub fn cumulative_mean_normalized_difference(diff: &[f32]) -> Vec<f32> {
    let mut cmnd = vec![1.0; diff.len()];
    let mut running_sum = 0.0;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        if running_sum > 0.0 {
            cmnd[tau] = diff[tau] * tau as f32 / running_sum;
        }
    }
    cmnd
}

/// First lag under `threshold`, followed down to its local minimum.
/// Falls back to the global minimum of the search range.
fn pick_period(cmnd: &[f32], tau_min: usize, tau_max: usize, threshold: f32) -> usize {
    let tau_max = tau_max.min(cmnd.len() - 1);

    let mut tau = tau_min;
    while tau <= tau_max {
        if cmnd[tau] < threshold {
            while tau < tau_max && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return tau;
        }
        tau += 1;
    }

    (tau_min..=tau_max).fold(tau_min, |best, t| if cmnd[t] < cmnd[best] { t } else { best })
}

/// Parabolic interpolation around a minimum to refine tau
pub fn parabolic_interpolation(cmnd: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f32;
    }
    let y1 = cmnd[tau - 1];
    let y2 = cmnd[tau];
    let y3 = cmnd[tau + 1];
    let denom = y1 - 2.0 * y2 + y3;
    if denom.abs() < 1e-12 {
        return tau as f32;
    }
    let delta = (0.5 * (y1 - y3) / denom).clamp(-1.0, 1.0);
    tau as f32 + delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sr: u32, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_cmnd_normalizes_by_running_mean() {
        let cmnd = cumulative_mean_normalized_difference(&[0.0, 2.0, 4.0, 0.0]);
        assert_eq!(cmnd[0], 1.0);
        assert!((cmnd[1] - 1.0).abs() < 1e-6);
        assert!((cmnd[2] - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(cmnd[3], 0.0);
    }

    #[test]
    fn test_difference_function_matches_direct_sum() {
        let frame = sine(1000.0, 8000, 64, 1.0);
        let diff = YinKernel::new(64).difference_function(&frame, 16);
        for tau in 1..=16 {
            let direct: f32 = (0..64 - tau)
                .map(|j| (frame[j] - frame[j + tau]).powi(2))
                .sum();
            assert!((diff[tau] - direct).abs() < 1e-3, "tau {}: {} vs {}", tau, diff[tau], direct);
        }
    }

    #[test]
    fn test_parabolic_interpolation_minimum() {
        let cmnd: Vec<f32> = (0..10)
            .map(|i| {
                let x = i as f32 - 5.2;
                x * x
            })
            .collect();
        let refined = parabolic_interpolation(&cmnd, 5);
        assert!((refined - 5.2).abs() < 0.05);
    }

    #[test]
    fn test_detects_a4() {
        let sr = 44100;
        let chunk = sine(440.0, sr, 10240, 0.5);
        let track = YinPitchEstimator::default().predict(&chunk, sr).unwrap();

        assert!(track.is_aligned());
        assert_eq!(track.len(), 20);
        // Interior frames are fully covered by the tone
        for frame in track.frames().skip(2).take(16) {
            assert!((frame.frequency - 440.0).abs() < 2.0, "got {}", frame.frequency);
            assert!(frame.confidence > 0.9, "confidence {}", frame.confidence);
        }
    }

    #[test]
    fn test_frame_times_are_chunk_relative() {
        let sr = 22050;
        let chunk = sine(330.0, sr, 4096, 0.5);
        let track = YinPitchEstimator::default().predict(&chunk, sr).unwrap();
        assert_eq!(track.times[0], 0.0);
        assert!((track.times[1] - 512.0 / 22050.0).abs() < 1e-12);
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let track = YinPitchEstimator::default()
            .predict(&vec![0.0; 10240], 44100)
            .unwrap();
        assert!(!track.is_empty());
        assert!(track.confidences.iter().all(|&c| c == 0.0));
        assert!(track.frequencies.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_empty_chunk_yields_empty_track() {
        let track = YinPitchEstimator::default().predict(&[], 44100).unwrap();
        assert!(track.is_empty());
    }

    #[test]
    fn test_zero_sample_rate_is_an_error() {
        assert!(YinPitchEstimator::default().predict(&[0.1; 16], 0).is_err());
    }
}
