//! Pass 3: Onsets & Note Durations

use crate::audio::Waveform;
use crate::config::Config;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::onset::OnsetDetector;

/// Seconds to the sample index containing that instant
pub fn seconds_to_sample(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).floor().max(0.0) as usize
}

/// Run the onset detector, keeping finite, non-negative times in ascending order
pub fn detect_onsets(
    waveform: &Waveform,
    detector: &dyn OnsetDetector,
) -> TranscribeResult<Vec<f64>> {
    let mut onsets = detector
        .detect(&waveform.samples, waveform.sample_rate)
        .map_err(|e| TranscribeError::EstimatorFailure {
            estimator: detector.name(),
            message: format!("{:#}", e),
        })?;

    let reported = onsets.len();
    onsets.retain(|t| t.is_finite() && *t >= 0.0);
    if onsets.len() != reported {
        log::warn!(
            "  Discarded {} invalid onset times from {}",
            reported - onsets.len(),
            detector.name()
        );
    }
    onsets.sort_by(f64::total_cmp);

    Ok(onsets)
}

/// One duration per onset, read off the amplitude envelope.
///
/// From each onset the envelope is scanned in `hop_length` steps up to the
/// next onset (the end of the audio for the last one). The note ends at the
/// first step whose envelope value is below `threshold`, or at the next
/// onset if it never decays. Notes never extend past the end of the audio.
/// Durations are floored at `min_duration`.
pub fn estimate_note_durations(
    onsets: &[f64],
    n_samples: usize,
    envelope: &[f32],
    sample_rate: u32,
    hop_length: usize,
    threshold: f32,
    min_duration: f64,
) -> Vec<f64> {
    let hop_length = hop_length.max(1);
    let sr = sample_rate.max(1) as f64;

    onsets
        .iter()
        .enumerate()
        .map(|(i, &onset)| {
            let onset_sample = seconds_to_sample(onset, sample_rate);
            let next_sample = onsets
                .get(i + 1)
                .map_or(n_samples, |&next| seconds_to_sample(next, sample_rate));
            let scan_end = next_sample.min(n_samples);

            let mut boundary = scan_end;
            let mut j = onset_sample;
            while j < scan_end {
                match envelope.get(j / hop_length) {
                    Some(&level) if level < threshold => {
                        boundary = j;
                        break;
                    }
                    Some(_) => j += hop_length,
                    None => break,
                }
            }

            let duration = boundary.saturating_sub(onset_sample) as f64 / sr;
            duration.max(min_duration)
        })
        .collect()
}

/// Detect onsets on the analysis waveform and derive their durations
pub fn run(
    analysis: &Waveform,
    envelope: &[f32],
    config: &Config,
    detector: &dyn OnsetDetector,
) -> TranscribeResult<(Vec<f64>, Vec<f64>)> {
    log::info!("Pass 3: Onsets & Note Durations ({})", detector.name());

    let onsets = detect_onsets(analysis, detector)?;
    log::debug!("  {} onsets detected", onsets.len());

    let durations = estimate_note_durations(
        &onsets,
        analysis.len(),
        envelope,
        analysis.sample_rate,
        config.envelope.hop_length,
        config.rhythm.decay_threshold,
        config.rhythm.min_duration_sec,
    );

    log::info!("  ✓ {} onsets with durations", onsets.len());
    Ok((onsets, durations))
}
