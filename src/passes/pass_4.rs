//! Pass 4: Tempo Estimation

use crate::audio::Waveform;
use crate::config::RhythmConfig;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::tempo::TempoEstimator;

/// Replace an unusable tempo (non-positive or non-finite) with the default
pub fn resolve_tempo(raw_bpm: f64, default_bpm: f64) -> f64 {
    if raw_bpm.is_finite() && raw_bpm > 0.0 {
        raw_bpm
    } else {
        default_bpm
    }
}

/// Estimate the global tempo. Returns `(raw, resolved)` in BPM.
pub fn run(
    analysis: &Waveform,
    config: &RhythmConfig,
    estimator: &dyn TempoEstimator,
) -> TranscribeResult<(f64, f64)> {
    log::info!("Pass 4: Tempo Estimation ({})", estimator.name());

    let raw = estimator
        .estimate(&analysis.samples, analysis.sample_rate)
        .map_err(|e| TranscribeError::EstimatorFailure {
            estimator: estimator.name(),
            message: format!("{:#}", e),
        })?;

    let tempo = resolve_tempo(raw, config.default_tempo_bpm);
    if tempo != raw {
        log::warn!(
            "  Tempo estimate {} BPM is unusable, using {} BPM",
            raw,
            tempo
        );
    }

    log::info!("  ✓ Tempo: {:.1} BPM", tempo);
    Ok((raw, tempo))
}
