//! Tempo estimation: the estimator capability and the built-in interval histogram

use crate::config::{OnsetConfig, RhythmConfig};
use crate::onset::{EnergyFluxOnsetDetector, OnsetDetector};

/// Global tempo estimator.
///
/// A non-positive or non-finite result means "unknown"; the pipeline
/// substitutes its default tempo.
pub trait TempoEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<f64>;
}

/// Tempo from the inter-onset interval histogram of energy-flux onsets
#[derive(Debug, Clone)]
pub struct IntervalTempoEstimator {
    onsets: EnergyFluxOnsetDetector,
    tempo_range_bpm: [f64; 2],
}

impl IntervalTempoEstimator {
    pub fn new(onset_config: OnsetConfig, rhythm_config: &RhythmConfig) -> Self {
        Self {
            onsets: EnergyFluxOnsetDetector::new(onset_config),
            tempo_range_bpm: rhythm_config.tempo_range_bpm,
        }
    }
}

impl Default for IntervalTempoEstimator {
    fn default() -> Self {
        Self::new(OnsetConfig::default(), &RhythmConfig::default())
    }
}

impl TempoEstimator for IntervalTempoEstimator {
    fn name(&self) -> &'static str {
        "interval_histogram"
    }

    fn estimate(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<f64> {
        let onsets = self.onsets.detect(samples, sample_rate)?;
        Ok(tempo_from_onsets(&onsets, self.tempo_range_bpm))
    }
}

/// Most supported tempo among onset pairs, or 0.0 when there is no evidence.
///
/// Each pair within the next 20 onsets and 0.1-4 s apart votes for
/// `60 / interval`, folded by octaves into `tempo_range_bpm` and rounded to
/// a 2 BPM bin. Closer neighbours vote with more weight.
pub fn tempo_from_onsets(onsets: &[f64], tempo_range_bpm: [f64; 2]) -> f64 {
    if onsets.len() < 2 {
        return 0.0;
    }
    let [lo, hi] = tempo_range_bpm;
    if !(lo > 0.0 && lo < hi) {
        return 0.0;
    }

    let mut histogram: Vec<(i64, f64)> = Vec::new();

    for i in 0..onsets.len() {
        for j in (i + 1)..onsets.len().min(i + 20) {
            let interval_sec = onsets[j] - onsets[i];
            if !(0.1..=4.0).contains(&interval_sec) {
                continue;
            }

            let Some(bpm) = fold_into_range(60.0 / interval_sec, lo, hi) else {
                continue;
            };
            let bin = (bpm / 2.0).round() as i64;
            let weight = 1.0 / (j - i) as f64;

            match histogram.iter_mut().find(|(b, _)| *b == bin) {
                Some((_, w)) => *w += weight,
                None => histogram.push((bin, weight)),
            }
        }
    }

    let mut best: Option<(i64, f64)> = None;
    for &(bin, weight) in &histogram {
        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((bin, weight));
        }
    }

    best.map_or(0.0, |(bin, _)| bin as f64 * 2.0)
}

fn fold_into_range(mut bpm: f64, lo: f64, hi: f64) -> Option<f64> {
    while bpm < lo {
        bpm *= 2.0;
    }
    while bpm > hi {
        bpm /= 2.0;
    }
    (lo..=hi).contains(&bpm).then_some(bpm)
}
