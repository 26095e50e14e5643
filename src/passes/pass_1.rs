//! Pass 1: Pitch Frame Extraction

use crate::analysis::NoteFrame;
use crate::audio::Waveform;
use crate::config::PitchConfig;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::note::NoteSymbol;
use crate::pitch::PitchEstimator;

/// Run the pitch estimator chunk by chunk and keep confident, pitched frames.
///
/// The waveform is split into contiguous `chunk_size` chunks (the last may be
/// shorter). Frames below `confidence_threshold` or without a note are
/// dropped. The result is stably sorted by time.
pub fn run(
    waveform: &Waveform,
    config: &PitchConfig,
    estimator: &dyn PitchEstimator,
) -> TranscribeResult<Vec<NoteFrame>> {
    log::info!("Pass 1: Pitch Frame Extraction ({})", estimator.name());

    let sr = waveform.sample_rate;
    let chunk_size = config.chunk_size.max(1);
    let mut frames = Vec::new();
    let mut n_estimated = 0usize;

    for (chunk_idx, chunk) in waveform.samples.chunks(chunk_size).enumerate() {
        let track = estimator
            .predict(chunk, sr)
            .map_err(|e| TranscribeError::EstimatorFailure {
                estimator: estimator.name(),
                message: format!("chunk {}: {:#}", chunk_idx, e),
            })?;

        if !track.is_aligned() {
            return Err(TranscribeError::EstimatorFailure {
                estimator: estimator.name(),
                message: format!(
                    "chunk {}: misaligned track ({} times, {} frequencies, {} confidences)",
                    chunk_idx,
                    track.times.len(),
                    track.frequencies.len(),
                    track.confidences.len()
                ),
            });
        }

        let offset = if config.globalize_chunk_times {
            (chunk_idx * chunk_size) as f64 / sr as f64
        } else {
            0.0
        };

        n_estimated += track.len();
        frames.extend(
            track
                .frames()
                .filter(|frame| frame.confidence >= config.confidence_threshold)
                .filter_map(|frame| {
                    NoteSymbol::from_frequency(frame.frequency).map(|note| NoteFrame {
                        time: offset + frame.time,
                        note,
                        confidence: frame.confidence,
                    })
                }),
        );
    }

    frames.sort_by(|a, b| a.time.total_cmp(&b.time));

    log::debug!(
        "  {} of {} frames accepted (confidence >= {})",
        frames.len(),
        n_estimated,
        config.confidence_threshold
    );
    log::info!("  ✓ {} note frames", frames.len());

    Ok(frames)
}
