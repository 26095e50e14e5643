//! Pass 0: Preflight & Envelope

use crate::audio::{amplitude_envelope, validate_waveform, AudioState};
use crate::config::Config;
use crate::error::Result as TranscribeResult;

/// Validate the decoded input and prepare the rhythm analysis inputs.
///
/// Produces the waveform at `audio.analysis_sample_rate` and its RMS
/// envelope. A silent waveform passes preflight.
pub fn run(state: &mut AudioState, config: &Config) -> TranscribeResult<()> {
    log::info!("Pass 0: Preflight & Envelope");

    validate_waveform(&state.waveform, config)?;

    let target_sr = config.audio.analysis_sample_rate;
    if state.waveform.sample_rate != target_sr {
        log::debug!(
            "  Resampling {} Hz -> {} Hz for rhythm analysis",
            state.waveform.sample_rate,
            target_sr
        );
    }
    let analysis = state.waveform.resampled(target_sr);

    state.envelope = amplitude_envelope(
        &analysis.samples,
        config.envelope.frame_size,
        config.envelope.hop_length,
    );
    state.analysis_waveform = Some(analysis);

    log::info!(
        "  ✓ {:.2}s of audio at {} Hz, {} envelope frames",
        state.duration_sec(),
        state.waveform.sample_rate,
        state.envelope.len()
    );

    Ok(())
}
