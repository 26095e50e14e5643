//! QA artifacts generation

use crate::audio::AudioState;
use crate::error::{Result as TranscribeResult, TranscribeError};
use plotters::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

fn qa_err<E: std::fmt::Debug>(what: &'static str) -> impl Fn(E) -> TranscribeError {
    move |e| TranscribeError::QaGenerationError(format!("Failed to {}: {:?}", what, e))
}

/// Generate QA artifacts (plots and a text summary) under `output_dir/qa`
pub fn generate_artifacts(state: &AudioState, output_dir: &Path) -> TranscribeResult<PathBuf> {
    let qa_dir = output_dir.join("qa");
    fs::create_dir_all(&qa_dir)?;

    log::info!("Generating QA artifacts...");

    generate_rhythm_plot(state, &qa_dir)?;
    generate_pitch_track_plot(state, &qa_dir)?;
    generate_piano_roll_plot(state, &qa_dir)?;
    generate_summary(state, &qa_dir)?;

    log::info!("QA artifacts generated in {}", qa_dir.display());
    Ok(qa_dir)
}

/// Envelope over time with onsets marked and detected note spans shaded
fn generate_rhythm_plot(state: &AudioState, output_dir: &Path) -> TranscribeResult<()> {
    let path = output_dir.join("rhythm.svg");
    let root = SVGBackend::new(&path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(qa_err("fill plot background"))?;

    let duration = state.duration_sec().max(1e-3);
    let hop = state.config.envelope.hop_length.max(1) as f64;
    let sr = state.config.audio.analysis_sample_rate.max(1) as f64;
    let max_level = state
        .envelope
        .iter()
        .fold(0.0f32, |acc, &x| acc.max(x))
        .max(state.config.rhythm.decay_threshold * 2.0) as f64
        * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption("Amplitude Envelope & Onsets", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..duration, 0.0..max_level)
        .map_err(qa_err("build chart"))?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("RMS")
        .draw()
        .map_err(qa_err("draw mesh"))?;

    let rhythm = &state.rhythm;
    chart
        .draw_series(rhythm.onsets.iter().zip(&rhythm.durations).map(|(&start, &dur)| {
            Rectangle::new(
                [(start, 0.0), ((start + dur).min(duration), max_level)],
                RGBColor(200, 230, 255).filled(),
            )
        }))
        .map_err(qa_err("draw note spans"))?;

    chart
        .draw_series(LineSeries::new(
            state
                .envelope
                .iter()
                .enumerate()
                .map(|(k, &level)| (k as f64 * hop / sr, level as f64)),
            &BLUE,
        ))
        .map_err(qa_err("draw envelope"))?;

    chart
        .draw_series(rhythm.onsets.iter().map(|&t| {
            PathElement::new(vec![(t, 0.0), (t, max_level)], RED.stroke_width(2))
        }))
        .map_err(qa_err("draw onsets"))?;

    let threshold = state.config.rhythm.decay_threshold as f64;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, threshold), (duration, threshold)],
            BLACK.mix(0.5).stroke_width(1),
        )))
        .map_err(qa_err("draw decay threshold"))?;

    root.present().map_err(qa_err("write rhythm plot"))?;
    Ok(())
}

/// Accepted note frames and the smoothed note line
fn generate_pitch_track_plot(state: &AudioState, output_dir: &Path) -> TranscribeResult<()> {
    let path = output_dir.join("pitch_track.svg");
    let root = SVGBackend::new(&path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(qa_err("fill plot background"))?;

    let duration = state.duration_sec().max(1e-3);
    let pitch = &state.pitch;
    let (lo, hi) = note_range(pitch.note_frames.iter().map(|f| f.note.midi_number()));

    let mut chart = ChartBuilder::on(&root)
        .caption("Pitch Track", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..duration, lo..hi)
        .map_err(qa_err("build chart"))?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("MIDI note")
        .draw()
        .map_err(qa_err("draw mesh"))?;

    let dot =
        0.5 * state.config.pitch.yin.hop_length as f64 / state.waveform.sample_rate.max(1) as f64;
    chart
        .draw_series(pitch.note_frames.iter().map(|f| {
            let y = f.note.midi_number() as f64;
            Rectangle::new(
                [(f.time - dot, y - 0.2), (f.time + dot, y + 0.2)],
                RGBColor(120, 120, 120).mix(f.confidence as f64).filled(),
            )
        }))
        .map_err(qa_err("draw note frames"))?;

    chart
        .draw_series(LineSeries::new(
            pitch
                .smoothed_frames
                .iter()
                .map(|f| (f.time, f.note.midi_number() as f64)),
            &MAGENTA,
        ))
        .map_err(qa_err("draw smoothed notes"))?;

    root.present().map_err(qa_err("write pitch plot"))?;
    Ok(())
}

/// Final timed notes as a piano roll
fn generate_piano_roll_plot(state: &AudioState, output_dir: &Path) -> TranscribeResult<()> {
    let path = output_dir.join("piano_roll.svg");
    let root = SVGBackend::new(&path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(qa_err("fill plot background"))?;

    let end = state
        .timed_notes
        .iter()
        .fold(state.duration_sec(), |acc, n| acc.max(n.end))
        .max(1e-3);
    let (lo, hi) = note_range(state.timed_notes.iter().map(|n| n.pitch.midi_number()));

    let mut chart = ChartBuilder::on(&root)
        .caption("Transcribed Notes", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..end, lo..hi)
        .map_err(qa_err("build chart"))?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("MIDI note")
        .draw()
        .map_err(qa_err("draw mesh"))?;

    chart
        .draw_series(state.timed_notes.iter().map(|n| {
            let y = n.pitch.midi_number() as f64;
            Rectangle::new([(n.start, y - 0.4), (n.end, y + 0.4)], GREEN.filled())
        }))
        .map_err(qa_err("draw notes"))?;

    root.present().map_err(qa_err("write piano roll"))?;
    Ok(())
}

/// Plot range around the given MIDI numbers, defaulting to a range around middle C
fn note_range(notes: impl Iterator<Item = u8>) -> (f64, f64) {
    let (lo, hi) = notes.fold((u8::MAX, 0u8), |(lo, hi), n| (lo.min(n), hi.max(n)));
    if lo > hi {
        (54.0, 72.0)
    } else {
        (lo as f64 - 2.0, hi as f64 + 2.0)
    }
}

/// Plain-text run summary
fn generate_summary(state: &AudioState, output_dir: &Path) -> TranscribeResult<()> {
    let path = output_dir.join("summary.txt");
    let report = &state.reconciliation;
    let rhythm = &state.rhythm;

    let mut text = String::new();
    let _ = writeln!(text, "Voice-to-MIDI Transcription Summary");
    let _ = writeln!(text, "===================================");
    let _ = writeln!(
        text,
        "Audio: {:.2}s, {} Hz, {} samples",
        state.duration_sec(),
        state.waveform.sample_rate,
        state.n_samples()
    );
    let _ = writeln!(
        text,
        "Pitch: {} note frames, {} stabilized notes",
        state.pitch.note_frames.len(),
        state.pitch.stabilized_notes.len()
    );
    let _ = writeln!(text, "Rhythm: {} onsets", rhythm.onsets.len());
    if rhythm.raw_tempo_bpm == rhythm.tempo_bpm {
        let _ = writeln!(text, "Tempo: {:.1} BPM", rhythm.tempo_bpm);
    } else {
        let _ = writeln!(
            text,
            "Tempo: {:.1} BPM (estimated {:.1}, defaulted)",
            rhythm.tempo_bpm, rhythm.raw_tempo_bpm
        );
    }
    let _ = writeln!(
        text,
        "Reconciliation ({}): {} notes / {} onsets / {} durations -> {} emitted",
        report.strategy, report.stabilized_notes, report.onsets, report.durations, report.emitted
    );
    let _ = writeln!(text);
    let _ = writeln!(text, "{:>6} {:>10} {:>10} {:>4}", "Note", "Start", "End", "Vel");
    for note in &state.timed_notes {
        let _ = writeln!(
            text,
            "{:>6} {:>10.3} {:>10.3} {:>4}",
            note.pitch.to_string(),
            note.start,
            note.end,
            note.velocity
        );
    }

    fs::write(&path, text).map_err(|e| {
        TranscribeError::QaGenerationError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    Ok(())
}
