//! Pass 2: Pitch Stabilization

use crate::analysis::{NoteFrame, PitchAnalysis, SmoothedFrame};
use crate::config::StabilizerConfig;
use crate::note::NoteSymbol;

/// Sliding-window majority smoothing.
///
/// Frame `i` looks at `[i - w/2, i + w/2 + 1)` clipped to the input. The
/// note is the most frequent in the window; ties go to the note seen first
/// scanning left to right. The time is the window's mean time. Output has
/// the same length as the input.
pub fn smooth_pitch_frames(frames: &[NoteFrame], window_size: usize) -> Vec<SmoothedFrame> {
    let n = frames.len();
    let half = window_size / 2;
    let mut tally: Vec<(NoteSymbol, usize)> = Vec::with_capacity(window_size);

    (0..n)
        .map(|i| {
            let window = &frames[i.saturating_sub(half)..(i + half + 1).min(n)];

            tally.clear();
            for frame in window {
                match tally.iter_mut().find(|(note, _)| *note == frame.note) {
                    Some((_, count)) => *count += 1,
                    None => tally.push((frame.note, 1)),
                }
            }

            let mut majority = tally[0];
            for &entry in &tally[1..] {
                if entry.1 > majority.1 {
                    majority = entry;
                }
            }

            let time = window.iter().map(|f| f.time).sum::<f64>() / window.len() as f64;
            SmoothedFrame {
                time,
                note: majority.0,
            }
        })
        .collect()
}

/// Collapse runs of equal notes into one entry each
pub fn collapse_runs(frames: &[SmoothedFrame]) -> Vec<NoteSymbol> {
    let mut notes: Vec<NoteSymbol> = Vec::new();
    let mut held: Option<NoteSymbol> = None;

    for frame in frames {
        match held {
            Some(note) if note == frame.note => {}
            Some(note) => {
                notes.push(note);
                held = Some(frame.note);
            }
            None => held = Some(frame.note),
        }
    }

    if let Some(note) = held {
        notes.push(note);
    }

    notes
}

/// Smooth and collapse the note frames from pass 1
pub fn run(note_frames: Vec<NoteFrame>, config: &StabilizerConfig) -> PitchAnalysis {
    log::info!("Pass 2: Pitch Stabilization");

    let smoothed_frames = smooth_pitch_frames(&note_frames, config.window_size);
    let stabilized_notes = collapse_runs(&smoothed_frames);

    log::info!(
        "  ✓ {} frames -> {} notes",
        smoothed_frames.len(),
        stabilized_notes.len()
    );
    log::debug!(
        "  Notes: {}",
        stabilized_notes
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );

    PitchAnalysis {
        note_frames,
        smoothed_frames,
        stabilized_notes,
    }
}
