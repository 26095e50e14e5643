//! Pass 5: Note-Timing Reconciliation

use crate::analysis::{ReconciliationReport, TimedNote};
use crate::note::NoteSymbol;

/// Policy for pairing stabilized notes with onsets and durations.
///
/// The three sequences come from independent analyses and may differ in
/// length; implementations decide which entries pair up.
pub trait AlignmentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn align(
        &self,
        notes: &[NoteSymbol],
        onsets: &[f64],
        durations: &[f64],
        velocity: u8,
    ) -> Vec<TimedNote>;
}

/// Pair entries by index and drop whatever is left over past the shortest sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncateToShortest;

impl AlignmentStrategy for TruncateToShortest {
    fn name(&self) -> &'static str {
        "truncate_to_shortest"
    }

    fn align(
        &self,
        notes: &[NoteSymbol],
        onsets: &[f64],
        durations: &[f64],
        velocity: u8,
    ) -> Vec<TimedNote> {
        notes
            .iter()
            .zip(onsets)
            .zip(durations)
            .map(|((&pitch, &start), &duration)| TimedNote {
                pitch,
                start,
                end: start + duration,
                velocity,
            })
            .collect()
    }
}

/// Merge the pitch and rhythm analyses into timed notes
pub fn run(
    notes: &[NoteSymbol],
    onsets: &[f64],
    durations: &[f64],
    velocity: u8,
    strategy: &dyn AlignmentStrategy,
) -> (Vec<TimedNote>, ReconciliationReport) {
    log::info!("Pass 5: Note-Timing Reconciliation ({})", strategy.name());

    let timed_notes = strategy.align(notes, onsets, durations, velocity);
    let report = ReconciliationReport {
        strategy: strategy.name().to_string(),
        stabilized_notes: notes.len(),
        onsets: onsets.len(),
        durations: durations.len(),
        emitted: timed_notes.len(),
    };

    if !report.is_balanced() {
        log::warn!(
            "  Sequence lengths differ: {} notes, {} onsets, {} durations; dropped {}/{}/{}",
            report.stabilized_notes,
            report.onsets,
            report.durations,
            report.dropped_notes(),
            report.dropped_onsets(),
            report.dropped_durations()
        );
    }

    log::info!("  ✓ {} timed notes", timed_notes.len());
    (timed_notes, report)
}
