//! Analysis data types and export

use crate::audio::AudioState;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::note::NoteSymbol;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One analysis frame reported by a pitch estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchFrame {
    /// Time in seconds
    pub time: f64,
    /// Estimated fundamental frequency in Hz (0 when unvoiced)
    pub frequency: f32,
    /// Estimator confidence in [0, 1]
    pub confidence: f32,
}

/// Frame-level output of a pitch estimator, as parallel sequences aligned by index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchTrack {
    pub times: Vec<f64>,
    pub frequencies: Vec<f32>,
    pub confidences: Vec<f32>,
}

impl PitchTrack {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            times: Vec::with_capacity(n),
            frequencies: Vec::with_capacity(n),
            confidences: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, frame: PitchFrame) {
        self.times.push(frame.time);
        self.frequencies.push(frame.frequency);
        self.confidences.push(frame.confidence);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// True when all three sequences have the same length
    pub fn is_aligned(&self) -> bool {
        self.times.len() == self.frequencies.len() && self.times.len() == self.confidences.len()
    }

    /// Iterate over the track as frames
    pub fn frames(&self) -> impl Iterator<Item = PitchFrame> + '_ {
        self.times
            .iter()
            .zip(&self.frequencies)
            .zip(&self.confidences)
            .map(|((&time, &frequency), &confidence)| PitchFrame {
                time,
                frequency,
                confidence,
            })
    }
}

/// A confident pitch frame mapped to a note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteFrame {
    pub time: f64,
    pub note: NoteSymbol,
    pub confidence: f32,
}

/// A note frame after majority smoothing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedFrame {
    pub time: f64,
    pub note: NoteSymbol,
}

/// A note with timing, ready for MIDI assembly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub pitch: NoteSymbol,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub velocity: u8,
}

impl TimedNote {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// How the three independently derived sequences lined up during reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub strategy: String,
    pub stabilized_notes: usize,
    pub onsets: usize,
    pub durations: usize,
    pub emitted: usize,
}

impl ReconciliationReport {
    pub fn dropped_notes(&self) -> usize {
        self.stabilized_notes.saturating_sub(self.emitted)
    }

    pub fn dropped_onsets(&self) -> usize {
        self.onsets.saturating_sub(self.emitted)
    }

    pub fn dropped_durations(&self) -> usize {
        self.durations.saturating_sub(self.emitted)
    }

    /// True when all three inputs had the same length
    pub fn is_balanced(&self) -> bool {
        self.stabilized_notes == self.onsets && self.onsets == self.durations
    }
}

/// Results of the rhythm analysis path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RhythmAnalysis {
    /// Onset times in seconds, ascending
    pub onsets: Vec<f64>,
    /// One duration per onset, in seconds
    pub durations: Vec<f64>,
    /// Tempo reported by the estimator, before defaulting
    pub raw_tempo_bpm: f64,
    /// Tempo used for MIDI output
    pub tempo_bpm: f64,
}

/// Results of the pitch analysis path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PitchAnalysis {
    pub note_frames: Vec<NoteFrame>,
    pub smoothed_frames: Vec<SmoothedFrame>,
    pub stabilized_notes: Vec<NoteSymbol>,
}

/// Complete analysis results for export
#[derive(Debug, Serialize)]
struct AnalysisResults<'a> {
    duration_sec: f64,
    sample_rate: u32,
    n_samples: usize,
    pitch: &'a PitchAnalysis,
    rhythm: &'a RhythmAnalysis,
    reconciliation: &'a ReconciliationReport,
    timed_notes: &'a [TimedNote],
}

/// Export analysis results to `analysis.json` in the output directory
pub fn export_analysis(state: &AudioState, output_dir: &Path) -> TranscribeResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join("analysis.json");

    let results = AnalysisResults {
        duration_sec: state.duration_sec(),
        sample_rate: state.waveform.sample_rate,
        n_samples: state.n_samples(),
        pitch: &state.pitch,
        rhythm: &state.rhythm,
        reconciliation: &state.reconciliation,
        timed_notes: &state.timed_notes,
    };

    let json = serde_json::to_string_pretty(&results)?;
    std::fs::write(&path, json).map_err(|e| {
        TranscribeError::AnalysisExportError(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        ))
    })?;

    log::debug!("Analysis written to {}", path.display());
    Ok(path)
}
