//! Validation tests for Pass 1: Pitch Frame Extraction

use std::sync::Mutex;
use voice2midi::analysis::{PitchFrame, PitchTrack};
use voice2midi::audio::Waveform;
use voice2midi::config::PitchConfig;
use voice2midi::passes::pass_1;
use voice2midi::pitch::{PitchEstimator, YinPitchEstimator};
use voice2midi::TranscribeError;

/// Replays a fixed list of tracks, one per chunk, and records chunk lengths
struct ScriptedEstimator {
    tracks: Vec<PitchTrack>,
    seen: Mutex<Vec<usize>>,
}

impl ScriptedEstimator {
    fn new(tracks: Vec<PitchTrack>) -> Self {
        Self {
            tracks,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl PitchEstimator for ScriptedEstimator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn predict(&self, chunk: &[f32], _sample_rate: u32) -> anyhow::Result<PitchTrack> {
        let mut seen = self.seen.lock().unwrap();
        let idx = seen.len();
        seen.push(chunk.len());
        Ok(self.tracks.get(idx).cloned().unwrap_or_default())
    }
}

struct FailingEstimator;

impl PitchEstimator for FailingEstimator {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn predict(&self, _chunk: &[f32], _sample_rate: u32) -> anyhow::Result<PitchTrack> {
        anyhow::bail!("model unavailable")
    }
}

fn track(frames: &[(f64, f32, f32)]) -> PitchTrack {
    let mut track = PitchTrack::default();
    for &(time, frequency, confidence) in frames {
        track.push(PitchFrame {
            time,
            frequency,
            confidence,
        });
    }
    track
}

fn small_chunks(globalize: bool) -> PitchConfig {
    PitchConfig {
        chunk_size: 100,
        globalize_chunk_times: globalize,
        ..PitchConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_waveform_with_short_tail() {
        let estimator = ScriptedEstimator::new(Vec::new());
        let waveform = Waveform::new(vec![0.0; 250], 1000);
        let frames = pass_1::run(&waveform, &small_chunks(true), &estimator).unwrap();
        assert!(frames.is_empty());
        assert_eq!(*estimator.seen.lock().unwrap(), vec![100, 100, 50]);
    }

    #[test]
    fn test_confidence_threshold_is_inclusive() {
        let estimator = ScriptedEstimator::new(vec![track(&[
            (0.00, 440.0, 0.74),
            (0.01, 440.0, 0.73),
            (0.02, 440.0, 0.99),
        ])]);
        let waveform = Waveform::new(vec![0.0; 100], 1000);
        let frames = pass_1::run(&waveform, &small_chunks(true), &estimator).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].time, 0.00);
        assert_eq!(frames[1].time, 0.02);
        assert!(frames.iter().all(|f| f.note.to_string() == "A4"));
    }

    #[test]
    fn test_unpitched_frames_are_dropped() {
        let estimator = ScriptedEstimator::new(vec![track(&[
            (0.00, 0.0, 0.95),
            (0.01, -3.0, 0.95),
            (0.02, 261.63, 0.95),
        ])]);
        let waveform = Waveform::new(vec![0.0; 100], 1000);
        let frames = pass_1::run(&waveform, &small_chunks(true), &estimator).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].note.to_string(), "C4");
    }

    #[test]
    fn test_chunk_times_are_globalized() {
        let estimator = ScriptedEstimator::new(vec![
            track(&[(0.05, 440.0, 0.9)]),
            track(&[(0.01, 659.26, 0.9)]),
        ]);
        let waveform = Waveform::new(vec![0.0; 200], 1000);
        let frames = pass_1::run(&waveform, &small_chunks(true), &estimator).unwrap();

        assert_eq!(frames.len(), 2);
        assert!((frames[0].time - 0.05).abs() < 1e-12);
        assert!((frames[1].time - 0.11).abs() < 1e-12);
        assert_eq!(frames[1].note.to_string(), "E5");
    }

    #[test]
    fn test_chunk_relative_times_are_sorted() {
        let estimator = ScriptedEstimator::new(vec![
            track(&[(0.05, 440.0, 0.9)]),
            track(&[(0.01, 659.26, 0.9)]),
        ]);
        let waveform = Waveform::new(vec![0.0; 200], 1000);
        let frames = pass_1::run(&waveform, &small_chunks(false), &estimator).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].note.to_string(), "E5");
        assert_eq!(frames[1].note.to_string(), "A4");
    }

    #[test]
    fn test_equal_times_keep_estimator_order() {
        let estimator = ScriptedEstimator::new(vec![track(&[
            (0.02, 440.0, 0.9),
            (0.01, 330.0, 0.9),
            (0.02, 220.0, 0.9),
        ])]);
        let waveform = Waveform::new(vec![0.0; 100], 1000);
        let frames = pass_1::run(&waveform, &small_chunks(true), &estimator).unwrap();

        let names: Vec<String> = frames.iter().map(|f| f.note.to_string()).collect();
        assert_eq!(names, vec!["E4", "A4", "A3"]);
    }

    #[test]
    fn test_misaligned_track_is_estimator_failure() {
        let mut bad = track(&[(0.0, 440.0, 0.9), (0.01, 440.0, 0.9)]);
        bad.confidences.pop();
        let estimator = ScriptedEstimator::new(vec![bad]);
        let waveform = Waveform::new(vec![0.0; 100], 1000);

        let err = pass_1::run(&waveform, &small_chunks(true), &estimator).unwrap_err();
        assert!(matches!(err, TranscribeError::EstimatorFailure { .. }));
    }

    #[test]
    fn test_estimator_error_is_propagated() {
        let waveform = Waveform::new(vec![0.0; 100], 1000);
        let err = pass_1::run(&waveform, &small_chunks(true), &FailingEstimator).unwrap_err();
        match err {
            TranscribeError::EstimatorFailure { estimator, message } => {
                assert_eq!(estimator, "failing");
                assert!(message.contains("model unavailable"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_yin_on_sustained_tone() {
        let sr = 44100;
        // Slightly sharp of A3 so estimator jitter stays above the truncation boundary
        let samples: Vec<f32> = (0..sr)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 223.0 * i as f32 / sr as f32).sin())
            .collect();
        let waveform = Waveform::new(samples, sr as u32);
        let frames =
            pass_1::run(&waveform, &PitchConfig::default(), &YinPitchEstimator::default()).unwrap();

        assert!(frames.len() > 50);
        let a3 = frames.iter().filter(|f| f.note.to_string() == "A3").count();
        assert!(a3 as f32 / frames.len() as f32 > 0.9);
        assert!(frames.windows(2).all(|w| w[0].time <= w[1].time));
        assert!(frames.last().unwrap().time < 1.0);
    }

    #[test]
    fn test_yin_on_silence_yields_no_frames() {
        let waveform = Waveform::new(vec![0.0; 44100], 44100);
        let frames =
            pass_1::run(&waveform, &PitchConfig::default(), &YinPitchEstimator::default()).unwrap();
        assert!(frames.is_empty());
    }
}
