//! Validation tests for Pass 2: Pitch Stabilization

use voice2midi::analysis::{NoteFrame, SmoothedFrame};
use voice2midi::config::StabilizerConfig;
use voice2midi::note::NoteSymbol;
use voice2midi::passes::pass_2::{collapse_runs, run, smooth_pitch_frames};

fn note(name: &str) -> NoteSymbol {
    name.parse().unwrap()
}

/// Note frames 10 ms apart with the given names
fn frames(names: &[&str]) -> Vec<NoteFrame> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| NoteFrame {
            time: i as f64 * 0.01,
            note: note(name),
            confidence: 0.9,
        })
        .collect()
}

fn smoothed(names: &[&str]) -> Vec<SmoothedFrame> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| SmoothedFrame {
            time: i as f64,
            note: note(name),
        })
        .collect()
}

fn names(notes: &[NoteSymbol]) -> Vec<String> {
    notes.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clips_at_edges_and_averages_times() {
        let input = vec![
            NoteFrame {
                time: 0.0,
                note: note("A4"),
                confidence: 0.9,
            },
            NoteFrame {
                time: 0.1,
                note: note("A4"),
                confidence: 0.9,
            },
            NoteFrame {
                time: 0.2,
                note: note("B4"),
                confidence: 0.9,
            },
        ];
        let out = smooth_pitch_frames(&input, 5);

        assert_eq!(out.len(), 3);
        for frame in &out {
            assert_eq!(frame.note, note("A4"));
            assert!((frame.time - 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn test_isolated_glitch_is_smoothed_away() {
        let input = frames(&["A4", "A4", "A4", "C5", "A4", "A4", "A4"]);
        let out = smooth_pitch_frames(&input, 5);
        assert!(out.iter().all(|f| f.note == note("A4")));
    }

    #[test]
    fn test_tie_goes_to_first_seen_note() {
        // Window over all four frames has two of each
        let input = frames(&["B4", "A4", "A4", "B4"]);
        let out = smooth_pitch_frames(&input, 7);
        assert!(out.iter().all(|f| f.note == note("B4")));

        let input = frames(&["A4", "B4", "B4", "A4"]);
        let out = smooth_pitch_frames(&input, 7);
        assert!(out.iter().all(|f| f.note == note("A4")));
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let input = frames(&["A4", "C5", "E5"]);
        let out = smooth_pitch_frames(&input, 1);
        for (a, b) in input.iter().zip(&out) {
            assert_eq!(a.note, b.note);
            assert_eq!(a.time, b.time);
        }
    }

    #[test]
    fn test_smoothing_empty_input() {
        assert!(smooth_pitch_frames(&[], 5).is_empty());
    }

    #[test]
    fn test_collapse_runs() {
        let out = collapse_runs(&smoothed(&["A4", "A4", "B4", "B4", "B4", "A4", "C5"]));
        assert_eq!(names(&out), vec!["A4", "B4", "A4", "C5"]);
    }

    #[test]
    fn test_collapse_edge_cases() {
        assert!(collapse_runs(&[]).is_empty());
        assert_eq!(names(&collapse_runs(&smoothed(&["D4"; 6]))), vec!["D4"]);
        assert_eq!(names(&collapse_runs(&smoothed(&["D4"]))), vec!["D4"]);
    }

    #[test]
    fn test_collapsed_output_has_no_adjacent_duplicates() {
        let pattern = ["A4", "A4", "B4", "A4", "A4", "G4", "G4", "G4", "B4", "B4"];
        let input: Vec<&str> = pattern.iter().cycle().take(97).copied().collect();
        let out = collapse_runs(&smooth_pitch_frames(&frames(&input), 5));
        assert!(!out.is_empty());
        assert!(out.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_run_keeps_intermediate_results() {
        let analysis = run(
            frames(&["A4", "A4", "A4", "A4", "E5", "E5", "E5", "E5"]),
            &StabilizerConfig::default(),
        );
        assert_eq!(analysis.note_frames.len(), 8);
        assert_eq!(analysis.smoothed_frames.len(), 8);
        assert_eq!(names(&analysis.stabilized_notes), vec!["A4", "E5"]);
    }
}
