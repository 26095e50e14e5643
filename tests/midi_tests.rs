//! Validation tests for MIDI assembly

use midly::num::u15;
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use voice2midi::analysis::TimedNote;
use voice2midi::config::MidiConfig;
use voice2midi::midi::{assemble_midi, export_midi};
use voice2midi::note::NoteSymbol;
use voice2midi::TranscribeError;

fn timed(name: &str, start: f64, end: f64) -> TimedNote {
    TimedNote {
        pitch: name.parse::<NoteSymbol>().unwrap(),
        start,
        end,
        velocity: 100,
    }
}

/// Absolute tick, note number, true for note-on
fn note_events(smf: &Smf) -> Vec<(u32, u8, bool)> {
    let mut tick = 0u32;
    let mut events = Vec::new();
    for event in &smf.tracks[0] {
        tick += event.delta.as_int();
        if let TrackEventKind::Midi { message, .. } = event.kind {
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    events.push((tick, key.as_int(), true))
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    events.push((tick, key.as_int(), false))
                }
                _ => {}
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_track_file_structure() {
        let notes = vec![timed("A4", 0.2, 0.8), timed("E5", 1.2, 1.8)];
        let bytes = assemble_midi(&notes, 120.0, &MidiConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::new(960)));
        assert_eq!(smf.tracks.len(), 1);

        let track = &smf.tracks[0];
        assert!(track.iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Meta(MetaMessage::TrackName(name)) if name == b"Acoustic Grand Piano"
        )));
        assert!(track.iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
        )));
        assert!(track.iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                channel,
            } if program.as_int() == 0 && channel.as_int() == 0
        )));
        assert!(matches!(
            track.last().unwrap().kind,
            TrackEventKind::Meta(MetaMessage::EndOfTrack)
        ));
    }

    #[test]
    fn test_note_timing_in_ticks() {
        // 120 BPM at 960 ppq is 1920 ticks per second
        let notes = vec![timed("A4", 0.2, 0.8), timed("E5", 1.2, 1.8)];
        let bytes = assemble_midi(&notes, 120.0, &MidiConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        assert_eq!(
            note_events(&smf),
            vec![
                (384, 69, true),
                (1536, 69, false),
                (2304, 76, true),
                (3456, 76, false),
            ]
        );
    }

    #[test]
    fn test_velocity_is_written() {
        let notes = vec![timed("C4", 0.0, 0.5)];
        let bytes = assemble_midi(&notes, 100.0, &MidiConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let velocity = smf.tracks[0].iter().find_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { vel, .. },
                ..
            } => Some(vel.as_int()),
            _ => None,
        });
        assert_eq!(velocity, Some(100));
    }

    #[test]
    fn test_zero_notes_is_a_valid_empty_file() {
        let bytes = assemble_midi(&[], 120.0, &MidiConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        assert!(note_events(&smf).is_empty());
    }

    #[test]
    fn test_zero_length_note_lasts_one_tick() {
        let bytes = assemble_midi(&[timed("G4", 0.5, 0.5)], 120.0, &MidiConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(note_events(&smf), vec![(960, 67, true), (961, 67, false)]);
    }

    #[test]
    fn test_note_off_precedes_note_on_at_same_tick() {
        let notes = vec![timed("A4", 0.0, 0.5), timed("A4", 0.5, 1.0)];
        let bytes = assemble_midi(&notes, 120.0, &MidiConfig::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(
            note_events(&smf),
            vec![
                (0, 69, true),
                (960, 69, false),
                (960, 69, true),
                (1920, 69, false),
            ]
        );
    }

    #[test]
    fn test_custom_program_and_channel() {
        let config = MidiConfig {
            program: 52,
            channel: 3,
            ..MidiConfig::default()
        };
        let bytes = assemble_midi(&[timed("D5", 0.1, 0.4)], 90.0, &config).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert!(smf.tracks[0].iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                channel,
            } if program.as_int() == 52 && channel.as_int() == 3
        )));
    }

    #[test]
    fn test_far_future_note_is_an_error() {
        let notes = vec![timed("A4", 0.0, 0.5), timed("B4", 1.0e12, 1.0e12 + 1.0)];
        let err = assemble_midi(&notes, 120.0, &MidiConfig::default()).unwrap_err();
        assert!(matches!(err, TranscribeError::MidiExportError(_)));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = std::env::temp_dir().join(format!("voice2midi_midi_{}", std::process::id()));
        let bytes = assemble_midi(&[timed("A4", 0.0, 1.0)], 120.0, &MidiConfig::default()).unwrap();
        let path = export_midi(&bytes, &dir, "melody.mid").unwrap();

        assert_eq!(path, dir.join("melody.mid"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
