//! MIDI assembly and export

use crate::analysis::TimedNote;
use crate::config::MidiConfig;
use crate::error::{Result as TranscribeResult, TranscribeError};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_DELTA: u32 = (1 << 28) - 1;

/// Convert seconds to ticks at a fixed tempo
pub fn seconds_to_ticks(seconds: f64, ticks_per_quarter: u16, tempo_bpm: f64) -> u32 {
    (seconds.max(0.0) * ticks_per_quarter as f64 * tempo_bpm / 60.0).round() as u32
}

/// Microseconds per quarter note for the tempo meta event
fn tempo_micros_per_quarter(tempo_bpm: f64) -> u32 {
    (60_000_000.0 / tempo_bpm).round().clamp(1.0, 0xFF_FFFF as f64) as u32
}

/// Serialize timed notes as a single-track Standard MIDI File.
///
/// The track carries the track name, tempo and program change, then one
/// note-on/note-off pair per note. Every note lasts at least one tick, and
/// at equal ticks note-offs come before note-ons.
pub fn assemble_midi(
    notes: &[TimedNote],
    tempo_bpm: f64,
    config: &MidiConfig,
) -> TranscribeResult<Vec<u8>> {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(TranscribeError::MidiExportError(format!(
            "Invalid tempo: {} BPM",
            tempo_bpm
        )));
    }
    if config.channel > 15 || config.program > 127 || config.ticks_per_quarter == 0 {
        return Err(TranscribeError::MidiExportError(format!(
            "Invalid MIDI settings (channel {}, program {}, ppq {})",
            config.channel, config.program, config.ticks_per_quarter
        )));
    }

    let ppq = config.ticks_per_quarter;
    let channel = u4::from(config.channel);

    // (tick, note-off first, message)
    let mut scheduled: Vec<(u32, u8, MidiMessage)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        if !note.start.is_finite() || !note.end.is_finite() {
            return Err(TranscribeError::MidiExportError(format!(
                "Non-finite timing for note {}",
                note.pitch
            )));
        }

        let key = u7::from(note.pitch.midi_number());
        let on_tick = seconds_to_ticks(note.start, ppq, tempo_bpm);
        let off_tick = seconds_to_ticks(note.end, ppq, tempo_bpm).max(on_tick.saturating_add(1));
        if off_tick > MAX_DELTA {
            return Err(TranscribeError::MidiExportError(format!(
                "Note {} at {:.2}s is beyond the representable track length",
                note.pitch, note.start
            )));
        }

        scheduled.push((
            on_tick,
            1,
            MidiMessage::NoteOn {
                key,
                vel: u7::from(note.velocity.min(127)),
            },
        ));
        scheduled.push((
            off_tick,
            0,
            MidiMessage::NoteOff {
                key,
                vel: u7::from(0),
            },
        ));
    }
    scheduled.sort_by_key(|&(tick, order, _)| (tick, order));

    let mut track_events = vec![
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(config.track_name.as_bytes())),
        },
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_micros_per_quarter(
                tempo_bpm,
            )))),
        },
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::from(config.program),
                },
            },
        },
    ];

    let mut current_tick = 0u32;
    for (tick, _, message) in scheduled {
        track_events.push(TrackEvent {
            delta: u28::from(tick - current_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        current_tick = tick;
    }

    track_events.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(u15::from(ppq)),
        },
        tracks: vec![track_events],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| TranscribeError::MidiExportError(format!("Failed to write MIDI data: {:?}", e)))?;

    log::debug!(
        "Assembled {} notes into {} bytes of MIDI at {:.1} BPM",
        notes.len(),
        bytes.len(),
        tempo_bpm
    );
    Ok(bytes)
}

/// Write MIDI bytes to `output_dir/filename`
pub fn export_midi(bytes: &[u8], output_dir: &Path, filename: &str) -> TranscribeResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let midi_path = output_dir.join(filename);

    let mut file = File::create(&midi_path)?;
    file.write_all(bytes)?;

    log::info!("Exported MIDI to {}", midi_path.display());
    Ok(midi_path)
}
