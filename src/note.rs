//! Discrete note symbols and the frequency-to-note mapping

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A named pitch, stored as its MIDI note number (0-127).
///
/// Displays and serializes as pitch class + octave, with C4 = 60 and A4 = 69.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NoteSymbol(u8);

impl NoteSymbol {
    /// Create from a MIDI note number; `None` above 127
    pub fn from_midi(number: u8) -> Option<Self> {
        (number <= 127).then_some(NoteSymbol(number))
    }

    /// Map a frequency to the equal-tempered note at or below it (A4 = 440 Hz).
    ///
    /// The fractional MIDI number is truncated, so anything from A4 up to just
    /// under A#4 is A4. Returns `None` for non-positive or non-finite
    /// frequencies. Frequencies outside the MIDI range clamp to note 0 or 127.
    pub fn from_frequency(frequency: f32) -> Option<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let number = 69.0 + 12.0 * (frequency as f64 / 440.0).log2();
        Some(NoteSymbol(number.floor().clamp(0.0, 127.0) as u8))
    }

    pub fn midi_number(self) -> u8 {
        self.0
    }

    /// Center frequency of this note in Hz
    pub fn frequency(self) -> f32 {
        440.0 * 2f32.powf((self.0 as f32 - 69.0) / 12.0)
    }

    pub fn pitch_class(self) -> &'static str {
        NOTE_NAMES[(self.0 % 12) as usize]
    }

    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }
}

impl fmt::Display for NoteSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave())
    }
}

impl From<NoteSymbol> for String {
    fn from(note: NoteSymbol) -> Self {
        note.to_string()
    }
}

impl TryFrom<String> for NoteSymbol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for NoteSymbol {
    type Err = String;

    /// Parse names such as `A4`, `C#5`, `Eb3` or `G-1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars
            .next()
            .ok_or_else(|| "empty note name".to_string())?
            .to_ascii_uppercase();
        let base: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(format!("invalid note letter in '{}'", s)),
        };

        let rest = &s[1..];
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') | Some('♯') => (1, &rest[rest.chars().next().map_or(0, char::len_utf8)..]),
            Some('b') | Some('♭') => (-1, &rest[rest.chars().next().map_or(0, char::len_utf8)..]),
            _ => (0, rest),
        };

        let octave: i32 = octave_str
            .parse()
            .map_err(|_| format!("invalid octave in '{}'", s))?;
        let number = (octave + 1) * 12 + base + accidental;
        if !(0..=127).contains(&number) {
            return Err(format!("note '{}' is outside the MIDI range", s));
        }
        Ok(NoteSymbol(number as u8))
    }
}
