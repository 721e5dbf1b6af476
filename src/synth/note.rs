use std::fmt;
use std::str::FromStr;

/// Number of keys on the keyboard. Key 0 is A0, key 87 is C8.
pub const KEY_COUNT: u8 = 88;

/// A0, the lowest key, in Hz. Every other key is derived from it in equal
/// temperament.
pub const A0_HZ: f32 = 27.5;

/// Frequency of a key in Hz: `27.5 * 2^(key / 12)`.
///
/// Strictly increasing with key index across the 88-key range.
pub fn key_frequency(key: u8) -> f32 {
    debug_assert!(key < KEY_COUNT);
    A0_HZ * 2.0_f32.powf(key as f32 / 12.0)
}

/// Identity of one sounding pitch slot: a key on the 88-key keyboard,
/// named note-plus-octave ("C#4"). At most one voice exists per `NoteId`
/// at a time; the id is reused after the voice is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u8);

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl NoteId {
    /// From a raw key index (0 = A0 .. 87 = C8).
    pub fn from_key(key: u8) -> Option<Self> {
        (key < KEY_COUNT).then_some(Self(key))
    }

    pub fn key(self) -> u8 {
        self.0
    }

    /// Frequency of this note in Hz.
    pub fn frequency(self) -> f32 {
        key_frequency(self.0)
    }

    // Key 0 (A0) is 9 semitones above the C of octave 0.
    fn semitone_and_octave(self) -> (usize, u8) {
        let c_based = self.0 as usize + 9;
        ((c_based % 12), (c_based / 12) as u8)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (semitone, octave) = self.semitone_and_octave();
        write!(f, "{}{}", NOTE_NAMES[semitone], octave)
    }
}

impl FromStr for NoteId {
    type Err = ParseNoteError;

    /// Parse "A0" through "C8", with optional `#` sharp.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let (name_len, semitone) = match bytes {
            [letter, b'#', ..] => (2, sharp_semitone(*letter).ok_or(ParseNoteError)?),
            [letter, ..] => (1, natural_semitone(*letter).ok_or(ParseNoteError)?),
            [] => return Err(ParseNoteError),
        };

        let octave: i32 = s[name_len..].parse().map_err(|_| ParseNoteError)?;
        let key = semitone as i32 + 12 * octave - 9;
        u8::try_from(key)
            .ok()
            .and_then(Self::from_key)
            .ok_or(ParseNoteError)
    }
}

fn natural_semitone(letter: u8) -> Option<usize> {
    match letter {
        b'C' => Some(0),
        b'D' => Some(2),
        b'E' => Some(4),
        b'F' => Some(5),
        b'G' => Some(7),
        b'A' => Some(9),
        b'B' => Some(11),
        _ => None,
    }
}

fn sharp_semitone(letter: u8) -> Option<usize> {
    natural_semitone(letter).map(|s| (s + 1) % 12)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseNoteError;

impl fmt::Display for ParseNoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a note between A0 and C8")
    }
}

impl std::error::Error for ParseNoteError {}

/// Frequency band used to select register-appropriate synthesis
/// parameters: string count, detuning, harmonic weighting, and envelope
/// timing all vary by register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    LowBass,
    Bass,
    Mid,
    Treble,
}

impl Register {
    pub fn classify(frequency_hz: f32) -> Self {
        if frequency_hz < 100.0 {
            Register::LowBass
        } else if frequency_hz < 250.0 {
            Register::Bass
        } else if frequency_hz < 1000.0 {
            Register::Mid
        } else {
            Register::Treble
        }
    }
}
