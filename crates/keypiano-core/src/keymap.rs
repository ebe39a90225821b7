//! Home-row key to 4th-octave note mapping.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Note {
    C4,
    D4,
    E4,
    F4,
    G4,
    A4,
    Bb4,
    B4,
}

impl Note {
    pub fn name(&self) -> &'static str {
        match self {
            Note::C4 => "C4",
            Note::D4 => "D4",
            Note::E4 => "E4",
            Note::F4 => "F4",
            Note::G4 => "G4",
            Note::A4 => "A4",
            Note::Bb4 => "Bb4",
            Note::B4 => "B4",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToneTableEntry {
    pub symbol: u8,
    /// Tenths of a hertz.
    pub frequency: u32,
    pub note: Note,
}

const fn entry(symbol: u8, frequency: u32, note: Note) -> ToneTableEntry {
    ToneTableEntry { symbol, frequency, note }
}

pub static TONE_TABLE: [ToneTableEntry; 8] = [
    entry(b'a', 2616, Note::C4),
    entry(b's', 2937, Note::D4),
    entry(b'd', 3296, Note::E4),
    entry(b'f', 3492, Note::F4),
    entry(b'j', 3920, Note::G4),
    entry(b'k', 4400, Note::A4),
    entry(b'l', 4662, Note::Bb4),
    entry(b';', 4939, Note::B4),
];

/// Table entry for a received byte, `None` for anything unmapped.
pub fn lookup_entry(symbol: u8) -> Option<&'static ToneTableEntry> {
    TONE_TABLE.iter().find(|entry| entry.symbol == symbol)
}

/// Frequency for a received byte, `None` means no tone.
pub fn lookup(symbol: u8) -> Option<u32> {
    lookup_entry(symbol).map(|entry| entry.frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_symbols() {
        assert_eq!(lookup(b'a'), Some(2616));
        assert_eq!(lookup(b's'), Some(2937));
        assert_eq!(lookup(b'd'), Some(3296));
        assert_eq!(lookup(b'f'), Some(3492));
        assert_eq!(lookup(b'j'), Some(3920));
        assert_eq!(lookup(b'k'), Some(4400));
        assert_eq!(lookup(b'l'), Some(4662));
        assert_eq!(lookup(b';'), Some(4939));
    }

    #[test]
    fn test_every_other_byte_is_silent() {
        let mapped = b"asdfjkl;";
        for byte in 0..=u8::MAX {
            if !mapped.contains(&byte) {
                assert_eq!(lookup(byte), None, "byte {byte:#04x}");
            }
        }
    }

    #[test]
    fn test_uppercase_is_unmapped() {
        assert_eq!(lookup(b'A'), None);
        assert_eq!(lookup(b'K'), None);
    }

    #[test]
    fn test_notes() {
        assert_eq!(lookup_entry(b'k').unwrap().note, Note::A4);
        assert_eq!(lookup_entry(b'l').unwrap().note.name(), "Bb4");
    }
}
