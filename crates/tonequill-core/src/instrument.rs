//! General MIDI instrument name -> program number mapping.
//!
//! Unknown names map to program 0 (acoustic grand piano). `drums` and
//! `percussion` are not programs at all — they route to MIDI channel 9
//! regardless of program number, handled by [`is_percussion`].

/// Canonical instrument name -> GM program number (0-127).
const GM_PROGRAMS: &[(&str, u8)] = &[
    ("piano", 0),
    ("acoustic_grand_piano", 0),
    ("bright_acoustic_piano", 1),
    ("electric_grand_piano", 2),
    ("electric_piano", 4),
    ("harpsichord", 6),
    ("celesta", 8),
    ("glockenspiel", 9),
    ("vibraphone", 11),
    ("marimba", 12),
    ("xylophone", 13),
    ("organ", 19),
    ("church_organ", 19),
    ("accordion", 21),
    ("acoustic_guitar", 24),
    ("electric_guitar", 27),
    ("distortion_guitar", 30),
    ("acoustic_bass", 32),
    ("electric_bass", 33),
    ("fretless_bass", 35),
    ("violin", 40),
    ("viola", 41),
    ("cello", 42),
    ("contrabass", 43),
    ("string_ensemble", 48),
    ("synth_strings", 50),
    ("choir_aahs", 52),
    ("trumpet", 56),
    ("trombone", 57),
    ("tuba", 58),
    ("french_horn", 60),
    ("brass_section", 61),
    ("soprano_sax", 64),
    ("alto_sax", 65),
    ("tenor_sax", 66),
    ("baritone_sax", 67),
    ("oboe", 68),
    ("clarinet", 71),
    ("flute", 73),
    ("recorder", 74),
    ("pan_flute", 75),
    ("synth_lead", 80),
    ("synth_pad", 88),
    ("sitar", 104),
    ("banjo", 105),
    ("shamisen", 106),
    ("koto", 107),
    ("steel_drums", 114),
    ("timpani", 47),
];

/// Normalize an instrument name for lookup: lowercase, spaces -> underscores.
fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(' ', "_")
}

/// True if `name` refers to the percussion kit, which is routed to channel 9
/// instead of a GM program.
pub fn is_percussion(name: &str) -> bool {
    matches!(normalize(name).as_str(), "drums" | "percussion")
}

/// Resolve an instrument name to its GM program number. Unknown names and
/// the percussion aliases both map to 0 (the percussion case is irrelevant
/// since percussion tracks never emit a meaningful program change; callers
/// should check [`is_percussion`] first).
pub fn normalize_instrument(name: &str) -> u8 {
    let key = normalize(name);
    GM_PROGRAMS
        .iter()
        .find(|(n, _)| *n == key)
        .map(|(_, p)| *p)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_instruments_map_correctly() {
        assert_eq!(normalize_instrument("piano"), 0);
        assert_eq!(normalize_instrument("violin"), 40);
        assert_eq!(normalize_instrument("cello"), 42);
        assert_eq!(normalize_instrument("trumpet"), 56);
        assert_eq!(normalize_instrument("flute"), 73);
        assert_eq!(normalize_instrument("acoustic_bass"), 32);
    }

    #[test]
    fn unknown_instrument_falls_back_to_piano() {
        assert_eq!(normalize_instrument("theremin-9000"), 0);
    }

    #[test]
    fn drums_and_percussion_are_recognized() {
        assert!(is_percussion("drums"));
        assert!(is_percussion("Percussion"));
        assert!(!is_percussion("piano"));
    }

    #[test]
    fn lookup_is_case_and_space_insensitive() {
        assert_eq!(normalize_instrument("Acoustic Grand Piano"), 0);
    }
}
