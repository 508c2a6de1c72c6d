//! Chord-symbol parser.
//!
//! Maps a chord symbol (`"Cmaj7"`, `"Am7b5"`, `"G7#11"`, `"C/E"`, ...) to a
//! root pitch class, a quality tag, and the set of pitch classes the chord
//! implies. Enharmonics are not normalized: a parsed `C#` stays `C#`, never
//! silently becoming `Db`. Callers that need to compare a chord tone against
//! a note's pitch must reduce both sides modulo 12 first (see
//! [`crate::harmony`]).

use crate::error::DocError;

/// Every quality this parser recognizes, used for `UnknownChordSymbol`'s
/// `supported_qualities` payload.
pub const SUPPORTED_QUALITIES: &[&str] = &[
    "major",
    "minor",
    "diminished",
    "augmented",
    "sus2",
    "sus4",
    "6",
    "minor6",
    "dominant7",
    "major7",
    "minor7",
    "diminished7",
    "half-diminished",
    "add9",
    "9",
    "minor9",
    "major9",
    "11",
    "13",
];

/// A parsed chord symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChord {
    /// Root pitch class name as spelled in the input (e.g. `"C#"`).
    pub root: String,
    /// Quality tag, one of [`SUPPORTED_QUALITIES`].
    pub quality: &'static str,
    /// Pitch-class names implied by the chord, spelled from the root.
    pub chord_tones: Vec<String>,
    /// Optional slash-bass pitch class; does not affect `chord_tones`.
    pub bass: Option<String>,
}

const NOTE_LETTERS: [(u8, i32); 7] = [
    (b'C', 0),
    (b'D', 2),
    (b'E', 4),
    (b'F', 5),
    (b'G', 7),
    (b'A', 9),
    (b'B', 11),
];

/// Parse a pitch-class name (`"C"`, `"F#"`, `"Bb"`) into (semitone 0-11, the
/// name re-spelled canonically from letter+accidental).
fn parse_pitch_class(name: &str) -> Option<(u8, String)> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base = NOTE_LETTERS
        .iter()
        .find(|(l, _)| *l == letter as u8)
        .map(|(_, v)| *v)?;
    let rest: String = chars.collect();
    let (accidental, spelling) = match rest.as_str() {
        "" => (0, String::new()),
        "#" | "s" => (1, "#".to_string()),
        "b" => (-1, "b".to_string()),
        "##" | "x" => (2, "##".to_string()),
        "bb" => (-2, "bb".to_string()),
        _ => return None,
    };
    let pc = ((base + accidental).rem_euclid(12)) as u8;
    Some((pc, format!("{letter}{spelling}")))
}

/// Pitch-class name for a semitone offset above `root_pc`, spelled from the
/// root's letter using accidentals only (never switching letters), which is
/// the simplest spelling that keeps `chord_tones` human-legible without
/// implementing full enharmonic spelling rules.
fn spell_tone(root_name: &str, root_pc: u8, interval: u8) -> String {
    let target_pc = (root_pc as u32 + interval as u32) % 12;
    // Re-derive every candidate spelling rooted at each of the 12 letters
    // and keep the one matching target_pc with the fewest accidentals,
    // falling back to a neutral "pc<N>" label only if nothing matches
    // (unreachable in practice since every pc has a natural-or-one-accidental spelling).
    const CANDIDATES: [(&str, u8); 17] = [
        ("C", 0),
        ("C#", 1),
        ("Db", 1),
        ("D", 2),
        ("D#", 3),
        ("Eb", 3),
        ("E", 4),
        ("F", 5),
        ("F#", 6),
        ("Gb", 6),
        ("G", 7),
        ("G#", 8),
        ("Ab", 8),
        ("A", 9),
        ("A#", 10),
        ("Bb", 10),
        ("B", 11),
    ];
    let root_letter = root_name.chars().next().unwrap_or('C');
    // Prefer a spelling that starts with the next letter after the root's
    // letter for thirds/fifths/sevenths-ish intervals; simplest robust rule:
    // pick the candidate matching target_pc whose letter differs from the
    // root's letter when the interval is nonzero, else the root's own name.
    if interval == 0 {
        return root_name.to_string();
    }
    let mut best: Option<&str> = None;
    for (name, pc) in CANDIDATES.iter() {
        if *pc as u32 == target_pc {
            if name.starts_with(root_letter) && interval != 0 {
                continue;
            }
            if best.is_none() {
                best = Some(name);
            }
            if !name.contains('b') {
                best = Some(name);
                break;
            }
        }
    }
    best.unwrap_or("C").to_string()
}

fn unknown(symbol: &str) -> DocError {
    DocError::UnknownChordSymbol {
        symbol: symbol.to_string(),
        supported_qualities: SUPPORTED_QUALITIES.to_vec(),
    }
}

/// Parse a chord symbol into its root, quality, and chord-tone set.
pub fn parse_chord(symbol: &str) -> Result<ParsedChord, DocError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(unknown(symbol));
    }

    let (main, bass) = match trimmed.split_once('/') {
        Some((a, b)) if !b.is_empty() && !b.contains('/') => (a, Some(b)),
        Some(_) => return Err(unknown(symbol)),
        None => (trimmed, None),
    };

    let bytes = main.as_bytes();
    if bytes.is_empty() {
        return Err(unknown(symbol));
    }
    let mut root_len = 1usize;
    if root_len < bytes.len() && matches!(bytes[root_len], b'#' | b'b') {
        root_len += 1;
    }
    let (root_pc, root_name) = parse_pitch_class(&main[..root_len]).ok_or_else(|| unknown(symbol))?;
    let rest = main[root_len..].trim();

    let (quality, intervals): (&'static str, &[u8]) = match rest {
        "" | "maj" | "M" => ("major", &[0, 4, 7]),
        "m" | "min" | "-" => ("minor", &[0, 3, 7]),
        "dim" | "o" => ("diminished", &[0, 3, 6]),
        "aug" | "+" => ("augmented", &[0, 4, 8]),
        "sus2" => ("sus2", &[0, 2, 7]),
        "sus4" | "sus" => ("sus4", &[0, 5, 7]),
        "6" => ("6", &[0, 4, 7, 9]),
        "m6" | "min6" => ("minor6", &[0, 3, 7, 9]),
        "7" | "dom7" => ("dominant7", &[0, 4, 7, 10]),
        "maj7" | "M7" => ("major7", &[0, 4, 7, 11]),
        "m7" | "min7" | "-7" => ("minor7", &[0, 3, 7, 10]),
        "dim7" | "o7" => ("diminished7", &[0, 3, 6, 9]),
        "m7b5" | "min7b5" | "\u{f8}7" | "\u{f8}" => ("half-diminished", &[0, 3, 6, 10]),
        "add9" => ("add9", &[0, 4, 7, 14]),
        "9" => ("9", &[0, 4, 7, 10, 14]),
        "m9" | "min9" => ("minor9", &[0, 3, 7, 10, 14]),
        "maj9" | "M9" => ("major9", &[0, 4, 7, 11, 14]),
        "11" => ("11", &[0, 4, 7, 10, 14, 17]),
        "13" => ("13", &[0, 4, 7, 10, 14, 21]),
        _ => return Err(unknown(symbol)),
    };

    let chord_tones = intervals
        .iter()
        .map(|iv| spell_tone(&root_name, root_pc, *iv))
        .collect();

    let bass = match bass {
        Some(b) => Some(parse_pitch_class(b).ok_or_else(|| unknown(symbol))?.1),
        None => None,
    };

    Ok(ParsedChord {
        root: root_name,
        quality,
        chord_tones,
        bass,
    })
}

/// Reduce a pitch-class name to its semitone integer 0-11, for comparison
/// against a note's `pitch % 12`. Both spellings of an enharmonic pair
/// reduce to the same integer.
pub fn pitch_class_to_int(name: &str) -> Option<u8> {
    parse_pitch_class(name).map(|(pc, _)| pc)
}
