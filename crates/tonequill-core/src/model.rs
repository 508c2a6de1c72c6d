//! Document model: the typed entities that make up a [`Piece`].
//!
//! A successfully-returning mutator always leaves the following intact:
//! track names are unique, section names are unique, sections stay sorted
//! and disjoint over `[start_measure, end_measure]`, chords stay sorted and
//! disjoint over `[beat, beat+duration)`, every note references an existing
//! track, pitch stays in `0..=127` with duration `> 0`, and the undo history
//! never exceeds its cap.

use serde::{Deserialize, Serialize};

use crate::expr::TimeValue;

/// A declared instrument track. `name` is the primary key and must be
/// unique across the piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub instrument: String,
}

/// A note on a track. `start`/`duration` are stored pre-evaluation so the
/// original expression string survives round-trips through `get_notes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub track: String,
    pub pitch: u8,
    pub start: TimingField,
    pub duration: TimingField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
}

/// A beat position or duration as it arrived over the wire: either a plain
/// number or a timing-expression string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimingField {
    Number(f64),
    Expr(String),
}

impl TimingField {
    pub fn to_time_value(&self) -> TimeValue {
        match self {
            TimingField::Number(n) => TimeValue::Number(*n),
            TimingField::Expr(s) => TimeValue::Expr(s.clone()),
        }
    }
}

/// A contiguous measure range with its own tempo/meter/key. `name` is the
/// primary key and must be unique; ranges are inclusive on both ends and
/// never overlap another section's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub start_measure: i64,
    pub end_measure: i64,
    pub tempo: u32,
    pub time_signature: String,
    pub key: String,
    #[serde(default)]
    pub description: String,
}

/// A chord event covering `[beat, beat + duration)`. The stored progression
/// is always sorted by `beat` and its intervals never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub beat: f64,
    pub chord: String,
    pub duration: f64,
    pub chord_tones: Vec<String>,
}

/// The whole composition, minus its undo/redo history (a [`Piece`] clone is
/// exactly a snapshot; see [`crate::snapshot`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub title: String,
    pub tracks: Vec<Track>,
    pub notes: Vec<Note>,
    pub sections: Vec<Section>,
    pub chord_progression: Vec<Chord>,
}

impl Default for Piece {
    fn default() -> Self {
        Piece {
            title: "Untitled".to_string(),
            tracks: Vec::new(),
            notes: Vec::new(),
            sections: Vec::new(),
            chord_progression: Vec::new(),
        }
    }
}

impl Piece {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn has_track(&self, name: &str) -> bool {
        self.find_track(name).is_some()
    }

    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Push a track without re-checking name uniqueness; callers validate
    /// that first. Instrument names are stored verbatim — the GM mapping
    /// table (see [`crate::instrument`]) only matters at MIDI export time.
    pub fn add_track_unchecked(&mut self, name: String, instrument: String) {
        self.tracks.push(Track { name, instrument });
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}
