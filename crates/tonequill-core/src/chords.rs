//! Chord-progression operations: atomic batch insert with split-on-insert
//! overlap resolution, half-open range delete, and range query.

use crate::chord::parse_chord;
use crate::error::DocError;
use crate::model::{Chord, Piece};

/// One entry of an `add_chords` batch, before parsing.
pub struct ChordInput {
    pub beat: f64,
    pub symbol: String,
    pub duration: f64,
}

fn validate_entry(entry: &ChordInput) -> Result<Chord, DocError> {
    if entry.beat < 0.0 {
        return Err(DocError::InvalidRange {
            start: entry.beat as i64,
            end: entry.beat as i64,
        });
    }
    if entry.duration <= 0.0 {
        return Err(DocError::DurationNonPositive {
            duration: entry.duration,
        });
    }
    let parsed = parse_chord(&entry.symbol)?;
    Ok(Chord {
        beat: entry.beat,
        chord: entry.symbol.clone(),
        duration: entry.duration,
        chord_tones: parsed.chord_tones,
    })
}

/// Trim or drop an existing chord `e` against the newly-inserted interval
/// `[n_start, n_end)`. Returns zero, one (if the overlap is on only one
/// side), or two pieces (if `n` falls strictly inside `e`, splitting it).
fn split_against(existing: &Chord, n_start: f64, n_end: f64) -> Vec<Chord> {
    let e_start = existing.beat;
    let e_end = existing.beat + existing.duration;
    if e_end <= n_start || e_start >= n_end {
        return vec![existing.clone()];
    }
    let mut pieces = Vec::new();
    if e_start < n_start {
        let mut left = existing.clone();
        left.duration = n_start - e_start;
        pieces.push(left);
    }
    if e_end > n_end {
        let mut right = existing.clone();
        right.beat = n_end;
        right.duration = e_end - n_end;
        pieces.push(right);
    }
    pieces
}

fn resort(piece: &mut Piece) {
    piece
        .chord_progression
        .sort_by(|a, b| a.beat.partial_cmp(&b.beat).unwrap_or(std::cmp::Ordering::Equal));
}

/// Atomic, indexed-error batch insert with split-on-insert.
pub fn add_chords(piece: &mut Piece, batch: Vec<ChordInput>) -> Result<Vec<Chord>, DocError> {
    let mut built = Vec::with_capacity(batch.len());
    for (index, entry) in batch.iter().enumerate() {
        match validate_entry(entry) {
            Ok(chord) => built.push(chord),
            Err(reason) => {
                return Err(DocError::BatchEntry {
                    index,
                    reason: Box::new(reason),
                })
            }
        }
    }
    for new_chord in &built {
        let n_start = new_chord.beat;
        let n_end = new_chord.beat + new_chord.duration;
        let mut survivors = Vec::with_capacity(piece.chord_progression.len());
        for existing in &piece.chord_progression {
            survivors.extend(split_against(existing, n_start, n_end));
        }
        survivors.push(new_chord.clone());
        piece.chord_progression = survivors;
    }
    resort(piece);
    Ok(built)
}

fn overlaps(chord: &Chord, start: f64, end: f64) -> bool {
    chord.beat < end && (chord.beat + chord.duration) > start
}

/// Half-open delete that also invalidates every note's `flagged` annotation,
/// since the harmony context it was computed against may no longer hold.
pub fn remove_chords_in_range(piece: &mut Piece, start: f64, end: f64) -> usize {
    let before = piece.chord_progression.len();
    piece
        .chord_progression
        .retain(|c| !overlaps(c, start, end));
    for note in &mut piece.notes {
        note.flagged = None;
    }
    before - piece.chord_progression.len()
}

/// Chords overlapping `[start, end)`, in beat order (the stored progression
/// is already sorted, so this is just a filter).
pub fn get_chords_in_range(piece: &Piece, start: f64, end: f64) -> Vec<Chord> {
    piece
        .chord_progression
        .iter()
        .filter(|c| overlaps(c, start, end))
        .cloned()
        .collect()
}
