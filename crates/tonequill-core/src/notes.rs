//! Note operations: atomic batch insert, half-open range delete, and
//! range/track query.

use crate::error::DocError;
use crate::expr::Beat;
use crate::model::{Note, Piece, TimingField};

/// One entry of an `add_notes` batch, before validation.
pub struct NoteInput {
    pub track: String,
    pub pitch: i64,
    pub start: TimingField,
    pub duration: TimingField,
}

fn validate_entry(piece: &Piece, entry: &NoteInput) -> Result<Note, DocError> {
    if !piece.has_track(&entry.track) {
        return Err(DocError::TrackMissing {
            name: entry.track.clone(),
        });
    }
    if !(0..=127).contains(&entry.pitch) {
        return Err(DocError::PitchOutOfRange { pitch: entry.pitch });
    }
    // Expressions must parse; duration must evaluate to a strictly positive
    // beat length. start must parse too, though 0 is a valid start.
    let _start = entry.start.to_time_value().eval()?;
    let duration = entry.duration.to_time_value().eval()?;
    if duration <= Beat::from_integer(0) {
        return Err(DocError::DurationNonPositive {
            duration: *duration.numer() as f64 / *duration.denom() as f64,
        });
    }
    Ok(Note {
        track: entry.track.clone(),
        pitch: entry.pitch as u8,
        start: entry.start.clone(),
        duration: entry.duration.clone(),
        flagged: None,
    })
}

/// Atomic, indexed-error batch insert.
pub fn add_notes(piece: &mut Piece, batch: Vec<NoteInput>) -> Result<usize, DocError> {
    let mut built = Vec::with_capacity(batch.len());
    for (index, entry) in batch.iter().enumerate() {
        match validate_entry(piece, entry) {
            Ok(note) => built.push(note),
            Err(reason) => {
                return Err(DocError::BatchEntry {
                    index,
                    reason: Box::new(reason),
                })
            }
        }
    }
    let count = built.len();
    piece.notes.extend(built);
    Ok(count)
}

const ALL_TRACKS: &str = "all";

/// Half-open `[s, e)` delete on `note.start`.
pub fn remove_notes_in_range(
    piece: &mut Piece,
    track: &str,
    start: f64,
    end: f64,
) -> Result<usize, DocError> {
    let before = piece.notes.len();
    piece.notes.retain(|note| {
        let matches_track = track == ALL_TRACKS || note.track == track;
        if !matches_track {
            return true;
        }
        let Ok(note_start) = note.start.to_time_value().eval() else {
            return true;
        };
        let note_start = note_start.to_f64();
        !(note_start >= start && note_start < end)
    });
    Ok(before - piece.notes.len())
}

/// Independent, combinable filters; preserves insertion order within equal
/// `start` values (a stable sort would be a no-op here since we never
/// reorder — the vector is already in insertion order).
pub fn get_notes(
    piece: &Piece,
    track: Option<&str>,
    start: Option<f64>,
    end: Option<f64>,
) -> Vec<Note> {
    piece
        .notes
        .iter()
        .filter(|note| track.is_none_or(|t| note.track == t))
        .filter(|note| {
            let Ok(note_start) = note.start.to_time_value().eval() else {
                return true;
            };
            let note_start = note_start.to_f64();
            start.is_none_or(|s| note_start >= s) && end.is_none_or(|e| note_start < e)
        })
        .cloned()
        .collect()
}

/// Small extension trait so `Beat` (an `num_rational::Ratio<i64>`) can be
/// compared against the plain f64 range bounds the tool catalog uses.
trait ToF64 {
    fn to_f64(&self) -> f64;
}

impl ToF64 for Beat {
    fn to_f64(&self) -> f64 {
        *self.numer() as f64 / *self.denom() as f64
    }
}
