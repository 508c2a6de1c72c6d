//! Harmony validator: flags notes whose pitch class is absent from the
//! chord active at their start beat.

use crate::chord::pitch_class_to_int;
use crate::error::DocError;
use crate::model::Piece;

fn note_pitch_class(pitch: u8) -> u8 {
    pitch % 12
}

/// Flags every candidate note (one in `tracks` whose start beat falls in
/// `[start, end)`) whose pitch class is absent from the chord active at its
/// start beat, after clearing every note's prior flag.
///
/// Candidate notes are located before anything is mutated so that a
/// `NoProgression` error leaves the document untouched; only once we know
/// the call will succeed do we perform the unconditional flag clear.
pub fn flag_notes(
    piece: &mut Piece,
    tracks: &[String],
    start: f64,
    end: f64,
) -> Result<usize, DocError> {
    let mut candidate_indices = Vec::new();
    for (index, note) in piece.notes.iter().enumerate() {
        if !tracks.iter().any(|t| t == &note.track) {
            continue;
        }
        let Ok(note_start) = note.start.to_time_value().eval() else {
            continue;
        };
        let note_start: f64 = *note_start.numer() as f64 / *note_start.denom() as f64;
        if note_start >= start && note_start < end {
            candidate_indices.push(index);
        }
    }

    if !candidate_indices.is_empty() && piece.chord_progression.is_empty() {
        return Err(DocError::NoProgression);
    }

    for note in &mut piece.notes {
        note.flagged = None;
    }

    let mut flagged_count = 0;
    for index in candidate_indices {
        let note_start = {
            let note = &piece.notes[index];
            let value = note.start.to_time_value().eval()?;
            *value.numer() as f64 / *value.denom() as f64
        };
        let active = piece
            .chord_progression
            .iter()
            .find(|c| c.beat <= note_start && note_start < c.beat + c.duration);
        let Some(chord) = active else {
            continue;
        };
        let pitch_class = note_pitch_class(piece.notes[index].pitch);
        let in_chord = chord
            .chord_tones
            .iter()
            .any(|tone| pitch_class_to_int(tone) == Some(pitch_class));
        if !in_chord {
            piece.notes[index].flagged = Some(true);
            flagged_count += 1;
        }
    }
    Ok(flagged_count)
}

/// Deletes and returns every flagged note.
pub fn remove_flagged_notes(piece: &mut Piece) -> Vec<crate::model::Note> {
    let (flagged, rest): (Vec<_>, Vec<_>) = piece
        .notes
        .drain(..)
        .partition(|n| n.flagged == Some(true));
    piece.notes = rest;
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::{add_chords, ChordInput};
    use crate::model::{Note, TimingField};

    fn piece_with_notes() -> Piece {
        let mut p = Piece::new();
        p.add_track_unchecked("m".into(), "piano".into());
        for (beat, pitch) in [(0.0, 60u8), (1.0, 62), (2.0, 64), (3.0, 65)] {
            p.notes.push(Note {
                track: "m".to_string(),
                pitch,
                start: TimingField::Number(beat),
                duration: TimingField::Number(1.0),
                flagged: None,
            });
        }
        p
    }

    #[test]
    fn flagging_marks_only_out_of_chord_notes_and_clears_on_rerun() {
        let mut p = piece_with_notes();
        add_chords(
            &mut p,
            vec![ChordInput {
                beat: 0.0,
                symbol: "C".to_string(),
                duration: 4.0,
            }],
        )
        .unwrap();
        let flagged = flag_notes(&mut p, &["m".to_string()], 0.0, 4.0).unwrap();
        assert_eq!(flagged, 2);
        let removed = remove_flagged_notes(&mut p);
        assert_eq!(removed.len(), 2);
        let mut pitches: Vec<u8> = removed.iter().map(|n| n.pitch).collect();
        pitches.sort();
        assert_eq!(pitches, vec![62, 65]);
        let again = flag_notes(&mut p, &["m".to_string()], 0.0, 4.0).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn empty_progression_with_no_candidates_returns_zero() {
        let mut p = Piece::new();
        p.add_track_unchecked("m".into(), "piano".into());
        let flagged = flag_notes(&mut p, &["m".to_string()], 0.0, 4.0).unwrap();
        assert_eq!(flagged, 0);
    }

    #[test]
    fn empty_progression_with_candidates_errors() {
        let mut p = piece_with_notes();
        let err = flag_notes(&mut p, &["m".to_string()], 0.0, 4.0).unwrap_err();
        assert!(matches!(err, DocError::NoProgression));
    }

    #[test]
    fn note_outside_any_chord_is_left_unflagged() {
        let mut p = piece_with_notes();
        add_chords(
            &mut p,
            vec![ChordInput {
                beat: 0.0,
                symbol: "C".to_string(),
                duration: 2.0,
            }],
        )
        .unwrap();
        // Beat 3 has no covering chord; it must not be flagged even though
        // F (pitch class 5) is absent from {C,E,G}.
        flag_notes(&mut p, &["m".to_string()], 0.0, 4.0).unwrap();
        assert_eq!(p.notes[3].flagged, None);
    }

    #[test]
    fn flag_notes_clears_stale_flags_first() {
        let mut p = piece_with_notes();
        p.notes[0].flagged = Some(true);
        add_chords(
            &mut p,
            vec![ChordInput {
                beat: 0.0,
                symbol: "C".to_string(),
                duration: 4.0,
            }],
        )
        .unwrap();
        flag_notes(&mut p, &["m".to_string()], 10.0, 20.0).unwrap();
        assert_eq!(p.notes[0].flagged, None);
    }

    #[test]
    fn enharmonic_chord_spelling_still_matches() {
        let mut p = Piece::new();
        p.add_track_unchecked("m".into(), "piano".into());
        p.notes.push(Note {
            track: "m".to_string(),
            pitch: 61, // C# / Db
            start: TimingField::Number(0.0),
            duration: TimingField::Number(1.0),
            flagged: None,
        });
        add_chords(
            &mut p,
            vec![ChordInput {
                beat: 0.0,
                symbol: "Db".to_string(),
                duration: 4.0,
            }],
        )
        .unwrap();
        let flagged = flag_notes(&mut p, &["m".to_string()], 0.0, 4.0).unwrap();
        assert_eq!(flagged, 0);
    }
}
