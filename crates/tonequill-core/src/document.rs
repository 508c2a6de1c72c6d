//! Document handle: wires the typed [`Piece`] model together with its
//! [`History`], giving every mutator checkpoint-before-write semantics and
//! guaranteeing that a failed call never mutates the document or consumes
//! an undo slot.
//!
//! Each public method here corresponds to one tool in the MCP server's
//! catalog. The transport-facing dispatch layer (in `tonequill-mcp`) is a
//! thin JSON shim over this API; no tool-catalog logic lives there.

use crate::chords::{self, ChordInput};
use crate::error::DocError;
use crate::harmony;
use crate::model::{Chord, Note, Piece, Section, Track};
use crate::notes::{self, NoteInput};
use crate::sections::{self, SectionFields, SectionPatch};
use crate::snapshot::History;

/// The live piece plus its undo/redo history. One instance per process —
/// the document is process-wide singleton state.
#[derive(Debug, Default)]
pub struct Document {
    piece: Piece,
    history: History,
}

/// Summary payload for `get_piece_info`.
#[derive(Debug, Clone)]
pub struct PieceInfo {
    pub title: String,
    pub sections: Vec<Section>,
    pub tracks: Vec<Track>,
    pub note_count: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a clone of the live piece. On success, checkpoint the
    /// *pre-mutation* state and commit the clone; on error, the live piece
    /// is never touched and no undo slot is consumed.
    fn try_mutate<T>(
        &mut self,
        f: impl FnOnce(&mut Piece) -> Result<T, DocError>,
    ) -> Result<T, DocError> {
        let mut candidate = self.piece.clone();
        let result = f(&mut candidate)?;
        self.history.checkpoint(&self.piece);
        self.piece = candidate;
        Ok(result)
    }

    pub fn set_title(&mut self, title: String) -> Result<(), DocError> {
        self.try_mutate(|p| {
            p.title = title;
            Ok(())
        })
    }

    pub fn get_piece_info(&self) -> PieceInfo {
        PieceInfo {
            title: self.piece.title.clone(),
            sections: sections::get_sections(&self.piece),
            tracks: self.piece.tracks.clone(),
            note_count: self.piece.note_count(),
        }
    }

    pub fn add_section(&mut self, name: String, fields: SectionFields) -> Result<(), DocError> {
        self.try_mutate(|p| sections::add_section(p, name.clone(), clone_fields(&fields)))
    }

    pub fn edit_section(&mut self, name: &str, patch: SectionPatch) -> Result<(), DocError> {
        self.try_mutate(|p| sections::edit_section(p, name, clone_patch(&patch)))
    }

    pub fn remove_section(&mut self, name: &str) -> Result<(), DocError> {
        self.try_mutate(|p| sections::remove_section(p, name))
    }

    pub fn get_sections(&self) -> Vec<Section> {
        sections::get_sections(&self.piece)
    }

    pub fn add_track(&mut self, name: String, instrument: String) -> Result<(), DocError> {
        self.try_mutate(|p| {
            if name.trim().is_empty() {
                return Err(DocError::SchemaViolation {
                    message: "track name must not be empty".to_string(),
                });
            }
            if p.has_track(&name) {
                return Err(DocError::DuplicateName { name: name.clone() });
            }
            p.add_track_unchecked(name.clone(), instrument.clone());
            Ok(())
        })
    }

    /// Removes a track and cascades to delete its notes, returning how many
    /// notes were deleted.
    pub fn remove_track(&mut self, name: &str) -> Result<usize, DocError> {
        self.try_mutate(|p| {
            let before = p.tracks.len();
            p.tracks.retain(|t| t.name != name);
            if p.tracks.len() == before {
                return Err(DocError::NotFound {
                    name: name.to_string(),
                });
            }
            let notes_before = p.notes.len();
            p.notes.retain(|n| n.track != name);
            Ok(notes_before - p.notes.len())
        })
    }

    pub fn get_tracks(&self) -> Vec<Track> {
        self.piece.tracks.clone()
    }

    pub fn add_notes(&mut self, batch: Vec<NoteInput>) -> Result<usize, DocError> {
        self.try_mutate(|p| notes::add_notes(p, clone_note_batch(&batch)))
    }

    pub fn remove_notes_in_range(
        &mut self,
        track: &str,
        start: f64,
        end: f64,
    ) -> Result<usize, DocError> {
        self.try_mutate(|p| notes::remove_notes_in_range(p, track, start, end))
    }

    pub fn get_notes(
        &self,
        track: Option<&str>,
        start: Option<f64>,
        end: Option<f64>,
    ) -> Vec<Note> {
        notes::get_notes(&self.piece, track, start, end)
    }

    pub fn add_chords(&mut self, batch: Vec<ChordInput>) -> Result<Vec<Chord>, DocError> {
        self.try_mutate(|p| chords::add_chords(p, clone_chord_batch(&batch)))
    }

    pub fn remove_chords_in_range(&mut self, start: f64, end: f64) -> Result<usize, DocError> {
        self.try_mutate(|p| Ok(chords::remove_chords_in_range(p, start, end)))
    }

    pub fn get_chords_in_range(&self, start: f64, end: f64) -> Vec<Chord> {
        chords::get_chords_in_range(&self.piece, start, end)
    }

    pub fn flag_notes(
        &mut self,
        tracks: &[String],
        start: f64,
        end: f64,
    ) -> Result<usize, DocError> {
        self.try_mutate(|p| harmony::flag_notes(p, tracks, start, end))
    }

    pub fn remove_flagged_notes(&mut self) -> Result<Vec<Note>, DocError> {
        self.try_mutate(|p| Ok(harmony::remove_flagged_notes(p)))
    }

    /// Restores the popped snapshot. Unlike the other mutators, undo/redo
    /// intentionally bypass `try_mutate` — they manage the history stacks
    /// directly rather than pushing onto them.
    pub fn undo(&mut self) -> Result<(), DocError> {
        let restored = self.history.undo(&self.piece)?;
        self.piece = restored;
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), DocError> {
        let restored = self.history.redo(&self.piece)?;
        self.piece = restored;
        Ok(())
    }

    /// A pure read of the document, so it never touches history.
    pub fn export_midi(&self, path: &str) -> Result<String, DocError> {
        crate::midi::export_midi(&self.piece, path)
    }
}

fn clone_fields(fields: &SectionFields) -> SectionFields {
    SectionFields {
        start_measure: fields.start_measure,
        end_measure: fields.end_measure,
        tempo: fields.tempo,
        time_signature: fields.time_signature.clone(),
        key: fields.key.clone(),
        description: fields.description.clone(),
    }
}

fn clone_patch(patch: &SectionPatch) -> SectionPatch {
    SectionPatch {
        start_measure: patch.start_measure,
        end_measure: patch.end_measure,
        tempo: patch.tempo,
        time_signature: patch.time_signature.clone(),
        key: patch.key.clone(),
        description: patch.description.clone(),
    }
}

fn clone_note_batch(batch: &[NoteInput]) -> Vec<NoteInput> {
    batch
        .iter()
        .map(|n| NoteInput {
            track: n.track.clone(),
            pitch: n.pitch,
            start: n.start.clone(),
            duration: n.duration.clone(),
        })
        .collect()
}

fn clone_chord_batch(batch: &[ChordInput]) -> Vec<ChordInput> {
    batch
        .iter()
        .map(|c| ChordInput {
            beat: c.beat,
            symbol: c.symbol.clone(),
            duration: c.duration,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(s: i64, e: i64) -> SectionFields {
        SectionFields {
            start_measure: s,
            end_measure: e,
            tempo: 120,
            time_signature: "4/4".to_string(),
            key: "C".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn failed_mutation_leaves_document_untouched_and_consumes_no_undo_slot() {
        let mut doc = Document::new();
        doc.add_section("A".to_string(), fields(1, 4)).unwrap();
        let before = doc.get_sections();
        let err = doc.add_section("A".to_string(), fields(5, 8)).unwrap_err();
        assert!(matches!(err, DocError::DuplicateName { .. }));
        assert_eq!(doc.get_sections(), before);
        assert!(doc.undo().is_ok());
        // Only one successful checkpoint was ever pushed; the failed retry
        // above must not have added a second one.
        assert!(matches!(doc.undo(), Err(DocError::NothingToUndo)));
    }

    #[test]
    fn successful_mutation_is_undoable_and_redoable() {
        let mut doc = Document::new();
        doc.set_title("first".to_string()).unwrap();
        doc.set_title("second".to_string()).unwrap();
        assert_eq!(doc.get_piece_info().title, "second");
        doc.undo().unwrap();
        assert_eq!(doc.get_piece_info().title, "first");
        doc.redo().unwrap();
        assert_eq!(doc.get_piece_info().title, "second");
    }

    #[test]
    fn undo_history_is_bounded_and_exhausts_after_ten_pops() {
        let mut doc = Document::new();
        for i in 0..15 {
            doc.set_title(format!("title-{i}")).unwrap();
        }
        for _ in 0..10 {
            doc.undo().unwrap();
        }
        assert!(matches!(doc.undo(), Err(DocError::NothingToUndo)));
    }

    #[test]
    fn remove_track_cascades_to_its_notes() {
        let mut doc = Document::new();
        doc.add_track("p".to_string(), "piano".to_string()).unwrap();
        doc.add_notes(vec![NoteInput {
            track: "p".to_string(),
            pitch: 60,
            start: crate::model::TimingField::Number(0.0),
            duration: crate::model::TimingField::Number(1.0),
        }])
        .unwrap();
        let removed = doc.remove_track("p").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(doc.get_piece_info().note_count, 0);
    }
}
