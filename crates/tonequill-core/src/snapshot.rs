//! Snapshot engine: bounded undo/redo history over whole-document deep
//! copies.
//!
//! `Piece` is built entirely from owned, non-shared data (`String`, `Vec`,
//! plain value types), so `Clone` already produces a structurally
//! independent snapshot — no `Rc`/`Arc` aliasing to worry about, and no need
//! for a diff-based or structural-sharing history like a larger document
//! model might reach for.

use crate::error::DocError;
use crate::model::Piece;

/// Maximum number of undo entries kept.
pub const MAX_HISTORY: usize = 10;

/// Bounded undo/redo history attached to a live [`Piece`].
#[derive(Debug, Clone, Default)]
pub struct History {
    undo_stack: Vec<Piece>,
    redo_stack: Vec<Piece>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Push a snapshot of `current` onto the undo stack, trim from the
    /// bottom to [`MAX_HISTORY`], and clear the redo stack. Must be called
    /// before a mutator's first write; if the mutator goes on to fail
    /// validation, callers must not call this at all (see
    /// `DocError`-returning mutators in `piece.rs`, which validate first).
    pub fn checkpoint(&mut self, current: &Piece) {
        self.undo_stack.push(current.clone());
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Pop the most recent checkpoint, push `current` onto the redo stack,
    /// and return the popped snapshot to restore.
    pub fn undo(&mut self, current: &Piece) -> Result<Piece, DocError> {
        let restored = self.undo_stack.pop().ok_or(DocError::NothingToUndo)?;
        self.redo_stack.push(current.clone());
        Ok(restored)
    }

    /// Symmetric to [`Self::undo`].
    pub fn redo(&mut self, current: &Piece) -> Result<Piece, DocError> {
        let restored = self.redo_stack.pop().ok_or(DocError::NothingToRedo)?;
        self.undo_stack.push(current.clone());
        Ok(restored)
    }
}
