//! tonequill-core — document model, timing/chord evaluators, section and
//! harmony engines, and the Standard MIDI File emitter behind the tonequill
//! music tool server.
//!
//! The server mediates between a reasoning client and a single in-memory
//! musical piece: a title, a set of instrument tracks, a note list, a
//! section timeline, and a chord progression. Every mutation goes through
//! [`document::Document`], which enforces the document invariants (see
//! [`model`]) and maintains a bounded undo/redo history ([`snapshot`]).
//!
//! # Module Structure
//!
//! - [`error`]: the closed [`error::DocError`] enum returned by every
//!   fallible operation, with stable `code()`/`category()` identifiers.
//! - [`expr`]: the timing-expression evaluator (exact rational arithmetic).
//! - [`chord`]: the chord-symbol parser.
//! - [`model`]: the typed document entities (`Piece`, `Track`, `Note`,
//!   `Section`, `Chord`) and their invariants.
//! - [`instrument`]: General MIDI instrument name -> program number mapping.
//! - [`sections`]: section insertion and the neighbor-adjustment algorithm.
//! - [`notes`]: note batch insert, range delete, range query.
//! - [`chords`]: chord batch insert with split-on-insert overlap resolution.
//! - [`harmony`]: the chord-tone validator that flags dissonant notes.
//! - [`snapshot`]: the bounded undo/redo history.
//! - [`midi`]: the Standard MIDI File emitter.
//! - [`document`]: the `Document` handle tying the above into the
//!   checkpoint-before-write mutator contract the tool dispatch layer calls.

pub mod chord;
pub mod chords;
pub mod document;
pub mod error;
pub mod expr;
pub mod harmony;
pub mod instrument;
pub mod midi;
pub mod model;
pub mod notes;
pub mod sections;
pub mod snapshot;

pub use document::{Document, PieceInfo};
pub use error::{DocError, DocResult};

/// Crate version, surfaced by the MCP server's `get_piece_info`-adjacent
/// diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
