//! Domain error types for the document core.
//!
//! One `thiserror`-derived enum covers every predictable failure a mutator or
//! query can raise; each variant carries the data needed to reconstruct a
//! useful message and a stable machine-readable code via [`DocError::code`].

use thiserror::Error;

/// All predictable errors the document core can raise.
///
/// Exhaustive by design: the tool dispatch layer matches on this enum to
/// build the transport's typed error envelope, and a closed set makes that
/// mapping total.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocError {
    #[error("malformed expression '{expr}': {reason}")]
    MalformedExpression { expr: String, reason: String },

    #[error("unknown chord symbol '{symbol}'")]
    UnknownChordSymbol {
        symbol: String,
        supported_qualities: Vec<&'static str>,
    },

    #[error("duplicate name '{name}'")]
    DuplicateName { name: String },

    #[error("not found: '{name}'")]
    NotFound { name: String },

    #[error("invalid range [{start}, {end}]")]
    InvalidRange { start: i64, end: i64 },

    #[error("section '{name}' overlaps existing section '{other}'")]
    SectionOverlap { name: String, other: String },

    #[error("edit to '{name}' would swallow section '{other}'")]
    SectionWouldSwallow { name: String, other: String },

    #[error("pitch {pitch} out of range 0..=127")]
    PitchOutOfRange { pitch: i64 },

    #[error("duration {duration} must be > 0")]
    DurationNonPositive { duration: f64 },

    #[error("track '{name}' does not exist")]
    TrackMissing { name: String },

    #[error("no chord progression defined")]
    NoProgression,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("unknown tool '{name}'")]
    UnknownTool { name: String },

    #[error("schema violation: {message}")]
    SchemaViolation { message: String },

    #[error("I/O error: {message}")]
    IOError { message: String },

    #[error("batch failed at index {index}: {reason}")]
    BatchEntry { index: usize, reason: Box<DocError> },
}

impl DocError {
    /// Stable machine-readable code, grouped by subsystem, in the style the
    /// teacher's backends use for `BackendError::code`.
    pub fn code(&self) -> &'static str {
        match self {
            DocError::MalformedExpression { .. } => "MUSIC_EXPR_001",
            DocError::UnknownChordSymbol { .. } => "MUSIC_CHORD_001",
            DocError::DuplicateName { .. } => "MUSIC_DOC_001",
            DocError::NotFound { .. } => "MUSIC_DOC_002",
            DocError::InvalidRange { .. } => "MUSIC_DOC_003",
            DocError::SectionOverlap { .. } => "MUSIC_SECTION_001",
            DocError::SectionWouldSwallow { .. } => "MUSIC_SECTION_002",
            DocError::PitchOutOfRange { .. } => "MUSIC_NOTE_001",
            DocError::DurationNonPositive { .. } => "MUSIC_NOTE_002",
            DocError::TrackMissing { .. } => "MUSIC_NOTE_003",
            DocError::NoProgression => "MUSIC_HARMONY_001",
            DocError::NothingToUndo => "MUSIC_HISTORY_001",
            DocError::NothingToRedo => "MUSIC_HISTORY_002",
            DocError::UnknownTool { .. } => "MUSIC_DISPATCH_001",
            DocError::SchemaViolation { .. } => "MUSIC_DISPATCH_002",
            DocError::IOError { .. } => "MUSIC_IO_001",
            DocError::BatchEntry { .. } => "MUSIC_BATCH_001",
        }
    }

    /// Subsystem category, mirroring `BackendError::category`.
    pub fn category(&self) -> &'static str {
        match self {
            DocError::MalformedExpression { .. } => "expr",
            DocError::UnknownChordSymbol { .. } => "chord",
            DocError::SectionOverlap { .. } | DocError::SectionWouldSwallow { .. } => "section",
            DocError::PitchOutOfRange { .. }
            | DocError::DurationNonPositive { .. }
            | DocError::TrackMissing { .. } => "note",
            DocError::NoProgression => "harmony",
            DocError::NothingToUndo { .. } | DocError::NothingToRedo { .. } => "history",
            DocError::UnknownTool { .. } | DocError::SchemaViolation { .. } => "dispatch",
            DocError::IOError { .. } => "io",
            DocError::BatchEntry { .. } => "batch",
            _ => "doc",
        }
    }
}

pub type DocResult<T> = Result<T, DocError>;
