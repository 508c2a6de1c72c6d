use std::sync::Arc;
use std::time::Instant;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use tonequill_core::chords::ChordInput;
use tonequill_core::document::Document;
use tonequill_core::error::DocError;
use tonequill_core::notes::NoteInput;
use tonequill_core::sections::{SectionFields, SectionPatch};

use crate::params::{
    AddChordsParams, AddNotesParams, AddSectionParams, AddTrackParams, ChordRangeParams,
    EditSectionParams, ExportMidiParams, FlagNotesParams, GetNotesParams,
    RemoveNotesInRangeParams, RemoveSectionParams, RemoveTrackParams, SetTitleParams,
};

/// Serialize a successful result into the tool's JSON response body.
fn ok_result(value: impl Serialize) -> Result<CallToolResult, rmcp::ErrorData> {
    let text = serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string());
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Render a [`DocError`] as the `{code, message, category}` error envelope.
/// Tool calls never fail at the transport level for a predictable domain
/// error — only truly exceptional values get a protocol error, so this
/// always returns `Ok`.
fn err_result(err: DocError) -> Result<CallToolResult, rmcp::ErrorData> {
    let body = json!({
        "error": {
            "code": err.code(),
            "category": err.category(),
            "message": err.to_string(),
        }
    });
    Ok(CallToolResult::success(vec![Content::text(
        body.to_string(),
    )]))
}

/// Log one structured line per request: tool name, elapsed time, and the
/// success/error code the call finished with.
fn log_ok(tool: &str, started: Instant) {
    tracing::info!(
        tool,
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        code = "ok",
        "tool call completed"
    );
}

fn log_err(tool: &str, started: Instant, err: &DocError) {
    tracing::info!(
        tool,
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        code = err.code(),
        "tool call completed"
    );
}

/// Tool server state: a single process-wide [`Document`] behind a mutex.
/// Request processing is single-threaded and strictly serial; the mutex
/// exists to satisfy `Send`/`Sync` for the async handler trait, not to
/// arbitrate real contention.
#[derive(Clone)]
pub struct TonequillMcp {
    document: Arc<Mutex<Document>>,
    tool_router: ToolRouter<Self>,
}

impl TonequillMcp {
    /// Access the tool router for testing/introspection.
    pub fn router(&self) -> &ToolRouter<Self> {
        &self.tool_router
    }
}

#[tool_router]
impl TonequillMcp {
    pub fn new() -> Self {
        Self {
            document: Arc::new(Mutex::new(Document::new())),
            tool_router: Self::tool_router(),
        }
    }

    // ── Piece-level ────────────────────────────────────────

    /// Set the piece's title.
    #[rmcp::tool]
    async fn set_title(
        &self,
        Parameters(params): Parameters<SetTitleParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.set_title(params.title) {
            Ok(()) => {
                log_ok("set_title", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("set_title", started, &e);
                err_result(e)
            }
        }
    }

    /// Return the piece's title, sections, tracks, and note count.
    #[rmcp::tool]
    async fn get_piece_info(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let doc = self.document.lock().await;
        let info = doc.get_piece_info();
        log_ok("get_piece_info", started);
        ok_result(json!({
            "title": info.title,
            "sections": info.sections,
            "tracks": info.tracks,
            "note_count": info.note_count,
        }))
    }

    // ── Sections ───────────────────────────────────────────

    /// Add a section spanning a measure range with its own tempo, time
    /// signature, and key.
    #[rmcp::tool]
    async fn add_section(
        &self,
        Parameters(params): Parameters<AddSectionParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let fields = SectionFields {
            start_measure: params.start_measure,
            end_measure: params.end_measure,
            tempo: params.tempo,
            time_signature: params.time_signature,
            key: params.key,
            description: params.description,
        };
        let mut doc = self.document.lock().await;
        match doc.add_section(params.name, fields) {
            Ok(()) => {
                log_ok("add_section", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("add_section", started, &e);
                err_result(e)
            }
        }
    }

    /// Edit a section's fields. Neighboring sections are shrunk to absorb
    /// any overlap the edit creates; an edit that would fully swallow a
    /// neighbor is refused.
    #[rmcp::tool]
    async fn edit_section(
        &self,
        Parameters(params): Parameters<EditSectionParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let patch = SectionPatch {
            start_measure: params.start_measure,
            end_measure: params.end_measure,
            tempo: params.tempo,
            time_signature: params.time_signature,
            key: params.key,
            description: params.description,
        };
        let mut doc = self.document.lock().await;
        match doc.edit_section(&params.name, patch) {
            Ok(()) => {
                log_ok("edit_section", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("edit_section", started, &e);
                err_result(e)
            }
        }
    }

    /// Delete a section outright. Unlike `edit_section`, this never
    /// triggers neighbor adjustment.
    #[rmcp::tool]
    async fn remove_section(
        &self,
        Parameters(params): Parameters<RemoveSectionParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.remove_section(&params.name) {
            Ok(()) => {
                log_ok("remove_section", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("remove_section", started, &e);
                err_result(e)
            }
        }
    }

    /// List all sections, sorted by `start_measure`.
    #[rmcp::tool]
    async fn get_sections(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let doc = self.document.lock().await;
        let sections = doc.get_sections();
        log_ok("get_sections", started);
        ok_result(sections)
    }

    // ── Tracks ─────────────────────────────────────────────

    /// Declare an instrument track.
    #[rmcp::tool]
    async fn add_track(
        &self,
        Parameters(params): Parameters<AddTrackParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.add_track(params.name, params.instrument) {
            Ok(()) => {
                log_ok("add_track", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("add_track", started, &e);
                err_result(e)
            }
        }
    }

    /// Remove a track and every note on it.
    #[rmcp::tool]
    async fn remove_track(
        &self,
        Parameters(params): Parameters<RemoveTrackParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.remove_track(&params.name) {
            Ok(removed_notes_count) => {
                log_ok("remove_track", started);
                ok_result(json!({ "removed_notes_count": removed_notes_count }))
            }
            Err(e) => {
                log_err("remove_track", started, &e);
                err_result(e)
            }
        }
    }

    /// List all declared tracks.
    #[rmcp::tool]
    async fn get_tracks(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let doc = self.document.lock().await;
        let tracks = doc.get_tracks();
        log_ok("get_tracks", started);
        ok_result(tracks)
    }

    // ── Notes ──────────────────────────────────────────────

    /// Add a batch of notes. The whole batch is rejected if any entry fails
    /// validation; the error identifies the offending index.
    #[rmcp::tool]
    async fn add_notes(
        &self,
        Parameters(params): Parameters<AddNotesParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let batch = params
            .notes
            .into_iter()
            .map(|n| NoteInput {
                track: n.track,
                pitch: n.pitch,
                start: n.start.into(),
                duration: n.duration.into(),
            })
            .collect();
        let mut doc = self.document.lock().await;
        match doc.add_notes(batch) {
            Ok(added_count) => {
                log_ok("add_notes", started);
                ok_result(json!({ "added_count": added_count }))
            }
            Err(e) => {
                log_err("add_notes", started, &e);
                err_result(e)
            }
        }
    }

    /// Delete notes on `track` (or every track, via the `"all"` sentinel)
    /// starting in `[start_time, end_time)`.
    #[rmcp::tool]
    async fn remove_notes_in_range(
        &self,
        Parameters(params): Parameters<RemoveNotesInRangeParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.remove_notes_in_range(&params.track, params.start_time, params.end_time) {
            Ok(removed_count) => {
                log_ok("remove_notes_in_range", started);
                ok_result(json!({ "removed_count": removed_count }))
            }
            Err(e) => {
                log_err("remove_notes_in_range", started, &e);
                err_result(e)
            }
        }
    }

    /// Query notes by track and/or start-time range; all filters are
    /// independent and combinable.
    #[rmcp::tool]
    async fn get_notes(
        &self,
        Parameters(params): Parameters<GetNotesParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let doc = self.document.lock().await;
        let notes = doc.get_notes(
            params.track.as_deref(),
            params.start_time,
            params.end_time,
        );
        log_ok("get_notes", started);
        ok_result(notes)
    }

    // ── Chords ─────────────────────────────────────────────

    /// Add a batch of chords. Overlapping existing chords are trimmed or
    /// removed by split-on-insert; the batch is rejected whole on any
    /// unparseable symbol.
    #[rmcp::tool]
    async fn add_chords(
        &self,
        Parameters(params): Parameters<AddChordsParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let batch = params
            .chords
            .into_iter()
            .map(|c| ChordInput {
                beat: c.beat,
                symbol: c.chord,
                duration: c.duration,
            })
            .collect();
        let mut doc = self.document.lock().await;
        match doc.add_chords(batch) {
            Ok(chords_added) => {
                log_ok("add_chords", started);
                ok_result(json!({ "chords_added": chords_added }))
            }
            Err(e) => {
                log_err("add_chords", started, &e);
                err_result(e)
            }
        }
    }

    /// List chords overlapping `[start_beat, end_beat)`.
    #[rmcp::tool]
    async fn get_chords_in_range(
        &self,
        Parameters(params): Parameters<ChordRangeParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let doc = self.document.lock().await;
        let chords = doc.get_chords_in_range(params.start_beat, params.end_beat);
        log_ok("get_chords_in_range", started);
        ok_result(chords)
    }

    /// Delete chords overlapping `[start_beat, end_beat)`. Clears every
    /// note's `flagged` annotation, since the harmony context it was
    /// computed against may no longer hold.
    #[rmcp::tool]
    async fn remove_chords_in_range(
        &self,
        Parameters(params): Parameters<ChordRangeParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.remove_chords_in_range(params.start_beat, params.end_beat) {
            Ok(_) => {
                log_ok("remove_chords_in_range", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("remove_chords_in_range", started, &e);
                err_result(e)
            }
        }
    }

    // ── Harmony ────────────────────────────────────────────

    /// Flag every note in `tracks` whose start beat falls in
    /// `[start_beat, end_beat)` and whose pitch class is absent from the
    /// chord active at that beat. Clears all prior flags first.
    #[rmcp::tool]
    async fn flag_notes(
        &self,
        Parameters(params): Parameters<FlagNotesParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.flag_notes(&params.tracks, params.start_beat, params.end_beat) {
            Ok(flagged_count) => {
                log_ok("flag_notes", started);
                ok_result(json!({ "flagged_count": flagged_count }))
            }
            Err(e) => {
                log_err("flag_notes", started, &e);
                err_result(e)
            }
        }
    }

    /// Delete every currently-flagged note and return the deleted notes.
    #[rmcp::tool]
    async fn remove_flagged_notes(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.remove_flagged_notes() {
            Ok(removed) => {
                log_ok("remove_flagged_notes", started);
                ok_result(json!({ "count": removed.len(), "removed": removed }))
            }
            Err(e) => {
                log_err("remove_flagged_notes", started, &e);
                err_result(e)
            }
        }
    }

    // ── History ────────────────────────────────────────────

    /// Undo the most recent checkpointed mutation.
    #[rmcp::tool]
    async fn undo(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.undo() {
            Ok(()) => {
                log_ok("undo", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("undo", started, &e);
                err_result(e)
            }
        }
    }

    /// Redo the most recently undone mutation.
    #[rmcp::tool]
    async fn redo(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let mut doc = self.document.lock().await;
        match doc.redo() {
            Ok(()) => {
                log_ok("redo", started);
                ok_result(json!({ "ok": true }))
            }
            Err(e) => {
                log_err("redo", started, &e);
                err_result(e)
            }
        }
    }

    // ── Export ─────────────────────────────────────────────

    /// Write the piece to a Standard MIDI File at `filepath` (a `.mid`
    /// extension is appended if missing). A pure function of the document.
    #[rmcp::tool]
    async fn export_midi(
        &self,
        Parameters(params): Parameters<ExportMidiParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let started = Instant::now();
        let doc = self.document.lock().await;
        match doc.export_midi(&params.filepath) {
            Ok(filepath) => {
                log_ok("export_midi", started);
                ok_result(json!({ "filepath": filepath }))
            }
            Err(e) => {
                log_err("export_midi", started, &e);
                err_result(e)
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for TonequillMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tools for building and querying a symbolic-music document: \
                 declare tracks and sections, add and query notes and chords, \
                 flag notes against the active harmony, undo/redo, and export \
                 a Standard MIDI File. The document is a single process-wide \
                 piece; there is no multi-document support."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
