//! Parameter structs for every tool that takes arguments; tools with an
//! empty `{}` input take no parameters at the Rust level.

use schemars::JsonSchema;
use serde::Deserialize;
use tonequill_core::model::TimingField;

/// A beat position or duration as it arrives over the wire: a JSON number or
/// a timing-expression string. Mirrors `tonequill_core::model::TimingField`
/// but derives `JsonSchema` locally so the core crate doesn't need to carry a
/// schema-generation dependency purely for its own sake.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TimingParam {
    Number(f64),
    Expr(String),
}

impl From<TimingParam> for TimingField {
    fn from(value: TimingParam) -> Self {
        match value {
            TimingParam::Number(n) => TimingField::Number(n),
            TimingParam::Expr(s) => TimingField::Expr(s),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetTitleParams {
    pub title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddSectionParams {
    pub name: String,
    pub start_measure: i64,
    pub end_measure: i64,
    pub tempo: u32,
    pub time_signature: String,
    pub key: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditSectionParams {
    pub name: String,
    pub start_measure: Option<i64>,
    pub end_measure: Option<i64>,
    pub tempo: Option<u32>,
    pub time_signature: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveSectionParams {
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddTrackParams {
    pub name: String,
    pub instrument: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveTrackParams {
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoteInputParam {
    pub track: String,
    pub pitch: i64,
    pub start: TimingParam,
    pub duration: TimingParam,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddNotesParams {
    pub notes: Vec<NoteInputParam>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveNotesInRangeParams {
    pub track: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetNotesParams {
    pub track: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChordInputParam {
    pub beat: f64,
    pub chord: String,
    pub duration: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddChordsParams {
    pub chords: Vec<ChordInputParam>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChordRangeParams {
    pub start_beat: f64,
    pub end_beat: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FlagNotesParams {
    pub tracks: Vec<String>,
    pub start_beat: f64,
    pub end_beat: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportMidiParams {
    pub filepath: String,
}
