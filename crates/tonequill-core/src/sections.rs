//! Section engine: insertion and the neighbor-adjustment algorithm that
//! keeps sections sorted and disjoint without silently dropping data.

use crate::error::DocError;
use crate::model::{Piece, Section};

/// Parsed, unvalidated fields for `add_section`/`edit_section`.
pub struct SectionFields {
    pub start_measure: i64,
    pub end_measure: i64,
    pub tempo: u32,
    pub time_signature: String,
    pub key: String,
    pub description: String,
}

fn valid_time_signature(ts: &str) -> bool {
    match ts.split_once('/') {
        Some((n, d)) => {
            let Ok(n) = n.parse::<u32>() else {
                return false;
            };
            let Ok(d) = d.parse::<u32>() else {
                return false;
            };
            n > 0 && matches!(d, 1 | 2 | 4 | 8 | 16)
        }
        None => false,
    }
}

fn validate_fields(fields: &SectionFields) -> Result<(), DocError> {
    if fields.end_measure < fields.start_measure || fields.start_measure < 1 {
        return Err(DocError::InvalidRange {
            start: fields.start_measure,
            end: fields.end_measure,
        });
    }
    if !(1..=300).contains(&fields.tempo) {
        return Err(DocError::SchemaViolation {
            message: format!("tempo {} out of range 1..=300", fields.tempo),
        });
    }
    if !valid_time_signature(&fields.time_signature) {
        return Err(DocError::SchemaViolation {
            message: format!("invalid time signature '{}'", fields.time_signature),
        });
    }
    Ok(())
}

fn resort(piece: &mut Piece) {
    piece.sections.sort_by_key(|s| s.start_measure);
}

/// Insert a new section, rejecting a duplicate name or a measure range that
/// overlaps an existing section.
pub fn add_section(
    piece: &mut Piece,
    name: String,
    fields: SectionFields,
) -> Result<(), DocError> {
    if piece.find_section(&name).is_some() {
        return Err(DocError::DuplicateName { name });
    }
    validate_fields(&fields)?;
    for other in &piece.sections {
        if ranges_intersect(
            fields.start_measure,
            fields.end_measure,
            other.start_measure,
            other.end_measure,
        ) {
            return Err(DocError::SectionOverlap {
                name,
                other: other.name.clone(),
            });
        }
    }
    piece.sections.push(Section {
        name,
        start_measure: fields.start_measure,
        end_measure: fields.end_measure,
        tempo: fields.tempo,
        time_signature: fields.time_signature,
        key: fields.key,
        description: fields.description,
    });
    resort(piece);
    Ok(())
}

fn ranges_intersect(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Partial update for `edit_section`; `None` fields keep their current value.
#[derive(Default)]
pub struct SectionPatch {
    pub start_measure: Option<i64>,
    pub end_measure: Option<i64>,
    pub tempo: Option<u32>,
    pub time_signature: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
}

/// Edit a section's fields, shrinking neighbors that the edit would
/// otherwise overlap and refusing an edit that would fully swallow one.
pub fn edit_section(
    piece: &mut Piece,
    name: &str,
    patch: SectionPatch,
) -> Result<(), DocError> {
    let current = piece
        .find_section(name)
        .cloned()
        .ok_or_else(|| DocError::NotFound {
            name: name.to_string(),
        })?;

    let new_start = patch.start_measure.unwrap_or(current.start_measure);
    let new_end = patch.end_measure.unwrap_or(current.end_measure);
    let new_tempo = patch.tempo.unwrap_or(current.tempo);
    let new_ts = patch
        .time_signature
        .clone()
        .unwrap_or_else(|| current.time_signature.clone());

    let candidate = SectionFields {
        start_measure: new_start,
        end_measure: new_end,
        tempo: new_tempo,
        time_signature: new_ts.clone(),
        key: patch.key.clone().unwrap_or_else(|| current.key.clone()),
        description: patch
            .description
            .clone()
            .unwrap_or_else(|| current.description.clone()),
    };
    validate_fields(&candidate)?;

    // Neighbor adjustment happens only against *other* sections.
    let mut adjusted: Vec<Section> = Vec::with_capacity(piece.sections.len());
    for section in &piece.sections {
        if section.name == name {
            continue;
        }
        if section.start_measure >= new_start && section.end_measure <= new_end {
            return Err(DocError::SectionWouldSwallow {
                name: name.to_string(),
                other: section.name.clone(),
            });
        }
        let mut s = section.clone();
        let overlaps_low = s.end_measure >= new_start && s.start_measure < new_start;
        let overlaps_high = s.start_measure <= new_end && s.end_measure > new_end;
        if overlaps_low {
            s.end_measure = new_start - 1;
            if s.end_measure < s.start_measure {
                return Err(DocError::SectionWouldSwallow {
                    name: name.to_string(),
                    other: section.name.clone(),
                });
            }
        }
        if overlaps_high {
            s.start_measure = new_end + 1;
            if s.end_measure < s.start_measure {
                return Err(DocError::SectionWouldSwallow {
                    name: name.to_string(),
                    other: section.name.clone(),
                });
            }
        }
        adjusted.push(s);
    }

    adjusted.push(Section {
        name: name.to_string(),
        start_measure: new_start,
        end_measure: new_end,
        tempo: new_tempo,
        time_signature: new_ts,
        key: candidate.key,
        description: candidate.description,
    });
    adjusted.sort_by_key(|s| s.start_measure);

    for pair in adjusted.windows(2) {
        if ranges_intersect(
            pair[0].start_measure,
            pair[0].end_measure,
            pair[1].start_measure,
            pair[1].end_measure,
        ) {
            return Err(DocError::SectionWouldSwallow {
                name: name.to_string(),
                other: pair[1].name.clone(),
            });
        }
    }

    piece.sections = adjusted;
    Ok(())
}

/// Explicit deletion path; never triggers neighbor adjustment.
pub fn remove_section(piece: &mut Piece, name: &str) -> Result<(), DocError> {
    let before = piece.sections.len();
    piece.sections.retain(|s| s.name != name);
    if piece.sections.len() == before {
        return Err(DocError::NotFound {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Sections sorted by `start_measure` (the stored order already guarantees
/// this, but re-sorting here keeps the contract obvious at the call site).
pub fn get_sections(piece: &Piece) -> Vec<Section> {
    let mut sections = piece.sections.clone();
    sections.sort_by_key(|s| s.start_measure);
    sections
}
