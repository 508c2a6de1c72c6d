//! Standard MIDI File emission: a pure function of the document.
//!
//! Grounded on the conductor/part-track split in
//! `musicxml_to_midi::write::write_smf` (absolute-tick events, sorted and
//! converted to deltas at the end of each track), adapted from that
//! module's `Score`/`Part` IR to this crate's `Piece`.

use std::path::{Path, PathBuf};

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use crate::error::DocError;
use crate::expr::beat_to_ticks;
use crate::instrument::{is_percussion, normalize_instrument};
use crate::model::Piece;

pub const TICKS_PER_BEAT: i64 = 480;
const VELOCITY: u8 = 64;
const PERCUSSION_CHANNEL: u8 = 9;
const DEFAULT_TEMPO: u32 = 120;

/// A (tick, numerator, denominator, tempo) marker derived from a section,
/// or the single implicit default when the document has none.
struct MeterPoint {
    tick: i64,
    tempo: u32,
    numerator: u8,
    denominator: u8,
}

fn denominator_power(denominator: u32) -> u8 {
    (denominator as f64).log2().round() as u8
}

/// Convert the document's sections into absolute-tick meter points. Sections
/// are assumed sorted and disjoint; the gap between one section's start
/// and the next is measured in the *earlier* section's own time signature,
/// since that signature is what governs the measures being spanned — using
/// the upcoming section's signature would miscount the gap whenever the
/// signature changes. The gap before the first section (if it doesn't start
/// at measure 1) has no preceding section to borrow a signature from, so it
/// defaults to 4/4.
fn meter_points(piece: &Piece) -> Vec<MeterPoint> {
    if piece.sections.is_empty() {
        return vec![MeterPoint {
            tick: 0,
            tempo: DEFAULT_TEMPO,
            numerator: 4,
            denominator: 4,
        }];
    }

    let mut sections = piece.sections.clone();
    sections.sort_by_key(|s| s.start_measure);

    let mut points = Vec::with_capacity(sections.len());
    let mut tick_cursor: i64 = 0;
    let mut measure_cursor: i64 = 1;
    let mut prev_numerator: u8 = 4;
    let mut prev_denominator: u32 = 4;

    for section in &sections {
        let (num, den) = parse_time_signature(&section.time_signature);
        let prev_beats_per_measure = prev_numerator as f64 * 4.0 / prev_denominator as f64;
        let measures_elapsed = (section.start_measure - measure_cursor).max(0);
        tick_cursor += (measures_elapsed as f64 * prev_beats_per_measure * TICKS_PER_BEAT as f64)
            .round() as i64;
        measure_cursor = section.start_measure;

        points.push(MeterPoint {
            tick: tick_cursor,
            tempo: section.tempo,
            numerator: num,
            denominator: den,
        });
        prev_numerator = num;
        prev_denominator = den;
    }
    points
}

fn parse_time_signature(ts: &str) -> (u8, u32) {
    ts.split_once('/')
        .and_then(|(n, d)| Some((n.parse::<u8>().ok()?, d.parse::<u32>().ok()?)))
        .unwrap_or((4, 4))
}

fn convert_to_delta_times<'a>(events: &mut Vec<(i64, TrackEventKind<'a>)>) -> Track<'a> {
    events.sort_by(|a, b| match a.0.cmp(&b.0) {
        std::cmp::Ordering::Equal => {
            // note_off precedes note_on at equal ticks.
            let a_is_off = matches!(
                a.1,
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                }
            );
            let b_is_off = matches!(
                b.1,
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                }
            );
            b_is_off.cmp(&a_is_off)
        }
        other => other,
    });

    let mut track = Vec::with_capacity(events.len() + 1);
    let mut prev_tick: i64 = 0;
    for (tick, kind) in events.drain(..) {
        let delta = (tick - prev_tick).max(0) as u32;
        track.push(TrackEvent {
            delta: delta.into(),
            kind,
        });
        prev_tick = tick;
    }
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

fn build_conductor_track<'a>(piece: &Piece) -> Track<'a> {
    let mut events = Vec::new();
    for point in meter_points(piece) {
        let microseconds_per_quarter = 60_000_000u32 / point.tempo.max(1);
        events.push((
            point.tick,
            TrackEventKind::Meta(MetaMessage::Tempo(microseconds_per_quarter.into())),
        ));
        events.push((
            point.tick,
            TrackEventKind::Meta(MetaMessage::TimeSignature(
                point.numerator,
                denominator_power(point.denominator),
                24,
                8,
            )),
        ));
    }
    convert_to_delta_times(&mut events)
}

/// Map a declared-track index onto one of the 15 melodic MIDI channels,
/// reserving channel 9 for percussion (every GM-compliant player forces
/// channel 9 to the drum kit regardless of program, so a melodic track
/// landing there would be misheard as drums).
fn melodic_channel(track_index: usize) -> u8 {
    let slot = (track_index % 15) as u8;
    if slot < PERCUSSION_CHANNEL {
        slot
    } else {
        slot + 1
    }
}

fn build_instrument_track<'a>(
    piece: &'a Piece,
    track_index: usize,
) -> Result<Track<'a>, DocError> {
    let track_decl = &piece.tracks[track_index];
    let channel: u8 = if is_percussion(&track_decl.instrument) {
        PERCUSSION_CHANNEL
    } else {
        melodic_channel(track_index)
    };
    let program = normalize_instrument(&track_decl.instrument);

    let mut events = vec![(
        0,
        TrackEventKind::Meta(MetaMessage::TrackName(track_decl.name.as_bytes())),
    )];
    if !is_percussion(&track_decl.instrument) {
        events.push((
            0,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: program.into(),
                },
            },
        ));
    }

    for note in piece.notes.iter().filter(|n| n.track == track_decl.name) {
        let start_beat = note.start.to_time_value().eval()?;
        let duration_beat = note.duration.to_time_value().eval()?;
        let start_tick = beat_to_ticks(start_beat, TICKS_PER_BEAT);
        let end_tick = beat_to_ticks(start_beat + duration_beat, TICKS_PER_BEAT);

        events.push((
            start_tick,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: note.pitch.into(),
                    vel: VELOCITY.into(),
                },
            },
        ));
        events.push((
            end_tick,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: note.pitch.into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    Ok(convert_to_delta_times(&mut events))
}

fn normalize_path(path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.extension().is_some_and(|ext| ext == "mid") {
        candidate.to_path_buf()
    } else {
        PathBuf::from(format!("{path}.mid"))
    }
}

/// Build the conductor track, one instrument track per declared document
/// track, and write a format-1 SMF to `path` (creating the
/// `.mid` extension if missing).
pub fn export_midi(piece: &Piece, path: &str) -> Result<String, DocError> {
    let mut tracks = Vec::with_capacity(piece.tracks.len() + 1);
    tracks.push(build_conductor_track(piece));
    for index in 0..piece.tracks.len() {
        tracks.push(build_instrument_track(piece, index)?);
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical((TICKS_PER_BEAT as u16).into()),
        },
        tracks,
    };

    let out_path = normalize_path(path);
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| DocError::IOError {
            message: format!("failed to encode MIDI: {e}"),
        })?;
    std::fs::write(&out_path, buf).map_err(|e| DocError::IOError {
        message: format!("failed to write '{}': {e}", out_path.display()),
    })?;

    Ok(out_path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Note, TimingField};

    #[test]
    fn path_without_extension_gets_mid_appended() {
        assert_eq!(normalize_path("song").to_str().unwrap(), "song.mid");
        assert_eq!(normalize_path("song.mid").to_str().unwrap(), "song.mid");
    }

    #[test]
    fn expression_timing_note_produces_expected_ticks() {
        let mut piece = Piece::new();
        piece.add_track_unchecked("p".to_string(), "piano".to_string());
        piece.notes.push(Note {
            track: "p".to_string(),
            pitch: 60,
            start: TimingField::Expr("9 + 1/3".to_string()),
            duration: TimingField::Expr("1/3".to_string()),
            flagged: None,
        });

        let track = build_instrument_track(&piece, 0).unwrap();
        let mut tick = 0i64;
        let mut note_on_tick = None;
        let mut note_off_tick = None;
        for event in &track {
            tick += event.delta.as_int() as i64;
            match event.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { .. },
                    ..
                } => note_on_tick = Some(tick),
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                } => note_off_tick = Some(tick),
                _ => {}
            }
        }
        assert_eq!(note_on_tick, Some(4480));
        assert_eq!(note_off_tick, Some(4640));
    }

    #[test]
    fn meter_points_accumulate_each_section_in_its_own_time_signature() {
        use crate::model::Section;

        let mut piece = Piece::new();
        piece.sections.push(Section {
            name: "A".to_string(),
            start_measure: 1,
            end_measure: 4,
            tempo: 120,
            time_signature: "3/4".to_string(),
            key: "C".to_string(),
            description: String::new(),
        });
        piece.sections.push(Section {
            name: "B".to_string(),
            start_measure: 5,
            end_measure: 8,
            tempo: 120,
            time_signature: "4/4".to_string(),
            key: "C".to_string(),
            description: String::new(),
        });

        let points = meter_points(&piece);
        assert_eq!(points[0].tick, 0);
        // 4 measures of A at 3 beats/measure, not B's 4 beats/measure.
        assert_eq!(points[1].tick, 4 * 3 * TICKS_PER_BEAT);
    }

    #[test]
    fn tenth_melodic_track_does_not_land_on_the_percussion_channel() {
        let mut piece = Piece::new();
        for i in 0..10 {
            piece.add_track_unchecked(format!("t{i}"), "piano".to_string());
        }
        let track = build_instrument_track(&piece, 9).unwrap();
        let found_channel_nine = track.iter().any(|event| {
            matches!(
                event.kind,
                TrackEventKind::Midi { channel, .. } if channel.as_int() == PERCUSSION_CHANNEL
            )
        });
        assert!(!found_channel_nine);
    }

    #[test]
    fn empty_sections_default_to_120_bpm_four_four() {
        let piece = Piece::new();
        let points = meter_points(&piece);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].tempo, 120);
        assert_eq!(points[0].numerator, 4);
        assert_eq!(points[0].denominator, 4);
    }

    #[test]
    fn percussion_track_routes_to_channel_nine() {
        let mut piece = Piece::new();
        piece.add_track_unchecked("d".to_string(), "drums".to_string());
        piece.notes.push(Note {
            track: "d".to_string(),
            pitch: 36,
            start: TimingField::Number(0.0),
            duration: TimingField::Number(1.0),
            flagged: None,
        });
        let track = build_instrument_track(&piece, 0).unwrap();
        let found_channel_nine = track.iter().any(|event| {
            matches!(
                event.kind,
                TrackEventKind::Midi { channel, .. } if channel.as_int() == PERCUSSION_CHANNEL as u8
            )
        });
        assert!(found_channel_nine);
    }

    #[test]
    fn note_off_precedes_note_on_at_equal_ticks() {
        let mut piece = Piece::new();
        piece.add_track_unchecked("p".to_string(), "piano".to_string());
        piece.notes.push(Note {
            track: "p".to_string(),
            pitch: 60,
            start: TimingField::Number(0.0),
            duration: TimingField::Number(1.0),
            flagged: None,
        });
        piece.notes.push(Note {
            track: "p".to_string(),
            pitch: 64,
            start: TimingField::Number(1.0),
            duration: TimingField::Number(1.0),
            flagged: None,
        });
        let track = build_instrument_track(&piece, 0).unwrap();
        let mut tick = 0i64;
        let mut order_at_tick_480 = Vec::new();
        for event in &track {
            tick += event.delta.as_int() as i64;
            if tick == 480 {
                order_at_tick_480.push(event.kind.clone());
            }
        }
        assert!(matches!(
            order_at_tick_480[0],
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { .. },
                ..
            }
        ));
    }
}
