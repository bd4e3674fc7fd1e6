//! Event types
//!
//! Every event carries its event sequential number. Note events also carry the
//! sequential number of the note they are keyed to, with its staff, voice and
//! input lines.

use std::fmt;

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

// ============================================================================
// KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffChangeKind {
    TakeOff,
    Landing,
}

/// Which end of a span an event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryKind {
    Begin,
    End,
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryKind::Begin => write!(f, "begin"),
            BoundaryKind::End => write!(f, "end"),
        }
    }
}

// ============================================================================
// NOTE EVENTS
// ============================================================================

/// The note an event is keyed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePosition {
    pub note_sequential_number: u32,
    pub staff_number: i32,
    pub voice_number: i32,
    pub input_start_line: u32,
    pub input_end_line: u32,
}

/// Fields shared by all note events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEventBase {
    pub event_sequential_number: u32,
    pub note_sequential_number: u32,
    pub staff_number: i32,
    pub voice_number: i32,
    pub input_start_line: u32,
    pub input_end_line: u32,
}

impl NoteEventBase {
    pub fn new(event_sequential_number: u32, note: NotePosition) -> Self {
        Self {
            event_sequential_number,
            note_sequential_number: note.note_sequential_number,
            staff_number: note.staff_number,
            voice_number: note.voice_number,
            input_start_line: note.input_start_line,
            input_end_line: note.input_end_line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffChangeEvent {
    pub base: NoteEventBase,
    pub kind: StaffChangeKind,
    pub take_off_staff_number: i32,
    pub landing_staff_number: i32,
    pub take_off_input_line: u32,
    pub landing_input_line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraceEvent {
    pub base: NoteEventBase,
    pub kind: BoundaryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueEvent {
    pub base: NoteEventBase,
    pub kind: BoundaryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub base: NoteEventBase,
    pub kind: BoundaryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupletEvent {
    pub base: NoteEventBase,
    pub kind: BoundaryKind,
    pub tuplet_number: i32,

    /// actual-notes / normal-notes from the note's `<time-modification>`
    pub tuplet_factor: Option<Rational32>,
}

// ============================================================================
// MEASURE EVENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRepeatEvent {
    pub event_sequential_number: u32,
    pub kind: BoundaryKind,
    pub part_id: String,
    pub measure_number: String,

    /// Number of measures repeated
    pub measure_repeat_number: u32,
    pub slashes_number: u32,

    pub input_start_line: u32,
    pub input_end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleMeasureRestEvent {
    pub event_sequential_number: u32,
    pub kind: BoundaryKind,
    pub part_id: String,
    pub measure_number: String,

    /// Number of measures the rest spans
    pub multiple_measure_rest_number: u32,

    pub input_start_line: u32,
    pub input_end_line: u32,
}

// ============================================================================
// EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MxsrEvent {
    StaffChange(StaffChangeEvent),
    Grace(GraceEvent),
    Cue(CueEvent),
    Chord(ChordEvent),
    Tuplet(TupletEvent),
    MeasureRepeat(MeasureRepeatEvent),
    MultipleMeasureRest(MultipleMeasureRestEvent),
}

impl MxsrEvent {
    fn note_base(&self) -> Option<&NoteEventBase> {
        match self {
            MxsrEvent::StaffChange(event) => Some(&event.base),
            MxsrEvent::Grace(event) => Some(&event.base),
            MxsrEvent::Cue(event) => Some(&event.base),
            MxsrEvent::Chord(event) => Some(&event.base),
            MxsrEvent::Tuplet(event) => Some(&event.base),
            MxsrEvent::MeasureRepeat(_) | MxsrEvent::MultipleMeasureRest(_) => None,
        }
    }

    pub fn event_sequential_number(&self) -> u32 {
        match self {
            MxsrEvent::MeasureRepeat(event) => event.event_sequential_number,
            MxsrEvent::MultipleMeasureRest(event) => event.event_sequential_number,
            _ => self.note_base().map_or(0, |base| base.event_sequential_number),
        }
    }

    /// `None` for measure events
    pub fn note_sequential_number(&self) -> Option<u32> {
        self.note_base().map(|base| base.note_sequential_number)
    }

    pub fn input_start_line(&self) -> u32 {
        match self {
            MxsrEvent::MeasureRepeat(event) => event.input_start_line,
            MxsrEvent::MultipleMeasureRest(event) => event.input_start_line,
            _ => self.note_base().map_or(0, |base| base.input_start_line),
        }
    }

    pub fn input_end_line(&self) -> u32 {
        match self {
            MxsrEvent::MeasureRepeat(event) => event.input_end_line,
            MxsrEvent::MultipleMeasureRest(event) => event.input_end_line,
            _ => self.note_base().map_or(0, |base| base.input_end_line),
        }
    }
}

impl fmt::Display for MxsrEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxsrEvent::StaffChange(event) => write!(
                f,
                "[{}] staff change {:?} note {} voice {}: staff {} -> {}, lines {} -> {}",
                event.base.event_sequential_number,
                event.kind,
                event.base.note_sequential_number,
                event.base.voice_number,
                event.take_off_staff_number,
                event.landing_staff_number,
                event.take_off_input_line,
                event.landing_input_line
            ),
            MxsrEvent::Grace(event) => write!(
                f,
                "[{}] grace {} note {} voice {}",
                event.base.event_sequential_number,
                event.kind,
                event.base.note_sequential_number,
                event.base.voice_number
            ),
            MxsrEvent::Cue(event) => write!(
                f,
                "[{}] cue {} note {} voice {}",
                event.base.event_sequential_number,
                event.kind,
                event.base.note_sequential_number,
                event.base.voice_number
            ),
            MxsrEvent::Chord(event) => write!(
                f,
                "[{}] chord {} note {} voice {}",
                event.base.event_sequential_number,
                event.kind,
                event.base.note_sequential_number,
                event.base.voice_number
            ),
            MxsrEvent::Tuplet(event) => write!(
                f,
                "[{}] tuplet {} number {} note {} voice {}",
                event.base.event_sequential_number,
                event.kind,
                event.tuplet_number,
                event.base.note_sequential_number,
                event.base.voice_number
            ),
            MxsrEvent::MeasureRepeat(event) => write!(
                f,
                "[{}] measure repeat {} part \"{}\" measure {}",
                event.event_sequential_number, event.kind, event.part_id, event.measure_number
            ),
            MxsrEvent::MultipleMeasureRest(event) => write!(
                f,
                "[{}] multiple measure rest {} part \"{}\" measure {}",
                event.event_sequential_number, event.kind, event.part_id, event.measure_number
            ),
        }
    }
}
