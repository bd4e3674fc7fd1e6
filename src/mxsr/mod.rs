//! MXSR events
//!
//! Facts about notes and measures discovered while streaming a MusicXML
//! document, recorded for the content-population pass instead of being acted
//! upon immediately:
//!
//! - staff change take-offs and landings
//! - grace, cue and chord spans
//! - tuplet spans (nestable)
//! - measure repeats and multiple measure rests
//!
//! [`MxsrEventsCollection`] is written once during the skeleton pass and then
//! only queried, by note sequential number or by measure.

pub mod events;
pub mod events_collection;

pub use events::{
    BoundaryKind, ChordEvent, CueEvent, GraceEvent, MeasureRepeatEvent, MultipleMeasureRestEvent,
    MxsrEvent, NoteEventBase, NotePosition, StaffChangeEvent, StaffChangeKind, TupletEvent,
};
pub use events_collection::MxsrEventsCollection;
