//! MusicXML to MSR skeleton builder
//!
//! First pass of a MusicXML to MSR (Music Score Representation) conversion:
//! resolves part-group nesting, creates the score's part-group, part, staff and
//! voice containers, and records the note events (staff changes, grace, cue,
//! chord and tuplet spans) the content-populating pass relies on.

pub mod converters;
pub mod msr;
pub mod mxsr;

// Re-export commonly used types
pub use converters::musicxml::{
    build_msr_skeleton,
    build_msr_skeleton_from_file,
    ConversionError,
    ConversionWarning,
    ParseError,
    SkeletonResult,
    SkeletonSettings,
    WarningKind,
};
pub use msr::MsrScore;
pub use mxsr::MxsrEventsCollection;
