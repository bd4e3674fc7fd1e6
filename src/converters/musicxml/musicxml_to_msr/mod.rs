//! MusicXML to MSR skeleton converter module
//!
//! First pass of the MusicXML to MSR conversion: builds the container
//! hierarchy of the score and records the note events a second,
//! content-populating pass needs.
//!
//! # Overview
//!
//! The pass is a single forward walk over the document:
//! 1. **Parse**: Parse MusicXML using roxmltree, with a line index for diagnostics
//! 2. **Browse**: Dispatch each element to the skeleton builder, in document order
//! 3. **Resolve**: Nest part-groups at `</part-list>`, close spans at `</measure>`
//!    and `</note>`
//!
//! # Output
//!
//! - An [`MsrScore`](crate::msr::MsrScore) with part-groups, parts, staves and
//!   voices but no musical content
//! - An [`MxsrEventsCollection`](crate::mxsr::MxsrEventsCollection) of staff
//!   changes, grace, cue, chord and tuplet spans, measure repeats and multiple
//!   measure rests
//! - The warnings collected along the way
//!
//! # Basic Usage
//!
//! ```ignore
//! use mxsr_skeleton::converters::musicxml::musicxml_to_msr::build_msr_skeleton;
//!
//! let result = build_msr_skeleton(musicxml, None)?;
//! let implicit = result.score.implicit_part_group_id();
//! println!("{:?}", result.score.part_ids_in_group(implicit));
//! ```

pub mod errors;
pub mod note_cursor;
pub mod parser;
pub mod part_groups;
pub mod skeleton_builder;
pub mod tuplets;
pub mod types;
pub mod voice_tracker;
pub mod wae;

use std::path::Path;

// Re-export main API
pub use errors::{ConversionError, ParseError};
pub use skeleton_builder::SkeletonBuilder;
pub use types::{ConversionWarning, SkeletonResult, SkeletonSettings, WarningKind};

/// Build the MSR skeleton and the events collection of a MusicXML document.
///
/// # Arguments
///
/// * `musicxml` - partwise MusicXML document as string
/// * `settings` - Optional settings (uses defaults if None)
///
/// # Returns
///
/// * `Ok(SkeletonResult)` - Skeleton, sorted events and warnings
/// * `Err(ConversionError)` - Fatal error, no partial skeleton is returned
pub fn build_msr_skeleton(
    musicxml: &str,
    settings: Option<SkeletonSettings>,
) -> Result<SkeletonResult, ConversionError> {
    use parser::XmlDocument;

    let settings = settings.unwrap_or_default();
    let doc = XmlDocument::parse(musicxml)?;

    SkeletonBuilder::new(settings).build(&doc)
}

/// Read a MusicXML file and build its MSR skeleton.
///
/// The input source name defaults to the file path when the settings leave it
/// at "-".
pub fn build_msr_skeleton_from_file(
    path: impl AsRef<Path>,
    settings: Option<SkeletonSettings>,
) -> Result<SkeletonResult, ConversionError> {
    let path = path.as_ref();
    let musicxml = std::fs::read_to_string(path).map_err(|e| ConversionError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut settings = settings.unwrap_or_default();
    if settings.input_source_name == "-" {
        settings.input_source_name = path.display().to_string();
    }
    build_msr_skeleton(&musicxml, Some(settings))
}
