//! Public types for the MusicXML to MSR skeleton pass
//!
//! - Settings threaded into the builder (SkeletonSettings)
//! - The pass output (SkeletonResult)
//! - Recoverable diagnostics (ConversionWarning, WarningKind)

use serde::{Deserialize, Serialize};

use crate::msr::MsrScore;
use crate::mxsr::MxsrEventsCollection;

use super::errors::ConversionError;

// ============================================================================
// SETTINGS
// ============================================================================

/// Configuration options for the skeleton pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonSettings {
    /// Name of the input used in diagnostics ("-" for standard input)
    pub input_source_name: String,

    /// Skip creating harmonies voices for `<harmony>` elements
    pub ignore_harmonies: bool,

    /// Skip creating figured bass voices for `<figured-bass>` elements
    pub ignore_figured_bass: bool,

    /// Treat parts with differing measure counts as a fatal error
    pub strict_measure_counts: bool,

    /// Log part-group resolution steps at debug level
    pub trace_part_groups: bool,

    /// Log each event registration at trace level
    pub trace_events: bool,
}

impl Default for SkeletonSettings {
    fn default() -> Self {
        Self {
            input_source_name: "-".to_string(),
            ignore_harmonies: false,
            ignore_figured_bass: false,
            strict_measure_counts: true,
            trace_part_groups: false,
            trace_events: false,
        }
    }
}

impl SkeletonSettings {
    /// Load settings from a JSON document, missing fields taking their defaults
    pub fn from_json(source: &str) -> Result<Self, ConversionError> {
        serde_json::from_str(source)
            .map_err(|e| ConversionError::InternalError(format!("invalid JSON settings: {}", e)))
    }

    /// Load settings from a YAML document, missing fields taking their defaults
    pub fn from_yaml(source: &str) -> Result<Self, ConversionError> {
        serde_yaml::from_str(source)
            .map_err(|e| ConversionError::InternalError(format!("invalid YAML settings: {}", e)))
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Classes of recoverable conditions met during the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// `<part-group type="stop">` with no open group of that number
    UnmatchedPartGroupStop,

    /// Part-group still open at `</part-list>`
    UnstoppedPartGroup,

    /// Part-groups that overlap instead of nesting
    OverlappingPartGroups,

    /// Tuplet stop matching no pending tuplet start
    UnmatchedTupletStop,

    /// Tuplet started again while still pending
    RestartedTuplet,

    /// Tuplet still pending at the end of its part
    UnterminatedTuplet,

    /// `<chord/>` on the first note of a voice
    ChordWithoutFirstNote,

    /// Part id made of digits only
    PureNumberPartId,

    /// `<part>` without an id
    EmptyPartId,

    /// Parts with differing measure counts
    MeasureCountMismatch,

    /// `<multiple-rest>` still running at the end of its part
    UnterminatedMultipleMeasureRest,
}

/// A recoverable condition, logged and collected instead of aborting the pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    pub kind: WarningKind,

    /// Input line the condition was detected on
    pub line: u32,

    pub message: String,
}

// ============================================================================
// RESULT
// ============================================================================

/// Output of the skeleton pass, handed to the content-population pass
#[derive(Debug, Clone, Serialize)]
pub struct SkeletonResult {
    /// Score with its part-group, part, staff and voice containers
    pub score: MsrScore,

    /// Events collected during the pass, already sorted
    pub events: MxsrEventsCollection,

    /// Recoverable conditions met during the pass
    pub warnings: Vec<ConversionWarning>,
}

impl SkeletonResult {
    /// Warnings of one kind
    pub fn warnings_of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &ConversionWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// JSON dump of the whole result, for inspection by downstream tools
    pub fn to_json(&self) -> Result<String, ConversionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConversionError::InternalError(format!("cannot serialize result: {}", e)))
    }
}
