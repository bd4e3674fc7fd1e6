//! MusicXML format converters
//!
//! This module contains converters for MusicXML format.

pub mod musicxml_to_msr;

// Re-export for convenience
pub use musicxml_to_msr::{
    build_msr_skeleton,
    build_msr_skeleton_from_file,
    ConversionError,
    ConversionWarning,
    ParseError,
    SkeletonResult,
    SkeletonSettings,
    WarningKind,
};
