//! MSR part-groups
//!
//! A part-group brackets a contiguous run of parts and nested part-groups.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::parts::PartId;

/// Index of a part-group in [`MsrScore::part_groups`](super::MsrScore)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartGroupId(pub usize);

/// Engraving symbol drawn to the left of a part-group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartGroupSymbol {
    #[default]
    None,
    Brace,
    Bracket,
    Line,
    Square,
}

impl PartGroupSymbol {
    /// Parse a MusicXML `<group-symbol>` value
    pub fn from_musicxml(value: &str) -> Option<Self> {
        match value {
            "none" => Some(PartGroupSymbol::None),
            "brace" => Some(PartGroupSymbol::Brace),
            "bracket" => Some(PartGroupSymbol::Bracket),
            "line" => Some(PartGroupSymbol::Line),
            "square" => Some(PartGroupSymbol::Square),
            _ => None,
        }
    }
}

/// Whether barlines run through the staves of a part-group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartGroupBarline {
    Yes,
    #[default]
    No,
}

impl PartGroupBarline {
    /// Parse a MusicXML `<group-barline>` value
    pub fn from_musicxml(value: &str) -> Option<Self> {
        match value {
            "yes" | "Mensurstrich" => Some(PartGroupBarline::Yes),
            "no" => Some(PartGroupBarline::No),
            _ => None,
        }
    }
}

/// An element of a part-group, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartGroupElement {
    PartGroup(PartGroupId),
    Part(PartId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrPartGroup {
    /// MusicXML `number` attribute, reusable once the group is stopped
    pub number: i32,

    /// Unique ordinal assigned when the group starts, 0 for the implicit group
    pub identity: i32,

    pub implicit: bool,

    pub name: Option<String>,
    pub name_display_text: Option<String>,
    pub accidental_text: Option<String>,
    pub abbreviation: Option<String>,
    pub symbol: PartGroupSymbol,
    pub symbol_default_x: Option<i32>,
    pub barline: PartGroupBarline,

    pub upper_part_group: Option<PartGroupId>,
    pub elements: Vec<PartGroupElement>,

    pub input_start_line: u32,
    pub input_stop_line: Option<u32>,
}

impl MsrPartGroup {
    pub fn new(number: i32, identity: i32, input_start_line: u32) -> Self {
        Self {
            number,
            identity,
            implicit: false,
            name: None,
            name_display_text: None,
            accidental_text: None,
            abbreviation: None,
            symbol: PartGroupSymbol::None,
            symbol_default_x: None,
            barline: PartGroupBarline::No,
            upper_part_group: None,
            elements: Vec::new(),
            input_start_line,
            input_stop_line: None,
        }
    }

    /// The synthetic outermost part-group containing the whole score
    pub fn implicit_outermost() -> Self {
        let mut part_group = Self::new(0, 0, 0);
        part_group.implicit = true;
        part_group.name = Some("Implicit".to_string());
        part_group
    }
}

impl fmt::Display for MsrPartGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.implicit {
            write!(f, "implicit part-group")
        } else {
            write!(
                f,
                "part-group number {} (identity {}, line {})",
                self.number, self.identity, self.input_start_line
            )
        }
    }
}
