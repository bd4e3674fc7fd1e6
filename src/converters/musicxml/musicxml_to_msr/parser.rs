//! XML parsing layer for the skeleton pass
//!
//! Wraps roxmltree: parses the document once, maps element names onto
//! [`ElementKind`] for dispatch, and resolves input line numbers.

use roxmltree::{Document, Node, ParsingOptions};

use super::errors::ParseError;

// ============================================================================
// XML DOCUMENT WRAPPER
// ============================================================================

/// Parsed MusicXML document with a line index over its source
pub struct XmlDocument<'input> {
    doc: Document<'input>,
    line_starts: Vec<usize>,
}

impl<'input> XmlDocument<'input> {
    /// Parse a MusicXML string. The DOCTYPE declaration is accepted as is.
    pub fn parse(xml: &'input str) -> Result<Self, ParseError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options)
            .map_err(|e| ParseError::InvalidXml(format!("XML parse error: {}", e)))?;

        let line_starts = std::iter::once(0)
            .chain(xml.match_indices('\n').map(|(index, _)| index + 1))
            .collect();

        Ok(XmlDocument { doc, line_starts })
    }

    /// Get the root score-partwise element
    pub fn score_partwise<'a>(&'a self) -> Result<Node<'a, 'input>, ParseError> {
        let root = self.doc.root_element();

        if root.tag_name().name() != "score-partwise" {
            return Err(ParseError::UnsupportedFormat(format!(
                "Expected score-partwise, found {}",
                root.tag_name().name()
            )));
        }
        if !root.children().any(|child| child.has_tag_name("part-list")) {
            return Err(ParseError::MissingRequiredElement(
                "part-list in score-partwise".to_string(),
            ));
        }

        Ok(root)
    }

    /// 1-based line of a byte offset in the source
    pub fn line_at(&self, position: usize) -> u32 {
        self.line_starts.partition_point(|&start| start <= position) as u32
    }

    pub fn element<'a>(&self, node: Node<'a, 'input>) -> XmlElement<'a, 'input> {
        let range = node.range();
        XmlElement {
            node,
            start_line: self.line_at(range.start),
            end_line: self.line_at(range.end.saturating_sub(1)),
        }
    }
}

// ============================================================================
// ELEMENT WRAPPER
// ============================================================================

/// An element as seen by the visitor: node, name, attributes, text and lines
#[derive(Clone, Copy)]
pub struct XmlElement<'a, 'input> {
    node: Node<'a, 'input>,
    pub start_line: u32,
    pub end_line: u32,
}

impl<'a, 'input> XmlElement<'a, 'input> {
    pub fn name(&self) -> &'a str {
        self.node.tag_name().name()
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node.attribute(name)
    }

    pub fn int_attribute(&self, name: &str) -> Option<i32> {
        self.attribute(name).and_then(|value| value.trim().parse().ok())
    }

    /// Trimmed text content, empty when absent
    pub fn text(&self) -> &'a str {
        self.node.text().map(str::trim).unwrap_or("")
    }

    pub fn int_text(&self) -> Option<i32> {
        self.text().parse().ok()
    }

    pub fn parent_name(&self) -> Option<&'a str> {
        self.node
            .parent_element()
            .map(|parent| parent.tag_name().name())
    }
}

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// MusicXML elements the skeleton builder reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    ScorePartwise,

    // Header
    Work,
    WorkNumber,
    WorkTitle,
    MovementNumber,
    MovementTitle,
    Identification,
    Creator,
    Rights,
    Software,
    EncodingDate,
    Source,
    Credit,
    CreditType,
    CreditWords,

    // Part list
    PartList,
    PartGroup,
    GroupName,
    GroupNameDisplay,
    DisplayText,
    AccidentalText,
    GroupAbbreviation,
    GroupSymbol,
    GroupBarline,
    ScorePart,
    PartName,
    PartNameDisplay,
    PartAbbreviation,
    PartAbbreviationDisplay,
    InstrumentName,
    InstrumentAbbreviation,

    // Parts and measures
    Part,
    Measure,
    Print,
    Staves,
    Barline,
    Repeat,
    MeasureStyle,
    MeasureRepeat,
    MultipleRest,

    // Notes
    Note,
    Grace,
    Cue,
    Chord,
    Rest,
    Staff,
    Voice,
    TimeModification,
    ActualNotes,
    NormalNotes,
    Tuplet,
    Lyric,

    // Voices outside the notes
    Harmony,
    FiguredBass,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "score-partwise" => ElementKind::ScorePartwise,

            "work" => ElementKind::Work,
            "work-number" => ElementKind::WorkNumber,
            "work-title" => ElementKind::WorkTitle,
            "movement-number" => ElementKind::MovementNumber,
            "movement-title" => ElementKind::MovementTitle,
            "identification" => ElementKind::Identification,
            "creator" => ElementKind::Creator,
            "rights" => ElementKind::Rights,
            "software" => ElementKind::Software,
            "encoding-date" => ElementKind::EncodingDate,
            "source" => ElementKind::Source,
            "credit" => ElementKind::Credit,
            "credit-type" => ElementKind::CreditType,
            "credit-words" => ElementKind::CreditWords,

            "part-list" => ElementKind::PartList,
            "part-group" => ElementKind::PartGroup,
            "group-name" => ElementKind::GroupName,
            "group-name-display" => ElementKind::GroupNameDisplay,
            "display-text" => ElementKind::DisplayText,
            "accidental-text" => ElementKind::AccidentalText,
            "group-abbreviation" => ElementKind::GroupAbbreviation,
            "group-symbol" => ElementKind::GroupSymbol,
            "group-barline" => ElementKind::GroupBarline,
            "score-part" => ElementKind::ScorePart,
            "part-name" => ElementKind::PartName,
            "part-name-display" => ElementKind::PartNameDisplay,
            "part-abbreviation" => ElementKind::PartAbbreviation,
            "part-abbreviation-display" => ElementKind::PartAbbreviationDisplay,
            "instrument-name" => ElementKind::InstrumentName,
            "instrument-abbreviation" => ElementKind::InstrumentAbbreviation,

            "part" => ElementKind::Part,
            "measure" => ElementKind::Measure,
            "print" => ElementKind::Print,
            "staves" => ElementKind::Staves,
            "barline" => ElementKind::Barline,
            "repeat" => ElementKind::Repeat,
            "measure-style" => ElementKind::MeasureStyle,
            "measure-repeat" => ElementKind::MeasureRepeat,
            "multiple-rest" => ElementKind::MultipleRest,

            "note" => ElementKind::Note,
            "grace" => ElementKind::Grace,
            "cue" => ElementKind::Cue,
            "chord" => ElementKind::Chord,
            "rest" => ElementKind::Rest,
            "staff" => ElementKind::Staff,
            "voice" => ElementKind::Voice,
            "time-modification" => ElementKind::TimeModification,
            "actual-notes" => ElementKind::ActualNotes,
            "normal-notes" => ElementKind::NormalNotes,
            "tuplet" => ElementKind::Tuplet,
            "lyric" => ElementKind::Lyric,

            "harmony" => ElementKind::Harmony,
            "figured-bass" => ElementKind::FiguredBass,

            _ => return None,
        };
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
  </part-list>
</score-partwise>"#;

    #[test]
    fn test_parse_accepts_doctype_and_keeps_lines() {
        let doc = XmlDocument::parse(SCORE).unwrap();
        let root = doc.score_partwise().unwrap();
        let part_list = doc.element(root.first_element_child().unwrap());

        assert_eq!(part_list.name(), "part-list");
        assert_eq!(part_list.start_line, 4);
        assert_eq!(part_list.end_line, 6);
    }

    #[test]
    fn test_timewise_is_unsupported() {
        let doc = XmlDocument::parse("<score-timewise/>").unwrap();
        assert!(matches!(
            doc.score_partwise(),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_part_list_is_required() {
        let doc = XmlDocument::parse("<score-partwise><part id=\"P1\"/></score-partwise>").unwrap();
        assert!(matches!(
            doc.score_partwise(),
            Err(ParseError::MissingRequiredElement(_))
        ));
    }

    #[test]
    fn test_element_kind_from_tag() {
        assert_eq!(ElementKind::from_tag("part-group"), Some(ElementKind::PartGroup));
        assert_eq!(ElementKind::from_tag("multiple-rest"), Some(ElementKind::MultipleRest));
        assert_eq!(ElementKind::from_tag("pitch"), None);
    }
}
