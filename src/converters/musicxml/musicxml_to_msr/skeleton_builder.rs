//! Skeleton builder: the single forward pass over a MusicXML document
//!
//! Creates the score, part-group, part, staff and voice containers and fills
//! the events collection. Resolution that cannot happen eagerly is deferred to
//! three checkpoints:
//! - `</part-list>`: part-group nesting ([`PartGroupsResolver`])
//! - `</measure>`: chords, grace and cue runs still open in each voice
//! - `</note>`: staff changes, span boundaries and tuplets ([`PartVoiceTracker`])

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use num_rational::Rational32;
use regex::Regex;
use roxmltree::Node;

use crate::msr::{
    MsrCredit, MsrPart, MsrPartGroup, MsrScore, PartGroupBarline, PartGroupId, PartGroupSymbol,
    PartId,
};
use crate::mxsr::MxsrEventsCollection;

use super::errors::ConversionError;
use super::note_cursor::NoteSnapshot;
use super::parser::{ElementKind, XmlDocument, XmlElement};
use super::part_groups::PartGroupsResolver;
use super::types::{SkeletonResult, SkeletonSettings, WarningKind};
use super::voice_tracker::{PartVoiceTracker, TupletMarker, TupletMarkerKind};
use super::wae::WaeHandler;

lazy_static! {
    static ref PURE_NUMBER_PART_ID: Regex =
        Regex::new(r"^[[:digit:]]+$").expect("part id pattern is valid");
}

type Result<T> = std::result::Result<T, ConversionError>;

/// Staff of a note without `<staff>`
const DEFAULT_STAFF_NUMBER: i32 = 1;

/// Voice of a note without `<voice>`
const DEFAULT_VOICE_NUMBER: i32 = 1;

// ============================================================================
// NOTE STATE
// ============================================================================

/// What is gathered between `<note>` and `</note>`
#[derive(Debug, Clone)]
struct CurrentNote {
    sequential_number: u32,
    input_start_line: u32,
    input_end_line: u32,
    staff_number: i32,
    voice_number: i32,
    is_grace: bool,
    is_cue: bool,
    is_chord_member: bool,
    is_rest: bool,
    actual_notes: Option<i32>,
    normal_notes: Option<i32>,
    tuplet_markers: Vec<TupletMarker>,
    stanza_numbers: Vec<String>,
}

impl CurrentNote {
    fn new(sequential_number: u32, input_start_line: u32, input_end_line: u32) -> Self {
        Self {
            sequential_number,
            input_start_line,
            input_end_line,
            staff_number: DEFAULT_STAFF_NUMBER,
            voice_number: DEFAULT_VOICE_NUMBER,
            is_grace: false,
            is_cue: false,
            is_chord_member: false,
            is_rest: false,
            actual_notes: None,
            normal_notes: None,
            tuplet_markers: Vec::new(),
            stanza_numbers: Vec::new(),
        }
    }

    fn snapshot(&self) -> NoteSnapshot {
        NoteSnapshot {
            sequential_number: self.sequential_number,
            input_start_line: self.input_start_line,
            input_end_line: self.input_end_line,
            staff_number: self.staff_number,
            voice_number: self.voice_number,
            is_grace: self.is_grace,
            is_cue: self.is_cue,
            is_chord_member: self.is_chord_member,
            is_rest: self.is_rest,
        }
    }

    fn tuplet_factor(&self) -> Option<Rational32> {
        match (self.actual_notes, self.normal_notes) {
            (Some(actual), Some(normal)) if actual > 0 && normal > 0 => {
                Some(Rational32::new(actual, normal))
            }
            _ => None,
        }
    }
}

/// A `<multiple-rest>` still counting down its measures
#[derive(Debug, Clone, Copy)]
struct PendingMultipleMeasureRest {
    measures_number: u32,
    remaining_measures: u32,
}

/// Which `<display-text>`/`<accidental-text>` owner is being visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayContext {
    None,
    GroupName,
    PartName,
    PartAbbreviation,
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct SkeletonBuilder {
    settings: SkeletonSettings,
    wae: WaeHandler,
    score: MsrScore,
    events: MxsrEventsCollection,

    // Part list
    part_groups: PartGroupsResolver,
    current_part_group: Option<PartGroupId>,
    current_score_part: Option<PartId>,
    display_context: DisplayContext,

    // Header
    current_credit: Option<MsrCredit>,

    // Parts and measures
    current_part: Option<PartId>,
    current_part_voices: BTreeMap<i32, PartVoiceTracker>,
    current_measure_number: String,
    on_going_print: bool,
    pending_multiple_measure_rest: Option<PendingMultipleMeasureRest>,
    first_repeat_seen: bool,

    // Notes
    note_sequential_number: u32,
    current_note: Option<CurrentNote>,
}

impl SkeletonBuilder {
    pub fn new(settings: SkeletonSettings) -> Self {
        let score = MsrScore::new();
        let part_groups =
            PartGroupsResolver::new(score.implicit_part_group_id(), settings.trace_part_groups);
        let events = MxsrEventsCollection::new().with_tracing(settings.trace_events);
        let wae = WaeHandler::new(settings.input_source_name.clone());

        Self {
            settings,
            wae,
            score,
            events,
            part_groups,
            current_part_group: None,
            current_score_part: None,
            display_context: DisplayContext::None,
            current_credit: None,
            current_part: None,
            current_part_voices: BTreeMap::new(),
            current_measure_number: String::new(),
            on_going_print: false,
            pending_multiple_measure_rest: None,
            first_repeat_seen: false,
            note_sequential_number: 0,
            current_note: None,
        }
    }

    /// Build the skeleton from the `<score-partwise>` root of `doc`
    pub fn build(mut self, doc: &XmlDocument<'_>) -> Result<SkeletonResult> {
        let root = doc.score_partwise()?;
        self.browse(doc, root)?;

        Ok(SkeletonResult {
            score: self.score,
            events: self.events,
            warnings: self.wae.into_warnings(),
        })
    }

    fn browse<'a, 'input>(
        &mut self,
        doc: &XmlDocument<'input>,
        node: Node<'a, 'input>,
    ) -> Result<()> {
        let element = doc.element(node);
        let kind = ElementKind::from_tag(element.name());

        if let Some(kind) = kind {
            self.visit_start(kind, &element)?;
        }
        for child in node.children().filter(|child| child.is_element()) {
            self.browse(doc, child)?;
        }
        if let Some(kind) = kind {
            self.visit_end(kind, &element)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn visit_start(&mut self, kind: ElementKind, element: &XmlElement<'_, '_>) -> Result<()> {
        match kind {
            ElementKind::ScorePartwise => {
                log::debug!(
                    "Building MSR skeleton from {}",
                    self.settings.input_source_name
                );
            }

            ElementKind::Work | ElementKind::Identification | ElementKind::PartList => {}
            ElementKind::WorkNumber => {
                self.score.identification.work_number = Some(element.text().to_string());
            }
            ElementKind::WorkTitle => {
                self.score.identification.work_title = Some(element.text().to_string());
            }
            ElementKind::MovementNumber => {
                self.score.identification.movement_number = Some(element.text().to_string());
            }
            ElementKind::MovementTitle => {
                self.score.identification.movement_title = Some(element.text().to_string());
            }
            ElementKind::Creator => {
                let creator_type = element.attribute("type").unwrap_or("composer");
                self.score
                    .identification
                    .add_creator(creator_type, element.text());
            }
            ElementKind::Rights => {
                self.score
                    .identification
                    .rights
                    .push(element.text().to_string());
            }
            ElementKind::Software => {
                self.score
                    .identification
                    .softwares
                    .push(element.text().to_string());
            }
            ElementKind::EncodingDate => {
                self.score.identification.encoding_date = Some(element.text().to_string());
            }
            ElementKind::Source => {
                self.score.identification.source = Some(element.text().to_string());
            }

            ElementKind::Credit => {
                let page = element
                    .int_attribute("page")
                    .filter(|page| *page > 0)
                    .unwrap_or(1) as u32;
                self.current_credit = Some(MsrCredit {
                    page,
                    input_line: element.start_line,
                    ..MsrCredit::default()
                });
            }
            ElementKind::CreditType => {
                if let Some(credit) = self.current_credit.as_mut() {
                    credit.types.push(element.text().to_string());
                }
            }
            ElementKind::CreditWords => {
                if let Some(credit) = self.current_credit.as_mut() {
                    credit.words.push(element.text().to_string());
                }
            }

            ElementKind::PartGroup => self.visit_start_part_group(element)?,
            ElementKind::GroupName => {
                if let Some(part_group) = self.current_msr_part_group_mut() {
                    part_group.name = Some(element.text().to_string());
                }
            }
            ElementKind::GroupNameDisplay => self.display_context = DisplayContext::GroupName,
            ElementKind::DisplayText => self.visit_display_text(element),
            ElementKind::AccidentalText => {
                if self.display_context == DisplayContext::GroupName {
                    if let Some(part_group) = self.current_msr_part_group_mut() {
                        part_group.accidental_text = Some(element.text().to_string());
                    }
                }
            }
            ElementKind::GroupAbbreviation => {
                if let Some(part_group) = self.current_msr_part_group_mut() {
                    part_group.abbreviation = Some(element.text().to_string());
                }
            }
            ElementKind::GroupSymbol => self.visit_group_symbol(element)?,
            ElementKind::GroupBarline => self.visit_group_barline(element)?,

            ElementKind::ScorePart => self.visit_start_score_part(element)?,
            ElementKind::PartName => {
                if let Some(part) = self.current_score_part_mut() {
                    part.name = Some(element.text().to_string());
                }
            }
            ElementKind::PartNameDisplay => self.display_context = DisplayContext::PartName,
            ElementKind::PartAbbreviation => {
                if let Some(part) = self.current_score_part_mut() {
                    part.abbreviation = Some(element.text().to_string());
                }
            }
            ElementKind::PartAbbreviationDisplay => {
                self.display_context = DisplayContext::PartAbbreviation
            }
            ElementKind::InstrumentName => {
                if let Some(part) = self.current_score_part_mut() {
                    part.instrument_name = Some(element.text().to_string());
                }
            }
            ElementKind::InstrumentAbbreviation => {
                if let Some(part) = self.current_score_part_mut() {
                    part.instrument_abbreviation = Some(element.text().to_string());
                }
            }

            ElementKind::Part => self.visit_start_part(element)?,
            ElementKind::Measure => self.visit_start_measure(element)?,
            ElementKind::Print => self.on_going_print = true,
            ElementKind::Staves => self.visit_staves(element)?,
            ElementKind::Barline | ElementKind::MeasureStyle => {}
            ElementKind::Repeat => self.visit_repeat(element),
            ElementKind::MeasureRepeat => self.visit_measure_repeat(element)?,
            ElementKind::MultipleRest => self.visit_multiple_rest(element)?,

            ElementKind::Note => self.visit_start_note(element),
            ElementKind::Grace
            | ElementKind::Cue
            | ElementKind::Chord
            | ElementKind::Rest
            | ElementKind::Staff
            | ElementKind::Voice => self.visit_note_child(kind, element)?,
            ElementKind::TimeModification => {}
            ElementKind::ActualNotes | ElementKind::NormalNotes => {
                self.visit_time_modification_child(kind, element)
            }
            ElementKind::Tuplet => self.visit_tuplet(element)?,
            ElementKind::Lyric => {
                if let Some(note) = self.current_note.as_mut() {
                    let number = element.attribute("number").unwrap_or("1");
                    note.stanza_numbers.push(number.to_string());
                }
            }

            ElementKind::Harmony => self.visit_harmony(element),
            ElementKind::FiguredBass => self.visit_figured_bass(element),
        }
        Ok(())
    }

    fn visit_end(&mut self, kind: ElementKind, element: &XmlElement<'_, '_>) -> Result<()> {
        match kind {
            ElementKind::ScorePartwise => self.visit_end_score_partwise(element)?,
            ElementKind::Credit => {
                if let Some(credit) = self.current_credit.take() {
                    self.score.credits.push(credit);
                }
            }
            ElementKind::PartList => self.visit_end_part_list(element)?,
            ElementKind::PartGroup => self.current_part_group = None,
            ElementKind::GroupNameDisplay
            | ElementKind::PartNameDisplay
            | ElementKind::PartAbbreviationDisplay => self.display_context = DisplayContext::None,
            ElementKind::ScorePart => self.current_score_part = None,
            ElementKind::Part => self.visit_end_part(element)?,
            ElementKind::Measure => self.visit_end_measure(element),
            ElementKind::Print => self.on_going_print = false,
            ElementKind::Note => self.visit_end_note(element)?,
            _ => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Part list
    // ------------------------------------------------------------------------

    fn current_msr_part_group_mut(&mut self) -> Option<&mut MsrPartGroup> {
        let id = self.current_part_group?;
        self.score.part_group_mut(id)
    }

    fn current_score_part_mut(&mut self) -> Option<&mut MsrPart> {
        let id = self.current_score_part?;
        self.score.part_mut(id)
    }

    fn visit_start_part_group(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        let number: i32 = match element.attribute("number") {
            None => 1,
            Some(value) => value.trim().parse().map_err(|_| {
                self.wae
                    .error(line, format!("part-group number \"{}\" is not an integer", value))
            })?,
        };

        match element.attribute("type") {
            Some("start") => {
                let identity = self.part_groups.next_identity();
                let id = self
                    .score
                    .add_part_group(MsrPartGroup::new(number, identity, line));
                self.part_groups
                    .start_part_group(number, id, line, &mut self.wae);
                self.current_part_group = Some(id);
                log::debug!(
                    "Creating part-group {} (identity {}), line {}",
                    number,
                    identity,
                    line
                );
            }
            Some("stop") => {
                self.part_groups.stop_part_group(number, line, &mut self.wae);
                self.current_part_group = None;
            }
            Some(other) => {
                return Err(self
                    .wae
                    .error(line, format!("part-group type \"{}\" is unknown", other)));
            }
            None => {
                return Err(self.wae.error(line, "part-group type is missing"));
            }
        }
        Ok(())
    }

    fn visit_display_text(&mut self, element: &XmlElement<'_, '_>) {
        let text = element.text();
        let target = match self.display_context {
            DisplayContext::None => return,
            DisplayContext::GroupName => match self.current_msr_part_group_mut() {
                Some(part_group) => &mut part_group.name_display_text,
                None => return,
            },
            context => {
                let id = if self.on_going_print {
                    self.current_part
                } else {
                    self.current_score_part
                };
                let Some(part) = (match id {
                    Some(id) => self.score.part_mut(id),
                    None => None,
                }) else {
                    return;
                };
                if context == DisplayContext::PartName {
                    &mut part.name_display_text
                } else {
                    &mut part.abbreviation_display_text
                }
            }
        };
        target.get_or_insert_with(String::new).push_str(text);
    }

    fn visit_group_symbol(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let value = element.text();
        let symbol = PartGroupSymbol::from_musicxml(value).ok_or_else(|| {
            self.wae.error(
                element.start_line,
                format!("part-group symbol \"{}\" is unknown", value),
            )
        })?;
        let default_x = element.int_attribute("default-x");
        if let Some(part_group) = self.current_msr_part_group_mut() {
            part_group.symbol = symbol;
            part_group.symbol_default_x = default_x;
        }
        Ok(())
    }

    fn visit_group_barline(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let value = element.text();
        let barline = PartGroupBarline::from_musicxml(value).ok_or_else(|| {
            self.wae.error(
                element.start_line,
                format!("part-group barline \"{}\" is unknown", value),
            )
        })?;
        if let Some(part_group) = self.current_msr_part_group_mut() {
            part_group.barline = barline;
        }
        Ok(())
    }

    fn visit_start_score_part(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        let part_id = element
            .attribute("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| self.wae.error(line, "score-part id is missing"))?;

        if self.score.find_part(part_id).is_some() {
            return Err(self.wae.error(
                line,
                format!("score-part id \"{}\" is used more than once", part_id),
            ));
        }
        if PURE_NUMBER_PART_ID.is_match(part_id) {
            self.wae.warning(
                WarningKind::PureNumberPartId,
                line,
                format!("part id \"{}\" is a pure number", part_id),
            );
        }

        let part = self.score.add_part(MsrPart::new(part_id, line));
        self.part_groups.register_part(part);
        self.current_score_part = Some(part);
        log::debug!("Creating part \"{}\", line {}", part_id, line);
        Ok(())
    }

    fn visit_end_part_list(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        self.part_groups
            .resolve(&mut self.score, element.end_line, &mut self.wae)?;

        if self.settings.trace_part_groups {
            for (id, part_group) in self.score.explicit_part_groups() {
                log::debug!(
                    "{} contains parts {:?}",
                    part_group,
                    self.score.part_ids_in_group(id)
                );
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Parts and measures
    // ------------------------------------------------------------------------

    fn current_part_mut(&mut self, line: u32) -> Result<&mut MsrPart> {
        let id = self
            .current_part
            .ok_or_else(|| self.wae.error(line, "element found outside of a part"))?;
        self.score
            .part_mut(id)
            .ok_or_else(|| ConversionError::InternalError(format!("no part {:?}", id)))
    }

    fn current_part_opt_mut(&mut self) -> Option<&mut MsrPart> {
        let id = self.current_part?;
        self.score.part_mut(id)
    }

    fn visit_start_part(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        if !self.part_groups.is_resolved() {
            return Err(self.wae.error(line, "part found before the part-list"));
        }

        let part_id = element.attribute("id").map(str::trim).unwrap_or("");
        let part = if part_id.is_empty() {
            match self.score.parts.len() {
                1 => {
                    self.wae.warning(
                        WarningKind::EmptyPartId,
                        line,
                        "part id is empty, using the only part of the part-list",
                    );
                    PartId(0)
                }
                count => {
                    return Err(self.wae.error(
                        line,
                        format!("part id is empty and the part-list has {} parts", count),
                    ));
                }
            }
        } else {
            self.score.find_part(part_id).ok_or_else(|| {
                self.wae.error(
                    line,
                    format!("part \"{}\" is not in the part-list", part_id),
                )
            })?
        };

        self.current_part = Some(part);
        self.current_part_voices.clear();
        self.current_measure_number.clear();
        self.pending_multiple_measure_rest = None;
        Ok(())
    }

    fn visit_end_part(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        for tracker in self.current_part_voices.values_mut() {
            tracker.handle_part_end(&mut self.events, &mut self.wae);
        }
        self.current_part_voices.clear();

        if let Some(pending) = self.pending_multiple_measure_rest.take() {
            self.wae.warning(
                WarningKind::UnterminatedMultipleMeasureRest,
                element.end_line,
                format!(
                    "multiple measure rest of {} measures ends {} measures after the part",
                    pending.measures_number, pending.remaining_measures
                ),
            );
        }

        let part = self.current_part_mut(element.start_line)?;
        part.assign_regular_voice_ordinals();
        log::debug!(
            "{} has {} measures and {} voices",
            part,
            part.measures_count,
            part.regular_voices_count()
        );
        self.current_part = None;
        Ok(())
    }

    fn visit_start_measure(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        self.current_measure_number = element.attribute("number").unwrap_or("").to_string();
        let part = self.current_part_mut(element.start_line)?;
        part.measures_count += 1;
        Ok(())
    }

    fn visit_end_measure(&mut self, element: &XmlElement<'_, '_>) {
        for tracker in self.current_part_voices.values_mut() {
            tracker.handle_measure_end(&mut self.events, &mut self.wae);
        }

        if let Some(mut pending) = self.pending_multiple_measure_rest.take() {
            pending.remaining_measures = pending.remaining_measures.saturating_sub(1);
            if pending.remaining_measures == 0 {
                let part_id = self.current_part_id_string();
                self.events.register_multiple_measure_rest_end(
                    &part_id,
                    &self.current_measure_number,
                    pending.measures_number,
                    element.end_line,
                    element.end_line,
                );
            } else {
                self.pending_multiple_measure_rest = Some(pending);
            }
        }
    }

    fn current_part_id_string(&self) -> String {
        self.current_part
            .and_then(|id| self.score.part(id))
            .map(|part| part.id.clone())
            .unwrap_or_default()
    }

    fn visit_staves(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        let staves = element
            .int_text()
            .filter(|staves| *staves > 0)
            .ok_or_else(|| {
                self.wae
                    .error(line, format!("staves \"{}\" is not a positive integer", element.text()))
            })?;

        if staves > 1 {
            let part = self.current_part_mut(line)?;
            for staff_number in 1..=staves {
                part.create_staff_if_not_yet_done(staff_number, line);
            }
        }
        Ok(())
    }

    fn visit_repeat(&mut self, element: &XmlElement<'_, '_>) {
        if self.first_repeat_seen {
            return;
        }
        self.first_repeat_seen = true;
        if element.attribute("direction") == Some("backward") {
            log::debug!(
                "First repeat is backward, line {}: implicit initial forward repeat",
                element.start_line
            );
            self.events.set_implicit_initial_forward_repeat();
        }
    }

    fn visit_measure_repeat(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        let part_id = self.current_part_id_string();

        match element.attribute("type") {
            Some("start") => {
                let measures = element
                    .int_text()
                    .filter(|measures| *measures > 0)
                    .unwrap_or(1) as u32;
                let slashes = element
                    .int_attribute("slashes")
                    .filter(|slashes| *slashes > 0)
                    .unwrap_or(1) as u32;
                self.events.register_measure_repeat_begin(
                    &part_id,
                    &self.current_measure_number,
                    measures,
                    slashes,
                    line,
                    element.end_line,
                );
            }
            Some("stop") => {
                self.events.register_measure_repeat_end(
                    &part_id,
                    &self.current_measure_number,
                    line,
                    element.end_line,
                );
            }
            other => {
                return Err(self.wae.error(
                    line,
                    format!("measure-repeat type {:?} is unknown", other.unwrap_or("")),
                ));
            }
        }
        Ok(())
    }

    fn visit_multiple_rest(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        let measures = element
            .int_text()
            .filter(|measures| *measures > 0)
            .ok_or_else(|| {
                self.wae.error(
                    line,
                    format!("multiple-rest \"{}\" is not a positive integer", element.text()),
                )
            })? as u32;

        let part_id = self.current_part_id_string();
        self.events.register_multiple_measure_rest_begin(
            &part_id,
            &self.current_measure_number,
            measures,
            line,
            element.end_line,
        );
        self.pending_multiple_measure_rest = Some(PendingMultipleMeasureRest {
            measures_number: measures,
            remaining_measures: measures,
        });
        Ok(())
    }

    fn visit_harmony(&mut self, element: &XmlElement<'_, '_>) {
        if self.settings.ignore_harmonies {
            return;
        }
        if let Some(part) = self.current_part_opt_mut() {
            part.create_harmonies_voice_if_not_yet_done(element.start_line);
        }
    }

    fn visit_figured_bass(&mut self, element: &XmlElement<'_, '_>) {
        if self.settings.ignore_figured_bass {
            return;
        }
        if let Some(part) = self.current_part_opt_mut() {
            part.create_figured_bass_voice_if_not_yet_done(element.start_line);
        }
    }

    fn visit_end_score_partwise(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        self.check_part_measures_counts(element.end_line)?;

        self.events.sort_the_mxsr_events_lists();

        log::info!(
            "MSR skeleton of {}: {} parts, {} part-groups, {} measures, {} notes, {} events, {} warnings",
            self.settings.input_source_name,
            self.score.parts.len(),
            self.score.explicit_part_groups().count(),
            self.score.measures_count,
            self.note_sequential_number,
            self.events.all_events().len(),
            self.wae.warnings().len()
        );
        Ok(())
    }

    fn check_part_measures_counts(&mut self, line: u32) -> Result<()> {
        let counts: Vec<(&str, u32)> = self
            .score
            .parts
            .iter()
            .map(|part| (part.id.as_str(), part.measures_count))
            .collect();
        let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        let min = counts.iter().map(|(_, count)| *count).min().unwrap_or(0);

        if min != max {
            let message = format!(
                "parts have different measure counts: {}",
                counts
                    .iter()
                    .map(|(id, count)| format!("\"{}\" {}", id, count))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if self.settings.strict_measure_counts {
                return Err(self.wae.error(line, message));
            }
            self.wae
                .warning(WarningKind::MeasureCountMismatch, line, message);
        }

        self.score.measures_count = max;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------------

    fn visit_start_note(&mut self, element: &XmlElement<'_, '_>) {
        self.note_sequential_number += 1;
        self.current_note = Some(CurrentNote::new(
            self.note_sequential_number,
            element.start_line,
            element.end_line,
        ));
    }

    fn visit_note_child(&mut self, kind: ElementKind, element: &XmlElement<'_, '_>) -> Result<()> {
        if element.parent_name() != Some("note") {
            return Ok(());
        }
        let line = element.start_line;

        let number = match kind {
            ElementKind::Staff | ElementKind::Voice => Some(
                element
                    .int_text()
                    .filter(|number| *number > 0)
                    .ok_or_else(|| {
                        self.wae.error(
                            line,
                            format!(
                                "{} \"{}\" is not a positive integer",
                                element.name(),
                                element.text()
                            ),
                        )
                    })?,
            ),
            _ => None,
        };

        let Some(note) = self.current_note.as_mut() else {
            return Ok(());
        };
        match kind {
            ElementKind::Grace => note.is_grace = true,
            ElementKind::Cue => note.is_cue = true,
            ElementKind::Chord => note.is_chord_member = true,
            ElementKind::Rest => note.is_rest = true,
            ElementKind::Staff => note.staff_number = number.unwrap_or(DEFAULT_STAFF_NUMBER),
            ElementKind::Voice => note.voice_number = number.unwrap_or(DEFAULT_VOICE_NUMBER),
            _ => {}
        }
        Ok(())
    }

    fn visit_time_modification_child(&mut self, kind: ElementKind, element: &XmlElement<'_, '_>) {
        if element.parent_name() != Some("time-modification") {
            return;
        }
        let Some(note) = self.current_note.as_mut() else {
            return;
        };
        match kind {
            ElementKind::ActualNotes => note.actual_notes = element.int_text(),
            ElementKind::NormalNotes => note.normal_notes = element.int_text(),
            _ => {}
        }
    }

    fn visit_tuplet(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let line = element.start_line;
        let value = element.attribute("type").unwrap_or("");
        let kind = TupletMarkerKind::from_musicxml(value)
            .ok_or_else(|| self.wae.error(line, format!("tuplet type \"{}\" is unknown", value)))?;

        if let Some(note) = self.current_note.as_mut() {
            note.tuplet_markers.push(TupletMarker {
                kind,
                number: element.int_attribute("number"),
                input_line: line,
            });
        }
        Ok(())
    }

    fn visit_end_note(&mut self, element: &XmlElement<'_, '_>) -> Result<()> {
        let note = self.current_note.take().ok_or_else(|| {
            ConversionError::InternalError(format!(
                "</note> without <note>, line {}",
                element.end_line
            ))
        })?;

        // Containers
        let part = self.current_part_mut(note.input_start_line)?;
        part.create_staff_if_not_yet_done(note.staff_number, note.input_start_line);
        part.create_regular_voice_in_staff_if_not_yet_done(
            note.staff_number,
            note.voice_number,
            note.input_start_line,
        );
        if let Some(voice) = part.regular_voice_mut(note.voice_number) {
            voice.stanza_numbers.extend(note.stanza_numbers.iter().cloned());
        }

        // Events
        let tracker = self
            .current_part_voices
            .entry(note.voice_number)
            .or_insert_with(PartVoiceTracker::new);
        tracker.handle_note(
            note.snapshot(),
            &note.tuplet_markers,
            note.tuplet_factor(),
            &mut self.events,
            &mut self.wae,
        );
        Ok(())
    }
}
