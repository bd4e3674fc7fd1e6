//! Store of all events met during one document scan
//!
//! Registration creates an event, numbers it and indexes it. Notes carry at
//! most one staff change take-off, one landing, and one grace, cue and chord
//! begin and end each: a second registration for the same note overwrites the
//! first. A note may begin and end any number of nested tuplets.
//!
//! Fetches never fail: absence is `None` or an empty list.

use std::collections::BTreeMap;

use num_rational::Rational32;
use serde::Serialize;

use super::events::{
    BoundaryKind, ChordEvent, CueEvent, GraceEvent, MeasureRepeatEvent, MultipleMeasureRestEvent,
    MxsrEvent, NoteEventBase, NotePosition, StaffChangeEvent, StaffChangeKind, TupletEvent,
};

/// (part id, measure number). Tuple keys don't map to JSON object keys, so
/// these maps are left out of the dump; `all_events` carries the events.
type MeasureKey = (String, String);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MxsrEventsCollection {
    current_event_sequential_number: u32,

    all_events: Vec<MxsrEvent>,

    staff_change_take_offs: BTreeMap<u32, StaffChangeEvent>,
    staff_change_landings: BTreeMap<u32, StaffChangeEvent>,
    staff_change_events: Vec<StaffChangeEvent>,

    grace_begins: BTreeMap<u32, GraceEvent>,
    grace_ends: BTreeMap<u32, GraceEvent>,

    cue_begins: BTreeMap<u32, CueEvent>,
    cue_ends: BTreeMap<u32, CueEvent>,

    chord_begins: BTreeMap<u32, ChordEvent>,
    chord_ends: BTreeMap<u32, ChordEvent>,

    tuplet_begins: Vec<TupletEvent>,
    tuplet_ends: Vec<TupletEvent>,
    tuplet_events_by_note: BTreeMap<u32, Vec<TupletEvent>>,

    #[serde(skip)]
    measure_repeat_begins: BTreeMap<MeasureKey, MeasureRepeatEvent>,
    #[serde(skip)]
    measure_repeat_ends: BTreeMap<MeasureKey, MeasureRepeatEvent>,

    #[serde(skip)]
    multiple_measure_rest_begins: BTreeMap<MeasureKey, MultipleMeasureRestEvent>,
    #[serde(skip)]
    multiple_measure_rest_ends: BTreeMap<MeasureKey, MultipleMeasureRestEvent>,

    implicit_initial_forward_repeat: bool,

    #[serde(skip)]
    trace_events: bool,
}

impl MxsrEventsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every registration at trace level
    pub fn with_tracing(mut self, trace_events: bool) -> Self {
        self.trace_events = trace_events;
        self
    }

    fn next_event_sequential_number(&mut self) -> u32 {
        self.current_event_sequential_number += 1;
        self.current_event_sequential_number
    }

    fn record(&mut self, event: MxsrEvent) {
        if self.trace_events {
            log::trace!("Registering {}", event);
        }
        self.all_events.push(event);
    }

    // ------------------------------------------------------------------------
    // Staff changes
    // ------------------------------------------------------------------------

    fn staff_change_event(
        &mut self,
        kind: StaffChangeKind,
        note: NotePosition,
        take_off_staff_number: i32,
        landing_staff_number: i32,
        take_off_input_line: u32,
        landing_input_line: u32,
    ) -> StaffChangeEvent {
        let base = NoteEventBase::new(self.next_event_sequential_number(), note);
        let event = StaffChangeEvent {
            base,
            kind,
            take_off_staff_number,
            landing_staff_number,
            take_off_input_line,
            landing_input_line,
        };
        self.staff_change_events.push(event);
        self.record(MxsrEvent::StaffChange(event));
        event
    }

    /// `note` is the last note before the change, on the take-off staff
    pub fn register_staff_change_take_off(
        &mut self,
        note: NotePosition,
        take_off_staff_number: i32,
        landing_staff_number: i32,
        take_off_input_line: u32,
        landing_input_line: u32,
    ) -> StaffChangeEvent {
        let event = self.staff_change_event(
            StaffChangeKind::TakeOff,
            note,
            take_off_staff_number,
            landing_staff_number,
            take_off_input_line,
            landing_input_line,
        );
        self.staff_change_take_offs
            .insert(note.note_sequential_number, event);
        event
    }

    /// `note` is the first note on the landing staff
    pub fn register_staff_change_landing(
        &mut self,
        note: NotePosition,
        take_off_staff_number: i32,
        landing_staff_number: i32,
        take_off_input_line: u32,
        landing_input_line: u32,
    ) -> StaffChangeEvent {
        let event = self.staff_change_event(
            StaffChangeKind::Landing,
            note,
            take_off_staff_number,
            landing_staff_number,
            take_off_input_line,
            landing_input_line,
        );
        self.staff_change_landings
            .insert(note.note_sequential_number, event);
        event
    }

    // ------------------------------------------------------------------------
    // Grace, cue and chord spans
    // ------------------------------------------------------------------------

    pub fn register_grace_begin(&mut self, note: NotePosition) -> GraceEvent {
        self.register_grace(BoundaryKind::Begin, note)
    }

    pub fn register_grace_end(&mut self, note: NotePosition) -> GraceEvent {
        self.register_grace(BoundaryKind::End, note)
    }

    fn register_grace(&mut self, kind: BoundaryKind, note: NotePosition) -> GraceEvent {
        let event = GraceEvent {
            base: NoteEventBase::new(self.next_event_sequential_number(), note),
            kind,
        };
        let map = match kind {
            BoundaryKind::Begin => &mut self.grace_begins,
            BoundaryKind::End => &mut self.grace_ends,
        };
        map.insert(note.note_sequential_number, event);
        self.record(MxsrEvent::Grace(event));
        event
    }

    pub fn register_cue_begin(&mut self, note: NotePosition) -> CueEvent {
        self.register_cue(BoundaryKind::Begin, note)
    }

    pub fn register_cue_end(&mut self, note: NotePosition) -> CueEvent {
        self.register_cue(BoundaryKind::End, note)
    }

    fn register_cue(&mut self, kind: BoundaryKind, note: NotePosition) -> CueEvent {
        let event = CueEvent {
            base: NoteEventBase::new(self.next_event_sequential_number(), note),
            kind,
        };
        let map = match kind {
            BoundaryKind::Begin => &mut self.cue_begins,
            BoundaryKind::End => &mut self.cue_ends,
        };
        map.insert(note.note_sequential_number, event);
        self.record(MxsrEvent::Cue(event));
        event
    }

    pub fn register_chord_begin(&mut self, note: NotePosition) -> ChordEvent {
        self.register_chord(BoundaryKind::Begin, note)
    }

    pub fn register_chord_end(&mut self, note: NotePosition) -> ChordEvent {
        self.register_chord(BoundaryKind::End, note)
    }

    fn register_chord(&mut self, kind: BoundaryKind, note: NotePosition) -> ChordEvent {
        let event = ChordEvent {
            base: NoteEventBase::new(self.next_event_sequential_number(), note),
            kind,
        };
        let map = match kind {
            BoundaryKind::Begin => &mut self.chord_begins,
            BoundaryKind::End => &mut self.chord_ends,
        };
        map.insert(note.note_sequential_number, event);
        self.record(MxsrEvent::Chord(event));
        event
    }

    // ------------------------------------------------------------------------
    // Tuplets
    // ------------------------------------------------------------------------

    pub fn register_tuplet_begin(
        &mut self,
        note: NotePosition,
        tuplet_number: i32,
        tuplet_factor: Option<Rational32>,
    ) -> TupletEvent {
        self.register_tuplet(BoundaryKind::Begin, note, tuplet_number, tuplet_factor)
    }

    pub fn register_tuplet_end(
        &mut self,
        note: NotePosition,
        tuplet_number: i32,
        tuplet_factor: Option<Rational32>,
    ) -> TupletEvent {
        self.register_tuplet(BoundaryKind::End, note, tuplet_number, tuplet_factor)
    }

    fn register_tuplet(
        &mut self,
        kind: BoundaryKind,
        note: NotePosition,
        tuplet_number: i32,
        tuplet_factor: Option<Rational32>,
    ) -> TupletEvent {
        let event = TupletEvent {
            base: NoteEventBase::new(self.next_event_sequential_number(), note),
            kind,
            tuplet_number,
            tuplet_factor,
        };
        match kind {
            BoundaryKind::Begin => self.tuplet_begins.push(event),
            BoundaryKind::End => self.tuplet_ends.push(event),
        }
        self.tuplet_events_by_note
            .entry(note.note_sequential_number)
            .or_default()
            .push(event);
        self.record(MxsrEvent::Tuplet(event));
        event
    }

    // ------------------------------------------------------------------------
    // Measure repeats and multiple measure rests
    // ------------------------------------------------------------------------

    pub fn register_measure_repeat_begin(
        &mut self,
        part_id: &str,
        measure_number: &str,
        measure_repeat_number: u32,
        slashes_number: u32,
        input_start_line: u32,
        input_end_line: u32,
    ) -> MeasureRepeatEvent {
        self.register_measure_repeat(
            BoundaryKind::Begin,
            part_id,
            measure_number,
            measure_repeat_number,
            slashes_number,
            (input_start_line, input_end_line),
        )
    }

    pub fn register_measure_repeat_end(
        &mut self,
        part_id: &str,
        measure_number: &str,
        input_start_line: u32,
        input_end_line: u32,
    ) -> MeasureRepeatEvent {
        self.register_measure_repeat(
            BoundaryKind::End,
            part_id,
            measure_number,
            0,
            0,
            (input_start_line, input_end_line),
        )
    }

    fn register_measure_repeat(
        &mut self,
        kind: BoundaryKind,
        part_id: &str,
        measure_number: &str,
        measure_repeat_number: u32,
        slashes_number: u32,
        (input_start_line, input_end_line): (u32, u32),
    ) -> MeasureRepeatEvent {
        let event = MeasureRepeatEvent {
            event_sequential_number: self.next_event_sequential_number(),
            kind,
            part_id: part_id.to_string(),
            measure_number: measure_number.to_string(),
            measure_repeat_number,
            slashes_number,
            input_start_line,
            input_end_line,
        };
        let map = match kind {
            BoundaryKind::Begin => &mut self.measure_repeat_begins,
            BoundaryKind::End => &mut self.measure_repeat_ends,
        };
        map.insert(
            (part_id.to_string(), measure_number.to_string()),
            event.clone(),
        );
        self.record(MxsrEvent::MeasureRepeat(event.clone()));
        event
    }

    pub fn register_multiple_measure_rest_begin(
        &mut self,
        part_id: &str,
        measure_number: &str,
        multiple_measure_rest_number: u32,
        input_start_line: u32,
        input_end_line: u32,
    ) -> MultipleMeasureRestEvent {
        self.register_multiple_measure_rest(
            BoundaryKind::Begin,
            part_id,
            measure_number,
            multiple_measure_rest_number,
            (input_start_line, input_end_line),
        )
    }

    pub fn register_multiple_measure_rest_end(
        &mut self,
        part_id: &str,
        measure_number: &str,
        multiple_measure_rest_number: u32,
        input_start_line: u32,
        input_end_line: u32,
    ) -> MultipleMeasureRestEvent {
        self.register_multiple_measure_rest(
            BoundaryKind::End,
            part_id,
            measure_number,
            multiple_measure_rest_number,
            (input_start_line, input_end_line),
        )
    }

    fn register_multiple_measure_rest(
        &mut self,
        kind: BoundaryKind,
        part_id: &str,
        measure_number: &str,
        multiple_measure_rest_number: u32,
        (input_start_line, input_end_line): (u32, u32),
    ) -> MultipleMeasureRestEvent {
        let event = MultipleMeasureRestEvent {
            event_sequential_number: self.next_event_sequential_number(),
            kind,
            part_id: part_id.to_string(),
            measure_number: measure_number.to_string(),
            multiple_measure_rest_number,
            input_start_line,
            input_end_line,
        };
        let map = match kind {
            BoundaryKind::Begin => &mut self.multiple_measure_rest_begins,
            BoundaryKind::End => &mut self.multiple_measure_rest_ends,
        };
        map.insert(
            (part_id.to_string(), measure_number.to_string()),
            event.clone(),
        );
        self.record(MxsrEvent::MultipleMeasureRest(event.clone()));
        event
    }

    // ------------------------------------------------------------------------
    // Implicit initial forward repeat
    // ------------------------------------------------------------------------

    pub fn set_implicit_initial_forward_repeat(&mut self) {
        self.implicit_initial_forward_repeat = true;
    }

    pub fn implicit_initial_forward_repeat(&self) -> bool {
        self.implicit_initial_forward_repeat
    }

    // ------------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------------

    /// Order the begin/end lists by input position. Stable, so calling it
    /// again changes nothing.
    pub fn sort_the_mxsr_events_lists(&mut self) {
        fn tuplet_key(event: &TupletEvent) -> (u32, u32, u32) {
            (
                event.base.input_start_line,
                event.base.note_sequential_number,
                event.base.event_sequential_number,
            )
        }

        self.all_events.sort_by_key(MxsrEvent::event_sequential_number);
        self.tuplet_begins.sort_by_key(tuplet_key);
        self.tuplet_ends.sort_by_key(tuplet_key);
        for events in self.tuplet_events_by_note.values_mut() {
            events.sort_by_key(|event| event.base.event_sequential_number);
        }
        self.staff_change_events.sort_by_key(|event| {
            (
                event.base.input_start_line,
                event.base.note_sequential_number,
                event.base.event_sequential_number,
            )
        });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All events, in registration order
    pub fn all_events(&self) -> &[MxsrEvent] {
        &self.all_events
    }

    pub fn staff_change_events(&self) -> &[StaffChangeEvent] {
        &self.staff_change_events
    }

    pub fn tuplet_begins(&self) -> &[TupletEvent] {
        &self.tuplet_begins
    }

    pub fn tuplet_ends(&self) -> &[TupletEvent] {
        &self.tuplet_ends
    }

    pub fn fetch_staff_change_take_off_at(
        &self,
        note_sequential_number: u32,
    ) -> Option<&StaffChangeEvent> {
        self.staff_change_take_offs.get(&note_sequential_number)
    }

    pub fn fetch_staff_change_landing_at(
        &self,
        note_sequential_number: u32,
    ) -> Option<&StaffChangeEvent> {
        self.staff_change_landings.get(&note_sequential_number)
    }

    pub fn fetch_grace_begin_at(&self, note_sequential_number: u32) -> Option<&GraceEvent> {
        self.grace_begins.get(&note_sequential_number)
    }

    pub fn fetch_grace_end_at(&self, note_sequential_number: u32) -> Option<&GraceEvent> {
        self.grace_ends.get(&note_sequential_number)
    }

    pub fn fetch_cue_begin_at(&self, note_sequential_number: u32) -> Option<&CueEvent> {
        self.cue_begins.get(&note_sequential_number)
    }

    pub fn fetch_cue_end_at(&self, note_sequential_number: u32) -> Option<&CueEvent> {
        self.cue_ends.get(&note_sequential_number)
    }

    pub fn fetch_chord_begin_at(&self, note_sequential_number: u32) -> Option<&ChordEvent> {
        self.chord_begins.get(&note_sequential_number)
    }

    pub fn fetch_chord_end_at(&self, note_sequential_number: u32) -> Option<&ChordEvent> {
        self.chord_ends.get(&note_sequential_number)
    }

    /// Append the tuplet begins of a note to `out`, in discovery order
    pub fn fetch_tuplet_begins_list(
        &self,
        note_sequential_number: u32,
        out: &mut Vec<TupletEvent>,
    ) {
        self.fetch_tuplets(note_sequential_number, BoundaryKind::Begin, out);
    }

    /// Append the tuplet ends of a note to `out`, in discovery order
    pub fn fetch_tuplet_ends_list(
        &self,
        note_sequential_number: u32,
        out: &mut Vec<TupletEvent>,
    ) {
        self.fetch_tuplets(note_sequential_number, BoundaryKind::End, out);
    }

    fn fetch_tuplets(
        &self,
        note_sequential_number: u32,
        kind: BoundaryKind,
        out: &mut Vec<TupletEvent>,
    ) {
        if let Some(events) = self.tuplet_events_by_note.get(&note_sequential_number) {
            out.extend(events.iter().filter(|event| event.kind == kind).copied());
        }
    }

    /// Tuplet begins and ends of a note, in discovery order
    pub fn fetch_tuplet_events_at(&self, note_sequential_number: u32) -> &[TupletEvent] {
        self.tuplet_events_by_note
            .get(&note_sequential_number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn fetch_measure_repeat_begin(
        &self,
        part_id: &str,
        measure_number: &str,
    ) -> Option<&MeasureRepeatEvent> {
        self.measure_repeat_begins
            .get(&(part_id.to_string(), measure_number.to_string()))
    }

    pub fn fetch_measure_repeat_end(
        &self,
        part_id: &str,
        measure_number: &str,
    ) -> Option<&MeasureRepeatEvent> {
        self.measure_repeat_ends
            .get(&(part_id.to_string(), measure_number.to_string()))
    }

    pub fn fetch_multiple_measure_rest_begin(
        &self,
        part_id: &str,
        measure_number: &str,
    ) -> Option<&MultipleMeasureRestEvent> {
        self.multiple_measure_rest_begins
            .get(&(part_id.to_string(), measure_number.to_string()))
    }

    pub fn fetch_multiple_measure_rest_end(
        &self,
        part_id: &str,
        measure_number: &str,
    ) -> Option<&MultipleMeasureRestEvent> {
        self.multiple_measure_rest_ends
            .get(&(part_id.to_string(), measure_number.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(note_sequential_number: u32, line: u32) -> NotePosition {
        NotePosition {
            note_sequential_number,
            staff_number: 1,
            voice_number: 1,
            input_start_line: line,
            input_end_line: line + 4,
        }
    }

    #[test]
    fn test_event_numbers_start_at_one_and_increase() {
        let mut events = MxsrEventsCollection::new();
        events.register_grace_begin(note(1, 10));
        events.register_chord_begin(note(2, 20));
        events.register_tuplet_begin(note(2, 20), 1, Some(Rational32::new(3, 2)));

        let numbers: Vec<u32> = events
            .all_events()
            .iter()
            .map(MxsrEvent::event_sequential_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_second_registration_for_a_note_overwrites() {
        let mut events = MxsrEventsCollection::new();
        events.register_cue_begin(note(4, 10));
        let second = events.register_cue_begin(note(4, 10));

        assert_eq!(
            events.fetch_cue_begin_at(4).map(|e| e.base.event_sequential_number),
            Some(second.base.event_sequential_number)
        );
        assert!(events.fetch_cue_end_at(4).is_none());
    }

    #[test]
    fn test_fetch_tuplet_lists_copies_per_kind() {
        let mut events = MxsrEventsCollection::new();
        events.register_tuplet_begin(note(7, 30), 1, None);
        events.register_tuplet_begin(note(7, 30), 2, None);
        events.register_tuplet_end(note(7, 30), 3, None);

        let mut begins = Vec::new();
        events.fetch_tuplet_begins_list(7, &mut begins);
        let mut ends = Vec::new();
        events.fetch_tuplet_ends_list(7, &mut ends);

        assert_eq!(begins.iter().map(|e| e.tuplet_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ends.len(), 1);
        // Fetching does not consume
        let mut again = Vec::new();
        events.fetch_tuplet_begins_list(7, &mut again);
        assert_eq!(again, begins);
    }

    #[test]
    fn test_sort_orders_tuplet_lists_by_input_position() {
        let mut events = MxsrEventsCollection::new();
        events.register_tuplet_end(note(9, 50), 1, None);
        events.register_tuplet_end(note(5, 30), 1, None);

        events.sort_the_mxsr_events_lists();
        let once: Vec<u32> = events
            .tuplet_ends()
            .iter()
            .map(|e| e.base.note_sequential_number)
            .collect();
        events.sort_the_mxsr_events_lists();
        let twice: Vec<u32> = events
            .tuplet_ends()
            .iter()
            .map(|e| e.base.note_sequential_number)
            .collect();

        assert_eq!(once, vec![5, 9]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_measure_events_are_keyed_by_part_and_measure() {
        let mut events = MxsrEventsCollection::new();
        events.register_multiple_measure_rest_begin("P1", "3", 4, 40, 40);
        events.register_multiple_measure_rest_end("P1", "6", 4, 90, 90);

        assert!(events.fetch_multiple_measure_rest_begin("P1", "3").is_some());
        assert!(events.fetch_multiple_measure_rest_begin("P2", "3").is_none());
        assert_eq!(
            events
                .fetch_multiple_measure_rest_end("P1", "6")
                .map(|e| e.multiple_measure_rest_number),
            Some(4)
        );
        assert_eq!(events.all_events()[1].note_sequential_number(), None);
    }
}
