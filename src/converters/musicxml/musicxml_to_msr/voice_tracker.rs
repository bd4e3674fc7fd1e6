//! Per-voice event detection
//!
//! Each voice of the current part has a [`PartVoiceTracker`]. The builder
//! hands it every note of the voice at `</note>` and tells it when a measure
//! or the part ends; the tracker turns what it sees into staff change, grace,
//! cue, chord and tuplet events.

use num_rational::Rational32;

use crate::mxsr::MxsrEventsCollection;

use super::note_cursor::{NoteCursor, NoteSnapshot};
use super::tuplets::{PendingTupletStop, TupletStopResolution, TupletsTracker};
use super::types::WarningKind;
use super::wae::WaeHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupletMarkerKind {
    Start,
    Stop,
    Continue,
}

impl TupletMarkerKind {
    pub fn from_musicxml(value: &str) -> Option<Self> {
        match value {
            "start" => Some(TupletMarkerKind::Start),
            "stop" => Some(TupletMarkerKind::Stop),
            "continue" => Some(TupletMarkerKind::Continue),
            _ => None,
        }
    }
}

/// A `<tuplet>` element of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupletMarker {
    pub kind: TupletMarkerKind,
    pub number: Option<i32>,
    pub input_line: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PartVoiceTracker {
    /// Notes that are not chord members
    cursor: NoteCursor,

    /// Last note of any kind
    last_note: Option<NoteSnapshot>,

    chord_open: bool,
    grace_run_open: bool,
    cue_run_open: bool,

    tuplets: TupletsTracker,
}

impl PartVoiceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_note(
        &mut self,
        note: NoteSnapshot,
        tuplet_markers: &[TupletMarker],
        tuplet_factor: Option<Rational32>,
        events: &mut MxsrEventsCollection,
        wae: &mut WaeHandler,
    ) {
        let leader = match (note.is_chord_member, self.cursor.current()) {
            (true, Some(leader)) if self.last_note.is_some() => Some(leader),
            (true, _) => {
                wae.warning(
                    WarningKind::ChordWithoutFirstNote,
                    note.input_start_line,
                    format!(
                        "<chord/> on note {}, the first one of voice {}, handled as a plain note",
                        note.sequential_number, note.voice_number
                    ),
                );
                None
            }
            (false, _) => None,
        };

        let leader = match leader {
            Some(leader) => {
                if !self.chord_open {
                    events.register_chord_begin(leader.position());
                    self.chord_open = true;
                }
                leader
            }
            None => {
                self.close_current_group(events, wae);
                self.handle_grace_and_cue_runs(note, events);
                if let Some(change) = self.cursor.advance(note) {
                    events.register_staff_change_take_off(
                        change.take_off.position(),
                        change.take_off.staff_number,
                        change.landing.staff_number,
                        change.take_off.input_start_line,
                        change.landing.input_start_line,
                    );
                    events.register_staff_change_landing(
                        change.landing.position(),
                        change.take_off.staff_number,
                        change.landing.staff_number,
                        change.take_off.input_start_line,
                        change.landing.input_start_line,
                    );
                }
                note
            }
        };

        self.handle_tuplet_markers(leader, note, tuplet_markers, tuplet_factor, events, wae);
        self.last_note = Some(note);
    }

    /// Close the chord, grace and cue spans still open at `</measure>`
    pub fn handle_measure_end(&mut self, events: &mut MxsrEventsCollection, wae: &mut WaeHandler) {
        self.close_current_group(events, wae);
        let Some(last) = self.last_note else {
            return;
        };
        if self.grace_run_open {
            events.register_grace_end(last.position());
            self.grace_run_open = false;
        }
        if self.cue_run_open {
            events.register_cue_end(last.position());
            self.cue_run_open = false;
        }
    }

    /// Report the tuplets left pending at `</part>`
    pub fn handle_part_end(&mut self, events: &mut MxsrEventsCollection, wae: &mut WaeHandler) {
        self.handle_measure_end(events, wae);
        for tuplet in self.tuplets.take_unterminated() {
            wae.warning(
                WarningKind::UnterminatedTuplet,
                tuplet.input_line,
                format!(
                    "tuplet {} begun on note {} in voice {} is never stopped",
                    tuplet.tuplet_number,
                    tuplet.begin_note.note_sequential_number,
                    tuplet.begin_note.voice_number
                ),
            );
        }
    }

    /// The chord or note standing alone ends with `last_note`
    fn close_current_group(&mut self, events: &mut MxsrEventsCollection, wae: &mut WaeHandler) {
        let Some(last) = self.last_note else {
            return;
        };

        if self.chord_open {
            events.register_chord_end(last.position());
            self.chord_open = false;
        }

        if !self.tuplets.has_pending_stops() {
            return;
        }
        for resolution in self.tuplets.handle_pending_tuplets_stops_if_any() {
            match resolution {
                TupletStopResolution::Matched { tuplet, .. } => {
                    events.register_tuplet_end(
                        last.position(),
                        tuplet.tuplet_number,
                        tuplet.tuplet_factor,
                    );
                }
                TupletStopResolution::Unmatched(stop) => {
                    wae.warning(
                        WarningKind::UnmatchedTupletStop,
                        stop.input_line,
                        format!(
                            "tuplet stop{} on note {} matches no pending tuplet, ignored",
                            stop.tuplet_number
                                .map(|number| format!(" {}", number))
                                .unwrap_or_default(),
                            stop.note_sequential_number
                        ),
                    );
                }
            }
        }
    }

    fn handle_grace_and_cue_runs(&mut self, note: NoteSnapshot, events: &mut MxsrEventsCollection) {
        if let Some(last) = self.last_note {
            if self.grace_run_open && !note.is_grace {
                events.register_grace_end(last.position());
                self.grace_run_open = false;
            }
            if self.cue_run_open && !note.is_cue {
                events.register_cue_end(last.position());
                self.cue_run_open = false;
            }
        }

        if note.is_grace && !self.grace_run_open {
            events.register_grace_begin(note.position());
            self.grace_run_open = true;
        }
        if note.is_cue && !self.cue_run_open {
            events.register_cue_begin(note.position());
            self.cue_run_open = true;
        }
    }

    fn handle_tuplet_markers(
        &mut self,
        leader: NoteSnapshot,
        note: NoteSnapshot,
        tuplet_markers: &[TupletMarker],
        tuplet_factor: Option<Rational32>,
        events: &mut MxsrEventsCollection,
        wae: &mut WaeHandler,
    ) {
        let in_chord = leader.sequential_number != note.sequential_number;

        for marker in tuplet_markers {
            match marker.kind {
                TupletMarkerKind::Start => {
                    let number = marker.number.unwrap_or(1);
                    if in_chord && self.tuplets.pending_begun_at(number, leader.sequential_number) {
                        continue;
                    }
                    events.register_tuplet_begin(leader.position(), number, tuplet_factor);
                    if let Some(displaced) =
                        self.tuplets
                            .start(number, leader.position(), tuplet_factor, marker.input_line)
                    {
                        wae.warning(
                            WarningKind::RestartedTuplet,
                            marker.input_line,
                            format!(
                                "tuplet {} started again on note {} while the one begun on note {} is pending",
                                number,
                                leader.sequential_number,
                                displaced.begin_note.note_sequential_number
                            ),
                        );
                    }
                }
                TupletMarkerKind::Stop => {
                    self.tuplets.queue_stop(
                        leader.sequential_number,
                        PendingTupletStop {
                            tuplet_number: marker.number,
                            note_sequential_number: note.sequential_number,
                            input_line: marker.input_line,
                        },
                    );
                }
                TupletMarkerKind::Continue => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Voice {
        tracker: PartVoiceTracker,
        events: MxsrEventsCollection,
        wae: WaeHandler,
        next: u32,
    }

    impl Voice {
        fn new() -> Self {
            Self {
                tracker: PartVoiceTracker::new(),
                events: MxsrEventsCollection::new(),
                wae: WaeHandler::new("test"),
                next: 0,
            }
        }

        fn note(
            &mut self,
            staff: i32,
            is_chord_member: bool,
            is_grace: bool,
            markers: &[(TupletMarkerKind, Option<i32>)],
        ) -> u32 {
            self.next += 1;
            let snapshot = NoteSnapshot {
                sequential_number: self.next,
                input_start_line: self.next * 10,
                input_end_line: self.next * 10 + 9,
                staff_number: staff,
                voice_number: 1,
                is_grace,
                is_cue: false,
                is_chord_member,
                is_rest: false,
            };
            let markers: Vec<TupletMarker> = markers
                .iter()
                .map(|&(kind, number)| TupletMarker {
                    kind,
                    number,
                    input_line: self.next * 10 + 5,
                })
                .collect();
            self.tracker
                .handle_note(snapshot, &markers, None, &mut self.events, &mut self.wae);
            self.next
        }

        fn measure_end(&mut self) {
            self.tracker.handle_measure_end(&mut self.events, &mut self.wae);
        }
    }

    use TupletMarkerKind::{Start, Stop};

    #[test]
    fn test_chord_begin_and_end_keyed_to_first_and_last_notes() {
        let mut v = Voice::new();
        let first = v.note(1, false, false, &[]);
        v.note(1, true, false, &[]);
        let last = v.note(1, true, false, &[]);
        let after = v.note(1, false, false, &[]);

        assert!(v.events.fetch_chord_begin_at(first).is_some());
        assert!(v.events.fetch_chord_end_at(last).is_some());
        assert!(v.events.fetch_chord_begin_at(after).is_none());
        assert!(v.events.fetch_chord_end_at(after).is_none());
    }

    #[test]
    fn test_chord_closed_at_measure_end() {
        let mut v = Voice::new();
        v.note(1, false, false, &[]);
        let last = v.note(1, true, false, &[]);
        v.measure_end();

        assert!(v.events.fetch_chord_end_at(last).is_some());
    }

    #[test]
    fn test_grace_run_boundaries() {
        let mut v = Voice::new();
        let first_grace = v.note(1, false, true, &[]);
        let last_grace = v.note(1, false, true, &[]);
        let principal = v.note(1, false, false, &[]);

        assert!(v.events.fetch_grace_begin_at(first_grace).is_some());
        assert!(v.events.fetch_grace_begin_at(last_grace).is_none());
        assert!(v.events.fetch_grace_end_at(last_grace).is_some());
        assert!(v.events.fetch_grace_end_at(principal).is_none());
    }

    #[test]
    fn test_staff_change_ignores_chord_members() {
        let mut v = Voice::new();
        v.note(1, false, false, &[]);
        v.note(2, true, false, &[]);
        v.note(1, false, false, &[]);

        assert!(v.events.staff_change_events().is_empty());
    }

    #[test]
    fn test_tuplet_stop_on_chord_leader_ends_on_last_member() {
        let mut v = Voice::new();
        let first = v.note(1, false, false, &[(Start, Some(1))]);
        v.note(1, false, false, &[]);
        let chord_leader = v.note(1, false, false, &[(Stop, Some(1))]);
        let chord_last = v.note(1, true, false, &[(Stop, Some(1))]);
        v.note(1, false, false, &[]);

        let mut begins = Vec::new();
        v.events.fetch_tuplet_begins_list(first, &mut begins);
        let mut ends_on_leader = Vec::new();
        v.events.fetch_tuplet_ends_list(chord_leader, &mut ends_on_leader);
        let mut ends = Vec::new();
        v.events.fetch_tuplet_ends_list(chord_last, &mut ends);

        assert_eq!(begins.len(), 1);
        assert!(ends_on_leader.is_empty());
        assert_eq!(ends.len(), 1);
        assert!(v.wae.warnings().is_empty());
    }

    #[test]
    fn test_redundant_start_on_chord_member_is_ignored() {
        let mut v = Voice::new();
        let leader = v.note(1, false, false, &[(Start, Some(1))]);
        v.note(1, true, false, &[(Start, Some(1))]);

        let mut begins = Vec::new();
        v.events.fetch_tuplet_begins_list(leader, &mut begins);
        assert_eq!(begins.len(), 1);
        assert!(v.wae.warnings().is_empty());
    }

    #[test]
    fn test_unterminated_tuplet_reported_at_part_end() {
        let mut v = Voice::new();
        v.note(1, false, false, &[(Start, Some(1))]);
        v.tracker.handle_part_end(&mut v.events, &mut v.wae);

        assert_eq!(v.wae.warnings().len(), 1);
        assert_eq!(v.wae.warnings()[0].kind, WarningKind::UnterminatedTuplet);
    }
}
