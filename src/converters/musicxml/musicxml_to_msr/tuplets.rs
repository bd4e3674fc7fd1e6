//! Pending tuplet state of a voice
//!
//! A tuplet start is pending until a stop matches it. Stops are not matched
//! right away: a stop may sit on any note of a chord, and the tuplet only
//! ends with the chord's last note. They are queued under the sequential
//! number of their chord's first note and drained once that chord is closed.

use std::collections::BTreeMap;

use num_rational::Rational32;

use crate::mxsr::NotePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MxsrTuplet {
    pub tuplet_number: i32,

    /// Rank among the tuplets started in the voice
    pub opening_order: u32,

    pub begin_note: NotePosition,
    pub tuplet_factor: Option<Rational32>,
    pub input_line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTupletStop {
    /// `None` when the `<tuplet>` has no `number` attribute
    pub tuplet_number: Option<i32>,
    pub note_sequential_number: u32,
    pub input_line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupletStopResolution {
    Matched {
        tuplet: MxsrTuplet,
        stop: PendingTupletStop,
    },
    Unmatched(PendingTupletStop),
}

#[derive(Debug, Clone, Default)]
pub struct TupletsTracker {
    /// Started and not yet stopped, oldest first
    pending_tuplets: Vec<MxsrTuplet>,

    /// Stops keyed by their chord's first note sequential number
    pending_tuplets_stops: BTreeMap<u32, Vec<PendingTupletStop>>,

    opening_counter: u32,
}

impl TupletsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when tuplet `tuplet_number` is pending and began on `note_sequential_number`
    pub fn pending_begun_at(&self, tuplet_number: i32, note_sequential_number: u32) -> bool {
        self.pending_tuplets.iter().any(|tuplet| {
            tuplet.tuplet_number == tuplet_number
                && tuplet.begin_note.note_sequential_number == note_sequential_number
        })
    }

    /// Make a tuplet pending. A pending tuplet with the same number is
    /// displaced and returned.
    pub fn start(
        &mut self,
        tuplet_number: i32,
        begin_note: NotePosition,
        tuplet_factor: Option<Rational32>,
        input_line: u32,
    ) -> Option<MxsrTuplet> {
        let displaced = self
            .pending_tuplets
            .iter()
            .rposition(|tuplet| tuplet.tuplet_number == tuplet_number)
            .map(|index| self.pending_tuplets.remove(index));

        self.opening_counter += 1;
        self.pending_tuplets.push(MxsrTuplet {
            tuplet_number,
            opening_order: self.opening_counter,
            begin_note,
            tuplet_factor,
            input_line,
        });
        displaced
    }

    /// Queue a stop under `key`. Returns false for a stop already queued there
    /// with the same number.
    pub fn queue_stop(&mut self, key: u32, stop: PendingTupletStop) -> bool {
        let stops = self.pending_tuplets_stops.entry(key).or_default();
        if stops
            .iter()
            .any(|queued| queued.tuplet_number == stop.tuplet_number)
        {
            return false;
        }
        stops.push(stop);
        true
    }

    pub fn has_pending_stops(&self) -> bool {
        !self.pending_tuplets_stops.is_empty()
    }

    /// Match the queued stops against the pending tuplets, emptying the queue.
    /// Matched stops come innermost first, unmatched ones last.
    pub fn handle_pending_tuplets_stops_if_any(&mut self) -> Vec<TupletStopResolution> {
        let queued = std::mem::take(&mut self.pending_tuplets_stops);

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for stop in queued.into_values().flatten() {
            let index = match stop.tuplet_number {
                Some(number) => self
                    .pending_tuplets
                    .iter()
                    .rposition(|tuplet| tuplet.tuplet_number == number),
                None => self.pending_tuplets.len().checked_sub(1),
            };
            match index {
                Some(index) => matched.push((self.pending_tuplets.remove(index), stop)),
                None => unmatched.push(stop),
            }
        }

        matched.sort_by(|(a, _), (b, _)| b.opening_order.cmp(&a.opening_order));

        matched
            .into_iter()
            .map(|(tuplet, stop)| TupletStopResolution::Matched { tuplet, stop })
            .chain(unmatched.into_iter().map(TupletStopResolution::Unmatched))
            .collect()
    }

    /// Tuplets still pending, oldest first. Leaves the tracker empty.
    pub fn take_unterminated(&mut self) -> Vec<MxsrTuplet> {
        self.pending_tuplets_stops.clear();
        std::mem::take(&mut self.pending_tuplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(note_sequential_number: u32) -> NotePosition {
        NotePosition {
            note_sequential_number,
            staff_number: 1,
            voice_number: 1,
            input_start_line: note_sequential_number * 10,
            input_end_line: note_sequential_number * 10 + 9,
        }
    }

    fn stop(tuplet_number: Option<i32>, note_sequential_number: u32) -> PendingTupletStop {
        PendingTupletStop {
            tuplet_number,
            note_sequential_number,
            input_line: note_sequential_number * 10,
        }
    }

    fn matched_numbers(resolutions: &[TupletStopResolution]) -> Vec<i32> {
        resolutions
            .iter()
            .filter_map(|resolution| match resolution {
                TupletStopResolution::Matched { tuplet, .. } => Some(tuplet.tuplet_number),
                TupletStopResolution::Unmatched(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_nested_stops_come_out_innermost_first() {
        let mut tracker = TupletsTracker::new();
        tracker.start(1, at(1), None, 10);
        tracker.start(2, at(1), None, 10);

        // Outer stop listed first in the markup
        tracker.queue_stop(5, stop(Some(1), 5));
        tracker.queue_stop(5, stop(Some(2), 5));

        let resolutions = tracker.handle_pending_tuplets_stops_if_any();
        assert_eq!(matched_numbers(&resolutions), vec![2, 1]);
        assert!(tracker.take_unterminated().is_empty());
        assert!(!tracker.has_pending_stops());
    }

    #[test]
    fn test_number_takes_precedence_over_nesting() {
        let mut tracker = TupletsTracker::new();
        tracker.start(1, at(1), None, 10);
        tracker.start(2, at(2), None, 20);

        tracker.queue_stop(3, stop(Some(1), 3));
        let resolutions = tracker.handle_pending_tuplets_stops_if_any();

        assert_eq!(matched_numbers(&resolutions), vec![1]);
        assert!(tracker.pending_begun_at(2, 2));
        assert!(!tracker.pending_begun_at(1, 1));
    }

    #[test]
    fn test_stop_without_number_closes_last_opened() {
        let mut tracker = TupletsTracker::new();
        tracker.start(1, at(1), None, 10);
        tracker.start(3, at(2), None, 20);

        tracker.queue_stop(4, stop(None, 4));
        let resolutions = tracker.handle_pending_tuplets_stops_if_any();

        assert_eq!(matched_numbers(&resolutions), vec![3]);
    }

    #[test]
    fn test_unmatched_stop_is_reported() {
        let mut tracker = TupletsTracker::new();
        tracker.queue_stop(2, stop(Some(1), 2));

        let resolutions = tracker.handle_pending_tuplets_stops_if_any();
        assert_eq!(resolutions, vec![TupletStopResolution::Unmatched(stop(Some(1), 2))]);
    }

    #[test]
    fn test_duplicate_stop_under_one_key_is_ignored() {
        let mut tracker = TupletsTracker::new();
        assert!(tracker.queue_stop(7, stop(Some(1), 7)));
        assert!(!tracker.queue_stop(7, stop(Some(1), 8)));
        assert!(tracker.queue_stop(9, stop(Some(1), 9)));
    }

    #[test]
    fn test_restart_displaces_pending_tuplet() {
        let mut tracker = TupletsTracker::new();
        tracker.start(1, at(1), Some(Rational32::new(3, 2)), 10);

        let displaced = tracker.start(1, at(4), None, 40).unwrap();
        assert_eq!(displaced.begin_note.note_sequential_number, 1);
        assert!(tracker.pending_begun_at(1, 4));
        assert_eq!(tracker.take_unterminated().len(), 1);
    }
}
