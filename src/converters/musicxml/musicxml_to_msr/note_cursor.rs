//! Current and previous note of a voice
//!
//! Staff changes are only known one note late: the note that leaves a staff
//! looks like any other until the next note of its voice shows up on another
//! staff. The cursor keeps both notes so the take-off can be keyed to the
//! previous note and the landing to the current one.

use crate::mxsr::NotePosition;

/// What the builder knows about a note once its `</note>` is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSnapshot {
    pub sequential_number: u32,
    pub input_start_line: u32,
    pub input_end_line: u32,
    pub staff_number: i32,
    pub voice_number: i32,
    pub is_grace: bool,
    pub is_cue: bool,
    pub is_chord_member: bool,
    pub is_rest: bool,
}

impl NoteSnapshot {
    pub fn position(&self) -> NotePosition {
        NotePosition {
            note_sequential_number: self.sequential_number,
            staff_number: self.staff_number,
            voice_number: self.voice_number,
            input_start_line: self.input_start_line,
            input_end_line: self.input_end_line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffChange {
    pub take_off: NoteSnapshot,
    pub landing: NoteSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteCursor {
    current: Option<NoteSnapshot>,
    previous: Option<NoteSnapshot>,
}

impl NoteCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `note`, reporting a staff change from the previous note
    pub fn advance(&mut self, note: NoteSnapshot) -> Option<StaffChange> {
        self.previous = self.current.replace(note);
        self.staff_change()
    }

    pub fn current(&self) -> Option<NoteSnapshot> {
        self.current
    }

    pub fn previous(&self) -> Option<NoteSnapshot> {
        self.previous
    }

    pub fn staff_change(&self) -> Option<StaffChange> {
        match (self.previous, self.current) {
            (Some(take_off), Some(landing)) if take_off.staff_number != landing.staff_number => {
                Some(StaffChange { take_off, landing })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(sequential_number: u32, staff_number: i32) -> NoteSnapshot {
        NoteSnapshot {
            sequential_number,
            input_start_line: sequential_number * 10,
            input_end_line: sequential_number * 10 + 8,
            staff_number,
            voice_number: 1,
            is_grace: false,
            is_cue: false,
            is_chord_member: false,
            is_rest: false,
        }
    }

    #[test]
    fn test_first_note_is_never_a_staff_change() {
        let mut cursor = NoteCursor::new();
        assert_eq!(cursor.advance(note(1, 2)), None);
        assert_eq!(cursor.previous(), None);
    }

    #[test]
    fn test_staff_change_is_reported_one_note_late() {
        let mut cursor = NoteCursor::new();
        cursor.advance(note(1, 1));

        let change = cursor.advance(note(2, 2)).unwrap();
        assert_eq!(change.take_off.sequential_number, 1);
        assert_eq!(change.landing.sequential_number, 2);
        assert_eq!(change.take_off.input_start_line, 10);
        assert_eq!(change.landing.input_start_line, 20);

        let back = cursor.advance(note(3, 1)).unwrap();
        assert_eq!(back.take_off.staff_number, 2);
        assert_eq!(back.landing.staff_number, 1);

        assert_eq!(cursor.advance(note(4, 1)), None);
    }
}
