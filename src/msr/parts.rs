//! MSR parts, staves and voices

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::part_groups::PartGroupId;

/// Index of a part in [`MsrScore::parts`](super::MsrScore)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceKind {
    Regular,
    Harmonies,
    FiguredBass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrVoice {
    pub number: i32,
    pub kind: VoiceKind,

    /// Ordinal of a regular voice within its part, assigned when the part ends
    pub regular_voice_ordinal: Option<u32>,

    /// Stanza numbers of the lyrics attached to the voice
    pub stanza_numbers: BTreeSet<String>,

    pub input_line: u32,
}

impl MsrVoice {
    pub fn new(number: i32, kind: VoiceKind, input_line: u32) -> Self {
        Self {
            number,
            kind,
            regular_voice_ordinal: None,
            stanza_numbers: BTreeSet::new(),
            input_line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrStaff {
    pub number: i32,
    pub voices: BTreeMap<i32, MsrVoice>,
    pub input_line: u32,
}

impl MsrStaff {
    pub fn new(number: i32, input_line: u32) -> Self {
        Self {
            number,
            voices: BTreeMap::new(),
            input_line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrPart {
    /// MusicXML `<score-part id>`
    pub id: String,

    pub name: Option<String>,
    pub name_display_text: Option<String>,
    pub abbreviation: Option<String>,
    pub abbreviation_display_text: Option<String>,
    pub instrument_name: Option<String>,
    pub instrument_abbreviation: Option<String>,

    /// Containing part-group, set when the part-list has been resolved
    pub part_group: Option<PartGroupId>,

    pub staves: BTreeMap<i32, MsrStaff>,
    pub harmonies_voice: Option<MsrVoice>,
    pub figured_bass_voice: Option<MsrVoice>,

    pub measures_count: u32,
    pub input_line: u32,
}

impl MsrPart {
    pub fn new(id: impl Into<String>, input_line: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            name_display_text: None,
            abbreviation: None,
            abbreviation_display_text: None,
            instrument_name: None,
            instrument_abbreviation: None,
            part_group: None,
            staves: BTreeMap::new(),
            harmonies_voice: None,
            figured_bass_voice: None,
            measures_count: 0,
            input_line,
        }
    }

    /// Returns true when the staff was created by this call
    pub fn create_staff_if_not_yet_done(&mut self, staff_number: i32, input_line: u32) -> bool {
        if self.staves.contains_key(&staff_number) {
            return false;
        }
        log::debug!("Creating staff {} in part \"{}\"", staff_number, self.id);
        self.staves
            .insert(staff_number, MsrStaff::new(staff_number, input_line));
        true
    }

    /// Staff holding regular voice `voice_number`, if that voice exists
    pub fn regular_voice_staff(&self, voice_number: i32) -> Option<i32> {
        self.staves
            .values()
            .find(|staff| staff.voices.contains_key(&voice_number))
            .map(|staff| staff.number)
    }

    /// Create regular voice `voice_number` in staff `staff_number` unless the
    /// part already has that voice, in whichever staff. Returns true when the
    /// voice was created by this call.
    pub fn create_regular_voice_in_staff_if_not_yet_done(
        &mut self,
        staff_number: i32,
        voice_number: i32,
        input_line: u32,
    ) -> bool {
        if self.regular_voice_staff(voice_number).is_some() {
            return false;
        }
        self.create_staff_if_not_yet_done(staff_number, input_line);
        let part_id = &self.id;
        if let Some(staff) = self.staves.get_mut(&staff_number) {
            log::debug!(
                "Creating voice {} in staff {} of part \"{}\"",
                voice_number,
                staff_number,
                part_id
            );
            staff.voices.insert(
                voice_number,
                MsrVoice::new(voice_number, VoiceKind::Regular, input_line),
            );
            return true;
        }
        false
    }

    pub fn regular_voice_mut(&mut self, voice_number: i32) -> Option<&mut MsrVoice> {
        self.staves
            .values_mut()
            .find_map(|staff| staff.voices.get_mut(&voice_number))
    }

    pub fn regular_voice(&self, voice_number: i32) -> Option<&MsrVoice> {
        self.staves
            .values()
            .find_map(|staff| staff.voices.get(&voice_number))
    }

    pub fn create_harmonies_voice_if_not_yet_done(&mut self, input_line: u32) -> bool {
        if self.harmonies_voice.is_some() {
            return false;
        }
        log::debug!("Creating harmonies voice in part \"{}\"", self.id);
        self.harmonies_voice = Some(MsrVoice::new(0, VoiceKind::Harmonies, input_line));
        true
    }

    pub fn create_figured_bass_voice_if_not_yet_done(&mut self, input_line: u32) -> bool {
        if self.figured_bass_voice.is_some() {
            return false;
        }
        log::debug!("Creating figured bass voice in part \"{}\"", self.id);
        self.figured_bass_voice = Some(MsrVoice::new(0, VoiceKind::FiguredBass, input_line));
        true
    }

    /// Number regular voices 1.. in (staff, voice) order
    pub fn assign_regular_voice_ordinals(&mut self) {
        let mut ordinal = 0;
        for staff in self.staves.values_mut() {
            for voice in staff.voices.values_mut() {
                ordinal += 1;
                voice.regular_voice_ordinal = Some(ordinal);
            }
        }
    }

    pub fn regular_voices_count(&self) -> usize {
        self.staves.values().map(|staff| staff.voices.len()).sum()
    }
}

impl fmt::Display for MsrPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part \"{}\"", self.id)?;
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_created_once_per_part() {
        let mut part = MsrPart::new("P1", 3);

        assert!(part.create_regular_voice_in_staff_if_not_yet_done(1, 1, 10));
        assert!(!part.create_regular_voice_in_staff_if_not_yet_done(2, 1, 12));

        assert_eq!(part.regular_voice_staff(1), Some(1));
        assert_eq!(part.regular_voices_count(), 1);
        // No staff is created on behalf of an existing voice
        assert!(part.staves.get(&2).is_none());
    }

    #[test]
    fn test_regular_voice_ordinals_follow_staff_order() {
        let mut part = MsrPart::new("P1", 3);
        part.create_regular_voice_in_staff_if_not_yet_done(2, 5, 10);
        part.create_regular_voice_in_staff_if_not_yet_done(1, 2, 11);
        part.create_regular_voice_in_staff_if_not_yet_done(1, 1, 12);

        part.assign_regular_voice_ordinals();

        assert_eq!(part.regular_voice(1).and_then(|v| v.regular_voice_ordinal), Some(1));
        assert_eq!(part.regular_voice(2).and_then(|v| v.regular_voice_ordinal), Some(2));
        assert_eq!(part.regular_voice(5).and_then(|v| v.regular_voice_ordinal), Some(3));
    }
}
