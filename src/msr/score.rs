//! MSR score: owner of the part-group and part arenas

use serde::{Deserialize, Serialize};

use super::identification::{MsrCredit, MsrIdentification};
use super::part_groups::{MsrPartGroup, PartGroupElement, PartGroupId};
use super::parts::{MsrPart, PartId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrScore {
    pub identification: MsrIdentification,
    pub credits: Vec<MsrCredit>,

    /// Part-group arena, the implicit outermost part-group first
    pub part_groups: Vec<MsrPartGroup>,

    /// Part arena, in `<score-part>` order
    pub parts: Vec<MsrPart>,

    /// Largest measure count among the parts
    pub measures_count: u32,
}

impl Default for MsrScore {
    fn default() -> Self {
        Self::new()
    }
}

impl MsrScore {
    /// Create a score holding only the implicit outermost part-group
    pub fn new() -> Self {
        Self {
            identification: MsrIdentification::default(),
            credits: Vec::new(),
            part_groups: vec![MsrPartGroup::implicit_outermost()],
            parts: Vec::new(),
            measures_count: 0,
        }
    }

    pub fn implicit_part_group_id(&self) -> PartGroupId {
        PartGroupId(0)
    }

    pub fn implicit_part_group(&self) -> &MsrPartGroup {
        &self.part_groups[0]
    }

    pub fn add_part_group(&mut self, part_group: MsrPartGroup) -> PartGroupId {
        self.part_groups.push(part_group);
        PartGroupId(self.part_groups.len() - 1)
    }

    pub fn add_part(&mut self, part: MsrPart) -> PartId {
        self.parts.push(part);
        PartId(self.parts.len() - 1)
    }

    pub fn part_group(&self, id: PartGroupId) -> Option<&MsrPartGroup> {
        self.part_groups.get(id.0)
    }

    pub fn part_group_mut(&mut self, id: PartGroupId) -> Option<&mut MsrPartGroup> {
        self.part_groups.get_mut(id.0)
    }

    pub fn part(&self, id: PartId) -> Option<&MsrPart> {
        self.parts.get(id.0)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut MsrPart> {
        self.parts.get_mut(id.0)
    }

    pub fn find_part(&self, part_id: &str) -> Option<PartId> {
        self.parts.iter().position(|part| part.id == part_id).map(PartId)
    }

    pub fn part_by_id(&self, part_id: &str) -> Option<&MsrPart> {
        self.find_part(part_id).and_then(|id| self.part(id))
    }

    /// Explicit part-groups, in start order
    pub fn explicit_part_groups(&self) -> impl Iterator<Item = (PartGroupId, &MsrPartGroup)> {
        self.part_groups
            .iter()
            .enumerate()
            .filter(|(_, part_group)| !part_group.implicit)
            .map(|(index, part_group)| (PartGroupId(index), part_group))
    }

    pub fn append_part_to_part_group(&mut self, part_group: PartGroupId, part: PartId) {
        if let Some(msr_part) = self.parts.get_mut(part.0) {
            msr_part.part_group = Some(part_group);
        }
        if let Some(msr_part_group) = self.part_groups.get_mut(part_group.0) {
            msr_part_group.elements.push(PartGroupElement::Part(part));
        }
    }

    /// Make `sub` an element of `upper`
    pub fn nest_part_group_in(&mut self, sub: PartGroupId, upper: PartGroupId) {
        if sub == upper {
            return;
        }
        if let Some(sub_part_group) = self.part_groups.get_mut(sub.0) {
            sub_part_group.upper_part_group = Some(upper);
        }
        if let Some(upper_part_group) = self.part_groups.get_mut(upper.0) {
            upper_part_group
                .elements
                .push(PartGroupElement::PartGroup(sub));
        }
    }

    pub fn upper_part_group(&self, id: PartGroupId) -> Option<PartGroupId> {
        self.part_group(id).and_then(|pg| pg.upper_part_group)
    }

    /// Parts reachable from `id`, in document order
    pub fn parts_in_group(&self, id: PartGroupId) -> Vec<PartId> {
        let mut result = Vec::new();
        self.collect_parts(id, &mut result);
        result
    }

    fn collect_parts(&self, id: PartGroupId, result: &mut Vec<PartId>) {
        let Some(part_group) = self.part_group(id) else {
            return;
        };
        for element in &part_group.elements {
            match *element {
                PartGroupElement::Part(part) => result.push(part),
                PartGroupElement::PartGroup(sub) => self.collect_parts(sub, result),
            }
        }
    }

    /// Ids of the parts of part-group `id`, as MusicXML id strings
    pub fn part_ids_in_group(&self, id: PartGroupId) -> Vec<&str> {
        self.parts_in_group(id)
            .into_iter()
            .filter_map(|part| self.part(part))
            .map(|part| part.id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_score_has_only_the_implicit_part_group() {
        let score = MsrScore::new();

        assert_eq!(score.part_groups.len(), 1);
        assert!(score.implicit_part_group().implicit);
        assert_eq!(score.explicit_part_groups().count(), 0);
    }

    #[test]
    fn test_parts_in_group_descends_into_sub_groups() {
        let mut score = MsrScore::new();
        let implicit = score.implicit_part_group_id();
        let strings = score.add_part_group(MsrPartGroup::new(1, 1, 4));
        let violins = score.add_part(MsrPart::new("P1", 5));
        let cellos = score.add_part(MsrPart::new("P2", 6));
        let flute = score.add_part(MsrPart::new("P3", 7));

        score.append_part_to_part_group(strings, violins);
        score.append_part_to_part_group(strings, cellos);
        score.nest_part_group_in(strings, implicit);
        score.append_part_to_part_group(implicit, flute);

        assert_eq!(score.part_ids_in_group(implicit), vec!["P1", "P2", "P3"]);
        assert_eq!(score.upper_part_group(strings), Some(implicit));
        assert_eq!(score.part_by_id("P2").and_then(|p| p.part_group), Some(strings));
    }
}
