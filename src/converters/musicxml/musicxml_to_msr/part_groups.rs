//! Part-group nesting resolution
//!
//! MusicXML brackets parts with `<part-group type="start|stop" number="n">`
//! markers. Numbers are reused once a group is stopped, and exporters do not
//! always stop groups in the reverse order they started them. Containment is
//! therefore decided on the *identity* of each group, an ordinal assigned at
//! every start, and only once the whole `<part-list>` has been seen.
//!
//! While streaming, starts and stops are recorded against the *position* they
//! occur at: the number of `<score-part>`s seen so far. At `</part-list>` the
//! positions are replayed in order:
//!
//! 1. the part at the previous position goes into the group on top of the stack
//! 2. groups stopping here are popped, innermost (highest identity) first, and
//!    nested into the new stack top
//! 3. groups starting here are pushed, outermost (latest stop) first
//! 4. groups started and stopped here, with no part in between, are nested
//!    into the innermost group open around them in the markup
//!
//! The implicit outermost group sits at the bottom of the stack and is never
//! popped. A group stopped while not on top of the stack overlaps another one:
//! it is taken out of the stack and attached to the implicit group.

use std::collections::BTreeMap;

use crate::msr::{MsrScore, PartGroupId, PartId};

use super::errors::ConversionError;
use super::types::WarningKind;
use super::wae::WaeHandler;

/// Identity of the implicit outermost part-group
pub const IMPLICIT_PART_GROUP_IDENTITY: i32 = 0;

/// Resolution bookkeeping for one part-group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxsrPartGroup {
    pub part_group_number: i32,
    pub identity: i32,
    pub msr_part_group: PartGroupId,

    pub start_position: usize,
    pub stop_position: Option<usize>,

    pub start_input_line: u32,
    pub stop_input_line: Option<u32>,
}

impl MxsrPartGroup {
    /// Position used to order groups starting together, outermost first
    fn stop_position_or_max(&self) -> usize {
        self.stop_position.unwrap_or(usize::MAX)
    }
}

/// Part-groups by identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MxsrPartGroupsList {
    identities: Vec<i32>,
}

impl MxsrPartGroupsList {
    pub fn push(&mut self, identity: i32) {
        self.identities.push(identity);
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.identities.iter().copied()
    }

    pub fn sort_by_decreasing_identity(&mut self) {
        self.identities.sort_by(|a, b| b.cmp(a));
    }

    /// Latest stop first, then lowest identity first
    fn sort_outermost_first(&mut self, part_groups: &[MxsrPartGroup]) {
        self.identities.sort_by_key(|&identity| {
            let stop = part_groups
                .get(identity as usize)
                .map_or(usize::MAX, MxsrPartGroup::stop_position_or_max);
            (std::cmp::Reverse(stop), identity)
        });
    }
}

/// Currently open part-groups, by identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MxsrPartGroupsStack {
    identities: Vec<i32>,
}

impl MxsrPartGroupsStack {
    pub fn push(&mut self, identity: i32) {
        self.identities.push(identity);
    }

    pub fn top(&self) -> Option<i32> {
        self.identities.last().copied()
    }

    pub fn pop(&mut self) -> Option<i32> {
        self.identities.pop()
    }

    pub fn contains(&self, identity: i32) -> bool {
        self.identities.contains(&identity)
    }

    pub fn remove(&mut self, identity: i32) {
        self.identities.retain(|&i| i != identity);
    }

    /// Bottom to top
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.identities.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }
}

/// All part-group state carried across one `<part-list>`
#[derive(Debug, Clone)]
pub struct PartGroupsResolver {
    /// Indexed by identity, the implicit part-group first
    part_groups_vector: Vec<MxsrPartGroup>,

    /// Identities of every part-group that used a number
    part_groups_map: BTreeMap<i32, Vec<i32>>,

    /// Number to identity of the open part-group using it
    started_part_groups_map: BTreeMap<i32, i32>,

    started_part_groups_lists_vector: Vec<MxsrPartGroupsList>,
    stopped_part_groups_lists_vector: Vec<MxsrPartGroupsList>,

    part_groups_stack: MxsrPartGroupsStack,

    /// Parts in `<score-part>` order
    parts_vector: Vec<PartId>,

    resolved: bool,
    trace: bool,
}

impl PartGroupsResolver {
    /// Seed the resolver with the implicit outermost part-group
    pub fn new(implicit_msr_part_group: PartGroupId, trace: bool) -> Self {
        let implicit = MxsrPartGroup {
            part_group_number: 0,
            identity: IMPLICIT_PART_GROUP_IDENTITY,
            msr_part_group: implicit_msr_part_group,
            start_position: 0,
            stop_position: None,
            start_input_line: 0,
            stop_input_line: None,
        };

        let mut part_groups_stack = MxsrPartGroupsStack::default();
        part_groups_stack.push(IMPLICIT_PART_GROUP_IDENTITY);

        Self {
            part_groups_vector: vec![implicit],
            part_groups_map: BTreeMap::new(),
            started_part_groups_map: BTreeMap::new(),
            started_part_groups_lists_vector: vec![MxsrPartGroupsList::default()],
            stopped_part_groups_lists_vector: vec![MxsrPartGroupsList::default()],
            part_groups_stack,
            parts_vector: Vec::new(),
            resolved: false,
            trace,
        }
    }

    /// Number of `<score-part>`s seen so far
    pub fn current_position(&self) -> usize {
        self.parts_vector.len()
    }

    /// Identity the next started part-group will get
    pub fn next_identity(&self) -> i32 {
        self.part_groups_vector.len() as i32
    }

    pub fn part_group(&self, identity: i32) -> Option<&MxsrPartGroup> {
        self.part_groups_vector.get(identity as usize)
    }

    /// Identities of every part-group that used `number`, in start order
    pub fn identities_for_number(&self, number: i32) -> &[i32] {
        self.part_groups_map
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Record a `<part-group type="start">`. Returns the new identity.
    pub fn start_part_group(
        &mut self,
        part_group_number: i32,
        msr_part_group: PartGroupId,
        input_line: u32,
        wae: &mut WaeHandler,
    ) -> i32 {
        let identity = self.next_identity();
        let position = self.current_position();

        if let Some(still_open) = self.started_part_groups_map.remove(&part_group_number) {
            wae.warning(
                WarningKind::UnstoppedPartGroup,
                input_line,
                format!(
                    "part-group {} started again while identity {} is still open, stopping the latter here",
                    part_group_number, still_open
                ),
            );
            self.record_stop(still_open, position, input_line);
        }

        self.part_groups_vector.push(MxsrPartGroup {
            part_group_number,
            identity,
            msr_part_group,
            start_position: position,
            stop_position: None,
            start_input_line: input_line,
            stop_input_line: None,
        });
        self.part_groups_map
            .entry(part_group_number)
            .or_default()
            .push(identity);
        self.started_part_groups_map.insert(part_group_number, identity);
        self.started_part_groups_lists_vector[position].push(identity);

        if self.trace {
            log::debug!(
                "Starting part-group {} (identity {}) at position {}, line {}",
                part_group_number,
                identity,
                position,
                input_line
            );
        }
        identity
    }

    /// Record a `<part-group type="stop">`. Returns the identity it stops, or
    /// `None` for an unmatched stop.
    pub fn stop_part_group(
        &mut self,
        part_group_number: i32,
        input_line: u32,
        wae: &mut WaeHandler,
    ) -> Option<i32> {
        let position = self.current_position();

        let Some(identity) = self.started_part_groups_map.remove(&part_group_number) else {
            wae.warning(
                WarningKind::UnmatchedPartGroupStop,
                input_line,
                format!(
                    "part-group {} stopped while not started, ignored",
                    part_group_number
                ),
            );
            return None;
        };

        self.record_stop(identity, position, input_line);

        if self.trace {
            log::debug!(
                "Stopping part-group {} (identity {}) at position {}, line {}",
                part_group_number,
                identity,
                position,
                input_line
            );
        }
        Some(identity)
    }

    fn record_stop(&mut self, identity: i32, position: usize, input_line: u32) {
        if let Some(part_group) = self.part_groups_vector.get_mut(identity as usize) {
            part_group.stop_position = Some(position);
            part_group.stop_input_line = Some(input_line);
        }
        self.stopped_part_groups_lists_vector[position].push(identity);
    }

    /// Record a `<score-part>`, which moves to the next position
    pub fn register_part(&mut self, part: PartId) {
        self.parts_vector.push(part);
        self.started_part_groups_lists_vector
            .push(MxsrPartGroupsList::default());
        self.stopped_part_groups_lists_vector
            .push(MxsrPartGroupsList::default());
    }

    /// Replay the recorded positions and build the part-group and part tree
    /// in `score`
    pub fn resolve(
        &mut self,
        score: &mut MsrScore,
        part_list_end_line: u32,
        wae: &mut WaeHandler,
    ) -> Result<(), ConversionError> {
        if self.resolved {
            return Err(ConversionError::InternalError(
                "part-groups resolved twice".to_string(),
            ));
        }
        let last_position = self.current_position();

        // Groups never stopped end with the part-list
        let still_open: Vec<(i32, i32)> = std::mem::take(&mut self.started_part_groups_map)
            .into_iter()
            .collect();
        for (number, identity) in still_open {
            wae.warning(
                WarningKind::UnstoppedPartGroup,
                part_list_end_line,
                format!(
                    "part-group {} (identity {}) not stopped, stopping it at the end of the part-list",
                    number, identity
                ),
            );
            self.record_stop(identity, last_position, part_list_end_line);
        }

        for list in &mut self.stopped_part_groups_lists_vector {
            list.sort_by_decreasing_identity();
        }
        let part_groups = &self.part_groups_vector;
        for list in &mut self.started_part_groups_lists_vector {
            list.sort_outermost_first(part_groups);
        }

        for position in 0..=last_position {
            if position > 0 {
                self.append_part_to_stack_top(score, position - 1)?;
            }
            let empty_part_groups = self.empty_part_groups_placement(position)?;
            self.handle_stopping_part_groups(score, position, wae)?;
            self.handle_starting_part_groups(position);
            for (empty, upper) in empty_part_groups {
                score.nest_part_group_in(empty, upper);
            }
        }

        if self.part_groups_stack.len() != 1
            || self.part_groups_stack.top() != Some(IMPLICIT_PART_GROUP_IDENTITY)
        {
            return Err(ConversionError::InternalError(format!(
                "{} part-groups left open after resolution",
                self.part_groups_stack.len().saturating_sub(1)
            )));
        }

        for part_group in self.part_groups_vector.iter().skip(1) {
            if let Some(msr_part_group) = score.part_group_mut(part_group.msr_part_group) {
                msr_part_group.input_stop_line = part_group.stop_input_line;
            }
        }

        self.resolved = true;
        Ok(())
    }

    fn msr_part_group_of(&self, identity: i32) -> Result<PartGroupId, ConversionError> {
        self.part_group(identity)
            .map(|part_group| part_group.msr_part_group)
            .ok_or_else(|| {
                ConversionError::InternalError(format!("no part-group with identity {}", identity))
            })
    }

    fn stack_top_msr_part_group(&self) -> Result<PartGroupId, ConversionError> {
        self.msr_part_group_of(
            self.part_groups_stack
                .top()
                .unwrap_or(IMPLICIT_PART_GROUP_IDENTITY),
        )
    }

    fn append_part_to_stack_top(
        &self,
        score: &mut MsrScore,
        part_index: usize,
    ) -> Result<(), ConversionError> {
        let part = self.parts_vector[part_index];
        let part_group = self.stack_top_msr_part_group()?;
        if self.trace {
            log::debug!("Appending part {:?} to part-group {:?}", part, part_group);
        }
        score.append_part_to_part_group(part_group, part);
        Ok(())
    }

    fn handle_stopping_part_groups(
        &mut self,
        score: &mut MsrScore,
        position: usize,
        wae: &mut WaeHandler,
    ) -> Result<(), ConversionError> {
        let stopping: Vec<i32> = self.stopped_part_groups_lists_vector[position].iter().collect();

        for identity in stopping {
            let (start_position, part_group_number, stop_line) = match self.part_group(identity) {
                Some(pg) => (
                    pg.start_position,
                    pg.part_group_number,
                    pg.stop_input_line.unwrap_or(0),
                ),
                None => continue,
            };
            let msr_part_group = self.msr_part_group_of(identity)?;

            if start_position == position {
                // Empty, placed by empty_part_groups_placement()
                continue;
            }
            if self.part_groups_stack.top() == Some(identity) {
                self.part_groups_stack.pop();
                let upper = self.stack_top_msr_part_group()?;
                if self.trace {
                    log::debug!(
                        "Nesting part-group {} (identity {}) in {:?}",
                        part_group_number,
                        identity,
                        upper
                    );
                }
                score.nest_part_group_in(msr_part_group, upper);
            } else if self.part_groups_stack.contains(identity) {
                wae.warning(
                    WarningKind::OverlappingPartGroups,
                    stop_line,
                    format!(
                        "part-group {} (identity {}) overlaps the part-group {}, attaching it to the implicit outermost part-group",
                        part_group_number,
                        identity,
                        self.part_groups_stack
                            .top()
                            .and_then(|top| self.part_group(top))
                            .map_or(0, |top| top.part_group_number)
                    ),
                );
                self.part_groups_stack.remove(identity);
                let implicit = self.msr_part_group_of(IMPLICIT_PART_GROUP_IDENTITY)?;
                score.nest_part_group_in(msr_part_group, implicit);
            }
        }
        Ok(())
    }

    /// Upper part-group of each group started and stopped at `position`, with
    /// no part in between. It is the innermost group open around it in the
    /// markup: opened before it, and not stopped before it. This has to be
    /// decided before the stops at `position` change the stack.
    fn empty_part_groups_placement(
        &self,
        position: usize,
    ) -> Result<Vec<(PartGroupId, PartGroupId)>, ConversionError> {
        let starting = &self.started_part_groups_lists_vector[position];
        let empties: Vec<&MxsrPartGroup> = starting
            .iter()
            .filter_map(|identity| self.part_group(identity))
            .filter(|pg| pg.stop_position == Some(position))
            .collect();
        if empties.is_empty() {
            return Ok(Vec::new());
        }

        // Outermost first: the stack, then the groups starting here, the
        // empty ones last by identity
        let candidates: Vec<&MxsrPartGroup> = self
            .part_groups_stack
            .iter()
            .chain(starting.iter())
            .filter_map(|identity| self.part_group(identity))
            .collect();

        let mut placement = Vec::with_capacity(empties.len());
        for empty in empties {
            let upper = candidates
                .iter()
                .rev()
                .find(|candidate| {
                    candidate.identity < empty.identity
                        && match candidate.stop_position {
                            None => true,
                            Some(stop) => {
                                stop > position || candidate.stop_input_line > empty.stop_input_line
                            }
                        }
                })
                .map_or(IMPLICIT_PART_GROUP_IDENTITY, |candidate| candidate.identity);

            if self.trace {
                log::debug!(
                    "Nesting empty part-group {} (identity {}) in identity {}",
                    empty.part_group_number,
                    empty.identity,
                    upper
                );
            }
            placement.push((empty.msr_part_group, self.msr_part_group_of(upper)?));
        }
        Ok(placement)
    }

    fn handle_starting_part_groups(&mut self, position: usize) {
        let starting: Vec<i32> = self.started_part_groups_lists_vector[position].iter().collect();

        for identity in starting {
            let empty = self
                .part_group(identity)
                .map_or(true, |pg| pg.stop_position == Some(position));
            if !empty {
                self.part_groups_stack.push(identity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msr::{MsrPart, MsrPartGroup, PartGroupElement};

    /// Drives a resolver the way the builder does
    struct Fixture {
        score: MsrScore,
        resolver: PartGroupsResolver,
        wae: WaeHandler,
        line: u32,
    }

    impl Fixture {
        fn new() -> Self {
            let score = MsrScore::new();
            let resolver = PartGroupsResolver::new(score.implicit_part_group_id(), false);
            Self {
                score,
                resolver,
                wae: WaeHandler::new("test"),
                line: 1,
            }
        }

        fn start(&mut self, number: i32) -> PartGroupId {
            self.line += 1;
            let identity = self.resolver.next_identity();
            let id = self
                .score
                .add_part_group(MsrPartGroup::new(number, identity, self.line));
            self.resolver
                .start_part_group(number, id, self.line, &mut self.wae);
            id
        }

        fn stop(&mut self, number: i32) {
            self.line += 1;
            self.resolver.stop_part_group(number, self.line, &mut self.wae);
        }

        fn part(&mut self, id: &str) -> PartId {
            self.line += 1;
            let part = self.score.add_part(MsrPart::new(id, self.line));
            self.resolver.register_part(part);
            part
        }

        fn resolve(&mut self) {
            self.line += 1;
            self.resolver
                .resolve(&mut self.score, self.line, &mut self.wae)
                .unwrap();
        }
    }

    #[test]
    fn test_flat_part_list_goes_into_implicit_group() {
        let mut f = Fixture::new();
        f.part("P1");
        f.part("P2");
        f.resolve();

        let implicit = f.score.implicit_part_group_id();
        assert_eq!(f.score.part_ids_in_group(implicit), vec!["P1", "P2"]);
        assert!(f.wae.warnings().is_empty());
    }

    #[test]
    fn test_reused_number_gives_distinct_siblings() {
        let mut f = Fixture::new();
        let first = f.start(1);
        f.part("P1");
        f.stop(1);
        let second = f.start(1);
        f.part("P2");
        f.stop(1);
        f.resolve();

        let implicit = f.score.implicit_part_group_id();
        assert_ne!(first, second);
        assert_eq!(f.score.upper_part_group(first), Some(implicit));
        assert_eq!(f.score.upper_part_group(second), Some(implicit));
        assert_eq!(f.score.part_ids_in_group(first), vec!["P1"]);
        assert_eq!(f.score.part_ids_in_group(second), vec!["P2"]);
        assert_eq!(f.resolver.identities_for_number(1), &[1, 2]);
    }

    #[test]
    fn test_non_fifo_stops_at_same_position_still_nest() {
        let mut f = Fixture::new();
        let outer = f.start(1);
        let inner = f.start(2);
        f.part("P1");
        f.part("P2");
        // Outer stopped first in the markup
        f.stop(1);
        f.stop(2);
        f.resolve();

        assert_eq!(f.score.upper_part_group(inner), Some(outer));
        assert_eq!(f.score.part_ids_in_group(inner), vec!["P1", "P2"]);
        assert!(f.wae.warnings().is_empty());
    }

    #[test]
    fn test_groups_starting_together_nest_by_stop_position() {
        let mut f = Fixture::new();
        let short = f.start(1);
        let long = f.start(2);
        f.part("P1");
        f.stop(1);
        f.part("P2");
        f.stop(2);
        f.resolve();

        assert_eq!(f.score.upper_part_group(short), Some(long));
        assert_eq!(
            f.score.part_group(long).unwrap().elements,
            vec![PartGroupElement::PartGroup(short), PartGroupElement::Part(PartId(1))]
        );
    }

    #[test]
    fn test_unmatched_stop_is_a_warning() {
        let mut f = Fixture::new();
        f.part("P1");
        f.stop(3);
        f.resolve();

        assert_eq!(f.wae.warnings().len(), 1);
        assert_eq!(f.wae.warnings()[0].kind, WarningKind::UnmatchedPartGroupStop);
    }

    #[test]
    fn test_overlapping_group_falls_back_to_implicit() {
        let mut f = Fixture::new();
        let first = f.start(1);
        f.part("P1");
        let second = f.start(2);
        f.part("P2");
        f.stop(1);
        f.part("P3");
        f.stop(2);
        f.resolve();

        let implicit = f.score.implicit_part_group_id();
        assert_eq!(f.score.upper_part_group(first), Some(implicit));
        assert_eq!(f.score.upper_part_group(second), Some(implicit));
        assert_eq!(f.score.part_ids_in_group(second), vec!["P2", "P3"]);
        assert_eq!(f.wae.warnings()[0].kind, WarningKind::OverlappingPartGroups);
    }

    #[test]
    fn test_unstopped_group_ends_with_part_list() {
        let mut f = Fixture::new();
        f.part("P1");
        let group = f.start(1);
        f.part("P2");
        f.resolve();

        assert_eq!(f.score.part_ids_in_group(group), vec!["P2"]);
        assert_eq!(f.wae.warnings()[0].kind, WarningKind::UnstoppedPartGroup);
    }

    #[test]
    fn test_empty_group_is_nested_where_it_appears() {
        let mut f = Fixture::new();
        let outer = f.start(1);
        f.part("P1");
        let empty = f.start(2);
        f.stop(2);
        f.stop(1);
        f.resolve();

        assert_eq!(f.score.upper_part_group(empty), Some(outer));
        assert!(f.score.part_ids_in_group(empty).is_empty());
    }

    #[test]
    fn test_empty_group_starting_with_its_upper_group() {
        let mut f = Fixture::new();
        let outer = f.start(1);
        let empty = f.start(2);
        f.stop(2);
        f.part("P1");
        f.stop(1);
        f.resolve();

        assert_eq!(f.score.upper_part_group(empty), Some(outer));
        assert_eq!(
            f.score.part_group(outer).unwrap().elements,
            vec![PartGroupElement::PartGroup(empty), PartGroupElement::Part(PartId(0))]
        );
        assert!(f.wae.warnings().is_empty());
    }

    #[test]
    fn test_empty_group_after_a_stop_goes_to_the_upper_group() {
        let mut f = Fixture::new();
        let group = f.start(1);
        f.part("P1");
        f.stop(1);
        let empty = f.start(2);
        let innermost = f.start(3);
        f.stop(3);
        f.stop(2);
        f.part("P2");
        f.resolve();

        let implicit = f.score.implicit_part_group_id();
        assert_eq!(f.score.upper_part_group(group), Some(implicit));
        assert_eq!(f.score.upper_part_group(empty), Some(implicit));
        assert_eq!(f.score.upper_part_group(innermost), Some(empty));
        assert_eq!(f.score.part_ids_in_group(implicit), vec!["P1", "P2"]);
    }
}
