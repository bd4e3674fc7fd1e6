use std::collections::HashSet;

use mxsr_skeleton::msr::{MsrScore, PartGroupElement, PartGroupId};
use mxsr_skeleton::{build_msr_skeleton, SkeletonResult, WarningKind};

/// Build a one-measure score from a part-list body
fn build(part_list: &str) -> SkeletonResult {
    let ids: Vec<&str> = part_list
        .split("<score-part id=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .collect();
    let parts: String = ids
        .iter()
        .map(|id| {
            format!(
                "  <part id=\"{}\"><measure number=\"1\"><note><rest/><duration>4</duration></note></measure></part>\n",
                id
            )
        })
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?>\n<score-partwise version=\"4.0\">\n  <part-list>\n{}\n  </part-list>\n{}</score-partwise>",
        part_list, parts
    );
    build_msr_skeleton(&xml, None).unwrap()
}

/// Every explicit group has one parent, no cycles, every part reachable
fn assert_forest(score: &MsrScore) {
    let implicit = score.implicit_part_group_id();
    let mut seen_groups = HashSet::new();
    let mut seen_parts = HashSet::new();
    let mut stack = vec![implicit];

    while let Some(id) = stack.pop() {
        assert!(seen_groups.insert(id), "part-group {:?} reached twice", id);
        for element in &score.part_group(id).unwrap().elements {
            match *element {
                PartGroupElement::PartGroup(sub) => {
                    assert_eq!(score.upper_part_group(sub), Some(id));
                    stack.push(sub);
                }
                PartGroupElement::Part(part) => {
                    assert!(seen_parts.insert(part), "part {:?} reached twice", part);
                }
            }
        }
    }

    assert_eq!(seen_groups.len(), score.part_groups.len());
    assert_eq!(seen_parts.len(), score.parts.len());
    assert_eq!(score.upper_part_group(implicit), None);
}

fn group_with_identity(score: &MsrScore, identity: i32) -> PartGroupId {
    score
        .explicit_part_groups()
        .find(|(_, group)| group.identity == identity)
        .map(|(id, _)| id)
        .unwrap()
}

#[test]
fn test_two_parts_in_one_group() {
    let result = build(
        r#"    <part-group type="start" number="1"/>
    <score-part id="P1"/>
    <score-part id="P2"/>
    <part-group type="stop" number="1"/>"#,
    );
    let score = &result.score;

    let groups: Vec<_> = score.explicit_part_groups().collect();
    assert_eq!(groups.len(), 1);
    let (group, _) = groups[0];

    assert_eq!(score.part_ids_in_group(group), vec!["P1", "P2"]);
    assert_eq!(score.upper_part_group(group), Some(score.implicit_part_group_id()));
    assert_eq!(
        score.implicit_part_group().elements,
        vec![PartGroupElement::PartGroup(group)]
    );
    assert_eq!(result.warnings_of_kind(WarningKind::UnmatchedPartGroupStop).count(), 0);
    assert!(result.warnings.is_empty());
    assert_forest(score);
}

#[test]
fn test_number_reuse_gives_distinct_identities() {
    let result = build(
        r#"    <part-group type="start" number="1"/>
    <score-part id="P1"/>
    <part-group type="stop" number="1"/>
    <part-group type="start" number="1"/>
    <score-part id="P2"/>
    <part-group type="stop" number="1"/>"#,
    );
    let score = &result.score;

    let first = group_with_identity(score, 1);
    let second = group_with_identity(score, 2);

    assert_eq!(score.part_group(first).unwrap().number, 1);
    assert_eq!(score.part_group(second).unwrap().number, 1);
    assert_eq!(score.part_ids_in_group(first), vec!["P1"]);
    assert_eq!(score.part_ids_in_group(second), vec!["P2"]);
    assert_eq!(score.upper_part_group(first), score.upper_part_group(second));
    assert!(result.warnings.is_empty());
    assert_forest(score);
}

#[test]
fn test_out_of_order_stop_nests_later_group_inside() {
    let result = build(
        r#"    <part-group type="start" number="1"/>
    <score-part id="P1"/>
    <part-group type="start" number="2"/>
    <score-part id="P2"/>
    <score-part id="P3"/>
    <part-group type="stop" number="1"/>
    <part-group type="stop" number="2"/>"#,
    );
    let score = &result.score;

    let a = group_with_identity(score, 1);
    let b = group_with_identity(score, 2);

    assert_eq!(score.upper_part_group(b), Some(a));
    assert_eq!(score.part_ids_in_group(a), vec!["P1", "P2", "P3"]);
    assert_eq!(score.part_ids_in_group(b), vec!["P2", "P3"]);
    assert!(result.warnings.is_empty());
    assert_forest(score);
}

#[test]
fn test_nested_groups_with_ungrouped_parts_around() {
    let result = build(
        r#"    <score-part id="Fl"/>
    <part-group type="start" number="1"><group-symbol>bracket</group-symbol></part-group>
    <part-group type="start" number="2"><group-symbol>brace</group-symbol></part-group>
    <score-part id="Vn1"/>
    <score-part id="Vn2"/>
    <part-group type="stop" number="2"/>
    <score-part id="Va"/>
    <part-group type="stop" number="1"/>
    <score-part id="Pf"/>"#,
    );
    let score = &result.score;
    let implicit = score.implicit_part_group_id();

    let strings = group_with_identity(score, 1);
    let violins = group_with_identity(score, 2);

    assert_eq!(score.part_ids_in_group(implicit), vec!["Fl", "Vn1", "Vn2", "Va", "Pf"]);
    assert_eq!(score.part_ids_in_group(strings), vec!["Vn1", "Vn2", "Va"]);
    assert_eq!(score.part_ids_in_group(violins), vec!["Vn1", "Vn2"]);
    assert_eq!(score.upper_part_group(violins), Some(strings));
    assert_eq!(score.part_by_id("Va").unwrap().part_group, Some(strings));
    assert_eq!(score.part_by_id("Pf").unwrap().part_group, Some(implicit));
    assert_forest(score);
}

#[test]
fn test_empty_group_keeps_its_place_among_groups_starting_together() {
    let result = build(
        r#"    <part-group type="start" number="1"/>
    <part-group type="start" number="2"/>
    <part-group type="stop" number="2"/>
    <score-part id="P1"/>
    <part-group type="stop" number="1"/>"#,
    );
    let score = &result.score;
    assert_forest(score);

    let outer = group_with_identity(score, 1);
    let empty = group_with_identity(score, 2);
    assert_eq!(score.upper_part_group(empty), Some(outer));
    assert_eq!(score.upper_part_group(outer), Some(score.implicit_part_group_id()));
    assert!(score.part_ids_in_group(empty).is_empty());
    assert_eq!(score.part_ids_in_group(outer), vec!["P1"]);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_unmatched_stop_is_tolerated() {
    let result = build(
        r#"    <score-part id="P1"/>
    <part-group type="stop" number="4"/>
    <score-part id="P2"/>"#,
    );

    assert_eq!(result.warnings_of_kind(WarningKind::UnmatchedPartGroupStop).count(), 1);
    assert_eq!(result.warnings[0].line, 5);
    assert_eq!(
        result.score.part_ids_in_group(result.score.implicit_part_group_id()),
        vec!["P1", "P2"]
    );
    assert_forest(&result.score);
}

#[test]
fn test_overlapping_groups_fall_back_to_implicit_group() {
    let result = build(
        r#"    <part-group type="start" number="1"/>
    <score-part id="P1"/>
    <part-group type="start" number="2"/>
    <score-part id="P2"/>
    <part-group type="stop" number="1"/>
    <score-part id="P3"/>
    <part-group type="stop" number="2"/>"#,
    );
    let score = &result.score;
    let implicit = score.implicit_part_group_id();

    let first = group_with_identity(score, 1);
    let second = group_with_identity(score, 2);

    assert_eq!(result.warnings_of_kind(WarningKind::OverlappingPartGroups).count(), 1);
    assert_eq!(score.upper_part_group(first), Some(implicit));
    assert_eq!(score.upper_part_group(second), Some(implicit));
    assert_forest(score);
}

#[test]
fn test_part_group_without_type_is_fatal() {
    let xml = r#"<score-partwise><part-list><part-group number="1"/><score-part id="P1"/></part-list></score-partwise>"#;
    assert!(build_msr_skeleton(xml, None).is_err());
}
