//! Access evaluation tests
//!
//! Covers the decision rules end to end against hand-built snapshots:
//! - fail-open for principals without groups and for unloaded rules
//! - uncovered paths
//! - nested subtrees (deepest secured ancestor governs)
//! - duplicate secured roots (later rule wins)

mod common;

use common::{groups, path};
use keepout::content::NodeId;
use keepout::rules::{AccessDecision, AccessEvaluator, Rule, RuleSnapshot, RuleStore, evaluate};
use rstest::rstest;
use std::sync::Arc;

fn rule(root: i64, denied: &[&str], target: i64) -> Rule {
    Rule {
        secured_root: NodeId(root),
        denied_groups: denied.iter().map(|g| g.to_string()).collect(),
        no_access_target: NodeId(target),
        coverage_label: "keepout".into(),
        creation_order: 0,
        definition_node: NodeId(0),
    }
}

fn snapshot(rules: Vec<Rule>) -> RuleSnapshot {
    RuleSnapshot::new(NodeId(2), false, rules, vec![])
}

fn deny(target: i64, root: i64) -> AccessDecision {
    AccessDecision::Deny {
        redirect_target: NodeId(target),
        secured_root: NodeId(root),
    }
}

// =============================================================================
// Single rule scenario: root=10, denies Editors, redirects to 99
// =============================================================================

#[rstest]
#[case::covered_denied_group(&[1, 10, 30, 55], &["Editors"], deny(99, 10))]
#[case::covered_other_group(&[1, 10, 30, 55], &["Writers"], AccessDecision::Allow)]
#[case::uncovered_path(&[1, 20, 55], &["Editors"], AccessDecision::Allow)]
#[case::mixed_groups(&[1, 10, 30, 55], &["Writers", "Editors"], deny(99, 10))]
#[case::secured_root_itself(&[1, 10], &["Editors"], deny(99, 10))]
#[case::ancestor_of_root(&[1], &["Editors"], AccessDecision::Allow)]
#[case::no_groups(&[1, 10, 30, 55], &[], AccessDecision::Allow)]
fn test_single_rule(
    #[case] ids: &[i64],
    #[case] member_of: &[&str],
    #[case] expected: AccessDecision,
) {
    let snapshot = snapshot(vec![rule(10, &["Editors"], 99)]);
    assert_eq!(evaluate(&snapshot, &path(ids), &groups(member_of)), expected);
}

// =============================================================================
// Nested rules: A=10 denies G1, B=30 (under A) denies G2
// =============================================================================

#[rstest]
#[case::inner_rule_ignores_outer_group(&[1, 10, 30, 55], &["G1"], AccessDecision::Allow)]
#[case::inner_rule_denies_its_group(&[1, 10, 30, 55], &["G2"], deny(98, 30))]
#[case::outer_rule_above_inner(&[1, 10, 20], &["G1"], deny(99, 10))]
#[case::outer_rule_ignores_inner_group(&[1, 10, 20], &["G2"], AccessDecision::Allow)]
fn test_nested_rules(
    #[case] ids: &[i64],
    #[case] member_of: &[&str],
    #[case] expected: AccessDecision,
) {
    let snapshot = snapshot(vec![rule(10, &["G1"], 99), rule(30, &["G2"], 98)]);
    assert_eq!(evaluate(&snapshot, &path(ids), &groups(member_of)), expected);
}

#[test]
fn test_deeper_root_wins_regardless_of_creation_order() {
    let inner_first = snapshot(vec![rule(30, &["G2"], 98), rule(10, &["G1"], 99)]);
    let outer_first = snapshot(vec![rule(10, &["G1"], 99), rule(30, &["G2"], 98)]);

    for snapshot in [&inner_first, &outer_first] {
        assert_eq!(
            evaluate(snapshot, &path(&[1, 10, 30, 55]), &groups(&["G1", "G2"])),
            deny(98, 30)
        );
        assert!(evaluate(snapshot, &path(&[1, 10, 30, 55]), &groups(&["G1"])).is_allowed());
    }
}

#[test]
fn test_duplicate_root_later_rule_wins() {
    let snapshot = snapshot(vec![rule(10, &["Editors"], 99), rule(10, &["Writers"], 98)]);

    assert!(evaluate(&snapshot, &path(&[1, 10, 55]), &groups(&["Editors"])).is_allowed());
    assert_eq!(
        evaluate(&snapshot, &path(&[1, 10, 55]), &groups(&["Writers"])),
        deny(98, 10)
    );
}

#[test]
fn test_rule_without_groups_never_denies() {
    let snapshot = snapshot(vec![rule(10, &[], 99)]);
    assert!(evaluate(&snapshot, &path(&[1, 10, 55]), &groups(&["Editors"])).is_allowed());
}

#[test]
fn test_virtual_root_in_path_is_harmless() {
    let snapshot = snapshot(vec![rule(10, &["Editors"], 99)]);
    let path: keepout::content::PathAncestry = "-1,1,10,30,55".parse().unwrap();
    assert_eq!(evaluate(&snapshot, &path, &groups(&["Editors"])), deny(99, 10));
}

// =============================================================================
// Through the store
// =============================================================================

#[test]
fn test_uninitialized_store_allows_everyone() {
    let evaluator = AccessEvaluator::new(Arc::new(RuleStore::new()));
    for member_of in [&["Editors"][..], &["Writers"][..], &[][..]] {
        assert!(
            evaluator
                .check(&path(&[1, 10, 30, 55]), &groups(member_of))
                .is_allowed()
        );
    }
}

#[test]
fn test_evaluator_sees_replaced_snapshot() {
    let store = Arc::new(RuleStore::new());
    let evaluator = AccessEvaluator::new(store.clone());
    let request = path(&[1, 10, 30, 55]);
    let editors = groups(&["Editors"]);

    assert!(evaluator.check(&request, &editors).is_allowed());

    store.replace(snapshot(vec![rule(10, &["Editors"], 99)]));
    assert_eq!(evaluator.check(&request, &editors), deny(99, 10));

    store.replace(snapshot(vec![]));
    assert!(evaluator.check(&request, &editors).is_allowed());
}
