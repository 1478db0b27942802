//! Tests for `automaton` module - concurrent token trie with temporal records.

use std::sync::Arc;
use std::thread;

use super::automaton::*;
use super::config::{AutomatonConfig, DuplicatePolicy};
use super::error::Error;
use super::types::{NodeId, TokenId};

fn config(policy: DuplicatePolicy) -> AutomatonConfig {
    AutomatonConfig {
        max_nodes: 10_000,
        linear_edge_limit: 4,
        duplicate_policy: policy,
    }
}

fn ids(raw: &[u32]) -> Vec<TokenId> {
    raw.iter().copied().map(TokenId).collect()
}

#[test]
fn test_new_automaton_has_only_root() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");

    assert_eq!(automaton.node_count(), 1);
    let root = automaton.node(NodeId::ROOT).expect("root");
    assert!(!root.is_terminal());
    assert_eq!(automaton.step(NodeId::ROOT, TokenId(0)), None);
}

#[test]
fn test_add_pattern_creates_path_and_terminal() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");

    let terminal = automaton.add_pattern(&ids(&[1, 2, 3]), 0, 5).expect("add");

    assert_eq!(automaton.node_count(), 4);
    assert_eq!(automaton.find_path(&ids(&[1, 2, 3])), Some(terminal));
    assert_eq!(automaton.active_length(terminal, 0), Some(5));

    // Intermediate nodes are not terminal.
    let prefix = automaton.find_path(&ids(&[1, 2])).expect("prefix node");
    assert_eq!(automaton.active_length(prefix, 0), None);
    assert!(!automaton.node(prefix).expect("node").is_terminal());
}

#[test]
fn test_shared_prefix_reuses_nodes() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");

    let ab = automaton.add_pattern(&ids(&[1, 2]), 0, 4).expect("add");
    let ac = automaton.add_pattern(&ids(&[1, 3]), 0, 4).expect("add");

    assert_ne!(ab, ac);
    // root + "a" + "b" + "c"
    assert_eq!(automaton.node_count(), 4);
    let a = automaton.step(NodeId::ROOT, TokenId(1)).expect("edge a");
    assert_eq!(automaton.node(a).expect("node").fan_out(), 2);
}

#[test]
fn test_empty_pattern_is_rejected() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");

    let err = automaton.add_pattern(&[], 0, 0).expect_err("empty");
    assert!(matches!(err, Error::EmptyPattern));
    assert_eq!(automaton.find_path(&[]), None);
}

#[test]
fn test_deactivate_closes_window() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");
    let node = automaton.add_pattern(&ids(&[7, 8]), 1, 3).expect("add");

    assert!(automaton.deactivate(node, 3));
    assert_eq!(automaton.active_length(node, 2), Some(3));
    assert_eq!(automaton.active_length(node, 3), None);
    assert_eq!(automaton.active_length(node, 4), None);

    // Already inactive: no-op.
    assert!(!automaton.deactivate(node, 5));
    assert!(!automaton.deactivate(NodeId::ROOT, 5));
    assert!(!automaton.deactivate(NodeId(9_999), 5));
}

#[test]
fn test_independent_duplicates_close_one_at_a_time() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");
    let first = automaton.add_pattern(&ids(&[1]), 1, 1).expect("add");
    let second = automaton.add_pattern(&ids(&[1]), 2, 1).expect("add");

    assert_eq!(first, second);
    assert_eq!(automaton.node(first).expect("node").record_count(), 2);

    assert!(automaton.deactivate(first, 3));
    assert_eq!(automaton.active_length(first, 4), Some(1));

    assert!(automaton.deactivate(first, 5));
    assert_eq!(automaton.active_length(first, 6), None);
    // History is preserved: the second instance was live at 4.
    assert_eq!(automaton.active_length(first, 4), Some(1));
}

#[test]
fn test_overwrite_keeps_one_open_record_and_history() {
    // Arrange
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Overwrite), 100)
        .expect("automaton");
    let node = automaton.add_pattern(&ids(&[1]), 1, 1).expect("add");

    // Act
    automaton.add_pattern(&ids(&[1]), 3, 1).expect("add");

    // Assert: the first window is closed at the re-add, not erased.
    assert_eq!(automaton.node(node).expect("node").record_count(), 2);
    assert_eq!(automaton.active_length(node, 2), Some(1));
    assert_eq!(automaton.active_length(node, 3), Some(1));

    // One delete closes the only open record.
    assert!(automaton.deactivate(node, 4));
    assert!(!automaton.deactivate(node, 5));
    assert_eq!(automaton.active_length(node, 4), None);
    assert_eq!(automaton.active_length(node, 2), Some(1));
}

#[test]
fn test_overwrite_readd_at_same_timestamp_is_noop() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Overwrite), 100)
        .expect("automaton");
    let node = automaton.add_pattern(&ids(&[1]), 0, 1).expect("add");
    automaton.add_pattern(&ids(&[1]), 0, 1).expect("add");

    assert_eq!(automaton.node(node).expect("node").record_count(), 1);
    assert!(automaton.deactivate(node, 1));
    assert_eq!(automaton.active_length(node, 1), None);
}

#[test]
fn test_overwrite_older_readd_ends_before_open_record() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Overwrite), 100)
        .expect("automaton");
    let node = automaton.add_pattern(&ids(&[1]), 5, 1).expect("add");
    automaton.add_pattern(&ids(&[1]), 2, 1).expect("add");

    assert_eq!(automaton.active_length(node, 1), None);
    assert_eq!(automaton.active_length(node, 3), Some(1));
    assert!(automaton.deactivate(node, 7));
    assert_eq!(automaton.active_length(node, 7), None);
    assert_eq!(automaton.active_length(node, 6), Some(1));
}

#[test]
fn test_fan_out_promotion_preserves_edges() {
    let automaton = PatternAutomaton::new(&config(DuplicatePolicy::Independent), 100)
        .expect("automaton");

    let mut terminals = Vec::new();
    for t in 10..20 {
        terminals.push(automaton.add_pattern(&ids(&[1, t]), 0, 3).expect("add"));
    }

    let hub = automaton.step(NodeId::ROOT, TokenId(1)).expect("hub");
    let hub_node = automaton.node(hub).expect("node");
    assert!(hub_node.has_hashed_edges());
    assert_eq!(hub_node.fan_out(), 10);
    assert_eq!(automaton.promotion_count(), 1);

    for (t, terminal) in (10..20).zip(terminals) {
        assert_eq!(automaton.step(hub, TokenId(t)), Some(terminal));
    }
}

#[test]
fn test_node_capacity_exhaustion_is_fatal() {
    let cfg = AutomatonConfig {
        max_nodes: 3,
        ..config(DuplicatePolicy::Independent)
    };
    let automaton = PatternAutomaton::new(&cfg, 100).expect("automaton");

    automaton.add_pattern(&ids(&[1, 2]), 0, 3).expect("fits");
    let err = automaton.add_pattern(&ids(&[5]), 0, 1).expect_err("full");

    assert!(matches!(err, Error::AutomatonFull { capacity: 3 }));
    assert!(err.is_fatal());
    // Existing structure is untouched.
    assert!(automaton.find_path(&ids(&[1, 2])).is_some());
}

#[test]
fn test_nodes_span_multiple_chunks() {
    let automaton = PatternAutomaton::new(
        &AutomatonConfig {
            max_nodes: 20_000,
            ..config(DuplicatePolicy::Independent)
        },
        10_000,
    )
    .expect("automaton");

    // A single long pattern crosses the 4096-node chunk boundary.
    let tokens: Vec<TokenId> = (0..9_000).map(TokenId).collect();
    let terminal = automaton.add_pattern(&tokens, 0, 1).expect("add");

    assert_eq!(automaton.node_count(), 9_001);
    assert_eq!(automaton.find_path(&tokens), Some(terminal));
}

#[test]
fn test_concurrent_add_same_patterns_converge() {
    let automaton = Arc::new(
        PatternAutomaton::new(
            &AutomatonConfig {
                max_nodes: 100_000,
                ..config(DuplicatePolicy::Independent)
            },
            1_000,
        )
        .expect("automaton"),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let automaton = Arc::clone(&automaton);
        handles.push(thread::spawn(move || {
            let mut terminals = Vec::new();
            for a in 0..20u32 {
                for b in 0..20u32 {
                    terminals.push(
                        automaton
                            .add_pattern(&[TokenId(a), TokenId(b)], 0, 3)
                            .expect("add"),
                    );
                }
            }
            terminals
        }));
    }

    let results: Vec<Vec<NodeId>> = handles
        .into_iter()
        .map(|h| h.join().expect("thread join"))
        .collect();

    // Every thread resolved every pattern to the same terminal.
    for other in &results[1..] {
        assert_eq!(&results[0], other);
    }
    // root + 20 first-level + 400 second-level nodes, no duplicates.
    assert_eq!(automaton.node_count(), 1 + 20 + 400);
}
