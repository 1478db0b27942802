//! Property-based tests for matching and temporal activation.
//!
//! The automaton matcher is checked against a brute-force reference that
//! compares every pattern at every token position, and activation windows
//! are checked against a plain `Vec` model of each pattern's records.

use std::collections::{HashMap, HashSet};

use ngramdb_core::{DuplicatePolicy, Engine, NgramConfig, Timestamp, NO_MATCH};
use proptest::prelude::*;

fn token_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["a", "b", "c", "dd"])
}

fn pattern_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(token_strategy(), 1..=3)
}

fn document_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "dd", "zz"]), 0..=12)
}

fn policy_strategy() -> impl Strategy<Value = DuplicatePolicy> {
    prop_oneof![
        Just(DuplicatePolicy::Independent),
        Just(DuplicatePolicy::Overwrite)
    ]
}

fn engine(policy: DuplicatePolicy) -> Engine {
    let mut config = NgramConfig::small();
    config.automaton.duplicate_policy = policy;
    // Small limit so random fan-outs exercise the hashed edge representation.
    config.automaton.linear_edge_limit = 2;
    Engine::new(config).expect("engine")
}

/// Reference matcher: every pattern tried at every token start.
fn brute_force(patterns: &[String], document: &[&str]) -> String {
    let mut offsets = Vec::with_capacity(document.len());
    let mut offset = 0;
    for token in document {
        offsets.push(offset);
        offset += token.len() + 1;
    }

    let mut found: Vec<(usize, usize, &str)> = Vec::new();
    for pattern in patterns {
        let tokens: Vec<&str> = pattern.split(' ').collect();
        for start in 0..document.len() {
            let end = start + tokens.len();
            if end <= document.len() && document[start..end] == tokens[..] {
                found.push((offsets[start], pattern.len(), pattern.as_str()));
            }
        }
    }
    found.sort_by_key(|&(start, len, _)| (start, len));

    let mut seen = HashSet::new();
    let parts: Vec<&str> = found
        .into_iter()
        .filter(|(_, _, text)| seen.insert(*text))
        .map(|(_, _, text)| text)
        .collect();
    if parts.is_empty() {
        NO_MATCH.to_string()
    } else {
        parts.join("|")
    }
}

/// Reference model of one pattern's temporal records.
#[derive(Default)]
struct RecordModel {
    windows: Vec<(Timestamp, Timestamp)>,
}

impl RecordModel {
    fn add(&mut self, policy: DuplicatePolicy, t: Timestamp) {
        let mut window = (t, Timestamp::MAX);
        if policy == DuplicatePolicy::Overwrite {
            if let Some(open) = self.windows.iter_mut().find(|(_, to)| *to == Timestamp::MAX) {
                if open.0 == t {
                    return;
                }
                if open.0 < t {
                    open.1 = t;
                } else {
                    window.1 = open.0;
                }
            }
        }
        self.windows.push(window);
    }

    fn delete(&mut self, policy: DuplicatePolicy, t: Timestamp) -> bool {
        let window = match policy {
            DuplicatePolicy::Independent => self
                .windows
                .iter_mut()
                .find(|(from, to)| *to == Timestamp::MAX && *from < t),
            DuplicatePolicy::Overwrite => self
                .windows
                .iter_mut()
                .find(|(from, to)| *from < t && t < *to),
        };
        match window {
            Some(window) => {
                window.1 = t;
                true
            }
            None => false,
        }
    }

    fn is_active(&self, t: Timestamp) -> bool {
        self.windows.iter().any(|&(from, to)| from <= t && t < to)
    }
}

const TEXTS: [&str; 3] = ["p q", "p", "r s t"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the streaming matcher agrees with the brute-force reference
    #[test]
    fn prop_matcher_equals_brute_force(
        patterns in prop::collection::vec(pattern_strategy(), 1..=8),
        document in document_strategy(),
    ) {
        let engine = engine(DuplicatePolicy::Independent);
        let texts: Vec<String> = patterns.iter().map(|p| p.join(" ")).collect();
        for text in &texts {
            engine.load_initial(text).expect("load");
        }

        let doc = document.join(" ");
        prop_assert_eq!(engine.query(&doc, 1), brute_force(&texts, &document));
    }

    /// Property: a pattern is reported at t iff one of its windows contains t
    #[test]
    fn prop_activation_invariant(
        policy in policy_strategy(),
        ops in prop::collection::vec((any::<bool>(), 0usize..TEXTS.len()), 1..=30),
    ) {
        let engine = engine(policy);
        let mut models: HashMap<usize, RecordModel> = HashMap::new();

        for (i, &(is_add, which)) in ops.iter().enumerate() {
            let t = i as Timestamp + 1;
            let model = models.entry(which).or_default();
            if is_add {
                engine.add(TEXTS[which], t).expect("add");
                model.add(policy, t);
            } else {
                let expected = model.delete(policy, t);
                prop_assert_eq!(engine.delete(TEXTS[which], t), expected);
            }
        }

        for t in 0..=(ops.len() as Timestamp + 1) {
            for (which, text) in TEXTS.iter().enumerate() {
                let expected = models.get(&which).is_some_and(|m| m.is_active(t));
                let line = engine.query(text, t);
                let reported = line.split('|').any(|m| m == *text);
                prop_assert_eq!(reported, expected, "pattern {:?} at t={}", text, t);
            }
        }
    }

    /// Property: every reported part is a substring of the document, listed once
    #[test]
    fn prop_result_parts_are_unique_substrings(
        patterns in prop::collection::vec(pattern_strategy(), 1..=8),
        document in document_strategy(),
    ) {
        let engine = engine(DuplicatePolicy::Independent);
        for pattern in &patterns {
            engine.load_initial(&pattern.join(" ")).expect("load");
        }

        let doc = document.join(" ");
        let line = engine.query(&doc, 1);
        if line != NO_MATCH {
            let parts: Vec<&str> = line.split('|').collect();
            let unique: HashSet<&str> = parts.iter().copied().collect();
            prop_assert_eq!(unique.len(), parts.len());
            for part in parts {
                prop_assert!(doc.contains(part));
            }
        }
    }
}
