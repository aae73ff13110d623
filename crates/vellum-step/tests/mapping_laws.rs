//! Property tests for the mapping and inversion laws.
//!
//! These are the algebraic guarantees the whole synchronization protocol
//! leans on: mapping a position forward through a step and back through
//! its inverse is the identity outside deleted content, and applying a
//! step followed by its inverse restores the original tree.

use proptest::prelude::*;
use std::collections::BTreeMap;
use vellum_doc::{DocId, Document, Fragment, Node};
use vellum_schema::Schema;
use vellum_step::{Bias, Mapping, Step};

fn doc(text: &str) -> Document {
    Document::from_root(
        DocId::from_string("prop-doc"),
        Node::with_children(
            "doc",
            BTreeMap::new(),
            vec![Node::with_children(
                "paragraph",
                BTreeMap::new(),
                vec![Node::text(text)],
            )],
        ),
    )
}

fn step_strategy(len: usize) -> impl Strategy<Value = Step> {
    let insert = (0..=len, "[a-z]{1,8}")
        .prop_map(|(at, text)| Step::insert_text(at, text));
    let delete = (0..len, 1..=len).prop_map(move |(from, span)| Step::Delete {
        from,
        to: (from + span).min(len).max(from + 1),
    });
    let replace = (0..len, 1..=len, "[a-z]{0,6}")
        .prop_map(move |(from, span, text)| Step::Replace {
            from,
            to: (from + span).min(len).max(from),
            content: Fragment::text(text),
        });
    prop_oneof![insert, delete, replace]
}

proptest! {
    #[test]
    fn map_then_invert_is_identity_outside_deleted_span(
        step in step_strategy(20),
        pos in 0usize..=21,
    ) {
        let map = step.step_map();
        let inv = map.invert();
        let (from, to) = (map.from, map.from + map.old_len);

        if pos < from || pos > to {
            let there = map.map(pos, Bias::Before);
            prop_assert_eq!(inv.map(there, Bias::Before), pos);
            let there = map.map(pos, Bias::After);
            prop_assert_eq!(inv.map(there, Bias::After), pos);
        } else if pos > from && pos < to {
            // Inside the deleted span both directions collapse to the
            // same boundary.
            let there = map.map(pos, Bias::Before);
            prop_assert_eq!(there, from);
            prop_assert_eq!(inv.map(there, Bias::Before), from);
        }
    }

    #[test]
    fn apply_then_invert_restores_tree(
        text in "[a-zA-Z ]{1,24}",
        step in step_strategy(8),
    ) {
        let schema = Schema::hypertext();
        let base = doc(&text);

        // Only exercise steps that fit this document.
        if let Ok(applied) = step.apply(&schema, &base) {
            let inverse = step.invert(&base).unwrap();
            let restored = inverse.apply(&schema, &applied).unwrap();
            prop_assert_eq!(restored.text(), base.text());
        }
    }

    #[test]
    fn mapping_is_monotone(
        step in step_strategy(20),
        a in 0usize..=21,
        b in 0usize..=21,
    ) {
        prop_assume!(a <= b);
        let mapping = Mapping::from_maps(vec![step.step_map()]);
        prop_assert!(mapping.map(a, Bias::Before) <= mapping.map(b, Bias::Before));
        prop_assert!(mapping.map(a, Bias::After) <= mapping.map(b, Bias::After));
    }

    #[test]
    fn insert_length_shifts_suffix_exactly(
        at in 0usize..=11,
        text in "[a-z]{1,6}",
    ) {
        let step = Step::insert_text(at, text.clone());
        let map = step.step_map();
        // Every position after the insertion point shifts by the length.
        for pos in (at + 1)..=12 {
            prop_assert_eq!(map.map(pos, Bias::Before), pos + text.chars().count());
        }
        for pos in 0..at {
            prop_assert_eq!(map.map(pos, Bias::Before), pos);
        }
    }
}
