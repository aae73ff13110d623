//! Rebasing step batches over steps they did not account for.
//!
//! A batch is a sequence of steps where each step's positions assume the
//! previous ones applied. To carry a batch over foreign steps, the batch
//! is unwound (inverted maps, last step first), the foreign maps are
//! crossed, and each step is re-applied in order; mirror pairs between a
//! step's unwound and re-applied maps let later steps keep positions that
//! pointed inside earlier steps' content.

use crate::map::Mapping;
use crate::step::Step;
use vellum_doc::{DocError, Document};
use vellum_schema::Schema;

/// The outcome of rebasing a batch.
#[derive(Clone, Debug)]
pub struct RebasedBatch {
    /// Surviving steps, rebased and applied in order.
    pub steps: Vec<Step>,
    /// The document after all surviving steps.
    pub doc: Document,
    /// Maps positions from before the unwind (the batch's original local
    /// frame) to the rebased frame; used to carry anchors across.
    pub mapping: Mapping,
    /// Steps whose target range was entirely consumed; they became no-ops.
    pub dropped: usize,
    /// Steps that survived mapping but failed to apply, with their batch
    /// index. A non-empty list means the batch cannot be committed
    /// atomically by a caller that requires all-or-nothing semantics.
    pub failed: Vec<(usize, DocError)>,
}

/// Rebase `batch` so it applies on top of `target_doc`.
///
/// `foreign` maps positions from the batch's base frame to `target_doc`:
/// the step maps of every log entry the batch has not seen, or a previous
/// rebase's output mapping when rebases are chained. The batch's own
/// steps may be based on any prefix of each other (the usual case: each
/// step was made on top of the previous one).
pub fn rebase_batch(
    schema: &Schema,
    target_doc: &Document,
    foreign: &Mapping,
    batch: &[Step],
) -> RebasedBatch {
    let n = batch.len();
    let mut mapping = Mapping::new();

    // Unwind the batch, last step first; invert(batch[i]) sits at n-1-i.
    for step in batch.iter().rev() {
        mapping.append(step.step_map().invert());
    }
    mapping.append_mapping(foreign);

    let mut doc = target_doc.clone();
    let mut steps = Vec::with_capacity(n);
    let mut dropped = 0;
    let mut failed = Vec::new();

    for (i, step) in batch.iter().enumerate() {
        // Step i already accounts for batch[0..i]; it only crosses the
        // inversions of batch[i-1..=0] (indices n-i..) and everything after.
        let mapped = match step.map_from(&mapping, n - i) {
            Some(mapped) => mapped,
            None => {
                dropped += 1;
                continue;
            }
        };
        match mapped.apply(schema, &doc) {
            Ok(next) => {
                doc = next;
                let applied = mapping.append(mapped.step_map());
                mapping.set_mirror(n - 1 - i, applied);
                steps.push(mapped);
            }
            Err(err) => failed.push((i, err)),
        }
    }

    RebasedBatch {
        steps,
        doc,
        mapping,
        dropped,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vellum_doc::{DocId, Fragment, Node};

    fn schema() -> Schema {
        Schema::hypertext()
    }

    fn doc(text: &str) -> Document {
        Document::from_root(
            DocId::from_string("doc-1"),
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

    #[test]
    fn test_rebase_insert_over_delete() {
        // "Hello world": a delete of "Hello " was accepted first; an
        // insert of "!" at 11 rebases to position 5.
        let base = doc("Hello world");
        let foreign_step = Step::Delete { from: 0, to: 6 };
        let current = foreign_step.apply(&schema(), &base).unwrap();

        let rebased = rebase_batch(
            &schema(),
            &current,
            &Mapping::from_maps(vec![foreign_step.step_map()]),
            &[Step::insert_text(11, "!")],
        );
        assert!(rebased.failed.is_empty());
        assert_eq!(rebased.dropped, 0);
        assert_eq!(rebased.doc.text(), "world!");
        assert_eq!(
            rebased.steps,
            vec![Step::Insert {
                at: 5,
                content: Fragment::text("!")
            }]
        );
    }

    #[test]
    fn test_rebase_empty_foreign_is_identity() {
        let base = doc("Hello");
        let batch = vec![Step::insert_text(5, "!"), Step::insert_text(6, "?")];
        let rebased = rebase_batch(&schema(), &base, &Mapping::new(), &batch);
        assert_eq!(rebased.steps, batch);
        assert_eq!(rebased.doc.text(), "Hello!?");
    }

    #[test]
    fn test_rebase_multi_step_batch_keeps_internal_offsets() {
        // The batch inserts "abc" then a "!" inside it; a foreign insert
        // at the front must shift both without tearing them apart.
        let base = doc("01234");
        let foreign_step = Step::insert_text(0, "ZZ");
        let current = foreign_step.apply(&schema(), &base).unwrap();

        let batch = vec![Step::insert_text(2, "abc"), Step::insert_text(4, "!")];
        let rebased = rebase_batch(
            &schema(),
            &current,
            &Mapping::from_maps(vec![foreign_step.step_map()]),
            &batch,
        );
        assert!(rebased.failed.is_empty());
        assert_eq!(rebased.dropped, 0);
        // Locally the batch produced "01ab!c234"; rebased it must be the
        // same text shifted behind "ZZ".
        assert_eq!(rebased.doc.text(), "ZZ01ab!c234");
    }

    #[test]
    fn test_rebase_drops_delete_of_removed_range() {
        let base = doc("Hello world");
        let foreign_step = Step::Delete { from: 0, to: 11 };
        let current = foreign_step.apply(&schema(), &base).unwrap();

        let rebased = rebase_batch(
            &schema(),
            &current,
            &Mapping::from_maps(vec![foreign_step.step_map()]),
            &[Step::Delete { from: 2, to: 7 }],
        );
        assert_eq!(rebased.dropped, 1);
        assert!(rebased.steps.is_empty());
        assert_eq!(rebased.doc.text(), "");
    }

    #[test]
    fn test_rebase_mapping_carries_anchors() {
        // An annotation anchored on "world" survives a batch rebase of an
        // unrelated edit.
        let base = doc("Hello world");
        let foreign_step = Step::Delete { from: 0, to: 6 };
        let current = foreign_step.apply(&schema(), &base).unwrap();

        let rebased = rebase_batch(
            &schema(),
            &current,
            &Mapping::from_maps(vec![foreign_step.step_map()]),
            &[Step::insert_text(11, "!")],
        );
        use crate::map::Bias;
        assert_eq!(rebased.mapping.map(6, Bias::After), 0);
        assert_eq!(rebased.mapping.map(11, Bias::Before), 5);
    }
}
