//! Atomic, invertible edit steps.

use crate::map::{Bias, Mapping, StepMap};
use serde::{Deserialize, Serialize};
use vellum_doc::{Document, Fragment, Mark, Result as DocResult};
use vellum_schema::Schema;

/// An atomic edit operation over a document tree.
///
/// All positions are flat offsets valid against the tree the step was
/// created for; a step meant for a later version must be rebased through
/// the intervening steps first (see [`Step::map`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Insert content at a position.
    Insert { at: usize, content: Fragment },
    /// Delete the range `[from, to)`.
    Delete { from: usize, to: usize },
    /// Replace the range `[from, to)` with new content.
    Replace {
        from: usize,
        to: usize,
        content: Fragment,
    },
    /// Add a mark across `[from, to)`.
    AddMark { from: usize, to: usize, mark: Mark },
    /// Remove a mark (matched by full value) across `[from, to)`.
    RemoveMark { from: usize, to: usize, mark: Mark },
}

impl Step {
    /// Convenience constructor for a plain-text insertion.
    pub fn insert_text(at: usize, text: impl Into<String>) -> Step {
        Step::Insert {
            at,
            content: Fragment::text(text),
        }
    }

    /// Apply this step, producing a new tree that is validated against the
    /// schema before it is returned. The input document is never mutated.
    pub fn apply(&self, schema: &Schema, doc: &Document) -> DocResult<Document> {
        let next = match self {
            Step::Insert { at, content } => doc.splice(schema, *at, *at, content)?,
            Step::Delete { from, to } => doc.splice(schema, *from, *to, &Fragment::new())?,
            Step::Replace { from, to, content } => doc.splice(schema, *from, *to, content)?,
            Step::AddMark { from, to, mark } => doc.add_mark(schema, *from, *to, mark)?,
            Step::RemoveMark { from, to, mark } => doc.remove_mark(schema, *from, *to, mark)?,
        };
        next.validate(schema)?;
        Ok(next)
    }

    /// Compute the exact inverse against the pre-application tree.
    ///
    /// Deletions must consult the tree to remember what they removed;
    /// mark steps invert to their counterpart over the same range.
    pub fn invert(&self, doc_before: &Document) -> DocResult<Step> {
        Ok(match self {
            Step::Insert { at, content } => Step::Delete {
                from: *at,
                to: *at + content.flat_len(),
            },
            Step::Delete { from, to } => Step::Insert {
                at: *from,
                content: doc_before.slice(*from, *to)?,
            },
            Step::Replace { from, to, content } => Step::Replace {
                from: *from,
                to: *from + content.flat_len(),
                content: doc_before.slice(*from, *to)?,
            },
            Step::AddMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
        })
    }

    /// This step's effect on positions.
    pub fn step_map(&self) -> StepMap {
        match self {
            Step::Insert { at, content } => StepMap::new(*at, 0, content.flat_len()),
            Step::Delete { from, to } => StepMap::new(*from, to - from, 0),
            Step::Replace { from, to, content } => {
                StepMap::new(*from, to - from, content.flat_len())
            }
            Step::AddMark { .. } | Step::RemoveMark { .. } => StepMap::identity(),
        }
    }

    /// Rebase this step through a mapping, starting at map index `start`.
    ///
    /// Returns `None` when the step's target range was entirely consumed
    /// by the steps being crossed, leaving it with no effect. Insertions
    /// always survive: a position inside deleted content collapses to the
    /// deletion point, so the inserted content lands at the boundary.
    pub fn map_from(&self, mapping: &Mapping, start: usize) -> Option<Step> {
        match self {
            Step::Insert { at, content } => Some(Step::Insert {
                at: mapping.map_from(start, *at, Bias::After),
                content: content.clone(),
            }),
            Step::Delete { from, to } => {
                let from = mapping.map_from(start, *from, Bias::After);
                let to = mapping.map_from(start, *to, Bias::Before).max(from);
                (from < to).then_some(Step::Delete { from, to })
            }
            Step::Replace { from, to, content } => {
                let from = mapping.map_from(start, *from, Bias::After);
                let to = mapping.map_from(start, *to, Bias::Before).max(from);
                if from == to && content.is_empty() {
                    return None;
                }
                Some(Step::Replace {
                    from,
                    to,
                    content: content.clone(),
                })
            }
            Step::AddMark { from, to, mark } => {
                let from = mapping.map_from(start, *from, Bias::After);
                let to = mapping.map_from(start, *to, Bias::Before).max(from);
                (from < to).then_some(Step::AddMark {
                    from,
                    to,
                    mark: mark.clone(),
                })
            }
            Step::RemoveMark { from, to, mark } => {
                let from = mapping.map_from(start, *from, Bias::After);
                let to = mapping.map_from(start, *to, Bias::Before).max(from);
                (from < to).then_some(Step::RemoveMark {
                    from,
                    to,
                    mark: mark.clone(),
                })
            }
        }
    }

    /// Rebase this step through a whole mapping.
    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        self.map_from(mapping, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vellum_doc::{DocId, Node};

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
    fn test_apply_insert() {
        let out = Step::insert_text(5, "!").apply(&schema(), &doc("Hello")).unwrap();
        assert_eq!(out.text(), "Hello!");
    }

    #[test]
    fn test_apply_delete() {
        let out = Step::Delete { from: 0, to: 6 }
            .apply(&schema(), &doc("Hello world"))
            .unwrap();
        assert_eq!(out.text(), "world");
    }

    #[test]
    fn test_apply_replace() {
        let out = Step::Replace {
            from: 6,
            to: 11,
            content: Fragment::text("there"),
        }
        .apply(&schema(), &doc("Hello world"))
        .unwrap();
        assert_eq!(out.text(), "Hello there");
    }

    #[test]
    fn test_apply_out_of_bounds_fails() {
        assert!(Step::Delete { from: 0, to: 99 }
            .apply(&schema(), &doc("Hello"))
            .is_err());
    }

    #[test]
    fn test_invert_insert() {
        let base = doc("Hello world");
        let step = Step::insert_text(5, " big");
        let applied = step.apply(&schema(), &base).unwrap();
        let inverse = step.invert(&base).unwrap();
        let restored = inverse.apply(&schema(), &applied).unwrap();
        assert_eq!(restored.text(), base.text());
    }

    #[test]
    fn test_invert_delete_restores_content() {
        let base = doc("Hello world");
        let step = Step::Delete { from: 0, to: 6 };
        let applied = step.apply(&schema(), &base).unwrap();
        let inverse = step.invert(&base).unwrap();
        assert_eq!(
            inverse,
            Step::Insert {
                at: 0,
                content: Fragment::text("Hello ")
            }
        );
        let restored = inverse.apply(&schema(), &applied).unwrap();
        assert_eq!(restored.text(), base.text());
    }

    #[test]
    fn test_invert_replace() {
        let base = doc("Hello world");
        let step = Step::Replace {
            from: 6,
            to: 11,
            content: Fragment::text("there, friend"),
        };
        let applied = step.apply(&schema(), &base).unwrap();
        let restored = step
            .invert(&base)
            .unwrap()
            .apply(&schema(), &applied)
            .unwrap();
        assert_eq!(restored.text(), base.text());
        assert_eq!(restored, base);
    }

    #[test]
    fn test_invert_marks() {
        let base = doc("Hello world");
        let step = Step::AddMark {
            from: 0,
            to: 5,
            mark: Mark::new("strong"),
        };
        let applied = step.apply(&schema(), &base).unwrap();
        let restored = step
            .invert(&base)
            .unwrap()
            .apply(&schema(), &applied)
            .unwrap();
        assert_eq!(restored, base);
    }

    #[test]
    fn test_map_insert_through_delete() {
        // The concrete rebase from the protocol: Insert(11, "!") after
        // Delete(0, 6) lands at 5.
        let mapping = Mapping::from_maps(vec![StepMap::new(0, 6, 0)]);
        let mapped = Step::insert_text(11, "!").map(&mapping).unwrap();
        assert_eq!(
            mapped,
            Step::Insert {
                at: 5,
                content: Fragment::text("!")
            }
        );
    }

    #[test]
    fn test_map_delete_inside_deleted_range_is_noop() {
        let mapping = Mapping::from_maps(vec![StepMap::new(0, 11, 0)]);
        assert_eq!(Step::Delete { from: 2, to: 7 }.map(&mapping), None);
    }

    #[test]
    fn test_map_mark_step_positions_only() {
        let mapping = Mapping::from_maps(vec![StepMap::new(0, 6, 0)]);
        let mapped = Step::AddMark {
            from: 6,
            to: 11,
            mark: Mark::new("em"),
        }
        .map(&mapping)
        .unwrap();
        assert_eq!(
            mapped,
            Step::AddMark {
                from: 0,
                to: 5,
                mark: Mark::new("em")
            }
        );
    }

    #[test]
    fn test_mark_steps_do_not_move_positions() {
        let step = Step::AddMark {
            from: 2,
            to: 8,
            mark: Mark::new("strong"),
        };
        assert!(step.step_map().is_identity());
    }
}
