//! Annotation and selection overlay.
//!
//! Anchors are plain positions and must be re-mapped every time the tree
//! changes. An annotation whose range is entirely consumed by deletions
//! is retained as a zero-width marker at the deletion point and flagged
//! collapsed; callers that want such markers gone use
//! [`Overlay::purge_collapsed`].

use crate::message::ClientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;
use vellum_step::{Bias, Mapping};

/// Unique identifier for an annotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A threaded comment anchored to a document range.
///
/// The author is an opaque caller-supplied string and the timestamp is
/// caller-supplied milliseconds; the engine interprets neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub author: String,
    pub timestamp_ms: u64,
    pub text: String,
    /// Anchor range `[from, to)`, relative to the current version.
    pub from: usize,
    pub to: usize,
    /// The anchor range was entirely consumed by deletions.
    pub collapsed: bool,
}

impl Annotation {
    pub fn new(
        author: impl Into<String>,
        timestamp_ms: u64,
        text: impl Into<String>,
        from: usize,
        to: usize,
    ) -> Self {
        Self {
            id: AnnotationId::new(),
            author: author.into(),
            timestamp_ms,
            text: text.into(),
            from,
            to,
            collapsed: from == to,
        }
    }
}

/// A client's cursor: anchor and head positions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub client: ClientId,
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn caret(client: ClientId, pos: usize) -> Self {
        Self {
            client,
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(client: ClientId, anchor: usize, head: usize) -> Self {
        Self {
            client,
            anchor,
            head,
        }
    }

    /// The covered range in document order.
    pub fn ordered(&self) -> (usize, usize) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }
}

/// All anchors tracked against one document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    annotations: BTreeMap<AnnotationId, Annotation>,
    selections: BTreeMap<ClientId, Selection>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id.clone();
        self.annotations.insert(id.clone(), annotation);
        id
    }

    pub fn remove_annotation(&mut self, id: &AnnotationId) -> Option<Annotation> {
        self.annotations.remove(id)
    }

    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selections.insert(selection.client.clone(), selection);
    }

    pub fn remove_selection(&mut self, client: &ClientId) -> Option<Selection> {
        self.selections.remove(client)
    }

    pub fn selection(&self, client: &ClientId) -> Option<&Selection> {
        self.selections.get(client)
    }

    pub fn selections(&self) -> impl Iterator<Item = &Selection> {
        self.selections.values()
    }

    /// Re-map every anchor through the positional effect of applied steps.
    ///
    /// Annotation starts map with [`Bias::After`] and ends with
    /// [`Bias::Before`], so content inserted exactly at a boundary stays
    /// outside the annotated range. A range that reaches zero width is
    /// flagged collapsed at its deletion point.
    pub fn map_through(&mut self, mapping: &Mapping) {
        for annotation in self.annotations.values_mut() {
            let from = mapping.map(annotation.from, Bias::After);
            let to = mapping.map(annotation.to, Bias::Before);
            if to <= from {
                let point = to.min(from);
                annotation.from = point;
                annotation.to = point;
                annotation.collapsed = true;
            } else {
                annotation.from = from;
                annotation.to = to;
            }
        }
        for selection in self.selections.values_mut() {
            if selection.anchor == selection.head {
                // A caret moves as one point; content inserted at it
                // pushes it after.
                let point = mapping.map(selection.head, Bias::After);
                selection.anchor = point;
                selection.head = point;
            } else {
                selection.anchor = mapping.map(selection.anchor, Bias::Before);
                selection.head = mapping.map(selection.head, Bias::After);
            }
        }
    }

    /// Drop every collapsed annotation, returning them.
    pub fn purge_collapsed(&mut self) -> Vec<Annotation> {
        let collapsed: Vec<AnnotationId> = self
            .annotations
            .values()
            .filter(|a| a.collapsed)
            .map(|a| a.id.clone())
            .collect();
        collapsed
            .into_iter()
            .filter_map(|id| self.annotations.remove(&id))
            .collect()
    }
}
