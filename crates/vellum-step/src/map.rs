//! Position mapping across steps.
//!
//! Every step describes its effect on positions as a [`StepMap`]: one span
//! of the old document replaced by a span of the new one. Folding step
//! maps in order maps a position across any step sequence; mirror pairs
//! let a position that sat inside temporarily-removed content (an unwound
//! step during rebasing) recover its offset inside the re-applied copy.

use serde::{Deserialize, Serialize};

/// Resolves the ambiguity of a position sitting exactly at an edit
/// boundary: `Before` keeps it in front of inserted content, `After`
/// pushes it behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Before,
    After,
}

/// The positional effect of one step: the span starting at `from` of
/// length `old_len` became a span of length `new_len`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMap {
    pub from: usize,
    pub old_len: usize,
    pub new_len: usize,
}

/// The result of mapping a position through one step map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position sat strictly inside the replaced span.
    pub deleted: bool,
    /// Offset into the replaced span, kept for mirror recovery.
    pub recover: Option<usize>,
}

impl StepMap {
    pub fn new(from: usize, old_len: usize, new_len: usize) -> Self {
        Self {
            from,
            old_len,
            new_len,
        }
    }

    /// The map of a step that moves no positions.
    pub fn identity() -> Self {
        Self::new(0, 0, 0)
    }

    /// Map a position through this step.
    ///
    /// Positions before the span are unchanged; positions after it shift
    /// by the length difference; positions on or inside the span collapse
    /// to its start (`Before`) or its new end (`After`).
    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_result(pos, bias).pos
    }

    pub fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        if pos < self.from {
            return MapResult {
                pos,
                deleted: false,
                recover: None,
            };
        }
        let old_end = self.from + self.old_len;
        if pos > old_end {
            return MapResult {
                pos: pos - self.old_len + self.new_len,
                deleted: false,
                recover: None,
            };
        }
        let deleted = pos > self.from && pos < old_end;
        MapResult {
            pos: match bias {
                Bias::Before => self.from,
                Bias::After => self.from + self.new_len,
            },
            deleted,
            recover: deleted.then(|| pos - self.from),
        }
    }

    /// Recover a position from an offset into the replaced span.
    pub fn recover(&self, offset: usize) -> usize {
        self.from + offset.min(self.new_len)
    }

    /// The map of the inverse step.
    pub fn invert(&self) -> StepMap {
        StepMap {
            from: self.from,
            old_len: self.new_len,
            new_len: self.old_len,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.old_len == 0 && self.new_len == 0
    }
}

/// An ordered sequence of step maps, with optional mirror pairing between
/// an unwound step and its re-applied counterpart.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Vec<(usize, usize)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Self {
            maps,
            mirror: Vec::new(),
        }
    }

    /// Append a map, returning its index.
    pub fn append(&mut self, map: StepMap) -> usize {
        self.maps.push(map);
        self.maps.len() - 1
    }

    /// Record that maps `a` and `b` undo each other: a position deleted by
    /// one is recovered at its offset inside the other.
    pub fn set_mirror(&mut self, a: usize, b: usize) {
        self.mirror.push((a, b));
    }

    /// Append another mapping wholesale, preserving its mirror pairs.
    pub fn append_mapping(&mut self, other: &Mapping) {
        let offset = self.maps.len();
        self.maps.extend_from_slice(&other.maps);
        for &(a, b) in &other.mirror {
            self.mirror.push((a + offset, b + offset));
        }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    fn mirror_of(&self, index: usize) -> Option<usize> {
        for &(a, b) in &self.mirror {
            if a == index {
                return Some(b);
            }
            if b == index {
                return Some(a);
            }
        }
        None
    }

    /// Map a position through all maps.
    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_from(0, pos, bias)
    }

    /// Map a position through the maps starting at `start`. Used while
    /// rebasing a batch, where each step only crosses the maps it did not
    /// already account for.
    pub fn map_from(&self, start: usize, pos: usize, bias: Bias) -> usize {
        let mut pos = pos;
        let mut i = start;
        while i < self.maps.len() {
            let result = self.maps[i].map_result(pos, bias);
            if result.deleted {
                if let Some(m) = self.mirror_of(i) {
                    if m > i {
                        pos = self.maps[m].recover(result.recover.unwrap_or(0));
                        i = m + 1;
                        continue;
                    }
                }
            }
            pos = result.pos;
            i += 1;
        }
        pos
    }
}
