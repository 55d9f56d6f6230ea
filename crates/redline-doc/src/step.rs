//! Edit steps and position mapping.
//!
//! Every document mutation is expressed as a [`Step`].  Applying a step
//! yields a [`StepMap`] describing how the step shifts positions; a
//! [`Mapping`] composes the maps of all steps applied so far, so a position
//! addressed against the original document can be pushed through to its
//! current equivalent.  This is what lets one resolution pass apply many
//! edits while still addressing later spans correctly.

use crate::error::DocError;
use crate::mark::Mark;
use crate::node::Doc;

// ── Step ──────────────────────────────────────────────────────────────────

/// One atomic document edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Remove all content in `[from, to)`.
    Delete { from: usize, to: usize },

    /// Insert a text node at `pos`.
    InsertText {
        pos: usize,
        text: String,
        marks: Vec<Mark>,
    },

    /// Add a mark to all text in `[from, to)`.
    AddMark { from: usize, to: usize, mark: Mark },

    /// Remove marks of one type from all text in `[from, to)`.
    RemoveMark {
        from: usize,
        to: usize,
        mark_type: String,
    },
}

impl Step {
    /// Apply this step to `doc`.
    pub fn apply(&self, doc: &mut Doc) -> Result<(), DocError> {
        match self {
            Step::Delete { from, to } => doc.delete_range(*from, *to),
            Step::InsertText { pos, text, marks } => {
                doc.insert_text_at(*pos, text, marks.clone())
            }
            Step::AddMark { from, to, mark } => doc.add_mark_range(*from, *to, mark),
            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => doc.remove_mark_range(*from, *to, mark_type),
        }
    }

    /// The position map this step induces.  Mark edits never move positions.
    pub fn step_map(&self) -> StepMap {
        match self {
            Step::Delete { from, to } => StepMap::new(vec![MapRange {
                start: *from,
                old_size: to - from,
                new_size: 0,
            }]),
            Step::InsertText { pos, text, .. } => StepMap::new(vec![MapRange {
                start: *pos,
                old_size: 0,
                new_size: text.chars().count(),
            }]),
            Step::AddMark { .. } | Step::RemoveMark { .. } => StepMap::identity(),
        }
    }
}

// ── StepMap ───────────────────────────────────────────────────────────────

/// One replaced range: `old_size` tokens at `start` became `new_size` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRange {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

/// The position map of a single step — an ordered list of replaced ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    pub ranges: Vec<MapRange>,
}

impl StepMap {
    pub fn new(ranges: Vec<MapRange>) -> StepMap {
        StepMap { ranges }
    }

    /// A map that moves nothing.
    pub fn identity() -> StepMap {
        StepMap { ranges: Vec::new() }
    }

    /// Map `pos` through this step.
    ///
    /// `assoc` breaks ties for positions at a replaced range's edge: negative
    /// association keeps the position on the left side of the replacement,
    /// positive on the right.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        let mut diff: i64 = 0;
        for range in &self.ranges {
            if range.start > pos {
                break;
            }
            let end = range.start + range.old_size;
            if pos <= end {
                let side: i8 = if range.old_size == 0 {
                    assoc
                } else if pos == range.start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let base = range.start as i64 + diff;
                let mapped = if side < 0 {
                    base
                } else {
                    base + range.new_size as i64
                };
                return mapped.max(0) as usize;
            }
            diff += range.new_size as i64 - range.old_size as i64;
        }
        (pos as i64 + diff).max(0) as usize
    }
}

// ── Mapping ───────────────────────────────────────────────────────────────

/// An appendable composition of [`StepMap`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    pub maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Mapping {
        Mapping::default()
    }

    /// Append the map of one more step.
    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// Map `pos` through every step map in order.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p, assoc))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
