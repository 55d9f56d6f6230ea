//! The change collector — scans a document range for tracked-change marks
//! and merges fragments sharing a change id into logical changes.
//!
//! Two derived shapes come out of this module:
//!
//! - [`RawChange`] — one contiguous text span carrying one change mark, as
//!   discovered by the scan.
//! - [`NormalizedChange`] — all raw fragments with the same change id and
//!   mark kind merged into a single record with a union span and the
//!   ordered list of original segments.

use indexmap::IndexMap;
use serde_json::Value;

use redline_doc::{Doc, Node};

use crate::change::{tracked_marks, ChangeKind, TrackedMark};

// ── RawChange ─────────────────────────────────────────────────────────────

/// One contiguous span `[from, to)` carrying one tracked-change mark.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub mark: TrackedMark,
    pub from: usize,
    pub to: usize,
}

impl RawChange {
    /// Span length in characters.
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

// ── NormalizedChange ──────────────────────────────────────────────────────

/// One original mark fragment inside a merged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: usize,
    pub to: usize,
}

/// The merged, id-grouped unit the UI and permission gate operate on.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChange {
    /// The change id; empty when the mark carried none.
    pub id: String,

    pub kind: ChangeKind,

    /// Full decoded mark of the first fragment encountered.
    pub mark: TrackedMark,

    /// Minimum bound of all segments.
    pub from: usize,

    /// Maximum bound of all segments.
    pub to: usize,

    /// Each original fragment, in scan order, for precise re-addressing.
    pub segments: Vec<Segment>,

    /// Host-attached comment thread payload, if any.
    pub comment: Option<Value>,
}

// ── Scanning ──────────────────────────────────────────────────────────────

/// Every tracked-change span in the whole document, in document order.
///
/// A text node carrying more than one tracked mark (e.g. Format alongside
/// Insert) yields one raw change per mark.
pub fn raw_changes(doc: &Doc) -> Vec<RawChange> {
    raw_changes_between(doc, 0, doc.size())
}

fn raw_changes_between(doc: &Doc, from: usize, to: usize) -> Vec<RawChange> {
    let mut out = Vec::new();
    doc.nodes_between(from, to, |node, pos| {
        if let Node::Text { .. } = node {
            let end = pos + node.size();
            for mark in tracked_marks(node.marks()) {
                out.push(RawChange {
                    mark,
                    from: pos,
                    to: end,
                });
            }
        }
    });
    out
}

/// Raw changes overlapping `[from, to]` per the selection rules:
///
/// - Collapsed (`from == to`): a span overlaps when the cursor sits anywhere
///   inside it, including its edges (`span.from <= from && span.to >= from`).
/// - Otherwise: strict interval intersection (`span.from < to && span.to >
///   from`); a span that only touches the boundary does not count.
pub fn raw_changes_overlapping(doc: &Doc, from: usize, to: usize) -> Vec<RawChange> {
    // Scan one token wide on each side so edge-touching spans are seen at
    // all; the predicates below make the actual call.
    let lo = from.saturating_sub(1);
    let hi = (to + 1).min(doc.size());
    let mut raws: Vec<RawChange> = raw_changes_between(doc, lo, hi)
        .into_iter()
        .filter(|r| overlaps(from, to, r))
        .collect();

    // Compatibility shim: a "run" wrapper whose opening token lands exactly
    // on `to` hides its leading content one position past the scanned range.
    // Walk that one extra node so a mark on content at the boundary is still
    // found.  Narrow by intent; do not generalize.
    if let Some(node) = doc.node_starting_at(to) {
        if node.node_type() == "run" {
            let mut pos = to + 1;
            for child in node.children() {
                let end = pos + child.size();
                if child.is_text() && pos == to + 1 {
                    for mark in tracked_marks(child.marks()) {
                        let raw = RawChange {
                            mark,
                            from: pos,
                            to: end,
                        };
                        if !raws.contains(&raw) {
                            raws.push(raw);
                        }
                    }
                }
                pos = end;
            }
        }
    }
    raws
}

fn overlaps(from: usize, to: usize, r: &RawChange) -> bool {
    if from == to {
        r.from <= from && r.to >= from
    } else {
        r.from < to && r.to > from
    }
}

// ── Merging ───────────────────────────────────────────────────────────────

/// Collect and merge all tracked changes overlapping `[from, to]`.
///
/// Fragments merge under the key `"{id}:{mark type}"`; fragments without an
/// id key on their own span instead, so they never merge with anything.
/// Output preserves the order of first encounter during the scan.
pub fn collect(doc: &Doc, from: usize, to: usize) -> Vec<NormalizedChange> {
    let mut merged: IndexMap<String, NormalizedChange> = IndexMap::new();
    for raw in raw_changes_overlapping(doc, from, to) {
        let id_key = if raw.mark.id.is_empty() {
            format!("{}-{}", raw.from, raw.to)
        } else {
            raw.mark.id.clone()
        };
        let key = format!("{}:{}", id_key, raw.mark.kind.mark_type());
        let segment = Segment {
            from: raw.from,
            to: raw.to,
        };
        match merged.get_mut(&key) {
            Some(change) => {
                change.from = change.from.min(raw.from);
                change.to = change.to.max(raw.to);
                change.segments.push(segment);
            }
            None => {
                merged.insert(
                    key,
                    NormalizedChange {
                        id: raw.mark.id.clone(),
                        kind: raw.mark.kind,
                        mark: raw.mark,
                        from: raw.from,
                        to: raw.to,
                        segments: vec![segment],
                        comment: None,
                    },
                );
            }
        }
    }
    merged.into_values().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────
