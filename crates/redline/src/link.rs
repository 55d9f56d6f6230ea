//! The adjacency linker — expands one identified change into the full set of
//! fragments that must be accepted or rejected together.
//!
//! Two linking rules, applied while walking left and right from the seed
//! fragment through the document-ordered raw-change list:
//!
//! - **Continuation**: a neighbor sharing the seed's change id always links,
//!   and the walk continues past it.
//! - **Complementary pair**: a directly-connected Insert/Delete neighbor (a
//!   tracked "type-over replace" leaves a Delete immediately followed by an
//!   Insert with a different id, or vice versa) links, but stops the walk in
//!   that direction.  Pairs are never chained transitively: a three-way
//!   split edit resolves only the seed and its single connected partner.
//!   Known limitation, kept deliberately.

use redline_doc::Doc;

use crate::change::ChangeKind;
use crate::collect::{raw_changes, RawChange};

// ── Group resolution ──────────────────────────────────────────────────────

/// The seed change for `change_id` plus every directly linked neighbor, in
/// `[seed, right-linked…, left-linked…]` order.
///
/// Returns an empty list when no fragment carries `change_id`.
pub fn resolve_group(doc: &Doc, change_id: &str) -> Vec<RawChange> {
    let raws = raw_changes(doc);
    let Some(seed_index) = raws.iter().position(|r| r.mark.id == change_id) else {
        return Vec::new();
    };

    let mut group = vec![raws[seed_index].clone()];
    for direction in [1i64, -1i64] {
        let mut index = seed_index;
        loop {
            let neighbor_index = index as i64 + direction;
            if neighbor_index < 0 || neighbor_index as usize >= raws.len() {
                break;
            }
            let neighbor_index = neighbor_index as usize;
            let current = &raws[index];
            let neighbor = &raws[neighbor_index];

            if neighbor.mark.id == change_id {
                group.push(neighbor.clone());
                index = neighbor_index;
                continue;
            }
            if is_complementary(current, neighbor) && directly_connected(doc, current, neighbor) {
                group.push(neighbor.clone());
                break; // one hop only
            }
            break;
        }
    }
    group
}

/// One Insert and one Delete, in either order.
fn is_complementary(a: &RawChange, b: &RawChange) -> bool {
    matches!(
        (a.mark.kind, b.mark.kind),
        (ChangeKind::Insert, ChangeKind::Delete) | (ChangeKind::Delete, ChangeKind::Insert)
    )
}

/// Zero gap between the two spans, and no untracked content hiding between
/// them: the plain text across both spans must not exceed the sum of the two
/// fragment lengths.
fn directly_connected(doc: &Doc, a: &RawChange, b: &RawChange) -> bool {
    let (left, right) = if a.from <= b.from { (a, b) } else { (b, a) };
    if left.to != right.from {
        return false;
    }
    let between = doc.text_between(left.from, right.to).chars().count();
    between <= left.len() + right.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────
