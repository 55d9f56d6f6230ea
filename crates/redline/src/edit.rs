//! Tracked editing — the entry points invoked while change recording is on.
//!
//! Instead of mutating content directly, these build transactions that
//! record intent: insertions carry an Insert mark, deletions keep the text
//! and mark it Delete, and a replace does both under one transaction.  The
//! collector, linker, and resolver downstream all operate on the marks laid
//! down here.
//!
//! One minted change id per call: a single delete gesture spanning several
//! text nodes produces fragments sharing an id, which the collector merges
//! back into one logical change.

use redline_doc::{Doc, DocError, Mark, Node, Transaction};

use crate::change::{tracked_marks, ChangeKind, TrackedMark};
use crate::collect::collect;
use crate::new_change_id;
use crate::permission::{emails_match, Actor};

// ── Insert ────────────────────────────────────────────────────────────────

/// Insert `text` at `pos` as a tracked insertion.
///
/// Consecutive typing coalesces: when the caret sits on or at the edge of an
/// Insert span by the same author, the new text joins that change instead of
/// minting a fresh id.
pub fn track_insert(
    doc: &Doc,
    pos: usize,
    text: impl Into<String>,
    actor: &Actor,
    date: &str,
) -> Result<Transaction, DocError> {
    let id = adjacent_own_insert_id(doc, pos, actor).unwrap_or_else(new_change_id);
    let mark = TrackedMark::insert(&id, &actor.author, date).to_mark();
    let mut tr = Transaction::new(doc);
    tr.insert_text(pos, text, vec![mark])?;
    Ok(tr)
}

fn adjacent_own_insert_id(doc: &Doc, pos: usize, actor: &Actor) -> Option<String> {
    collect(doc, pos, pos)
        .into_iter()
        .find(|change| {
            change.kind == ChangeKind::Insert
                && !change.id.is_empty()
                && emails_match(&actor.author.email, &change.mark.author_email)
        })
        .map(|change| change.id)
}

// ── Delete ────────────────────────────────────────────────────────────────

/// Mark `[from, to)` as a tracked deletion.
///
/// Three cases per text node in the range:
///
/// - the actor's own pending insertion is removed outright (deleting text
///   nobody else has seen needs no record);
/// - text already marked Delete is left alone;
/// - anything else gets the Delete mark and stays in the document.
pub fn track_delete(
    doc: &Doc,
    from: usize,
    to: usize,
    actor: &Actor,
    date: &str,
) -> Result<Transaction, DocError> {
    if to < from || to > doc.size() {
        return Err(DocError::InvalidRange { from, to });
    }
    let mut tr = Transaction::new(doc);
    track_delete_into(&mut tr, from, to, actor, date)?;
    Ok(tr)
}

fn track_delete_into(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    actor: &Actor,
    date: &str,
) -> Result<(), DocError> {
    let id = new_change_id();
    let mark = TrackedMark::delete(&id, &actor.author, date).to_mark();

    for target in text_segments(&tr.before, from, to) {
        let seg_from = tr.map(target.from, 1);
        let seg_to = tr.map(target.to, -1);
        if seg_to <= seg_from {
            continue;
        }
        let tracked = tracked_marks(&target.marks);
        if tracked.iter().any(|t| t.kind == ChangeKind::Delete) {
            continue;
        }
        let own_insert = tracked.iter().any(|t| {
            t.kind == ChangeKind::Insert && emails_match(&actor.author.email, &t.author_email)
        });
        if own_insert {
            tr.delete(seg_from, seg_to)?;
        } else {
            tr.add_mark(seg_from, seg_to, mark.clone())?;
        }
    }
    Ok(())
}

// ── Replace ───────────────────────────────────────────────────────────────

/// Replace `[from, to)` with `text` as one tracked edit: the old content is
/// marked Delete (or dropped, for the actor's own insertions) and the new
/// text goes in right after it with its own Insert id.
///
/// The two ids differ, so the pair stays individually addressable; the
/// adjacency linker reunites them at resolution time.
pub fn track_replace(
    doc: &Doc,
    from: usize,
    to: usize,
    text: impl Into<String>,
    actor: &Actor,
    date: &str,
) -> Result<Transaction, DocError> {
    if to < from || to > doc.size() {
        return Err(DocError::InvalidRange { from, to });
    }
    let mut tr = Transaction::new(doc);
    track_delete_into(&mut tr, from, to, actor, date)?;

    let insert_id = new_change_id();
    let mark = TrackedMark::insert(&insert_id, &actor.author, date).to_mark();
    tr.insert_text(tr.map(to, -1), text, vec![mark])?;
    Ok(tr)
}

// ── Helpers ───────────────────────────────────────────────────────────────

struct TextSegment {
    from: usize,
    to: usize,
    marks: Vec<Mark>,
}

/// Text node runs in `[from, to)`, clipped to the range, in document order
/// and pre-transaction coordinates.
fn text_segments(doc: &Doc, from: usize, to: usize) -> Vec<TextSegment> {
    let mut out = Vec::new();
    doc.nodes_between(from, to, |node, pos| {
        if let Node::Text { .. } = node {
            let end = pos + node.size();
            out.push(TextSegment {
                from: pos.max(from),
                to: end.min(to),
                marks: node.marks().to_vec(),
            });
        }
    });
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{Author, MARK_DELETE, MARK_INSERT};
    use crate::collect::raw_changes;

    fn actor() -> Actor {
        Actor::new(Author::new("Ada", "ada@example.com"), "editor", true)
    }

    fn other_actor() -> Actor {
        Actor::new(Author::new("Bob", "bob@example.com"), "editor", true)
    }

    fn doc_of(content: Vec<Node>) -> Doc {
        Doc::new(vec![Node::element(
            "paragraph",
            vec![Node::element("run", content)],
        )])
    }

    #[test]
    fn insert_lays_down_a_marked_span() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 4, "XY", &actor(), "2024-01-01").unwrap();
        assert_eq!(tr.doc.text_content(), "heXYllo");
        let raws = raw_changes(&tr.doc);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].mark.kind, ChangeKind::Insert);
        assert_eq!(raws[0].mark.author_email, "ada@example.com");
        assert!(!raws[0].mark.id.is_empty());
    }

    #[test]
    fn typing_at_own_insert_edge_reuses_the_id() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 4, "XY", &actor(), "2024-01-01").unwrap();
        let first_id = raw_changes(&tr.doc)[0].mark.id.clone();

        // caret at the end of the fresh span
        let tr2 = track_insert(&tr.doc, 6, "Z", &actor(), "2024-01-01").unwrap();
        let raws = raw_changes(&tr2.doc);
        assert!(raws.iter().all(|r| r.mark.id == first_id));
        assert_eq!(tr2.doc.text_content(), "heXYZllo");
    }

    #[test]
    fn another_author_gets_a_fresh_id() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 4, "XY", &actor(), "2024-01-01").unwrap();
        let first_id = raw_changes(&tr.doc)[0].mark.id.clone();

        let tr2 = track_insert(&tr.doc, 6, "Z", &other_actor(), "2024-01-02").unwrap();
        let ids: Vec<String> = raw_changes(&tr2.doc)
            .iter()
            .map(|r| r.mark.id.clone())
            .collect();
        assert!(ids.contains(&first_id));
        assert!(ids.iter().any(|id| *id != first_id));
    }

    #[test]
    fn delete_keeps_text_and_marks_it() {
        let doc = doc_of(vec![Node::text("hello world")]);
        let tr = track_delete(&doc, 2, 7, &actor(), "2024-01-01").unwrap();
        assert_eq!(tr.doc.text_content(), "hello world");
        let raws = raw_changes(&tr.doc);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].mark.kind, ChangeKind::Delete);
        assert_eq!((raws[0].from, raws[0].to), (2, 7));
    }

    #[test]
    fn deleting_own_pending_insert_removes_it_outright() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 4, "XY", &actor(), "2024-01-01").unwrap();
        let tr2 = track_delete(&tr.doc, 4, 6, &actor(), "2024-01-01").unwrap();
        assert_eq!(tr2.doc.text_content(), "hello");
        assert!(raw_changes(&tr2.doc).is_empty());
    }

    #[test]
    fn deleting_anothers_insert_marks_it_instead() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 4, "XY", &actor(), "2024-01-01").unwrap();
        let tr2 = track_delete(&tr.doc, 4, 6, &other_actor(), "2024-01-02").unwrap();
        assert_eq!(tr2.doc.text_content(), "heXYllo");
        let raws = raw_changes(&tr2.doc);
        let kinds: Vec<ChangeKind> = raws.iter().map(|r| r.mark.kind).collect();
        assert!(kinds.contains(&ChangeKind::Delete));
        assert!(kinds.contains(&ChangeKind::Insert));
    }

    #[test]
    fn delete_is_idempotent_over_marked_spans() {
        let doc = doc_of(vec![Node::text("hello world")]);
        let tr = track_delete(&doc, 2, 7, &actor(), "2024-01-01").unwrap();
        let tr2 = track_delete(&tr.doc, 2, 7, &actor(), "2024-01-02").unwrap();
        assert!(!tr2.doc_changed());
        assert_eq!(tr2.doc, tr.doc);
    }

    #[test]
    fn delete_spanning_nodes_shares_one_id() {
        let doc = doc_of(vec![Node::text("ab"), Node::text("cd")]);
        let tr = track_delete(&doc, 2, 6, &actor(), "2024-01-01").unwrap();
        let raws = raw_changes(&tr.doc);
        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].mark.id, raws[1].mark.id);
        // one logical change after merging
        let changes = collect(&tr.doc, 0, tr.doc.size());
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn replace_pairs_delete_and_insert() {
        let doc = doc_of(vec![Node::text("old text")]);
        // replace "old" (2..5)
        let tr = track_replace(&doc, 2, 5, "new", &actor(), "2024-01-01").unwrap();
        assert_eq!(tr.doc.text_content(), "oldnew text");
        let raws = raw_changes(&tr.doc);
        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].mark.kind, ChangeKind::Delete);
        assert_eq!(raws[1].mark.kind, ChangeKind::Insert);
        assert_ne!(raws[0].mark.id, raws[1].mark.id);
        // zero gap: the linker will treat these as one unit
        assert_eq!(raws[0].to, raws[1].from);
    }

    #[test]
    fn replace_of_own_insert_collapses_to_plain_insert() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 4, "XY", &actor(), "2024-01-01").unwrap();
        let tr2 = track_replace(&tr.doc, 4, 6, "Z", &actor(), "2024-01-01").unwrap();
        assert_eq!(tr2.doc.text_content(), "heZllo");
        let raws = raw_changes(&tr2.doc);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].mark.kind, ChangeKind::Insert);
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let doc = doc_of(vec![Node::text("ab")]);
        assert!(track_delete(&doc, 0, 999, &actor(), "2024-01-01").is_err());
        assert!(matches!(
            track_replace(&doc, 5, 2, "x", &actor(), "2024-01-01"),
            Err(DocError::InvalidRange { .. })
        ));
    }

    #[test]
    fn mark_constants_round_trip_through_the_doc() {
        let doc = doc_of(vec![Node::text("hello")]);
        let tr = track_insert(&doc, 2, "x", &actor(), "2024-01-01").unwrap();
        let tr2 = track_delete(&tr.doc, 4, 5, &actor(), "2024-01-01").unwrap();
        let json = tr2.doc.to_json().to_string();
        assert!(json.contains(MARK_INSERT));
        assert!(json.contains(MARK_DELETE));
    }
}
