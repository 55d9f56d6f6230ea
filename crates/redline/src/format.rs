//! The format-mark synthesizer — captures formatting edits as tracked
//! changes while keeping the whole chain reversible to the pre-tracking
//! state.
//!
//! Only a small allow-list of mark types participates; anything else is
//! applied directly without tracking.  For tracked types the edit is applied
//! live (pending formatting is visible immediately) and a Format mark
//! records where the run came from (`before`) and where the chain is going
//! (`after`).  A later edit that returns a field to its original value
//! removes it from both lists instead of accumulating, so fully reverted
//! chains collapse to no mark at all.

use serde_json::Map;

use redline_doc::{Doc, DocError, Mark, Node, Transaction};

use crate::change::{
    is_track_mark_type, tracked_marks, ChangeKind, FormatEntry, TrackedMark, MARK_FORMAT,
};
use crate::new_change_id;
use crate::permission::Actor;
use crate::resolve::META_RESOLUTION;

// ── Allow-list ────────────────────────────────────────────────────────────

/// The text-style mark; its attributes are compared by subset rather than
/// exact equality when detecting reverts.
pub const TEXT_STYLE: &str = "textStyle";

/// Mark types whose edits are captured as tracked format changes.
pub const TRACKED_FORMAT_TYPES: [&str; 5] = ["bold", "italic", "strike", "underline", TEXT_STYLE];

/// `true` when edits to this mark type are tracked.
pub fn is_tracked_format_type(mark_type: &str) -> bool {
    TRACKED_FORMAT_TYPES.contains(&mark_type)
}

/// Whether format capture should run for steps of this transaction.
/// Resolution passes strip marks themselves and must not be re-captured.
pub fn should_capture(tr: &Transaction) -> bool {
    tr.get_meta(META_RESOLUTION).is_none()
}

// ── The edit ──────────────────────────────────────────────────────────────

/// A formatting edit to capture: adding a mark or removing one by type.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatEdit {
    Add(Mark),
    Remove(String),
}

impl FormatEdit {
    fn mark_type(&self) -> &str {
        match self {
            FormatEdit::Add(m) => &m.mark_type,
            FormatEdit::Remove(t) => t,
        }
    }
}

// ── Synthesis ─────────────────────────────────────────────────────────────

/// Apply a formatting edit to `[from, to)` with tracking.
///
/// The returned transaction applies the edit live and creates or updates
/// Format marks per affected run.  Runs already marked as deleted are
/// skipped entirely; runs whose chain fully reverts lose their Format mark.
/// A transaction with no steps means the edit was a no-op everywhere.
pub fn track_format(
    doc: &Doc,
    from: usize,
    to: usize,
    edit: FormatEdit,
    actor: &Actor,
    date: &str,
) -> Result<Transaction, DocError> {
    let mut tr = Transaction::new(doc);

    if !is_tracked_format_type(edit.mark_type()) {
        // outside the allow-list: apply directly, no tracking
        match &edit {
            FormatEdit::Add(m) => tr.add_mark(from, to, m.clone())?,
            FormatEdit::Remove(t) => tr.remove_mark(from, to, t.as_str())?,
        }
        return Ok(tr);
    }

    let minted = new_change_id();
    for (pos, end, marks) in text_nodes_in(doc, from, to) {
        let seg_from = pos.max(from);
        let seg_to = end.min(to);
        if seg_to <= seg_from {
            continue;
        }
        let tracked = tracked_marks(&marks);
        if tracked.iter().any(|t| t.kind == ChangeKind::Delete) {
            continue; // deleted content is not subject to formatting tracking
        }
        let existing = tracked.iter().find(|t| t.kind == ChangeKind::Format).cloned();
        let plain: Vec<&Mark> = marks
            .iter()
            .filter(|m| !is_track_mark_type(&m.mark_type))
            .collect();

        let (mut before, mut after) = match &existing {
            Some(f) => (f.before.clone(), f.after.clone()),
            None => (Vec::new(), Vec::new()),
        };

        match &edit {
            FormatEdit::Add(m) => {
                let already_identical = plain
                    .iter()
                    .any(|pm| pm.mark_type == m.mark_type && pm.attrs == m.attrs);
                if existing.is_none() && already_identical {
                    continue;
                }
                tr.add_mark(seg_from, seg_to, m.clone())?;
                if existing.is_some() {
                    let revert = before.iter().position(|e| {
                        e.mark_type == m.mark_type
                            && (m.mark_type != TEXT_STYLE || attrs_subset(&m.attrs, &e.attrs))
                    });
                    match revert {
                        Some(i) => {
                            // the original is being restored
                            before.remove(i);
                            after.retain(|e| e.mark_type != m.mark_type);
                        }
                        None => {
                            after.retain(|e| e.mark_type != m.mark_type);
                            after.push(FormatEntry::of_mark(m));
                        }
                    }
                } else {
                    before = plain.iter().map(|pm| FormatEntry::of_mark(pm)).collect();
                    after = vec![FormatEntry::of_mark(m)];
                }
            }
            FormatEdit::Remove(t) => {
                let present = plain.iter().any(|pm| &pm.mark_type == t);
                let pending = after.iter().any(|e| &e.mark_type == t);
                if !present && !pending {
                    continue;
                }
                tr.remove_mark(seg_from, seg_to, t.as_str())?;
                if existing.is_some() {
                    if pending {
                        after.retain(|e| &e.mark_type != t);
                    } else if !before.iter().any(|e| &e.mark_type == t) {
                        if let Some(pm) = plain.iter().find(|pm| &pm.mark_type == t) {
                            before.push(FormatEntry::of_mark(pm));
                        }
                    }
                } else {
                    before = plain.iter().map(|pm| FormatEntry::of_mark(pm)).collect();
                }
            }
        }

        // A mark type unchanged across the chain appears in neither list:
        // drop entries identical to the run's post-edit state unless a
        // pending `after` entry still claims that type.
        let live = live_marks(&plain, &edit);
        before.retain(|e| {
            let unchanged = live
                .iter()
                .any(|l| l.mark_type == e.mark_type && l.attrs == e.attrs)
                && !after.iter().any(|a| a.mark_type == e.mark_type);
            !unchanged
        });

        let id = existing
            .as_ref()
            .map(|f| f.id.clone())
            .or_else(|| {
                tracked
                    .iter()
                    .find(|t| t.kind == ChangeKind::Delete)
                    .map(|t| t.id.clone())
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| minted.clone());

        if before.is_empty() && after.is_empty() {
            // fully reverted chain
            if existing.is_some() {
                tr.remove_mark(seg_from, seg_to, MARK_FORMAT)?;
            }
        } else {
            let fm = TrackedMark::format(id, &actor.author, date, before, after);
            tr.add_mark(seg_from, seg_to, fm.to_mark())?;
        }
    }
    Ok(tr)
}

fn text_nodes_in(doc: &Doc, from: usize, to: usize) -> Vec<(usize, usize, Vec<Mark>)> {
    let mut nodes = Vec::new();
    doc.nodes_between(from, to, |node, pos| {
        if let Node::Text { .. } = node {
            nodes.push((pos, pos + node.size(), node.marks().to_vec()));
        }
    });
    nodes
}

/// The run's plain mark set after the live edit.
fn live_marks(plain: &[&Mark], edit: &FormatEdit) -> Vec<Mark> {
    let mut out: Vec<Mark> = plain.iter().map(|m| (*m).clone()).collect();
    match edit {
        FormatEdit::Add(m) => redline_doc::mark::add_to_set(&mut out, m.clone()),
        FormatEdit::Remove(t) => redline_doc::mark::remove_from_set(&mut out, t),
    }
    out
}

/// Every key/value of `sub` present and equal in `sup`.
fn attrs_subset(
    sub: &Map<String, serde_json::Value>,
    sup: &Map<String, serde_json::Value>,
) -> bool {
    sub.iter().all(|(k, v)| sup.get(k) == Some(v))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Author;
    use serde_json::json;

    fn actor() -> Actor {
        Actor::new(Author::new("Ada", "ada@example.com"), "editor", true)
    }

    fn doc_of(content: Vec<Node>) -> Doc {
        Doc::new(vec![Node::element(
            "paragraph",
            vec![Node::element("run", content)],
        )])
    }

    fn format_mark_on(doc: &Doc, pos: usize) -> Option<TrackedMark> {
        let node = doc.node_starting_at(pos)?;
        tracked_marks(node.marks())
            .into_iter()
            .find(|t| t.kind == ChangeKind::Format)
    }

    #[test]
    fn first_edit_snapshots_and_applies_live() {
        let doc = doc_of(vec![Node::text("word")]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Add(Mark::new("bold")),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let node = tr.doc.node_starting_at(2).unwrap();
        assert!(node.marks().iter().any(|m| m.mark_type == "bold"));
        let fm = format_mark_on(&tr.doc, 2).unwrap();
        assert!(fm.before.is_empty());
        assert_eq!(fm.after.len(), 1);
        assert_eq!(fm.after[0].mark_type, "bold");
    }

    #[test]
    fn chained_edit_extends_after_and_reuses_id() {
        let doc = doc_of(vec![Node::text("word")]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Add(Mark::new("bold")),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let first = format_mark_on(&tr.doc, 2).unwrap();
        let tr2 = track_format(
            &tr.doc,
            2,
            6,
            FormatEdit::Add(Mark::new("italic")),
            &actor(),
            "2024-01-02",
        )
        .unwrap();
        let fm = format_mark_on(&tr2.doc, 2).unwrap();
        assert_eq!(fm.id, first.id);
        let types: Vec<&str> = fm.after.iter().map(|e| e.mark_type.as_str()).collect();
        assert_eq!(types, vec!["bold", "italic"]);
        assert!(fm.before.is_empty());
    }

    #[test]
    fn toggling_back_collapses_to_no_mark() {
        let doc = doc_of(vec![Node::text("word")]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Add(Mark::new("bold")),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let tr2 = track_format(
            &tr.doc,
            2,
            6,
            FormatEdit::Remove("bold".into()),
            &actor(),
            "2024-01-02",
        )
        .unwrap();
        assert!(format_mark_on(&tr2.doc, 2).is_none());
        let node = tr2.doc.node_starting_at(2).unwrap();
        assert!(node.marks().is_empty());
    }

    #[test]
    fn removing_an_original_mark_records_it_in_before() {
        let doc = doc_of(vec![Node::marked_text("word", vec![Mark::new("bold")])]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Remove("bold".into()),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let node = tr.doc.node_starting_at(2).unwrap();
        assert!(!node.marks().iter().any(|m| m.mark_type == "bold"));
        let fm = format_mark_on(&tr.doc, 2).unwrap();
        assert_eq!(fm.before.len(), 1);
        assert_eq!(fm.before[0].mark_type, "bold");
        assert!(fm.after.is_empty());
    }

    #[test]
    fn re_adding_original_mark_reverts_the_chain() {
        let doc = doc_of(vec![Node::marked_text("word", vec![Mark::new("bold")])]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Remove("bold".into()),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let tr2 = track_format(
            &tr.doc,
            2,
            6,
            FormatEdit::Add(Mark::new("bold")),
            &actor(),
            "2024-01-02",
        )
        .unwrap();
        assert!(format_mark_on(&tr2.doc, 2).is_none());
        let node = tr2.doc.node_starting_at(2).unwrap();
        assert!(node.marks().iter().any(|m| m.mark_type == "bold"));
    }

    #[test]
    fn text_style_reverts_by_attr_subset() {
        let mut red = Map::new();
        red.insert("color".into(), json!("#f00"));
        let mut blue = Map::new();
        blue.insert("color".into(), json!("#00f"));

        let doc = doc_of(vec![Node::marked_text(
            "word",
            vec![Mark::with_attrs(TEXT_STYLE, red.clone())],
        )]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Add(Mark::with_attrs(TEXT_STYLE, blue)),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let fm = format_mark_on(&tr.doc, 2).unwrap();
        assert_eq!(fm.before[0].attrs.get("color"), Some(&json!("#f00")));
        assert_eq!(fm.after[0].attrs.get("color"), Some(&json!("#00f")));

        // back to red: the chain fully reverts
        let tr2 = track_format(
            &tr.doc,
            2,
            6,
            FormatEdit::Add(Mark::with_attrs(TEXT_STYLE, red)),
            &actor(),
            "2024-01-02",
        )
        .unwrap();
        assert!(format_mark_on(&tr2.doc, 2).is_none());
    }

    #[test]
    fn deleted_runs_are_skipped() {
        let del = TrackedMark::delete("c1", &Author::new("Ada", "ada@example.com"), "2024-01-01");
        let doc = doc_of(vec![Node::marked_text("gone", vec![del.to_mark()])]);
        let tr = track_format(
            &doc,
            2,
            6,
            FormatEdit::Add(Mark::new("bold")),
            &actor(),
            "2024-01-02",
        )
        .unwrap();
        assert!(!tr.doc_changed());
    }

    #[test]
    fn non_allowlisted_types_apply_untracked() {
        let doc = doc_of(vec![Node::text("link me")]);
        let tr = track_format(
            &doc,
            2,
            9,
            FormatEdit::Add(Mark::new("link")),
            &actor(),
            "2024-01-01",
        )
        .unwrap();
        let node = tr.doc.node_starting_at(2).unwrap();
        assert!(node.marks().iter().any(|m| m.mark_type == "link"));
        assert!(format_mark_on(&tr.doc, 2).is_none());
    }
}
