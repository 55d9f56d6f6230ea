//! The visibility projector — maps tracking state to per-span decorations.
//!
//! State transitions ride on metadata-tagged no-op transactions
//! ([`enable_track_changes`] and friends); the projection itself is a pure
//! function of the document's marks and the current flags.  Nothing here
//! ever mutates the document — hidden spans stay in the tree and are only
//! decorated as collapsed.
//!
//! The two visibility flags are independent state.  The UI normally drives
//! them as a tri-state toggle, but any combination is handled: both set
//! applies both rules, both clear is the default review view.

use serde_json::json;

use redline_doc::{Doc, Transaction};

use crate::change::ChangeKind;
use crate::collect::raw_changes;

// ── Metadata keys ─────────────────────────────────────────────────────────

pub const META_TRACK_CHANGES_ENABLE: &str = "trackChangesEnable";
pub const META_SHOW_ONLY_ORIGINAL: &str = "showOnlyOriginal";
pub const META_SHOW_ONLY_MODIFIED: &str = "showOnlyModified";

// ── State ─────────────────────────────────────────────────────────────────

/// Tracking/visibility flags, transitioned only by tagged transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackChangesState {
    /// Whether new edits are being recorded as tracked changes.
    pub is_active: bool,

    /// Show the document as it was before any pending change.
    pub only_original: bool,

    /// Show the document as it will be if everything is accepted.
    pub only_modified: bool,
}

impl TrackChangesState {
    /// Fold one transaction's metadata into the state.
    pub fn apply(&self, tr: &Transaction) -> TrackChangesState {
        let mut next = *self;
        if let Some(v) = tr.get_meta(META_TRACK_CHANGES_ENABLE).and_then(|v| v.as_bool()) {
            next.is_active = v;
        }
        if let Some(v) = tr.get_meta(META_SHOW_ONLY_ORIGINAL).and_then(|v| v.as_bool()) {
            next.only_original = v;
        }
        if let Some(v) = tr.get_meta(META_SHOW_ONLY_MODIFIED).and_then(|v| v.as_bool()) {
            next.only_modified = v;
        }
        next
    }
}

// ── Toggle transactions ───────────────────────────────────────────────────

fn meta_only(doc: &Doc, key: &str, value: bool) -> Transaction {
    let mut tr = Transaction::new(doc);
    tr.set_meta(key, json!(value));
    tr
}

pub fn set_track_changes(doc: &Doc, value: bool) -> Transaction {
    meta_only(doc, META_TRACK_CHANGES_ENABLE, value)
}

pub fn enable_track_changes(doc: &Doc) -> Transaction {
    set_track_changes(doc, true)
}

pub fn disable_track_changes(doc: &Doc) -> Transaction {
    set_track_changes(doc, false)
}

pub fn toggle_track_changes(doc: &Doc, state: &TrackChangesState) -> Transaction {
    set_track_changes(doc, !state.is_active)
}

pub fn set_show_original(doc: &Doc, value: bool) -> Transaction {
    meta_only(doc, META_SHOW_ONLY_ORIGINAL, value)
}

pub fn enable_show_original(doc: &Doc) -> Transaction {
    set_show_original(doc, true)
}

pub fn disable_show_original(doc: &Doc) -> Transaction {
    set_show_original(doc, false)
}

pub fn toggle_show_original(doc: &Doc, state: &TrackChangesState) -> Transaction {
    set_show_original(doc, !state.only_original)
}

pub fn set_show_final(doc: &Doc, value: bool) -> Transaction {
    meta_only(doc, META_SHOW_ONLY_MODIFIED, value)
}

pub fn enable_show_final(doc: &Doc) -> Transaction {
    set_show_final(doc, true)
}

pub fn toggle_show_final(doc: &Doc, state: &TrackChangesState) -> Transaction {
    set_show_final(doc, !state.only_modified)
}

// ── Decorations ───────────────────────────────────────────────────────────

/// How one tracked span renders under the current flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationKind {
    /// Pending insertion, highlighted.
    InsertHighlight,
    /// Pending deletion, highlighted (struck through).
    DeleteHighlight,
    /// Visually collapsed; the content stays in the tree.
    Hidden,
    /// Rendered as ordinary text.
    Plain,
}

impl DecorationKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            DecorationKind::InsertHighlight => "redline-insert",
            DecorationKind::DeleteHighlight => "redline-delete",
            DecorationKind::Hidden => "redline-hidden",
            DecorationKind::Plain => "",
        }
    }
}

/// A decoration over one tracked span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub kind: DecorationKind,
}

/// Recompute the decoration set for every Insert/Delete span.
///
/// Pure: same document and state always produce the same decorations.
pub fn decorations(doc: &Doc, state: &TrackChangesState) -> Vec<Decoration> {
    raw_changes(doc)
        .into_iter()
        .filter_map(|raw| {
            let kind = match raw.mark.kind {
                ChangeKind::Insert => {
                    if state.only_original {
                        DecorationKind::Hidden
                    } else if state.only_modified {
                        DecorationKind::Plain
                    } else {
                        DecorationKind::InsertHighlight
                    }
                }
                ChangeKind::Delete => {
                    if state.only_modified {
                        DecorationKind::Hidden
                    } else if state.only_original {
                        DecorationKind::Plain
                    } else {
                        DecorationKind::DeleteHighlight
                    }
                }
                ChangeKind::Format => return None,
            };
            Some(Decoration {
                from: raw.from,
                to: raw.to,
                kind,
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{Author, TrackedMark};
    use redline_doc::Node;

    fn mixed_doc() -> Doc {
        let author = Author::new("Ada", "ada@example.com");
        Doc::new(vec![Node::element(
            "paragraph",
            vec![Node::element(
                "run",
                vec![
                    Node::marked_text(
                        "new",
                        vec![TrackedMark::insert("c1", &author, "2024-01-01").to_mark()],
                    ),
                    Node::text("plain"),
                    Node::marked_text(
                        "old",
                        vec![TrackedMark::delete("c2", &author, "2024-01-01").to_mark()],
                    ),
                ],
            )],
        )])
    }

    #[test]
    fn default_view_highlights_both() {
        let doc = mixed_doc();
        let decos = decorations(&doc, &TrackChangesState::default());
        assert_eq!(decos.len(), 2);
        assert_eq!(decos[0].kind, DecorationKind::InsertHighlight);
        assert_eq!(decos[1].kind, DecorationKind::DeleteHighlight);
    }

    #[test]
    fn original_view_hides_insertions() {
        let doc = mixed_doc();
        let state = TrackChangesState {
            only_original: true,
            ..Default::default()
        };
        let decos = decorations(&doc, &state);
        assert_eq!(decos[0].kind, DecorationKind::Hidden);
        assert_eq!(decos[1].kind, DecorationKind::Plain);
    }

    #[test]
    fn final_view_hides_deletions() {
        let doc = mixed_doc();
        let state = TrackChangesState {
            only_modified: true,
            ..Default::default()
        };
        let decos = decorations(&doc, &state);
        assert_eq!(decos[0].kind, DecorationKind::Plain);
        assert_eq!(decos[1].kind, DecorationKind::Hidden);
    }

    #[test]
    fn both_flags_apply_both_rules() {
        let doc = mixed_doc();
        let state = TrackChangesState {
            only_original: true,
            only_modified: true,
            ..Default::default()
        };
        let decos = decorations(&doc, &state);
        assert!(decos.iter().all(|d| d.kind == DecorationKind::Hidden));
    }

    #[test]
    fn toggles_transition_state_via_meta() {
        let doc = mixed_doc();
        let state = TrackChangesState::default();
        let state = state.apply(&enable_track_changes(&doc));
        assert!(state.is_active);
        let state = state.apply(&toggle_show_original(&doc, &state));
        assert!(state.only_original);
        let state = state.apply(&disable_show_original(&doc));
        assert!(!state.only_original);
        let state = state.apply(&toggle_track_changes(&doc, &state));
        assert!(!state.is_active);
    }

    #[test]
    fn toggle_transactions_do_not_touch_the_doc() {
        let doc = mixed_doc();
        let tr = enable_show_original(&doc);
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc, doc);
    }

    #[test]
    fn projection_is_pure() {
        let doc = mixed_doc();
        let state = TrackChangesState::default();
        let on = state.apply(&enable_show_original(&doc));
        let off = on.apply(&disable_show_original(&doc));
        assert_eq!(decorations(&doc, &state), decorations(&doc, &off));
    }
}
