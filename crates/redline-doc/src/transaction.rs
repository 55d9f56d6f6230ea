//! Atomic edit transactions.
//!
//! A [`Transaction`] snapshots a [`Doc`], applies steps to the snapshot
//! eagerly, and accumulates a [`Mapping`] of everything applied so far.  It
//! also carries a string-keyed metadata bag used to tag whole transactions
//! (resolution passes, visibility toggles) for downstream consumers.
//!
//! A transaction never partially applies: each editing method validates its
//! step before mutating, and a failed step leaves both the snapshot and the
//! step list untouched.

use serde_json::{Map, Value};

use crate::error::DocError;
use crate::mark::Mark;
use crate::node::Doc;
use crate::step::{Mapping, Step};

// ── Transaction ───────────────────────────────────────────────────────────

/// An in-progress atomic edit over a document snapshot.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// The document as of the last applied step.
    pub doc: Doc,

    /// The document the transaction started from.
    pub before: Doc,

    /// Steps applied so far, in order.
    pub steps: Vec<Step>,

    /// Composition of all applied step maps.
    pub mapping: Mapping,

    meta: Map<String, Value>,
}

impl Transaction {
    /// Start a transaction over a snapshot of `doc`.
    pub fn new(doc: &Doc) -> Transaction {
        Transaction {
            doc: doc.clone(),
            before: doc.clone(),
            steps: Vec::new(),
            mapping: Mapping::new(),
            meta: Map::new(),
        }
    }

    /// `true` once at least one step has been applied.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Map a position in the pre-transaction document through every step
    /// applied so far.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.mapping.map(pos, assoc)
    }

    // ── Editing ───────────────────────────────────────────────────────────

    /// Delete `[from, to)` from the current snapshot.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<(), DocError> {
        self.apply_step(Step::Delete { from, to })
    }

    /// Insert marked text at `pos` in the current snapshot.
    pub fn insert_text(
        &mut self,
        pos: usize,
        text: impl Into<String>,
        marks: Vec<Mark>,
    ) -> Result<(), DocError> {
        self.apply_step(Step::InsertText {
            pos,
            text: text.into(),
            marks,
        })
    }

    /// Add `mark` to all text in `[from, to)` of the current snapshot.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<(), DocError> {
        self.apply_step(Step::AddMark { from, to, mark })
    }

    /// Remove marks of `mark_type` from `[from, to)` of the current snapshot.
    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark_type: impl Into<String>,
    ) -> Result<(), DocError> {
        self.apply_step(Step::RemoveMark {
            from,
            to,
            mark_type: mark_type.into(),
        })
    }

    fn apply_step(&mut self, step: Step) -> Result<(), DocError> {
        let mut next = self.doc.clone();
        step.apply(&mut next)?;
        self.doc = next;
        self.mapping.push(step.step_map());
        self.steps.push(step);
        Ok(())
    }

    // ── Metadata ──────────────────────────────────────────────────────────

    /// Tag this transaction with a metadata value.
    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) {
        self.meta.insert(key.into(), value);
    }

    /// Read a metadata tag.
    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use serde_json::json;

    fn sample() -> Doc {
        Doc::new(vec![Node::element(
            "paragraph",
            vec![Node::element("run", vec![Node::text("hello world")])],
        )])
    }

    #[test]
    fn steps_apply_eagerly() {
        let doc = sample();
        let mut tr = Transaction::new(&doc);
        tr.delete(2, 7).unwrap();
        assert_eq!(tr.doc.text_content(), " world");
        assert_eq!(tr.before.text_content(), "hello world");
        assert!(tr.doc_changed());
    }

    #[test]
    fn mapping_tracks_prior_deletes() {
        let doc = sample();
        let mut tr = Transaction::new(&doc);
        tr.delete(2, 7).unwrap();
        // " world" originally started at 7; now at 2
        assert_eq!(tr.map(7, 1), 2);
        tr.delete(tr.map(8, 1), tr.map(13, -1)).unwrap();
        assert_eq!(tr.doc.text_content(), " ");
    }

    #[test]
    fn failed_step_leaves_transaction_untouched() {
        let doc = sample();
        let mut tr = Transaction::new(&doc);
        assert!(tr.delete(0, 999).is_err());
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc, doc);
    }

    #[test]
    fn meta_roundtrip() {
        let doc = sample();
        let mut tr = Transaction::new(&doc);
        tr.set_meta("trackChangesEnable", json!(true));
        assert_eq!(tr.get_meta("trackChangesEnable"), Some(&json!(true)));
        assert_eq!(tr.get_meta("missing"), None);
    }
}
