//! The resolution engine — applies accept or reject to tracked changes.
//!
//! Range resolution is the primitive: every higher-level action (resolve by
//! id, resolve selection, resolve all) is expressed through it.  One pass
//! walks the affected nodes in document order and performs the structural
//! edit each change mark calls for, pushing every position through the
//! transaction's accumulated mapping so edits earlier in the pass cannot
//! misaddress later ones.
//!
//! Per-kind behavior:
//!
//! | mark   | accept                      | reject                            |
//! |--------|-----------------------------|-----------------------------------|
//! | Delete | remove the content          | strip the mark, content survives  |
//! | Insert | strip the mark              | remove the content                |
//! | Format | strip the mark              | restore `before`, undo `after`    |
//!
//! Permission denial aborts before any transaction is built; an empty range
//! is a silent no-op, never an error.

use serde_json::json;

use redline_doc::{Doc, DocError, Node, Transaction};

use crate::change::{tracked_marks, ChangeKind, TrackedMark, MARK_DELETE, MARK_FORMAT, MARK_INSERT};
use crate::collect::collect;
use crate::link::resolve_group;
use crate::permission::{is_action_allowed, Actor, PermissionResolver};

// ── Context & outcome ─────────────────────────────────────────────────────

/// Metadata key tagging a resolution transaction, so edit-capture listeners
/// (the format synthesizer in particular) do not re-track its steps.
pub const META_RESOLUTION: &str = "trackedChangeResolution";

/// Accept or reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    Accept,
    Reject,
}

impl ResolveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveAction::Accept => "accept",
            ResolveAction::Reject => "reject",
        }
    }
}

/// Explicit dependencies of a resolution call: the acting user and the
/// host's permission policy, injected per call rather than held as state.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub actor: &'a Actor,
    pub resolver: Option<&'a dyn PermissionResolver>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(actor: &'a Actor) -> ResolveContext<'a> {
        ResolveContext {
            actor,
            resolver: None,
        }
    }

    pub fn with_resolver(actor: &'a Actor, resolver: &'a dyn PermissionResolver) -> Self {
        ResolveContext {
            actor,
            resolver: Some(resolver),
        }
    }
}

/// Outcome of a resolution call.
///
/// Callers wanting a boolean should treat `Denied` as failure and both
/// other variants as success: "nothing to do" is not an error.
#[derive(Debug)]
pub enum Resolution {
    /// A transaction was built; its `doc` is the post-resolution document.
    Applied(Transaction),

    /// No matching change marks in range; no transaction was emitted.
    NoOp,

    /// The permission gate denied the batch; the document is untouched.
    Denied,
}

impl Resolution {
    /// `false` only on permission denial.
    pub fn allowed(&self) -> bool {
        !matches!(self, Resolution::Denied)
    }

    /// The built transaction, when one was emitted.
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Resolution::Applied(tr) => Some(tr),
            _ => None,
        }
    }

    /// The resulting document, falling back to `doc` when nothing changed.
    pub fn doc_or<'a>(&'a self, doc: &'a Doc) -> &'a Doc {
        match self {
            Resolution::Applied(tr) => &tr.doc,
            _ => doc,
        }
    }
}

// ── Range resolution ──────────────────────────────────────────────────────

/// Accept every tracked change overlapping `[from, to)`.
pub fn accept_between(
    doc: &Doc,
    from: usize,
    to: usize,
    ctx: ResolveContext<'_>,
) -> Result<Resolution, DocError> {
    resolve_ranges(doc, &[(from, to)], ResolveAction::Accept, ctx)
}

/// Reject every tracked change overlapping `[from, to)`.
pub fn reject_between(
    doc: &Doc,
    from: usize,
    to: usize,
    ctx: ResolveContext<'_>,
) -> Result<Resolution, DocError> {
    resolve_ranges(doc, &[(from, to)], ResolveAction::Reject, ctx)
}

/// Accept every tracked change in the document.
pub fn accept_all(doc: &Doc, ctx: ResolveContext<'_>) -> Result<Resolution, DocError> {
    accept_between(doc, 0, doc.size(), ctx)
}

/// Reject every tracked change in the document.
pub fn reject_all(doc: &Doc, ctx: ResolveContext<'_>) -> Result<Resolution, DocError> {
    reject_between(doc, 0, doc.size(), ctx)
}

// ── By-id resolution ──────────────────────────────────────────────────────

/// Accept the full linked group of the change with `change_id`.
pub fn accept_by_id(
    doc: &Doc,
    change_id: &str,
    ctx: ResolveContext<'_>,
) -> Result<Resolution, DocError> {
    resolve_id(doc, change_id, ResolveAction::Accept, ctx)
}

/// Reject the full linked group of the change with `change_id`.
pub fn reject_by_id(
    doc: &Doc,
    change_id: &str,
    ctx: ResolveContext<'_>,
) -> Result<Resolution, DocError> {
    resolve_id(doc, change_id, ResolveAction::Reject, ctx)
}

fn resolve_id(
    doc: &Doc,
    change_id: &str,
    action: ResolveAction,
    ctx: ResolveContext<'_>,
) -> Result<Resolution, DocError> {
    let group = resolve_group(doc, change_id);
    if group.is_empty() {
        // unknown id: zero range operations, success by contract
        return Ok(Resolution::NoOp);
    }
    // Rightmost segments resolve first; left-to-right would invalidate the
    // positions of not-yet-processed right segments.
    let mut ranges: Vec<(usize, usize)> = group.iter().map(|r| (r.from, r.to)).collect();
    ranges.sort_by(|a, b| b.0.cmp(&a.0));
    ranges.dedup();
    resolve_ranges(doc, &ranges, action, ctx)
}

// ── The shared pass ───────────────────────────────────────────────────────

struct TargetNode {
    from: usize,
    to: usize,
    mark: TrackedMark,
}

fn resolve_ranges(
    doc: &Doc,
    ranges: &[(usize, usize)],
    action: ResolveAction,
    ctx: ResolveContext<'_>,
) -> Result<Resolution, DocError> {
    let mut in_scope = Vec::new();
    for &(from, to) in ranges {
        in_scope.extend(collect(doc, from, to));
    }
    if !is_action_allowed(ctx.actor, action, &in_scope, ctx.resolver) {
        return Ok(Resolution::Denied);
    }

    let mut tr = Transaction::new(doc);
    tr.set_meta(META_RESOLUTION, json!(action.as_str()));
    let mut steps = 0usize;
    for &(from, to) in ranges {
        for target in target_nodes(doc, from, to) {
            resolve_node(&mut tr, &target, action)?;
            steps += 1;
        }
    }
    if steps == 0 {
        return Ok(Resolution::NoOp);
    }
    Ok(Resolution::Applied(tr))
}

/// Text nodes in `[from, to)` carrying a tracked mark, with the mark chosen
/// by Delete > Insert > Format priority so no node is processed twice.
fn target_nodes(doc: &Doc, from: usize, to: usize) -> Vec<TargetNode> {
    let mut targets = Vec::new();
    doc.nodes_between(from, to, |node, pos| {
        if let Node::Text { .. } = node {
            if let Some(mark) = tracked_marks(node.marks()).into_iter().next() {
                targets.push(TargetNode {
                    from: pos,
                    to: pos + node.size(),
                    mark,
                });
            }
        }
    });
    targets
}

fn resolve_node(
    tr: &mut Transaction,
    target: &TargetNode,
    action: ResolveAction,
) -> Result<(), DocError> {
    // positions pass through the running map: earlier steps in this pass may
    // already have shifted them
    let from = tr.map(target.from, 1);
    let to = tr.map(target.to, -1);
    if to <= from {
        return Ok(()); // span vanished under an earlier step
    }
    match (target.mark.kind, action) {
        (ChangeKind::Delete, ResolveAction::Accept) => tr.delete(from, to),
        (ChangeKind::Delete, ResolveAction::Reject) => tr.remove_mark(from, to, MARK_DELETE),
        (ChangeKind::Insert, ResolveAction::Accept) => tr.remove_mark(from, to, MARK_INSERT),
        (ChangeKind::Insert, ResolveAction::Reject) => tr.delete(from, to),
        (ChangeKind::Format, ResolveAction::Accept) => tr.remove_mark(from, to, MARK_FORMAT),
        (ChangeKind::Format, ResolveAction::Reject) => {
            // undo `after` first: a type present in both lists (textStyle
            // with changed attrs) must end up with its `before` value
            for entry in &target.mark.after {
                tr.remove_mark(from, to, entry.mark_type.as_str())?;
            }
            for entry in &target.mark.before {
                tr.add_mark(from, to, entry.to_doc_mark())?;
            }
            tr.remove_mark(from, to, MARK_FORMAT)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
