//! The document tree — element and text nodes with position-range queries.
//!
//! A [`Doc`] owns a sequence of block-level element nodes.  Element nodes
//! (`paragraph`, `run`, …) contribute one opening and one closing position
//! token; text nodes contribute one token per character.  All range-addressed
//! operations (`nodes_between`, `delete_range`, mark edits) work on these
//! token positions.

use serde_json::{json, Map, Value};

use crate::error::DocError;
use crate::mark::{self, Mark};

// ── Node ──────────────────────────────────────────────────────────────────

/// One node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A leaf text run.  Marks attach here.
    Text { text: String, marks: Vec<Mark> },

    /// An element node (`paragraph`, `run`, …) wrapping child content.
    Element {
        node_type: String,
        attrs: Map<String, Value>,
        content: Vec<Node>,
    },
}

impl Node {
    /// Create an unmarked text node.
    pub fn text(text: impl Into<String>) -> Node {
        Node::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Create a text node carrying the given marks.
    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Node {
        Node::Text {
            text: text.into(),
            marks,
        }
    }

    /// Create an element node with no attributes.
    pub fn element(node_type: impl Into<String>, content: Vec<Node>) -> Node {
        Node::Element {
            node_type: node_type.into(),
            attrs: Map::new(),
            content,
        }
    }

    /// Size of the node in position tokens.
    ///
    /// Text nodes count one token per character; element nodes count their
    /// open token, their content, and their close token.
    pub fn size(&self) -> usize {
        match self {
            Node::Text { text, .. } => text.chars().count(),
            Node::Element { content, .. } => 2 + content.iter().map(Node::size).sum::<usize>(),
        }
    }

    /// `true` for text leaves.
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    /// Node type name; text leaves report `"text"`.
    pub fn node_type(&self) -> &str {
        match self {
            Node::Text { .. } => "text",
            Node::Element { node_type, .. } => node_type,
        }
    }

    /// Marks attached to this node (empty for elements).
    pub fn marks(&self) -> &[Mark] {
        match self {
            Node::Text { marks, .. } => marks,
            Node::Element { .. } => &[],
        }
    }

    /// Child nodes (empty for text leaves).
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Text { .. } => &[],
            Node::Element { content, .. } => content,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Node::Text { text, marks } => {
                if marks.is_empty() {
                    json!({ "type": "text", "text": text })
                } else {
                    let marks: Vec<Value> = marks.iter().map(Mark::to_json).collect();
                    json!({ "type": "text", "text": text, "marks": marks })
                }
            }
            Node::Element {
                node_type,
                attrs,
                content,
            } => {
                let content: Vec<Value> = content.iter().map(Node::to_json).collect();
                if attrs.is_empty() {
                    json!({ "type": node_type, "content": content })
                } else {
                    json!({ "type": node_type, "attrs": Value::Object(attrs.clone()), "content": content })
                }
            }
        }
    }
}

// ── Doc ───────────────────────────────────────────────────────────────────

/// The document root.  Contributes no position tokens of its own, so the
/// first child starts at position `0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Doc {
    pub content: Vec<Node>,
}

impl Doc {
    pub fn new(content: Vec<Node>) -> Doc {
        Doc { content }
    }

    /// Total size of the document in position tokens.
    pub fn size(&self) -> usize {
        self.content.iter().map(Node::size).sum()
    }

    /// Visit every node whose span overlaps the open interval `(from, to)`,
    /// in document pre-order.  The callback receives each node together with
    /// its absolute start position.
    pub fn nodes_between<F: FnMut(&Node, usize)>(&self, from: usize, to: usize, mut f: F) {
        let size = self.size();
        let to = to.min(size);
        let from = from.min(to);
        walk_between(&self.content, 0, from, to, &mut f);
    }

    /// Plain text (characters only, no tokens) within `[from, to)`.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        self.nodes_between(from, to, |node, pos| {
            if let Node::Text { text, .. } = node {
                let len = node.size();
                let end = pos + len;
                let lo = from.max(pos) - pos;
                let hi = to.min(end) - pos;
                out.extend(text.chars().skip(lo).take(hi - lo));
            }
        });
        out
    }

    /// The full text content of the document.
    pub fn text_content(&self) -> String {
        self.text_between(0, self.size())
    }

    /// The outermost node whose span starts exactly at `pos`, if any.
    pub fn node_starting_at(&self, pos: usize) -> Option<&Node> {
        find_starting_at(&self.content, 0, pos)
    }

    /// JSON shape of the whole tree, for structural comparisons and
    /// serialization by the host converter.
    pub fn to_json(&self) -> Value {
        let content: Vec<Value> = self.content.iter().map(Node::to_json).collect();
        json!({ "type": "doc", "content": content })
    }

    // ── Mutation (used by `Step::apply`) ──────────────────────────────────

    /// Remove all content in `[from, to)`.
    ///
    /// Text overlapping the range boundaries is trimmed; nodes fully covered
    /// by the range are dropped.  Partially covered elements are recursed
    /// into and kept even when emptied, so the position delta is exactly
    /// `to - from`.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<(), DocError> {
        self.check_range(from, to)?;
        delete_children(&mut self.content, 0, from, to);
        Ok(())
    }

    /// Insert a text node at `pos`, splitting an existing text node when the
    /// position falls inside one.
    pub fn insert_text_at(
        &mut self,
        pos: usize,
        text: &str,
        marks: Vec<Mark>,
    ) -> Result<(), DocError> {
        let size = self.size();
        if pos > size {
            return Err(DocError::OutOfBounds { pos, size });
        }
        let node = Node::marked_text(text, marks);
        if insert_into(&mut self.content, 0, pos, node, false) {
            Ok(())
        } else {
            Err(DocError::InvalidPosition(pos))
        }
    }

    /// Add `mark` to all text in `[from, to)`, splitting partially covered
    /// text nodes at the range boundaries.
    pub fn add_mark_range(&mut self, from: usize, to: usize, mark: &Mark) -> Result<(), DocError> {
        self.check_range(from, to)?;
        mark_children(&mut self.content, 0, from, to, &MarkOp::Add(mark));
        Ok(())
    }

    /// Remove every mark of the given type from text in `[from, to)`.
    pub fn remove_mark_range(
        &mut self,
        from: usize,
        to: usize,
        mark_type: &str,
    ) -> Result<(), DocError> {
        self.check_range(from, to)?;
        mark_children(&mut self.content, 0, from, to, &MarkOp::Remove(mark_type));
        Ok(())
    }

    fn check_range(&self, from: usize, to: usize) -> Result<(), DocError> {
        if from > to {
            return Err(DocError::InvalidRange { from, to });
        }
        let size = self.size();
        if to > size {
            return Err(DocError::OutOfBounds { pos: to, size });
        }
        Ok(())
    }
}

// ── Tree walking ──────────────────────────────────────────────────────────

fn walk_between<F: FnMut(&Node, usize)>(
    children: &[Node],
    start: usize,
    from: usize,
    to: usize,
    f: &mut F,
) {
    let mut pos = start;
    for child in children {
        let end = pos + child.size();
        if end > from && pos < to {
            f(child, pos);
            if let Node::Element { content, .. } = child {
                walk_between(content, pos + 1, from, to, f);
            }
        }
        pos = end;
    }
}

fn find_starting_at<'a>(children: &'a [Node], start: usize, pos: usize) -> Option<&'a Node> {
    let mut cursor = start;
    for child in children {
        let end = cursor + child.size();
        if cursor == pos {
            return Some(child);
        }
        if pos > cursor && pos < end {
            return match child {
                Node::Element { content, .. } => find_starting_at(content, cursor + 1, pos),
                Node::Text { .. } => None,
            };
        }
        cursor = end;
    }
    None
}

// ── Deletion ──────────────────────────────────────────────────────────────

fn delete_children(children: &mut Vec<Node>, start: usize, from: usize, to: usize) {
    let drained = std::mem::take(children);
    let mut pos = start;
    for mut child in drained {
        let size = child.size();
        let end = pos + size;
        if end <= from || pos >= to {
            children.push(child);
        } else if pos >= from && end <= to {
            // fully covered: drop
        } else {
            match &mut child {
                Node::Text { text, marks } => {
                    let lo = from.max(pos) - pos;
                    let hi = to.min(end) - pos;
                    let kept = remove_char_range(text, lo, hi);
                    if !kept.is_empty() {
                        children.push(Node::Text {
                            text: kept,
                            marks: std::mem::take(marks),
                        });
                    }
                }
                Node::Element { content, .. } => {
                    delete_children(content, pos + 1, from, to);
                    children.push(child);
                }
            }
        }
        pos = end;
    }
}

fn remove_char_range(text: &str, lo: usize, hi: usize) -> String {
    text.chars()
        .take(lo)
        .chain(text.chars().skip(hi))
        .collect()
}

// ── Insertion ─────────────────────────────────────────────────────────────

/// Insert `node` at absolute position `pos` within `children`.
///
/// `inline` is true when `children` is inline content (a paragraph's or
/// run's children), where boundary positions are valid insertion points.
/// Returns `false` when no valid insertion point exists at `pos`.
fn insert_into(
    children: &mut Vec<Node>,
    start: usize,
    pos: usize,
    node: Node,
    inline: bool,
) -> bool {
    let mut cursor = start;
    let mut i = 0;
    while i < children.len() {
        let size = children[i].size();
        let end = cursor + size;
        if inline && pos == cursor {
            children.insert(i, node);
            return true;
        }
        if pos > cursor && pos < end {
            return match &mut children[i] {
                Node::Text { text, marks } => {
                    let at = pos - cursor;
                    let (head, tail) = split_chars(text, at);
                    let base = marks.clone();
                    let mut repl = Vec::with_capacity(3);
                    if !head.is_empty() {
                        repl.push(Node::Text {
                            text: head,
                            marks: base.clone(),
                        });
                    }
                    repl.push(node);
                    if !tail.is_empty() {
                        repl.push(Node::Text {
                            text: tail,
                            marks: base,
                        });
                    }
                    children.splice(i..=i, repl);
                    true
                }
                Node::Element {
                    node_type, content, ..
                } => {
                    let child_inline = matches!(node_type.as_str(), "paragraph" | "run");
                    insert_into(content, cursor + 1, pos, node, child_inline)
                }
            };
        }
        cursor = end;
        i += 1;
    }
    if inline && pos == cursor {
        children.push(node);
        return true;
    }
    false
}

fn split_chars(text: &str, at: usize) -> (String, String) {
    let head: String = text.chars().take(at).collect();
    let tail: String = text.chars().skip(at).collect();
    (head, tail)
}

// ── Mark edits ────────────────────────────────────────────────────────────

enum MarkOp<'a> {
    Add(&'a Mark),
    Remove(&'a str),
}

fn apply_mark_op(marks: &mut Vec<Mark>, op: &MarkOp) {
    match op {
        MarkOp::Add(m) => mark::add_to_set(marks, (*m).clone()),
        MarkOp::Remove(t) => mark::remove_from_set(marks, t),
    }
}

fn mark_children(children: &mut Vec<Node>, start: usize, from: usize, to: usize, op: &MarkOp) {
    let mut pos = start;
    let mut i = 0;
    while i < children.len() {
        let size = children[i].size();
        let end = pos + size;
        if end <= from || pos >= to {
            pos = end;
            i += 1;
            continue;
        }
        match &mut children[i] {
            Node::Element { content, .. } => {
                mark_children(content, pos + 1, from, to, op);
                pos = end;
                i += 1;
            }
            Node::Text { text, marks } => {
                let lo = from.max(pos) - pos;
                let hi = to.min(end) - pos;
                if lo == 0 && hi == size {
                    apply_mark_op(marks, op);
                    pos = end;
                    i += 1;
                } else {
                    // split so only the covered piece takes the edit
                    let (head, rest) = split_chars(text, lo);
                    let (mid, tail) = split_chars(&rest, hi - lo);
                    let base = marks.clone();
                    let mut mid_marks = base.clone();
                    apply_mark_op(&mut mid_marks, op);
                    let mut repl = Vec::with_capacity(3);
                    if !head.is_empty() {
                        repl.push(Node::Text {
                            text: head,
                            marks: base.clone(),
                        });
                    }
                    repl.push(Node::Text {
                        text: mid,
                        marks: mid_marks,
                    });
                    if !tail.is_empty() {
                        repl.push(Node::Text {
                            text: tail,
                            marks: base,
                        });
                    }
                    let n = repl.len();
                    children.splice(i..=i, repl);
                    pos = end;
                    i += n;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
