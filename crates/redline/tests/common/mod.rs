//! Shared builders for the integration suites.

#![allow(dead_code)]

use redline::change::{Author, TrackedMark};
use redline::permission::Actor;
use redline_doc::{Doc, Mark, Node};

pub const DATE: &str = "2024-03-15T10:00:00Z";

pub fn author(name: &str, email: &str) -> Author {
    Author::new(name, email)
}

pub fn actor(name: &str, email: &str) -> Actor {
    Actor::new(author(name, email), "editor", true)
}

/// `doc > paragraph > run > content`; the run's first text child starts at
/// position 2.
pub fn doc_of(content: Vec<Node>) -> Doc {
    Doc::new(vec![Node::element(
        "paragraph",
        vec![Node::element("run", content)],
    )])
}

pub fn inserted(text: &str, id: &str, by: &Author) -> Node {
    Node::marked_text(text, vec![TrackedMark::insert(id, by, DATE).to_mark()])
}

pub fn deleted(text: &str, id: &str, by: &Author) -> Node {
    Node::marked_text(text, vec![TrackedMark::delete(id, by, DATE).to_mark()])
}

pub fn styled(text: &str, mark_type: &str) -> Node {
    Node::marked_text(text, vec![Mark::new(mark_type)])
}
