//! The `Mark` type — an attribute-bag annotation attached to text.
//!
//! A mark is identified by its type name (`"bold"`, `"textStyle"`,
//! `"trackInsert"`, …) and carries an arbitrary JSON attribute map.  A text
//! node holds at most one mark per type; adding a mark of an existing type
//! replaces the previous one.

use serde_json::{json, Map, Value};

// ── Mark ──────────────────────────────────────────────────────────────────

/// An annotation on inline text: a type name plus a JSON attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    /// Mark type name (e.g. `"bold"`, `"trackDelete"`).
    pub mark_type: String,

    /// Arbitrary attributes, preserved in insertion order.
    pub attrs: Map<String, Value>,
}

impl Mark {
    /// Create a mark with no attributes.
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs: Map::new(),
        }
    }

    /// Create a mark with the given attribute map.
    pub fn with_attrs(mark_type: impl Into<String>, attrs: Map<String, Value>) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs,
        }
    }

    /// Look up a single attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Serialise to the persisted JSON shape `{ "type": .., "attrs": .. }`.
    pub fn to_json(&self) -> Value {
        json!({ "type": self.mark_type, "attrs": Value::Object(self.attrs.clone()) })
    }
}

// ── Mark-set helpers ──────────────────────────────────────────────────────

/// Add `mark` to `set`, replacing any existing mark of the same type.
pub fn add_to_set(set: &mut Vec<Mark>, mark: Mark) {
    if let Some(existing) = set.iter_mut().find(|m| m.mark_type == mark.mark_type) {
        *existing = mark;
    } else {
        set.push(mark);
    }
}

/// Remove every mark of the given type from `set`.
pub fn remove_from_set(set: &mut Vec<Mark>, mark_type: &str) {
    set.retain(|m| m.mark_type != mark_type);
}

/// Find the mark of the given type in `set`, if any.
pub fn find_in_set<'a>(set: &'a [Mark], mark_type: &str) -> Option<&'a Mark> {
    set.iter().find(|m| m.mark_type == mark_type)
}

// ── Tests ─────────────────────────────────────────────────────────────────
