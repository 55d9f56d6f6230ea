//! The change-mark model — Insert, Delete, and Format marks.
//!
//! Tracked changes are recorded as ordinary document marks whose attribute
//! bags carry provenance (change id, author, date) and, for format changes,
//! before/after snapshots of the run's mark state.  This module owns the
//! attribute schema and its serialization to and from [`Mark`]s; it has no
//! behavior beyond that.
//!
//! Marks are non-inclusive at their range boundaries: a cursor sitting
//! exactly on a mark's edge is not "inside" it.  The collector and linker
//! rely on that when deciding adjacency.

use serde_json::{Map, Value};

use redline_doc::Mark;

// ── Mark type names ───────────────────────────────────────────────────────

/// Mark type recording a pending insertion.
pub const MARK_INSERT: &str = "trackInsert";
/// Mark type recording a pending deletion.
pub const MARK_DELETE: &str = "trackDelete";
/// Mark type recording a pending formatting change.
pub const MARK_FORMAT: &str = "trackFormat";

/// All tracked-change mark types, in resolution priority order
/// (Delete > Insert > Format).
pub const TRACK_MARK_TYPES: [&str; 3] = [MARK_DELETE, MARK_INSERT, MARK_FORMAT];

/// `true` when the given mark type is one of the tracked-change marks.
pub fn is_track_mark_type(mark_type: &str) -> bool {
    TRACK_MARK_TYPES.contains(&mark_type)
}

// ── ChangeKind ────────────────────────────────────────────────────────────

/// The closed set of change kinds that participate in tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Delete,
    Format,
}

impl ChangeKind {
    /// The document mark type this kind is persisted as.
    pub fn mark_type(&self) -> &'static str {
        match self {
            ChangeKind::Insert => MARK_INSERT,
            ChangeKind::Delete => MARK_DELETE,
            ChangeKind::Format => MARK_FORMAT,
        }
    }

    /// Back-map a persisted mark type name.
    pub fn from_mark_type(mark_type: &str) -> Option<ChangeKind> {
        match mark_type {
            MARK_INSERT => Some(ChangeKind::Insert),
            MARK_DELETE => Some(ChangeKind::Delete),
            MARK_FORMAT => Some(ChangeKind::Format),
            _ => None,
        }
    }
}

// ── FormatEntry ───────────────────────────────────────────────────────────

/// One entry in a Format mark's before/after list: a mark type plus the
/// attributes it carried (or is moving toward).
#[derive(Debug, Clone, PartialEq)]
pub struct FormatEntry {
    pub mark_type: String,
    pub attrs: Map<String, Value>,
}

impl FormatEntry {
    pub fn new(mark_type: impl Into<String>, attrs: Map<String, Value>) -> FormatEntry {
        FormatEntry {
            mark_type: mark_type.into(),
            attrs,
        }
    }

    /// Describe an existing document mark.
    pub fn of_mark(mark: &Mark) -> FormatEntry {
        FormatEntry {
            mark_type: mark.mark_type.clone(),
            attrs: mark.attrs.clone(),
        }
    }

    /// The document mark this entry describes.
    pub fn to_doc_mark(&self) -> Mark {
        Mark::with_attrs(self.mark_type.clone(), self.attrs.clone())
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.mark_type.clone()));
        obj.insert("attrs".into(), Value::Object(self.attrs.clone()));
        Value::Object(obj)
    }

    fn from_value(value: &Value) -> Option<FormatEntry> {
        let obj = value.as_object()?;
        let mark_type = obj.get("type")?.as_str()?.to_string();
        let attrs = match obj.get("attrs") {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        };
        Some(FormatEntry { mark_type, attrs })
    }
}

/// Parse a persisted before/after list.  Anything malformed degrades to an
/// empty list rather than failing — a Format mark with empty lists is a
/// valid, removable no-op mark.
fn parse_entries(value: Option<&Value>) -> Vec<FormatEntry> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(FormatEntry::from_value).collect(),
        _ => Vec::new(),
    }
}

// ── TrackedMark ───────────────────────────────────────────────────────────

/// A decoded tracked-change mark: kind, provenance, and (for Format) the
/// before/after snapshot lists.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedMark {
    pub kind: ChangeKind,

    /// Groups mark fragments into one logical change.  Empty when the
    /// persisted mark carried no id.
    pub id: String,

    pub author: String,
    pub author_email: String,
    pub author_image: String,
    pub date: String,

    /// Mark state the run had before the first formatting edit in the chain.
    /// Always empty for Insert/Delete.
    pub before: Vec<FormatEntry>,

    /// Mark state the formatting chain is moving toward.
    /// Always empty for Insert/Delete.
    pub after: Vec<FormatEntry>,
}

impl TrackedMark {
    fn base(kind: ChangeKind, id: String, author: &Author, date: String) -> TrackedMark {
        TrackedMark {
            kind,
            id,
            author: author.name.clone(),
            author_email: author.email.clone(),
            author_image: author.image.clone(),
            date,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// A new Insert mark.
    pub fn insert(id: impl Into<String>, author: &Author, date: impl Into<String>) -> TrackedMark {
        Self::base(ChangeKind::Insert, id.into(), author, date.into())
    }

    /// A new Delete mark.
    pub fn delete(id: impl Into<String>, author: &Author, date: impl Into<String>) -> TrackedMark {
        Self::base(ChangeKind::Delete, id.into(), author, date.into())
    }

    /// A new Format mark with the given before/after lists.
    pub fn format(
        id: impl Into<String>,
        author: &Author,
        date: impl Into<String>,
        before: Vec<FormatEntry>,
        after: Vec<FormatEntry>,
    ) -> TrackedMark {
        let mut mark = Self::base(ChangeKind::Format, id.into(), author, date.into());
        mark.before = before;
        mark.after = after;
        mark
    }

    /// Render to the persisted document-mark representation.
    pub fn to_mark(&self) -> Mark {
        let mut attrs = Map::new();
        attrs.insert("id".into(), Value::String(self.id.clone()));
        attrs.insert("author".into(), Value::String(self.author.clone()));
        attrs.insert(
            "authorEmail".into(),
            Value::String(self.author_email.clone()),
        );
        attrs.insert(
            "authorImage".into(),
            Value::String(self.author_image.clone()),
        );
        attrs.insert("date".into(), Value::String(self.date.clone()));
        if self.kind == ChangeKind::Format {
            attrs.insert(
                "before".into(),
                Value::Array(self.before.iter().map(FormatEntry::to_value).collect()),
            );
            attrs.insert(
                "after".into(),
                Value::Array(self.after.iter().map(FormatEntry::to_value).collect()),
            );
        }
        Mark::with_attrs(self.kind.mark_type(), attrs)
    }

    /// Decode a document mark.  Returns `None` for non-tracking marks;
    /// missing provenance fields decode as empty strings and malformed
    /// before/after payloads degrade to empty lists.
    pub fn from_mark(mark: &Mark) -> Option<TrackedMark> {
        let kind = ChangeKind::from_mark_type(&mark.mark_type)?;
        let str_attr = |key: &str| -> String {
            mark.attr(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(TrackedMark {
            kind,
            id: str_attr("id"),
            author: str_attr("author"),
            author_email: str_attr("authorEmail"),
            author_image: str_attr("authorImage"),
            date: str_attr("date"),
            before: parse_entries(mark.attr("before")),
            after: parse_entries(mark.attr("after")),
        })
    }
}

/// Decode every tracked-change mark in a mark set, in resolution priority
/// order (Delete first, then Insert, then Format).
pub fn tracked_marks(marks: &[Mark]) -> Vec<TrackedMark> {
    TRACK_MARK_TYPES
        .iter()
        .filter_map(|t| marks.iter().find(|m| m.mark_type == *t))
        .filter_map(TrackedMark::from_mark)
        .collect()
}

// ── Author ────────────────────────────────────────────────────────────────

/// Provenance identity stamped onto new change marks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    pub name: String,
    pub email: String,
    pub image: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Author {
        Author {
            name: name.into(),
            email: email.into(),
            image: String::new(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author() -> Author {
        Author::new("Ada", "ada@example.com")
    }

    #[test]
    fn insert_mark_roundtrip() {
        let tm = TrackedMark::insert("c1", &author(), "2024-01-01T00:00:00Z");
        let mark = tm.to_mark();
        assert_eq!(mark.mark_type, MARK_INSERT);
        assert_eq!(TrackedMark::from_mark(&mark), Some(tm));
    }

    #[test]
    fn format_mark_roundtrip_with_snapshots() {
        let before = vec![FormatEntry::new("bold", Map::new())];
        let mut style = Map::new();
        style.insert("color".into(), json!("#ff0000"));
        let after = vec![FormatEntry::new("textStyle", style)];
        let tm = TrackedMark::format("c2", &author(), "2024-01-01T00:00:00Z", before, after);
        let decoded = TrackedMark::from_mark(&tm.to_mark()).unwrap();
        assert_eq!(decoded, tm);
    }

    #[test]
    fn non_track_marks_decode_to_none() {
        assert!(TrackedMark::from_mark(&Mark::new("bold")).is_none());
    }

    #[test]
    fn malformed_snapshots_degrade_to_empty() {
        let mut attrs = Map::new();
        attrs.insert("id".into(), json!("c3"));
        attrs.insert("before".into(), json!("not-a-list"));
        attrs.insert("after".into(), json!({ "also": "wrong" }));
        let mark = Mark::with_attrs(MARK_FORMAT, attrs);
        let tm = TrackedMark::from_mark(&mark).unwrap();
        assert!(tm.before.is_empty());
        assert!(tm.after.is_empty());
        assert_eq!(tm.author, "");
    }

    #[test]
    fn tracked_marks_follow_priority_order() {
        let marks = vec![
            TrackedMark::format("f", &author(), "d", Vec::new(), Vec::new()).to_mark(),
            TrackedMark::delete("d", &author(), "d").to_mark(),
        ];
        let decoded = tracked_marks(&marks);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].kind, ChangeKind::Delete);
        assert_eq!(decoded[1].kind, ChangeKind::Format);
    }
}
