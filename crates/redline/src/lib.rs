//! redline — tracked-changes reconciliation for structured rich documents.
//!
//! Edits made while tracking is on are recorded as attribute-bag marks on
//! the document tree ([`edit`]), later discovered and merged into logical
//! changes ([`collect`]), expanded to their linked neighbors ([`link`]),
//! gated against a host permission policy ([`permission`]), and finally
//! accepted or rejected through atomic transactions ([`resolve`]).  Format
//! edits get before/after snapshots so a reject restores the exact prior
//! styling ([`format`]), and [`visibility`] projects the pending marks into
//! review-view decorations without touching the document.
//!
//! The document model itself lives in the `redline-doc` crate.

use rand::Rng;

pub mod change;
pub mod collect;
pub mod edit;
pub mod format;
pub mod link;
pub mod permission;
pub mod resolve;
pub mod visibility;

pub use change::{Author, ChangeKind, TrackedMark};
pub use collect::{collect, NormalizedChange, RawChange};
pub use edit::{track_delete, track_insert, track_replace};
pub use format::{track_format, FormatEdit};
pub use link::resolve_group;
pub use permission::{Actor, PermissionParams, PermissionResolver, TrackedChangePermission};
pub use resolve::{
    accept_all, accept_between, accept_by_id, reject_all, reject_between, reject_by_id,
    Resolution, ResolveAction, ResolveContext,
};
pub use visibility::{decorations, Decoration, DecorationKind, TrackChangesState};

/// Mint a change id: 64 random bits, hex encoded.
///
/// Ids only need to be unique within one document's pending changes;
/// collision there is vanishingly unlikely at this width.
pub fn new_change_id() -> String {
    let mut rng = rand::thread_rng();
    format!("{:016x}", rng.gen::<u64>())
}

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
