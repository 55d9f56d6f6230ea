//! The permission gate — decides, per change and per actor, whether an
//! accept/reject action may proceed.
//!
//! The policy itself lives in the host application behind the
//! [`PermissionResolver`] trait; this module only maps `(action, ownership)`
//! to a permission key, invokes the resolver per change, and ANDs the
//! results.  With no resolver registered everything is allowed.

use serde_json::Value;

use crate::change::Author;
use crate::collect::NormalizedChange;
use crate::resolve::ResolveAction;

// ── Actor ─────────────────────────────────────────────────────────────────

/// The acting user's session identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    /// Provenance identity stamped onto marks this actor creates.
    pub author: Author,

    /// Host-defined role name, passed through to the resolver.
    pub role: String,

    /// Whether the actor belongs to the hosting organization.
    pub is_internal: bool,
}

impl Actor {
    pub fn new(author: Author, role: impl Into<String>, is_internal: bool) -> Actor {
        Actor {
            author,
            role: role.into(),
            is_internal,
        }
    }
}

// ── Permission keys ───────────────────────────────────────────────────────

/// The four gated operations on tracked changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedChangePermission {
    /// Accept a change of your own.
    ResolveOwn,
    /// Accept another author's change.
    ResolveOther,
    /// Reject a change of your own.
    RejectOwn,
    /// Reject another author's change.
    RejectOther,
}

impl TrackedChangePermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedChangePermission::ResolveOwn => "RESOLVE_OWN",
            TrackedChangePermission::ResolveOther => "RESOLVE_OTHER",
            TrackedChangePermission::RejectOwn => "REJECT_OWN",
            TrackedChangePermission::RejectOther => "REJECT_OTHER",
        }
    }

    fn for_action(action: ResolveAction, own: bool) -> TrackedChangePermission {
        match (action, own) {
            (ResolveAction::Accept, true) => TrackedChangePermission::ResolveOwn,
            (ResolveAction::Accept, false) => TrackedChangePermission::ResolveOther,
            (ResolveAction::Reject, true) => TrackedChangePermission::RejectOwn,
            (ResolveAction::Reject, false) => TrackedChangePermission::RejectOther,
        }
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────

/// Everything the host resolver sees for one change.
#[derive(Debug)]
pub struct PermissionParams<'a> {
    pub permission: TrackedChangePermission,
    pub role: &'a str,
    pub is_internal: bool,
    pub tracked_change: &'a NormalizedChange,
    pub comment: Option<&'a Value>,
}

/// Host-supplied permission policy.
///
/// Only an explicit `Some(false)` denies; `None` (the resolver has no
/// opinion) and `Some(true)` both allow.
pub trait PermissionResolver {
    fn resolve(&self, params: &PermissionParams<'_>) -> Option<bool>;
}

impl<F> PermissionResolver for F
where
    F: Fn(&PermissionParams<'_>) -> Option<bool>,
{
    fn resolve(&self, params: &PermissionParams<'_>) -> Option<bool> {
        self(params)
    }
}

// ── Gating ────────────────────────────────────────────────────────────────

/// Case-insensitive, trimmed email comparison.  An empty email on either
/// side means ownership cannot be determined; treat as own (permissive
/// default — a stricter policy belongs in the host resolver).
pub fn emails_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    a.is_empty() || b.is_empty() || a == b
}

/// Whether `actor` authored `change`.
pub fn is_own_change(actor: &Actor, change: &NormalizedChange) -> bool {
    emails_match(&actor.author.email, &change.mark.author_email)
}

/// Gate a batch: allowed only when every change individually passes.
pub fn is_action_allowed(
    actor: &Actor,
    action: ResolveAction,
    changes: &[NormalizedChange],
    resolver: Option<&dyn PermissionResolver>,
) -> bool {
    let Some(resolver) = resolver else {
        return true;
    };
    if changes.is_empty() {
        return true;
    }
    changes.iter().all(|change| {
        let permission = TrackedChangePermission::for_action(action, is_own_change(actor, change));
        let params = PermissionParams {
            permission,
            role: &actor.role,
            is_internal: actor.is_internal,
            tracked_change: change,
            comment: change.comment.as_ref(),
        };
        resolver.resolve(&params) != Some(false)
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
