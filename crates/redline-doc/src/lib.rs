//! redline-doc — a compact structured-document model for inline rich text.
//!
//! Provides the document tree (`doc > paragraph > run > text`), attribute-bag
//! marks, position-range queries, and an atomic transaction layer with
//! composable position mapping.  The `redline` engine records tracked
//! changes as marks on this tree and resolves them through [`Transaction`]s.
//!
//! Positions follow the usual inline-editor token scheme: every element node
//! contributes one opening and one closing token, every text node contributes
//! one token per character.  The root document contributes no tokens, so the
//! first child starts at position `0`.
//!
//! [`Transaction`]: transaction::Transaction

pub mod error;
pub mod mark;
pub mod node;
pub mod step;
pub mod transaction;

pub use error::DocError;
pub use mark::Mark;
pub use node::{Doc, Node};
pub use step::{Mapping, Step, StepMap};
pub use transaction::Transaction;

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
