//! Concurrent hierarchical key-space tree.
//!
//! A [`KeySpaceNode`] owns its children in a lexicographically ordered map
//! and answers text requests such as `set a b,c` or `tree a`. Every
//! operation produces an [`Outcome`]; nothing in this crate reports failure
//! through `Err` or by unwinding past [`KeySpaceNode::handle_request`].
//!
//! Destructive operations coordinate with in-flight requests through a
//! per-node pending counter rather than by holding locks across the
//! recursive descent. See [`KeySpaceNode`] for the locking rules.

mod node;
mod operation;
mod outcome;
mod request;

#[cfg(test)]
mod tests;

pub use self::node::KeySpaceNode;
pub use self::operation::{Operation, OperationParseError};
pub use self::outcome::{Outcome, OutcomeKind};
pub use self::request::{help_text, is_request};

/// Name reserved for the root node. No other node may carry it.
pub const ROOT_NAME: &str = "database";

const TREE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::tree");
