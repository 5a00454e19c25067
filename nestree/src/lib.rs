//! # nestree - nested-set trees over an interval store
//!
//! `nestree` keeps an ordered hierarchy in a flat record store using the
//! nested set encoding: every node carries a `left` and `right` bound, and a
//! node's descendants are exactly the nodes whose bounds lie strictly inside
//! its own. Ancestor, descendant and subtree-size questions become range
//! comparisons; structural changes relabel bounds in batched, relative
//! updates.
//!
//! ## Key Features
//!
//! - **Atomic structural operations**: insert, delete, move and copy each run
//!   in one store transaction under a per-tree lock
//! - **Dense sibling positions**: children are always numbered `0..n`
//! - **Pluggable stores**: the engine talks to [`store::IntervalStoreProvider`];
//!   an in-memory implementation with snapshot reads ships with the crate
//! - **Verification**: `verify` and `import` check every tree invariant
//! - **Events**: listeners are notified after each committed change
//!
//! ## Quick Start
//!
//! ```rust
//! use nestree::nested_tree::NestedTree;
//! use nestree::store::memory::InMemoryStoreConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = NestedTree::builder().open_in_memory(InMemoryStoreConfig::new())?;
//!
//! let root = tree.create_root("root")?;
//! let a = tree.insert_child(root.id, "A", None)?;
//! let b = tree.insert_child(root.id, "B", None)?;
//! tree.move_node(b.id, a.id, None)?;
//!
//! assert_eq!(tree.children(a.id)?[0].id, b.id);
//! tree.verify()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Constants, lock registry and shared helpers
//! - [`errors`] - Error types and result definitions
//! - [`node`] - The node row and its payload
//! - [`store`] - Interval store abstractions and the in-memory store
//! - [`tree`] - Search, events and the tree algebra
//! - [`nested_tree`] - The tree facade
//! - [`tree_builder`] - Builder for opening trees
//! - [`tree_config`] - Tree configuration

use crate::common::LockRegistry;
use once_cell::sync::Lazy;

pub mod common;
pub mod errors;
pub mod nested_tree;
pub mod node;
pub mod store;
pub mod tree;
pub mod tree_builder;
pub mod tree_config;

pub use nested_tree::NestedTree;
pub use tree_builder::TreeBuilder;

/// One lock per store lock key, shared by every tree in the process.
pub(crate) static TREE_LOCKS: Lazy<LockRegistry> = Lazy::new(LockRegistry::new);

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}
