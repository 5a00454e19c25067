//! The nested-set tree algebra and everything built directly on it.
//!
//! `engine` relabels bounds, `reconciler` keeps sibling positions dense,
//! `validate` checks a set of rows against the tree invariants, and `search`
//! filters and pages listings. Only the search and event types are public;
//! the algebra is reached through [`crate::nested_tree::NestedTree`].

pub(crate) mod engine;
mod event;
pub(crate) mod reconciler;
mod search;
pub(crate) mod validate;

pub use event::*;
pub use search::*;
