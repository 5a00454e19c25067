//! Record store abstractions.
//!
//! The tree engine never talks to a concrete backend. It consumes the
//! [`NodeReader`] / [`NodeWriter`] operations through a transaction handed
//! out by an [`IntervalStoreProvider`], wrapped in an [`IntervalStore`].
//!
//! # Store Providers
//!
//! - **In-Memory Store**: [`memory::InMemoryIntervalStore`], a persistent-map
//!   backed store with snapshot reads and optimistic commits
//!
//! Other backends (a SQL table, an LSM partition) implement the same traits;
//! each provider instance is bound to exactly one table / tenant.

mod interval_store;
pub mod memory;

pub use interval_store::*;
