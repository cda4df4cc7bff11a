//! Core types and trait definitions for the Polity identity hierarchy.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//!
//! The hierarchy is stored flat: every [`Identity`](identity::Identity)
//! carries its materialized ancestor `path`, so ancestor and descendant
//! queries never walk the tree one node at a time.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod memory;
pub mod query;
pub mod store;
pub mod tree;
pub mod validate;

pub use error::{Error, Result};
pub use hierarchy::Hierarchy;
pub use identity::{Identity, IdentityPatch, IdentityRef, NewIdentity};
pub use memory::MemoryStore;
pub use query::Directory;
pub use store::IdentityStore;
