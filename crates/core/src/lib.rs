//! Functional core of dynarepo.
//!
//! - [`expression`]: builds filter expressions and their placeholder bindings.
//! - [`pagination`]: page requests, pages and opaque cursors.
//! - [`storage`]: the item model, the `Entity` and `StoreClient` traits and
//!   the generic [`storage::Repository`].
//!
//! Nothing here talks to a store directly; concrete clients live in the
//! `dynarepo` crate.

pub mod expression;
pub mod pagination;
pub mod storage;
