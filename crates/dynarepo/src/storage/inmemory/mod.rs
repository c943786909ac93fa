//! In-memory storage backend for tests and local development.
//!
//! [`InMemoryStore`] implements [`StoreClient`](dynarepo_core::storage::StoreClient)
//! against a single table held behind `Arc<RwLock<_>>`. Filter expressions are
//! parsed and evaluated the way the managed store does, so malformed filters
//! fail here too. Data is lost when the last clone is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use dynarepo::storage::inmemory::InMemoryStore;
//! use dynarepo_core::storage::Repository;
//!
//! let repository: Repository<Fruit, _> =
//!     Repository::new(InMemoryStore::for_entity::<Fruit>("fruits"));
//! ```

mod error;
mod expression;
mod store;

pub use error::{ExpressionError, StoreError};
pub use store::InMemoryStore;
