//! Generic repository over a key-value document store.
//!
//! Entity types implement [`Entity`]; a [`Repository`] persists them through a
//! [`StoreClient`]. This crate provides the store clients:
//!
//! - [`storage::InMemoryStore`] (feature `inmemory`) for tests and development
//! - [`storage::DynamoDbStore`] (feature `dynamodb`) for AWS DynamoDB
//!
//! Filters are composed with [`expression::FilterExpressionBuilder`] and large
//! result sets are walked with [`pagination::PageRequest`] cursors.

pub mod config;
pub mod storage;

pub use config::StoreConfig;
pub use dynarepo_core::storage::{
    Entity, EntityId, FieldValue, Item, Repository, RepositoryBuilder, RepositoryError, Result,
    StoreClient,
};
pub use dynarepo_core::{expression, pagination};
