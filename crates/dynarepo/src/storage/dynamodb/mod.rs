//! DynamoDB storage backend.
//!
//! Provides [`DynamoDbStore`], a `StoreClient` backed by `aws-sdk-dynamodb`.
//! SDK errors are passed through as the source of
//! `RepositoryError::StoreOperationFailed`; no retries are attempted.

mod client;
mod conversions;
mod error;
mod store;

pub use client::create_client;
pub use conversions::{from_attribute_map, to_attribute_map};
pub use error::{is_throttling, DynamoDbError};
pub use store::{DynamoDbStore, DynamoDbStoreBuilder};
