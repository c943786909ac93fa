//! Store client implementations.
//!
//! Concrete implementations of `dynarepo_core::storage::StoreClient`, selected
//! at compile time via feature flags. Both can be enabled at once.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): process-local store for tests and development
//! - `dynamodb` (default): AWS DynamoDB store using `aws-sdk-dynamodb`
//!
//! Build with DynamoDB only:
//! ```bash
//! cargo build -p dynarepo --no-default-features --features dynamodb
//! ```

#[cfg(not(any(feature = "inmemory", feature = "dynamodb")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'dynamodb' feature. \
    Example: cargo build -p dynarepo --features dynamodb"
);

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;
