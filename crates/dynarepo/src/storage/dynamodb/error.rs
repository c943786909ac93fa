//! DynamoDB error mapping.
//!
//! SDK errors are handed to `RepositoryError::StoreOperationFailed` untouched,
//! so callers can downcast the source to the SDK's own error type.

use std::error::Error as StdError;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use dynarepo_core::storage::RepositoryError;
use thiserror::Error;

/// Errors raised by the DynamoDB store itself rather than the SDK.
#[derive(Debug, Error)]
pub enum DynamoDbError {
    #[error("Timeout waiting for table '{table_name}' to become active")]
    TableActivationTimeout { table_name: String },

    #[error("DescribeTable returned no description for table '{table_name}'")]
    MissingTableDescription { table_name: String },
}

/// Error codes DynamoDB uses when a request was throttled.
const THROTTLING_CODES: [&str; 3] = [
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// Returns true if the error code means the request was throttled.
pub fn is_throttling(code: Option<&str>) -> bool {
    code.is_some_and(|code| THROTTLING_CODES.contains(&code))
}

/// Map an SDK error to `RepositoryError`, keeping it as the source.
pub fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> RepositoryError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let code = err.code();
    if is_throttling(code) {
        tracing::warn!(operation, code, "DynamoDB request throttled");
    } else {
        tracing::error!(operation, code, message = err.message(), "DynamoDB request failed");
    }
    RepositoryError::store(operation, err)
}

/// Map an error raised by the store itself to `RepositoryError`.
pub fn map_store_error(operation: &'static str, err: DynamoDbError) -> RepositoryError {
    RepositoryError::store(operation, err)
}
