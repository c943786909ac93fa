use thiserror::Error;

/// Boxed error returned by a store client, kept intact for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity_type} identifier must not be missing")]
    IdentifierMissing { entity_type: &'static str },
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(&'static str),
    #[error("Store operation {operation} failed: {source}")]
    StoreOperationFailed {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// Wraps a store client error without altering it.
    pub fn store(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::StoreOperationFailed {
            operation,
            source: source.into(),
        }
    }

    /// Returns true for errors raised locally, before any store call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::IdentifierMissing { .. } | Self::ConfigurationMissing(_)
        )
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_repository_error_identifier_missing_display() {
        let error = RepositoryError::IdentifierMissing {
            entity_type: "Fruit",
        };
        assert_eq!(error.to_string(), "Fruit identifier must not be missing");
        assert!(error.is_local());
    }

    #[test]
    fn test_repository_error_configuration_missing_display() {
        let error = RepositoryError::ConfigurationMissing("store client");
        assert_eq!(error.to_string(), "Configuration missing: store client");
        assert!(error.is_local());
    }

    #[test]
    fn test_repository_error_store_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout after 30s");
        let error = RepositoryError::store("Scan", io);

        assert_eq!(
            error.to_string(),
            "Store operation Scan failed: timeout after 30s"
        );
        assert!(!error.is_local());

        let source = error.source().unwrap();
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_repository_error_invalid_data_display() {
        let error = RepositoryError::InvalidData("Missing or invalid field: id".to_string());
        assert_eq!(error.to_string(), "Invalid data: Missing or invalid field: id");
    }
}
