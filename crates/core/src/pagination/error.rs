use thiserror::Error;

/// Errors that can occur when constructing a page request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageRequestError {
    #[error("Invalid page request: page size must be greater than zero")]
    ZeroPageSize,
}

/// Errors that can occur when encoding or decoding a cursor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Cursor is not valid base64: {0}")]
    Encoding(String),
    #[error("Cursor does not hold a key: {0}")]
    Payload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_error_display() {
        assert_eq!(
            PageRequestError::ZeroPageSize.to_string(),
            "Invalid page request: page size must be greater than zero"
        );
    }

    #[test]
    fn test_cursor_error_display() {
        let error = CursorError::Encoding("Invalid symbol 33, offset 0.".to_string());
        assert_eq!(
            error.to_string(),
            "Cursor is not valid base64: Invalid symbol 33, offset 0."
        );
    }
}
