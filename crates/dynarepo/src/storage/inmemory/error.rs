use dynarepo_core::pagination::CursorError;
use thiserror::Error;

/// Errors raised by the in-memory store, mirroring the store's own rejections.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table {0} does not exist")]
    TableNotFound(String),
    #[error("Table {0} already exists")]
    TableExists(String),
    #[error("Invalid filter expression: {0}")]
    InvalidExpression(#[from] ExpressionError),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),
    #[error("Item is missing key attribute {0}")]
    MissingKey(String),
    #[error("Key attribute {0} must not be empty")]
    EmptyKey(String),
    #[error("Key attribute {attribute} holds an invalid number: {value}")]
    InvalidNumber { attribute: String, value: String },
    #[error("Key attribute {attribute} must be of type {expected}, got {actual}")]
    KeyTypeMismatch {
        attribute: String,
        expected: String,
        actual: &'static str,
    },
}

/// Reasons a filter expression is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("invalid operand: {0}")]
    InvalidOperand(String),
    #[error("value placeholder {0} is not bound")]
    UnboundValue(String),
    #[error("name placeholder {0} is not bound")]
    UnboundName(String),
    #[error("value placeholder {0} is not used in the expression")]
    UnusedValue(String),
    #[error("name placeholder {0} is not used in the expression")]
    UnusedName(String),
    #[error("expression is {length} bytes long, the limit is {max}")]
    TooLong { length: usize, max: usize },
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}
